use std::sync::Arc;

use crate::store::ImageStore;

/// 应用状态
pub struct AppState {
    /// 图片存储
    pub store: ImageStore,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(store: ImageStore) -> Arc<Self> {
        Arc::new(AppState { store })
    }
}
