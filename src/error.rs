use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// 存储层错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// 文件名为空，或只包含 `.` / `..`
    #[error("非法文件名: {0:?}")]
    InvalidFileName(String),

    #[error("文件不存在: {0}")]
    NotFound(String),

    /// 图片宽或高为 0，无法编码
    #[error("图片尺寸为空: {width}x{height}")]
    EmptyImage { width: u32, height: u32 },

    #[error("读写 {} 失败: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("JPEG 编码失败: {0}")]
    Encode(#[from] image::ImageError),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
