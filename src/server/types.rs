use axum::body::Bytes;
use axum_typed_multipart::{FieldData, TryFromMultipart};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::store::StoredImage;

/// 上传图片请求
#[derive(TryFromMultipart)]
pub struct UploadRequest {
    #[form_data(limit = "10MiB")]
    pub image: Option<FieldData<Bytes>>,
}

/// 上传图片表单（用于API文档）
#[derive(Debug, ToSchema)]
#[allow(unused)]
pub struct UploadForm {
    /// 上传的图片文件
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub image: String,
}

/// 保存结果图片请求
#[derive(TryFromMultipart)]
pub struct SaveResultRequest {
    #[form_data(limit = "10MiB")]
    pub result: Option<FieldData<Bytes>>,
}

/// 保存结果图片表单（用于API文档）
#[derive(Debug, ToSchema)]
#[allow(unused)]
pub struct SaveResultForm {
    /// 结果图片文件
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub result: String,
}

/// 换装请求：两张输入图片与外部生成的结果图片
#[derive(TryFromMultipart)]
pub struct SwapRequest {
    #[form_data(field_name = "sourceImage", limit = "10MiB")]
    pub source_image: Option<FieldData<Bytes>>,
    #[form_data(field_name = "targetImage", limit = "10MiB")]
    pub target_image: Option<FieldData<Bytes>>,
    #[form_data(field_name = "finalImage", limit = "10MiB")]
    pub final_image: Option<FieldData<Bytes>>,
}

/// 换装表单（用于API文档）
#[derive(Debug, ToSchema)]
#[schema(rename_all = "camelCase")]
#[allow(unused)]
pub struct SwapForm {
    /// 原始图片，以原文件名保存
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub source_image: String,
    /// 目标图片，以原文件名保存
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub target_image: String,
    /// 外部生成的结果图片，会被重新编码为 JPEG
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub final_image: String,
}

/// 换装响应，均为静态资源路径
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SwapResponse {
    pub source: String,
    pub target: String,
    pub result: String,
}

/// 单个文件保存成功的响应
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SavedResponse {
    pub success: bool,
    pub filename: String,
    /// 静态资源路径
    pub path: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ImageEntry {
    pub filename: String,
    pub path: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ImagesResponse {
    pub images: Vec<ImageEntry>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResultEntry {
    pub filename: String,
    pub path: String,
    pub status: String,
    /// 修改时间，RFC 3339 格式
    pub timestamp: DateTime<Utc>,
    /// 文件大小，单位为字节
    pub size: u64,
    pub error: Option<String>,
}

impl From<StoredImage> for ResultEntry {
    fn from(image: StoredImage) -> Self {
        Self {
            filename: image.filename,
            path: image.path,
            status: "success".to_string(),
            timestamp: image.modified,
            size: image.size,
            error: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResultsResponse {
    pub results: Vec<ResultEntry>,
}

/// 客户端上报的失败记录
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FailureRequest {
    pub filename: Option<String>,
    pub error: Option<String>,
    pub original_image: Option<String>,
    pub selected_costume: Option<String>,
}

/// 写入日志的失败记录，缺省字段已补齐
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureRecord {
    pub filename: String,
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub error: String,
    pub original_image: String,
    pub selected_costume: String,
}

impl FailureRecord {
    pub fn new(request: FailureRequest, now: DateTime<Utc>) -> Self {
        Self {
            filename: request
                .filename
                .unwrap_or_else(|| format!("failed-{}", now.timestamp_millis())),
            status: "failed".to_string(),
            timestamp: now,
            error: request.error.unwrap_or_else(|| "Unknown error".to_string()),
            original_image: request.original_image.unwrap_or_else(|| "Unknown".to_string()),
            selected_costume: request.selected_costume.unwrap_or_else(|| "Unknown".to_string()),
        }
    }
}
