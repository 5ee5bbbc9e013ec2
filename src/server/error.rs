use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_typed_multipart::TypedMultipartError;
use log::error;
use serde_json::json;
use thiserror::Error;

use crate::error::StoreError;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

/// 请求参数错误，错误信息会原样返回给客户端
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("No file uploaded")]
    NoFile,
    #[error("No result file uploaded")]
    NoResultFile,
    #[error("Missing field: {0}")]
    MissingField(&'static str),
    #[error("Only image files are allowed!")]
    NotImage,
    #[error("Invalid image data: {0}")]
    InvalidImage(String),
}

/// API错误类型
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    fn status(&self) -> (StatusCode, String) {
        if let Some(err) = self.0.downcast_ref::<RequestError>() {
            return (StatusCode::BAD_REQUEST, err.to_string());
        }
        // 表单或 JSON 解析失败，沿用提取器给出的状态码
        if let Some(err) = self.0.downcast_ref::<TypedMultipartError>() {
            let status = match err {
                TypedMultipartError::FieldTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                _ => err.get_status(),
            };
            return (status, err.to_string());
        }
        if let Some(err) = self.0.downcast_ref::<JsonRejection>() {
            return (err.status(), err.body_text());
        }
        match self.0.downcast_ref::<StoreError>() {
            Some(StoreError::NotFound(_)) => (StatusCode::NOT_FOUND, "Image not found".to_string()),
            Some(err @ (StoreError::InvalidFileName(_) | StoreError::EmptyImage { .. })) => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status();
        if status.is_server_error() {
            error!("请求处理失败: {:#}", self.0);
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
