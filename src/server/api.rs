use std::path::Path as FsPath;
use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum_extra::extract::WithRejection;
use axum_typed_multipart::{BaseMultipart, FieldData};
use chrono::Utc;
use image::DynamicImage;
use log::{info, warn};
use tokio::task::block_in_place;

use super::error::{AppError, RequestError, Result};
use super::state::AppState;
use super::types::*;
use crate::metrics;
use crate::pipeline::{Upload, run_swap};
use crate::store::Bucket;

/// 只接受声明为 `image/*` 的文件
fn ensure_image(field: &FieldData<Bytes>) -> Result<()> {
    let is_image = field
        .metadata
        .content_type
        .as_deref()
        .is_some_and(|content_type| content_type.starts_with("image/"));
    if !is_image {
        return Err(RequestError::NotImage.into());
    }
    Ok(())
}

fn original_name(field: &FieldData<Bytes>) -> &str {
    field.metadata.file_name.as_deref().unwrap_or_default()
}

/// 上传一张图片
#[utoipa::path(
    post,
    path = "/api/upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, body = SavedResponse),
    )
)]
pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    BaseMultipart { data, .. }: BaseMultipart<UploadRequest, AppError>,
) -> Result<Json<SavedResponse>> {
    let field = data.image.ok_or(RequestError::NoFile)?;
    ensure_image(&field)?;

    let saved = block_in_place(|| {
        state.store.persist_unique(Bucket::Upload, &field.contents[..], "image", original_name(&field))
    })?;

    let filename = saved.file_name();
    Ok(Json(SavedResponse {
        success: true,
        path: Bucket::Upload.public_path(&filename),
        filename,
        message: "Image uploaded successfully".to_string(),
    }))
}

/// 列出所有上传的图片
#[utoipa::path(
    get,
    path = "/api/images",
    responses(
        (status = 200, body = ImagesResponse),
    )
)]
pub async fn list_images_handler(State(state): State<Arc<AppState>>) -> Result<Json<ImagesResponse>> {
    let images = block_in_place(|| state.store.list_uploads())?;
    Ok(Json(ImagesResponse {
        images: images
            .into_iter()
            .map(|image| ImageEntry { filename: image.filename, path: image.path })
            .collect(),
    }))
}

/// 删除一张上传的图片
#[utoipa::path(
    delete,
    path = "/api/images/{filename}",
    params(("filename" = String, Path, description = "图片文件名")),
    responses(
        (status = 200, body = MessageResponse),
        (status = 404),
    )
)]
pub async fn delete_image_handler(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Json<MessageResponse>> {
    block_in_place(|| state.store.delete_upload(&filename))?;
    Ok(Json(MessageResponse {
        success: true,
        message: "Image deleted successfully".to_string(),
    }))
}

/// 保存一张结果图片
#[utoipa::path(
    post,
    path = "/api/save-result",
    request_body(content = SaveResultForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, body = SavedResponse),
    )
)]
pub async fn save_result_handler(
    State(state): State<Arc<AppState>>,
    BaseMultipart { data, .. }: BaseMultipart<SaveResultRequest, AppError>,
) -> Result<Json<SavedResponse>> {
    let field = data.result.ok_or(RequestError::NoResultFile)?;
    ensure_image(&field)?;

    let saved = block_in_place(|| {
        state.store.persist_unique(Bucket::Result, &field.contents[..], "result", original_name(&field))
    })?;

    let filename = saved.file_name();
    Ok(Json(SavedResponse {
        success: true,
        path: Bucket::Result.public_path(&filename),
        filename,
        message: "Result saved successfully".to_string(),
    }))
}

/// 列出所有结果图片
#[utoipa::path(
    get,
    path = "/api/results",
    responses(
        (status = 200, body = ResultsResponse),
    )
)]
pub async fn list_results_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ResultsResponse>> {
    let results = block_in_place(|| state.store.list_results())?;
    Ok(Json(ResultsResponse { results: results.into_iter().map(ResultEntry::from).collect() }))
}

/// 记录一次客户端失败
#[utoipa::path(
    post,
    path = "/api/track-failure",
    request_body = FailureRequest,
    responses(
        (status = 200, body = MessageResponse),
    )
)]
pub async fn track_failure_handler(
    WithRejection(Json(data), _): WithRejection<Json<FailureRequest>, AppError>,
) -> Result<Json<MessageResponse>> {
    let record = FailureRecord::new(data, Utc::now());
    warn!("客户端失败记录: {}", serde_json::to_string(&record)?);
    metrics::inc_tracked_failure();

    Ok(Json(MessageResponse { success: true, message: "Failure tracked successfully".to_string() }))
}

/// 保存两张输入图片，并把外部生成的结果图片写入结果目录
#[utoipa::path(
    post,
    path = "/api/swap",
    request_body(content = SwapForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, body = SwapResponse),
    )
)]
pub async fn swap_handler(
    State(state): State<Arc<AppState>>,
    BaseMultipart { data, .. }: BaseMultipart<SwapRequest, AppError>,
) -> Result<Json<SwapResponse>> {
    let source = data.source_image.ok_or(RequestError::MissingField("sourceImage"))?;
    let target = data.target_image.ok_or(RequestError::MissingField("targetImage"))?;
    let final_image = data.final_image.ok_or(RequestError::MissingField("finalImage"))?;
    for field in [&source, &target, &final_image] {
        ensure_image(field)?;
    }

    // 输入图片先落盘，再解码结果图片
    let decode_final = |_: &FsPath, _: &FsPath| -> anyhow::Result<DynamicImage> {
        let image = image::load_from_memory(&final_image.contents)
            .map_err(|e| RequestError::InvalidImage(e.to_string()))?;
        Ok(image)
    };
    let outcome = block_in_place(|| {
        run_swap(
            &state.store,
            Upload::new(original_name(&source), &source.contents[..]),
            Upload::new(original_name(&target), &target.contents[..]),
            &decode_final,
        )
    })?;

    info!("换装完成: {}", outcome.result.path.display());

    Ok(Json(SwapResponse {
        source: Bucket::Upload.public_path(&outcome.source.file_name()),
        target: Bucket::Upload.public_path(&outcome.target.file_name()),
        result: Bucket::Result.public_path(&outcome.result.file_name()),
    }))
}

/// 导出 prometheus 指标
#[utoipa::path(get, path = "/metrics")]
pub async fn metrics_handler() -> Result<impl IntoResponse> {
    let body = metrics::gather_text()?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}
