//! 保存两张输入图片并写出结果图片的完整流程
//!
//! 结果图片由外部的 [`Compositor`] 生成，本模块只负责落盘。

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::DynamicImage;
use log::info;

use crate::store::{ImageStore, SavedFile};

/// 一个上传的文件：原文件名 + 可读的数据流
pub struct Upload<R> {
    pub file_name: String,
    pub reader: R,
}

impl<R: Read> Upload<R> {
    pub fn new(file_name: impl Into<String>, reader: R) -> Self {
        Self { file_name: file_name.into(), reader }
    }
}

/// 根据已保存的两张输入图片生成结果图片
pub trait Compositor {
    fn compose(&self, source: &Path, target: &Path) -> Result<DynamicImage>;
}

impl<F> Compositor for F
where
    F: Fn(&Path, &Path) -> Result<DynamicImage>,
{
    fn compose(&self, source: &Path, target: &Path) -> Result<DynamicImage> {
        self(source, target)
    }
}

/// 已经计算好的结果图片
pub struct Precomputed(pub DynamicImage);

impl Compositor for Precomputed {
    fn compose(&self, _source: &Path, _target: &Path) -> Result<DynamicImage> {
        Ok(self.0.clone())
    }
}

/// 从磁盘上的图片文件读取结果
pub struct FromFile(pub PathBuf);

impl Compositor for FromFile {
    fn compose(&self, _source: &Path, _target: &Path) -> Result<DynamicImage> {
        image::open(&self.0).with_context(|| format!("无法读取结果图片: {}", self.0.display()))
    }
}

#[derive(Debug, Clone)]
pub struct SwapOutcome {
    pub source: SavedFile,
    pub target: SavedFile,
    pub result: SavedFile,
}

/// 保存 source 与 target，调用 compositor 生成结果，再将结果写入结果目录
pub fn run_swap<R1, R2, C>(
    store: &ImageStore,
    source: Upload<R1>,
    target: Upload<R2>,
    compositor: &C,
) -> Result<SwapOutcome>
where
    R1: Read,
    R2: Read,
    C: Compositor + ?Sized,
{
    let source = store
        .persist(source.reader, &source.file_name)
        .with_context(|| format!("保存 source 图片失败: {}", source.file_name))?;
    let target = store
        .persist(target.reader, &target.file_name)
        .with_context(|| format!("保存 target 图片失败: {}", target.file_name))?;

    let image = compositor.compose(&source.path, &target.path)?;
    let result = store.write_result(&image).context("写入结果图片失败")?;

    info!("结果图片: {}", result.path.display());
    Ok(SwapOutcome { source, target, result })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use anyhow::anyhow;
    use tempfile::tempdir;

    use super::*;
    use crate::config::{PublicDir, StoreOptions};

    #[test]
    fn test_compositor_sees_persisted_inputs() {
        let dir = tempdir().unwrap();
        let store = ImageStore::open(&PublicDir::new(dir.path()), &StoreOptions::default()).unwrap();

        let compositor = |source: &Path, target: &Path| -> Result<DynamicImage> {
            assert_eq!(fs::read(source)?, b"src");
            assert_eq!(fs::read(target)?, b"dst");
            Ok(DynamicImage::new_rgb8(2, 2))
        };
        let outcome = run_swap(
            &store,
            Upload::new("s.png", &b"src"[..]),
            Upload::new("t.png", &b"dst"[..]),
            &compositor,
        )
        .unwrap();

        assert!(outcome.result.path.starts_with(store.result_dir()));
        assert!(outcome.result.file_name().ends_with(".jpg"));
    }

    #[test]
    fn test_compositor_error_writes_no_result() {
        let dir = tempdir().unwrap();
        let store = ImageStore::open(&PublicDir::new(dir.path()), &StoreOptions::default()).unwrap();

        let compositor =
            |_: &Path, _: &Path| -> Result<DynamicImage> { Err(anyhow!("face not found")) };
        let err = run_swap(
            &store,
            Upload::new("s.png", &b"src"[..]),
            Upload::new("t.png", &b"dst"[..]),
            &compositor,
        )
        .unwrap_err();

        assert_eq!(err.to_string(), "face not found");
        assert!(store.upload_dir().join("s.png").exists());
        assert_eq!(fs::read_dir(store.result_dir()).unwrap().count(), 0);
    }
}
