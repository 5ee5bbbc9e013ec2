use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::task::block_in_place;

use crate::cli::SubCommandExtend;
use crate::config::Opts;
use crate::pipeline::{FromFile, Upload, run_swap};
use crate::store::ImageStore;

#[derive(Parser, Debug, Clone)]
pub struct SaveCommand {
    /// 原始图片，以原文件名复制到上传目录
    pub source: PathBuf,
    /// 目标图片，以原文件名复制到上传目录
    pub target: PathBuf,
    /// 结果图片，支持 jpg、png、gif、bmp，会被重新编码为 JPEG
    pub result: PathBuf,
}

fn open_upload(path: &Path) -> Result<Upload<File>> {
    let file = File::open(path).with_context(|| format!("无法打开图片: {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .with_context(|| format!("无法获取文件名: {}", path.display()))?;
    Ok(Upload::new(file_name, file))
}

impl SubCommandExtend for SaveCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let store = ImageStore::open(&opts.public_dir, &opts.store)?;
        let outcome = block_in_place(|| -> Result<_> {
            run_swap(
                &store,
                open_upload(&self.source)?,
                open_upload(&self.target)?,
                &FromFile(self.result.clone()),
            )
        })?;
        println!("{}", outcome.result.path.display());
        Ok(())
    }
}
