use anyhow::Result;
use chrono::SecondsFormat;
use clap::{Parser, ValueEnum};
use tokio::task::block_in_place;

use crate::cli::SubCommandExtend;
use crate::config::Opts;
use crate::store::{ImageStore, StoredImage};

#[derive(Parser, Debug, Clone)]
pub struct ListCommand {
    /// 列出结果图片，而不是上传的图片
    #[arg(long)]
    pub results: bool,
    /// 输出格式
    #[arg(long, value_name = "FORMAT", value_enum, default_value_t = OutputFormat::Table)]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for ListCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let store = ImageStore::open(&opts.public_dir, &opts.store)?;
        let images = block_in_place(|| {
            if self.results { store.list_results() } else { store.list_uploads() }
        })?;
        print_images(&images, self.output_format)
    }
}

fn print_images(images: &[StoredImage], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(images)?)
        }
        OutputFormat::Table => {
            for image in images {
                println!(
                    "{}\t{}\t{}",
                    image.size,
                    image.modified.to_rfc3339_opts(SecondsFormat::Secs, true),
                    image.path
                );
            }
        }
    }
    Ok(())
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Json,
    Table,
}
