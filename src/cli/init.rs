use clap::Parser;
use log::info;

use crate::cli::SubCommandExtend;
use crate::config::Opts;
use crate::store::init_dirs;

#[derive(Parser, Debug, Clone)]
pub struct InitCommand {}

impl SubCommandExtend for InitCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let (upload_dir, result_dir) = (opts.public_dir.upload_dir(), opts.public_dir.result_dir());
        init_dirs(&upload_dir, &result_dir)?;
        info!("目录初始化完成");
        println!("{}", upload_dir.display());
        println!("{}", result_dir.display());
        Ok(())
    }
}
