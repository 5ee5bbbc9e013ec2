use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::{Parser, Subcommand};

use crate::cli::*;

/// 上传图片所在的子目录
pub const UPLOAD_DIR_NAME: &str = "images_input";
/// 结果图片所在的子目录
pub const RESULT_DIR_NAME: &str = "result_s";

#[derive(Parser, Debug, Clone)]
pub struct StoreOptions {
    /// 结果图片的 JPEG 质量，范围从 1 到 100
    #[arg(long, value_name = "N", default_value_t = 95, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub jpeg_quality: u8,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self { jpeg_quality: 95 }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "imstash", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    /// 静态资源目录，上传图片与结果图片都保存在这里
    #[arg(short, long, global = true, default_value = "public")]
    pub public_dir: PublicDir,
    #[command(flatten)]
    pub store: StoreOptions,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 创建上传目录与结果目录
    Init(InitCommand),
    /// 保存两张输入图片，并将结果图片写入结果目录
    Save(SaveCommand),
    /// 列出已保存的图片
    List(ListCommand),
    /// 启动 HTTP 服务
    Server(ServerCommand),
}

#[derive(Debug, Clone)]
pub struct PublicDir {
    path: PathBuf,
}

impl PublicDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// 返回上传目录的路径
    pub fn upload_dir(&self) -> PathBuf {
        self.path.join(UPLOAD_DIR_NAME)
    }

    /// 返回结果目录的路径
    pub fn result_dir(&self) -> PathBuf {
        self.path.join(RESULT_DIR_NAME)
    }
}

impl Default for PublicDir {
    fn default() -> Self {
        Self::new("public")
    }
}

impl FromStr for PublicDir {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_dir_layout() {
        let dir = PublicDir::from_str("/srv/kiosk").unwrap();
        assert_eq!(dir.upload_dir(), Path::new("/srv/kiosk/images_input"));
        assert_eq!(dir.result_dir(), Path::new("/srv/kiosk/result_s"));
    }

    #[test]
    fn test_default_public_dir() {
        let opts = Opts::parse_from(["imstash", "init"]);
        assert_eq!(opts.public_dir.path(), Path::new("public"));
        assert_eq!(opts.store.jpeg_quality, 95);
    }

    #[test]
    fn test_jpeg_quality_range() {
        assert!(Opts::try_parse_from(["imstash", "--jpeg-quality", "0", "init"]).is_err());
        assert!(Opts::try_parse_from(["imstash", "--jpeg-quality", "101", "init"]).is_err());
        let opts = Opts::parse_from(["imstash", "--jpeg-quality", "80", "init"]);
        assert_eq!(opts.store.jpeg_quality, 80);
    }
}
