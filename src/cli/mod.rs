mod init;
mod list;
mod save;
pub mod server;

pub use init::*;
pub use list::*;
pub use save::*;
pub use server::*;

use crate::config::Opts;

pub trait SubCommandExtend {
    fn run(&self, opts: &Opts) -> impl std::future::Future<Output = anyhow::Result<()>> + Send;
}
