pub mod cli;
pub mod config;
pub mod error;
mod metrics;
pub mod pipeline;
mod server;
pub mod store;

pub use config::{Opts, PublicDir};
pub use error::StoreError;
pub use store::ImageStore;
