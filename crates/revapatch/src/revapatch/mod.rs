pub mod prelude {
	pub use crate::revapatch::cli::program;
	pub use crate::revapatch::utils::writer::MultiProgressWriter;
	pub use tracing::Level;
	pub use tracing_subscriber::EnvFilter;
}

pub mod apk;
pub mod cli;
pub mod config;
pub mod downloader;
pub mod error;
pub mod exec;
pub mod java;
pub mod patcher;
pub mod tools;
pub mod tui;
pub mod utils;
