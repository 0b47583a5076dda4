#![allow(clippy::uninlined_format_args)]

pub mod animator;
pub mod app;
pub mod config;
pub mod fetcher;
pub mod logging;
pub mod params;
pub mod poller;
pub mod ranking;
pub mod soop;
pub mod target;
pub mod ui;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::{run, RunOptions};
pub use fetcher::{fetch_all_comments, CommentSource};
pub use poller::Poller;
pub use ranking::{cutoff_rank, reconcile_and_rank, Ranking};
pub use target::{resolve_target, Target};
