#![allow(clippy::uninlined_format_args)]

pub mod app;
pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod item;
pub mod keymap;
pub mod logging;
pub mod nav;
pub mod presenter;
pub mod screen;
pub mod text;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::{run, RunOptions};
pub use error::{Error, Result};
