//! Command-line interface module.

mod args;
pub mod build;
pub mod components;
pub mod watch;

pub use args::{Cli, Commands};
