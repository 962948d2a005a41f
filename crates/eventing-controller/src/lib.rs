pub mod cli;
pub mod config;
pub mod controllers;
pub mod core;
pub mod dispatcher;
pub mod error;
pub mod init;
pub mod monitoring;
pub mod queue;
pub mod resources;
pub mod store;

#[cfg(test)]
mod fixture;

pub use init::start_main_loop;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
