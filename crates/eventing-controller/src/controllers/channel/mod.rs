//!
//! # Channel controller
//!
//! Keeps one topic and one pull subscription per subscriber for every
//! channel, and reports their progress on the channel status.
//!
mod actions;
mod conditions;
mod controller;
mod reconciler;
mod status;
mod subscribers;
mod topic;

pub use actions::*;
pub use conditions::*;
pub use controller::*;
pub use reconciler::*;
pub use status::*;
pub use subscribers::*;
pub use topic::*;
