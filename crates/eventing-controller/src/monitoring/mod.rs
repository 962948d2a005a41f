mod events;
mod stats;

pub use events::*;
pub use stats::*;
