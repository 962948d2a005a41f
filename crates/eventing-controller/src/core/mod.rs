mod clock;
mod context;

pub use clock::*;
pub use context::*;
