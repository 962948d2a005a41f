pub mod core;
pub mod condition;
pub mod channel;
pub mod topic;
pub mod subscription;

pub mod store {
    pub use crate::core::{MetadataStoreObject, WatchEvent};
}
