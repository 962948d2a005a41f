pub mod defaults;
pub mod macros;
pub mod config_file;

#[cfg(feature = "events")]
pub mod event;

//
// Types
//
pub type Uid = String;
pub type Generation = i64;
pub type ResourceVersion = u64;
pub type Reason = String;

// Channel
pub type ChannelName = String;
pub type TopicId = String;
pub type ProjectId = String;
