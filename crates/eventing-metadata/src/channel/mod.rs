mod spec;
mod status;

pub use spec::*;
pub use status::*;

pub type ChannelObj = crate::core::MetadataStoreObject<ChannelSpec>;

mod convert {

    use crate::core::{Spec, Status};
    use super::*;

    impl Spec for ChannelSpec {
        const KIND: &'static str = "Channel";
        const API_VERSION: &'static str = "events.cloud.run/v1alpha1";

        type Status = ChannelStatus;
    }

    impl Status for ChannelStatus {}
}
