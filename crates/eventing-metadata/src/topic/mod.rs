mod spec;
mod status;

pub use spec::*;
pub use status::*;

pub type TopicObj = crate::core::MetadataStoreObject<TopicSpec>;

mod convert {

    use crate::core::{Spec, Status};
    use super::*;

    impl Spec for TopicSpec {
        const KIND: &'static str = "Topic";
        const API_VERSION: &'static str = "pubsub.cloud.run/v1alpha1";

        type Status = TopicStatus;
    }

    impl Status for TopicStatus {}
}
