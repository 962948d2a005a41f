mod spec;
mod status;

pub use spec::*;
pub use status::*;

pub type PullSubscriptionObj = crate::core::MetadataStoreObject<PullSubscriptionSpec>;

mod convert {

    use crate::core::{Spec, Status};
    use super::*;

    impl Spec for PullSubscriptionSpec {
        const KIND: &'static str = "PullSubscription";
        const API_VERSION: &'static str = "pubsub.cloud.run/v1alpha1";

        type Status = PullSubscriptionStatus;
    }

    impl Status for PullSubscriptionStatus {}
}
