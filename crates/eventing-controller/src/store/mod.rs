//!
//! # Object store client
//!
//! Access to the consistent store holding channels and their owned
//! resources. Writes use optimistic concurrency on `resource_version`.
//!
mod index;
mod manifest;
mod memory;

pub use index::*;
pub use manifest::*;
pub use memory::*;

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use thiserror::Error;

use eventing_metadata::core::{LabelSelector, MetadataStoreObject, ObjectKey, Spec, WatchEvent};
use eventing_types::ResourceVersion;

pub type SharedClient<C> = Arc<C>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} {key} not found")]
    NotFound { kind: &'static str, key: ObjectKey },
    #[error("{kind} {key} already exists")]
    AlreadyExists { kind: &'static str, key: ObjectKey },
    #[error("conflict writing {kind} {key}: version {submitted} is stale, current is {current}")]
    Conflict {
        kind: &'static str,
        key: ObjectKey,
        submitted: ResourceVersion,
        current: ResourceVersion,
    },
    #[error("invalid object: {0}")]
    InvalidObject(String),
    #[error("Yaml serialization error: {0}")]
    SerdeYaml(#[from] serde_yaml::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn not_found<S: Spec>(key: &ObjectKey) -> Self {
        Self::NotFound {
            kind: S::KIND,
            key: key.clone(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

#[async_trait]
pub trait MetadataClient: Debug + Send + Sync {
    /// fetch a single object from the store, bypassing any cache
    async fn retrieve_item<S>(&self, key: &ObjectKey) -> Result<MetadataStoreObject<S>, StoreError>
    where
        S: Spec;

    /// list objects in `namespace` whose labels match `selector`,
    /// an empty namespace lists across all namespaces
    async fn retrieve_items<S>(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<Vec<MetadataStoreObject<S>>, StoreError>
    where
        S: Spec;

    async fn create_item<S>(
        &self,
        value: MetadataStoreObject<S>,
    ) -> Result<MetadataStoreObject<S>, StoreError>
    where
        S: Spec;

    /// replace status only, `value.metadata.resource_version` must be current
    async fn update_status<S>(
        &self,
        value: MetadataStoreObject<S>,
    ) -> Result<MetadataStoreObject<S>, StoreError>
    where
        S: Spec;

    /// replace spec, labels and annotations, `value.metadata.resource_version` must be current
    async fn update_spec<S>(
        &self,
        value: MetadataStoreObject<S>,
    ) -> Result<MetadataStoreObject<S>, StoreError>
    where
        S: Spec;

    async fn delete_item<S>(&self, key: &ObjectKey) -> Result<(), StoreError>
    where
        S: Spec;

    /// changes made after this call returns
    async fn watch_stream<S>(&self) -> BoxStream<'static, Result<WatchEvent<S>, StoreError>>
    where
        S: Spec;
}
