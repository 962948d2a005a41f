//!
//! # Object metadata shared by every resource kind
//!
//! Identity (namespace/name, uid), ownership, labels and the generic
//! spec + status envelope stored by the metadata client.
//!
use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Debug;
use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use eventing_types::{Generation, ResourceVersion, Uid};

/// Desired state of a resource kind
pub trait Spec:
    Serialize + DeserializeOwned + Debug + Clone + PartialEq + Send + Sync + 'static
{
    const KIND: &'static str;
    const API_VERSION: &'static str;

    type Status: Status;
}

/// Observed state, written only by controllers
pub trait Status:
    Serialize + DeserializeOwned + Debug + Clone + Default + PartialEq + Send + Sync + 'static
{
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("unexpected key format: {0:?}")]
    InvalidFormat(String),
}

/// Reconcile key: namespace + name
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}/{}", self.namespace, self.name)
        }
    }
}

/// `name` or `namespace/name`
impl FromStr for ObjectKey {
    type Err = KeyError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = key.split('/').collect();
        match parts.as_slice() {
            [name] if !name.is_empty() => Ok(Self::new("", *name)),
            [namespace, name] if !name.is_empty() => Ok(Self::new(*namespace, *name)),
            _ => Err(KeyError::InvalidFormat(key.to_owned())),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub uid: Uid,
    #[serde(default)]
    pub controller: bool,
    #[serde(default)]
    pub block_owner_deletion: bool,
}

impl OwnerReference {
    /// reference that marks `owner` as the managing controller
    pub fn controller_of<S: Spec>(owner: &MetadataStoreObject<S>) -> Self {
        Self {
            api_version: S::API_VERSION.to_owned(),
            kind: S::KIND.to_owned(),
            name: owner.metadata.name.clone(),
            uid: owner.metadata.uid.clone(),
            controller: true,
            block_owner_deletion: true,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectMeta {
    pub name: String,
    pub namespace: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub uid: Uid,
    pub generation: Generation,
    pub resource_version: ResourceVersion,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub owner_references: Vec<OwnerReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_timestamp: Option<DateTime<Utc>>,
}

impl ObjectMeta {
    pub fn new<S>(name: S, namespace: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.namespace.clone(), self.name.clone())
    }

    pub fn is_being_deleted(&self) -> bool {
        self.deletion_timestamp.is_some()
    }

    pub fn set_labels<T: Into<String>>(mut self, labels: Vec<(T, T)>) -> Self {
        for (key, value) in labels {
            self.labels.insert(key.into(), value.into());
        }
        self
    }

    /// owner reference flagged as controller, at most one is honored
    pub fn controller(&self) -> Option<&OwnerReference> {
        self.owner_references.iter().find(|owner| owner.controller)
    }

    pub fn is_controlled_by(&self, owner_uid: &str) -> bool {
        self.controller()
            .map(|owner| owner.uid == owner_uid)
            .unwrap_or(false)
    }
}

/// true if `child` names `parent_uid` as its controlling owner
pub fn is_controlled_by(child: &ObjectMeta, parent_uid: &str) -> bool {
    child.is_controlled_by(parent_uid)
}

/// equality selector over labels
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    pub match_labels: BTreeMap<String, String>,
}

impl LabelSelector {
    pub fn new_labels<T: Into<String>>(labels: Vec<(T, T)>) -> Self {
        Self {
            match_labels: labels
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }

    /// empty selector matches everything
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.match_labels
            .iter()
            .all(|(key, value)| labels.get(key) == Some(value))
    }
}

impl Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terms: Vec<String> = self
            .match_labels
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        write!(f, "{}", terms.join(","))
    }
}

/// Pointer to an object, carried by events
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ObjectReference {
    pub kind: &'static str,
    pub namespace: String,
    pub name: String,
    pub uid: Uid,
}

impl Display for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}

/// Key inside a secret holding credentials
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecretKeySelector {
    pub name: String,
    pub key: String,
}

impl SecretKeySelector {
    pub fn new(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
        }
    }
}

impl Display for SecretKeySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.name, self.key)
    }
}

/// Endpoint where a resource accepts events
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Addressable {
    pub url: String,
}

impl Addressable {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Spec and status of a resource together with its metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "S: Spec", rename_all = "camelCase")]
pub struct MetadataStoreObject<S: Spec> {
    pub metadata: ObjectMeta,
    pub spec: S,
    #[serde(default)]
    pub status: S::Status,
}

impl<S: Spec> MetadataStoreObject<S> {
    pub fn new(metadata: ObjectMeta, spec: S, status: S::Status) -> Self {
        Self {
            metadata,
            spec,
            status,
        }
    }

    /// object with default status
    pub fn with_spec(namespace: &str, name: &str, spec: S) -> Self {
        Self::new(ObjectMeta::new(name, namespace), spec, S::Status::default())
    }

    pub fn with_meta(mut self, metadata: ObjectMeta) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn key(&self) -> ObjectKey {
        self.metadata.key()
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn namespace(&self) -> &str {
        &self.metadata.namespace
    }

    pub fn uid(&self) -> &Uid {
        &self.metadata.uid
    }

    pub fn spec(&self) -> &S {
        &self.spec
    }

    pub fn status(&self) -> &S::Status {
        &self.status
    }

    pub fn set_status(&mut self, status: S::Status) {
        self.status = status;
    }

    pub fn is_being_deleted(&self) -> bool {
        self.metadata.is_being_deleted()
    }

    pub fn object_ref(&self) -> ObjectReference {
        ObjectReference {
            kind: S::KIND,
            namespace: self.metadata.namespace.clone(),
            name: self.metadata.name.clone(),
            uid: self.metadata.uid.clone(),
        }
    }
}

/// change notification delivered by a store watch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "S: Spec", tag = "type", content = "object")]
pub enum WatchEvent<S: Spec> {
    Added(MetadataStoreObject<S>),
    Modified(MetadataStoreObject<S>),
    Deleted(MetadataStoreObject<S>),
}

impl<S: Spec> WatchEvent<S> {
    pub fn object(&self) -> &MetadataStoreObject<S> {
        match self {
            Self::Added(obj) | Self::Modified(obj) | Self::Deleted(obj) => obj,
        }
    }

    pub fn into_object(self) -> MetadataStoreObject<S> {
        match self {
            Self::Added(obj) | Self::Modified(obj) | Self::Deleted(obj) => obj,
        }
    }
}
