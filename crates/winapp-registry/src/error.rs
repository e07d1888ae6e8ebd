use std::fmt;

use thiserror::Error;
use winapp_core::{AppId, AttributeType};

use crate::store::StoreError;

/// Part of a view an operation was working on when it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Root,
    App(AppId),
    Value { id: AppId, name: String },
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => f.write_str("the registry root"),
            Self::App(id) => write!(f, "application \"{id}\""),
            Self::Value { id, name } => write!(f, "value \"{name}\" of application \"{id}\""),
        }
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("missing application architecture")]
    MissingArchitecture,
    #[error("unrecognized application architecture: {0}")]
    UnrecognizedArchitecture(String),
    #[error("missing application scope")]
    MissingScope,
    #[error("unrecognized application scope: {0}")]
    UnrecognizedScope(String),
    #[error("invalid application id \"{id}\": {reason}")]
    InvalidId { id: AppId, reason: &'static str },
    #[error("application \"{id}\" already exists in the {view} application registry")]
    AlreadyExists { view: &'static str, id: AppId },
    #[error("application \"{id}\" was not found in the {view} application registry")]
    NotFound { view: &'static str, id: AppId },
    #[error("insufficient access to {target} in the {view} application registry")]
    InsufficientAccess {
        view: &'static str,
        target: Target,
        #[source]
        source: StoreError,
    },
    #[error("malformed value \"{name}\" for application \"{id}\" in the {view} application registry: {reason}")]
    MalformedValue {
        view: &'static str,
        id: AppId,
        name: String,
        reason: String,
    },
    #[error("unsupported type '{kind}' for attribute \"{name}\" of application \"{id}\" in the {view} application registry")]
    UnsupportedAttributeType {
        view: &'static str,
        id: AppId,
        name: String,
        kind: AttributeType,
    },
    #[error("failed to {action} {target} in the {view} application registry")]
    Store {
        view: &'static str,
        action: &'static str,
        target: Target,
        #[source]
        source: StoreError,
    },
}

impl RegistryError {
    /// Classifies a store failure. A missing application key becomes
    /// [`RegistryError::NotFound`] and denied rights become
    /// [`RegistryError::InsufficientAccess`].
    pub(crate) fn from_store(
        view: &'static str,
        action: &'static str,
        target: Target,
        source: StoreError,
    ) -> Self {
        match (source, target) {
            (StoreError::NotFound, Target::App(id)) => Self::NotFound { view, id },
            (StoreError::AccessDenied, target) => Self::InsufficientAccess {
                view,
                target,
                source: StoreError::AccessDenied,
            },
            (source, target) => Self::Store {
                view,
                action,
                target,
                source,
            },
        }
    }
}
