use pkg_types::{Quantity, ResourceKind};
use std::time::Duration;

/// Errors surfaced by quota admission, the quota store and status waits.
#[derive(Debug, thiserror::Error)]
pub enum QuotaError {
    /// Admitting the object would push `used` above `hard` for `resource`.
    #[error(
        "exceeded quota: {quota}, requested: {resource}={requested}, used: {resource}={used}, limited: {resource}={hard}"
    )]
    Exceeded {
        quota: String,
        resource: String,
        requested: Quantity,
        used: Quantity,
        hard: Quantity,
    },

    /// The quota has not been reconciled yet, so headroom is unknown.
    #[error("status unknown for quota: {quota}")]
    StatusUnknown { quota: String },

    /// An update tried to change a field that quota accounting depends on.
    #[error("{kind} {namespace}/{name}: field {field} is immutable")]
    Immutable {
        kind: ResourceKind,
        namespace: String,
        name: String,
        field: String,
    },

    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: ResourceKind,
        namespace: String,
        name: String,
    },

    #[error("{kind} {namespace}/{name} already exists")]
    AlreadyExists {
        kind: ResourceKind,
        namespace: String,
        name: String,
    },

    #[error("invalid {kind}: {message}")]
    Invalid { kind: ResourceKind, message: String },

    #[error("timed out after {timeout:?} waiting for quota {namespace}/{name}: {detail}")]
    WaitTimeout {
        namespace: String,
        name: String,
        timeout: Duration,
        detail: String,
    },

    #[error("wait for quota {namespace}/{name} was cancelled")]
    Cancelled { namespace: String, name: String },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl QuotaError {
    pub fn not_found(kind: ResourceKind, namespace: &str, name: &str) -> Self {
        QuotaError::NotFound {
            kind,
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    /// Short machine-readable reason, e.g. for API responses.
    pub fn reason(&self) -> &'static str {
        match self {
            QuotaError::Exceeded { .. } => "QuotaExceeded",
            QuotaError::StatusUnknown { .. } => "QuotaStatusUnknown",
            QuotaError::Immutable { .. } => "FieldImmutable",
            QuotaError::NotFound { .. } => "NotFound",
            QuotaError::AlreadyExists { .. } => "AlreadyExists",
            QuotaError::Invalid { .. } => "Invalid",
            QuotaError::WaitTimeout { .. } => "Timeout",
            QuotaError::Cancelled { .. } => "Cancelled",
            QuotaError::Store(_) => "InternalError",
        }
    }

    /// Remaining headroom (`hard - used`) for a quota rejection.
    pub fn headroom(&self) -> Option<Quantity> {
        match self {
            QuotaError::Exceeded { used, hard, .. } => Some(*hard - *used),
            _ => None,
        }
    }

    /// How far the request overshoots the ceiling.
    pub fn shortfall(&self) -> Option<Quantity> {
        match self {
            QuotaError::Exceeded {
                requested,
                used,
                hard,
                ..
            } => Some(*used + *requested - *hard),
            _ => None,
        }
    }
}
