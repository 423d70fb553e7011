//! State store key layout and event log constants.

/// Root of every object key: `/registry/{plural}/{namespace}/{name}`.
pub const REGISTRY_PREFIX: &str = "/registry/";

/// Prefix for cluster-scoped namespace objects.
pub const NAMESPACES_PREFIX: &str = "/registry/namespaces/";

/// Capacity of the broadcast channel feeding event subscribers.
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Number of write-lock stripes guarding read-modify-write sequences.
pub const KEY_LOCK_STRIPES: usize = 64;
