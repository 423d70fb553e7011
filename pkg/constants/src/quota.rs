//! Resource quota constants: resource names, reconciliation and wait defaults.

// ─── Object counts ─────────────────────────────────────────────────────────

pub const RESOURCE_PODS: &str = "pods";
pub const RESOURCE_SERVICES: &str = "services";
pub const RESOURCE_SERVICES_NODE_PORTS: &str = "services.nodeports";
pub const RESOURCE_SERVICES_LOAD_BALANCERS: &str = "services.loadbalancers";
pub const RESOURCE_REPLICA_SETS: &str = "replicasets";
pub const RESOURCE_QUOTAS: &str = "resourcequotas";
pub const RESOURCE_SECRETS: &str = "secrets";
pub const RESOURCE_CONFIG_MAPS: &str = "configmaps";
pub const RESOURCE_PERSISTENT_VOLUME_CLAIMS: &str = "persistentvolumeclaims";

// ─── Compute and storage ───────────────────────────────────────────────────

/// Alias of `requests.cpu`.
pub const RESOURCE_CPU: &str = "cpu";
/// Alias of `requests.memory`.
pub const RESOURCE_MEMORY: &str = "memory";
pub const RESOURCE_REQUESTS_CPU: &str = "requests.cpu";
pub const RESOURCE_REQUESTS_MEMORY: &str = "requests.memory";
pub const RESOURCE_LIMITS_CPU: &str = "limits.cpu";
pub const RESOURCE_LIMITS_MEMORY: &str = "limits.memory";
pub const RESOURCE_REQUESTS_STORAGE: &str = "requests.storage";

/// Key of the storage request inside a claim's `requests` list.
pub const STORAGE: &str = "storage";

/// Every resource name a quota may declare in `spec.hard`.
pub const STANDARD_QUOTA_RESOURCES: &[&str] = &[
    RESOURCE_PODS,
    RESOURCE_SERVICES,
    RESOURCE_SERVICES_NODE_PORTS,
    RESOURCE_SERVICES_LOAD_BALANCERS,
    RESOURCE_REPLICA_SETS,
    RESOURCE_QUOTAS,
    RESOURCE_SECRETS,
    RESOURCE_CONFIG_MAPS,
    RESOURCE_PERSISTENT_VOLUME_CLAIMS,
    RESOURCE_CPU,
    RESOURCE_MEMORY,
    RESOURCE_REQUESTS_CPU,
    RESOURCE_REQUESTS_MEMORY,
    RESOURCE_LIMITS_CPU,
    RESOURCE_LIMITS_MEMORY,
    RESOURCE_REQUESTS_STORAGE,
];

/// Resource names a scoped quota may track (pod resources only).
pub const SCOPED_QUOTA_RESOURCES: &[&str] = &[
    RESOURCE_PODS,
    RESOURCE_CPU,
    RESOURCE_MEMORY,
    RESOURCE_REQUESTS_CPU,
    RESOURCE_REQUESTS_MEMORY,
    RESOURCE_LIMITS_CPU,
    RESOURCE_LIMITS_MEMORY,
];

// ─── Reconciliation ────────────────────────────────────────────────────────

/// Full resync sweep interval of the quota controller, in seconds.
pub const QUOTA_RESYNC_INTERVAL_SECS: u64 = 30;

/// Number of namespaces the quota controller syncs concurrently.
pub const QUOTA_SYNC_WORKERS: usize = 5;

// ─── Waiting on status ─────────────────────────────────────────────────────

/// How long a caller waits for quota status to converge, in seconds.
pub const QUOTA_WAIT_TIMEOUT_SECS: u64 = 30;

/// Poll interval while waiting on quota status, in milliseconds.
pub const QUOTA_WAIT_POLL_MILLIS: u64 = 2000;
