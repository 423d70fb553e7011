//! Filesystem path constants.

/// Default config file path for the quota server.
pub const DEFAULT_SERVER_CONFIG: &str = "/etc/k3rs/quota.yaml";

/// Default data directory for the server state store.
pub const DEFAULT_SERVER_DATA_DIR: &str = "/tmp/k3rs-quota-data";

/// Default API listen port.
pub const DEFAULT_SERVER_PORT: u16 = 6443;
