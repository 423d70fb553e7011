use serde::{Deserialize, Serialize};

/// Quota server configuration file (YAML).
///
/// Example `quota.yaml`:
/// ```yaml
/// port: 6443
/// data-dir: /var/lib/k3rs/quota
/// resync-interval-secs: 30
/// sync-workers: 5
/// log-format: json
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfigFile {
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default, alias = "data-dir")]
    pub data_dir: Option<String>,
    /// Interval of the full quota resync sweep.
    #[serde(default, alias = "resync-interval-secs")]
    pub resync_interval_secs: Option<u64>,
    /// Namespaces synced concurrently by the quota controller.
    #[serde(default, alias = "sync-workers")]
    pub sync_workers: Option<usize>,
    /// `text` (default) or `json`.
    #[serde(default, alias = "log-format")]
    pub log_format: Option<String>,
}

/// Load a YAML config file, returning the default if the file doesn't exist.
pub fn load_config_file<T: serde::de::DeserializeOwned + Default>(path: &str) -> anyhow::Result<T> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(T::default());
        }
        Err(e) => return Err(e.into()),
    };
    let config: T = serde_yaml::from_str(&content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let cfg: ServerConfigFile = load_config_file("/nonexistent/k3rs/quota.yaml").unwrap();
        assert!(cfg.port.is_none());
        assert!(cfg.resync_interval_secs.is_none());
    }

    #[test]
    fn parses_dashed_keys() {
        let cfg: ServerConfigFile =
            serde_yaml::from_str("port: 7000\ndata-dir: /tmp/q\nresync-interval-secs: 5\nsync-workers: 2\n")
                .unwrap();
        assert_eq!(cfg.port, Some(7000));
        assert_eq!(cfg.data_dir.as_deref(), Some("/tmp/q"));
        assert_eq!(cfg.resync_interval_secs, Some(5));
        assert_eq!(cfg.sync_workers, Some(2));
    }
}
