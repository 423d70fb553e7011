use anyhow::{Result, bail};

use crate::object::ObjectMeta;
use crate::pod::Pod;
use crate::quota::{ResourceList, ResourceQuota};
use crate::volume::PersistentVolumeClaim;
use pkg_constants::quota::{SCOPED_QUOTA_RESOURCES, STANDARD_QUOTA_RESOURCES};

/// Validate a Kubernetes-style resource name.
/// Rules: lowercase `[a-z0-9-]`, max 63 chars, no leading/trailing hyphens.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        bail!("name must not be empty");
    }
    if name.len() > 63 {
        bail!("name '{}' exceeds 63 characters (got {})", name, name.len());
    }
    if name.starts_with('-') || name.ends_with('-') {
        bail!("name '{}' must not start or end with a hyphen", name);
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        bail!(
            "name '{}' must contain only lowercase letters, digits, and hyphens [a-z0-9-]",
            name
        );
    }
    Ok(())
}

/// Validate the name and namespace of a namespaced object.
pub fn validate_meta(meta: &ObjectMeta) -> Result<()> {
    validate_name(&meta.name)?;
    validate_name(&meta.namespace)
        .map_err(|e| anyhow::anyhow!("invalid namespace: {}", e))?;
    Ok(())
}

/// Validate a quota at creation or update time.
///
/// Hard keys must be known resource names with non-negative values. A scoped
/// quota may only declare pod resources, since only pods carry the fields
/// scopes are evaluated on.
pub fn validate_quota(quota: &ResourceQuota) -> Result<()> {
    validate_meta(&quota.meta)?;
    for (name, value) in &quota.spec.hard {
        if !STANDARD_QUOTA_RESOURCES.contains(&name.as_str()) {
            bail!("spec.hard: unsupported resource name '{}'", name);
        }
        if value.is_negative() {
            bail!("spec.hard[{}]: must be non-negative (got {})", name, value);
        }
        if !quota.spec.scopes.is_empty() && !SCOPED_QUOTA_RESOURCES.contains(&name.as_str()) {
            bail!(
                "spec.hard[{}]: resource is not tracked by scoped quotas (scopes: {:?})",
                name,
                quota.spec.scopes
            );
        }
    }
    Ok(())
}

/// Validate a pod: at least one named container, non-negative compute
/// quantities and a positive deadline when one is set.
pub fn validate_pod(pod: &Pod) -> Result<()> {
    validate_meta(&pod.meta)?;
    if pod.spec.containers.is_empty() {
        bail!("spec.containers: must not be empty");
    }
    for (i, container) in pod.spec.containers.iter().enumerate() {
        validate_name(&container.name)
            .map_err(|e| anyhow::anyhow!("spec.containers[{}].name: {}", i, e))?;
        non_negative(
            &format!("spec.containers[{}].resources.requests", i),
            &container.resources.requests,
        )?;
        non_negative(
            &format!("spec.containers[{}].resources.limits", i),
            &container.resources.limits,
        )?;
    }
    if let Some(deadline) = pod.spec.active_deadline_seconds
        && deadline <= 0
    {
        bail!(
            "spec.active_deadline_seconds: must be positive (got {})",
            deadline
        );
    }
    Ok(())
}

pub fn validate_claim(claim: &PersistentVolumeClaim) -> Result<()> {
    validate_meta(&claim.meta)?;
    non_negative("requests", &claim.requests)
}

fn non_negative(field: &str, list: &ResourceList) -> Result<()> {
    match list.iter().find(|(_, value)| value.is_negative()) {
        Some((name, value)) => bail!("{}[{}]: must be non-negative (got {})", field, name, value),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quota::{QuotaScope, parse_resource_list};

    #[test]
    fn valid_names() {
        assert!(validate_name("nginx").is_ok());
        assert!(validate_name("my-app").is_ok());
        assert!(validate_name("app-123").is_ok());
        assert!(validate_name("a").is_ok());
        assert!(validate_name("a-b-c-d").is_ok());
    }

    #[test]
    fn invalid_names() {
        assert!(validate_name("").is_err());
        assert!(validate_name("My-App").is_err());
        assert!(validate_name("my_app").is_err());
        assert!(validate_name("-leading").is_err());
        assert!(validate_name("trailing-").is_err());
        assert!(validate_name("special!char").is_err());
        assert!(validate_name(&"a".repeat(64)).is_err());
    }

    #[test]
    fn quota_hard_names_and_values() {
        let hard = parse_resource_list(&[("pods", "5"), ("requests.storage", "10Gi")]).unwrap();
        assert!(validate_quota(&ResourceQuota::new("team-a", "quota", hard)).is_ok());

        let unknown = parse_resource_list(&[("gpus", "1")]).unwrap();
        assert!(validate_quota(&ResourceQuota::new("team-a", "quota", unknown)).is_err());

        let negative = parse_resource_list(&[("cpu", "-1")]).unwrap();
        assert!(validate_quota(&ResourceQuota::new("team-a", "quota", negative)).is_err());

        let hard = parse_resource_list(&[("pods", "1")]).unwrap();
        assert!(validate_quota(&ResourceQuota::new("", "quota", hard)).is_err());
    }

    #[test]
    fn scoped_quota_tracks_pod_resources_only() {
        let pods = parse_resource_list(&[("pods", "5"), ("requests.cpu", "1")]).unwrap();
        let quota = ResourceQuota::new("team-a", "q", pods).with_scopes([QuotaScope::Terminating]);
        assert!(validate_quota(&quota).is_ok());

        let services = parse_resource_list(&[("services", "5")]).unwrap();
        let quota =
            ResourceQuota::new("team-a", "q", services).with_scopes([QuotaScope::BestEffort]);
        assert!(validate_quota(&quota).is_err());
    }

    #[test]
    fn pods_need_containers_and_sane_values() {
        use crate::pod::{ContainerSpec, PodSpec, PodStatus, ResourceRequirements};
        use std::collections::HashMap;

        let container = |cpu: &str| ContainerSpec {
            name: "app".to_string(),
            image: "nginx:1.27".to_string(),
            command: vec![],
            args: vec![],
            env: HashMap::new(),
            resources: ResourceRequirements {
                requests: parse_resource_list(&[("cpu", cpu)]).unwrap(),
                limits: Default::default(),
            },
        };
        let mut pod = Pod {
            meta: ObjectMeta::new("team-a", "web"),
            spec: PodSpec {
                containers: vec![container("250m")],
                active_deadline_seconds: None,
                node_affinity: HashMap::new(),
            },
            status: PodStatus::Pending,
            node_name: None,
            owner_ref: None,
        };
        assert!(validate_pod(&pod).is_ok());

        pod.spec.active_deadline_seconds = Some(0);
        assert!(validate_pod(&pod).is_err());
        pod.spec.active_deadline_seconds = Some(30);
        assert!(validate_pod(&pod).is_ok());

        pod.spec.containers = vec![container("-1")];
        let err = validate_pod(&pod).unwrap_err().to_string();
        assert!(err.contains("requests[cpu]"), "{err}");

        pod.spec.containers.clear();
        assert!(validate_pod(&pod).is_err());
    }
}
