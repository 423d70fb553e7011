//! Usage evaluation: what a single object contributes to each quota resource.
//!
//! Everything here is pure. The controller sums `evaluate` over the live
//! population of a namespace; admission evaluates the incoming object (and the
//! stored version on update) to get the increment it must fit.

use std::collections::BTreeSet;

use pkg_constants::quota::*;
use pkg_types::pod::{ContainerSpec, Pod, ResourceRequirements};
use pkg_types::service::{Service, ServiceType};
use pkg_types::volume::PersistentVolumeClaim;
use pkg_types::{Quantity, ResourceKind, ResourceList, TrackedObject};

const POD_RESOURCES: &[&str] = &[
    RESOURCE_PODS,
    RESOURCE_CPU,
    RESOURCE_MEMORY,
    RESOURCE_REQUESTS_CPU,
    RESOURCE_REQUESTS_MEMORY,
    RESOURCE_LIMITS_CPU,
    RESOURCE_LIMITS_MEMORY,
];

const SERVICE_RESOURCES: &[&str] = &[
    RESOURCE_SERVICES,
    RESOURCE_SERVICES_NODE_PORTS,
    RESOURCE_SERVICES_LOAD_BALANCERS,
];

const PVC_RESOURCES: &[&str] = &[RESOURCE_PERSISTENT_VOLUME_CLAIMS, RESOURCE_REQUESTS_STORAGE];

/// Resource names an object of `kind` can contribute to.
pub fn tracked_resources(kind: ResourceKind) -> &'static [&'static str] {
    match kind {
        ResourceKind::Pod => POD_RESOURCES,
        ResourceKind::Service => SERVICE_RESOURCES,
        ResourceKind::Secret => &[RESOURCE_SECRETS],
        ResourceKind::ConfigMap => &[RESOURCE_CONFIG_MAPS],
        ResourceKind::ReplicaSet => &[RESOURCE_REPLICA_SETS],
        ResourceKind::PersistentVolumeClaim => PVC_RESOURCES,
        ResourceKind::ResourceQuota => &[RESOURCE_QUOTAS],
    }
}

/// Kinds that must be listed to compute usage for the given hard resource names.
pub fn kinds_for<'a>(names: impl IntoIterator<Item = &'a String>) -> BTreeSet<ResourceKind> {
    let names: Vec<&String> = names.into_iter().collect();
    ResourceKind::ALL
        .into_iter()
        .filter(|kind| {
            tracked_resources(*kind)
                .iter()
                .any(|r| names.iter().any(|n| n.as_str() == *r))
        })
        .collect()
}

/// Whether the object currently holds resources.
///
/// Objects marked for deletion stop counting immediately; pods also stop
/// counting once they reach a terminal phase.
pub fn is_live(object: &TrackedObject) -> bool {
    if object.meta().is_deleting() {
        return false;
    }
    match object {
        TrackedObject::Pod(pod) => !pod.status.is_terminal(),
        _ => true,
    }
}

/// Full contribution of one object. Empty for objects that are not live.
pub fn evaluate(object: &TrackedObject) -> ResourceList {
    if !is_live(object) {
        return ResourceList::new();
    }
    match object {
        TrackedObject::Pod(pod) => pod_usage(pod),
        TrackedObject::Service(service) => service_usage(service),
        TrackedObject::PersistentVolumeClaim(claim) => claim_usage(claim),
        TrackedObject::Secret(_) => count(RESOURCE_SECRETS),
        TrackedObject::ConfigMap(_) => count(RESOURCE_CONFIG_MAPS),
        TrackedObject::ReplicaSet(_) => count(RESOURCE_REPLICA_SETS),
        TrackedObject::ResourceQuota(_) => count(RESOURCE_QUOTAS),
    }
}

fn count(name: &str) -> ResourceList {
    ResourceList::from([(name.to_string(), Quantity::from_int(1))])
}

/// Sum of one compute resource across containers; unset counts as zero.
fn sum_compute(
    containers: &[ContainerSpec],
    side: fn(&ResourceRequirements) -> &ResourceList,
    resource: &str,
) -> Quantity {
    containers
        .iter()
        .filter_map(|c| side(&c.resources).get(resource).copied())
        .sum()
}

fn requests(r: &ResourceRequirements) -> &ResourceList {
    &r.requests
}

fn limits(r: &ResourceRequirements) -> &ResourceList {
    &r.limits
}

fn pod_usage(pod: &Pod) -> ResourceList {
    let containers = &pod.spec.containers;
    let requests_cpu = sum_compute(containers, requests, RESOURCE_CPU);
    let requests_memory = sum_compute(containers, requests, RESOURCE_MEMORY);

    ResourceList::from([
        (RESOURCE_PODS.to_string(), Quantity::from_int(1)),
        (RESOURCE_CPU.to_string(), requests_cpu),
        (RESOURCE_REQUESTS_CPU.to_string(), requests_cpu),
        (RESOURCE_MEMORY.to_string(), requests_memory),
        (RESOURCE_REQUESTS_MEMORY.to_string(), requests_memory),
        (
            RESOURCE_LIMITS_CPU.to_string(),
            sum_compute(containers, limits, RESOURCE_CPU),
        ),
        (
            RESOURCE_LIMITS_MEMORY.to_string(),
            sum_compute(containers, limits, RESOURCE_MEMORY),
        ),
    ])
}

fn service_usage(service: &Service) -> ResourceList {
    let flag = |on: bool| Quantity::from_int(i64::from(on));
    ResourceList::from([
        (RESOURCE_SERVICES.to_string(), Quantity::from_int(1)),
        (
            RESOURCE_SERVICES_NODE_PORTS.to_string(),
            flag(service.spec.service_type == ServiceType::NodePort),
        ),
        (
            RESOURCE_SERVICES_LOAD_BALANCERS.to_string(),
            flag(service.spec.service_type == ServiceType::LoadBalancer),
        ),
    ])
}

fn claim_usage(claim: &PersistentVolumeClaim) -> ResourceList {
    let storage = claim.requests.get(STORAGE).copied().unwrap_or_default();
    ResourceList::from([
        (
            RESOURCE_PERSISTENT_VOLUME_CLAIMS.to_string(),
            Quantity::from_int(1),
        ),
        (RESOURCE_REQUESTS_STORAGE.to_string(), storage),
    ])
}

/// First quota-relevant field that differs between two versions of an object.
///
/// These fields decide what an object is charged and which scoped quotas see
/// it, so they are fixed once the object exists.
pub fn changed_tracked_field(old: &TrackedObject, new: &TrackedObject) -> Option<String> {
    match (old, new) {
        (TrackedObject::Pod(old), TrackedObject::Pod(new)) => {
            if old.spec.containers.len() != new.spec.containers.len() {
                return Some("spec.containers".to_string());
            }
            let changed = old
                .spec
                .containers
                .iter()
                .zip(&new.spec.containers)
                .position(|(a, b)| a.resources != b.resources);
            if let Some(index) = changed {
                return Some(format!("spec.containers[{}].resources", index));
            }
            (old.spec.active_deadline_seconds != new.spec.active_deadline_seconds)
                .then(|| "spec.active_deadline_seconds".to_string())
        }
        (TrackedObject::Service(old), TrackedObject::Service(new)) => (old.spec.service_type
            != new.spec.service_type)
            .then(|| "spec.service_type".to_string()),
        (TrackedObject::PersistentVolumeClaim(old), TrackedObject::PersistentVolumeClaim(new)) => {
            (old.requests != new.requests).then(|| "requests".to_string())
        }
        (TrackedObject::ResourceQuota(old), TrackedObject::ResourceQuota(new)) => {
            (old.spec.scopes != new.spec.scopes).then(|| "spec.scopes".to_string())
        }
        _ if old.kind() != new.kind() => Some("kind".to_string()),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pkg_types::ObjectMeta;
    use pkg_types::pod::{PodSpec, PodStatus};
    use pkg_types::quota::parse_resource_list;
    use pkg_types::secret::Secret;
    use pkg_types::service::ServiceSpec;
    use std::collections::HashMap;

    pub(crate) fn list(pairs: &[(&str, &str)]) -> ResourceList {
        parse_resource_list(pairs).unwrap()
    }

    pub(crate) fn container(requests: &[(&str, &str)], limits: &[(&str, &str)]) -> ContainerSpec {
        ContainerSpec {
            name: "pause".to_string(),
            image: "pause:3.9".to_string(),
            command: vec![],
            args: vec![],
            env: HashMap::new(),
            resources: ResourceRequirements {
                requests: list(requests),
                limits: list(limits),
            },
        }
    }

    pub(crate) fn pod(name: &str, containers: Vec<ContainerSpec>) -> Pod {
        Pod {
            meta: ObjectMeta::new("team-a", name),
            spec: PodSpec {
                containers,
                active_deadline_seconds: None,
                node_affinity: HashMap::new(),
            },
            status: PodStatus::Pending,
            node_name: None,
            owner_ref: None,
        }
    }

    pub(crate) fn service(name: &str, service_type: ServiceType) -> Service {
        Service {
            meta: ObjectMeta::new("team-a", name),
            spec: ServiceSpec {
                selector: HashMap::new(),
                ports: vec![],
                service_type,
            },
            cluster_ip: None,
        }
    }

    pub(crate) fn claim(name: &str, storage: &str) -> PersistentVolumeClaim {
        PersistentVolumeClaim {
            meta: ObjectMeta::new("team-a", name),
            storage_class: None,
            access_modes: vec![],
            requests: list(&[(STORAGE, storage)]),
            phase: Default::default(),
        }
    }

    #[test]
    fn pod_sums_requests_and_limits_across_containers() {
        let p = pod(
            "web",
            vec![
                container(&[("cpu", "500m"), ("memory", "200Mi")], &[("cpu", "1")]),
                container(&[("cpu", "250m")], &[("memory", "400Mi")]),
            ],
        );
        let usage = evaluate(&TrackedObject::Pod(p));
        assert_eq!(
            usage,
            list(&[
                ("pods", "1"),
                ("cpu", "750m"),
                ("requests.cpu", "750m"),
                ("memory", "200Mi"),
                ("requests.memory", "200Mi"),
                ("limits.cpu", "1"),
                ("limits.memory", "400Mi"),
            ])
        );
    }

    #[test]
    fn unset_compute_counts_as_zero() {
        let usage = evaluate(&TrackedObject::Pod(pod("idle", vec![container(&[], &[])])));
        assert_eq!(usage["pods"], Quantity::from_int(1));
        assert!(usage["cpu"].is_zero());
        assert!(usage["limits.memory"].is_zero());
    }

    #[test]
    fn terminal_and_deleting_objects_contribute_nothing() {
        let mut done = pod("done", vec![container(&[("cpu", "1")], &[])]);
        done.status = PodStatus::Succeeded;
        assert!(evaluate(&TrackedObject::Pod(done)).is_empty());

        let mut leaving = service("svc", ServiceType::ClusterIP);
        leaving.meta.deletion_timestamp = Some(chrono::Utc::now());
        assert!(evaluate(&TrackedObject::Service(leaving)).is_empty());
    }

    #[test]
    fn services_count_by_subtype() {
        let node_port = evaluate(&TrackedObject::Service(service("np", ServiceType::NodePort)));
        assert_eq!(
            node_port,
            list(&[
                ("services", "1"),
                ("services.nodeports", "1"),
                ("services.loadbalancers", "0")
            ])
        );
        let lb = evaluate(&TrackedObject::Service(service("lb", ServiceType::LoadBalancer)));
        assert_eq!(lb["services.loadbalancers"], Quantity::from_int(1));
        assert!(lb["services.nodeports"].is_zero());
    }

    #[test]
    fn claims_report_storage_requests() {
        let usage = evaluate(&TrackedObject::PersistentVolumeClaim(claim("data", "1Gi")));
        assert_eq!(
            usage,
            list(&[("persistentvolumeclaims", "1"), ("requests.storage", "1Gi")])
        );
    }

    #[test]
    fn plain_counts() {
        let secret = Secret {
            meta: ObjectMeta::new("team-a", "token"),
            data: HashMap::new(),
        };
        assert_eq!(
            evaluate(&TrackedObject::Secret(secret)),
            list(&[("secrets", "1")])
        );
    }

    #[test]
    fn kinds_for_hard_names() {
        let hard = list(&[("cpu", "1"), ("requests.storage", "10Gi"), ("secrets", "3")]);
        let kinds: Vec<ResourceKind> = kinds_for(hard.keys()).into_iter().collect();
        assert_eq!(
            kinds,
            vec![
                ResourceKind::Pod,
                ResourceKind::Secret,
                ResourceKind::PersistentVolumeClaim
            ]
        );
        assert!(kinds_for(list(&[]).keys()).is_empty());
    }

    #[test]
    fn detects_changes_to_tracked_fields() {
        let before = pod("web", vec![container(&[("cpu", "500m")], &[])]);
        let mut relabeled = before.clone();
        relabeled
            .meta
            .labels
            .insert("tier".to_string(), "front".to_string());
        assert_eq!(
            changed_tracked_field(
                &TrackedObject::Pod(before.clone()),
                &TrackedObject::Pod(relabeled)
            ),
            None
        );

        // Same value, different spelling
        let mut respelled = before.clone();
        respelled.spec.containers[0].resources.requests = list(&[("cpu", "0.5")]);
        assert_eq!(
            changed_tracked_field(
                &TrackedObject::Pod(before.clone()),
                &TrackedObject::Pod(respelled)
            ),
            None
        );

        let mut resized = before.clone();
        resized.spec.containers[0].resources.requests = list(&[("cpu", "100m")]);
        assert_eq!(
            changed_tracked_field(
                &TrackedObject::Pod(before.clone()),
                &TrackedObject::Pod(resized)
            ),
            Some("spec.containers[0].resources".to_string())
        );

        let mut bounded = before.clone();
        bounded.spec.active_deadline_seconds = Some(3600);
        assert_eq!(
            changed_tracked_field(&TrackedObject::Pod(before), &TrackedObject::Pod(bounded)),
            Some("spec.active_deadline_seconds".to_string())
        );

        assert_eq!(
            changed_tracked_field(
                &TrackedObject::Service(service("s", ServiceType::ClusterIP)),
                &TrackedObject::Service(service("s", ServiceType::NodePort))
            ),
            Some("spec.service_type".to_string())
        );
    }
}
