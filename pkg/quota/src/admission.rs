use tracing::{debug, info};

use pkg_types::{ResourceList, ResourceQuota, TrackedObject};

use crate::error::QuotaError;
use crate::evaluator::{changed_tracked_field, evaluate};
use crate::resources::{increments, mask, subtract};
use crate::scope::matches_all;
use crate::store::QuotaStore;

/// Kind of mutation being admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Create => write!(f, "create"),
            Operation::Update => write!(f, "update"),
            Operation::Delete => write!(f, "delete"),
        }
    }
}

/// Gate for mutations of tracked objects.
///
/// Checks the increment an object would add against the last reconciled
/// `status.used` of every quota that selects it. Admission never writes
/// quota status; the quota controller is the system of record for usage.
#[derive(Clone)]
pub struct QuotaAdmission {
    quotas: QuotaStore,
}

impl QuotaAdmission {
    pub fn new(quotas: QuotaStore) -> Self {
        Self { quotas }
    }

    /// Admit or reject `object`. `old` is the stored version for an update.
    pub async fn admit(
        &self,
        op: Operation,
        object: &TrackedObject,
        old: Option<&TrackedObject>,
    ) -> Result<(), QuotaError> {
        let delta = match (op, old) {
            // Releasing resources never needs headroom
            (Operation::Delete, _) => return Ok(()),
            (Operation::Update, Some(old)) => {
                if let Some(field) = changed_tracked_field(old, object) {
                    info!(
                        "Rejecting update of {} {}/{}: {} changed",
                        object.kind(),
                        object.namespace(),
                        object.name(),
                        field
                    );
                    return Err(QuotaError::Immutable {
                        kind: object.kind(),
                        namespace: object.namespace().to_string(),
                        name: object.name().to_string(),
                        field,
                    });
                }
                subtract(&evaluate(object), &evaluate(old))
            }
            // An update with no stored version is charged like a create
            (Operation::Create | Operation::Update, _) => evaluate(object),
        };

        let delta = increments(delta);
        if delta.is_empty() {
            return Ok(());
        }

        let namespace = object.namespace();
        let quotas = self.quotas.list(namespace).await?;
        for quota in quotas
            .iter()
            .filter(|q| !q.meta.is_deleting())
            .filter(|q| matches_all(&q.spec.scopes, object))
        {
            if let Err(e) = check_quota(quota, &delta) {
                info!(
                    "Rejecting {} of {} {}/{}: {}",
                    op,
                    object.kind(),
                    namespace,
                    object.name(),
                    e
                );
                return Err(e);
            }
        }

        debug!(
            "Admitted {} of {} {}/{}",
            op,
            object.kind(),
            namespace,
            object.name()
        );
        Ok(())
    }
}

/// Check one quota against an increment.
///
/// Only resources the quota declares are checked. A quota the controller has
/// not reconciled yet rejects any increment it would have to account for.
pub fn check_quota(quota: &ResourceQuota, delta: &ResourceList) -> Result<(), QuotaError> {
    let relevant = mask(delta, quota.spec.hard.keys());
    if relevant.is_empty() {
        return Ok(());
    }
    let Some(used) = &quota.status.used else {
        return Err(QuotaError::StatusUnknown {
            quota: quota.meta.name.clone(),
        });
    };
    for (resource, requested) in &relevant {
        let hard = quota.spec.hard[resource];
        let current = used.get(resource).copied().unwrap_or_default();
        if current + *requested > hard {
            return Err(QuotaError::Exceeded {
                quota: quota.meta.name.clone(),
                resource: resource.clone(),
                requested: *requested,
                used: current,
                hard,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::tests::{claim, container, list, pod, service};
    use chrono::Utc;
    use pkg_state::client::StateStore;
    use pkg_types::service::ServiceType;
    use pkg_types::{Object, QuotaScope};

    async fn setup(quotas: Vec<ResourceQuota>) -> QuotaAdmission {
        let store = StateStore::in_memory().await.unwrap();
        for q in &quotas {
            store.put_json(&q.key(), q).await.unwrap();
        }
        QuotaAdmission::new(QuotaStore::new(store))
    }

    fn reconciled(name: &str, hard: &[(&str, &str)], used: &[(&str, &str)]) -> ResourceQuota {
        let mut quota = ResourceQuota::new("team-a", name, list(hard));
        quota.status.hard = quota.spec.hard.clone();
        quota.status.used = Some(list(used));
        quota
    }

    #[tokio::test]
    async fn rejects_pod_that_exceeds_cpu() {
        let admission = setup(vec![reconciled(
            "compute",
            &[("cpu", "500m"), ("memory", "252Mi")],
            &[("cpu", "0"), ("memory", "0")],
        )])
        .await;

        let big = pod("big", vec![container(&[("cpu", "600m")], &[])]);
        let err = admission
            .admit(Operation::Create, &TrackedObject::Pod(big), None)
            .await
            .unwrap_err();
        match &err {
            QuotaError::Exceeded {
                quota, resource, ..
            } => {
                assert_eq!(quota, "compute");
                assert_eq!(resource, "cpu");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(err.shortfall(), Some("100m".parse().unwrap()));

        let fits = pod(
            "fits",
            vec![container(&[("cpu", "500m"), ("memory", "252Mi")], &[])],
        );
        admission
            .admit(Operation::Create, &TrackedObject::Pod(fits), None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn checks_against_existing_usage() {
        let admission = setup(vec![reconciled(
            "counts",
            &[("pods", "2"), ("services.nodeports", "1")],
            &[("pods", "2"), ("services.nodeports", "0")],
        )])
        .await;

        let err = admission
            .admit(Operation::Create, &TrackedObject::Pod(pod("third", vec![])), None)
            .await
            .unwrap_err();
        assert!(matches!(err, QuotaError::Exceeded { ref resource, .. } if resource == "pods"));

        // Not declared by the quota, so nothing to check
        let claim = TrackedObject::PersistentVolumeClaim(claim("data", "10Gi"));
        admission.admit(Operation::Create, &claim, None).await.unwrap();

        let node_port = TrackedObject::Service(service("np", ServiceType::NodePort));
        admission.admit(Operation::Create, &node_port, None).await.unwrap();
    }

    #[tokio::test]
    async fn unreconciled_quota_rejects_relevant_increments() {
        let admission = setup(vec![ResourceQuota::new(
            "team-a",
            "fresh",
            list(&[("pods", "10")]),
        )])
        .await;

        let err = admission
            .admit(Operation::Create, &TrackedObject::Pod(pod("web", vec![])), None)
            .await
            .unwrap_err();
        assert!(matches!(err, QuotaError::StatusUnknown { ref quota } if quota == "fresh"));

        let svc = TrackedObject::Service(service("svc", ServiceType::ClusterIP));
        admission.admit(Operation::Create, &svc, None).await.unwrap();
    }

    #[tokio::test]
    async fn only_matching_scopes_are_consulted() {
        let terminating = reconciled("terminating", &[("requests.cpu", "1")], &[("requests.cpu", "0")])
            .with_scopes([QuotaScope::Terminating]);
        let long_running = reconciled(
            "not-terminating",
            &[("requests.cpu", "1")],
            &[("requests.cpu", "800m")],
        )
        .with_scopes([QuotaScope::NotTerminating]);
        let admission = setup(vec![terminating, long_running]).await;

        let mut batch = pod("batch", vec![container(&[("cpu", "500m")], &[])]);
        batch.spec.active_deadline_seconds = Some(3600);
        admission
            .admit(Operation::Create, &TrackedObject::Pod(batch), None)
            .await
            .unwrap();

        let web = pod("web", vec![container(&[("cpu", "500m")], &[])]);
        let err = admission
            .admit(Operation::Create, &TrackedObject::Pod(web), None)
            .await
            .unwrap_err();
        assert!(matches!(err, QuotaError::Exceeded { ref quota, .. } if quota == "not-terminating"));
    }

    #[tokio::test]
    async fn updates_changing_tracked_fields_are_immutable() {
        // Plenty of headroom: the rejection is structural
        let admission = setup(vec![reconciled(
            "compute",
            &[("cpu", "100")],
            &[("cpu", "0")],
        )])
        .await;

        let old = pod("web", vec![container(&[("cpu", "100m")], &[])]);
        let mut new = old.clone();
        new.spec.containers[0].resources.requests = list(&[("cpu", "200m")]);
        let err = admission
            .admit(
                Operation::Update,
                &TrackedObject::Pod(new),
                Some(&TrackedObject::Pod(old.clone())),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, QuotaError::Immutable { ref field, .. } if field == "spec.containers[0].resources"));

        let mut relabeled = old.clone();
        relabeled.meta.labels.insert("tier".to_string(), "web".to_string());
        admission
            .admit(
                Operation::Update,
                &TrackedObject::Pod(relabeled),
                Some(&TrackedObject::Pod(old)),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn deletes_and_releases_are_always_admitted() {
        let admission = setup(vec![reconciled("full", &[("pods", "1")], &[("pods", "5")])]).await;
        let web = pod("web", vec![]);
        admission
            .admit(Operation::Delete, &TrackedObject::Pod(web.clone()), None)
            .await
            .unwrap();

        // Marking a pod for deletion only releases resources
        let mut deleting = web.clone();
        deleting.meta.deletion_timestamp = Some(Utc::now());
        admission
            .admit(
                Operation::Update,
                &TrackedObject::Pod(deleting),
                Some(&TrackedObject::Pod(web)),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn quotas_being_deleted_are_ignored() {
        let mut quota = reconciled("old", &[("pods", "0")], &[("pods", "0")]);
        quota.meta.deletion_timestamp = Some(Utc::now());
        let admission = setup(vec![quota]).await;
        admission
            .admit(Operation::Create, &TrackedObject::Pod(pod("web", vec![])), None)
            .await
            .unwrap();
    }

    #[test]
    fn check_quota_ignores_undeclared_resources() {
        let quota = reconciled("mem", &[("memory", "1Gi")], &[("memory", "1Gi")]);
        assert!(check_quota(&quota, &list(&[("cpu", "4")])).is_ok());
        assert!(check_quota(&quota, &list(&[("memory", "1")])).is_err());
    }
}
