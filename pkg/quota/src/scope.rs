//! Scope matching: which tracked objects a scoped quota sees.

use std::collections::BTreeSet;

use pkg_constants::quota::{RESOURCE_CPU, RESOURCE_MEMORY};
use pkg_types::{Quantity, QuotaScope, TrackedObject};

const COMPUTE_RESOURCES: &[&str] = &[RESOURCE_CPU, RESOURCE_MEMORY];

pub fn matches(scope: QuotaScope, object: &TrackedObject) -> bool {
    match scope {
        QuotaScope::Terminating => is_terminating(object),
        QuotaScope::NotTerminating => !is_terminating(object),
        QuotaScope::BestEffort => is_best_effort(object),
        QuotaScope::NotBestEffort => !is_best_effort(object),
    }
}

/// AND of every scope; an empty set matches everything.
pub fn matches_all(scopes: &BTreeSet<QuotaScope>, object: &TrackedObject) -> bool {
    scopes.iter().all(|scope| matches(*scope, object))
}

fn is_terminating(object: &TrackedObject) -> bool {
    object.active_deadline_seconds().is_some()
}

fn is_best_effort(object: &TrackedObject) -> bool {
    object.containers().iter().all(|c| {
        COMPUTE_RESOURCES.iter().all(|r| {
            c.resources.requests.get(*r).is_none_or(Quantity::is_zero)
                && c.resources.limits.get(*r).is_none_or(Quantity::is_zero)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::tests::{container, pod, service};
    use pkg_types::service::ServiceType;

    const ALL_SCOPES: [QuotaScope; 4] = [
        QuotaScope::Terminating,
        QuotaScope::NotTerminating,
        QuotaScope::BestEffort,
        QuotaScope::NotBestEffort,
    ];

    fn matching(object: &TrackedObject) -> Vec<QuotaScope> {
        ALL_SCOPES
            .into_iter()
            .filter(|s| matches(*s, object))
            .collect()
    }

    #[test]
    fn long_running_burstable_pod() {
        let p = pod(
            "web",
            vec![container(&[("cpu", "500m")], &[("memory", "400Mi")])],
        );
        assert_eq!(
            matching(&TrackedObject::Pod(p)),
            vec![QuotaScope::NotTerminating, QuotaScope::NotBestEffort]
        );
    }

    #[test]
    fn terminating_best_effort_pod() {
        let mut p = pod("batch", vec![container(&[], &[])]);
        p.spec.active_deadline_seconds = Some(3600);
        assert_eq!(
            matching(&TrackedObject::Pod(p)),
            vec![QuotaScope::Terminating, QuotaScope::BestEffort]
        );
    }

    #[test]
    fn explicit_zero_is_still_best_effort() {
        let p = pod("zero", vec![container(&[("cpu", "0")], &[("memory", "0Mi")])]);
        assert!(matches(QuotaScope::BestEffort, &TrackedObject::Pod(p)));
    }

    #[test]
    fn limits_alone_make_a_pod_not_best_effort() {
        let p = pod("limited", vec![container(&[], &[("cpu", "1")])]);
        assert!(matches(QuotaScope::NotBestEffort, &TrackedObject::Pod(p)));
    }

    #[test]
    fn each_object_matches_exactly_one_of_each_pair() {
        let mut terminating = pod("t", vec![container(&[("memory", "1Gi")], &[])]);
        terminating.spec.active_deadline_seconds = Some(60);
        let objects = vec![
            TrackedObject::Pod(pod("a", vec![])),
            TrackedObject::Pod(terminating),
            TrackedObject::Service(service("s", ServiceType::NodePort)),
        ];
        for object in &objects {
            assert_ne!(
                matches(QuotaScope::Terminating, object),
                matches(QuotaScope::NotTerminating, object)
            );
            assert_ne!(
                matches(QuotaScope::BestEffort, object),
                matches(QuotaScope::NotBestEffort, object)
            );
        }
    }

    #[test]
    fn scope_sets_are_conjunctions() {
        let object = TrackedObject::Pod(pod("web", vec![container(&[("cpu", "1")], &[])]));
        assert!(matches_all(&BTreeSet::new(), &object));
        assert!(matches_all(
            &BTreeSet::from([QuotaScope::NotTerminating, QuotaScope::NotBestEffort]),
            &object
        ));
        assert!(!matches_all(
            &BTreeSet::from([QuotaScope::NotTerminating, QuotaScope::BestEffort]),
            &object
        ));
    }
}
