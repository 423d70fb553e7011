//! Arithmetic over ResourceLists.

use pkg_types::{Quantity, ResourceList};

/// Sum of two lists; keys missing on one side count as zero.
pub fn add(a: &ResourceList, b: &ResourceList) -> ResourceList {
    let mut result = a.clone();
    for (name, value) in b {
        *result.entry(name.clone()).or_default() += *value;
    }
    result
}

/// `a - b` over the union of keys.
pub fn subtract(a: &ResourceList, b: &ResourceList) -> ResourceList {
    let mut result = a.clone();
    for (name, value) in b {
        *result.entry(name.clone()).or_default() -= *value;
    }
    result
}

/// Keep only the entries named in `names`.
pub fn mask<'a>(list: &ResourceList, names: impl IntoIterator<Item = &'a String>) -> ResourceList {
    names
        .into_iter()
        .filter_map(|name| list.get(name).map(|value| (name.clone(), *value)))
        .collect()
}

/// A list with a zero entry for every name.
pub fn zeros<'a>(names: impl IntoIterator<Item = &'a String>) -> ResourceList {
    names
        .into_iter()
        .map(|name| (name.clone(), Quantity::zero()))
        .collect()
}

/// Positive entries only. Decrements never need a quota check.
pub fn increments(list: ResourceList) -> ResourceList {
    list.into_iter().filter(|(_, q)| q.is_positive()).collect()
}

/// First entry of `expected` that `actual` does not hold with an equal value.
pub fn first_mismatch(actual: &ResourceList, expected: &ResourceList) -> Option<String> {
    expected.iter().find_map(|(name, want)| match actual.get(name) {
        Some(got) if got == want => None,
        Some(got) => Some(format!("resource {}, expected {}, actual {}", name, want, got)),
        None => Some(format!("resource {}, expected {}, actual <absent>", name, want)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkg_types::quota::parse_resource_list;

    fn list(pairs: &[(&str, &str)]) -> ResourceList {
        parse_resource_list(pairs).unwrap()
    }

    #[test]
    fn add_and_subtract_over_union() {
        let a = list(&[("cpu", "500m"), ("pods", "1")]);
        let b = list(&[("cpu", "250m"), ("memory", "1Gi")]);
        assert_eq!(
            add(&a, &b),
            list(&[("cpu", "750m"), ("pods", "1"), ("memory", "1Gi")])
        );
        assert_eq!(
            subtract(&a, &b),
            list(&[("cpu", "250m"), ("pods", "1"), ("memory", "-1Gi")])
        );
    }

    #[test]
    fn mask_zeros_and_increments() {
        let hard = list(&[("cpu", "1"), ("pods", "5")]);
        let usage = list(&[("cpu", "100m"), ("memory", "1Mi")]);
        assert_eq!(mask(&usage, hard.keys()), list(&[("cpu", "100m")]));
        assert_eq!(zeros(hard.keys()), list(&[("cpu", "0"), ("pods", "0")]));
        assert_eq!(
            increments(list(&[("cpu", "-1"), ("pods", "1"), ("memory", "0")])),
            list(&[("pods", "1")])
        );
    }

    #[test]
    fn first_mismatch_names_the_resource() {
        let used = list(&[("cpu", "1100m"), ("pods", "2")]);
        assert_eq!(first_mismatch(&used, &list(&[("pods", "2")])), None);
        assert!(
            first_mismatch(&used, &list(&[("cpu", "1")]))
                .unwrap()
                .contains("expected 1, actual 1100m")
        );
        assert!(first_mismatch(&used, &list(&[("memory", "0")])).is_some());
    }
}
