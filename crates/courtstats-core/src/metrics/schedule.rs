// Dependency ordering for metric groups (Kahn's algorithm, ties broken by
// registration order).

use std::collections::{BTreeSet, HashMap, HashSet};

use super::{MetricGroup, MetricsError};

pub(super) fn plan(groups: &[MetricGroup]) -> Result<Vec<usize>, MetricsError> {
    let mut producer: HashMap<&str, usize> = HashMap::new();
    for (i, group) in groups.iter().enumerate() {
        for column in &group.produces {
            if let Some(&j) = producer.get(column.as_str()) {
                return Err(MetricsError::DuplicateProducer {
                    column: column.clone(),
                    first: groups[j].name.clone(),
                    second: group.name.clone(),
                });
            }
            producer.insert(column, i);
        }
    }

    let mut successors: Vec<HashSet<usize>> = vec![HashSet::new(); groups.len()];
    let mut indegree = vec![0usize; groups.len()];
    for (i, group) in groups.iter().enumerate() {
        for column in &group.requires {
            if let Some(&j) = producer.get(column.as_str()) {
                if j != i && successors[j].insert(i) {
                    indegree[i] += 1;
                }
            }
        }
    }

    let mut ready: BTreeSet<usize> = (0..groups.len()).filter(|&i| indegree[i] == 0).collect();
    let mut order = Vec::with_capacity(groups.len());
    while let Some(i) = ready.pop_first() {
        order.push(i);
        for &k in &successors[i] {
            indegree[k] -= 1;
            if indegree[k] == 0 {
                ready.insert(k);
            }
        }
    }

    if order.len() < groups.len() {
        let stuck = (0..groups.len())
            .filter(|&i| indegree[i] > 0)
            .map(|i| groups[i].name.clone())
            .collect();
        return Err(MetricsError::Cycle(stuck));
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(name: &str, requires: &[&str], produces: &[&str]) -> MetricGroup {
        MetricGroup::new(name, requires, produces, |_, _| Ok(()))
    }

    #[test]
    fn independent_groups_keep_registration_order() {
        let groups = vec![noop("a", &["x"], &["a"]), noop("b", &["y"], &["b"])];
        assert_eq!(plan(&groups).unwrap(), vec![0, 1]);
    }

    #[test]
    fn consumer_waits_for_producer() {
        let groups = vec![
            noop("consumer", &["p"], &["c"]),
            noop("producer", &["raw"], &["p"]),
        ];
        assert_eq!(plan(&groups).unwrap(), vec![1, 0]);
    }

    #[test]
    fn cycle_is_reported() {
        let groups = vec![noop("a", &["b"], &["a"]), noop("b", &["a"], &["b"])];
        match plan(&groups).unwrap_err() {
            MetricsError::Cycle(names) => assert_eq!(names, vec!["a", "b"]),
            other => panic!("expected Cycle, got: {other}"),
        }
    }

    #[test]
    fn duplicate_producer_is_rejected() {
        let groups = vec![noop("a", &[], &["x"]), noop("b", &[], &["x"])];
        assert!(matches!(
            plan(&groups).unwrap_err(),
            MetricsError::DuplicateProducer { .. }
        ));
    }
}
