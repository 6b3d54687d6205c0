//! Replica placement bookkeeping
//!
//! At indexing time every record is assigned to k nodes drawn uniformly at
//! random, without replacement, from the full node list. The assignment is
//! recorded here and consulted only by the repair path — reads still fan
//! out to every known node.

use crate::common::{Error, Result};
use rand::seq::SliceRandom;
use std::collections::HashMap;

/// Which nodes were assigned each top-level key at write time.
#[derive(Debug, Default)]
pub struct ReplicaPlacement {
    assignments: HashMap<String, Vec<String>>,
}

impl ReplicaPlacement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&mut self, key: impl Into<String>, nodes: Vec<String>) {
        self.assignments.insert(key.into(), nodes);
    }

    pub fn replicas(&self, key: &str) -> Option<&[String]> {
        self.assignments.get(key).map(Vec::as_slice)
    }

    pub fn is_assigned(&self, key: &str, node: &str) -> bool {
        self.assignments
            .get(key)
            .is_some_and(|nodes| nodes.iter().any(|n| n == node))
    }

    /// Drop a key's assignment (after a fully successful DELETE).
    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.assignments.remove(key)
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

/// Draw k distinct nodes uniformly at random from the full list.
pub fn select_replicas(nodes: &[String], k: usize) -> Result<Vec<String>> {
    if nodes.len() < k {
        return Err(Error::InsufficientNodes {
            needed: k,
            available: nodes.len(),
        });
    }
    let mut rng = rand::thread_rng();
    Ok(nodes.choose_multiple(&mut rng, k).cloned().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn node_list(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("127.0.0.1:{}", 7000 + i)).collect()
    }

    #[test]
    fn test_select_exactly_k_distinct() {
        let nodes = node_list(5);

        for _ in 0..50 {
            let chosen = select_replicas(&nodes, 3).unwrap();
            assert_eq!(chosen.len(), 3);
            let distinct: HashSet<&String> = chosen.iter().collect();
            assert_eq!(distinct.len(), 3);
            assert!(chosen.iter().all(|n| nodes.contains(n)));
        }
    }

    #[test]
    fn test_select_whole_list() {
        let nodes = node_list(2);
        let chosen = select_replicas(&nodes, 2).unwrap();
        let distinct: HashSet<&String> = chosen.iter().collect();
        assert_eq!(distinct.len(), 2);
    }

    #[test]
    fn test_select_insufficient_nodes() {
        let nodes = node_list(2);
        assert!(matches!(
            select_replicas(&nodes, 3),
            Err(Error::InsufficientNodes {
                needed: 3,
                available: 2
            })
        ));
    }

    #[test]
    fn test_assignment_bookkeeping() {
        let mut placement = ReplicaPlacement::new();
        placement.assign("person1", node_list(2));

        assert!(placement.is_assigned("person1", "127.0.0.1:7000"));
        assert!(!placement.is_assigned("person1", "127.0.0.1:7009"));
        assert!(!placement.is_assigned("person2", "127.0.0.1:7000"));
        assert_eq!(placement.replicas("person1").unwrap().len(), 2);
        assert_eq!(placement.len(), 1);

        placement.remove("person1");
        assert!(placement.is_empty());
        assert!(placement.replicas("person1").is_none());
    }
}
