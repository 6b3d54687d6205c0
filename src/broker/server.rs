//! Broker: client-facing coordinator
//!
//! Owns the node list, the replication factor k, and the replica placement
//! map. Bulk-indexes the record stream at startup, then serves an
//! interactive command loop. GET and QUERY fan out to every known node
//! concurrently and reconcile the responses; DELETE walks the nodes
//! sequentially and aborts on the first failure; a replica found to be
//! missing a record it was assigned is repaired in the background.

use crate::broker::client::NodeClient;
use crate::broker::ingest::Record;
use crate::broker::placement::{select_replicas, ReplicaPlacement};
use crate::common::{Command, Error, Response, Result};
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Outcome of a fanned-out read (GET or QUERY).
#[derive(Debug, Clone)]
pub struct ReadReport {
    /// Nodes that answered with the record.
    pub available: usize,
    /// True when `available` fell below the replication factor.
    pub shortfall: bool,
    /// First value-bearing response in node order, if any.
    pub value: Option<String>,
}

pub struct Broker {
    nodes: Vec<String>,
    replication: usize,
    client: NodeClient,
    placement: Mutex<ReplicaPlacement>,
}

impl Broker {
    pub fn new(nodes: Vec<String>, replication: usize, timeout: Duration) -> Result<Self> {
        if replication == 0 {
            return Err(Error::InvalidConfig(
                "replication factor must be at least 1".into(),
            ));
        }
        if nodes.len() < replication {
            return Err(Error::InsufficientNodes {
                needed: replication,
                available: nodes.len(),
            });
        }
        Ok(Self {
            nodes,
            replication,
            client: NodeClient::new(timeout),
            placement: Mutex::new(ReplicaPlacement::new()),
        })
    }

    pub fn replication_factor(&self) -> usize {
        self.replication
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    /// Nodes recorded as holding `key`, if it is indexed.
    pub fn replicas(&self, key: &str) -> Option<Vec<String>> {
        self.placement
            .lock()
            .unwrap()
            .replicas(key)
            .map(<[String]>::to_vec)
    }

    /// Bulk-index a record stream: each record goes to k randomly chosen
    /// nodes, and the chosen set is recorded. A PUT that fails on one node
    /// is logged and skipped — replication is best-effort, not atomic.
    pub async fn index_records(&self, records: &[Record]) -> Result<()> {
        tracing::info!(
            "indexing {} records across {} nodes (k={})",
            records.len(),
            self.nodes.len(),
            self.replication
        );

        for record in records {
            let chosen = select_replicas(&self.nodes, self.replication)?;
            self.placement
                .lock()
                .unwrap()
                .assign(record.key.clone(), chosen.clone());

            let command = Command::Put {
                key: record.key.clone(),
                value: record.value.clone(),
            };
            for node in &chosen {
                match self.client.send(node, &command).await {
                    Ok(Response::Ok) => {}
                    Ok(reply) => tracing::warn!(
                        "indexing '{}' on node {} got unexpected reply: {}",
                        record.key,
                        node,
                        reply
                    ),
                    Err(e) => {
                        tracing::warn!("indexing '{}' on node {} failed: {}", record.key, node, e)
                    }
                }
            }
        }
        Ok(())
    }

    /// Send one command to every known node concurrently, preserving node
    /// order in the result.
    async fn fanout(&self, command: &Command) -> Vec<(String, Result<Response>)> {
        let round_trips = self.nodes.iter().map(|node| {
            let client = self.client.clone();
            let node = node.clone();
            let command = command.clone();
            async move {
                let result = client.send(&node, &command).await;
                (node, result)
            }
        });
        futures_util::future::join_all(round_trips).await
    }

    fn reconcile(&self, responses: &[(String, Result<Response>)]) -> ReadReport {
        let mut available = 0;
        let mut value = None;
        for (node, result) in responses {
            match result {
                Ok(Response::Value(payload)) => {
                    available += 1;
                    if value.is_none() {
                        value = Some(payload.clone());
                    }
                }
                Ok(Response::NotFound) => {}
                Ok(reply) => tracing::warn!("node {} answered: {}", node, reply),
                Err(e) if e.is_unavailable() => {
                    tracing::warn!("node {} unavailable: {}", node, e)
                }
                Err(e) => tracing::warn!("node {} failed: {}", node, e),
            }
        }
        let shortfall = available < self.replication;
        if shortfall {
            tracing::warn!(
                "only {} of {} required replicas answered",
                available,
                self.replication
            );
        }
        ReadReport {
            available,
            shortfall,
            value,
        }
    }

    /// Fan a GET out to every node. The first value in node order wins
    /// (accepted weak-consistency tradeoff); an assigned replica that
    /// answered `NOTFOUND` is repaired in the background.
    pub async fn get(&self, key: &str) -> ReadReport {
        let command = Command::Get {
            key: key.to_string(),
        };
        let responses = self.fanout(&command).await;
        let report = self.reconcile(&responses);
        self.repair_degraded(key, &responses);
        report
    }

    /// Fan a QUERY out to every node.
    pub async fn query(&self, key: &str, fields: &[String]) -> ReadReport {
        let command = Command::Query {
            key: key.to_string(),
            fields: fields.to_vec(),
        };
        let responses = self.fanout(&command).await;
        self.reconcile(&responses)
    }

    /// A node that is in the key's replica set but reported the record
    /// absent has lost data it should hold. Re-send the value from another
    /// assigned node's response, fire-and-forget: the outcome is logged but
    /// not re-verified within this request.
    fn repair_degraded(&self, key: &str, responses: &[(String, Result<Response>)]) {
        let assigned = match self.replicas(key) {
            Some(assigned) => assigned,
            None => return,
        };

        let source = responses.iter().find_map(|(node, result)| match result {
            Ok(Response::Value(payload)) if assigned.contains(node) => Some(payload.clone()),
            _ => None,
        });
        let Some(value) = source else {
            // no assigned node holds the record any more; nothing to copy
            return;
        };

        for (node, result) in responses {
            if !matches!(result, Ok(Response::NotFound)) || !assigned.contains(node) {
                continue;
            }
            tracing::warn!("node {} is missing assigned record '{}', repairing", node, key);
            let client = self.client.clone();
            let node = node.clone();
            let command = Command::Put {
                key: key.to_string(),
                value: value.clone(),
            };
            tokio::spawn(async move {
                match client.send(&node, &command).await {
                    Ok(Response::Ok) => {
                        tracing::info!("repaired '{}' on node {}", command.key(), node)
                    }
                    Ok(reply) => tracing::warn!(
                        "repair of '{}' on node {} got unexpected reply: {}",
                        command.key(),
                        node,
                        reply
                    ),
                    Err(e) => {
                        tracing::warn!("repair of '{}' on node {} failed: {}", command.key(), node, e)
                    }
                }
            });
        }
    }

    /// Delete from every node, sequentially. The first node that fails
    /// aborts the whole operation — nodes already deleted from are now
    /// inconsistent with the rest (accepted limitation, no rollback) and
    /// the placement entry is kept. `NOTFOUND` counts as success on that
    /// node.
    pub async fn delete(&self, key: &str) -> Result<()> {
        let command = Command::Delete {
            key: key.to_string(),
        };
        for node in &self.nodes {
            match self.client.send(node, &command).await {
                Ok(Response::Ok) | Ok(Response::NotFound) => {}
                Ok(reply) => {
                    return Err(Error::DeleteAborted {
                        node: node.clone(),
                        reason: format!("unexpected reply: {}", reply),
                    })
                }
                Err(e) => {
                    return Err(Error::DeleteAborted {
                        node: node.clone(),
                        reason: e.to_string(),
                    })
                }
            }
        }
        self.placement.lock().unwrap().remove(key);
        Ok(())
    }

    /// Interactive command surface: GET, DELETE, QUERY; everything else is
    /// rejected. Runs until stdin closes.
    pub async fn run_repl(&self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            prompt()?;
            let Some(line) = lines.next_line().await? else {
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            self.execute_line(line).await;
        }
        Ok(())
    }

    async fn execute_line(&self, line: &str) {
        match Command::parse(line) {
            Ok(Command::Get { key }) => {
                let report = self.get(&key).await;
                print_read_report(&report);
            }
            Ok(Command::Query { key, fields }) => {
                let report = self.query(&key, &fields).await;
                print_read_report(&report);
            }
            Ok(Command::Delete { key }) => match self.delete(&key).await {
                Ok(()) => println!("Key deleted successfully from all nodes."),
                Err(e) => println!("ERROR: {}. Deletion aborted.", e),
            },
            // PUT is issued by indexing and repair, not interactively
            Ok(Command::Put { .. }) | Err(_) => println!("Invalid command."),
        }
    }
}

fn print_read_report(report: &ReadReport) {
    println!("Available nodes: {}", report.available);
    if report.shortfall {
        println!("WARNING: Fewer than k nodes available. Results may be inconsistent.");
    }
    match &report.value {
        Some(value) => println!("{}", value),
        None => println!("NOTFOUND"),
    }
}

fn prompt() -> Result<()> {
    use std::io::Write;
    print!("Enter command: ");
    std::io::stdout().flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_list(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("127.0.0.1:{}", 7100 + i)).collect()
    }

    #[test]
    fn test_new_validates_replication() {
        assert!(Broker::new(node_list(3), 2, Duration::from_secs(1)).is_ok());
        assert!(Broker::new(node_list(3), 3, Duration::from_secs(1)).is_ok());
        assert!(matches!(
            Broker::new(node_list(2), 3, Duration::from_secs(1)),
            Err(Error::InsufficientNodes { .. })
        ));
        assert!(matches!(
            Broker::new(node_list(2), 0, Duration::from_secs(1)),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_reconcile_counts_values_only() {
        let broker = Broker::new(node_list(3), 2, Duration::from_secs(1)).unwrap();
        let responses = vec![
            ("a".to_string(), Ok(Response::Value("{\"x\":1}".into()))),
            ("b".to_string(), Ok(Response::NotFound)),
            (
                "c".to_string(),
                Err(Error::Timeout {
                    node: "c".to_string(),
                }),
            ),
        ];

        let report = broker.reconcile(&responses);
        assert_eq!(report.available, 1);
        assert!(report.shortfall);
        assert_eq!(report.value.as_deref(), Some("{\"x\":1}"));
    }

    #[test]
    fn test_reconcile_first_value_wins() {
        let broker = Broker::new(node_list(3), 2, Duration::from_secs(1)).unwrap();
        let responses = vec![
            ("a".to_string(), Ok(Response::Value("first".into()))),
            ("b".to_string(), Ok(Response::Value("second".into()))),
        ];

        let report = broker.reconcile(&responses);
        assert_eq!(report.available, 2);
        assert!(!report.shortfall);
        assert_eq!(report.value.as_deref(), Some("first"));
    }
}
