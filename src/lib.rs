//! # triekv
//!
//! A minimal distributed key-value store:
//! - trie-indexed in-memory storage nodes
//! - a broker that replicates each record to k randomly chosen nodes
//! - availability accounting with an explicit below-k warning
//! - best-effort repair of replicas that lost assigned records
//! - a dot-path query language over nested record values
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │                 Broker                  │
//! │  - replica placement (key -> k nodes)   │
//! │  - GET/QUERY fan-out to all nodes       │
//! │  - sequential DELETE, repair            │
//! └───────────┬─────────────────────────────┘
//!             │ line protocol over TCP
//!   ┌─────────┴──────────┬──────────────┐
//!   │                    │              │
//! ┌─▼──────────┐   ┌─────▼──────┐   ┌──▼───────────┐
//! │ Node 1     │   │ Node 2     │   │ Node 3       │
//! │ (trie)     │   │ (trie)     │   │ (trie)       │
//! └────────────┘   └────────────┘   └──────────────┘
//! ```
//!
//! Consistency is explicitly best-effort: replicas may diverge when a PUT
//! fails partway, and the broker reports this through the availability
//! count rather than preventing it. There is no consensus, no transaction,
//! no linearizability.
//!
//! ## Usage
//!
//! ### Start storage nodes
//! ```bash
//! triekv-node --bind 127.0.0.1:7001
//! triekv-node --bind 127.0.0.1:7002
//! ```
//!
//! ### Start the broker
//! ```bash
//! triekv-broker serve \
//!   --servers ./serverFile.txt \
//!   --data ./dataToIndex.txt \
//!   -k 2
//! ```
//!
//! ### Interactive commands
//! ```text
//! GET person1
//! QUERY person1.address.city
//! DELETE person1
//! ```

pub mod broker;
pub mod common;
pub mod node;

// Re-export commonly used types
pub use broker::Broker;
pub use common::{Config, Error, Result};
pub use node::StorageNode;

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
