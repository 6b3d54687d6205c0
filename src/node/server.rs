//! Storage node server
//!
//! Accepts connections forever and serves one task per client. Every
//! connection shares the node's single trie; PUT/DELETE take the write
//! lock, GET/QUERY the read lock, and nothing awaits while a lock is held.
//! Handler errors become `ERROR:` replies — they never tear down the
//! connection or the node.

use crate::common::{Command, NodeConfig, Response, Result, Value};
use crate::node::trie::Trie;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

type SharedTrie = Arc<RwLock<Trie>>;

pub struct StorageNode {
    listener: TcpListener,
    trie: SharedTrie,
}

impl StorageNode {
    /// Bind the listener up front so callers can learn the actual address
    /// (port 0 picks an ephemeral port).
    pub async fn bind(config: &NodeConfig) -> Result<Self> {
        let listener = TcpListener::bind(config.bind_addr.as_str()).await?;
        Ok(Self {
            listener,
            trie: Arc::new(RwLock::new(Trie::new())),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub async fn serve(self) -> Result<()> {
        tracing::info!("Storage node listening on {}", self.listener.local_addr()?);

        loop {
            let (stream, peer) = self.listener.accept().await?;
            tracing::debug!("accepted connection from {}", peer);
            let trie = self.trie.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_client(stream, trie).await {
                    tracing::warn!("connection from {} ended with error: {}", peer, e);
                }
            });
        }
    }
}

/// Serve one persistent client connection: one command line in, one reply
/// line out, until the peer closes or sends an empty line.
async fn handle_client(stream: TcpStream, trie: SharedTrie) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            break;
        }
        let reply = dispatch(&line, &trie);
        writer.write_all(reply.to_string().as_bytes()).await?;
        writer.write_all(b"\n").await?;
    }
    Ok(())
}

fn dispatch(line: &str, trie: &SharedTrie) -> Response {
    let command = match Command::parse(line) {
        Ok(command) => command,
        Err(e) => return Response::Error(e.to_string()),
    };

    match command {
        Command::Put { key, value } => {
            trie.write().unwrap().insert(&key, value);
            Response::Ok
        }
        Command::Get { key } => match trie.read().unwrap().search(&key) {
            Some(value) => Response::Value(value.to_string()),
            None => Response::NotFound,
        },
        Command::Delete { key } => {
            if trie.write().unwrap().delete(&key) {
                Response::Ok
            } else {
                Response::NotFound
            }
        }
        Command::Query { key, fields } => evaluate_query(trie, &key, &fields),
    }
}

/// QUERY path: look up the record, decode its flattened value, then walk
/// the dot-path. Absence at any step is `NOTFOUND`; a record that fails to
/// decode is an `ERROR:`.
fn evaluate_query(trie: &SharedTrie, key: &str, fields: &[String]) -> Response {
    // copy the value out so the lock is released before parsing
    let stored = trie.read().unwrap().search(key).map(str::to_string);
    let Some(stored) = stored else {
        return Response::NotFound;
    };

    let root = match Value::parse(&stored) {
        Ok(root) => root,
        Err(e) => return Response::Error(e.to_string()),
    };

    match root.descend(fields) {
        Some(resolved) => Response::Value(format!(
            "{}.{} : {}",
            key,
            fields.join("."),
            resolved.render_bare()
        )),
        None => Response::NotFound,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared() -> SharedTrie {
        Arc::new(RwLock::new(Trie::new()))
    }

    #[test]
    fn test_dispatch_put_get_delete() {
        let trie = shared();

        assert_eq!(dispatch("PUT person1 {\"age\":30}", &trie), Response::Ok);
        assert_eq!(
            dispatch("GET person1", &trie),
            Response::Value("{\"age\":30}".into())
        );
        assert_eq!(dispatch("DELETE person1", &trie), Response::Ok);
        assert_eq!(dispatch("GET person1", &trie), Response::NotFound);
        assert_eq!(dispatch("DELETE person1", &trie), Response::NotFound);
    }

    #[test]
    fn test_dispatch_query_nested() {
        let trie = shared();
        dispatch(
            "PUT person1 {\"age\":30;\"address\":{\"city\":\"X\"}}",
            &trie,
        );

        assert_eq!(
            dispatch("QUERY person1.address.city", &trie),
            Response::Value("person1.address.city : X".into())
        );
        assert_eq!(
            dispatch("QUERY person1.age", &trie),
            Response::Value("person1.age : 30".into())
        );
        assert_eq!(dispatch("QUERY person1.zzz", &trie), Response::NotFound);
        assert_eq!(
            dispatch("QUERY person1.age.more", &trie),
            Response::NotFound
        );
        assert_eq!(dispatch("QUERY person2.age", &trie), Response::NotFound);
    }

    #[test]
    fn test_dispatch_errors_do_not_poison() {
        let trie = shared();

        // unparseable command
        assert!(matches!(
            dispatch("FETCH person1", &trie),
            Response::Error(_)
        ));

        // stored value that does not decode surfaces on the QUERY path only
        assert_eq!(dispatch("PUT person1 {broken", &trie), Response::Ok);
        assert!(matches!(
            dispatch("QUERY person1.age", &trie),
            Response::Error(_)
        ));

        // the trie is still usable afterwards
        assert_eq!(dispatch("PUT person2 {\"a\":1}", &trie), Response::Ok);
        assert_eq!(
            dispatch("GET person2", &trie),
            Response::Value("{\"a\":1}".into())
        );
    }
}
