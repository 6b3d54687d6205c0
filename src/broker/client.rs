//! Command round trips to storage nodes
//!
//! One connection per command, matching the node's line protocol: write the
//! command line, read one reply line. Every step of the round trip runs
//! under the configured per-node deadline so a single unreachable node
//! cannot stall a fan-out.

use crate::common::{Command, Error, Response, Result};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

#[derive(Debug, Clone)]
pub struct NodeClient {
    timeout: Duration,
}

impl NodeClient {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Send one command to one node and classify its reply. Transport
    /// failures come back as [`Error::Unreachable`] / [`Error::Timeout`];
    /// an `ERROR:` reply is a successful round trip and is returned as
    /// [`Response::Error`].
    pub async fn send(&self, node: &str, command: &Command) -> Result<Response> {
        match tokio::time::timeout(self.timeout, round_trip(node, command)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(Error::Unreachable {
                node: node.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(Error::Timeout {
                node: node.to_string(),
            }),
        }
    }
}

async fn round_trip(node: &str, command: &Command) -> std::io::Result<Response> {
    let mut stream = TcpStream::connect(node).await?;
    stream.write_all(command.to_string().as_bytes()).await?;
    stream.write_all(b"\n").await?;

    let mut reply = String::new();
    let mut reader = BufReader::new(stream);
    let n = reader.read_line(&mut reply).await?;
    if n == 0 {
        return Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "connection closed before reply",
        ));
    }
    Ok(Response::parse(&reply))
}
