//! Broker input files
//!
//! Two line-delimited formats are consumed as-is from the external
//! generator and deployment config:
//!
//! - node list: one `<address> <port>` per line;
//! - record stream: one `"<key>" : <flattened>` per line.
//!
//! The record key is extracted by structural parse of the quoted token
//! before the `:`, and the value is run through the codec once so that
//! everything the broker indexes is known to decode.

use crate::common::{Error, Result, Value};
use std::path::Path;

/// One pre-flattened record from the data file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: String,
    /// Canonical flattened value, re-rendered through the codec.
    pub value: String,
}

/// Read the node list: one `<address> <port>` per line, blank lines
/// ignored.
pub async fn read_node_list(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let text = tokio::fs::read_to_string(path.as_ref()).await?;
    let mut nodes = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(address), Some(port), None) => {
                port.parse::<u16>().map_err(|_| {
                    Error::InvalidConfig(format!(
                        "bad port '{}' on line {} of node list",
                        port,
                        lineno + 1
                    ))
                })?;
                nodes.push(format!("{}:{}", address, port));
            }
            _ => {
                return Err(Error::InvalidConfig(format!(
                    "expected '<address> <port>' on line {} of node list",
                    lineno + 1
                )))
            }
        }
    }
    Ok(nodes)
}

/// Read the record stream: one record per line, bad lines are an error.
pub async fn read_record_stream(path: impl AsRef<Path>) -> Result<Vec<Record>> {
    let text = tokio::fs::read_to_string(path.as_ref()).await?;
    let mut records = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record = parse_record_line(line)
            .map_err(|e| Error::InvalidRecord(format!("line {}: {}", lineno + 1, e)))?;
        records.push(record);
    }
    Ok(records)
}

/// Parse `"<key>" : <flattened>`.
fn parse_record_line(line: &str) -> Result<Record> {
    let line = line.trim();
    let rest = line
        .strip_prefix('"')
        .ok_or_else(|| Error::InvalidRecord("expected quoted key".into()))?;
    let (key, rest) = rest
        .split_once('"')
        .ok_or_else(|| Error::InvalidRecord("unterminated key".into()))?;
    if key.is_empty() || key.contains(char::is_whitespace) || key.contains('.') {
        return Err(Error::InvalidRecord(format!("invalid key '{}'", key)));
    }

    let rest = rest.trim_start();
    let flattened = rest
        .strip_prefix(':')
        .ok_or_else(|| Error::InvalidRecord("expected ':' after key".into()))?
        .trim();

    let value = Value::parse(flattened)?;
    if !value.is_map() {
        return Err(Error::InvalidRecord(format!(
            "record '{}' is not a mapping",
            key
        )));
    }

    Ok(Record {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_read_node_list() {
        let file = temp_file("127.0.0.1 7001\nlocalhost 7002\n\n10.0.0.5 7003\n");
        let nodes = read_node_list(file.path()).await.unwrap();
        assert_eq!(
            nodes,
            vec!["127.0.0.1:7001", "localhost:7002", "10.0.0.5:7003"]
        );
    }

    #[tokio::test]
    async fn test_read_node_list_rejects_garbage() {
        let file = temp_file("127.0.0.1 notaport\n");
        assert!(read_node_list(file.path()).await.is_err());

        let file = temp_file("127.0.0.1\n");
        assert!(read_node_list(file.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_read_record_stream() {
        let file = temp_file(concat!(
            "\"person0\" : {\"age\":30}\n",
            "\"person1\" : {\"address\":{\"city\":\"X\"};\"age\":31}\n",
        ));
        let records = read_record_stream(file.path()).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].key, "person0");
        assert_eq!(records[0].value, "{\"age\":30}");
        assert_eq!(records[1].key, "person1");
        // canonical re-render keeps the ';' separator
        assert!(records[1].value.contains(';'));
    }

    #[test]
    fn test_parse_record_line_strictness() {
        assert!(parse_record_line("person0 : {\"a\":1}").is_err()); // unquoted key
        assert!(parse_record_line("\"person0\" {\"a\":1}").is_err()); // missing ':'
        assert!(parse_record_line("\"person0\" : 42").is_err()); // not a mapping
        assert!(parse_record_line("\"person0\" : {\"a\":}").is_err()); // bad value
        assert!(parse_record_line("\"\" : {\"a\":1}").is_err()); // empty key
    }
}
