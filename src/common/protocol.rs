//! Wire protocol between the broker and storage nodes
//!
//! Plain text, one command per line, one reply per line:
//!
//! ```text
//! PUT <key> <flattened>              -> "OK"
//! GET <key>                          -> <flattened> | "NOTFOUND"
//! DELETE <key>                       -> "OK" | "NOTFOUND"
//! QUERY <key>.<field>[.<field>...]   -> "<path> : <value>" | "NOTFOUND"
//! anything else                      -> "ERROR: <message>"
//! ```
//!
//! Commands are parsed with a strict grammar — keyword first, then an
//! explicit key token, then the optional remainder — never by scanning the
//! whole message for key-shaped substrings, so key patterns inside stored
//! values cannot be mistaken for the command target.

use crate::common::{Error, Result};
use std::fmt;

/// A parsed client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Insert or overwrite a record.
    Put { key: String, value: String },
    /// Fetch a record's flattened value.
    Get { key: String },
    /// Remove a record.
    Delete { key: String },
    /// Resolve a dot-path inside a record.
    Query { key: String, fields: Vec<String> },
}

impl Command {
    pub fn parse(line: &str) -> Result<Command> {
        let line = line.trim();
        let (keyword, rest) = match line.split_once(char::is_whitespace) {
            Some((k, r)) => (k, r.trim_start()),
            None => (line, ""),
        };

        match keyword {
            "PUT" => {
                let (key, value) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| Error::InvalidCommand("PUT requires a key and a value".into()))?;
                let value = value.trim();
                validate_key(key)?;
                if value.is_empty() {
                    return Err(Error::InvalidCommand("PUT requires a value".into()));
                }
                Ok(Command::Put {
                    key: key.to_string(),
                    value: value.to_string(),
                })
            }
            "GET" => Ok(Command::Get {
                key: single_token("GET", rest)?,
            }),
            "DELETE" => Ok(Command::Delete {
                key: single_token("DELETE", rest)?,
            }),
            "QUERY" => {
                let path = single_token("QUERY", rest)?;
                let mut parts = path.split('.');
                let key = parts.next().unwrap_or("");
                validate_key(key)?;
                let fields: Vec<String> = parts.map(str::to_string).collect();
                if fields.is_empty() || fields.iter().any(String::is_empty) {
                    return Err(Error::InvalidCommand(format!(
                        "QUERY path '{}' must be <key>.<field>[.<field>...]",
                        path
                    )));
                }
                Ok(Command::Query {
                    key: key.to_string(),
                    fields,
                })
            }
            other => Err(Error::InvalidCommand(format!(
                "unknown command '{}'",
                other
            ))),
        }
    }

    /// Top-level key the command targets.
    pub fn key(&self) -> &str {
        match self {
            Command::Put { key, .. }
            | Command::Get { key }
            | Command::Delete { key }
            | Command::Query { key, .. } => key,
        }
    }
}

fn single_token(keyword: &str, rest: &str) -> Result<String> {
    let token = rest.trim();
    if token.is_empty() || token.contains(char::is_whitespace) {
        return Err(Error::InvalidCommand(format!(
            "{} requires exactly one key",
            keyword
        )));
    }
    Ok(token.to_string())
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::InvalidCommand("empty key".into()));
    }
    if key.contains(char::is_whitespace) || key.contains('.') {
        return Err(Error::InvalidCommand(format!("invalid key '{}'", key)));
    }
    Ok(())
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Put { key, value } => write!(f, "PUT {} {}", key, value),
            Command::Get { key } => write!(f, "GET {}", key),
            Command::Delete { key } => write!(f, "DELETE {}", key),
            Command::Query { key, fields } => {
                write!(f, "QUERY {}.{}", key, fields.join("."))
            }
        }
    }
}

/// A node's one-line reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Ok,
    NotFound,
    /// Payload reply: a flattened value for GET, `<path> : <value>` for QUERY.
    Value(String),
    Error(String),
}

impl Response {
    /// Classify a reply line. Never fails: anything that is not one of the
    /// fixed forms is a payload.
    pub fn parse(line: &str) -> Response {
        let line = line.trim_end();
        match line {
            "OK" => Response::Ok,
            "NOTFOUND" => Response::NotFound,
            _ => match line.strip_prefix("ERROR:") {
                Some(message) => Response::Error(message.trim_start().to_string()),
                None => Response::Value(line.to_string()),
            },
        }
    }

    /// Did this node come back with the record (counts toward availability)?
    pub fn is_value(&self) -> bool {
        matches!(self, Response::Value(_))
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Ok => f.write_str("OK"),
            Response::NotFound => f.write_str("NOTFOUND"),
            Response::Value(payload) => f.write_str(payload),
            Response::Error(message) => write!(f, "ERROR: {}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_put_ignores_key_patterns_in_value() {
        let cmd = Command::parse(r#"PUT person1 {"note":"GET person99"}"#).unwrap();
        assert_eq!(
            cmd,
            Command::Put {
                key: "person1".into(),
                value: r#"{"note":"GET person99"}"#.into(),
            }
        );
    }

    #[test]
    fn test_parse_get_delete() {
        assert_eq!(
            Command::parse("GET person1").unwrap(),
            Command::Get {
                key: "person1".into()
            }
        );
        assert_eq!(
            Command::parse("DELETE person1\n").unwrap(),
            Command::Delete {
                key: "person1".into()
            }
        );
        assert!(Command::parse("GET person1 extra").is_err());
        assert!(Command::parse("GET").is_err());
    }

    #[test]
    fn test_parse_query_path() {
        let cmd = Command::parse("QUERY person1.address.city").unwrap();
        assert_eq!(
            cmd,
            Command::Query {
                key: "person1".into(),
                fields: vec!["address".into(), "city".into()],
            }
        );
        // bare key or empty segments are grammar violations
        assert!(Command::parse("QUERY person1").is_err());
        assert!(Command::parse("QUERY person1..city").is_err());
        assert!(Command::parse("QUERY .city").is_err());
    }

    #[test]
    fn test_parse_unknown_command() {
        assert!(Command::parse("PURGE person1").is_err());
        assert!(Command::parse("").is_err());
    }

    #[test]
    fn test_command_render_roundtrip() {
        for line in [
            "PUT person1 {\"age\":30}",
            "GET person1",
            "DELETE person1",
            "QUERY person1.address.city",
        ] {
            let cmd = Command::parse(line).unwrap();
            assert_eq!(cmd.to_string(), line);
        }
    }

    #[test]
    fn test_response_classification() {
        assert_eq!(Response::parse("OK"), Response::Ok);
        assert_eq!(Response::parse("NOTFOUND"), Response::NotFound);
        assert_eq!(
            Response::parse("ERROR: boom"),
            Response::Error("boom".into())
        );
        assert_eq!(
            Response::parse("{\"age\":30}"),
            Response::Value("{\"age\":30}".into())
        );
        assert!(Response::parse("{\"age\":30}").is_value());
        assert!(!Response::parse("NOTFOUND").is_value());
    }
}
