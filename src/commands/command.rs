//! The command table.
//!
//! A decoded [`Request`] names its command as a string; this module maps
//! that name onto a [`Command`] variant and checks the argument count, so
//! everything after this point works with a validated, typed operation.

use crate::protocol::Request;
use std::fmt;

/// A validated operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `LIST`
    List,
    /// `GET <filename>`
    Get { filename: String },
    /// `UPLOAD <filename>` with the base64 content as body
    Upload { filename: String, content: String },
    /// `DELETE <filename>`
    Delete { filename: String },
}

/// Why a request could not be turned into a [`Command`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandMismatch {
    /// The command name is not in the table
    Unknown(String),
    /// The command exists but the arguments do not fit it
    Arity {
        command: &'static str,
        expected: &'static str,
        got: usize,
    },
}

impl Command {
    /// Validates a decoded request against the command table.
    pub fn from_request(request: Request) -> Result<Self, CommandMismatch> {
        let Request {
            command,
            arguments,
            body,
        } = request;

        match command.as_str() {
            "list" => Ok(Command::List),
            "get" => single_argument("get", arguments).map(|filename| Command::Get { filename }),
            "delete" => {
                single_argument("delete", arguments).map(|filename| Command::Delete { filename })
            }
            "upload" => {
                let got = arguments.len();
                let filename = single_argument("upload", arguments)?;
                if body.is_empty() {
                    return Err(CommandMismatch::Arity {
                        command: "upload",
                        expected: "one file name and a non-empty body",
                        got,
                    });
                }
                Ok(Command::Upload {
                    filename,
                    content: String::from_utf8_lossy(&body).into_owned(),
                })
            }
            _ => Err(CommandMismatch::Unknown(command)),
        }
    }

    /// Returns the lowercase command name.
    pub fn name(&self) -> &'static str {
        match self {
            Command::List => "list",
            Command::Get { .. } => "get",
            Command::Upload { .. } => "upload",
            Command::Delete { .. } => "delete",
        }
    }

    /// Returns the file the command targets, if any.
    pub fn filename(&self) -> Option<&str> {
        match self {
            Command::List => None,
            Command::Get { filename }
            | Command::Upload { filename, .. }
            | Command::Delete { filename } => Some(filename),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.filename() {
            Some(name) => write!(f, "{} {}", self.name().to_uppercase(), name),
            None => write!(f, "{}", self.name().to_uppercase()),
        }
    }
}

fn single_argument(
    command: &'static str,
    arguments: Vec<String>,
) -> Result<String, CommandMismatch> {
    let got = arguments.len();
    let mut arguments = arguments.into_iter();
    match (arguments.next(), arguments.next()) {
        (Some(filename), None) => Ok(filename),
        _ => Err(CommandMismatch::Arity {
            command,
            expected: "exactly one file name",
            got,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::decode;

    fn command(raw: &[u8]) -> Result<Command, CommandMismatch> {
        Command::from_request(decode(raw).unwrap())
    }

    #[test]
    fn test_list() {
        assert_eq!(command(b"LIST"), Ok(Command::List));
    }

    #[test]
    fn test_list_ignores_extra_arguments() {
        assert_eq!(command(b"LIST everything"), Ok(Command::List));
    }

    #[test]
    fn test_get() {
        assert_eq!(
            command(b"GET f.bin"),
            Ok(Command::Get {
                filename: "f.bin".to_string()
            })
        );
    }

    #[test]
    fn test_get_requires_exactly_one_argument() {
        assert!(matches!(
            command(b"GET"),
            Err(CommandMismatch::Arity { got: 0, .. })
        ));
        assert!(matches!(
            command(b"GET a b"),
            Err(CommandMismatch::Arity { got: 2, .. })
        ));
    }

    #[test]
    fn test_delete() {
        assert_eq!(
            command(b"delete \"two words.txt\""),
            Ok(Command::Delete {
                filename: "two words.txt".to_string()
            })
        );
    }

    #[test]
    fn test_upload() {
        assert_eq!(
            command(b"UPLOAD f.bin\r\nQUI="),
            Ok(Command::Upload {
                filename: "f.bin".to_string(),
                content: "QUI=".to_string()
            })
        );
    }

    #[test]
    fn test_upload_requires_body() {
        assert!(matches!(
            command(b"UPLOAD f.bin"),
            Err(CommandMismatch::Arity {
                command: "upload",
                ..
            })
        ));
    }

    #[test]
    fn test_upload_requires_filename() {
        assert!(matches!(
            command(b"UPLOAD\r\nQUI="),
            Err(CommandMismatch::Arity { got: 0, .. })
        ));
    }

    #[test]
    fn test_unknown() {
        assert_eq!(
            command(b"RENAME a b"),
            Err(CommandMismatch::Unknown("rename".to_string()))
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Command::List.to_string(), "LIST");
        assert_eq!(
            Command::Delete {
                filename: "x.txt".to_string()
            }
            .to_string(),
            "DELETE x.txt"
        );
    }
}
