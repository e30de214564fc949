use std::fmt::{self, Display, Formatter};

use serde::Serialize;

/// The error taxonomy of the engine. The kind is serialised as a prefix of
/// the wire message so that callers (and tests) can match on it without a
/// dedicated extension field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    ParseError,
    CompilerError,
    InvalidArgument,
    InvalidCursor,
    Unauthorized,
    ExecutionError,
    Cancelled,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::ParseError => "ParseError",
            ErrorKind::CompilerError => "CompilerError",
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::InvalidCursor => "InvalidCursor",
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::ExecutionError => "ExecutionError",
            ErrorKind::Cancelled => "Cancelled",
        })
    }
}

/// A source location within the request document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

impl From<async_graphql_parser::Pos> for Location {
    fn from(pos: async_graphql_parser::Pos) -> Self {
        Location {
            line: pos.line as u32,
            column: pos.column as u32,
        }
    }
}

/// One step of a response path: an output name, or an index within a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

/// An error in the `errors` entry of a response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerError {
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<Location>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<PathSegment>,
}

impl ServerError {
    pub fn new(kind: ErrorKind, message: impl Display) -> Self {
        ServerError {
            message: format!("{kind}: {message}"),
            locations: Vec::new(),
            path: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_location(mut self, location: impl Into<Location>) -> Self {
        self.locations.push(location.into());
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: impl IntoIterator<Item = PathSegment>) -> Self {
        self.path = path.into_iter().collect();
        self
    }

    /// Whether the message carries the given kind prefix.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.message
            .strip_prefix(&kind.to_string())
            .is_some_and(|rest| rest.starts_with(':'))
    }
}

impl Display for ServerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

pub type ServerResult<T> = std::result::Result<T, ServerError>;

/// An error produced inside a resolver, carrying a message only. Converted
/// into a [`ServerError`] of kind `ExecutionError` at the field boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub message: String,
}

impl Error {
    pub fn new(message: impl Into<String>) -> Self {
        Error {
            message: message.into(),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::new(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_prefix_is_testable() {
        let error = ServerError::new(ErrorKind::CompilerError, "Field 'id' not found on type 'Person'");
        assert_eq!(
            error.message,
            "CompilerError: Field 'id' not found on type 'Person'"
        );
        assert!(error.is(ErrorKind::CompilerError));
        assert!(!error.is(ErrorKind::ParseError));
    }

    #[test]
    fn path_serialises_as_mixed_strings_and_indices() {
        let error = ServerError::new(ErrorKind::ExecutionError, "boom").with_path([
            PathSegment::Field("people".into()),
            PathSegment::Index(3),
            PathSegment::Field("name".into()),
        ]);
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["path"], serde_json::json!(["people", 3, "name"]));
    }
}
