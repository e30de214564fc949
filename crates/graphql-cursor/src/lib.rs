use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

/// An opaque pagination cursor: the base64 text of a zero-based item offset
/// within the connection's underlying ordered collection.
///
/// Clients must treat the text as opaque; the encoding is an implementation
/// detail of the engine and may change between releases.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GraphqlCursor(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a valid cursor")]
pub struct InvalidCursorError(pub String);

impl GraphqlCursor {
    pub fn from_offset(offset: usize) -> Self {
        GraphqlCursor(STANDARD.encode(offset.to_string()))
    }

    /// Decodes a cursor received from a client. The empty string decodes to
    /// `None`, mirroring an absent cursor argument.
    pub fn decode(raw: &str) -> Result<Option<usize>, InvalidCursorError> {
        if raw.is_empty() {
            return Ok(None);
        }
        GraphqlCursor(raw.to_owned()).offset().map(Some)
    }

    pub fn offset(&self) -> Result<usize, InvalidCursorError> {
        let bytes = STANDARD
            .decode(&self.0)
            .map_err(|_| InvalidCursorError(self.0.clone()))?;
        std::str::from_utf8(&bytes)
            .ok()
            .and_then(|text| text.parse().ok())
            .ok_or_else(|| InvalidCursorError(self.0.clone()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for GraphqlCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GraphqlCursor {
    fn from(value: &str) -> Self {
        GraphqlCursor(value.to_owned())
    }
}

impl From<String> for GraphqlCursor {
    fn from(value: String) -> Self {
        GraphqlCursor(value)
    }
}
