use serde::Serialize;

use crate::{error::ServerError, host::HostValue};

/// A GraphQL response: the nested result mapping plus any errors. Encoding is
/// delegated to the caller through `Serialize`.
#[derive(Debug, Default, Serialize)]
pub struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<HostValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ServerError>,
}

impl Response {
    /// A response aborted before execution: the sole error, no `data`.
    pub fn from_error(error: ServerError) -> Self {
        Response {
            data: None,
            errors: vec![error],
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// The `data` mapping as JSON, for hosts (and tests) that want a tree.
    pub fn data_json(&self) -> serde_json::Value {
        self.data
            .clone()
            .map(serde_json::Value::from)
            .unwrap_or(serde_json::Value::Null)
    }

    pub fn into_json(self) -> serde_json::Value {
        serde_json::to_value(&self).unwrap_or(serde_json::Value::Null)
    }
}
