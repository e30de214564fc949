use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{auth::Principal, execution::CancellationToken, Variables};

/// A GraphQL request.
///
/// Deserialises from the standard wire shape (`query`, `operationName`,
/// `variables`). The principal and cancellation token are per-request state
/// supplied by the host, never part of the wire form.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// The query source of the request.
    #[serde(default)]
    pub query: String,

    /// The operation name of the request.
    #[serde(default)]
    pub operation_name: Option<String>,

    /// The variables of the request.
    #[serde(default)]
    pub variables: Variables,

    /// The authenticated principal, if any. Absent means anonymous.
    #[serde(skip)]
    pub principal: Option<Arc<dyn Principal>>,

    /// Checked between top-level fields; cancelling aborts the whole
    /// response.
    #[serde(skip)]
    pub cancellation: CancellationToken,
}

impl Request {
    /// Create a request object with query source.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            operation_name: None,
            variables: Variables::default(),
            principal: None,
            cancellation: CancellationToken::new(),
        }
    }

    /// Specify the operation name of the request.
    #[must_use]
    pub fn with_operation_name<T: Into<String>>(self, name: T) -> Self {
        Self {
            operation_name: Some(name.into()),
            ..self
        }
    }

    /// Specify the variables.
    #[must_use]
    pub fn variables(self, variables: Variables) -> Self {
        Self { variables, ..self }
    }

    #[must_use]
    pub fn with_principal(self, principal: Arc<dyn Principal>) -> Self {
        Self {
            principal: Some(principal),
            ..self
        }
    }

    #[must_use]
    pub fn with_cancellation(self, cancellation: CancellationToken) -> Self {
        Self {
            cancellation,
            ..self
        }
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("query", &self.query)
            .field("operation_name", &self.operation_name)
            .field("variables", &self.variables)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialises_the_wire_shape() {
        let request: Request = serde_json::from_value(serde_json::json!({
            "query": "{ people { id } }",
            "operationName": "Q",
            "variables": { "id": 3 },
        }))
        .unwrap();
        assert_eq!(request.query, "{ people { id } }");
        assert_eq!(request.operation_name.as_deref(), Some("Q"));
        assert!(request.principal.is_none());
    }
}
