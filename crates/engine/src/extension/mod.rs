//! Field extensions: ordered compile-time transformers attached to a field.
//! Each is configured once when attached (mutating field metadata and
//! registering wrapper types) and rewrites the field's projection at plan
//! time, once argument values are known.

mod connection;
mod filter;
mod offset_paging;
mod sort;

use crate::{
    error::{ErrorKind, ServerError, ServerResult},
    operation::ArgumentSet,
    projection::Projection,
    registry::Registry,
};

pub use connection::ConnectionExtension;
pub use filter::FilterExtension;
pub use offset_paging::OffsetPagingExtension;
pub use sort::SortExtension;

/// The compile-time context an extension rewrites within.
pub(crate) struct RewriteContext<'a> {
    pub registry: &'a Registry,
    /// The GraphQL name of the field under compilation, for error messages.
    pub field_name: &'a str,
}

#[derive(Debug, Clone)]
pub enum FieldExtension {
    Filter(FilterExtension),
    Sort(SortExtension),
    OffsetPaging(OffsetPagingExtension),
    Connection(ConnectionExtension),
}

impl FieldExtension {
    /// Rewrites the field's current expression. Extensions attached later see
    /// the rewrites of earlier ones.
    pub(crate) fn rewrite(
        &self,
        cx: &RewriteContext<'_>,
        expr: Projection,
        arguments: &ArgumentSet,
    ) -> ServerResult<Projection> {
        match self {
            FieldExtension::Filter(extension) => extension.rewrite(cx, expr, arguments),
            FieldExtension::Sort(extension) => extension.rewrite(cx, expr, arguments),
            FieldExtension::OffsetPaging(extension) => extension.rewrite(cx, expr, arguments),
            FieldExtension::Connection(extension) => extension.rewrite(cx, expr, arguments),
        }
    }
}

pub(crate) fn invalid_argument(message: impl std::fmt::Display) -> ServerError {
    ServerError::new(ErrorKind::InvalidArgument, message)
}

/// Reads an optional integer argument, rejecting negative values.
pub(crate) fn page_size_arg(
    arguments: &ArgumentSet,
    name: &str,
) -> ServerResult<Option<usize>> {
    use async_graphql_value::ConstValue;
    match arguments.get(name) {
        None | Some(ConstValue::Null) => Ok(None),
        Some(ConstValue::Number(number)) => match number.as_i64() {
            Some(value) if value >= 0 => Ok(Some(value as usize)),
            _ => Err(invalid_argument(format!(
                "'{name}' must be a non-negative integer"
            ))),
        },
        Some(_) => Err(invalid_argument(format!("'{name}' must be an integer"))),
    }
}
