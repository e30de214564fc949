//! From document text to a bound operation plan: parsing, operation
//! selection, fragment resolution, validation and argument coercion.

pub(crate) mod bind;
pub(crate) mod parse;

use async_graphql_value::ConstValue;
use indexmap::IndexMap;

use crate::error::{Location, ServerError};

pub use bind::OperationPlan;
pub(crate) use bind::bind;
pub(crate) use parse::{parse, ParseError, ParsedOperation};

/// Evaluated argument values of one selection, in declaration order.
pub type ArgumentSet = IndexMap<String, ConstValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Query,
    Mutation,
}

/// One chosen field within a bound selection set. Fields are referenced by
/// `(type name, field name)` so plans never hold references into the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundField {
    Field { ty: String, name: String },
    /// A `__typename` selection, resolved against the named parent type.
    Typename { ty: String },
}

/// One top-level entry of a bound plan. Argument-value failures surface here
/// rather than aborting the plan: the executor nulls the field, appends the
/// error and continues with peers.
#[derive(Debug, Clone)]
pub enum RootEntry {
    Selection(SelectionNode),
    Failed {
        response_key: String,
        error: ServerError,
    },
}

#[derive(Debug, Clone)]
pub struct SelectionNode {
    /// The output name: the alias when given, the field name otherwise.
    pub response_key: String,
    pub field: BoundField,
    pub arguments: ArgumentSet,
    pub children: Vec<SelectionNode>,
    pub location: Location,
}
