//! A server-side GraphQL engine that compiles each operation into a single
//! composed projection over a host object graph, instead of dispatching
//! per-field resolver callbacks. Filters, ordering, paging and field
//! selection fuse into one expression tree that a lazily evaluable host can
//! push down whole.

pub mod auth;
mod engine;
mod error;
pub mod execution;
pub mod extension;
pub mod host;
mod operation;
pub mod projection;
pub mod registry;
mod request;
mod response;

pub use async_graphql_value::{ConstValue, Name, Variables};

pub use engine::Engine;
pub use error::{Error, ErrorKind, Location, PathSegment, ServerError, ServerResult};
pub use execution::CancellationToken;
pub use operation::{
    ArgumentSet, BoundField, OperationKind, OperationPlan, RootEntry, SelectionNode,
};
pub use request::Request;
pub use response::Response;
