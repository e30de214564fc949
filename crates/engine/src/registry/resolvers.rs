//! Resolver descriptors. A query field resolves through a pure projection
//! fragment; a mutation field resolves through an opaque side-effecting
//! callable.

use std::sync::Arc;

use async_graphql_value::ConstValue;
use futures::future::BoxFuture;

use crate::{error::Error, host::HostValue, projection::Projection};

/// How a field maps a parent value to its own value.
#[derive(Clone, Default)]
pub enum Resolver {
    /// Projects the host member named by the field's `target_host_member`.
    #[default]
    Property,
    /// An explicit projection fragment. `Parent` is the parent value in
    /// scope; `Argument` references are substituted at plan time.
    Expression(Projection),
    /// A side-effecting callable; only valid on the mutation root.
    Mutation(MutationResolver),
    /// The `__schema` introspection entry point.
    SchemaIntrospection,
    /// The `__type(name:)` introspection entry point.
    TypeIntrospection,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolver::Property => f.write_str("Property"),
            Resolver::Expression(projection) => {
                f.debug_tuple("Expression").field(projection).finish()
            }
            Resolver::Mutation(_) => f.write_str("Mutation(..)"),
            Resolver::SchemaIntrospection => f.write_str("SchemaIntrospection"),
            Resolver::TypeIntrospection => f.write_str("TypeIntrospection"),
        }
    }
}

/// What a mutation callable hands back: a finished value, or a projection to
/// evaluate against the post-mutation context.
pub enum MutationOutcome {
    Value(HostValue),
    Projection(Projection),
}

type MutationFn = dyn for<'a> Fn(&'a mut HostValue, ConstValue) -> BoxFuture<'a, Result<MutationOutcome, Error>>
    + Send
    + Sync;

/// An asynchronous mutation callable. Receives exclusive access to the host
/// context root and the coerced argument record.
#[derive(Clone)]
pub struct MutationResolver(Arc<MutationFn>);

impl MutationResolver {
    pub fn new<F>(callable: F) -> Self
    where
        F: for<'a> Fn(&'a mut HostValue, ConstValue) -> BoxFuture<'a, Result<MutationOutcome, Error>>
            + Send
            + Sync
            + 'static,
    {
        MutationResolver(Arc::new(callable))
    }

    pub(crate) async fn call(
        &self,
        context: &mut HostValue,
        arguments: ConstValue,
    ) -> Result<MutationOutcome, Error> {
        (self.0)(context, arguments).await
    }
}
