use std::sync::Arc;

use async_graphql_value::{ConstValue, Name};
use indexmap::IndexMap;

use crate::{
    auth::{Anonymous, Principal},
    engine::Engine,
    error::{ErrorKind, PathSegment, ServerError, ServerResult},
    host::{DataContext, HostValue},
    operation::{bind, BoundField, OperationKind, OperationPlan, RootEntry, SelectionNode},
    projection::{evaluate_root, Projection, ProjectionBuilder},
    registry::{MetaField, MetaType, Resolver},
    request::Request,
    response::Response,
};

use super::CancellationToken;

static ANONYMOUS: Anonymous = Anonymous;

impl Engine {
    /// Executes one request against the given host context. Parse and bind
    /// failures abort the whole request; field-level failures null the field,
    /// append one error and continue with its peers.
    pub async fn execute(&self, context: &mut DataContext, request: Request) -> Response {
        let Request {
            query,
            operation_name,
            variables,
            principal,
            cancellation,
        } = request;

        let parsed = match self.parsed_operation(&query, operation_name.as_deref()) {
            Ok(parsed) => parsed,
            Err(error) => return Response::from_error(error.into_server_error()),
        };
        let plan = match bind(self.registry(), &parsed, &variables) {
            Ok(plan) => plan,
            Err(error) => return Response::from_error(error.into_server_error()),
        };
        let principal: &dyn Principal = principal.as_deref().unwrap_or(&ANONYMOUS);

        tracing::debug!(
            operation = plan.name.as_deref().unwrap_or("<anonymous>"),
            kind = ?plan.kind,
            "executing operation"
        );
        match plan.kind {
            OperationKind::Query => self.execute_query(context, &plan, principal, &cancellation),
            OperationKind::Mutation => {
                self.execute_mutation(context, &plan, principal, &cancellation)
                    .await
            }
        }
    }

    fn execute_query(
        &self,
        context: &DataContext,
        plan: &OperationPlan,
        principal: &dyn Principal,
        cancellation: &CancellationToken,
    ) -> Response {
        let introspection = self.introspection_data();
        let builder = ProjectionBuilder {
            registry: self.registry(),
            principal,
            introspection: &introspection,
        };

        let mut data = Vec::with_capacity(plan.root.len());
        let mut errors = Vec::new();
        for entry in &plan.root {
            if cancellation.is_cancelled() {
                return cancelled();
            }
            let node = match entry {
                RootEntry::Selection(node) => node,
                RootEntry::Failed {
                    response_key,
                    error,
                } => {
                    collect_failed(&mut data, &mut errors, response_key, error.clone());
                    continue;
                }
            };
            let result = builder.build_root(node).and_then(|projection| {
                evaluate_root(&projection, context.root()).map_err(|error| {
                    ServerError::new(ErrorKind::ExecutionError, error)
                        .with_location(node.location)
                })
            });
            collect_field(&mut data, &mut errors, node, result);
        }
        Response {
            data: Some(HostValue::Object(data)),
            errors,
        }
    }

    /// Mutations run strictly left-to-right; each return selection is
    /// evaluated against the post-mutation context.
    async fn execute_mutation(
        &self,
        context: &mut DataContext,
        plan: &OperationPlan,
        principal: &dyn Principal,
        cancellation: &CancellationToken,
    ) -> Response {
        let introspection = self.introspection_data();
        let mut data = Vec::with_capacity(plan.root.len());
        let mut errors = Vec::new();
        for entry in &plan.root {
            if cancellation.is_cancelled() {
                return cancelled();
            }
            let node = match entry {
                RootEntry::Selection(node) => node,
                RootEntry::Failed {
                    response_key,
                    error,
                } => {
                    collect_failed(&mut data, &mut errors, response_key, error.clone());
                    continue;
                }
            };
            let result = self
                .execute_mutation_field(context, node, principal, &introspection)
                .await;
            collect_field(&mut data, &mut errors, node, result);
        }
        Response {
            data: Some(HostValue::Object(data)),
            errors,
        }
    }

    async fn execute_mutation_field(
        &self,
        context: &mut DataContext,
        node: &SelectionNode,
        principal: &dyn Principal,
        introspection: &Arc<HostValue>,
    ) -> ServerResult<HostValue> {
        let (ty, name) = match &node.field {
            BoundField::Typename { ty } => return Ok(HostValue::string(ty.clone())),
            BoundField::Field { ty, name } => (ty.as_str(), name.as_str()),
        };
        let definition = self.registry().get_field(ty, name).ok_or_else(|| {
            ServerError::new(
                ErrorKind::CompilerError,
                format!("Field '{name}' not found on type '{ty}'"),
            )
            .with_location(node.location)
        })?;
        self.authorize_mutation(ty, definition, principal, node)?;

        let Resolver::Mutation(resolver) = &definition.resolver else {
            return Err(ServerError::new(
                ErrorKind::CompilerError,
                format!("Field '{name}' is not a mutation"),
            )
            .with_location(node.location));
        };

        let mut arguments = IndexMap::new();
        for (name, value) in &node.arguments {
            arguments.insert(Name::new(name), value.clone());
        }
        let outcome = resolver
            .call(context.root_mut(), ConstValue::Object(arguments))
            .await
            .map_err(|error| {
                ServerError::new(ErrorKind::ExecutionError, error).with_location(node.location)
            })?;

        let builder = ProjectionBuilder {
            registry: self.registry(),
            principal,
            introspection,
        };
        match outcome {
            crate::registry::MutationOutcome::Value(value) => {
                if node.children.is_empty() {
                    return Ok(value);
                }
                let projection =
                    builder.build_mutation_selection(definition, Projection::Parent, node)?;
                evaluate_root(&projection, &value).map_err(|error| {
                    ServerError::new(ErrorKind::ExecutionError, error)
                        .with_location(node.location)
                })
            }
            crate::registry::MutationOutcome::Projection(returned) => {
                let projection = builder.build_mutation_selection(definition, returned, node)?;
                evaluate_root(&projection, context.root()).map_err(|error| {
                    ServerError::new(ErrorKind::ExecutionError, error)
                        .with_location(node.location)
                })
            }
        }
    }

    /// Mutations authorize before the side effect runs, not merely before
    /// the return selection is projected.
    fn authorize_mutation(
        &self,
        parent_ty: &str,
        definition: &MetaField,
        principal: &dyn Principal,
        node: &SelectionNode,
    ) -> ServerResult<()> {
        let mut allowed = definition.required_auth.check(principal);
        if allowed {
            if let Some(MetaType::Object(object)) =
                self.registry().types.get(definition.ty.named_type())
            {
                allowed = object.required_auth.check(principal);
            }
        }
        if allowed {
            Ok(())
        } else {
            Err(ServerError::new(
                ErrorKind::Unauthorized,
                format!(
                    "You are not authorized to access the field '{}' on type '{parent_ty}'",
                    definition.name
                ),
            )
            .with_location(node.location))
        }
    }
}

fn collect_field(
    data: &mut Vec<(String, HostValue)>,
    errors: &mut Vec<ServerError>,
    node: &SelectionNode,
    result: ServerResult<HostValue>,
) {
    match result {
        Ok(value) => data.push((node.response_key.clone(), value)),
        Err(error) => collect_failed(data, errors, &node.response_key, error),
    }
}

fn collect_failed(
    data: &mut Vec<(String, HostValue)>,
    errors: &mut Vec<ServerError>,
    response_key: &str,
    error: ServerError,
) {
    tracing::debug!(field = %response_key, error = %error.message, "field failed");
    errors.push(error.with_path([PathSegment::Field(response_key.to_owned())]));
    data.push((response_key.to_owned(), HostValue::Null));
}

/// No partial results on cancellation: the whole response is replaced.
fn cancelled() -> Response {
    Response::from_error(ServerError::new(ErrorKind::Cancelled, "Request was cancelled"))
}
