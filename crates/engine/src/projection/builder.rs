//! Bottom-up composition of one projection per top-level field: resolve
//! expression, extension rewrites, then selection-set shaping into anonymous
//! records.
//!
//! Shaping fuses through the virtual records produced by the paging
//! extensions: selecting only `totalCount` on a connection never evaluates
//! `edges`, and the node selection is pushed into the `Select` lambda so the
//! underlying source materialises only projected members.

use std::sync::Arc;

use async_graphql_value::ConstValue;

use crate::{
    auth::Principal,
    error::{ErrorKind, ServerError, ServerResult},
    extension::RewriteContext,
    host::HostValue,
    operation::{BoundField, SelectionNode},
    projection::{Method, Projection},
    registry::{MetaField, MetaFieldType, MetaType, Registry, Resolver},
};

pub(crate) struct ProjectionBuilder<'a> {
    pub registry: &'a Registry,
    pub principal: &'a dyn Principal,
    /// The reflective schema value backing `__schema` / `__type`.
    pub introspection: &'a Arc<HostValue>,
}

impl ProjectionBuilder<'_> {
    /// Composes the full projection for one top-level selection.
    pub(crate) fn build_root(&self, node: &SelectionNode) -> ServerResult<Projection> {
        self.selection_expr(node)
    }

    /// Shapes a mutation's return selection over the given base expression:
    /// `Parent` for an outcome value, or the projection the resolver handed
    /// back.
    pub(crate) fn build_mutation_selection(
        &self,
        definition: &MetaField,
        base: Projection,
        node: &SelectionNode,
    ) -> ServerResult<Projection> {
        let rewritten = self.apply_extensions(definition, base, node)?;
        self.shape(rewritten, &definition.ty, node)
    }

    fn selection_expr(&self, node: &SelectionNode) -> ServerResult<Projection> {
        let (ty, name) = match &node.field {
            BoundField::Typename { ty } => return Ok(self.typename_expr(ty)),
            BoundField::Field { ty, name } => (ty.as_str(), name.as_str()),
        };
        let definition = self.field_definition(ty, name, node)?;
        self.authorize(ty, definition, node)?;

        let base = self.resolve_expr(definition, node)?;
        let rewritten = self.apply_extensions(definition, base, node)?;
        self.shape(rewritten, &definition.ty, node)
    }

    fn field_definition<'r>(
        &'r self,
        ty: &str,
        name: &str,
        node: &SelectionNode,
    ) -> ServerResult<&'r MetaField> {
        self.registry.get_field(ty, name).ok_or_else(|| {
            ServerError::new(
                ErrorKind::CompilerError,
                format!("Field '{name}' not found on type '{ty}'"),
            )
            .with_location(node.location)
        })
    }

    /// Authorization runs before expression building for every selection.
    /// The message names the denied field, never the missing role.
    fn authorize(
        &self,
        parent_ty: &str,
        definition: &MetaField,
        node: &SelectionNode,
    ) -> ServerResult<()> {
        let mut allowed = definition.required_auth.check(self.principal);
        if allowed {
            if let Some(MetaType::Object(object)) =
                self.registry.types.get(definition.ty.named_type())
            {
                allowed = object.required_auth.check(self.principal);
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

    fn resolve_expr(
        &self,
        definition: &MetaField,
        node: &SelectionNode,
    ) -> ServerResult<Projection> {
        match &definition.resolver {
            Resolver::Property => Ok(Projection::parent_member(
                definition.target_host_member().to_owned(),
            )),
            Resolver::Expression(projection) => {
                Ok(projection.clone().bind_arguments(&node.arguments))
            }
            Resolver::Mutation(_) => Err(ServerError::new(
                ErrorKind::CompilerError,
                format!("Field '{}' is a mutation", definition.name),
            )
            .with_location(node.location)),
            Resolver::SchemaIntrospection => {
                self.check_introspection(node)?;
                Ok(Projection::Frozen(self.introspection.clone()))
            }
            Resolver::TypeIntrospection => {
                self.check_introspection(node)?;
                let wanted = match node.arguments.get("name") {
                    Some(ConstValue::String(name)) => name.clone(),
                    _ => String::new(),
                };
                let predicate = Projection::binary(
                    crate::projection::BinaryOp::Equal,
                    Projection::parent_member("name"),
                    Projection::Literal(ConstValue::String(wanted)),
                );
                Ok(Projection::Frozen(self.introspection.clone())
                    .member("types")
                    .call(Method::First(Some(Box::new(predicate)))))
            }
        }
    }

    fn check_introspection(&self, node: &SelectionNode) -> ServerResult<()> {
        if self.registry.disable_introspection {
            Err(
                ServerError::new(ErrorKind::Unauthorized, "Introspection is disabled")
                    .with_location(node.location),
            )
        } else {
            Ok(())
        }
    }

    fn apply_extensions(
        &self,
        definition: &MetaField,
        expr: Projection,
        node: &SelectionNode,
    ) -> ServerResult<Projection> {
        let cx = RewriteContext {
            registry: self.registry,
            field_name: &definition.name,
        };
        let mut expr = expr;
        for extension in &definition.extensions {
            expr = extension
                .rewrite(&cx, expr, &node.arguments)
                .map_err(|error| error.with_location(node.location))?;
        }
        Ok(expr)
    }

    fn shape(
        &self,
        expr: Projection,
        ty: &MetaFieldType,
        node: &SelectionNode,
    ) -> ServerResult<Projection> {
        if node.children.is_empty() {
            // Leaf: enum values are translated to their exposed spelling.
            if let Some(MetaType::Enum(declared)) = self.registry.types.get(ty.named_type()) {
                let pairs = declared
                    .values
                    .values()
                    .map(|value| (value.host_value().to_owned(), value.name.clone()))
                    .collect();
                return Ok(Projection::MapEnum {
                    base: Box::new(expr),
                    pairs,
                });
            }
            return Ok(expr);
        }
        if ty.is_list() {
            let element = ty.list_element().ok_or_else(|| {
                ServerError::new(
                    ErrorKind::CompilerError,
                    format!("'{}' is not a collection type", ty.as_str()),
                )
            })?;
            self.shape_list(expr, &element, node)
        } else {
            self.shape_object(expr, ty.named_type(), node)
        }
    }

    /// Shapes a list-returning selection. An existing `Select` (inserted by
    /// the connection extension for edges) absorbs the selection record;
    /// otherwise one is appended.
    fn shape_list(
        &self,
        expr: Projection,
        element: &MetaFieldType,
        node: &SelectionNode,
    ) -> ServerResult<Projection> {
        match expr {
            Projection::Let { name, value, body } => Ok(Projection::Let {
                name,
                value,
                body: Box::new(self.shape_list(*body, element, node)?),
            }),
            Projection::Call {
                base,
                method: Method::Select(body),
            } => Ok(Projection::Call {
                base,
                method: Method::Select(Box::new(self.shape_object(
                    *body,
                    element.named_type(),
                    node,
                )?)),
            }),
            Projection::Call {
                base,
                method: Method::SelectWithIndex(body),
            } => Ok(Projection::Call {
                base,
                method: Method::SelectWithIndex(Box::new(self.shape_object(
                    *body,
                    element.named_type(),
                    node,
                )?)),
            }),
            other => {
                let record = self.shape_object(Projection::Parent, element.named_type(), node)?;
                Ok(other.call(Method::Select(Box::new(record))))
            }
        }
    }

    /// Shapes an object-returning selection. A virtual record (produced by a
    /// paging extension) is spliced member by member so unselected members
    /// are never evaluated; anything else is null-guarded and projected.
    fn shape_object(
        &self,
        expr: Projection,
        ty_name: &str,
        node: &SelectionNode,
    ) -> ServerResult<Projection> {
        match expr {
            Projection::Let { name, value, body } => Ok(Projection::Let {
                name,
                value,
                body: Box::new(self.shape_object(*body, ty_name, node)?),
            }),
            Projection::Object(members) => self.project_virtual(members, ty_name, node),
            other => {
                let mut record = Vec::with_capacity(node.children.len());
                for child in &node.children {
                    record.push((child.response_key.clone(), self.selection_expr(child)?));
                }
                Ok(other.guarded(Projection::Object(record)))
            }
        }
    }

    fn project_virtual(
        &self,
        members: Vec<(String, Projection)>,
        ty_name: &str,
        node: &SelectionNode,
    ) -> ServerResult<Projection> {
        let mut record = Vec::with_capacity(node.children.len());
        for child in &node.children {
            let expr = match &child.field {
                BoundField::Typename { ty } => self.typename_expr(ty),
                BoundField::Field { ty, name } => {
                    let definition = self.field_definition(ty, name, child)?;
                    self.authorize(ty_name, definition, child)?;
                    let base = members
                        .iter()
                        .find(|(member, _)| member == definition.target_host_member())
                        .map(|(_, expr)| expr.clone())
                        .unwrap_or_else(Projection::null);
                    let rewritten = self.apply_extensions(definition, base, child)?;
                    self.shape(rewritten, &definition.ty, child)?
                }
            };
            record.push((child.response_key.clone(), expr));
        }
        Ok(Projection::Object(record))
    }

    /// `__typename`: a literal for object types; interfaces and unions defer
    /// to a `__typename` member supplied by the host data.
    fn typename_expr(&self, ty: &str) -> Projection {
        match self.registry.types.get(ty) {
            Some(MetaType::Object(_)) | None => {
                Projection::Literal(ConstValue::String(ty.to_owned()))
            }
            Some(_) => Projection::parent_member("__typename"),
        }
    }
}
