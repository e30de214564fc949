mod coercion;

use std::collections::HashMap;

use async_graphql_parser::{
    types::{
        Directive, Field, FragmentDefinition, FragmentSpread, InlineFragment, Selection,
        SelectionSet, TypeCondition,
    },
    Positioned,
};
use async_graphql_value::{ConstValue, Name, Value, Variables};
use indexmap::IndexMap;

use crate::{
    error::{ErrorKind, Location, ServerError},
    registry::{MetaField, MetaType, Registry},
};

use super::{ArgumentSet, BoundField, OperationKind, ParsedOperation, RootEntry, SelectionNode};

pub(crate) type BindResult<T> = Result<T, BindError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub(crate) enum BindError {
    #[error("Field '{name}' not found on type '{ty}'")]
    UnknownField {
        ty: String,
        name: String,
        location: Location,
    },
    #[error("Field '{name}' cannot be selected on the union type '{ty}'")]
    UnionHasNoFields {
        ty: String,
        name: String,
        location: Location,
    },
    #[error("Argument '{name}' not found on field '{field}'")]
    UnknownArgument {
        field: String,
        name: String,
        location: Location,
    },
    #[error("Missing required argument '{name}' on field '{field}'")]
    MissingArgument {
        field: String,
        name: String,
        location: Location,
    },
    #[error("Invalid value for argument '{name}': {message}")]
    InvalidArgumentValue {
        name: String,
        message: String,
        location: Location,
    },
    #[error("Missing variable '${name}'")]
    MissingVariable { name: String, location: Location },
    #[error("Variable '${name}' is not defined")]
    UnknownVariable { name: String, location: Location },
    #[error("Unknown type '{name}'")]
    UnknownType { name: String, location: Location },
    #[error("Unknown fragment named '{name}'")]
    UnknownFragment { name: String, location: Location },
    #[error("Fragment cannot be spread here: type '{name}' does not intersect with '{parent}'")]
    DisjointTypeCondition {
        parent: String,
        name: String,
        location: Location,
    },
    #[error("Type '{name}' cannot be used as a fragment type condition")]
    InvalidTypeCondition { name: String, location: Location },
    #[error("Fields '{key}' conflict: they must select the same field with identical arguments")]
    FieldConflict { key: String, location: Location },
    #[error("Field '{name}' of type '{ty}' must have a selection of subfields")]
    MissingSelectionSet {
        name: String,
        ty: String,
        location: Location,
    },
    #[error("Field '{name}' must not have a selection since type '{ty}' has no subfields")]
    UnexpectedSelectionSet {
        name: String,
        ty: String,
        location: Location,
    },
    #[error("Directive '@{name}' requires an 'if' argument")]
    MissingDirectiveArgument { name: String, location: Location },
    #[error("Schema is not configured for mutations")]
    NoMutationRoot { location: Location },
}

impl BindError {
    fn location(&self) -> Location {
        match self {
            BindError::UnknownField { location, .. }
            | BindError::UnionHasNoFields { location, .. }
            | BindError::UnknownArgument { location, .. }
            | BindError::MissingArgument { location, .. }
            | BindError::InvalidArgumentValue { location, .. }
            | BindError::MissingVariable { location, .. }
            | BindError::UnknownVariable { location, .. }
            | BindError::UnknownType { location, .. }
            | BindError::UnknownFragment { location, .. }
            | BindError::DisjointTypeCondition { location, .. }
            | BindError::InvalidTypeCondition { location, .. }
            | BindError::FieldConflict { location, .. }
            | BindError::MissingSelectionSet { location, .. }
            | BindError::UnexpectedSelectionSet { location, .. }
            | BindError::MissingDirectiveArgument { location, .. }
            | BindError::NoMutationRoot { location } => *location,
        }
    }

    /// Argument-value failures null the owning top-level field and never
    /// abort peers; everything else aborts the whole request.
    fn is_field_level(&self) -> bool {
        matches!(
            self,
            BindError::InvalidArgumentValue { .. } | BindError::MissingArgument { .. }
        )
    }

    pub(crate) fn into_server_error(self) -> ServerError {
        let location = self.location();
        let kind = match &self {
            BindError::InvalidArgumentValue { .. }
            | BindError::MissingVariable { .. }
            | BindError::MissingArgument { .. } => ErrorKind::InvalidArgument,
            _ => ErrorKind::CompilerError,
        };
        ServerError::new(kind, &self).with_location(location)
    }
}

/// The bound operation: the selection tree validated against the schema, with
/// fragments resolved, directives applied and argument values evaluated.
/// Consumed by the expression builder; per-request, never cached.
#[derive(Debug, Clone)]
pub struct OperationPlan {
    pub kind: OperationKind,
    pub name: Option<String>,
    pub root: Vec<RootEntry>,
}

pub(crate) fn bind(
    registry: &Registry,
    parsed: &ParsedOperation,
    variables: &Variables,
) -> BindResult<OperationPlan> {
    let operation = &parsed.definition;
    let binder = Binder::new(registry, parsed, variables)?;

    let root_type = match parsed.kind {
        OperationKind::Query => registry.query_type.clone(),
        OperationKind::Mutation => match &registry.mutation_type {
            Some(name) => name.clone(),
            None => {
                return Err(BindError::NoMutationRoot {
                    location: operation.pos.into(),
                })
            }
        },
    };

    let mut pending = IndexMap::new();
    binder.register_selection_set(&root_type, &operation.node.selection_set.node, &mut pending)?;

    let mut root = Vec::with_capacity(pending.len());
    for (response_key, entry) in pending {
        match binder.finalize(response_key.clone(), entry) {
            Ok(node) => root.push(RootEntry::Selection(node)),
            Err(error) if error.is_field_level() => root.push(RootEntry::Failed {
                response_key,
                error: error.into_server_error(),
            }),
            Err(error) => return Err(error),
        }
    }

    Ok(OperationPlan {
        kind: parsed.kind,
        name: parsed.name.clone(),
        root,
    })
}

pub(crate) struct Binder<'a> {
    registry: &'a Registry,
    fragments: &'a HashMap<Name, Positioned<FragmentDefinition>>,
    /// Variable values after defaults and presence checks.
    variables: IndexMap<String, ConstValue>,
}

/// Selections pending finalisation, keyed by response key. Duplicate output
/// names merge when they refer to the same field with identical (still
/// unevaluated) arguments; argument binding itself is deferred to
/// finalisation so an invalid value fails only its own root field.
enum Pending<'p> {
    Typename {
        ty: String,
        location: Location,
    },
    Field {
        owner_ty: String,
        field_name: String,
        arguments: &'p [(Positioned<Name>, Positioned<Value>)],
        selection_sets: Vec<&'p SelectionSet>,
        location: Location,
    },
}

impl<'a> Binder<'a> {
    fn new(
        registry: &'a Registry,
        parsed: &'a ParsedOperation,
        provided: &Variables,
    ) -> BindResult<Self> {
        let mut variables = IndexMap::new();
        for definition in &parsed.definition.node.variable_definitions {
            let name = definition.node.name.node.to_string();
            let location: Location = definition.pos.into();
            let supplied = provided
                .iter()
                .find(|(key, _)| key.as_str() == name)
                .map(|(_, value)| value.clone());

            let var_type = definition.node.var_type.node.to_string();
            let value = match supplied {
                Some(value) => value,
                None => match &definition.node.default_value {
                    Some(default) => default.node.clone(),
                    None if !definition.node.var_type.node.nullable => {
                        return Err(BindError::MissingVariable { name, location });
                    }
                    None => ConstValue::Null,
                },
            };
            let coerced = coercion::coerce_const(registry, &var_type.into(), value).map_err(
                |message| BindError::InvalidArgumentValue {
                    name: name.clone(),
                    message,
                    location,
                },
            )?;
            variables.insert(name, coerced);
        }

        Ok(Binder {
            registry,
            fragments: &parsed.fragments,
            variables,
        })
    }

    fn variable(&self, name: &Name, location: Location) -> BindResult<ConstValue> {
        self.variables
            .get(name.as_str())
            .cloned()
            .ok_or_else(|| BindError::UnknownVariable {
                name: name.to_string(),
                location,
            })
    }

    /// Substitutes variables within an argument (or directive) value.
    fn resolve_value(&self, value: Value, location: Location) -> BindResult<ConstValue> {
        value.into_const_with(|name| self.variable(&name, location))
    }

    fn bind_selection_sets(
        &self,
        parent_ty: &str,
        selection_sets: &[&'a SelectionSet],
    ) -> BindResult<Vec<SelectionNode>> {
        let mut pending: IndexMap<String, Pending<'a>> = IndexMap::new();
        for selection_set in selection_sets {
            self.register_selection_set(parent_ty, selection_set, &mut pending)?;
        }
        pending
            .into_iter()
            .map(|(key, entry)| self.finalize(key, entry))
            .collect()
    }

    fn finalize(&self, response_key: String, entry: Pending<'a>) -> BindResult<SelectionNode> {
        match entry {
            Pending::Typename { ty, location } => Ok(SelectionNode {
                response_key,
                field: BoundField::Typename { ty },
                arguments: ArgumentSet::new(),
                children: Vec::new(),
                location,
            }),
            Pending::Field {
                owner_ty,
                field_name,
                arguments,
                selection_sets,
                location,
            } => {
                let definition = self
                    .field_definition(&owner_ty, &field_name, location)?
                    .clone();
                let arguments = self.bind_arguments(&definition, arguments, location)?;
                let return_type = definition.ty.named_type().to_owned();
                let has_selection = selection_sets
                    .iter()
                    .any(|selection_set| !selection_set.items.is_empty());

                let children = match self.registry.lookup(&return_type) {
                    Ok(ty) if ty.is_composite() => {
                        if !has_selection {
                            return Err(BindError::MissingSelectionSet {
                                name: field_name,
                                ty: return_type,
                                location,
                            });
                        }
                        self.bind_selection_sets(&return_type, &selection_sets)?
                    }
                    _ => {
                        if has_selection {
                            return Err(BindError::UnexpectedSelectionSet {
                                name: field_name,
                                ty: return_type,
                                location,
                            });
                        }
                        Vec::new()
                    }
                };

                Ok(SelectionNode {
                    response_key,
                    field: BoundField::Field {
                        ty: owner_ty,
                        name: field_name,
                    },
                    arguments,
                    children,
                    location,
                })
            }
        }
    }

    fn register_selection_set(
        &self,
        parent_ty: &str,
        selection_set: &'a SelectionSet,
        pending: &mut IndexMap<String, Pending<'a>>,
    ) -> BindResult<()> {
        for item in &selection_set.items {
            match &item.node {
                Selection::Field(field) => self.register_field(parent_ty, field, pending)?,
                Selection::FragmentSpread(spread) => {
                    self.register_fragment_spread(parent_ty, spread, pending)?;
                }
                Selection::InlineFragment(fragment) => {
                    self.register_inline_fragment(parent_ty, fragment, pending)?;
                }
            }
        }
        Ok(())
    }

    fn register_field(
        &self,
        parent_ty: &str,
        field: &'a Positioned<Field>,
        pending: &mut IndexMap<String, Pending<'a>>,
    ) -> BindResult<()> {
        let location: Location = field.pos.into();
        if !self.include(&field.node.directives)? {
            return Ok(());
        }

        let name = field.node.name.node.as_str();
        let response_key = field
            .node
            .alias
            .as_ref()
            .map(|alias| alias.node.to_string())
            .unwrap_or_else(|| name.to_owned());

        if name == "__typename" {
            match pending.get(&response_key) {
                None => {
                    pending.insert(
                        response_key,
                        Pending::Typename {
                            ty: parent_ty.to_owned(),
                            location,
                        },
                    );
                }
                Some(Pending::Typename { .. }) => {}
                Some(Pending::Field { .. }) => {
                    return Err(BindError::FieldConflict {
                        key: response_key,
                        location,
                    });
                }
            }
            return Ok(());
        }

        // Validate the field reference eagerly; unknown fields abort binding.
        self.field_definition(parent_ty, name, location)?;

        match pending.get_mut(&response_key) {
            None => {
                pending.insert(
                    response_key,
                    Pending::Field {
                        owner_ty: parent_ty.to_owned(),
                        field_name: name.to_owned(),
                        arguments: &field.node.arguments,
                        selection_sets: vec![&field.node.selection_set.node],
                        location,
                    },
                );
            }
            Some(Pending::Field {
                owner_ty,
                field_name,
                arguments,
                selection_sets,
                ..
            }) if owner_ty == parent_ty
                && field_name == name
                && raw_arguments_equal(arguments, &field.node.arguments) =>
            {
                selection_sets.push(&field.node.selection_set.node);
            }
            Some(_) => {
                return Err(BindError::FieldConflict {
                    key: response_key,
                    location,
                });
            }
        }
        Ok(())
    }

    fn register_fragment_spread(
        &self,
        parent_ty: &str,
        spread: &'a Positioned<FragmentSpread>,
        pending: &mut IndexMap<String, Pending<'a>>,
    ) -> BindResult<()> {
        let location: Location = spread.pos.into();
        if !self.include(&spread.node.directives)? {
            return Ok(());
        }
        let name = &spread.node.fragment_name.node;
        let fragment = self
            .fragments
            .get(name)
            .ok_or_else(|| BindError::UnknownFragment {
                name: name.to_string(),
                location,
            })?;
        let ty = self.bind_type_condition(parent_ty, &fragment.node.type_condition, location)?;
        self.register_selection_set(&ty, &fragment.node.selection_set.node, pending)
    }

    fn register_inline_fragment(
        &self,
        parent_ty: &str,
        fragment: &'a Positioned<InlineFragment>,
        pending: &mut IndexMap<String, Pending<'a>>,
    ) -> BindResult<()> {
        let location: Location = fragment.pos.into();
        if !self.include(&fragment.node.directives)? {
            return Ok(());
        }
        let ty = match &fragment.node.type_condition {
            Some(condition) => self.bind_type_condition(parent_ty, condition, location)?,
            None => parent_ty.to_owned(),
        };
        self.register_selection_set(&ty, &fragment.node.selection_set.node, pending)
    }

    /// Object-to-object identity, or interface/union membership: the type
    /// condition must share at least one concrete type with the parent.
    fn bind_type_condition(
        &self,
        parent_ty: &str,
        condition: &Positioned<TypeCondition>,
        location: Location,
    ) -> BindResult<String> {
        let name = condition.node.on.node.as_str();
        let condition_ty = self
            .registry
            .types
            .get(name)
            .ok_or_else(|| BindError::UnknownType {
                name: name.to_owned(),
                location,
            })?;
        if !condition_ty.is_composite() {
            return Err(BindError::InvalidTypeCondition {
                name: name.to_owned(),
                location,
            });
        }
        let parent = self
            .registry
            .types
            .get(parent_ty)
            .ok_or_else(|| BindError::UnknownType {
                name: parent_ty.to_owned(),
                location,
            })?;

        let condition_possible = condition_ty.possible_types();
        let intersects = parent
            .possible_types()
            .iter()
            .any(|ty| condition_possible.contains(ty));
        if intersects {
            Ok(name.to_owned())
        } else {
            Err(BindError::DisjointTypeCondition {
                parent: parent_ty.to_owned(),
                name: name.to_owned(),
                location,
            })
        }
    }

    fn field_definition(
        &self,
        parent_ty: &str,
        name: &str,
        location: Location,
    ) -> BindResult<&'a MetaField> {
        let parent = self
            .registry
            .types
            .get(parent_ty)
            .ok_or_else(|| BindError::UnknownType {
                name: parent_ty.to_owned(),
                location,
            })?;
        if let MetaType::Union(_) = parent {
            return Err(BindError::UnionHasNoFields {
                ty: parent_ty.to_owned(),
                name: name.to_owned(),
                location,
            });
        }
        parent
            .field_by_name(name)
            .ok_or_else(|| BindError::UnknownField {
                ty: parent_ty.to_owned(),
                name: name.to_owned(),
                location,
            })
    }

    /// Evaluates `@skip(if:)` / `@include(if:)`; excluded selections are
    /// dropped before expression building.
    fn include(&self, directives: &[Positioned<Directive>]) -> BindResult<bool> {
        for directive in directives {
            let name = directive.node.name.node.as_str();
            if !matches!(name, "skip" | "include") {
                continue;
            }
            let location: Location = directive.pos.into();
            let argument = directive
                .node
                .arguments
                .iter()
                .find(|(argument, _)| argument.node.as_str() == "if")
                .ok_or_else(|| BindError::MissingDirectiveArgument {
                    name: name.to_owned(),
                    location,
                })?;
            let condition = match self.resolve_value(argument.1.node.clone(), location)? {
                ConstValue::Boolean(value) => value,
                other => {
                    return Err(BindError::InvalidArgumentValue {
                        name: "if".to_owned(),
                        message: format!(r#"Expected input type "Boolean!", found {other}."#),
                        location,
                    });
                }
            };
            if (name == "skip" && condition) || (name == "include" && !condition) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Binds the written arguments against the declared argument schema:
    /// coerces present values, applies defaults, rejects missing required
    /// arguments and unknown names.
    fn bind_arguments(
        &self,
        definition: &MetaField,
        arguments: &[(Positioned<Name>, Positioned<Value>)],
        location: Location,
    ) -> BindResult<ArgumentSet> {
        let mut remaining: Vec<&(Positioned<Name>, Positioned<Value>)> =
            arguments.iter().collect();
        let mut bound = ArgumentSet::new();

        for argument in definition.args.values() {
            if let Some(index) = remaining
                .iter()
                .position(|(name, _)| name.node.as_str() == argument.name)
            {
                let (_, value) = remaining.swap_remove(index);
                let value_location: Location = value.pos.into();
                let resolved = self.resolve_value(value.node.clone(), value_location)?;
                let coerced = coercion::coerce_const(self.registry, &argument.ty, resolved)
                    .map_err(|message| BindError::InvalidArgumentValue {
                        name: argument.name.clone(),
                        message,
                        location: value_location,
                    })?;
                bound.insert(argument.name.clone(), coerced);
            } else if let Some(default) = &argument.default_value {
                bound.insert(argument.name.clone(), default.clone());
            } else if argument.ty.is_non_null() {
                return Err(BindError::MissingArgument {
                    field: definition.name.clone(),
                    name: argument.name.clone(),
                    location,
                });
            }
        }

        if let Some((name, _)) = remaining.first() {
            return Err(BindError::UnknownArgument {
                field: definition.name.clone(),
                name: name.node.to_string(),
                location,
            });
        }
        Ok(bound)
    }
}

fn raw_arguments_equal(
    left: &[(Positioned<Name>, Positioned<Value>)],
    right: &[(Positioned<Name>, Positioned<Value>)],
) -> bool {
    left.len() == right.len()
        && left
            .iter()
            .zip(right)
            .all(|((ln, lv), (rn, rv))| ln.node == rn.node && lv.node == rv.node)
}
