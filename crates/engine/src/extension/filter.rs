//! The filter extension: adds a `filter: String` argument whose value is an
//! expression in the filter sub-language, compiled against the element type
//! into a `Where` predicate ahead of any selection.

use async_graphql_value::ConstValue;
use filter_language::{BinaryOp as AstOp, Expr, Literal, Segment};

use crate::{
    error::ServerResult,
    operation::ArgumentSet,
    projection::{BinaryOp, Method, OrderKey, Projection},
    registry::{MetaField, MetaFieldType, MetaInputValue, Registry, SchemaError},
};

use super::{invalid_argument, FieldExtension, RewriteContext};

impl Registry {
    /// Attaches the filter extension to a collection field.
    pub fn use_filter(&mut self, type_name: &str, field_name: &str) -> Result<(), SchemaError> {
        let field = self
            .get_field(type_name, field_name)
            .ok_or_else(|| SchemaError::UnknownField {
                ty: type_name.to_owned(),
                field: field_name.to_owned(),
            })?;
        if !field.ty.is_list() {
            return Err(SchemaError::NotACollection {
                ty: type_name.to_owned(),
                field: field_name.to_owned(),
            });
        }
        let element_type = field.ty.named_type().to_owned();

        let field = self.field_mut(type_name, field_name)?;
        field.args.insert(
            "filter".to_owned(),
            MetaInputValue::new("filter", "String")
                .with_description("Filter expression applied to the collection"),
        );
        field
            .extensions
            .push(FieldExtension::Filter(FilterExtension { element_type }));
        self.touch();
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct FilterExtension {
    element_type: String,
}

impl FilterExtension {
    pub(crate) fn rewrite(
        &self,
        cx: &RewriteContext<'_>,
        expr: Projection,
        arguments: &ArgumentSet,
    ) -> ServerResult<Projection> {
        let source = match arguments.get("filter") {
            None | Some(ConstValue::Null) => return Ok(expr),
            Some(ConstValue::String(source)) => source,
            Some(_) => {
                return Err(invalid_argument(format!(
                    "'filter' on field '{}' must be a string",
                    cx.field_name
                )));
            }
        };
        let ast = filter_language::parse(source)
            .map_err(|error| invalid_argument(format!("Invalid filter: {error}")))?;
        let predicate = lower_expr(cx.registry, &self.element_type, &ast)
            .map_err(|error| invalid_argument(format!("Invalid filter: {error}")))?;
        Ok(expr.call(Method::Where(Box::new(predicate))))
    }
}

/// Lowers a parsed filter expression into a projection predicate. `scope_ty`
/// is the type the `Parent` of the predicate refers to.
fn lower_expr(registry: &Registry, scope_ty: &str, expr: &Expr) -> Result<Projection, String> {
    match expr {
        Expr::Literal(literal) => Ok(Projection::Literal(lower_literal(literal))),
        Expr::Binary { op, lhs, rhs } => Ok(Projection::binary(
            lower_op(*op),
            lower_expr(registry, scope_ty, lhs)?,
            lower_expr(registry, scope_ty, rhs)?,
        )),
        Expr::Path(segments) => lower_path(registry, scope_ty, segments),
    }
}

fn lower_path(
    registry: &Registry,
    scope_ty: &str,
    segments: &[Segment],
) -> Result<Projection, String> {
    let mut expr = Projection::Parent;
    let mut ty = MetaFieldType::from(format!("{scope_ty}!"));

    for segment in segments {
        match &segment.args {
            None => {
                let field = resolve_field(registry, &ty, &segment.name)?;
                expr = expr.member(field.target_host_member().to_owned());
                ty = field.ty.clone();
            }
            Some(args) => {
                (expr, ty) = lower_method(registry, scope_ty, expr, ty, segment, args)?;
            }
        }
    }
    Ok(expr)
}

/// Identifiers are matched case-insensitively against the camelCase surface.
fn resolve_field<'r>(
    registry: &'r Registry,
    ty: &MetaFieldType,
    name: &str,
) -> Result<&'r MetaField, String> {
    if ty.is_list() {
        return Err(format!(
            "'{name}' cannot be accessed on a collection; use a method such as where() or first()"
        ));
    }
    let object = registry
        .lookup_object(ty.named_type())
        .map_err(|_| format!("'{}' has no fields to filter on", ty.named_type()))?;
    object
        .field_ignore_case(name)
        .ok_or_else(|| format!("Unknown field '{name}' on type '{}'", object.name))
}

fn lower_method(
    registry: &Registry,
    scope_ty: &str,
    expr: Projection,
    ty: MetaFieldType,
    segment: &Segment,
    args: &[Expr],
) -> Result<(Projection, MetaFieldType), String> {
    let name = segment.name.to_ascii_lowercase();
    let element = |ty: &MetaFieldType| {
        ty.list_element().ok_or_else(|| {
            format!("'{}' can only be called on a collection", segment.name)
        })
    };
    let lambda = |args: &[Expr], element: &MetaFieldType| -> Result<Option<Box<Projection>>, String> {
        match args {
            [] => Ok(None),
            [predicate] => Ok(Some(Box::new(lower_expr(
                registry,
                element.named_type(),
                predicate,
            )?))),
            _ => Err(format!("'{}' takes at most one predicate", segment.name)),
        }
    };

    match name.as_str() {
        "where" | "filter" => {
            let element = element(&ty)?;
            let predicate = lambda(args, &element)?
                .ok_or_else(|| format!("'{}' requires a predicate", segment.name))?;
            Ok((expr.call(Method::Where(predicate)), ty))
        }
        "any" => {
            let element = element(&ty)?;
            let predicate = lambda(args, &element)?;
            Ok((expr.call(Method::Any(predicate)), "Boolean!".into()))
        }
        "first" | "last" => {
            let element = element(&ty)?;
            let predicate = lambda(args, &element)?;
            let method = if name == "first" {
                Method::First(predicate)
            } else {
                Method::Last(predicate)
            };
            Ok((expr.call(method), element))
        }
        "count" => {
            let element = element(&ty)?;
            let predicate = lambda(args, &element)?;
            Ok((expr.call(Method::Count(predicate)), "Int!".into()))
        }
        "take" | "skip" => {
            let element = element(&ty)?;
            let _ = element;
            let [count] = args else {
                return Err(format!("'{}' requires an integer argument", segment.name));
            };
            // The operand evaluates in the enclosing scope, not per element.
            let count = lower_expr(registry, scope_ty, count)?;
            let method = if name == "take" {
                Method::Take(Box::new(count))
            } else {
                Method::Skip(Box::new(count))
            };
            Ok((expr.call(method), ty))
        }
        "orderby" | "orderbydesc" => {
            let element = element(&ty)?;
            let [key] = args else {
                return Err(format!("'{}' requires a field argument", segment.name));
            };
            let key = lower_expr(registry, element.named_type(), key)?;
            let keys = vec![OrderKey {
                key,
                descending: name == "orderbydesc",
            }];
            Ok((expr.call(Method::OrderBy(keys)), ty))
        }
        _ => Err(format!("Unknown method '{}'", segment.name)),
    }
}

fn lower_literal(literal: &Literal) -> ConstValue {
    match literal {
        Literal::Null => ConstValue::Null,
        Literal::Boolean(value) => ConstValue::Boolean(*value),
        Literal::Integer(value) => ConstValue::Number((*value).into()),
        Literal::Float(value) => serde_json::Number::from_f64(*value)
            .map(ConstValue::Number)
            .unwrap_or(ConstValue::Null),
        Literal::String(value) => ConstValue::String(value.clone()),
    }
}

fn lower_op(op: AstOp) -> BinaryOp {
    match op {
        AstOp::Power => BinaryOp::Power,
        AstOp::Multiply => BinaryOp::Multiply,
        AstOp::Divide => BinaryOp::Divide,
        AstOp::Modulo => BinaryOp::Modulo,
        AstOp::Add => BinaryOp::Add,
        AstOp::Subtract => BinaryOp::Subtract,
        AstOp::Less => BinaryOp::Less,
        AstOp::LessOrEqual => BinaryOp::LessOrEqual,
        AstOp::Greater => BinaryOp::Greater,
        AstOp::GreaterOrEqual => BinaryOp::GreaterOrEqual,
        AstOp::Equal => BinaryOp::Equal,
        AstOp::NotEqual => BinaryOp::NotEqual,
        AstOp::And => BinaryOp::And,
        AstOp::Or => BinaryOp::Or,
    }
}
