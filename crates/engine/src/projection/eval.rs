//! Single-threaded evaluation of a composed projection against a host value
//! tree. Eager, in-memory semantics: a lazily evaluated host would interpret
//! the same tree against its own query builder instead.

use std::cmp::Ordering;

use async_graphql_value::ConstValue;
use graphql_cursor::GraphqlCursor;

use super::{BinaryOp, Method, OrderKey, Projection};
use crate::host::HostValue;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub(crate) enum EvalError {
    #[error("cannot access member '{name}' of a non-object value")]
    MemberOnNonObject { name: String },
    #[error("'{method}' expects a collection")]
    NotACollection { method: &'static str },
    #[error("predicate must evaluate to a boolean")]
    NonBooleanPredicate,
    #[error("condition must evaluate to a boolean")]
    NonBooleanCondition,
    #[error("operator '{op:?}' cannot be applied to these operand values")]
    InvalidOperands { op: BinaryOp },
    #[error("values cannot be ordered relative to each other")]
    Incomparable,
    #[error("division by zero")]
    DivisionByZero,
    #[error("numeric overflow")]
    Overflow,
    #[error("argument '{0}' was not bound before execution")]
    UnboundArgument(String),
    #[error("unknown local binding '{0}'")]
    UnboundLocal(String),
    #[error("element index is only available inside an indexed select")]
    IndexUnavailable,
    #[error("'skip' and 'take' expect an integer operand")]
    NonIntegerOperand,
    #[error("cursor offsets must be non-negative integers")]
    InvalidCursorOffset,
}

pub(crate) fn evaluate_root(
    projection: &Projection,
    root: &HostValue,
) -> Result<HostValue, EvalError> {
    evaluate(
        projection,
        &Scope {
            value: root,
            index: None,
            locals: &Locals::Empty,
        },
    )
}

struct Scope<'a> {
    value: &'a HostValue,
    index: Option<usize>,
    locals: &'a Locals<'a>,
}

enum Locals<'a> {
    Empty,
    Bind {
        name: &'a str,
        value: &'a HostValue,
        next: &'a Locals<'a>,
    },
}

impl Locals<'_> {
    fn get(&self, wanted: &str) -> Option<&HostValue> {
        let mut current = self;
        while let Locals::Bind { name, value, next } = current {
            if *name == wanted {
                return Some(value);
            }
            current = next;
        }
        None
    }
}

fn evaluate(projection: &Projection, scope: &Scope<'_>) -> Result<HostValue, EvalError> {
    match projection {
        Projection::Literal(value) => Ok(const_to_host(value)),
        Projection::Parent => Ok(scope.value.clone()),
        Projection::Index => scope
            .index
            .map(|index| HostValue::integer(index as i64))
            .ok_or(EvalError::IndexUnavailable),
        Projection::Argument(name) => Err(EvalError::UnboundArgument(name.clone())),
        Projection::Local(name) => scope
            .locals
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::UnboundLocal(name.clone())),
        Projection::Let { name, value, body } => {
            let bound = evaluate(value, scope)?;
            let locals = Locals::Bind {
                name,
                value: &bound,
                next: scope.locals,
            };
            evaluate(
                body,
                &Scope {
                    value: scope.value,
                    index: scope.index,
                    locals: &locals,
                },
            )
        }
        Projection::Member { base, name } => match evaluate(base, scope)? {
            HostValue::Null => Ok(HostValue::Null),
            HostValue::Object(members) => Ok(members
                .into_iter()
                .find(|(member, _)| member == name)
                .map(|(_, value)| value)
                .unwrap_or(HostValue::Null)),
            _ => Err(EvalError::MemberOnNonObject { name: name.clone() }),
        },
        Projection::Guarded { base, body } => {
            let value = evaluate(base, scope)?;
            if value.is_null() {
                return Ok(HostValue::Null);
            }
            evaluate(
                body,
                &Scope {
                    value: &value,
                    index: scope.index,
                    locals: scope.locals,
                },
            )
        }
        Projection::If {
            condition,
            then,
            otherwise,
        } => match evaluate(condition, scope)? {
            HostValue::Boolean(true) => evaluate(then, scope),
            HostValue::Boolean(false) => evaluate(otherwise, scope),
            _ => Err(EvalError::NonBooleanCondition),
        },
        Projection::Binary { op, lhs, rhs } => evaluate_binary(*op, lhs, rhs, scope),
        Projection::Object(members) => {
            let mut record = Vec::with_capacity(members.len());
            for (name, value) in members {
                record.push((name.clone(), evaluate(value, scope)?));
            }
            Ok(HostValue::Object(record))
        }
        Projection::Call { base, method } => {
            let value = evaluate(base, scope)?;
            evaluate_method(method, value, scope)
        }
        Projection::MapEnum { base, pairs } => Ok(map_enum(evaluate(base, scope)?, pairs)),
        Projection::EncodeCursor(offset) => {
            let offset = evaluate(offset, scope)?
                .as_i64()
                .filter(|value| *value >= 0)
                .ok_or(EvalError::InvalidCursorOffset)?;
            Ok(HostValue::String(
                GraphqlCursor::from_offset(offset as usize).into_string(),
            ))
        }
        Projection::Frozen(data) => Ok(HostValue::clone(data)),
    }
}

fn evaluate_method(
    method: &Method,
    value: HostValue,
    scope: &Scope<'_>,
) -> Result<HostValue, EvalError> {
    // Null collections stay null rather than failing the whole field.
    if value.is_null() {
        return Ok(HostValue::Null);
    }
    let HostValue::List(items) = value else {
        return Err(EvalError::NotACollection {
            method: method_name(method),
        });
    };

    match method {
        Method::Where(predicate) => {
            let mut kept = Vec::new();
            for (index, item) in items.into_iter().enumerate() {
                if matches(predicate, &item, index, scope)? {
                    kept.push(item);
                }
            }
            Ok(HostValue::List(kept))
        }
        Method::Any(predicate) => match predicate {
            None => Ok(HostValue::Boolean(!items.is_empty())),
            Some(predicate) => {
                for (index, item) in items.iter().enumerate() {
                    if matches(predicate, item, index, scope)? {
                        return Ok(HostValue::Boolean(true));
                    }
                }
                Ok(HostValue::Boolean(false))
            }
        },
        Method::First(predicate) => select_single(items, predicate.as_deref(), scope, false),
        Method::Last(predicate) => select_single(items, predicate.as_deref(), scope, true),
        Method::Count(predicate) => match predicate {
            None => Ok(HostValue::integer(items.len() as i64)),
            Some(predicate) => {
                let mut count = 0i64;
                for (index, item) in items.iter().enumerate() {
                    if matches(predicate, item, index, scope)? {
                        count += 1;
                    }
                }
                Ok(HostValue::integer(count))
            }
        },
        Method::OrderBy(keys) => order_by(items, keys, scope),
        Method::Skip(count) => {
            let count = operand_count(count, scope)?;
            Ok(HostValue::List(
                items.into_iter().skip(count).collect(),
            ))
        }
        Method::Take(count) => {
            let count = operand_count(count, scope)?;
            Ok(HostValue::List(
                items.into_iter().take(count).collect(),
            ))
        }
        Method::Select(body) | Method::SelectWithIndex(body) => {
            let mut mapped = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                mapped.push(evaluate(
                    body,
                    &Scope {
                        value: item,
                        index: Some(index),
                        locals: scope.locals,
                    },
                )?);
            }
            Ok(HostValue::List(mapped))
        }
    }
}

fn method_name(method: &Method) -> &'static str {
    match method {
        Method::Where(_) => "where",
        Method::Any(_) => "any",
        Method::First(_) => "first",
        Method::Last(_) => "last",
        Method::Count(_) => "count",
        Method::OrderBy(_) => "orderBy",
        Method::Skip(_) => "skip",
        Method::Take(_) => "take",
        Method::Select(_) | Method::SelectWithIndex(_) => "select",
    }
}

fn matches(
    predicate: &Projection,
    item: &HostValue,
    index: usize,
    scope: &Scope<'_>,
) -> Result<bool, EvalError> {
    match evaluate(
        predicate,
        &Scope {
            value: item,
            index: Some(index),
            locals: scope.locals,
        },
    )? {
        HostValue::Boolean(value) => Ok(value),
        _ => Err(EvalError::NonBooleanPredicate),
    }
}

fn select_single(
    items: Vec<HostValue>,
    predicate: Option<&Projection>,
    scope: &Scope<'_>,
    last: bool,
) -> Result<HostValue, EvalError> {
    let mut found = HostValue::Null;
    for (index, item) in items.into_iter().enumerate() {
        let matched = match predicate {
            None => true,
            Some(predicate) => matches(predicate, &item, index, scope)?,
        };
        if matched {
            if last {
                found = item;
            } else {
                return Ok(item);
            }
        }
    }
    Ok(found)
}

fn order_by(
    items: Vec<HostValue>,
    keys: &[OrderKey],
    scope: &Scope<'_>,
) -> Result<HostValue, EvalError> {
    let mut rows = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let mut evaluated = Vec::with_capacity(keys.len());
        for key in keys {
            evaluated.push(evaluate(
                &key.key,
                &Scope {
                    value: &item,
                    index: Some(index),
                    locals: scope.locals,
                },
            )?);
        }
        rows.push((evaluated, item));
    }
    rows.sort_by(|(left, _), (right, _)| {
        for (position, key) in keys.iter().enumerate() {
            let ordering = compare_for_order(&left[position], &right[position]);
            let ordering = if key.descending {
                ordering.reverse()
            } else {
                ordering
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
    Ok(HostValue::List(rows.into_iter().map(|(_, item)| item).collect()))
}

fn operand_count(count: &Projection, scope: &Scope<'_>) -> Result<usize, EvalError> {
    let value = evaluate(count, scope)?;
    match value.as_i64() {
        Some(count) => Ok(count.max(0) as usize),
        None => Err(EvalError::NonIntegerOperand),
    }
}

fn evaluate_binary(
    op: BinaryOp,
    lhs: &Projection,
    rhs: &Projection,
    scope: &Scope<'_>,
) -> Result<HostValue, EvalError> {
    // Logical operators short-circuit.
    if matches!(op, BinaryOp::And | BinaryOp::Or) {
        let left = boolean_operand(op, evaluate(lhs, scope)?)?;
        return match (op, left) {
            (BinaryOp::And, false) => Ok(HostValue::Boolean(false)),
            (BinaryOp::Or, true) => Ok(HostValue::Boolean(true)),
            _ => Ok(HostValue::Boolean(boolean_operand(op, evaluate(rhs, scope)?)?)),
        };
    }

    let left = evaluate(lhs, scope)?;
    let right = evaluate(rhs, scope)?;
    match op {
        BinaryOp::Equal => Ok(HostValue::Boolean(values_equal(&left, &right))),
        BinaryOp::NotEqual => Ok(HostValue::Boolean(!values_equal(&left, &right))),
        BinaryOp::Less | BinaryOp::LessOrEqual | BinaryOp::Greater | BinaryOp::GreaterOrEqual => {
            let ordering = compare(&left, &right)?;
            Ok(HostValue::Boolean(match op {
                BinaryOp::Less => ordering == Ordering::Less,
                BinaryOp::LessOrEqual => ordering != Ordering::Greater,
                BinaryOp::Greater => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }))
        }
        _ => {
            let (left, right) = match (numeric(&left), numeric(&right)) {
                (Some(left), Some(right)) => (left, right),
                _ => return Err(EvalError::InvalidOperands { op }),
            };
            arithmetic(op, left, right).map(Num::into_host)
        }
    }
}

fn boolean_operand(op: BinaryOp, value: HostValue) -> Result<bool, EvalError> {
    match value {
        HostValue::Boolean(value) => Ok(value),
        _ => Err(EvalError::InvalidOperands { op }),
    }
}

#[derive(Clone, Copy)]
enum Num {
    I(i64),
    F(f64),
}

impl Num {
    fn into_host(self) -> HostValue {
        match self {
            Num::I(value) => HostValue::integer(value),
            Num::F(value) => HostValue::float(value),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::I(value) => value as f64,
            Num::F(value) => value,
        }
    }
}

fn numeric(value: &HostValue) -> Option<Num> {
    match value {
        HostValue::Number(number) => number
            .as_i64()
            .map(Num::I)
            .or_else(|| number.as_f64().map(Num::F)),
        _ => None,
    }
}

fn arithmetic(op: BinaryOp, left: Num, right: Num) -> Result<Num, EvalError> {
    if let (Num::I(l), Num::I(r)) = (left, right) {
        return match op {
            BinaryOp::Add => l.checked_add(r).map(Num::I).ok_or(EvalError::Overflow),
            BinaryOp::Subtract => l.checked_sub(r).map(Num::I).ok_or(EvalError::Overflow),
            BinaryOp::Multiply => l.checked_mul(r).map(Num::I).ok_or(EvalError::Overflow),
            BinaryOp::Divide => {
                if r == 0 {
                    Err(EvalError::DivisionByZero)
                } else {
                    Ok(Num::I(l / r))
                }
            }
            BinaryOp::Modulo => {
                if r == 0 {
                    Err(EvalError::DivisionByZero)
                } else {
                    Ok(Num::I(l % r))
                }
            }
            BinaryOp::Power => {
                if r >= 0 {
                    let exponent = u32::try_from(r).map_err(|_| EvalError::Overflow)?;
                    l.checked_pow(exponent).map(Num::I).ok_or(EvalError::Overflow)
                } else {
                    Ok(Num::F((l as f64).powf(r as f64)))
                }
            }
            _ => Err(EvalError::InvalidOperands { op }),
        };
    }

    let (l, r) = (left.as_f64(), right.as_f64());
    match op {
        BinaryOp::Add => Ok(Num::F(l + r)),
        BinaryOp::Subtract => Ok(Num::F(l - r)),
        BinaryOp::Multiply => Ok(Num::F(l * r)),
        BinaryOp::Divide => Ok(Num::F(l / r)),
        BinaryOp::Modulo => Ok(Num::F(l % r)),
        BinaryOp::Power => Ok(Num::F(l.powf(r))),
        _ => Err(EvalError::InvalidOperands { op }),
    }
}

fn values_equal(left: &HostValue, right: &HostValue) -> bool {
    match (left, right) {
        (HostValue::Null, HostValue::Null) => true,
        (HostValue::Boolean(l), HostValue::Boolean(r)) => l == r,
        (HostValue::Number(_), HostValue::Number(_)) => {
            match (numeric(left), numeric(right)) {
                (Some(Num::I(l)), Some(Num::I(r))) => l == r,
                (Some(l), Some(r)) => l.as_f64() == r.as_f64(),
                _ => false,
            }
        }
        (
            HostValue::String(l) | HostValue::Enum(l),
            HostValue::String(r) | HostValue::Enum(r),
        ) => l == r,
        (HostValue::List(l), HostValue::List(r)) => {
            l.len() == r.len() && l.iter().zip(r).all(|(l, r)| values_equal(l, r))
        }
        (HostValue::Object(_), HostValue::Object(_)) => left == right,
        _ => false,
    }
}

fn compare(left: &HostValue, right: &HostValue) -> Result<Ordering, EvalError> {
    match (left, right) {
        (HostValue::Number(_), HostValue::Number(_)) => match (numeric(left), numeric(right)) {
            (Some(Num::I(l)), Some(Num::I(r))) => Ok(l.cmp(&r)),
            (Some(l), Some(r)) => l
                .as_f64()
                .partial_cmp(&r.as_f64())
                .ok_or(EvalError::Incomparable),
            _ => Err(EvalError::Incomparable),
        },
        (
            HostValue::String(l) | HostValue::Enum(l),
            HostValue::String(r) | HostValue::Enum(r),
        ) => Ok(l.cmp(r)),
        (HostValue::Boolean(l), HostValue::Boolean(r)) => Ok(l.cmp(r)),
        _ => Err(EvalError::Incomparable),
    }
}

/// Ordering for sort keys: nulls sort first, unrelated shapes keep their
/// relative order (the underlying sort is stable).
fn compare_for_order(left: &HostValue, right: &HostValue) -> Ordering {
    match (left.is_null(), right.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => compare(left, right).unwrap_or(Ordering::Equal),
    }
}

fn map_enum(value: HostValue, pairs: &[(String, String)]) -> HostValue {
    match value {
        HostValue::Enum(name) | HostValue::String(name) => {
            let mapped = pairs
                .iter()
                .find(|(host, _)| *host == name)
                .map(|(_, exposed)| exposed.clone())
                .unwrap_or(name);
            HostValue::Enum(mapped)
        }
        HostValue::List(items) => HostValue::List(
            items
                .into_iter()
                .map(|item| map_enum(item, pairs))
                .collect(),
        ),
        other => other,
    }
}

fn const_to_host(value: &ConstValue) -> HostValue {
    match value {
        ConstValue::Null => HostValue::Null,
        ConstValue::Number(number) => HostValue::Number(number.clone()),
        ConstValue::String(text) => HostValue::String(text.clone()),
        ConstValue::Boolean(value) => HostValue::Boolean(*value),
        ConstValue::Enum(name) => HostValue::Enum(name.to_string()),
        ConstValue::List(items) => HostValue::List(items.iter().map(const_to_host).collect()),
        ConstValue::Object(members) => HostValue::Object(
            members
                .iter()
                .map(|(name, value)| (name.to_string(), const_to_host(value)))
                .collect(),
        ),
        // Binary payloads have no surface in the schema model.
        ConstValue::Binary(_) => HostValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::Method;

    fn people() -> HostValue {
        HostValue::object([(
            "People",
            HostValue::List(
                [(1, "Luke"), (2, "Leia"), (3, "Han")]
                    .into_iter()
                    .map(|(id, name)| {
                        HostValue::object([
                            ("Id", HostValue::integer(id)),
                            ("Name", HostValue::string(name)),
                        ])
                    })
                    .collect(),
            ),
        )])
    }

    #[test]
    fn member_access_through_null_stays_null() {
        let projection = Projection::parent_member("Missing").member("Deeper");
        assert_eq!(evaluate_root(&projection, &people()), Ok(HostValue::Null));
    }

    #[test]
    fn guarded_null_short_circuits() {
        let projection = Projection::parent_member("Missing")
            .guarded(Projection::Object(vec![("x".into(), Projection::Parent)]));
        assert_eq!(evaluate_root(&projection, &people()), Ok(HostValue::Null));
    }

    #[test]
    fn where_then_count() {
        let predicate = Projection::binary(
            BinaryOp::Greater,
            Projection::parent_member("Id"),
            Projection::integer(1),
        );
        let projection = Projection::parent_member("People")
            .call(Method::Where(Box::new(predicate)))
            .count();
        assert_eq!(
            evaluate_root(&projection, &people()),
            Ok(HostValue::integer(2))
        );
    }

    #[test]
    fn order_by_key_descending() {
        let projection = Projection::parent_member("People")
            .call(Method::OrderBy(vec![OrderKey {
                key: Projection::parent_member("Name"),
                descending: true,
            }]))
            .call(Method::Select(Box::new(Projection::parent_member("Name"))));
        assert_eq!(
            evaluate_root(&projection, &people()),
            Ok(HostValue::List(vec![
                HostValue::string("Luke"),
                HostValue::string("Leia"),
                HostValue::string("Han"),
            ]))
        );
    }

    #[test]
    fn skip_take_select_with_index() {
        let body = Projection::Object(vec![
            ("id".into(), Projection::parent_member("Id")),
            ("cursor".into(), Projection::EncodeCursor(Box::new(Projection::Index))),
        ]);
        let projection = Projection::parent_member("People")
            .call(Method::Skip(Box::new(Projection::integer(1))))
            .call(Method::Take(Box::new(Projection::integer(1))))
            .call(Method::SelectWithIndex(Box::new(body)));
        let result = evaluate_root(&projection, &people()).unwrap();
        assert_eq!(
            result,
            HostValue::List(vec![HostValue::object([
                ("id", HostValue::integer(2)),
                ("cursor", HostValue::string("MA==")),
            ])])
        );
    }

    #[test]
    fn let_bindings_resolve_innermost_first() {
        let projection = Projection::bind_local(
            "total",
            Projection::integer(1),
            Projection::bind_local(
                "total",
                Projection::integer(2),
                Projection::local("total"),
            ),
        );
        assert_eq!(
            evaluate_root(&projection, &people()),
            Ok(HostValue::integer(2))
        );
    }

    #[test]
    fn integer_and_float_arithmetic() {
        let seven = Projection::binary(
            BinaryOp::Add,
            Projection::integer(3),
            Projection::binary(BinaryOp::Multiply, Projection::integer(2), Projection::integer(2)),
        );
        assert_eq!(evaluate_root(&seven, &people()), Ok(HostValue::integer(7)));

        let divided = Projection::binary(
            BinaryOp::Divide,
            Projection::Literal(ConstValue::Number(serde_json::Number::from_f64(5.0).unwrap())),
            Projection::integer(2),
        );
        assert_eq!(evaluate_root(&divided, &people()), Ok(HostValue::float(2.5)));

        let by_zero = Projection::binary(
            BinaryOp::Divide,
            Projection::integer(5),
            Projection::integer(0),
        );
        assert_eq!(
            evaluate_root(&by_zero, &people()),
            Err(EvalError::DivisionByZero)
        );
    }

    #[test]
    fn cross_numeric_equality() {
        let equal = Projection::binary(
            BinaryOp::Equal,
            Projection::integer(1),
            Projection::Literal(ConstValue::Number(serde_json::Number::from_f64(1.0).unwrap())),
        );
        assert_eq!(
            evaluate_root(&equal, &people()),
            Ok(HostValue::Boolean(true))
        );
    }
}
