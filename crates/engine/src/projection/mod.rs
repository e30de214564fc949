//! The composable expression tree a GraphQL operation compiles into: a pure
//! read over the host object graph. One composed [`Projection`] per top-level
//! field is what the executor evaluates.

use std::sync::Arc;

use async_graphql_value::ConstValue;

use crate::{host::HostValue, operation::ArgumentSet};

mod builder;
mod eval;

pub(crate) use builder::ProjectionBuilder;
pub(crate) use eval::evaluate_root;

/// A node of a projection expression.
///
/// `Parent` refers to the value in scope: the host context at the root, the
/// guarded value inside [`Projection::Guarded`], and the element inside the
/// lambda of a collection method. `Local` refers to the nearest enclosing
/// [`Projection::Let`] binding of the same name.
#[derive(Clone, Debug, PartialEq)]
pub enum Projection {
    Literal(ConstValue),
    /// The value in scope.
    Parent,
    /// The element index, valid inside [`Method::SelectWithIndex`].
    Index,
    /// A named argument of the field under compilation. Substituted with the
    /// bound value before execution; an unbound reference is an execution
    /// error.
    Argument(String),
    Local(String),
    Let {
        name: String,
        value: Box<Projection>,
        body: Box<Projection>,
    },
    /// Host member access.
    Member {
        base: Box<Projection>,
        name: String,
    },
    /// `base == null ? null : body`, with `Parent` rebound to `base` inside
    /// `body`. The only node that dereferences into an object, so nested
    /// member access never hits null.
    Guarded {
        base: Box<Projection>,
        body: Box<Projection>,
    },
    If {
        condition: Box<Projection>,
        then: Box<Projection>,
        otherwise: Box<Projection>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Projection>,
        rhs: Box<Projection>,
    },
    /// Anonymous record construction over the current scope.
    Object(Vec<(String, Projection)>),
    /// A collection method invocation.
    Call {
        base: Box<Projection>,
        method: Method,
    },
    /// Maps enumeration values from host spelling to schema spelling.
    MapEnum {
        base: Box<Projection>,
        pairs: Vec<(String, String)>,
    },
    /// Encodes an integer offset as an opaque cursor string.
    EncodeCursor(Box<Projection>),
    /// Pre-built host data, shared across plans (reflective schema values).
    Frozen(Arc<HostValue>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Power,
    Multiply,
    Divide,
    Modulo,
    Add,
    Subtract,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Equal,
    NotEqual,
    And,
    Or,
}

/// A method over a collection value. Lambda operands (`Where` predicates,
/// `Select` bodies, order keys) see each element as `Parent`.
#[derive(Clone, Debug, PartialEq)]
pub enum Method {
    Where(Box<Projection>),
    Any(Option<Box<Projection>>),
    First(Option<Box<Projection>>),
    Last(Option<Box<Projection>>),
    Count(Option<Box<Projection>>),
    OrderBy(Vec<OrderKey>),
    Skip(Box<Projection>),
    Take(Box<Projection>),
    Select(Box<Projection>),
    /// `Select` with the zero-based element index exposed as
    /// [`Projection::Index`].
    SelectWithIndex(Box<Projection>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrderKey {
    pub key: Projection,
    pub descending: bool,
}

impl Projection {
    pub fn null() -> Projection {
        Projection::Literal(ConstValue::Null)
    }

    pub fn integer(value: i64) -> Projection {
        Projection::Literal(ConstValue::Number(value.into()))
    }

    pub fn boolean(value: bool) -> Projection {
        Projection::Literal(ConstValue::Boolean(value))
    }

    /// Member access on the value in scope.
    pub fn parent_member(name: impl Into<String>) -> Projection {
        Projection::Parent.member(name)
    }

    pub fn member(self, name: impl Into<String>) -> Projection {
        Projection::Member {
            base: Box::new(self),
            name: name.into(),
        }
    }

    pub fn call(self, method: Method) -> Projection {
        Projection::Call {
            base: Box::new(self),
            method,
        }
    }

    pub fn count(self) -> Projection {
        self.call(Method::Count(None))
    }

    pub fn guarded(self, body: Projection) -> Projection {
        Projection::Guarded {
            base: Box::new(self),
            body: Box::new(body),
        }
    }

    pub fn binary(op: BinaryOp, lhs: Projection, rhs: Projection) -> Projection {
        Projection::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn bind_local(name: impl Into<String>, value: Projection, body: Projection) -> Projection {
        Projection::Let {
            name: name.into(),
            value: Box::new(value),
            body: Box::new(body),
        }
    }

    pub fn local(name: impl Into<String>) -> Projection {
        Projection::Local(name.into())
    }

    /// Substitutes every [`Projection::Argument`] reference with the bound
    /// value, making the fragment self-contained.
    #[must_use]
    pub(crate) fn bind_arguments(self, arguments: &ArgumentSet) -> Projection {
        self.map(&mut |node| match node {
            Projection::Argument(name) => {
                let value = arguments.get(name.as_str()).cloned().unwrap_or(ConstValue::Null);
                Projection::Literal(value)
            }
            other => other,
        })
    }

    /// Bottom-up rewrite of the whole tree, descending into lambda scopes.
    fn map(self, f: &mut dyn FnMut(Projection) -> Projection) -> Projection {
        let mapped = match self {
            Projection::Let { name, value, body } => Projection::Let {
                name,
                value: Box::new(value.map(f)),
                body: Box::new(body.map(f)),
            },
            Projection::Member { base, name } => Projection::Member {
                base: Box::new(base.map(f)),
                name,
            },
            Projection::Guarded { base, body } => Projection::Guarded {
                base: Box::new(base.map(f)),
                body: Box::new(body.map(f)),
            },
            Projection::If {
                condition,
                then,
                otherwise,
            } => Projection::If {
                condition: Box::new(condition.map(f)),
                then: Box::new(then.map(f)),
                otherwise: Box::new(otherwise.map(f)),
            },
            Projection::Binary { op, lhs, rhs } => Projection::Binary {
                op,
                lhs: Box::new(lhs.map(f)),
                rhs: Box::new(rhs.map(f)),
            },
            Projection::Object(members) => Projection::Object(
                members
                    .into_iter()
                    .map(|(name, value)| (name, value.map(f)))
                    .collect(),
            ),
            Projection::Call { base, method } => Projection::Call {
                base: Box::new(base.map(f)),
                method: method.map(f),
            },
            Projection::MapEnum { base, pairs } => Projection::MapEnum {
                base: Box::new(base.map(f)),
                pairs,
            },
            Projection::EncodeCursor(offset) => Projection::EncodeCursor(Box::new(offset.map(f))),
            leaf => leaf,
        };
        f(mapped)
    }
}

impl Method {
    fn map(self, f: &mut dyn FnMut(Projection) -> Projection) -> Method {
        match self {
            Method::Where(predicate) => Method::Where(Box::new(predicate.map(f))),
            Method::Any(predicate) => Method::Any(predicate.map(|p| Box::new(p.map(f)))),
            Method::First(predicate) => Method::First(predicate.map(|p| Box::new(p.map(f)))),
            Method::Last(predicate) => Method::Last(predicate.map(|p| Box::new(p.map(f)))),
            Method::Count(predicate) => Method::Count(predicate.map(|p| Box::new(p.map(f)))),
            Method::OrderBy(keys) => Method::OrderBy(
                keys.into_iter()
                    .map(|OrderKey { key, descending }| OrderKey {
                        key: key.map(f),
                        descending,
                    })
                    .collect(),
            ),
            Method::Skip(count) => Method::Skip(Box::new(count.map(f))),
            Method::Take(count) => Method::Take(Box::new(count.map(f))),
            Method::Select(body) => Method::Select(Box::new(body.map(f))),
            Method::SelectWithIndex(body) => Method::SelectWithIndex(Box::new(body.map(f))),
        }
    }
}
