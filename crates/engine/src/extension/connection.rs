//! The connection (cursor) paging extension. Configuration registers the
//! `PageInfo`, `<T>Edge` and `<T>Connection` wrapper types, rewrites the
//! field return type and takes ownership of previously attached extensions so
//! that filters and sorts apply to the underlying collection rather than the
//! connection wrapper.

use async_graphql_value::ConstValue;
use graphql_cursor::GraphqlCursor;

use crate::{
    error::{ErrorKind, ServerError, ServerResult},
    operation::ArgumentSet,
    projection::{BinaryOp, Method, Projection},
    registry::{MetaField, MetaInputValue, ObjectType, Registry, SchemaError},
};

use super::{invalid_argument, page_size_arg, FieldExtension, RewriteContext};

impl Registry {
    /// Attaches cursor-based connection paging to a collection field.
    pub fn use_connection_paging(
        &mut self,
        type_name: &str,
        field_name: &str,
    ) -> Result<(), SchemaError> {
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
        let edge_type = format!("{element_type}Edge");
        let connection_type = format!("{element_type}Connection");

        self.add_type_if_absent(ObjectType::new(
            "PageInfo",
            [
                MetaField::new("hasNextPage", "Boolean!"),
                MetaField::new("hasPreviousPage", "Boolean!"),
                MetaField::new("startCursor", "String"),
                MetaField::new("endCursor", "String"),
            ],
        ));
        self.add_type_if_absent(ObjectType::new(
            edge_type.clone(),
            [
                MetaField::new("node", format!("{element_type}!")),
                MetaField::new("cursor", "String!"),
            ],
        ));
        self.add_type_if_absent(ObjectType::new(
            connection_type.clone(),
            [
                MetaField::new("edges", format!("[{edge_type}!]!")),
                MetaField::new("totalCount", "Int!"),
                MetaField::new("pageInfo", "PageInfo!"),
            ],
        ));

        let field = self.field_mut(type_name, field_name)?;
        field.ty = format!("{connection_type}!").into();
        for (name, ty) in [
            ("first", "Int"),
            ("after", "String"),
            ("last", "Int"),
            ("before", "String"),
        ] {
            field.args.insert(name.to_owned(), MetaInputValue::new(name, ty));
        }
        // Take ownership of the extensions attached so far: they rewrite the
        // inner collection, not the connection record.
        let inner = std::mem::take(&mut field.extensions);
        field
            .extensions
            .push(FieldExtension::Connection(ConnectionExtension { inner }));
        self.touch();
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConnectionExtension {
    inner: Vec<FieldExtension>,
}

impl ConnectionExtension {
    pub(crate) fn rewrite(
        &self,
        cx: &RewriteContext<'_>,
        expr: Projection,
        arguments: &ArgumentSet,
    ) -> ServerResult<Projection> {
        let pagination = cx.registry.pagination;

        let mut first = page_size_arg(arguments, "first")?;
        let last = page_size_arg(arguments, "last")?;
        for (name, value) in [("first", first), ("last", last)] {
            if value.is_some_and(|value| value > pagination.max_page_size) {
                return Err(invalid_argument(format!(
                    "'{name}' must not exceed the maximum page size of {}",
                    pagination.max_page_size
                )));
            }
        }
        let after = cursor_arg(arguments, "after")?;
        let before = cursor_arg(arguments, "before")?;
        if after.is_some() && before.is_some() {
            return Err(invalid_argument(
                "'before' and 'after' are mutually exclusive",
            ));
        }
        if first.is_none() && last.is_none() {
            first = Some(pagination.default_page_size);
        }

        // The inner pipeline (filter, sort, ...) applies to the source
        // collection before any window is cut.
        let mut source = expr;
        for extension in &self.inner {
            source = extension.rewrite(cx, source, arguments)?;
        }

        let (skip, take) = offsets(first, last, after, before, pagination.default_page_size);

        let skip_expr = match &skip {
            SkipOffset::Known(offset) => Projection::integer(*offset as i64),
            // `last` without a cursor: the window hangs off the total count.
            SkipOffset::FromEnd(count) => {
                let count = Projection::integer(*count as i64);
                Projection::If {
                    condition: Box::new(Projection::binary(
                        BinaryOp::Greater,
                        Projection::local("total"),
                        count.clone(),
                    )),
                    then: Box::new(Projection::binary(
                        BinaryOp::Subtract,
                        Projection::local("total"),
                        count,
                    )),
                    otherwise: Box::new(Projection::integer(0)),
                }
            }
        };

        let edge = Projection::Object(vec![
            ("node".to_owned(), Projection::Parent),
            (
                "cursor".to_owned(),
                Projection::EncodeCursor(Box::new(Projection::binary(
                    BinaryOp::Add,
                    Projection::Index,
                    Projection::local("skip"),
                ))),
            ),
        ]);
        let edges = Projection::local("source")
            .call(Method::Skip(Box::new(Projection::local("skip"))))
            .call(Method::Take(Box::new(Projection::integer(take as i64))))
            .call(Method::SelectWithIndex(Box::new(edge)));

        let window_end = Projection::binary(
            BinaryOp::Add,
            Projection::local("skip"),
            Projection::integer(take as i64),
        );
        let has_next = Projection::binary(
            BinaryOp::Less,
            window_end.clone(),
            Projection::local("total"),
        );
        let has_previous = Projection::binary(
            BinaryOp::Greater,
            Projection::local("skip"),
            Projection::integer(0),
        );
        let window_nonempty = Projection::binary(
            BinaryOp::Greater,
            Projection::local("total"),
            Projection::local("skip"),
        );
        let (start_cursor, end_cursor) = if take == 0 {
            (Projection::null(), Projection::null())
        } else {
            let last_offset = Projection::binary(
                BinaryOp::Subtract,
                Projection::If {
                    condition: Box::new(Projection::binary(
                        BinaryOp::Less,
                        window_end.clone(),
                        Projection::local("total"),
                    )),
                    then: Box::new(window_end),
                    otherwise: Box::new(Projection::local("total")),
                },
                Projection::integer(1),
            );
            (
                Projection::If {
                    condition: Box::new(window_nonempty.clone()),
                    then: Box::new(Projection::EncodeCursor(Box::new(Projection::local(
                        "skip",
                    )))),
                    otherwise: Box::new(Projection::null()),
                },
                Projection::If {
                    condition: Box::new(window_nonempty),
                    then: Box::new(Projection::EncodeCursor(Box::new(last_offset))),
                    otherwise: Box::new(Projection::null()),
                },
            )
        };

        let page_info = Projection::Object(vec![
            ("hasNextPage".to_owned(), has_next),
            ("hasPreviousPage".to_owned(), has_previous),
            ("startCursor".to_owned(), start_cursor),
            ("endCursor".to_owned(), end_cursor),
        ]);
        let connection = Projection::Object(vec![
            ("edges".to_owned(), edges),
            ("totalCount".to_owned(), Projection::local("total")),
            ("pageInfo".to_owned(), page_info),
        ]);

        Ok(Projection::bind_local(
            "source",
            source,
            Projection::bind_local(
                "total",
                Projection::local("source").count(),
                Projection::bind_local("skip", skip_expr, connection),
            ),
        ))
    }
}

enum SkipOffset {
    Known(usize),
    /// `total - count`, clamped at zero; resolvable only at evaluation time.
    FromEnd(usize),
}

/// The offset table: how `(first, after, last, before)` cut the window.
fn offsets(
    first: Option<usize>,
    last: Option<usize>,
    after: Option<usize>,
    before: Option<usize>,
    default_page_size: usize,
) -> (SkipOffset, usize) {
    if let Some(before) = before {
        match last {
            Some(last) => (
                SkipOffset::Known(before.saturating_sub(last)),
                last.min(before),
            ),
            None => (
                SkipOffset::Known(0),
                first.unwrap_or(default_page_size).min(before),
            ),
        }
    } else if let Some(after) = after {
        (
            SkipOffset::Known(after + 1),
            first.unwrap_or(default_page_size),
        )
    } else if let Some(first) = first {
        (SkipOffset::Known(0), first)
    } else {
        let last = last.unwrap_or(default_page_size);
        (SkipOffset::FromEnd(last), last)
    }
}

fn cursor_arg(arguments: &ArgumentSet, name: &str) -> ServerResult<Option<usize>> {
    match arguments.get(name) {
        None | Some(ConstValue::Null) => Ok(None),
        Some(ConstValue::String(raw)) => GraphqlCursor::decode(raw)
            .map_err(|error| ServerError::new(ErrorKind::InvalidCursor, error)),
        Some(_) => Err(invalid_argument(format!("'{name}' must be a cursor string"))),
    }
}
