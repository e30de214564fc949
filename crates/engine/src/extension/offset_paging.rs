//! The offset paging extension: wraps a collection field in a `<T>Page`
//! record carrying the requested window plus paging metadata. The source
//! count is bound once and reused by every member that needs it.

use crate::{
    error::ServerResult,
    operation::ArgumentSet,
    projection::{BinaryOp, Method, Projection},
    registry::{MetaField, MetaInputValue, ObjectType, Registry, SchemaError},
};

use super::{invalid_argument, page_size_arg, FieldExtension, RewriteContext};

impl Registry {
    /// Attaches offset paging to a collection field, rewriting its return
    /// type to `<T>Page!`.
    pub fn use_offset_paging(
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
        let items_type = field.ty.clone();
        let page_type = format!("{element_type}Page");

        self.add_type_if_absent(ObjectType::new(
            page_type.clone(),
            [
                MetaField::new("items", items_type),
                MetaField::new("hasPreviousPage", "Boolean!"),
                MetaField::new("hasNextPage", "Boolean!"),
                MetaField::new("totalItems", "Int!"),
            ],
        ));

        let field = self.field_mut(type_name, field_name)?;
        field.ty = format!("{page_type}!").into();
        field
            .args
            .insert("skip".to_owned(), MetaInputValue::new("skip", "Int"));
        field
            .args
            .insert("take".to_owned(), MetaInputValue::new("take", "Int"));
        field
            .extensions
            .push(FieldExtension::OffsetPaging(OffsetPagingExtension));
        self.touch();
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OffsetPagingExtension;

impl OffsetPagingExtension {
    pub(crate) fn rewrite(
        &self,
        cx: &RewriteContext<'_>,
        expr: Projection,
        arguments: &ArgumentSet,
    ) -> ServerResult<Projection> {
        let pagination = cx.registry.pagination;
        let skip = page_size_arg(arguments, "skip")?.unwrap_or(0);
        let take = page_size_arg(arguments, "take")?.unwrap_or(pagination.default_page_size);
        if take > pagination.max_page_size {
            return Err(invalid_argument(format!(
                "'take' must not exceed the maximum page size of {}",
                pagination.max_page_size
            )));
        }

        let items = Projection::local("source")
            .call(Method::Skip(Box::new(Projection::integer(skip as i64))))
            .call(Method::Take(Box::new(Projection::integer(take as i64))));
        let has_next = Projection::binary(
            BinaryOp::Less,
            Projection::integer((skip + take) as i64),
            Projection::local("total"),
        );

        let record = Projection::Object(vec![
            ("items".to_owned(), items),
            (
                "hasPreviousPage".to_owned(),
                Projection::boolean(skip > 0),
            ),
            ("hasNextPage".to_owned(), has_next),
            ("totalItems".to_owned(), Projection::local("total")),
        ]);

        Ok(Projection::bind_local(
            "source",
            expr,
            Projection::bind_local("total", Projection::local("source").count(), record),
        ))
    }
}
