//! The sort extension: adds a typed `sort` argument enumerating the sortable
//! fields of the element type, lowered into one stable multi-key ordering.

use async_graphql_value::{ConstValue, Name};
use inflector::Inflector;

use crate::{
    error::ServerResult,
    operation::ArgumentSet,
    projection::{Method, OrderKey, Projection},
    registry::{
        EnumType, InputObjectType, MetaEnumValue, MetaInputValue, MetaType, Registry, SchemaError,
    },
};

use super::{invalid_argument, FieldExtension, RewriteContext};

impl Registry {
    /// Attaches the sort extension to a collection field.
    pub fn use_sort(&mut self, type_name: &str, field_name: &str) -> Result<(), SchemaError> {
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

        // Sortable fields: the scalar and enum leaves of the element type.
        let sortable: Vec<String> = self
            .lookup_object(&element_type)?
            .fields
            .values()
            .filter(|field| {
                !field.ty.is_list()
                    && self
                        .types
                        .get(field.ty.named_type())
                        .is_some_and(MetaType::is_leaf)
            })
            .map(|field| field.name.clone())
            .collect();

        self.add_type_if_absent(EnumType::new(
            "SortDirection",
            [MetaEnumValue::new("ASC"), MetaEnumValue::new("DESC")],
        ));

        let fields_enum = format!("{element_type}SortFields");
        self.add_type_if_absent(EnumType::new(
            fields_enum.clone(),
            sortable.into_iter().map(|name| {
                let exposed = name.to_screaming_snake_case();
                MetaEnumValue::new(exposed).with_host_value(name)
            }),
        ));

        let input_name = format!("{element_type}SortInput");
        self.add_type_if_absent(InputObjectType::new(
            input_name.clone(),
            [
                MetaInputValue::new("field", format!("{fields_enum}!")),
                MetaInputValue::new("direction", "SortDirection!")
                    .with_default(ConstValue::Enum(Name::new("ASC"))),
            ],
        ));

        let field = self.field_mut(type_name, field_name)?;
        field.args.insert(
            "sort".to_owned(),
            MetaInputValue::new("sort", format!("[{input_name}!]")),
        );
        field.extensions.push(FieldExtension::Sort(SortExtension {
            element_type,
            fields_enum,
        }));
        self.touch();
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SortExtension {
    element_type: String,
    fields_enum: String,
}

impl SortExtension {
    pub(crate) fn rewrite(
        &self,
        cx: &RewriteContext<'_>,
        expr: Projection,
        arguments: &ArgumentSet,
    ) -> ServerResult<Projection> {
        let entries = match arguments.get("sort") {
            None | Some(ConstValue::Null) => return Ok(expr),
            Some(ConstValue::List(entries)) => entries,
            Some(_) => {
                return Err(invalid_argument(format!(
                    "'sort' on field '{}' must be a list",
                    cx.field_name
                )));
            }
        };

        let mut keys = Vec::with_capacity(entries.len());
        for entry in entries {
            let ConstValue::Object(members) = entry else {
                return Err(invalid_argument("'sort' entries must be input objects"));
            };
            let field_value = members
                .iter()
                .find(|(key, _)| key.as_str() == "field")
                .map(|(_, value)| value);
            let spelled = match field_value {
                Some(ConstValue::Enum(name)) => name.as_str(),
                Some(ConstValue::String(name)) => name.as_str(),
                _ => return Err(invalid_argument("'sort' entries require a 'field'")),
            };
            let field_name = self
                .sort_field(cx.registry, spelled)
                .ok_or_else(|| invalid_argument(format!("Unknown sort field '{spelled}'")))?;
            let member = cx
                .registry
                .lookup_object(&self.element_type)
                .ok()
                .and_then(|object| object.field_by_name(&field_name))
                .map(|field| field.target_host_member().to_owned())
                .ok_or_else(|| invalid_argument(format!("Unknown sort field '{spelled}'")))?;

            let direction = members
                .iter()
                .find(|(key, _)| key.as_str() == "direction")
                .map(|(_, value)| value);
            let descending = matches!(
                direction,
                Some(ConstValue::Enum(direction)) if direction.as_str() == "DESC"
            );
            keys.push(OrderKey {
                key: Projection::parent_member(member),
                descending,
            });
        }

        if keys.is_empty() {
            return Ok(expr);
        }
        Ok(expr.call(Method::OrderBy(keys)))
    }

    /// Maps a `<T>SortFields` enum value back to the GraphQL field it names.
    fn sort_field(&self, registry: &Registry, spelled: &str) -> Option<String> {
        match registry.types.get(&self.fields_enum) {
            Some(MetaType::Enum(declared)) => declared
                .value_by_name(spelled)
                .map(|value| value.host_value().to_owned()),
            _ => None,
        }
    }
}
