//! Input coercion: checks an argument or variable value against its declared
//! input type, applying list wrapping, input-object defaults and enum name
//! resolution. Errors are plain messages; the caller attaches the argument
//! name and location.

use async_graphql_value::{ConstValue, Name};
use indexmap::IndexMap;

use crate::registry::{MetaFieldType, MetaType, MetaTypeName, Registry};

pub(super) fn coerce_const(
    registry: &Registry,
    ty: &MetaFieldType,
    value: ConstValue,
) -> Result<ConstValue, String> {
    coerce(registry, MetaTypeName::create(ty.as_str()), value)
}

fn coerce(
    registry: &Registry,
    ty: MetaTypeName<'_>,
    value: ConstValue,
) -> Result<ConstValue, String> {
    match ty {
        MetaTypeName::NonNull(inner) => {
            if matches!(value, ConstValue::Null) {
                Err(format!(r#"Expected input type "{inner}!", found null."#))
            } else {
                coerce(registry, MetaTypeName::create(inner), value)
            }
        }
        MetaTypeName::List(element) => match value {
            ConstValue::Null => Ok(ConstValue::Null),
            ConstValue::List(items) => {
                let element = MetaTypeName::create(element);
                let coerced = items
                    .into_iter()
                    .map(|item| coerce(registry, element, item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ConstValue::List(coerced))
            }
            // A single value coerces to a one-element list.
            single => Ok(ConstValue::List(vec![coerce(
                registry,
                MetaTypeName::create(element),
                single,
            )?])),
        },
        MetaTypeName::Named(name) => {
            if matches!(value, ConstValue::Null) {
                return Ok(ConstValue::Null);
            }
            match registry.types.get(name) {
                Some(MetaType::Scalar(_)) => coerce_scalar(name, value),
                Some(MetaType::Enum(declared)) => {
                    let spelled = match &value {
                        ConstValue::Enum(spelled) => spelled.as_str(),
                        ConstValue::String(spelled) => spelled.as_str(),
                        other => {
                            return Err(format!(
                                r#"Expected input type "{name}", found {other}."#
                            ));
                        }
                    };
                    match declared.value_by_name(spelled) {
                        Some(matched) => Ok(ConstValue::Enum(Name::new(&matched.name))),
                        None => Err(format!(
                            r#"Value "{spelled}" does not exist in "{name}" enum."#
                        )),
                    }
                }
                Some(MetaType::InputObject(declared)) => {
                    let ConstValue::Object(mut provided) = value else {
                        return Err(format!(
                            r#"Expected input type "{name}", found {value}."#
                        ));
                    };
                    let mut coerced = IndexMap::new();
                    for input in declared.input_fields.values() {
                        let key = Name::new(&input.name);
                        if let Some(member) = provided.swap_remove(&key) {
                            coerced.insert(
                                key,
                                coerce(
                                    registry,
                                    MetaTypeName::create(input.ty.as_str()),
                                    member,
                                )?,
                            );
                        } else if let Some(default) = &input.default_value {
                            coerced.insert(key, default.clone());
                        } else if input.ty.is_non_null() {
                            return Err(format!(
                                r#"Field "{}" of input type "{name}" is required."#,
                                input.name
                            ));
                        }
                    }
                    if let Some((unknown, _)) = provided.first() {
                        return Err(format!(
                            r#"Unknown field "{unknown}" on input type "{name}"."#
                        ));
                    }
                    Ok(ConstValue::Object(coerced))
                }
                Some(_) => Err(format!(r#"Type "{name}" cannot be used as an input."#)),
                None => Err(format!(r#"Unknown input type "{name}"."#)),
            }
        }
    }
}

fn coerce_scalar(name: &str, value: ConstValue) -> Result<ConstValue, String> {
    let ok = match name {
        "Int" => matches!(&value, ConstValue::Number(n) if n.as_i64().is_some()),
        "Float" => matches!(&value, ConstValue::Number(_)),
        "String" => matches!(&value, ConstValue::String(_)),
        "Boolean" => matches!(&value, ConstValue::Boolean(_)),
        "ID" => matches!(&value, ConstValue::String(_) | ConstValue::Number(_)),
        // Custom scalars pass through untouched.
        _ => true,
    };
    if ok {
        Ok(value)
    } else {
        Err(format!(r#"Expected input type "{name}", found {value}."#))
    }
}
