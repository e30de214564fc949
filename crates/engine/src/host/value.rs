use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Number;

/// A value within the host object graph, and equally a value produced by
/// evaluating a projection.
///
/// Designed to stay compact: objects are member vectors rather than maps.
/// Lookup is linear, but host objects (and GraphQL selections) are small.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum HostValue {
    /// `null`.
    #[default]
    Null,
    /// A boolean.
    Boolean(bool),
    /// A number.
    Number(Number),
    /// A string.
    String(String),
    /// An enumeration value, exposed to GraphQL through the schema's value
    /// mapping.
    Enum(String),
    /// A list of values.
    List(Vec<HostValue>),
    /// An object: ordered members keyed by host member name.
    Object(Vec<(String, HostValue)>),
}

impl HostValue {
    pub fn string(value: impl Into<String>) -> Self {
        HostValue::String(value.into())
    }

    pub fn integer(value: i64) -> Self {
        HostValue::Number(value.into())
    }

    pub fn float(value: f64) -> Self {
        Number::from_f64(value).map_or(HostValue::Null, HostValue::Number)
    }

    pub fn object(members: impl IntoIterator<Item = (impl Into<String>, HostValue)>) -> Self {
        HostValue::Object(
            members
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        )
    }

    pub fn is_null(&self) -> bool {
        matches!(self, HostValue::Null)
    }

    pub fn member(&self, name: &str) -> Option<&HostValue> {
        match self {
            HostValue::Object(members) => members
                .iter()
                .find(|(member, _)| member == name)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    pub fn member_mut(&mut self, name: &str) -> Option<&mut HostValue> {
        match self {
            HostValue::Object(members) => members
                .iter_mut()
                .find(|(member, _)| member == name)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            HostValue::Number(number) => number.as_i64(),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[HostValue]> {
        match self {
            HostValue::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for HostValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => HostValue::Null,
            serde_json::Value::Bool(value) => HostValue::Boolean(value),
            serde_json::Value::Number(value) => HostValue::Number(value),
            serde_json::Value::String(value) => HostValue::String(value),
            serde_json::Value::Array(items) => {
                HostValue::List(items.into_iter().map(Into::into).collect())
            }
            serde_json::Value::Object(members) => HostValue::Object(
                members
                    .into_iter()
                    .map(|(name, value)| (name, value.into()))
                    .collect(),
            ),
        }
    }
}

impl From<HostValue> for serde_json::Value {
    fn from(value: HostValue) -> Self {
        match value {
            HostValue::Null => serde_json::Value::Null,
            HostValue::Boolean(value) => serde_json::Value::Bool(value),
            HostValue::Number(value) => serde_json::Value::Number(value),
            HostValue::String(value) | HostValue::Enum(value) => serde_json::Value::String(value),
            HostValue::List(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            HostValue::Object(members) => serde_json::Value::Object(
                members
                    .into_iter()
                    .map(|(name, value)| (name, value.into()))
                    .collect(),
            ),
        }
    }
}

impl Serialize for HostValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            HostValue::Null => serializer.serialize_unit(),
            HostValue::Boolean(value) => serializer.serialize_bool(*value),
            HostValue::Number(value) => value.serialize(serializer),
            HostValue::String(value) | HostValue::Enum(value) => serializer.serialize_str(value),
            HostValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            HostValue::Object(members) => {
                let mut map = serializer.serialize_map(Some(members.len()))?;
                for (name, value) in members {
                    map.serialize_entry(name, value)?;
                }
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_lookup_preserves_declaration_order() {
        let value = HostValue::object([
            ("Id", HostValue::integer(99)),
            ("Name", HostValue::string("Luke")),
        ]);
        assert_eq!(value.member("Name"), Some(&HostValue::string("Luke")));
        assert_eq!(value.member("Missing"), None);
    }

    #[test]
    fn objects_serialize_in_member_order() {
        let value = HostValue::object([
            ("b", HostValue::integer(2)),
            ("a", HostValue::integer(1)),
        ]);
        assert_eq!(serde_json::to_string(&value).unwrap(), r#"{"b":2,"a":1}"#);
    }

    #[test]
    fn json_round_trip() {
        let json = serde_json::json!({
            "People": [{"Id": 99, "Name": "Luke", "Active": true, "Score": 1.5}],
        });
        let value = HostValue::from(json.clone());
        assert_eq!(serde_json::Value::from(value), json);
    }
}
