use std::fmt;

use serde::{Deserialize, Serialize};

fn strip_brackets(type_name: &str) -> Option<&str> {
    type_name.strip_prefix('[').map(|rest| &rest[..rest.len() - 1])
}

/// A parsed view of a wrapped type name, e.g. `[Person!]!`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MetaTypeName<'a> {
    List(&'a str),
    NonNull(&'a str),
    Named(&'a str),
}

impl fmt::Display for MetaTypeName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaTypeName::Named(name) => write!(f, "{name}"),
            MetaTypeName::NonNull(name) => write!(f, "{name}!"),
            MetaTypeName::List(name) => write!(f, "[{name}]"),
        }
    }
}

impl<'a> MetaTypeName<'a> {
    #[inline]
    pub fn create(type_name: &str) -> MetaTypeName<'_> {
        if let Some(type_name) = type_name.strip_suffix('!') {
            MetaTypeName::NonNull(type_name)
        } else if let Some(type_name) = strip_brackets(type_name) {
            MetaTypeName::List(type_name)
        } else {
            MetaTypeName::Named(type_name)
        }
    }

    #[inline]
    pub fn concrete_typename(type_name: &str) -> &str {
        match MetaTypeName::create(type_name) {
            MetaTypeName::List(type_name) => Self::concrete_typename(type_name),
            MetaTypeName::NonNull(type_name) => Self::concrete_typename(type_name),
            MetaTypeName::Named(type_name) => type_name,
        }
    }

    #[inline]
    pub fn is_non_null(&self) -> bool {
        matches!(self, MetaTypeName::NonNull(_))
    }

    pub fn unwrap_non_null(&self) -> Self {
        match self {
            MetaTypeName::NonNull(inner) => MetaTypeName::create(inner),
            _ => *self,
        }
    }

    pub fn is_list(&self) -> bool {
        match self {
            MetaTypeName::List(_) => true,
            MetaTypeName::NonNull(inner) => MetaTypeName::create(inner).is_list(),
            MetaTypeName::Named(name) => name.ends_with(']'),
        }
    }
}

/// The type of a field or input value, stored as its GraphQL name with
/// wrapping markers. Schema types reference each other through these names
/// only, so cyclic type graphs need no owning references.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetaFieldType(String);

impl MetaFieldType {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The underlying named type with all wrappers stripped.
    pub fn named_type(&self) -> &str {
        MetaTypeName::concrete_typename(&self.0)
    }

    pub fn is_non_null(&self) -> bool {
        MetaTypeName::create(&self.0).is_non_null()
    }

    pub fn is_list(&self) -> bool {
        MetaTypeName::create(&self.0).is_list()
    }

    /// The element type of a list, unwrapping an outer non-null first.
    /// `[Person!]!` yields `Person!`.
    pub fn list_element(&self) -> Option<MetaFieldType> {
        let unwrapped = match MetaTypeName::create(&self.0) {
            MetaTypeName::NonNull(inner) => MetaTypeName::create(inner),
            other => other,
        };
        match unwrapped {
            MetaTypeName::List(element) => Some(MetaFieldType::from(element)),
            _ => None,
        }
    }

    #[must_use]
    pub fn non_null(self) -> MetaFieldType {
        if self.is_non_null() {
            self
        } else {
            MetaFieldType(format!("{}!", self.0))
        }
    }

    #[must_use]
    pub fn list(self) -> MetaFieldType {
        MetaFieldType(format!("[{}]", self.0))
    }

    /// Drops an outer non-null marker, if any.
    #[must_use]
    pub fn nullable(self) -> MetaFieldType {
        match self.0.strip_suffix('!') {
            Some(inner) => MetaFieldType(inner.to_owned()),
            None => self,
        }
    }
}

impl fmt::Display for MetaFieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MetaFieldType {
    fn from(value: &str) -> Self {
        MetaFieldType(value.to_owned())
    }
}

impl From<String> for MetaFieldType {
    fn from(value: String) -> Self {
        MetaFieldType(value)
    }
}
