//! The host side of the engine: descriptors for the types reachable from the
//! root context object, and the dynamic value tree the composed projection is
//! evaluated against.
//!
//! Descriptors stand in for runtime type inspection: the host declares the
//! shape of its object graph once, and the reflector derives the GraphQL
//! schema from it.

use std::collections::BTreeMap;

use crate::auth::AuthRequirements;

mod value;

pub use value::HostValue;

/// Built-in scalar kinds a host member can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Id,
    Int,
    Float,
    String,
    Boolean,
}

impl ScalarKind {
    pub(crate) fn graphql_name(self) -> &'static str {
        match self {
            ScalarKind::Id => "ID",
            ScalarKind::Int => "Int",
            ScalarKind::Float => "Float",
            ScalarKind::String => "String",
            ScalarKind::Boolean => "Boolean",
        }
    }
}

/// A reference to a host type, as carried by a member declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostTypeRef {
    Scalar(ScalarKind),
    Enum(String),
    Object(String),
    List(Box<HostTypeRef>),
}

impl HostTypeRef {
    pub fn scalar(kind: ScalarKind) -> Self {
        HostTypeRef::Scalar(kind)
    }

    pub fn object(name: impl Into<String>) -> Self {
        HostTypeRef::Object(name.into())
    }

    pub fn enumeration(name: impl Into<String>) -> Self {
        HostTypeRef::Enum(name.into())
    }

    pub fn list_of(element: HostTypeRef) -> Self {
        HostTypeRef::List(Box::new(element))
    }
}

/// A public readable member of a host type.
#[derive(Debug, Clone, PartialEq)]
pub struct HostMember {
    pub name: String,
    pub ty: HostTypeRef,
    pub nullable: bool,
    /// Obsolete members are skipped by reflection unless added explicitly.
    pub obsolete: bool,
    pub required_auth: AuthRequirements,
}

impl HostMember {
    pub fn new(name: impl Into<String>, ty: HostTypeRef) -> Self {
        HostMember {
            name: name.into(),
            ty,
            nullable: false,
            obsolete: false,
            required_auth: AuthRequirements::none(),
        }
    }

    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    #[must_use]
    pub fn obsolete(mut self) -> Self {
        self.obsolete = true;
        self
    }

    #[must_use]
    pub fn with_required_role(mut self, role: impl Into<String>) -> Self {
        self.required_auth.require_role(role);
        self
    }
}

/// A host object type: a named bag of readable members.
#[derive(Debug, Clone, PartialEq)]
pub struct HostType {
    pub name: String,
    pub description: Option<String>,
    pub members: Vec<HostMember>,
    pub required_auth: AuthRequirements,
}

impl HostType {
    pub fn new(name: impl Into<String>, members: impl IntoIterator<Item = HostMember>) -> Self {
        HostType {
            name: name.into(),
            description: None,
            members: members.into_iter().collect(),
            required_auth: AuthRequirements::none(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_required_role(mut self, role: impl Into<String>) -> Self {
        self.required_auth.require_role(role);
        self
    }

    pub fn member(&self, name: &str) -> Option<&HostMember> {
        self.members.iter().find(|member| member.name == name)
    }
}

/// A host enumeration and its declared values, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEnum {
    pub name: String,
    pub values: Vec<String>,
}

impl HostEnum {
    pub fn new(name: impl Into<String>, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        HostEnum {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// The declared shape of the whole host object graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostSchema {
    pub types: BTreeMap<String, HostType>,
    pub enums: BTreeMap<String, HostEnum>,
}

impl HostSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_type(&mut self, ty: HostType) -> &mut Self {
        self.types.insert(ty.name.clone(), ty);
        self
    }

    pub fn insert_enum(&mut self, e: HostEnum) -> &mut Self {
        self.enums.insert(e.name.clone(), e);
        self
    }

    pub fn get(&self, name: &str) -> Option<&HostType> {
        self.types.get(name)
    }
}

/// The per-request root value the composed projection runs against. Mutable
/// only for mutation operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataContext {
    root: HostValue,
}

impl DataContext {
    pub fn new(root: HostValue) -> Self {
        DataContext { root }
    }

    pub fn root(&self) -> &HostValue {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut HostValue {
        &mut self.root
    }
}
