//! The schema model: named types, their fields, argument schemas and resolver
//! descriptors. Built once at startup (usually by reflection over the host
//! schema), edited only through the administrative APIs, and immutable while
//! requests execute.

pub mod builder;
mod introspection;
pub mod resolvers;
mod type_names;

use std::collections::BTreeMap;

use async_graphql_value::ConstValue;
use indexmap::{IndexMap, IndexSet};

use crate::{auth::AuthRequirements, extension::FieldExtension};

pub use self::resolvers::{MutationOutcome, MutationResolver, Resolver};
pub use self::type_names::{MetaFieldType, MetaTypeName};
pub(crate) use introspection::{reflective_schema_value, register_introspection_types};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("SchemaConflict: a type named '{0}' is already registered")]
    TypeConflict(String),
    #[error("SchemaConflict: type '{ty}' already has a field named '{field}'")]
    FieldConflict { ty: String, field: String },
    #[error("unknown type '{0}'")]
    UnknownType(String),
    #[error("type '{0}' cannot carry fields")]
    NotAnObject(String),
    #[error("field '{field}' not found on type '{ty}'")]
    UnknownField { ty: String, field: String },
    #[error("field '{field}' on type '{ty}' must return a collection")]
    NotACollection { ty: String, field: String },
    #[error("unknown host type '{0}'")]
    UnknownHostType(String),
    #[error("unknown host enum '{0}'")]
    UnknownHostEnum(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Deprecation {
    #[default]
    NoDeprecated,
    Deprecated {
        reason: Option<String>,
    },
}

impl Deprecation {
    #[inline]
    pub fn is_deprecated(&self) -> bool {
        matches!(self, Deprecation::Deprecated { .. })
    }

    #[inline]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Deprecation::NoDeprecated => None,
            Deprecation::Deprecated { reason } => reason.as_deref(),
        }
    }
}

/// An argument (or input object field) declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaInputValue {
    pub name: String,
    pub description: Option<String>,
    pub ty: MetaFieldType,
    pub default_value: Option<ConstValue>,
}

impl MetaInputValue {
    pub fn new(name: impl Into<String>, ty: impl Into<MetaFieldType>) -> MetaInputValue {
        MetaInputValue {
            name: name.into(),
            description: None,
            ty: ty.into(),
            default_value: None,
        }
    }

    #[must_use]
    pub fn with_description(self, description: impl Into<String>) -> MetaInputValue {
        MetaInputValue {
            description: Some(description.into()),
            ..self
        }
    }

    #[must_use]
    pub fn with_default(self, default: ConstValue) -> MetaInputValue {
        MetaInputValue {
            default_value: Some(default),
            ..self
        }
    }
}

/// A field of an object (or interface) type.
#[derive(Debug, Clone)]
pub struct MetaField {
    pub name: String,
    /// The host member backing the field, when its spelling differs from the
    /// GraphQL name.
    pub mapped_name: Option<String>,
    pub description: Option<String>,
    pub args: IndexMap<String, MetaInputValue>,
    pub ty: MetaFieldType,
    pub deprecation: Deprecation,
    pub resolver: Resolver,
    pub extensions: Vec<FieldExtension>,
    pub required_auth: AuthRequirements,
}

impl MetaField {
    pub fn new(name: impl Into<String>, ty: impl Into<MetaFieldType>) -> MetaField {
        MetaField {
            name: name.into(),
            mapped_name: None,
            description: None,
            args: IndexMap::new(),
            ty: ty.into(),
            deprecation: Deprecation::NoDeprecated,
            resolver: Resolver::default(),
            extensions: Vec::new(),
            required_auth: AuthRequirements::none(),
        }
    }

    /// The host member this field projects when resolved as a property.
    pub fn target_host_member(&self) -> &str {
        self.mapped_name.as_deref().unwrap_or(&self.name)
    }

    #[must_use]
    pub fn with_mapped_name(self, mapped_name: impl Into<String>) -> Self {
        MetaField {
            mapped_name: Some(mapped_name.into()),
            ..self
        }
    }

    #[must_use]
    pub fn with_description(self, description: impl Into<String>) -> Self {
        MetaField {
            description: Some(description.into()),
            ..self
        }
    }

    #[must_use]
    pub fn with_argument(mut self, argument: MetaInputValue) -> Self {
        self.args.insert(argument.name.clone(), argument);
        self
    }

    #[must_use]
    pub fn with_resolver(self, resolver: Resolver) -> Self {
        MetaField { resolver, ..self }
    }

    #[must_use]
    pub fn with_required_role(mut self, role: impl Into<String>) -> Self {
        self.required_auth.require_role(role);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarType {
    pub name: String,
    pub description: Option<String>,
}

impl ScalarType {
    pub fn new(name: impl Into<String>) -> ScalarType {
        ScalarType {
            name: name.into(),
            description: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ObjectType {
    pub name: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, MetaField>,
    /// The host type backing values of this type, when reflected.
    pub host_type: Option<String>,
    pub implements: IndexSet<String>,
    pub required_auth: AuthRequirements,
}

impl ObjectType {
    pub fn new(name: impl Into<String>, fields: impl IntoIterator<Item = MetaField>) -> ObjectType {
        ObjectType {
            name: name.into(),
            description: None,
            fields: fields
                .into_iter()
                .map(|field| (field.name.clone(), field))
                .collect(),
            host_type: None,
            implements: IndexSet::new(),
            required_auth: AuthRequirements::none(),
        }
    }

    #[must_use]
    pub fn with_description(self, description: impl Into<String>) -> Self {
        ObjectType {
            description: Some(description.into()),
            ..self
        }
    }

    #[inline]
    pub fn field_by_name(&self, name: &str) -> Option<&MetaField> {
        self.fields.get(name)
    }

    /// Case-insensitive lookup, used by the filter sub-language where
    /// identifiers are matched loosely against the camelCase surface.
    pub fn field_ignore_case(&self, name: &str) -> Option<&MetaField> {
        self.fields
            .values()
            .find(|field| field.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone)]
pub struct InterfaceType {
    pub name: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, MetaField>,
    pub possible_types: IndexSet<String>,
}

impl InterfaceType {
    pub fn field_by_name(&self, name: &str) -> Option<&MetaField> {
        self.fields.get(name)
    }
}

#[derive(Debug, Clone)]
pub struct UnionType {
    pub name: String,
    pub description: Option<String>,
    pub possible_types: IndexSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaEnumValue {
    pub name: String,
    pub description: Option<String>,
    pub deprecation: Deprecation,
    /// The host spelling, when it differs from the exposed name.
    pub host_value: Option<String>,
}

impl MetaEnumValue {
    pub fn new(name: impl Into<String>) -> MetaEnumValue {
        MetaEnumValue {
            name: name.into(),
            description: None,
            deprecation: Deprecation::NoDeprecated,
            host_value: None,
        }
    }

    #[must_use]
    pub fn with_host_value(self, host_value: impl Into<String>) -> Self {
        MetaEnumValue {
            host_value: Some(host_value.into()),
            ..self
        }
    }

    pub fn host_value(&self) -> &str {
        self.host_value.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumType {
    pub name: String,
    pub description: Option<String>,
    pub values: IndexMap<String, MetaEnumValue>,
}

impl EnumType {
    pub fn new(
        name: impl Into<String>,
        values: impl IntoIterator<Item = MetaEnumValue>,
    ) -> EnumType {
        EnumType {
            name: name.into(),
            description: None,
            values: values
                .into_iter()
                .map(|value| (value.name.clone(), value))
                .collect(),
        }
    }

    pub fn value_by_name(&self, name: &str) -> Option<&MetaEnumValue> {
        self.values.get(name)
    }
}

#[derive(Debug, Clone)]
pub struct InputObjectType {
    pub name: String,
    pub description: Option<String>,
    pub input_fields: IndexMap<String, MetaInputValue>,
}

impl InputObjectType {
    pub fn new(
        name: impl Into<String>,
        input_fields: impl IntoIterator<Item = MetaInputValue>,
    ) -> InputObjectType {
        InputObjectType {
            name: name.into(),
            description: None,
            input_fields: input_fields
                .into_iter()
                .map(|field| (field.name.clone(), field))
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum MetaType {
    Scalar(ScalarType),
    Object(ObjectType),
    Interface(InterfaceType),
    Union(UnionType),
    Enum(EnumType),
    InputObject(InputObjectType),
}

impl MetaType {
    pub fn name(&self) -> &str {
        match self {
            MetaType::Scalar(inner) => &inner.name,
            MetaType::Object(inner) => &inner.name,
            MetaType::Interface(inner) => &inner.name,
            MetaType::Union(inner) => &inner.name,
            MetaType::Enum(inner) => &inner.name,
            MetaType::InputObject(inner) => &inner.name,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            MetaType::Scalar(inner) => inner.description.as_deref(),
            MetaType::Object(inner) => inner.description.as_deref(),
            MetaType::Interface(inner) => inner.description.as_deref(),
            MetaType::Union(inner) => inner.description.as_deref(),
            MetaType::Enum(inner) => inner.description.as_deref(),
            MetaType::InputObject(inner) => inner.description.as_deref(),
        }
    }

    /// The introspection kind of this type.
    pub fn kind(&self) -> &'static str {
        match self {
            MetaType::Scalar(_) => "SCALAR",
            MetaType::Object(_) => "OBJECT",
            MetaType::Interface(_) => "INTERFACE",
            MetaType::Union(_) => "UNION",
            MetaType::Enum(_) => "ENUM",
            MetaType::InputObject(_) => "INPUT_OBJECT",
        }
    }

    pub fn object(&self) -> Option<&ObjectType> {
        match self {
            MetaType::Object(inner) => Some(inner),
            _ => None,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            MetaType::Object(_) | MetaType::Interface(_) | MetaType::Union(_)
        )
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, MetaType::Scalar(_) | MetaType::Enum(_))
    }

    pub fn field_by_name(&self, name: &str) -> Option<&MetaField> {
        match self {
            MetaType::Object(inner) => inner.field_by_name(name),
            MetaType::Interface(inner) => inner.field_by_name(name),
            _ => None,
        }
    }

    /// The concrete object types a value of this type can be at runtime.
    pub fn possible_types(&self) -> Vec<&str> {
        match self {
            MetaType::Object(inner) => vec![inner.name.as_str()],
            MetaType::Interface(inner) => {
                inner.possible_types.iter().map(String::as_str).collect()
            }
            MetaType::Union(inner) => inner.possible_types.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

impl From<ScalarType> for MetaType {
    fn from(val: ScalarType) -> Self {
        MetaType::Scalar(val)
    }
}

impl From<ObjectType> for MetaType {
    fn from(val: ObjectType) -> Self {
        MetaType::Object(val)
    }
}

impl From<EnumType> for MetaType {
    fn from(val: EnumType) -> Self {
        MetaType::Enum(val)
    }
}

impl From<InputObjectType> for MetaType {
    fn from(val: InputObjectType) -> Self {
        MetaType::InputObject(val)
    }
}

/// Page-size limits enforced by the paging extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationConfig {
    pub default_page_size: usize,
    pub max_page_size: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        PaginationConfig {
            default_page_size: 20,
            max_page_size: 500,
        }
    }
}

/// The whole schema. Shared immutably across concurrent request executions;
/// the editing APIs require exclusive access and bump `version`, which keys
/// plan-cache invalidation.
#[derive(Debug, Clone)]
pub struct Registry {
    pub types: BTreeMap<String, MetaType>,
    pub query_type: String,
    pub mutation_type: Option<String>,
    pub disable_introspection: bool,
    pub pagination: PaginationConfig,
    version: u64,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        let mut registry = Registry {
            types: BTreeMap::new(),
            query_type: "Query".to_owned(),
            mutation_type: None,
            disable_introspection: false,
            pagination: PaginationConfig::default(),
            version: 0,
        };
        for name in ["ID", "Int", "Float", "String", "Boolean"] {
            registry
                .types
                .insert(name.to_owned(), ScalarType::new(name).into());
        }
        registry
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn touch(&mut self) {
        self.version += 1;
    }

    pub fn has_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn lookup(&self, name: &str) -> Result<&MetaType, SchemaError> {
        self.types
            .get(name)
            .ok_or_else(|| SchemaError::UnknownType(name.to_owned()))
    }

    pub fn lookup_object(&self, name: &str) -> Result<&ObjectType, SchemaError> {
        self.lookup(name)?
            .object()
            .ok_or_else(|| SchemaError::NotAnObject(name.to_owned()))
    }

    /// Registers a type, failing on a duplicate name.
    pub fn add_type(&mut self, ty: impl Into<MetaType>) -> Result<(), SchemaError> {
        let ty = ty.into();
        let name = ty.name().to_owned();
        if self.types.contains_key(&name) {
            return Err(SchemaError::TypeConflict(name));
        }
        self.types.insert(name, ty);
        self.touch();
        Ok(())
    }

    /// Registers a type unless one of the same name already exists. Used by
    /// extensions for shared wrapper types such as `PageInfo`.
    pub(crate) fn add_type_if_absent(&mut self, ty: impl Into<MetaType>) {
        let ty = ty.into();
        if !self.types.contains_key(ty.name()) {
            self.types.insert(ty.name().to_owned(), ty);
            self.touch();
        }
    }

    pub fn get_field(&self, type_name: &str, field_name: &str) -> Option<&MetaField> {
        self.types.get(type_name)?.field_by_name(field_name)
    }

    pub(crate) fn field_mut(
        &mut self,
        type_name: &str,
        field_name: &str,
    ) -> Result<&mut MetaField, SchemaError> {
        let object = match self.types.get_mut(type_name) {
            Some(MetaType::Object(object)) => object,
            Some(_) => return Err(SchemaError::NotAnObject(type_name.to_owned())),
            None => return Err(SchemaError::UnknownType(type_name.to_owned())),
        };
        object
            .fields
            .get_mut(field_name)
            .ok_or_else(|| SchemaError::UnknownField {
                ty: type_name.to_owned(),
                field: field_name.to_owned(),
            })
    }

    /// Adds a field to an object type, failing on a duplicate name.
    pub fn add_field(&mut self, type_name: &str, field: MetaField) -> Result<(), SchemaError> {
        let object = match self.types.get_mut(type_name) {
            Some(MetaType::Object(object)) => object,
            Some(_) => return Err(SchemaError::NotAnObject(type_name.to_owned())),
            None => return Err(SchemaError::UnknownType(type_name.to_owned())),
        };
        if object.fields.contains_key(&field.name) {
            return Err(SchemaError::FieldConflict {
                ty: type_name.to_owned(),
                field: field.name,
            });
        }
        object.fields.insert(field.name.clone(), field);
        self.touch();
        Ok(())
    }

    /// Replaces an existing field wholesale.
    pub fn replace_field(&mut self, type_name: &str, field: MetaField) -> Result<(), SchemaError> {
        let existing = self.field_mut(type_name, &field.name)?;
        *existing = field;
        self.touch();
        Ok(())
    }

    pub fn remove_field(
        &mut self,
        type_name: &str,
        field_name: &str,
    ) -> Result<MetaField, SchemaError> {
        let object = match self.types.get_mut(type_name) {
            Some(MetaType::Object(object)) => object,
            Some(_) => return Err(SchemaError::NotAnObject(type_name.to_owned())),
            None => return Err(SchemaError::UnknownType(type_name.to_owned())),
        };
        let removed = object
            .fields
            .shift_remove(field_name)
            .ok_or_else(|| SchemaError::UnknownField {
                ty: type_name.to_owned(),
                field: field_name.to_owned(),
            })?;
        self.touch();
        Ok(removed)
    }

    pub fn deprecate(
        &mut self,
        type_name: &str,
        field_name: &str,
        reason: Option<String>,
    ) -> Result<(), SchemaError> {
        let field = self.field_mut(type_name, field_name)?;
        field.deprecation = Deprecation::Deprecated { reason };
        self.touch();
        Ok(())
    }

    /// Registers a mutation field, creating the `Mutation` root on first use.
    pub fn add_mutation(&mut self, field: MetaField) -> Result<(), SchemaError> {
        let root = match &self.mutation_type {
            Some(name) => name.clone(),
            None => {
                let name = "Mutation".to_owned();
                self.add_type_if_absent(ObjectType::new(name.clone(), std::iter::empty()));
                self.mutation_type = Some(name.clone());
                name
            }
        };
        self.add_field(&root, field)
    }
}
