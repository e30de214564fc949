//! Reflection over the host schema: walks host type descriptors and registers
//! the corresponding GraphQL types and fields. Host member names are
//! camel-cased, collections become lists, nullable members become nullable
//! fields, host enums are auto-registered, and authorization annotations are
//! copied onto the reflected entries.

use inflector::Inflector;

use crate::host::{HostSchema, HostTypeRef};

use super::{
    EnumType, MetaEnumValue, MetaField, MetaFieldType, ObjectType, Registry, SchemaError,
};

impl Registry {
    /// Builds a registry with a `Query` root reflected from the given host
    /// type and every host type reachable from it.
    pub fn reflect(host: &HostSchema, root_host_type: &str) -> Result<Registry, SchemaError> {
        let mut registry = Registry::new();
        registry.add_host_type(host, root_host_type, "Query", None)?;
        registry.add_all_fields(host, "Query")?;
        Ok(registry)
    }

    /// Registers an object type backed by a host type, without fields.
    pub fn add_host_type(
        &mut self,
        host: &HostSchema,
        host_type: &str,
        name: impl Into<String>,
        description: Option<String>,
    ) -> Result<(), SchemaError> {
        let declared = host
            .get(host_type)
            .ok_or_else(|| SchemaError::UnknownHostType(host_type.to_owned()))?;
        let mut object = ObjectType::new(name, std::iter::empty());
        object.description = description.or_else(|| declared.description.clone());
        object.host_type = Some(declared.name.clone());
        object.required_auth = declared.required_auth.clone();
        self.add_type(object)
    }

    /// Reflects every public readable member of the backing host type into a
    /// field, skipping obsolete members. Referenced host types and enums are
    /// registered transitively.
    pub fn add_all_fields(&mut self, host: &HostSchema, type_name: &str) -> Result<(), SchemaError> {
        let host_type_name = self
            .lookup_object(type_name)?
            .host_type
            .clone()
            .ok_or_else(|| SchemaError::UnknownHostType(type_name.to_owned()))?;
        let declared = host
            .get(&host_type_name)
            .ok_or_else(|| SchemaError::UnknownHostType(host_type_name.clone()))?
            .clone();

        for member in &declared.members {
            if member.obsolete {
                continue;
            }
            let field_name = member.name.to_camel_case();
            let ty = self.reflect_member_type(host, &member.ty, member.nullable)?;
            let mut field = MetaField::new(field_name.clone(), ty);
            if field_name != member.name {
                field = field.with_mapped_name(member.name.clone());
            }
            field.required_auth = member.required_auth.clone();
            self.add_field(type_name, field)?;
        }
        Ok(())
    }

    fn reflect_member_type(
        &mut self,
        host: &HostSchema,
        ty: &HostTypeRef,
        nullable: bool,
    ) -> Result<MetaFieldType, SchemaError> {
        let base = match ty {
            HostTypeRef::Scalar(kind) => MetaFieldType::from(kind.graphql_name()),
            HostTypeRef::Enum(name) => MetaFieldType::from(self.ensure_host_enum(host, name)?),
            HostTypeRef::Object(name) => MetaFieldType::from(self.ensure_host_object(host, name)?),
            HostTypeRef::List(element) => {
                // List elements are non-null; only the member itself carries
                // nullability.
                self.reflect_member_type(host, element, false)?.list()
            }
        };
        Ok(if nullable { base } else { base.non_null() })
    }

    /// Registers the object type reflected from a host type, if absent, and
    /// returns its GraphQL name. The placeholder is inserted before members
    /// are walked so that cyclic host graphs terminate.
    fn ensure_host_object(
        &mut self,
        host: &HostSchema,
        host_type: &str,
    ) -> Result<String, SchemaError> {
        let declared = host
            .get(host_type)
            .ok_or_else(|| SchemaError::UnknownHostType(host_type.to_owned()))?;
        let graphql_name = declared.name.to_pascal_case();
        if !self.has_type(&graphql_name) {
            self.add_host_type(host, host_type, graphql_name.clone(), None)?;
            self.add_all_fields(host, &graphql_name)?;
        }
        Ok(graphql_name)
    }

    fn ensure_host_enum(
        &mut self,
        host: &HostSchema,
        host_enum: &str,
    ) -> Result<String, SchemaError> {
        let declared = host
            .enums
            .get(host_enum)
            .ok_or_else(|| SchemaError::UnknownHostEnum(host_enum.to_owned()))?;
        let graphql_name = declared.name.to_pascal_case();
        if !self.has_type(&graphql_name) {
            let values = declared.values.iter().map(|value| {
                let exposed = value.to_screaming_snake_case();
                let meta = MetaEnumValue::new(exposed.clone());
                if exposed == *value {
                    meta
                } else {
                    meta.with_host_value(value.clone())
                }
            });
            self.add_type(EnumType::new(graphql_name.clone(), values))?;
        }
        Ok(graphql_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostEnum, HostMember, HostType, ScalarKind};

    fn demo_host() -> HostSchema {
        let mut host = HostSchema::new();
        host.insert_type(HostType::new(
            "DemoContext",
            [
                HostMember::new(
                    "People",
                    HostTypeRef::list_of(HostTypeRef::object("Person")),
                ),
                HostMember::new("Secret", HostTypeRef::scalar(ScalarKind::String))
                    .with_required_role("admin"),
            ],
        ));
        host.insert_type(HostType::new(
            "Person",
            [
                HostMember::new("Id", HostTypeRef::scalar(ScalarKind::Int)),
                HostMember::new("LastName", HostTypeRef::scalar(ScalarKind::String)).nullable(),
                HostMember::new("Mood", HostTypeRef::enumeration("Mood")),
                HostMember::new(
                    "Projects",
                    HostTypeRef::list_of(HostTypeRef::object("Project")),
                ),
                HostMember::new("OldField", HostTypeRef::scalar(ScalarKind::String)).obsolete(),
            ],
        ));
        host.insert_type(HostType::new(
            "Project",
            [
                HostMember::new("Name", HostTypeRef::scalar(ScalarKind::String)),
                // Cycle back to Person.
                HostMember::new("Owner", HostTypeRef::object("Person")).nullable(),
            ],
        ));
        host.insert_enum(HostEnum::new("Mood", ["Happy", "VeryHappy"]));
        host
    }

    #[test]
    fn reflects_camel_cased_fields_with_wrapping() {
        let registry = Registry::reflect(&demo_host(), "DemoContext").unwrap();

        let people = registry.get_field("Query", "people").unwrap();
        assert_eq!(people.ty.as_str(), "[Person!]!");
        assert_eq!(people.target_host_member(), "People");

        let last_name = registry.get_field("Person", "lastName").unwrap();
        assert_eq!(last_name.ty.as_str(), "String");
        assert_eq!(last_name.target_host_member(), "LastName");

        let id = registry.get_field("Person", "id").unwrap();
        assert_eq!(id.ty.as_str(), "Int!");
    }

    #[test]
    fn cyclic_host_graphs_terminate() {
        let registry = Registry::reflect(&demo_host(), "DemoContext").unwrap();
        assert_eq!(
            registry.get_field("Project", "owner").unwrap().ty.as_str(),
            "Person"
        );
        assert_eq!(
            registry.get_field("Person", "projects").unwrap().ty.as_str(),
            "[Project!]!"
        );
    }

    #[test]
    fn enums_are_auto_registered_with_value_mapping() {
        let registry = Registry::reflect(&demo_host(), "DemoContext").unwrap();
        let Some(crate::registry::MetaType::Enum(mood)) = registry.types.get("Mood") else {
            panic!("Mood enum not registered");
        };
        let very_happy = mood.value_by_name("VERY_HAPPY").unwrap();
        assert_eq!(very_happy.host_value(), "VeryHappy");
    }

    #[test]
    fn obsolete_members_are_skipped() {
        let registry = Registry::reflect(&demo_host(), "DemoContext").unwrap();
        assert!(registry.get_field("Person", "oldField").is_none());
    }

    #[test]
    fn authorization_annotations_propagate() {
        let registry = Registry::reflect(&demo_host(), "DemoContext").unwrap();
        let secret = registry.get_field("Query", "secret").unwrap();
        assert!(!secret.required_auth.is_empty());
    }
}
