//! Introspection as ordinary fields: `__schema` and `__type` resolve over a
//! reflective [`HostValue`] built from the registry, so the canonical
//! introspection query compiles and executes through the same projection
//! machinery as any other document. Wrapper types unfold into recursive
//! `ofType` chains; named type references stay shallow (`kind`, `name`) to
//! keep the value tree finite over cyclic schemas.

use async_graphql_value::ConstValue;

use crate::{
    host::HostValue,
    projection::{BinaryOp, Method, Projection},
    registry::{
        EnumType, MetaEnumValue, MetaField, MetaInputValue, MetaType, MetaTypeName, ObjectType,
        Registry, Resolver,
    },
};

/// Registers the `__Schema` family of meta types and the `__schema` /
/// `__type(name:)` entry points on the query root. Idempotent.
pub(crate) fn register_introspection_types(registry: &mut Registry) {
    registry.add_type_if_absent(EnumType::new(
        "__TypeKind",
        [
            "SCALAR",
            "OBJECT",
            "INTERFACE",
            "UNION",
            "ENUM",
            "INPUT_OBJECT",
            "LIST",
            "NON_NULL",
        ]
        .map(MetaEnumValue::new),
    ));
    registry.add_type_if_absent(EnumType::new(
        "__DirectiveLocation",
        [
            "QUERY",
            "MUTATION",
            "SUBSCRIPTION",
            "FIELD",
            "FRAGMENT_DEFINITION",
            "FRAGMENT_SPREAD",
            "INLINE_FRAGMENT",
            "VARIABLE_DEFINITION",
            "FIELD_DEFINITION",
            "ENUM_VALUE",
        ]
        .map(MetaEnumValue::new),
    ));

    registry.add_type_if_absent(ObjectType::new(
        "__Schema",
        [
            MetaField::new("description", "String"),
            MetaField::new("queryType", "__Type!"),
            MetaField::new("mutationType", "__Type"),
            MetaField::new("subscriptionType", "__Type"),
            MetaField::new("types", "[__Type!]!"),
            MetaField::new("directives", "[__Directive!]!"),
        ],
    ));
    registry.add_type_if_absent(ObjectType::new(
        "__Type",
        [
            MetaField::new("kind", "__TypeKind!"),
            MetaField::new("name", "String"),
            MetaField::new("description", "String"),
            MetaField::new("specifiedByURL", "String"),
            MetaField::new("fields", "[__Field!]")
                .with_argument(
                    MetaInputValue::new("includeDeprecated", "Boolean")
                        .with_default(ConstValue::Boolean(false)),
                )
                .with_resolver(Resolver::Expression(deprecation_aware("fields"))),
            MetaField::new("interfaces", "[__Type!]"),
            MetaField::new("possibleTypes", "[__Type!]"),
            MetaField::new("enumValues", "[__EnumValue!]")
                .with_argument(
                    MetaInputValue::new("includeDeprecated", "Boolean")
                        .with_default(ConstValue::Boolean(false)),
                )
                .with_resolver(Resolver::Expression(deprecation_aware("enumValues"))),
            MetaField::new("inputFields", "[__InputValue!]"),
            MetaField::new("ofType", "__Type"),
        ],
    ));
    registry.add_type_if_absent(ObjectType::new(
        "__Field",
        [
            MetaField::new("name", "String!"),
            MetaField::new("description", "String"),
            MetaField::new("args", "[__InputValue!]!"),
            MetaField::new("type", "__Type!"),
            MetaField::new("isDeprecated", "Boolean!"),
            MetaField::new("deprecationReason", "String"),
        ],
    ));
    registry.add_type_if_absent(ObjectType::new(
        "__InputValue",
        [
            MetaField::new("name", "String!"),
            MetaField::new("description", "String"),
            MetaField::new("type", "__Type!"),
            MetaField::new("defaultValue", "String"),
        ],
    ));
    registry.add_type_if_absent(ObjectType::new(
        "__EnumValue",
        [
            MetaField::new("name", "String!"),
            MetaField::new("description", "String"),
            MetaField::new("isDeprecated", "Boolean!"),
            MetaField::new("deprecationReason", "String"),
        ],
    ));
    registry.add_type_if_absent(ObjectType::new(
        "__Directive",
        [
            MetaField::new("name", "String!"),
            MetaField::new("description", "String"),
            MetaField::new("locations", "[__DirectiveLocation!]!"),
            MetaField::new("args", "[__InputValue!]!"),
            MetaField::new("isRepeatable", "Boolean!"),
        ],
    ));

    let query_type = registry.query_type.clone();
    registry.add_type_if_absent(ObjectType::new(query_type.clone(), std::iter::empty()));
    if registry.get_field(&query_type, "__schema").is_none() {
        let _ = registry.add_field(
            &query_type,
            MetaField::new("__schema", "__Schema!")
                .with_resolver(Resolver::SchemaIntrospection),
        );
    }
    if registry.get_field(&query_type, "__type").is_none() {
        let _ = registry.add_field(
            &query_type,
            MetaField::new("__type", "__Type")
                .with_argument(MetaInputValue::new("name", "String!"))
                .with_resolver(Resolver::TypeIntrospection),
        );
    }
}

/// `member` filtered by `isDeprecated` unless `includeDeprecated` is set.
fn deprecation_aware(member: &str) -> Projection {
    let exclude_deprecated = Projection::parent_member(member).call(Method::Where(Box::new(
        Projection::binary(
            BinaryOp::Equal,
            Projection::parent_member("isDeprecated"),
            Projection::boolean(false),
        ),
    )));
    Projection::If {
        condition: Box::new(Projection::binary(
            BinaryOp::Equal,
            Projection::Argument("includeDeprecated".to_owned()),
            Projection::boolean(true),
        )),
        then: Box::new(Projection::parent_member(member)),
        otherwise: Box::new(exclude_deprecated),
    }
}

/// Builds the reflective schema value the introspection entry points project
/// over. Rebuilt whenever the schema version changes.
pub(crate) fn reflective_schema_value(registry: &Registry) -> HostValue {
    let types: Vec<HostValue> = registry
        .types
        .values()
        .map(|ty| type_value(registry, ty))
        .collect();

    HostValue::object([
        ("description", HostValue::Null),
        ("queryType", named_type_ref(registry, &registry.query_type)),
        (
            "mutationType",
            registry
                .mutation_type
                .as_deref()
                .map(|name| named_type_ref(registry, name))
                .unwrap_or(HostValue::Null),
        ),
        ("subscriptionType", HostValue::Null),
        ("types", HostValue::List(types)),
        ("directives", directives_value()),
    ])
}

fn type_value(registry: &Registry, ty: &MetaType) -> HostValue {
    let fields = match ty {
        MetaType::Object(object) => fields_value(registry, object.fields.values()),
        MetaType::Interface(interface) => fields_value(registry, interface.fields.values()),
        _ => HostValue::Null,
    };
    let input_fields = match ty {
        MetaType::InputObject(input) => HostValue::List(
            input
                .input_fields
                .values()
                .map(|value| input_value(registry, value))
                .collect(),
        ),
        _ => HostValue::Null,
    };
    let interfaces = match ty {
        MetaType::Object(object) => HostValue::List(
            object
                .implements
                .iter()
                .map(|name| named_type_ref(registry, name))
                .collect(),
        ),
        MetaType::Interface(_) => HostValue::List(Vec::new()),
        _ => HostValue::Null,
    };
    let possible_types = match ty {
        MetaType::Interface(_) | MetaType::Union(_) => HostValue::List(
            ty.possible_types()
                .into_iter()
                .map(|name| named_type_ref(registry, name))
                .collect(),
        ),
        _ => HostValue::Null,
    };
    let enum_values = match ty {
        MetaType::Enum(declared) => HostValue::List(
            declared
                .values
                .values()
                .map(|value| {
                    HostValue::object([
                        ("name", HostValue::string(&value.name)),
                        (
                            "description",
                            value
                                .description
                                .as_deref()
                                .map(HostValue::string)
                                .unwrap_or(HostValue::Null),
                        ),
                        (
                            "isDeprecated",
                            HostValue::Boolean(value.deprecation.is_deprecated()),
                        ),
                        (
                            "deprecationReason",
                            value
                                .deprecation
                                .reason()
                                .map(HostValue::string)
                                .unwrap_or(HostValue::Null),
                        ),
                    ])
                })
                .collect(),
        ),
        _ => HostValue::Null,
    };

    HostValue::object([
        ("kind", HostValue::Enum(ty.kind().to_owned())),
        ("name", HostValue::string(ty.name())),
        (
            "description",
            ty.description()
                .map(HostValue::string)
                .unwrap_or(HostValue::Null),
        ),
        ("specifiedByURL", HostValue::Null),
        ("fields", fields),
        ("interfaces", interfaces),
        ("possibleTypes", possible_types),
        ("enumValues", enum_values),
        ("inputFields", input_fields),
        ("ofType", HostValue::Null),
    ])
}

fn fields_value<'a>(
    registry: &Registry,
    fields: impl Iterator<Item = &'a MetaField>,
) -> HostValue {
    HostValue::List(
        fields
            .filter(|field| !field.name.starts_with("__"))
            .map(|field| {
                HostValue::object([
                    ("name", HostValue::string(&field.name)),
                    (
                        "description",
                        field
                            .description
                            .as_deref()
                            .map(HostValue::string)
                            .unwrap_or(HostValue::Null),
                    ),
                    (
                        "args",
                        HostValue::List(
                            field
                                .args
                                .values()
                                .map(|argument| input_value(registry, argument))
                                .collect(),
                        ),
                    ),
                    ("type", wrapped_type_ref(registry, field.ty.as_str())),
                    (
                        "isDeprecated",
                        HostValue::Boolean(field.deprecation.is_deprecated()),
                    ),
                    (
                        "deprecationReason",
                        field
                            .deprecation
                            .reason()
                            .map(HostValue::string)
                            .unwrap_or(HostValue::Null),
                    ),
                ])
            })
            .collect(),
    )
}

fn input_value(registry: &Registry, value: &MetaInputValue) -> HostValue {
    HostValue::object([
        ("name", HostValue::string(&value.name)),
        (
            "description",
            value
                .description
                .as_deref()
                .map(HostValue::string)
                .unwrap_or(HostValue::Null),
        ),
        ("type", wrapped_type_ref(registry, value.ty.as_str())),
        (
            "defaultValue",
            value
                .default_value
                .as_ref()
                .map(|default| HostValue::String(default.to_string()))
                .unwrap_or(HostValue::Null),
        ),
    ])
}

/// A type reference: wrappers unfold into `ofType` chains, named types stay
/// shallow.
fn wrapped_type_ref(registry: &Registry, spelled: &str) -> HostValue {
    match MetaTypeName::create(spelled) {
        MetaTypeName::NonNull(inner) => HostValue::object([
            ("kind", HostValue::Enum("NON_NULL".to_owned())),
            ("name", HostValue::Null),
            ("ofType", wrapped_type_ref(registry, inner)),
        ]),
        MetaTypeName::List(inner) => HostValue::object([
            ("kind", HostValue::Enum("LIST".to_owned())),
            ("name", HostValue::Null),
            ("ofType", wrapped_type_ref(registry, inner)),
        ]),
        MetaTypeName::Named(name) => named_type_ref(registry, name),
    }
}

fn named_type_ref(registry: &Registry, name: &str) -> HostValue {
    let kind = registry
        .types
        .get(name)
        .map(|ty| ty.kind())
        .unwrap_or("SCALAR");
    HostValue::object([
        ("kind", HostValue::Enum(kind.to_owned())),
        ("name", HostValue::string(name)),
        ("ofType", HostValue::Null),
    ])
}

fn directives_value() -> HostValue {
    let if_argument = |description: &str| {
        HostValue::object([
            ("name", HostValue::string("if")),
            ("description", HostValue::string(description)),
            (
                "type",
                HostValue::object([
                    ("kind", HostValue::Enum("NON_NULL".to_owned())),
                    ("name", HostValue::Null),
                    (
                        "ofType",
                        HostValue::object([
                            ("kind", HostValue::Enum("SCALAR".to_owned())),
                            ("name", HostValue::string("Boolean")),
                            ("ofType", HostValue::Null),
                        ]),
                    ),
                ]),
            ),
            ("defaultValue", HostValue::Null),
        ])
    };
    let directive = |name: &str, description: &str, locations: &[&str], args: Vec<HostValue>| {
        HostValue::object([
            ("name", HostValue::string(name)),
            ("description", HostValue::string(description)),
            (
                "locations",
                HostValue::List(
                    locations
                        .iter()
                        .map(|location| HostValue::Enum((*location).to_owned()))
                        .collect(),
                ),
            ),
            ("args", HostValue::List(args)),
            ("isRepeatable", HostValue::Boolean(false)),
        ])
    };

    HostValue::List(vec![
        directive(
            "skip",
            "Directs the executor to skip this field or fragment when the `if` argument is true.",
            &["FIELD", "FRAGMENT_SPREAD", "INLINE_FRAGMENT"],
            vec![if_argument("Skipped when true.")],
        ),
        directive(
            "include",
            "Directs the executor to include this field or fragment only when the `if` argument is true.",
            &["FIELD", "FRAGMENT_SPREAD", "INLINE_FRAGMENT"],
            vec![if_argument("Included when true.")],
        ),
        directive(
            "deprecated",
            "Marks an element of a GraphQL schema as no longer supported.",
            &["FIELD_DEFINITION", "ENUM_VALUE"],
            Vec::new(),
        ),
    ])
}
