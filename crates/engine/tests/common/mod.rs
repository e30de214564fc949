#![allow(dead_code)]

use std::sync::Arc;

use futures::future::BoxFuture;
use prism_engine::{
    auth::StaticPrincipal,
    host::{
        DataContext, HostEnum, HostMember, HostSchema, HostType, HostTypeRef, HostValue,
        ScalarKind,
    },
    projection::{BinaryOp, Method, Projection},
    registry::{
        MetaField, MetaInputValue, MutationOutcome, MutationResolver, Registry, Resolver,
    },
    ConstValue, Engine, Error, Request, Response,
};

pub fn demo_host() -> HostSchema {
    let mut host = HostSchema::new();
    host.insert_type(HostType::new(
        "DemoContext",
        [
            HostMember::new("People", HostTypeRef::list_of(HostTypeRef::object("Person"))),
            HostMember::new(
                "Projects",
                HostTypeRef::list_of(HostTypeRef::object("Project")),
            ),
            HostMember::new("Actors", HostTypeRef::list_of(HostTypeRef::object("Actor"))),
            HostMember::new("Payroll", HostTypeRef::object("Payroll")).nullable(),
            HostMember::new("Secret", HostTypeRef::scalar(ScalarKind::String))
                .with_required_role("admin"),
        ],
    ));
    host.insert_type(HostType::new(
        "Person",
        [
            HostMember::new("Id", HostTypeRef::scalar(ScalarKind::Int)),
            HostMember::new("Name", HostTypeRef::scalar(ScalarKind::String)),
            HostMember::new("LastName", HostTypeRef::scalar(ScalarKind::String)).nullable(),
            HostMember::new("Mood", HostTypeRef::enumeration("Mood")).nullable(),
            HostMember::new("Manager", HostTypeRef::object("Person")).nullable(),
        ],
    ));
    host.insert_type(HostType::new(
        "Project",
        [
            HostMember::new("Id", HostTypeRef::scalar(ScalarKind::Int)),
            HostMember::new("Name", HostTypeRef::scalar(ScalarKind::String)),
            HostMember::new("Tasks", HostTypeRef::list_of(HostTypeRef::object("Task"))),
            HostMember::new("Owner", HostTypeRef::object("Person")).nullable(),
        ],
    ));
    host.insert_type(HostType::new(
        "Task",
        [
            HostMember::new("Id", HostTypeRef::scalar(ScalarKind::Int)),
            HostMember::new("Name", HostTypeRef::scalar(ScalarKind::String)),
            HostMember::new("Done", HostTypeRef::scalar(ScalarKind::Boolean)),
        ],
    ));
    host.insert_type(HostType::new(
        "Actor",
        [
            HostMember::new("Id", HostTypeRef::scalar(ScalarKind::Int)),
            HostMember::new("Name", HostTypeRef::scalar(ScalarKind::String)),
        ],
    ));
    host.insert_type(
        HostType::new(
            "Payroll",
            [HostMember::new("Total", HostTypeRef::scalar(ScalarKind::Int))],
        )
        .with_required_role("hr"),
    );
    host.insert_enum(HostEnum::new("Mood", ["Happy", "VeryHappy"]));
    host
}

pub fn demo_registry() -> Registry {
    let host = demo_host();
    let mut registry = Registry::reflect(&host, "DemoContext").unwrap();

    registry
        .add_field(
            "Query",
            MetaField::new("totalPeople", "Int!")
                .with_resolver(Resolver::Expression(
                    Projection::parent_member("People").count(),
                )),
        )
        .unwrap();
    registry
        .add_field(
            "Query",
            MetaField::new("person", "Person")
                .with_argument(MetaInputValue::new("id", "Int!"))
                .with_resolver(Resolver::Expression(
                    Projection::parent_member("People").call(Method::First(Some(Box::new(
                        Projection::binary(
                            BinaryOp::Equal,
                            Projection::parent_member("Id"),
                            Projection::Argument("id".to_owned()),
                        ),
                    )))),
                )),
        )
        .unwrap();
    registry
        .add_field(
            "Query",
            MetaField::new("peoplePaged", "[Person!]!").with_mapped_name("People"),
        )
        .unwrap();

    registry.use_filter("Query", "people").unwrap();
    registry.use_sort("Query", "people").unwrap();
    registry.use_filter("Query", "projects").unwrap();
    registry.use_offset_paging("Query", "peoplePaged").unwrap();

    registry.use_filter("Query", "actors").unwrap();
    registry.use_sort("Query", "actors").unwrap();
    registry.use_connection_paging("Query", "actors").unwrap();

    registry
        .add_mutation(
            MetaField::new("addPerson", "Person!")
                .with_argument(MetaInputValue::new("name", "String!"))
                .with_resolver(Resolver::Mutation(MutationResolver::new(add_person))),
        )
        .unwrap();
    registry
        .add_mutation(
            MetaField::new("removePeople", "Int!")
                .with_resolver(Resolver::Mutation(MutationResolver::new(remove_people))),
        )
        .unwrap();
    registry
        .add_mutation(
            MetaField::new("failingMutation", "Int")
                .with_resolver(Resolver::Mutation(MutationResolver::new(fail_always))),
        )
        .unwrap();
    registry
        .add_mutation(
            MetaField::new("adminOnly", "Int!")
                .with_required_role("admin")
                .with_resolver(Resolver::Mutation(MutationResolver::new(admin_only))),
        )
        .unwrap();

    registry
}

pub fn demo_engine() -> Engine {
    Engine::new(demo_registry())
}

fn add_person(root: &mut HostValue, args: ConstValue) -> BoxFuture<'_, Result<MutationOutcome, Error>> {
    Box::pin(async move {
        let name = string_arg(&args, "name")
            .ok_or_else(|| Error::new("addPerson requires a name"))?;
        let people = root
            .member_mut("People")
            .ok_or_else(|| Error::new("context has no People"))?;
        let HostValue::List(people) = people else {
            return Err(Error::new("People is not a collection"));
        };
        let id = 100 + people.len() as i64 + 1;
        people.push(HostValue::object([
            ("Id", HostValue::integer(id)),
            ("Name", HostValue::string(name)),
            ("LastName", HostValue::Null),
            ("Mood", HostValue::string("Happy")),
            ("Manager", HostValue::Null),
        ]));
        Ok(MutationOutcome::Projection(
            Projection::parent_member("People").call(Method::Last(None)),
        ))
    })
}

fn remove_people(
    root: &mut HostValue,
    _args: ConstValue,
) -> BoxFuture<'_, Result<MutationOutcome, Error>> {
    Box::pin(async move {
        let people = root
            .member_mut("People")
            .ok_or_else(|| Error::new("context has no People"))?;
        let HostValue::List(people) = people else {
            return Err(Error::new("People is not a collection"));
        };
        let removed = people.len() as i64;
        people.clear();
        Ok(MutationOutcome::Value(HostValue::integer(removed)))
    })
}

fn fail_always(
    _root: &mut HostValue,
    _args: ConstValue,
) -> BoxFuture<'_, Result<MutationOutcome, Error>> {
    Box::pin(async move { Err(Error::new("the database is on fire")) })
}

fn admin_only(
    _root: &mut HostValue,
    _args: ConstValue,
) -> BoxFuture<'_, Result<MutationOutcome, Error>> {
    Box::pin(async move { Ok(MutationOutcome::Value(HostValue::integer(1))) })
}

fn string_arg(args: &ConstValue, name: &str) -> Option<String> {
    match args {
        ConstValue::Object(members) => members
            .iter()
            .find(|(key, _)| key.as_str() == name)
            .and_then(|(_, value)| match value {
                ConstValue::String(value) => Some(value.clone()),
                _ => None,
            }),
        _ => None,
    }
}

pub fn context(root: serde_json::Value) -> DataContext {
    DataContext::new(HostValue::from(root))
}

/// The default context: one person, two projects (one with four tasks), five
/// actors.
pub fn demo_context() -> DataContext {
    context(serde_json::json!({
        "People": [
            {"Id": 99, "Name": "Luke", "LastName": "Last Name", "Mood": "VeryHappy", "Manager": null},
        ],
        "Projects": [
            {
                "Id": 1,
                "Name": "Deathstar",
                "Owner": {"Id": 99, "Name": "Luke", "LastName": "Last Name", "Mood": "Happy", "Manager": null},
                "Tasks": [
                    {"Id": 1, "Name": "Design", "Done": true},
                    {"Id": 2, "Name": "Build", "Done": false},
                    {"Id": 3, "Name": "Test", "Done": false},
                    {"Id": 4, "Name": "Deploy", "Done": false},
                ],
            },
            {"Id": 2, "Name": "X-Wing", "Owner": null, "Tasks": []},
        ],
        "Actors": [
            {"Id": 1, "Name": "Alec"},
            {"Id": 2, "Name": "Carrie"},
            {"Id": 3, "Name": "Harrison"},
            {"Id": 4, "Name": "James"},
            {"Id": 5, "Name": "Mark"},
        ],
        "Payroll": {"Total": 1000000},
        "Secret": "plans",
    }))
}

/// A context whose `People` collection holds `count` persons with ids
/// `1..=count`.
pub fn people_context(count: usize) -> DataContext {
    let people: Vec<serde_json::Value> = (1..=count)
        .map(|id| {
            serde_json::json!({
                "Id": id,
                "Name": format!("Person {id}"),
                "LastName": null,
                "Mood": "Happy",
                "Manager": null,
            })
        })
        .collect();
    context(serde_json::json!({
        "People": people,
        "Projects": [],
        "Actors": [],
        "Payroll": null,
        "Secret": "plans",
    }))
}

pub async fn run(engine: &Engine, context: &mut DataContext, query: &str) -> Response {
    engine.execute(context, Request::new(query)).await
}

pub async fn run_as(
    engine: &Engine,
    context: &mut DataContext,
    query: &str,
    roles: &[&str],
) -> Response {
    let principal = Arc::new(StaticPrincipal::with_roles(roles.iter().copied()));
    engine
        .execute(context, Request::new(query).with_principal(principal))
        .await
}
