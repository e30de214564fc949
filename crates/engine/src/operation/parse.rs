use std::collections::{HashMap, HashSet};

use async_graphql_parser::{
    parse_query,
    types::{
        DocumentOperations, FragmentDefinition, OperationDefinition, OperationType, Selection,
        SelectionSet,
    },
    Positioned,
};
use async_graphql_value::Name;
use itertools::Itertools;

use crate::error::{ErrorKind, ServerError};

use super::OperationKind;

pub(crate) type ParseResult<T> = Result<T, ParseError>;

#[derive(Debug, thiserror::Error)]
pub(crate) enum ParseError {
    #[error("Unknown operation named '{0}'.")]
    UnknownOperation(String),
    #[error("Missing operation name.")]
    MissingOperationName,
    #[error("Subscriptions are not supported.")]
    SubscriptionsUnsupported,
    #[error(transparent)]
    Syntax(#[from] async_graphql_parser::Error),
    #[error("Unknown fragment named '{name}'")]
    UnknownFragment { name: String },
    #[error("Fragment cycle detected: {}", .cycle.iter().join(", "))]
    FragmentCycle { cycle: Vec<String> },
}

impl ParseError {
    pub(crate) fn into_server_error(self) -> ServerError {
        match self {
            ParseError::Syntax(ref error) => {
                let positions = error.positions();
                let mut server_error = ServerError::new(ErrorKind::ParseError, &self);
                for pos in positions {
                    server_error = server_error.with_location(pos);
                }
                server_error
            }
            other => ServerError::new(ErrorKind::CompilerError, other),
        }
    }
}

/// A parsed document narrowed down to a single operation, with its fragment
/// table validated for unknown spreads and cycles. Shareable across requests
/// through the plan cache: nothing request-specific lives here.
#[derive(Debug)]
pub(crate) struct ParsedOperation {
    pub name: Option<String>,
    pub kind: OperationKind,
    pub definition: Positioned<OperationDefinition>,
    pub fragments: HashMap<Name, Positioned<FragmentDefinition>>,
}

pub(crate) fn parse(query: &str, operation_name: Option<&str>) -> ParseResult<ParsedOperation> {
    let document = parse_query(query)?;

    let (name, definition) = match (document.operations, operation_name) {
        (DocumentOperations::Single(definition), None) => (None, definition),
        (DocumentOperations::Single(_), Some(wanted)) => {
            return Err(ParseError::UnknownOperation(wanted.to_owned()));
        }
        (DocumentOperations::Multiple(mut operations), Some(wanted)) => {
            let key = operations
                .keys()
                .find(|name| name.as_str() == wanted)
                .cloned()
                .ok_or_else(|| ParseError::UnknownOperation(wanted.to_owned()))?;
            let definition = operations.remove(&key).expect("key was just found");
            (Some(wanted.to_owned()), definition)
        }
        (DocumentOperations::Multiple(operations), None) => {
            if operations.len() == 1 {
                let (name, definition) = operations
                    .into_iter()
                    .next()
                    .expect("length was just checked");
                (Some(name.to_string()), definition)
            } else {
                return Err(ParseError::MissingOperationName);
            }
        }
    };

    let kind = match definition.node.ty {
        OperationType::Query => OperationKind::Query,
        OperationType::Mutation => OperationKind::Mutation,
        OperationType::Subscription => return Err(ParseError::SubscriptionsUnsupported),
    };

    check_fragments(&definition.node.selection_set.node, &document.fragments)?;

    Ok(ParsedOperation {
        name,
        kind,
        definition,
        fragments: document.fragments,
    })
}

/// Rejects spreads of unknown fragments and fragment cycles up front, so the
/// binder can resolve spreads transitively without re-checking termination.
fn check_fragments(
    root: &SelectionSet,
    fragments: &HashMap<Name, Positioned<FragmentDefinition>>,
) -> ParseResult<()> {
    for spread in spreads_in(root) {
        if !fragments.contains_key(&spread) {
            return Err(ParseError::UnknownFragment {
                name: spread.to_string(),
            });
        }
    }

    let mut finished = HashSet::new();
    for name in fragments.keys() {
        let mut stack = Vec::new();
        visit_fragment(name, fragments, &mut stack, &mut finished)?;
    }
    Ok(())
}

fn visit_fragment(
    name: &Name,
    fragments: &HashMap<Name, Positioned<FragmentDefinition>>,
    stack: &mut Vec<Name>,
    finished: &mut HashSet<Name>,
) -> ParseResult<()> {
    if let Some(position) = stack.iter().position(|visited| visited == name) {
        let mut cycle: Vec<String> = stack[position..].iter().map(|n| n.to_string()).collect();
        cycle.push(name.to_string());
        return Err(ParseError::FragmentCycle { cycle });
    }
    if finished.contains(name) {
        return Ok(());
    }
    let definition = fragments
        .get(name)
        .ok_or_else(|| ParseError::UnknownFragment {
            name: name.to_string(),
        })?;

    stack.push(name.clone());
    for spread in spreads_in(&definition.node.selection_set.node) {
        visit_fragment(&spread, fragments, stack, finished)?;
    }
    stack.pop();
    finished.insert(name.clone());
    Ok(())
}

fn spreads_in(selection_set: &SelectionSet) -> Vec<Name> {
    let mut spreads = Vec::new();
    collect_spreads(selection_set, &mut spreads);
    spreads
}

fn collect_spreads(selection_set: &SelectionSet, spreads: &mut Vec<Name>) {
    for item in &selection_set.items {
        match &item.node {
            Selection::Field(field) => collect_spreads(&field.node.selection_set.node, spreads),
            Selection::FragmentSpread(spread) => {
                spreads.push(spread.node.fragment_name.node.clone());
            }
            Selection::InlineFragment(fragment) => {
                collect_spreads(&fragment.node.selection_set.node, spreads);
            }
        }
    }
}
