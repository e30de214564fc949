use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use crate::{
    host::HostValue,
    operation::{parse, ParseError, ParsedOperation},
    registry::{reflective_schema_value, register_introspection_types, Registry},
};

/// The engine: a schema plus the per-process caches built over it.
///
/// Shared immutably across concurrent requests. Schema edits go through
/// [`Engine::registry_mut`], which requires exclusive access — exactly the
/// serialisation the schema model demands — and invalidate the caches through
/// the registry version.
pub struct Engine {
    registry: Registry,
    plan_cache: Mutex<HashMap<PlanCacheKey, Arc<ParsedOperation>>>,
    introspection: Mutex<Option<(u64, Arc<HostValue>)>>,
}

/// Parsed documents are cached per `(document, operation name)` and keyed by
/// schema version. Variables, principals and host contexts never enter the
/// cache; binding stays per-request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PlanCacheKey {
    query: String,
    operation_name: Option<String>,
    schema_version: u64,
}

impl Engine {
    pub fn new(mut registry: Registry) -> Self {
        register_introspection_types(&mut registry);
        Engine {
            registry,
            plan_cache: Mutex::new(HashMap::new()),
            introspection: Mutex::new(None),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Exclusive access for the administrative schema-edit APIs. Not safe to
    /// interleave with execution, which the borrow rules enforce.
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub(crate) fn parsed_operation(
        &self,
        query: &str,
        operation_name: Option<&str>,
    ) -> Result<Arc<ParsedOperation>, ParseError> {
        let key = PlanCacheKey {
            query: query.to_owned(),
            operation_name: operation_name.map(str::to_owned),
            schema_version: self.registry.version(),
        };
        if let Some(hit) = lock(&self.plan_cache).get(&key) {
            tracing::trace!("plan cache hit");
            return Ok(hit.clone());
        }
        let parsed = Arc::new(parse(query, operation_name)?);
        lock(&self.plan_cache).insert(key, parsed.clone());
        Ok(parsed)
    }

    /// The reflective schema value `__schema` and `__type` project over,
    /// rebuilt when the schema version changes.
    pub(crate) fn introspection_data(&self) -> Arc<HostValue> {
        let mut guard = lock(&self.introspection);
        match &*guard {
            Some((version, data)) if *version == self.registry.version() => data.clone(),
            _ => {
                let data = Arc::new(reflective_schema_value(&self.registry));
                *guard = Some((self.registry.version(), data.clone()));
                data
            }
        }
    }
}

/// A poisoned lock only means another thread panicked mid-insert; the cached
/// data itself is always whole values, so recover the guard.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
