use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;

use crate::errors::WardenError;
use crate::hooks::ServiceHooks;
use crate::service::WardenService;

/// A registered service together with its typed hooks.
pub(crate) struct ServiceEntry<R, P> {
    pub service: Arc<dyn WardenService<R, P>>,
    pub hooks: ServiceHooks<R, P>,
}

/// Maps service names to services of any record type.
///
/// Entries are stored type-erased; lookups name the record and params
/// types and fail if they differ from what was registered.
#[derive(Default)]
pub struct WardenServiceRegistry {
    services: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl WardenServiceRegistry {
    pub fn new() -> Self {
        Self {
            services: HashMap::new(),
        }
    }

    /// Register (or replace) a service under a given name.
    pub fn register<R, P, S>(&mut self, name: S, service: Arc<dyn WardenService<R, P>>)
    where
        R: Send + 'static,
        P: Send + 'static,
        S: Into<String>,
    {
        let entry = ServiceEntry {
            service,
            hooks: ServiceHooks::<R, P>::new(),
        };
        self.services.insert(name.into(), Box::new(entry));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.services.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub(crate) fn entry<R, P>(&self, name: &str) -> Result<&ServiceEntry<R, P>>
    where
        R: Send + 'static,
        P: Send + 'static,
    {
        self.services
            .get(name)
            .ok_or_else(|| missing(name))?
            .downcast_ref::<ServiceEntry<R, P>>()
            .ok_or_else(|| mismatch(name))
    }

    pub(crate) fn entry_mut<R, P>(&mut self, name: &str) -> Result<&mut ServiceEntry<R, P>>
    where
        R: Send + 'static,
        P: Send + 'static,
    {
        self.services
            .get_mut(name)
            .ok_or_else(|| missing(name))?
            .downcast_mut::<ServiceEntry<R, P>>()
            .ok_or_else(|| mismatch(name))
    }
}

fn missing(name: &str) -> anyhow::Error {
    WardenError::not_found(format!("WardenService not found: {name}")).into_anyhow()
}

fn mismatch(name: &str) -> anyhow::Error {
    WardenError::general_error(format!(
        "WardenService type mismatch for '{name}'. \
         You requested a different <R,P> than what was registered."
    ))
    .into_anyhow()
}
