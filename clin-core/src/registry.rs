use std::collections::HashMap;
use std::sync::Arc;

use crate::ClinService;

/// A simple registry that maps service names to ClinService instances.
///
/// Named services can be called from any transport (HTTP, CLI, jobs).
pub struct ClinServiceRegistry<R, P = ()> {
    services: HashMap<String, Arc<dyn ClinService<R, P>>>,
}

impl<R, P> ClinServiceRegistry<R, P>
where
    R: Send + 'static,
    P: Send + 'static,
{
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            services: HashMap::new(),
        }
    }

    /// Register a service under a given name.
    pub fn register<S>(&mut self, name: S, service: Arc<dyn ClinService<R, P>>)
    where
        S: Into<String>,
    {
        self.services.insert(name.into(), service);
    }

    /// Look up a service by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ClinService<R, P>>> {
        self.services.get(name)
    }
}

impl<R, P> Default for ClinServiceRegistry<R, P>
where
    R: Send + 'static,
    P: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
