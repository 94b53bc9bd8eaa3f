use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use anyhow::Result;

use crate::errors::ClinError;
use crate::{ClinConfig, ClinConfigSnapshot, ClinService, ClinServiceRegistry};

struct ClinAppInner<R, P>
where
    R: Send + 'static,
    P: Send + 'static,
{
    registry: RwLock<ClinServiceRegistry<R, P>>,
    config: RwLock<ClinConfig>,
    // Typed state store, e.g. Arc<CredentialIssuer> under "authentication".
    state: RwLock<HashMap<String, Box<dyn Any + Send + Sync>>>,
}

/// ClinApp is the central application container for ClinRS.
///
/// Framework-agnostic. Holds:
/// - service registry
/// - string configuration
/// - typed state (installed components such as the credential issuer)
pub struct ClinApp<R, P = ()>
where
    R: Send + 'static,
    P: Send + 'static,
{
    inner: Arc<ClinAppInner<R, P>>,
}

impl<R, P> Default for ClinApp<R, P>
where
    R: Send + 'static,
    P: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<R, P> Clone for ClinApp<R, P>
where
    R: Send + 'static,
    P: Send + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R, P> ClinApp<R, P>
where
    R: Send + 'static,
    P: Send + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ClinAppInner {
                registry: RwLock::new(ClinServiceRegistry::new()),
                config: RwLock::new(ClinConfig::new()),
                state: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn register_service<S>(&self, name: S, service: Arc<dyn ClinService<R, P>>)
    where
        S: Into<String>,
    {
        self.inner
            .registry
            .write()
            .unwrap()
            .register(name, service);
    }

    /// Look up a registered service by name.
    pub fn service(&self, name: &str) -> Result<Arc<dyn ClinService<R, P>>> {
        self.inner
            .registry
            .read()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| ClinError::not_found(format!("ClinService not found: {name}")).into_anyhow())
    }

    /// `app.set(key, value)`: string configuration.
    pub fn set<K, V>(&self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.inner.config.write().unwrap().set(key, value);
    }

    /// `app.get(key)`
    pub fn get(&self, key: &str) -> Option<String> {
        let cfg = self.inner.config.read().unwrap();
        cfg.get(key).map(|v| v.to_string())
    }

    pub fn config_snapshot(&self) -> ClinConfigSnapshot {
        let cfg = self.inner.config.read().unwrap();
        cfg.snapshot()
    }

    /// Install a typed component under a key.
    pub fn set_state<T>(&self, key: impl Into<String>, value: T)
    where
        T: Clone + Send + Sync + 'static,
    {
        self.inner
            .state
            .write()
            .unwrap()
            .insert(key.into(), Box::new(value));
    }

    /// Retrieve a typed component installed with [`set_state`](Self::set_state).
    pub fn state<T>(&self, key: &str) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.inner
            .state
            .read()
            .unwrap()
            .get(key)
            .and_then(|b| b.downcast_ref::<T>())
            .cloned()
    }
}
