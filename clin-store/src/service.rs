use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use clin_core::errors::ClinError;
use clin_core::{ClinService, ServiceCapabilities, TenantContext};
use serde_json::Value;

use crate::error::StoreError;
use crate::memory::{Filter, MemoryStore};

/// A ClinService backed by a [`MemoryStore`].
///
/// The tenant parameter on every method is forwarded as the partition
/// key; request params are transport details this service does not
/// interpret.
pub struct MemoryService<P = ()> {
    store: Arc<MemoryStore>,
    capabilities: ServiceCapabilities,
    _params: std::marker::PhantomData<fn(P)>,
}

impl<P> MemoryService<P> {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            capabilities: ServiceCapabilities::standard_crud(),
            _params: std::marker::PhantomData,
        }
    }

    pub fn with_capabilities(mut self, capabilities: ServiceCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }
}

fn store_err(e: StoreError) -> anyhow::Error {
    match e {
        StoreError::NotFound(id) => ClinError::not_found(format!("Record not found: {id}")),
        StoreError::NotAnObject => ClinError::unprocessable("Record must be a JSON object"),
    }
    .into_anyhow()
}

#[async_trait]
impl<P> ClinService<Value, P> for MemoryService<P>
where
    P: Send + 'static,
{
    fn capabilities(&self) -> ServiceCapabilities {
        self.capabilities.clone()
    }

    async fn find(&self, ctx: &TenantContext, _params: P) -> Result<Vec<Value>> {
        Ok(self.store.find(ctx.id(), &Filter::new()))
    }

    async fn get(&self, ctx: &TenantContext, id: &str, _params: P) -> Result<Value> {
        self.store.get(ctx.id(), id).map_err(store_err)
    }

    async fn create(&self, ctx: &TenantContext, data: Value, _params: P) -> Result<Value> {
        self.store.save(ctx.id(), data).map_err(store_err)
    }

    async fn update(&self, ctx: &TenantContext, id: &str, data: Value, _params: P) -> Result<Value> {
        // Full replace: the record must already exist in this partition.
        self.store.get(ctx.id(), id).map_err(store_err)?;

        let mut data = data;
        if let Some(map) = data.as_object_mut() {
            map.insert("id".to_string(), Value::String(id.to_string()));
        }
        self.store.save(ctx.id(), data).map_err(store_err)
    }

    async fn patch(
        &self,
        ctx: &TenantContext,
        id: Option<&str>,
        data: Value,
        _params: P,
    ) -> Result<Value> {
        let Some(id) = id else {
            clin_core::bail_clin!(bad_request, "patch requires an id");
        };
        self.store.merge(ctx.id(), id, data).map_err(store_err)
    }

    async fn remove(&self, ctx: &TenantContext, id: Option<&str>, _params: P) -> Result<Value> {
        let Some(id) = id else {
            clin_core::bail_clin!(bad_request, "remove requires an id");
        };
        self.store.delete(ctx.id(), id).map_err(store_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clin_core::errors::ErrorKind;
    use serde_json::json;

    fn service() -> MemoryService {
        MemoryService::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn create_then_find_stays_inside_the_tenant() {
        let svc = service();
        let c1 = TenantContext::new("CLINICA_1");
        let c2 = TenantContext::new("CLINICA_2");

        svc.create(&c1, json!({"name": "Ana"}), ()).await.unwrap();
        svc.create(&c2, json!({"name": "Bruno"}), ()).await.unwrap();

        let found = svc.find(&c1, ()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["clinicId"], json!("CLINICA_1"));
    }

    #[tokio::test]
    async fn update_requires_an_existing_record() {
        let svc = service();
        let ctx = TenantContext::new("C1");

        let err = svc
            .update(&ctx, "missing", json!({"name": "x"}), ())
            .await
            .unwrap_err();
        let clin = ClinError::from_anyhow(&err).unwrap();
        assert_eq!(clin.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn non_object_records_are_unprocessable() {
        let svc = service();
        let ctx = TenantContext::new("C1");

        let err = svc.create(&ctx, json!("just a string"), ()).await.unwrap_err();
        let clin = ClinError::from_anyhow(&err).unwrap();
        assert_eq!(clin.kind, ErrorKind::Unprocessable);
    }

    #[tokio::test]
    async fn remove_without_an_id_is_a_client_error() {
        let svc = service();
        let ctx = TenantContext::new("C1");

        let err = svc.remove(&ctx, None, ()).await.unwrap_err();
        let clin = ClinError::from_anyhow(&err).unwrap();
        assert_eq!(clin.kind, ErrorKind::BadRequest);
    }
}
