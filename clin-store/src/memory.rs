use std::collections::HashMap;
use std::sync::Arc;

use clin_core::TenantId;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};

/// Primary-key field on stored records.
pub const ID_FIELD: &str = "id";
/// Mandatory tenant attribute stamped onto every stored record.
pub const CLINIC_ID_FIELD: &str = "clinicId";

/// Equality filter, ANDed across fields. The tenant predicate is not part
/// of the filter: it is the partition key and is always applied.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    fields: HashMap<String, Value>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn matches(&self, record: &Value) -> bool {
        self.fields
            .iter()
            .all(|(k, v)| record.get(k) == Some(v))
    }
}

// Record maps keyed by tenant first, then record id.
type TenantPartitions = HashMap<TenantId, HashMap<String, Value>>;

/// In-memory store with hard per-tenant partitions.
pub struct MemoryStore {
    records: Arc<RwLock<TenantPartitions>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// List records in the tenant's partition matching `filter`.
    pub fn find(&self, tenant: &TenantId, filter: &Filter) -> Vec<Value> {
        let records = self.records.read();
        let Some(partition) = records.get(tenant) else {
            return Vec::new();
        };

        partition
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect()
    }

    /// Fetch one record by id from the tenant's partition.
    pub fn get(&self, tenant: &TenantId, id: &str) -> StoreResult<Value> {
        let records = self.records.read();
        records
            .get(tenant)
            .and_then(|p| p.get(id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Persist a record into the tenant's partition, stamping the tenant
    /// attribute and assigning an id when absent. Returns the stored form.
    pub fn save(&self, tenant: &TenantId, record: Value) -> StoreResult<Value> {
        let Value::Object(mut map) = record else {
            return Err(StoreError::NotAnObject);
        };

        let id = match map.get(ID_FIELD).and_then(|v| v.as_str()) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                let id = Uuid::new_v4().to_string();
                map.insert(ID_FIELD.to_string(), Value::String(id.clone()));
                id
            }
        };

        // The stored tenant attribute always reflects the partition it
        // lives in, whatever the caller put in the payload.
        map.insert(
            CLINIC_ID_FIELD.to_string(),
            Value::String(tenant.as_str().to_string()),
        );

        let stored = Value::Object(map);
        self.records
            .write()
            .entry(tenant.clone())
            .or_default()
            .insert(id, stored.clone());

        Ok(stored)
    }

    /// Merge `patch` over an existing record in the tenant's partition.
    pub fn merge(&self, tenant: &TenantId, id: &str, patch: Value) -> StoreResult<Value> {
        let Value::Object(patch) = patch else {
            return Err(StoreError::NotAnObject);
        };

        let mut records = self.records.write();
        let partition = records
            .get_mut(tenant)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let existing = partition
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let Some(map) = existing.as_object_mut() else {
            return Err(StoreError::NotAnObject);
        };
        for (k, v) in patch {
            // Identity and tenant stamps are immutable through patches.
            if k == ID_FIELD || k == CLINIC_ID_FIELD {
                continue;
            }
            map.insert(k, v);
        }

        Ok(existing.clone())
    }

    /// Remove a record from the tenant's partition, returning it.
    pub fn delete(&self, tenant: &TenantId, id: &str) -> StoreResult<Value> {
        self.records
            .write()
            .get_mut(tenant)
            .and_then(|p| p.remove(id))
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Number of records in the tenant's partition.
    pub fn len(&self, tenant: &TenantId) -> usize {
        self.records
            .read()
            .get(tenant)
            .map(|p| p.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, tenant: &TenantId) -> bool {
        self.len(tenant) == 0
    }
}
