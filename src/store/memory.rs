use super::{PipelineRecord, PipelineStore, PutCondition};
use crate::error::StoreError;
use ahash::AHashMap;
use parking_lot::RwLock;

#[derive(Default)]
struct Records {
    by_id: AHashMap<String, PipelineRecord>,
    // name -> id
    names: AHashMap<String, String>,
    // workflow name -> id
    workflows: AHashMap<String, String>,
}

impl Records {
    fn unindex(&mut self, record: &PipelineRecord) {
        self.names.remove(&record.name);
        if let Some(workflow) = &record.workflow_name {
            self.workflows.remove(workflow);
        }
    }
}

/// Process-local record store. Conditional writes are atomic under one lock.
#[derive(Default)]
pub struct InMemoryPipelineStore {
    inner: RwLock<Records>,
}

impl InMemoryPipelineStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PipelineStore for InMemoryPipelineStore {
    fn get_by_id(&self, id: &str) -> Result<Option<PipelineRecord>, StoreError> {
        Ok(self.inner.read().by_id.get(id).cloned())
    }

    fn get_by_name(&self, name: &str) -> Result<Option<PipelineRecord>, StoreError> {
        let inner = self.inner.read();
        Ok(inner
            .names
            .get(name)
            .and_then(|id| inner.by_id.get(id))
            .cloned())
    }

    fn put(&self, record: &PipelineRecord, condition: PutCondition) -> Result<(), StoreError> {
        let mut guard = self.inner.write();
        let inner = &mut *guard;

        let foreign = |owner: Option<&String>| owner.is_some_and(|id| *id != record.id);
        if condition == PutCondition::IfNotExists && inner.by_id.contains_key(&record.id) {
            return Err(StoreError::Conflict(record.id.clone()));
        }
        if foreign(inner.names.get(&record.name)) {
            return Err(StoreError::Conflict(record.name.clone()));
        }
        if let Some(workflow) = &record.workflow_name {
            if foreign(inner.workflows.get(workflow)) {
                return Err(StoreError::Conflict(workflow.clone()));
            }
        }

        if let Some(previous) = inner.by_id.insert(record.id.clone(), record.clone()) {
            inner.unindex(&previous);
        }
        inner.names.insert(record.name.clone(), record.id.clone());
        if let Some(workflow) = &record.workflow_name {
            inner.workflows.insert(workflow.clone(), record.id.clone());
        }
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut guard = self.inner.write();
        let inner = &mut *guard;
        let record = inner
            .by_id
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        inner.unindex(&record);
        Ok(())
    }
}
