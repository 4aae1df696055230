use std::collections::BTreeMap;

use serde_json::{json, Value};

use super::FunnelStore;
use crate::errors::CoreError;
use crate::model::{sort_steps, FunnelStep};

/// Backend en memoria; misma semántica de orden que la implementación
/// Postgres. Un funnel nuevo arranca con `{}` (default de la columna).
#[derive(Debug, Default, Clone)]
pub struct InMemoryFunnelStore {
    funnels: BTreeMap<i32, Value>,
    steps: Vec<FunnelStep>,
    writes: usize,
}

impl InMemoryFunnelStore {
    pub fn insert_funnel(&mut self, funnel_id: i32) {
        self.funnels.insert(funnel_id, json!({}));
    }

    pub fn insert_step(&mut self, step: FunnelStep) {
        self.steps.push(step);
    }

    /// Elimina un step (simula cambios entre corridas).
    pub fn remove_step(&mut self, step_id: i32) {
        self.steps.retain(|s| s.id != step_id);
    }

    pub fn filters(&self, funnel_id: i32) -> Option<&Value> {
        self.funnels.get(&funnel_id)
    }

    /// Cantidad de escrituras realizadas (una por funnel por corrida).
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl FunnelStore for InMemoryFunnelStore {
    type Error = CoreError;

    fn funnel_ids(&mut self) -> Result<Vec<i32>, CoreError> {
        Ok(self.funnels.keys().copied().collect())
    }

    fn steps_for(&mut self, funnel_id: i32) -> Result<Vec<FunnelStep>, CoreError> {
        let mut steps: Vec<FunnelStep> = self.steps.iter().filter(|s| s.funnel_id == funnel_id).copied().collect();
        sort_steps(&mut steps);
        Ok(steps)
    }

    fn filters_for(&mut self, funnel_id: i32) -> Result<Value, CoreError> {
        self.funnels.get(&funnel_id).cloned().ok_or(CoreError::FunnelNotFound(funnel_id))
    }

    fn write_filters(&mut self, funnel_id: i32, filters: &Value) -> Result<(), CoreError> {
        let slot = self.funnels.get_mut(&funnel_id).ok_or(CoreError::FunnelNotFound(funnel_id))?;
        *slot = filters.clone();
        self.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_are_scoped_and_ordered() {
        let mut store = InMemoryFunnelStore::default();
        store.insert_funnel(1);
        store.insert_funnel(2);
        store.insert_step(FunnelStep { id: 1, funnel_id: 1, action_id: 5, order: 2 });
        store.insert_step(FunnelStep { id: 2, funnel_id: 2, action_id: 6, order: 0 });
        store.insert_step(FunnelStep { id: 3, funnel_id: 1, action_id: 7, order: 1 });

        let steps = store.steps_for(1).unwrap();
        assert_eq!(steps.iter().map(|s| s.action_id).collect::<Vec<_>>(), vec![7, 5]);
    }

    #[test]
    fn write_to_unknown_funnel_fails() {
        let mut store = InMemoryFunnelStore::default();
        let err = store.write_filters(42, &json!({"actions": []})).unwrap_err();
        assert_eq!(err, CoreError::FunnelNotFound(42));
        assert_eq!(store.writes(), 0);
    }
}
