use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::CoreError;
use crate::model::FunnelStep;

/// Tag de tipo de entidad dentro de un filtro (`"actions"` / `"events"`).
///
/// Compartido entre la migración y cualquier lector posterior de
/// `filters`; se serializa en minúsculas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    Actions,
    Events,
}

impl FilterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterType::Actions => "actions",
            FilterType::Events => "events",
        }
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entrada de `filters.actions`: `{id, order, type}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionFilter {
    pub id: i32,
    pub order: i32,
    #[serde(rename = "type")]
    pub filter_type: FilterType,
}

impl ActionFilter {
    fn to_value(self) -> Value {
        json!({ "id": self.id, "order": self.order, "type": self.filter_type.as_str() })
    }
}

impl From<&FunnelStep> for ActionFilter {
    fn from(step: &FunnelStep) -> Self {
        Self { id: step.action_id,
               order: step.order,
               filter_type: FilterType::Actions }
    }
}

/// Forma tipada de `filters` tras el backfill.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunnelFilters {
    pub actions: Vec<ActionFilter>,
}

impl FunnelFilters {
    /// Una entrada por step, en el mismo orden recibido. El llamador es
    /// responsable de entregar los steps ya ordenados.
    pub fn from_steps(steps: &[FunnelStep]) -> Self {
        Self { actions: steps.iter().map(ActionFilter::from).collect() }
    }

    pub fn to_value(&self) -> Value {
        let actions: Vec<Value> = self.actions.iter().map(|a| a.to_value()).collect();
        json!({ "actions": actions })
    }

    /// Interpreta un payload almacenado.
    ///
    /// - `{}` (default de columna, funnel sin backfill) → `Ok(None)`.
    /// - `{"actions": [...]}` → `Ok(Some(..))`.
    /// - Cualquier otra forma, o un `type` desconocido → `InvalidFilters`.
    pub fn from_value(value: &Value) -> Result<Option<Self>, CoreError> {
        if value.as_object().is_some_and(|m| m.is_empty()) {
            return Ok(None);
        }
        serde_json::from_value(value.clone()).map(Some)
                                             .map_err(|e| CoreError::InvalidFilters(e.to_string()))
    }
}
