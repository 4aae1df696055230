//! Backfill de `funnel.filters` a partir de `funnel.steps`.
//!
//! Por cada funnel (id ascendente): una lectura de steps, construcción de
//! `{"actions": [{id, order, type: "actions"}, ...]}` y una escritura. El
//! resultado sólo depende de los steps actuales, por lo que repetir la corrida
//! sin cambios intermedios produce exactamente el mismo contenido.
//!
//! El módulo no maneja transacciones: un error del store se propaga tal cual
//! y el llamador (runner de migraciones) decide el rollback.

use log::debug;
use serde_json::{json, Value};

use crate::filters::FunnelFilters;
use crate::hashing::{hash_str, to_canonical_json};
use crate::store::FunnelStore;

/// Resumen de una corrida (o de un plan).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillReport {
    /// Funnels visitados.
    pub funnels: usize,
    /// Steps leídos en total.
    pub steps: usize,
    /// Funnels cuyo payload almacenado difería del recalculado.
    pub changed: usize,
}

/// Filtros calculados para un funnel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFilters {
    pub funnel_id: i32,
    pub filters: FunnelFilters,
    pub changed: bool,
}

/// Resultado de `plan_backfill`: lo que el backfill escribiría.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackfillPlan {
    pub entries: Vec<PlannedFilters>,
}

impl BackfillPlan {
    pub fn report(&self) -> BackfillReport {
        BackfillReport { funnels: self.entries.len(),
                         steps: self.entries.iter().map(|e| e.filters.actions.len()).sum(),
                         changed: self.entries.iter().filter(|e| e.changed).count() }
    }

    /// Digest blake3 del JSON canónico del plan completo; dos planes con el
    /// mismo contenido tienen el mismo digest sin importar el backend.
    pub fn digest(&self) -> String {
        let doc: Vec<Value> = self.entries
                                  .iter()
                                  .map(|e| json!({ "funnel_id": e.funnel_id, "filters": e.filters.to_value() }))
                                  .collect();
        hash_str(&to_canonical_json(&Value::Array(doc)))
    }
}

fn compute_entry<S: FunnelStore>(store: &mut S, funnel_id: i32) -> Result<PlannedFilters, S::Error> {
    let steps = store.steps_for(funnel_id)?;
    let filters = FunnelFilters::from_steps(&steps);
    let current = store.filters_for(funnel_id)?;
    let changed = to_canonical_json(&current) != to_canonical_json(&filters.to_value());
    Ok(PlannedFilters { funnel_id, filters, changed })
}

/// Calcula los filtros sin escribir nada.
pub fn plan_backfill<S: FunnelStore>(store: &mut S) -> Result<BackfillPlan, S::Error> {
    let ids = store.funnel_ids()?;
    let mut entries = Vec::with_capacity(ids.len());
    for funnel_id in ids {
        entries.push(compute_entry(store, funnel_id)?);
    }
    Ok(BackfillPlan { entries })
}

/// Recalcula y escribe `filters` para todos los funnels existentes.
///
/// Escribe siempre (una vez por funnel), aunque el contenido no cambie.
pub fn backfill_filters<S: FunnelStore>(store: &mut S) -> Result<BackfillReport, S::Error> {
    let ids = store.funnel_ids()?;
    debug!("backfill:start funnels={}", ids.len());
    let mut report = BackfillReport::default();
    for funnel_id in ids {
        let entry = compute_entry(store, funnel_id)?;
        store.write_filters(funnel_id, &entry.filters.to_value())?;
        debug!("backfill:funnel funnel_id={funnel_id} actions={} changed={}",
               entry.filters.actions.len(),
               entry.changed);
        report.funnels += 1;
        report.steps += entry.filters.actions.len();
        if entry.changed {
            report.changed += 1;
        }
    }
    debug!("backfill:done funnels={} steps={} changed={}", report.funnels, report.steps, report.changed);
    Ok(report)
}
