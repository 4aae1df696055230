//! `move_funnel_steps`: copia los steps de cada funnel a `filters.actions`.

use diesel::pg::PgConnection;
use funnel_core::{backfill_filters, BackfillReport};
use log::{info, warn};

use super::DataMigration;
use crate::error::PersistenceError;
use crate::pg::PgFunnelStore;

pub struct MoveFunnelSteps;

impl DataMigration for MoveFunnelSteps {
    fn name(&self) -> &'static str {
        "move_funnel_steps"
    }

    fn schema_version(&self) -> &'static str {
        "20200413193600"
    }

    fn forward(&self, conn: &mut PgConnection) -> Result<BackfillReport, PersistenceError> {
        let mut store = PgFunnelStore::new(conn);
        let report = backfill_filters(&mut store)?;
        info!("move_funnel_steps: funnels={} steps={} changed={}",
              report.funnels,
              report.steps,
              report.changed);
        Ok(report)
    }

    /// No reconstruye filas de `posthog_funnelstep` a partir de `filters`;
    /// el drop de la columna lo hace el `down.sql` del esquema.
    fn backward(&self, _conn: &mut PgConnection) -> Result<(), PersistenceError> {
        warn!("move_funnel_steps: reverse is a no-op, funnel steps are not rebuilt from filters");
        Ok(())
    }
}
