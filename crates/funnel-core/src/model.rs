//! Shape de registros fijada a la migración `funnel_filters`.
//!
//! No refleja el modelo "vivo" de la aplicación: sólo las columnas de
//! `posthog_funnelstep` que el backfill lee en esa versión del esquema.

use serde::{Deserialize, Serialize};

/// Step de un funnel: referencia a una acción con posición explícita.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunnelStep {
    pub id: i32,
    pub funnel_id: i32,
    pub action_id: i32,
    pub order: i32,
}

/// Ordena steps por `order` ascendente; empates por `id` para que el
/// resultado sea determinista entre backends.
pub fn sort_steps(steps: &mut [FunnelStep]) {
    steps.sort_by_key(|s| (s.order, s.id));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_uses_id_as_tiebreak() {
        let mut steps = vec![FunnelStep { id: 5, funnel_id: 1, action_id: 1, order: 1 },
                             FunnelStep { id: 3, funnel_id: 1, action_id: 2, order: 1 },
                             FunnelStep { id: 9, funnel_id: 1, action_id: 3, order: 0 }];
        sort_steps(&mut steps);
        let ids: Vec<i32> = steps.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![9, 3, 5]);
    }
}
