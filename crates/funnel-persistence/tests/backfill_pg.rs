
use diesel::prelude::*;
use funnel_core::{backfill_filters, plan_backfill, FunnelStore};
use funnel_persistence::schema::{posthog_funnel, posthog_funnelstep};
use funnel_persistence::{run_pending_migrations, PersistenceError, PgFunnelStore};
use serde_json::{json, Value};
use test_support::{apply_baseline, insert_action, insert_funnel, insert_step, isolated_conn};

fn filters_of(conn: &mut PgConnection, funnel_id: i32) -> Value {
    posthog_funnel::table.find(funnel_id)
                         .select(posthog_funnel::filters)
                         .first(conn)
                         .expect("filters")
}

#[test]
fn migration_backfills_existing_funnels() {
    let Some(mut conn) = isolated_conn("fm_backfill_examples") else { return };
    apply_baseline(&mut conn);
    let a7 = insert_action(&mut conn, "signup");
    let a9 = insert_action(&mut conn, "purchase");
    let f1 = insert_funnel(&mut conn, "F1");
    let f2 = insert_funnel(&mut conn, "F2");
    // orden inverso de inserción para verificar el ORDER BY
    insert_step(&mut conn, f1, a9, 1);
    insert_step(&mut conn, f1, a7, 0);

    let outcome = run_pending_migrations(&mut conn).expect("migrate");
    let report = outcome.data_migrations[0].report;
    assert_eq!((report.funnels, report.steps, report.changed), (2, 2, 2));

    assert_eq!(filters_of(&mut conn, f1),
               json!({"actions": [{"id": a7, "order": 0, "type": "actions"},
                                  {"id": a9, "order": 1, "type": "actions"}]}));
    assert_eq!(filters_of(&mut conn, f2), json!({"actions": []}));
}

#[test]
fn rerunning_the_transform_is_idempotent() {
    let Some(mut conn) = isolated_conn("fm_backfill_idempotent") else { return };
    run_pending_migrations(&mut conn).expect("migrate");
    let action = insert_action(&mut conn, "pageview");
    let funnel = insert_funnel(&mut conn, "F");
    insert_step(&mut conn, funnel, action, 0);
    insert_step(&mut conn, funnel, action, 1);

    let first = backfill_filters(&mut PgFunnelStore::new(&mut conn)).expect("first");
    assert_eq!(first.changed, 1);
    let snapshot = filters_of(&mut conn, funnel);

    let second = backfill_filters(&mut PgFunnelStore::new(&mut conn)).expect("second");
    assert_eq!(second.changed, 0);
    assert_eq!(filters_of(&mut conn, funnel), snapshot);
}

#[test]
fn store_reads_steps_ordered_with_id_tiebreak() {
    let Some(mut conn) = isolated_conn("fm_backfill_ties") else { return };
    run_pending_migrations(&mut conn).expect("migrate");
    let a = insert_action(&mut conn, "a");
    let b = insert_action(&mut conn, "b");
    let funnel = insert_funnel(&mut conn, "F");
    let s1 = insert_step(&mut conn, funnel, a, 3);
    let s2 = insert_step(&mut conn, funnel, b, 3);
    let s0 = insert_step(&mut conn, funnel, b, -1);

    let mut store = PgFunnelStore::new(&mut conn);
    let ids: Vec<i32> = store.steps_for(funnel).expect("steps").iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![s0, s1, s2]);
}

#[test]
fn plan_matches_backfill_and_writes_nothing() {
    let Some(mut conn) = isolated_conn("fm_backfill_plan") else { return };
    run_pending_migrations(&mut conn).expect("migrate");
    let action = insert_action(&mut conn, "x");
    let funnel = insert_funnel(&mut conn, "F");
    insert_step(&mut conn, funnel, action, 0);

    let plan = plan_backfill(&mut PgFunnelStore::new(&mut conn)).expect("plan");
    assert_eq!(plan.report().changed, 1);
    assert_eq!(filters_of(&mut conn, funnel), json!({}));

    backfill_filters(&mut PgFunnelStore::new(&mut conn)).expect("backfill");
    let after = plan_backfill(&mut PgFunnelStore::new(&mut conn)).expect("plan again");
    assert_eq!(after.digest(), plan.digest());
    assert_eq!(after.report().changed, 0);
}

#[test]
fn writing_missing_funnel_is_not_found() {
    let Some(mut conn) = isolated_conn("fm_backfill_missing") else { return };
    run_pending_migrations(&mut conn).expect("migrate");
    let mut store = PgFunnelStore::new(&mut conn);
    let err = store.write_filters(999_999, &json!({"actions": []})).unwrap_err();
    assert!(matches!(err, PersistenceError::NotFound));
}

#[test]
fn failed_migration_leaves_schema_unmigrated() {
    let Some(mut conn) = isolated_conn("fm_backfill_rollback") else { return };
    apply_baseline(&mut conn);
    let action = insert_action(&mut conn, "x");
    let funnel = insert_funnel(&mut conn, "F");
    insert_step(&mut conn, funnel, action, 0);
    // Trigger que rechaza cualquier payload con acciones: hace fallar el
    // backfill después de que el ALTER TABLE ya corrió.
    diesel::sql_query("CREATE FUNCTION reject_filters() RETURNS trigger LANGUAGE plpgsql AS $$ \
                       BEGIN IF NEW.filters ? 'actions' THEN RAISE EXCEPTION 'filters rejected'; END IF; RETURN NEW; END $$")
        .execute(&mut conn)
        .expect("function");
    diesel::sql_query("CREATE TRIGGER reject_filters BEFORE UPDATE ON posthog_funnel \
                       FOR EACH ROW EXECUTE FUNCTION reject_filters()")
        .execute(&mut conn)
        .expect("trigger");

    let err = run_pending_migrations(&mut conn).unwrap_err();
    assert!(matches!(err, PersistenceError::Unknown(_)), "{err:?}");
    assert!(!test_support::column_exists(&mut conn, "posthog_funnel", "filters"));

    let remaining: i64 = posthog_funnelstep::table.count().get_result(&mut conn).expect("count");
    assert_eq!(remaining, 1);
}
