//! Esquema Diesel (escrito a mano). Refleja el estado tras
//! `2020-04-13-193600_funnel_filters`.

diesel::table! {
    posthog_action (id) {
        id -> Integer,
        name -> Nullable<Text>,
        team_id -> Integer,
        deleted -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    posthog_funnel (id) {
        id -> Integer,
        name -> Nullable<Text>,
        team_id -> Integer,
        deleted -> Bool,
        filters -> Jsonb,
    }
}

diesel::table! {
    posthog_funnelstep (id) {
        id -> Integer,
        funnel_id -> Integer,
        action_id -> Integer,
        #[sql_name = "order"]
        step_order -> Integer,
    }
}

diesel::table! {
    __data_migrations (name) {
        name -> Text,
        schema_version -> Text,
        applied_at -> Timestamptz,
    }
}

diesel::joinable!(posthog_funnelstep -> posthog_funnel (funnel_id));
diesel::joinable!(posthog_funnelstep -> posthog_action (action_id));

diesel::allow_tables_to_appear_in_same_query!(
    posthog_action,
    posthog_funnel,
    posthog_funnelstep,
);
