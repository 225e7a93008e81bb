// Kept in sync by hand with the DDL in `db::mod`.

diesel::table! {
    tasks (id) {
        id -> Text,
        owner_id -> Text,
        description -> Text,
        status -> Text,
        cost -> Double,
        metadata -> Text,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    task_steps (id) {
        id -> Text,
        task_id -> Text,
        step_index -> Integer,
        instruction -> Text,
        agent_type -> Text,
        status -> Text,
        cost -> Double,
    }
}

diesel::table! {
    tool_calls (id) {
        id -> Integer,
        task_id -> Text,
        agent_type -> Text,
        tool_name -> Text,
        arguments -> Text,
        created_at -> Text,
    }
}

diesel::table! {
    short_term_memory (id) {
        id -> Integer,
        task_id -> Text,
        key -> Text,
        value -> Text,
        created_at -> Text,
    }
}

diesel::table! {
    long_term_memory (id) {
        id -> Integer,
        embedding_id -> BigInt,
        content -> Text,
        metadata -> Text,
        created_at -> Text,
    }
}

diesel::joinable!(task_steps -> tasks (task_id));
diesel::joinable!(tool_calls -> tasks (task_id));
diesel::joinable!(short_term_memory -> tasks (task_id));

diesel::allow_tables_to_appear_in_same_query!(
    tasks,
    task_steps,
    tool_calls,
    short_term_memory,
    long_term_memory,
);
