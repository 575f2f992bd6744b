diesel::table! {
    accounts (id) {
        id -> Uuid,
        username -> Text,
        email -> Text,
        first_name -> Text,
        last_name -> Text,
        password_hash -> Text,
        is_active -> Bool,
        date_joined -> Timestamptz,
        last_login -> Nullable<Timestamptz>,
        biography -> Text,
        institution -> Text,
    }
}

diesel::table! {
    datasets (id) {
        id -> Uuid,
        name -> Text,
        description -> Text,
        owner_id -> Uuid,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    analyses (id) {
        id -> Uuid,
        name -> Text,
        description -> Text,
        dataset_id -> Uuid,
        owner_id -> Uuid,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    visualizations (id) {
        id -> Uuid,
        name -> Text,
        description -> Text,
        visualization_type -> Text,
        dataset_id -> Uuid,
        owner_id -> Uuid,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(datasets -> accounts (owner_id));
diesel::joinable!(analyses -> datasets (dataset_id));
diesel::joinable!(visualizations -> datasets (dataset_id));

diesel::allow_tables_to_appear_in_same_query!(accounts, datasets, analyses, visualizations,);
