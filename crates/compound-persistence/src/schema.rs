// Diesel schema for the current (v4) SQLite store.
// Tablas: compounds, solutions, solution_ingredients, solution_compounds,
// compound_tags, compound_tag_members, store_meta
use diesel::allow_tables_to_appear_in_same_query;
diesel::table! {
    compounds (cid) {
        cid -> Text,
        name -> Text,
        formula -> Text,
        molecular_weight -> Double,
        name_iupac -> Text,
        image -> Nullable<Binary>,
        created_at_ts -> BigInt,
    }
}
diesel::table! {
    solutions (id) {
        id -> Text,
        name -> Text,
        created_at_ts -> BigInt,
    }
}
diesel::table! {
    solution_ingredients (id) {
        id -> Text,
        solution_id -> Text,
        compound_ref -> Nullable<Text>,
        compound_name -> Text,
        compound_cid -> Text,
        amount -> Double,
        unit -> Text,
    }
}
diesel::table! {
    solution_compounds (id) {
        id -> Text,
        solution_id -> Text,
        compound_cid -> Text,
    }
}
diesel::table! {
    compound_tags (name) {
        name -> Text,
        compound_count -> BigInt,
    }
}
diesel::table! {
    compound_tag_members (id) {
        id -> Text,
        tag_name -> Text,
        compound_cid -> Text,
    }
}
diesel::table! {
    store_meta (key) {
        key -> Text,
        value -> Text,
    }
}
allow_tables_to_appear_in_same_query!(compounds,
                                      solutions,
                                      solution_ingredients,
                                      solution_compounds,
                                      compound_tags,
                                      compound_tag_members,
                                      store_meta);
