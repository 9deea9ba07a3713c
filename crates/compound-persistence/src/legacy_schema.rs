// Diesel schema for the previous (v3) SQLite store, opened read-only
// during schema migration. La solución guarda el diccionario de
// cantidades como JSON en la columna `amounts` y el conjunto de
// compuestos en la tabla de unión `solution_compounds`.
//
// Las columnas de atributos son anulables a propósito: las lecturas
// primitivas llegan como `Option` y el motor de migración decide qué
// ausencias son fatales.
use diesel::allow_tables_to_appear_in_same_query;
diesel::table! {
    compounds (cid) {
        cid -> Text,
        name -> Nullable<Text>,
        formula -> Nullable<Text>,
        molecular_weight -> Nullable<Double>,
        name_iupac -> Nullable<Text>,
        image -> Nullable<Binary>,
        created_at_ts -> Nullable<BigInt>,
    }
}
diesel::table! {
    solutions (id) {
        id -> Text,
        name -> Nullable<Text>,
        created_at_ts -> Nullable<BigInt>,
        amounts -> Nullable<Text>,
    }
}
diesel::table! {
    solution_compounds (id) {
        id -> Text,
        solution_id -> Text,
        compound_cid -> Text,
    }
}
allow_tables_to_appear_in_same_query!(compounds, solutions, solution_compounds);
