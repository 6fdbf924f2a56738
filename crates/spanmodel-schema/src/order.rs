//! Dependency ordering of table schemas.

use std::collections::HashSet;

use spanmodel_core::TableSchema;

/// Order schemas so that every table comes after the tables its foreign keys
/// reference. Dependencies outside `schemas` are ignored; input order is
/// kept wherever the dependencies allow it. Cycles are broken at the first
/// table revisited.
pub fn reorder_schemas(schemas: &[TableSchema]) -> Vec<&TableSchema> {
    let mut ordered: Vec<&TableSchema> = Vec::with_capacity(schemas.len());
    let mut placed: HashSet<&str> = HashSet::new();
    let mut visiting: HashSet<&str> = HashSet::new();

    fn visit<'a>(
        schema: &'a TableSchema,
        schemas: &'a [TableSchema],
        placed: &mut HashSet<&'a str>,
        visiting: &mut HashSet<&'a str>,
        ordered: &mut Vec<&'a TableSchema>,
    ) {
        if placed.contains(schema.table) || !visiting.insert(schema.table) {
            return;
        }
        for dep in schema.dependencies() {
            if let Some(dep_schema) = schemas.iter().find(|s| s.table == dep) {
                visit(dep_schema, schemas, placed, visiting, ordered);
            }
        }
        visiting.remove(schema.table);
        if placed.insert(schema.table) {
            ordered.push(schema);
        }
    }

    for schema in schemas {
        visit(schema, schemas, &mut placed, &mut visiting, &mut ordered);
    }
    tracing::trace!(
        order = ?ordered.iter().map(|s| s.table).collect::<Vec<_>>(),
        "Reordered schemas"
    );
    ordered
}
