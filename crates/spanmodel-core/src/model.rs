//! Model trait and the table schema derived from it.
//!
//! `TableSchema` is the reflected form of a model that the query builders and
//! the migrator consume. It can be produced from a [`Model`] implementation or
//! assembled by hand, which is convenient for one-off migrations such as
//! adding a single index.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::field::FieldInfo;
use crate::relationship::{ForeignKeyConstraint, RelationshipInfo};
use crate::row::Row;
use crate::value::Value;

/// A table-backed type.
pub trait Model: Sized + Send + Sync {
    /// The table name in the database.
    const TABLE_NAME: &'static str;

    fn fields() -> Vec<FieldInfo>;

    fn relationships() -> Vec<RelationshipInfo> {
        Vec::new()
    }

    fn checks() -> Vec<CheckConstraint> {
        Vec::new()
    }

    /// Trailing table options, e.g. `INTERLEAVE IN PARENT singers ON DELETE CASCADE`.
    fn table_options() -> Option<&'static str> {
        None
    }

    /// Column name / value pairs for every stored field.
    fn to_row(&self) -> Vec<(&'static str, Value)>;

    fn from_row(row: &Row) -> Result<Self>;

    fn schema() -> TableSchema {
        let mut schema = TableSchema::new(Self::TABLE_NAME, Self::fields());
        schema.relationships = Self::relationships();
        schema.checks = Self::checks();
        schema.table_options = Self::table_options();
        schema
    }

    /// Values of the primary key columns, in declaration order.
    fn primary_key_value(&self) -> Vec<Value> {
        let pk: Vec<&'static str> = Self::fields()
            .iter()
            .filter(|f| f.primary_key)
            .map(|f| f.column_name)
            .collect();
        self.to_row()
            .into_iter()
            .filter(|(col, _)| pk.contains(col))
            .map(|(_, v)| v)
            .collect()
    }
}

/// Named CHECK constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckConstraint {
    pub name: &'static str,
    /// Boolean SQL expression, without surrounding parentheses.
    pub expression: &'static str,
}

impl CheckConstraint {
    pub const fn new(name: &'static str, expression: &'static str) -> Self {
        Self { name, expression }
    }
}

/// Single-column UNIQUE constraint declared with `unique`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueConstraint {
    pub name: String,
    pub column: &'static str,
}

/// An index parsed from field annotations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexInfo {
    pub name: String,
    pub unique: bool,
    /// Columns in field declaration order.
    pub columns: Vec<&'static str>,
}

/// Constraint lookup result; see [`TableSchema::lookup_constraint`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    ForeignKey(ForeignKeyConstraint),
    Check(CheckConstraint),
    Unique(UniqueConstraint),
}

impl Constraint {
    pub fn name(&self) -> &str {
        match self {
            Constraint::ForeignKey(fk) => &fk.name,
            Constraint::Check(c) => c.name,
            Constraint::Unique(u) => &u.name,
        }
    }

    /// Table the constraint lives on, when known from the constraint itself.
    pub fn table(&self) -> Option<&str> {
        match self {
            Constraint::ForeignKey(fk) => Some(&fk.table),
            _ => None,
        }
    }
}

/// Reflected schema of one table.
#[derive(Debug, Clone)]
pub struct TableSchema {
    pub table: &'static str,
    pub fields: Vec<FieldInfo>,
    pub relationships: Vec<RelationshipInfo>,
    pub checks: Vec<CheckConstraint>,
    pub table_options: Option<&'static str>,
}

impl TableSchema {
    pub fn new(table: &'static str, fields: Vec<FieldInfo>) -> Self {
        Self {
            table,
            fields,
            relationships: Vec::new(),
            checks: Vec::new(),
            table_options: None,
        }
    }

    /// Schema of a model type.
    pub fn of<M: Model>() -> Self {
        M::schema()
    }

    pub fn relationship(mut self, rel: RelationshipInfo) -> Self {
        self.relationships.push(rel);
        self
    }

    pub fn check(mut self, check: CheckConstraint) -> Self {
        self.checks.push(check);
        self
    }

    pub fn table_options(mut self, options: &'static str) -> Self {
        self.table_options = Some(options);
        self
    }

    /// Fields that take part in migrations.
    pub fn migratable_fields(&self) -> impl Iterator<Item = &FieldInfo> {
        self.fields.iter().filter(|f| !f.ignore_migration)
    }

    pub fn primary_fields(&self) -> impl Iterator<Item = &FieldInfo> {
        self.fields.iter().filter(|f| f.primary_key)
    }

    pub fn primary_key_columns(&self) -> Vec<&'static str> {
        self.primary_fields().map(|f| f.column_name).collect()
    }

    /// Look up a field by Rust name or column name.
    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .or_else(|| self.fields.iter().find(|f| f.column_name == name))
    }

    /// Indexes declared on fields, keyed (and therefore sorted) by name.
    ///
    /// Fields sharing an index name form a composite index in declaration
    /// order. Unnamed indexes are called `idx_<table>_<column>`.
    pub fn parse_indexes(&self) -> BTreeMap<String, IndexInfo> {
        let mut indexes: BTreeMap<String, IndexInfo> = BTreeMap::new();
        for field in self.migratable_fields() {
            let declared = [(field.index, false), (field.unique_index, true)];
            for (name, unique) in declared {
                let Some(name) = name else { continue };
                let name = if name.is_empty() {
                    format!("idx_{}_{}", self.table, field.column_name)
                } else {
                    name.to_string()
                };
                let entry = indexes.entry(name.clone()).or_insert_with(|| IndexInfo {
                    name,
                    unique,
                    columns: Vec::new(),
                });
                entry.unique |= unique;
                entry.columns.push(field.column_name);
            }
        }
        indexes
    }

    /// Unique constraints declared with `unique`, keyed by constraint name.
    pub fn unique_constraints(&self) -> BTreeMap<String, UniqueConstraint> {
        self.migratable_fields()
            .filter(|f| f.unique && !f.primary_key)
            .map(|f| {
                let name = format!("uni_{}_{}", self.table, f.column_name);
                (
                    name.clone(),
                    UniqueConstraint {
                        name,
                        column: f.column_name,
                    },
                )
            })
            .collect()
    }

    /// Foreign keys implied by this schema's relationships, ordered by
    /// relationship name.
    pub fn foreign_keys(&self) -> Vec<ForeignKeyConstraint> {
        let mut rels: Vec<&RelationshipInfo> = self.relationships.iter().collect();
        rels.sort_by(|a, b| a.name.cmp(b.name));
        rels.into_iter()
            .filter_map(|rel| rel.constraint(self.table))
            .collect()
    }

    /// Foreign keys whose columns live on this table.
    pub fn owned_foreign_keys(&self) -> Vec<ForeignKeyConstraint> {
        self.foreign_keys()
            .into_iter()
            .filter(|fk| fk.table == self.table)
            .collect()
    }

    /// Check constraints keyed by name.
    pub fn parse_checks(&self) -> BTreeMap<&'static str, CheckConstraint> {
        self.checks.iter().map(|c| (c.name, c.clone())).collect()
    }

    /// Find an index by index name, or by the name of a field that carries one.
    pub fn lookup_index(&self, name: &str) -> Option<IndexInfo> {
        let indexes = self.parse_indexes();
        if let Some(idx) = indexes.get(name) {
            return Some(idx.clone());
        }
        let field = self.field(name)?;
        indexes
            .into_values()
            .find(|idx| idx.columns.contains(&field.column_name))
    }

    /// Find a named constraint of any kind. A field name resolves to the
    /// field's unique constraint.
    pub fn lookup_constraint(&self, name: &str) -> Option<Constraint> {
        if let Some(check) = self.checks.iter().find(|c| c.name == name) {
            return Some(Constraint::Check(check.clone()));
        }
        if let Some(fk) = self.foreign_keys().into_iter().find(|fk| fk.name == name) {
            return Some(Constraint::ForeignKey(fk));
        }
        let uniques = self.unique_constraints();
        if let Some(u) = uniques.get(name) {
            return Some(Constraint::Unique(u.clone()));
        }
        let field = self.field(name)?;
        uniques
            .into_values()
            .find(|u| u.column == field.column_name)
            .map(Constraint::Unique)
    }

    /// Tables this schema must be created after.
    pub fn dependencies(&self) -> Vec<String> {
        let mut deps: Vec<String> = self
            .owned_foreign_keys()
            .into_iter()
            .map(|fk| fk.ref_table)
            .filter(|t| t != self.table)
            .collect();
        deps.dedup();
        deps
    }
}
