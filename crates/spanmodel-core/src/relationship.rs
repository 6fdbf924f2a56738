//! Relationship metadata and the foreign-key constraints derived from it.
//!
//! Relationships are static metadata on each model. The migrator only cares
//! about the constraint a relationship implies: which table owns the foreign
//! key columns, and which table they reference.

use crate::field::ReferentialAction;

/// The type of relationship between two models.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RelationshipKind {
    /// Many-to-one: many `Album`s belong to one `Singer`. The declaring
    /// table owns the foreign key.
    #[default]
    ManyToOne,
    /// One-to-one where the declaring table holds the key.
    OneToOne,
    /// One-to-many: one `Singer` has many `Album`s. The related table owns
    /// the foreign key.
    OneToMany,
}

/// Metadata about a relationship between models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationshipInfo {
    /// Name of the relationship field, e.g. `"singer"`. Used for ordering and
    /// for the default constraint name.
    pub name: &'static str,

    /// The related model's table name.
    pub related_table: &'static str,

    pub kind: RelationshipKind,

    /// Foreign key column on the owning table (e.g. `"singer_id"`).
    pub foreign_key: &'static str,

    /// Referenced column on the other table.
    pub references: &'static str,

    /// Overrides the default `fk_<table>_<name>` constraint name.
    pub constraint_name: Option<&'static str>,

    pub on_delete: Option<ReferentialAction>,
    pub on_update: Option<ReferentialAction>,

    /// Relationship exists for loading only; no constraint is created.
    pub no_constraint: bool,
}

impl RelationshipInfo {
    /// Create a new relationship with required fields.
    #[must_use]
    pub const fn new(
        name: &'static str,
        related_table: &'static str,
        kind: RelationshipKind,
        foreign_key: &'static str,
    ) -> Self {
        Self {
            name,
            related_table,
            kind,
            foreign_key,
            references: "id",
            constraint_name: None,
            on_delete: None,
            on_update: None,
            no_constraint: false,
        }
    }

    #[must_use]
    pub const fn references(mut self, column: &'static str) -> Self {
        self.references = column;
        self
    }

    #[must_use]
    pub const fn constraint_name(mut self, name: &'static str) -> Self {
        self.constraint_name = Some(name);
        self
    }

    #[must_use]
    pub const fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = Some(action);
        self
    }

    #[must_use]
    pub const fn on_update(mut self, action: ReferentialAction) -> Self {
        self.on_update = Some(action);
        self
    }

    #[must_use]
    pub const fn no_constraint(mut self) -> Self {
        self.no_constraint = true;
        self
    }

    /// Resolve the foreign-key constraint this relationship implies when
    /// declared on `declaring_table`.
    pub fn constraint(&self, declaring_table: &str) -> Option<ForeignKeyConstraint> {
        if self.no_constraint {
            return None;
        }
        let name = self.constraint_name.map_or_else(
            || format!("fk_{}_{}", declaring_table, self.name),
            str::to_string,
        );
        let (table, ref_table) = match self.kind {
            RelationshipKind::ManyToOne | RelationshipKind::OneToOne => {
                (declaring_table.to_string(), self.related_table.to_string())
            }
            RelationshipKind::OneToMany => {
                (self.related_table.to_string(), declaring_table.to_string())
            }
        };
        Some(ForeignKeyConstraint {
            name,
            table,
            columns: vec![self.foreign_key.to_string()],
            ref_table,
            ref_columns: vec![self.references.to_string()],
            on_delete: self.on_delete,
            on_update: self.on_update,
        })
    }
}

/// A resolved foreign-key constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyConstraint {
    pub name: String,
    /// Table holding the foreign key columns.
    pub table: String,
    pub columns: Vec<String>,
    pub ref_table: String,
    pub ref_columns: Vec<String>,
    pub on_delete: Option<ReferentialAction>,
    pub on_update: Option<ReferentialAction>,
}
