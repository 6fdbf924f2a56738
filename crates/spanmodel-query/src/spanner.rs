//! Spanner replacements for the INSERT and RETURNING clauses.
//!
//! Spanner has no `ON CONFLICT` clause. Upserts are written with an insert
//! modifier instead (`INSERT OR UPDATE`, `INSERT OR IGNORE`), so the INSERT
//! builder reads the statement's ON CONFLICT clause and picks the modifier,
//! and the ON CONFLICT clause itself is never rendered. RETURNING is spelled
//! `THEN RETURN`.

use spanmodel_core::Error;

use crate::clause::{self, Clause};
use crate::statement::{ClauseBuilders, SqlBuilder};

/// Clause order for INSERT statements on Spanner.
pub const CREATE_CLAUSES: &[&str] = &[clause::INSERT, clause::VALUES, clause::RETURNING];

pub const UNSUPPORTED_ON_CONFLICT: &str =
    "spanner only supports UpdateAll or DoNothing for OnConflict clauses";

/// Registry with the Spanner INSERT and RETURNING builders installed.
pub fn clause_builders() -> ClauseBuilders {
    let mut builders = ClauseBuilders::new();
    builders.register(clause::INSERT, build_insert);
    builders.register(clause::RETURNING, build_returning);
    builders
}

/// INSERT with the upsert modifier derived from ON CONFLICT.
pub fn build_insert(c: &Clause, b: &mut SqlBuilder<'_>) {
    let Clause::Insert(insert) = c else {
        c.build(b);
        return;
    };
    let Some(Clause::OnConflict(on_conflict)) = b.clause(clause::ON_CONFLICT) else {
        insert.build(b);
        return;
    };

    if on_conflict.on_constraint.is_some()
        || on_conflict.target_where.is_some()
        || on_conflict.where_clause.is_some()
        || !(on_conflict.update_all || on_conflict.do_nothing)
    {
        b.add_error(Error::unsupported("on conflict", UNSUPPORTED_ON_CONFLICT));
        return;
    }

    let modifier = if on_conflict.update_all {
        "INSERT OR UPDATE"
    } else {
        "INSERT OR IGNORE"
    };
    insert.build_with_modifier(b, modifier);
}

/// `THEN RETURN` followed by the quoted column list, or `*`.
pub fn build_returning(c: &Clause, b: &mut SqlBuilder<'_>) {
    b.write_str("THEN RETURN ");
    match c {
        Clause::Returning(returning) => returning.build_columns(b),
        _ => b.write_char('*'),
    }
}
