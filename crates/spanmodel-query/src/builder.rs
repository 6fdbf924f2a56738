//! Query builders for INSERT, UPDATE, DELETE and SELECT operations.
//!
//! Builders assemble a [`Statement`] from a model and render it through a
//! [`BuildContext`], which carries the dialect and its clause builders. On
//! Spanner that means:
//! - RETURNING is rendered as `THEN RETURN`
//! - upserts use `INSERT OR UPDATE` / `INSERT OR IGNORE`
//! - UPDATE never writes primary key columns
//! - SELECT can carry index hints

use std::marker::PhantomData;

use asupersync::{Cx, Outcome};
use spanmodel_core::{Connection, Error, FieldInfo, Model, Row, Value};

use crate::clause::{
    Assignment, Clause, DELETE_CLAUSES, Expr, FromTable, Insert, OnConflict, QUERY_CLAUSES,
    Returning, UPDATE_CLAUSES, Values, Where,
};
use crate::dialect::Dialect;
use crate::hints::IndexHint;
use crate::statement::{BuiltStatement, ClauseBuilders, Statement};

/// Everything needed to render a statement for one database.
#[derive(Clone, Copy)]
pub struct BuildContext<'a> {
    pub dialect: &'a dyn Dialect,
    pub builders: &'a ClauseBuilders,
    /// Clause order used for INSERT statements.
    pub create_clauses: &'a [&'a str],
}

impl std::fmt::Debug for BuildContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildContext")
            .field("dialect", &self.dialect.name())
            .field("builders", self.builders)
            .field("create_clauses", &self.create_clauses)
            .finish()
    }
}

fn pk_filter<M: Model>(model: &M, fields: &[FieldInfo]) -> Option<Where> {
    let pk_columns: Vec<&'static str> = fields
        .iter()
        .filter(|f| f.primary_key)
        .map(|f| f.column_name)
        .collect();
    let mut exprs = pk_columns
        .into_iter()
        .zip(model.primary_key_value())
        .map(|(col, value)| Expr::eq(col, value));
    let first = exprs.next()?;
    Some(exprs.fold(Where::new(first), Where::and))
}

fn merge_filter(existing: Option<Where>, expr: Expr) -> Option<Where> {
    Some(match existing {
        Some(w) => w.and(expr),
        None => Where::new(expr),
    })
}

/// Value written for an auto-increment key a row leaves unset.
const DEFAULT_EXPR: &str = "DEFAULT";

/// INSERT query builder.
///
/// # Example
///
/// ```ignore
/// let rows = InsertBuilder::new(&singer)
///     .returning()
///     .execute_returning(cx, &conn, ctx)
///     .await;
///
/// // Upsert
/// InsertBuilder::new(&singer)
///     .on_conflict(OnConflict::update_all())
///     .execute(cx, &conn, ctx)
///     .await;
/// ```
#[derive(Debug)]
pub struct InsertBuilder<'a, M: Model> {
    models: &'a [M],
    returning: Option<Returning>,
    on_conflict: Option<OnConflict>,
}

impl<'a, M: Model> InsertBuilder<'a, M> {
    /// Create a new INSERT builder for the given model instance.
    pub fn new(model: &'a M) -> Self {
        Self::many(std::slice::from_ref(model))
    }

    /// Insert several rows with one statement.
    pub fn many(models: &'a [M]) -> Self {
        Self {
            models,
            returning: None,
            on_conflict: None,
        }
    }

    /// Return every column of the inserted rows.
    pub fn returning(mut self) -> Self {
        self.returning = Some(Returning::all());
        self
    }

    pub fn returning_columns(mut self, columns: &[&str]) -> Self {
        self.returning = Some(Returning::columns(columns));
        self
    }

    pub fn on_conflict(mut self, on_conflict: OnConflict) -> Self {
        self.on_conflict = Some(on_conflict);
        self
    }

    pub fn statement(&self) -> Statement {
        let fields = M::fields();
        let rows: Vec<Vec<(&'static str, Value)>> = self.models.iter().map(Model::to_row).collect();

        let field_of = |column: &str| fields.iter().find(|f| f.column_name == column);
        let auto_increment = |column: &str| field_of(column).is_some_and(|f| f.auto_increment);

        // Auto-increment columns left unset are filled in by the database.
        // The column is dropped when no row sets it; otherwise rows that leave
        // it unset write DEFAULT.
        let keep = |column: &str| -> bool {
            let Some(field) = field_of(column) else {
                return true;
            };
            if field.read_only {
                return false;
            }
            if field.auto_increment {
                return rows.iter().any(|row| {
                    row.iter()
                        .any(|(c, v)| *c == column && !v.is_zero())
                });
            }
            true
        };

        let columns: Vec<&'static str> = rows
            .first()
            .map(|row| row.iter().map(|(c, _)| *c).filter(|c| keep(c)).collect())
            .unwrap_or_default();

        let values = rows
            .iter()
            .map(|row| {
                row.iter()
                    .filter(|(c, _)| columns.contains(c))
                    .map(|(c, v)| {
                        if v.is_zero() && auto_increment(c) {
                            Value::Expr(DEFAULT_EXPR.to_string())
                        } else {
                            v.clone()
                        }
                    })
                    .collect()
            })
            .collect();

        let mut stmt = Statement::new(M::TABLE_NAME)
            .with_clause(Clause::Insert(Insert::default()))
            .with_clause(Clause::Values(Values {
                columns: columns.iter().map(|c| (*c).to_string()).collect(),
                rows: values,
            }));
        if let Some(on_conflict) = &self.on_conflict {
            stmt.add_clause(Clause::OnConflict(on_conflict.clone()));
        }
        if let Some(returning) = &self.returning {
            stmt.add_clause(Clause::Returning(returning.clone()));
        }
        stmt
    }

    pub fn build(&self, ctx: BuildContext<'_>) -> Result<BuiltStatement, Error> {
        self.statement()
            .build(ctx.dialect, ctx.builders, ctx.create_clauses)
    }

    /// Execute the INSERT and return the number of rows written.
    pub async fn execute<C: Connection>(
        self,
        cx: &Cx,
        conn: &C,
        ctx: BuildContext<'_>,
    ) -> Outcome<u64, Error> {
        let built = match self.build(ctx) {
            Ok(built) => built,
            Err(e) => return Outcome::Err(e),
        };
        conn.execute(cx, &built.sql, &built.vars).await
    }

    /// Execute the INSERT and return the rows produced by THEN RETURN.
    pub async fn execute_returning<C: Connection>(
        mut self,
        cx: &Cx,
        conn: &C,
        ctx: BuildContext<'_>,
    ) -> Outcome<Vec<Row>, Error> {
        if self.returning.is_none() {
            self.returning = Some(Returning::all());
        }
        let built = match self.build(ctx) {
            Ok(built) => built,
            Err(e) => return Outcome::Err(e),
        };
        conn.query(cx, &built.sql, &built.vars).await
    }
}

/// UPDATE query builder.
///
/// Primary key columns are never written, whether they come from the model
/// or from an explicit [`UpdateBuilder::set`].
#[derive(Debug)]
pub struct UpdateBuilder<'a, M: Model> {
    model: Option<&'a M>,
    explicit_sets: Vec<Assignment>,
    set_fields: Option<Vec<&'static str>>,
    where_clause: Option<Where>,
    returning: Option<Returning>,
}

impl<'a, M: Model> UpdateBuilder<'a, M> {
    /// Update the stored row of `model`, matched by primary key.
    pub fn new(model: &'a M) -> Self {
        Self {
            model: Some(model),
            explicit_sets: Vec::new(),
            set_fields: None,
            where_clause: None,
            returning: None,
        }
    }

    /// An update with only explicit SET values; requires a filter.
    pub fn empty() -> Self {
        Self {
            model: None,
            explicit_sets: Vec::new(),
            set_fields: None,
            where_clause: None,
            returning: None,
        }
    }

    pub fn set<V: Into<Value>>(mut self, column: &str, value: V) -> Self {
        self.explicit_sets.push(Assignment::new(column, value));
        self
    }

    /// Only write these model columns.
    pub fn set_only(mut self, fields: &[&'static str]) -> Self {
        self.set_fields = Some(fields.to_vec());
        self
    }

    pub fn filter(mut self, expr: Expr) -> Self {
        self.where_clause = merge_filter(self.where_clause.take(), expr);
        self
    }

    pub fn returning(mut self) -> Self {
        self.returning = Some(Returning::all());
        self
    }

    /// `None` when there is nothing to write.
    pub fn statement(&self) -> Option<Statement> {
        let fields = M::fields();
        let is_pk = |column: &str| fields.iter().any(|f| f.primary_key && f.column_name == column);
        let is_read_only =
            |column: &str| fields.iter().any(|f| f.read_only && f.column_name == column);

        let mut assignments: Vec<Assignment> = self
            .explicit_sets
            .iter()
            .filter(|a| !is_pk(&a.column))
            .cloned()
            .collect();

        if let Some(model) = self.model {
            for (column, value) in model.to_row() {
                if is_pk(column) || is_read_only(column) {
                    continue;
                }
                if self.explicit_sets.iter().any(|a| a.column == column) {
                    continue;
                }
                if let Some(only) = &self.set_fields {
                    if !only.contains(&column) {
                        continue;
                    }
                }
                assignments.push(Assignment::new(column, value));
            }
        }

        if assignments.is_empty() {
            return None;
        }

        let filter = match (&self.where_clause, self.model) {
            (Some(w), _) => Some(w.clone()),
            (None, Some(model)) => pk_filter(model, &fields),
            (None, None) => None,
        };

        let mut stmt = Statement::new(M::TABLE_NAME)
            .with_clause(Clause::Update(None))
            .with_clause(Clause::Set(assignments));
        if let Some(filter) = filter {
            stmt.add_clause(Clause::Where(filter));
        }
        if let Some(returning) = &self.returning {
            stmt.add_clause(Clause::Returning(returning.clone()));
        }
        Some(stmt)
    }

    pub fn build(&self, ctx: BuildContext<'_>) -> Result<Option<BuiltStatement>, Error> {
        self.statement()
            .map(|stmt| stmt.build(ctx.dialect, ctx.builders, UPDATE_CLAUSES))
            .transpose()
    }

    /// Execute the UPDATE and return rows affected.
    pub async fn execute<C: Connection>(
        self,
        cx: &Cx,
        conn: &C,
        ctx: BuildContext<'_>,
    ) -> Outcome<u64, Error> {
        match self.build(ctx) {
            Ok(Some(built)) => conn.execute(cx, &built.sql, &built.vars).await,
            Ok(None) => Outcome::Ok(0),
            Err(e) => Outcome::Err(e),
        }
    }
}

/// DELETE query builder.
#[derive(Debug)]
pub struct DeleteBuilder<'a, M: Model> {
    model: Option<&'a M>,
    where_clause: Option<Where>,
    returning: Option<Returning>,
}

impl<'a, M: Model> DeleteBuilder<'a, M> {
    /// Create a new DELETE builder for the model type.
    pub fn new() -> Self {
        Self {
            model: None,
            where_clause: None,
            returning: None,
        }
    }

    /// Delete the stored row of `model`, matched by primary key.
    pub fn from_model(model: &'a M) -> Self {
        Self {
            model: Some(model),
            ..Self::new()
        }
    }

    pub fn filter(mut self, expr: Expr) -> Self {
        self.where_clause = merge_filter(self.where_clause.take(), expr);
        self
    }

    pub fn returning(mut self) -> Self {
        self.returning = Some(Returning::all());
        self
    }

    pub fn statement(&self) -> Statement {
        let filter = match (&self.where_clause, self.model) {
            (Some(w), _) => Some(w.clone()),
            (None, Some(model)) => pk_filter(model, &M::fields()),
            // Spanner rejects DELETE without WHERE; delete everything explicitly.
            (None, None) => Some(Where::new(Expr::raw("true", vec![]))),
        };
        let mut stmt = Statement::new(M::TABLE_NAME)
            .with_clause(Clause::Delete)
            .with_clause(Clause::From(FromTable::default()));
        if let Some(filter) = filter {
            stmt.add_clause(Clause::Where(filter));
        }
        if let Some(returning) = &self.returning {
            stmt.add_clause(Clause::Returning(returning.clone()));
        }
        stmt
    }

    pub fn build(&self, ctx: BuildContext<'_>) -> Result<BuiltStatement, Error> {
        self.statement()
            .build(ctx.dialect, ctx.builders, DELETE_CLAUSES)
    }

    /// Execute the DELETE and return rows affected.
    pub async fn execute<C: Connection>(
        self,
        cx: &Cx,
        conn: &C,
        ctx: BuildContext<'_>,
    ) -> Outcome<u64, Error> {
        let built = match self.build(ctx) {
            Ok(built) => built,
            Err(e) => return Outcome::Err(e),
        };
        conn.execute(cx, &built.sql, &built.vars).await
    }
}

impl<M: Model> Default for DeleteBuilder<'_, M> {
    fn default() -> Self {
        Self::new()
    }
}

/// SELECT query builder.
///
/// ```ignore
/// let singers = SelectBuilder::<Singer>::new()
///     .filter(Expr::eq("last_name", "Trentor"))
///     .hint(force_index("idx_singers_last_name"))
///     .all(cx, &conn, ctx)
///     .await;
/// ```
#[derive(Debug)]
pub struct SelectBuilder<M: Model> {
    columns: Vec<String>,
    where_clause: Option<Where>,
    hints: Vec<IndexHint>,
    limit: Option<u64>,
    _marker: PhantomData<M>,
}

impl<M: Model> SelectBuilder<M> {
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
            where_clause: None,
            hints: Vec::new(),
            limit: None,
            _marker: PhantomData,
        }
    }

    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| (*c).to_string()).collect();
        self
    }

    pub fn filter(mut self, expr: Expr) -> Self {
        self.where_clause = merge_filter(self.where_clause.take(), expr);
        self
    }

    /// Add a table hint after the FROM table.
    pub fn hint(mut self, hint: IndexHint) -> Self {
        self.hints.push(hint);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn statement(&self) -> Statement {
        let mut stmt = Statement::new(M::TABLE_NAME)
            .with_clause(Clause::Select(self.columns.clone()))
            .with_clause(Clause::From(FromTable {
                table: None,
                hints: self.hints.clone(),
            }));
        if let Some(filter) = &self.where_clause {
            stmt.add_clause(Clause::Where(filter.clone()));
        }
        if let Some(limit) = self.limit {
            stmt.add_clause(Clause::Limit(limit));
        }
        stmt
    }

    pub fn build(&self, ctx: BuildContext<'_>) -> Result<BuiltStatement, Error> {
        self.statement()
            .build(ctx.dialect, ctx.builders, QUERY_CLAUSES)
    }

    /// Run the query and decode every row.
    pub async fn all<C: Connection>(
        self,
        cx: &Cx,
        conn: &C,
        ctx: BuildContext<'_>,
    ) -> Outcome<Vec<M>, Error> {
        let built = match self.build(ctx) {
            Ok(built) => built,
            Err(e) => return Outcome::Err(e),
        };
        let rows = match conn.query(cx, &built.sql, &built.vars).await {
            Outcome::Ok(rows) => rows,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };
        let mut models = Vec::with_capacity(rows.len());
        for row in &rows {
            match M::from_row(row) {
                Ok(m) => models.push(m),
                Err(e) => return Outcome::Err(e),
            }
        }
        Outcome::Ok(models)
    }

    /// Run the query with `LIMIT 1` and decode the first row.
    pub async fn first<C: Connection>(
        self,
        cx: &Cx,
        conn: &C,
        ctx: BuildContext<'_>,
    ) -> Outcome<Option<M>, Error> {
        match self.limit(1).all(cx, conn, ctx).await {
            Outcome::Ok(models) => Outcome::Ok(models.into_iter().next()),
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }
}

impl<M: Model> Default for SelectBuilder<M> {
    fn default() -> Self {
        Self::new()
    }
}
