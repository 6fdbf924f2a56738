//! SQL clause model.
//!
//! A statement is a set of named clauses. Each clause knows how to render
//! itself generically; a dialect can replace the rendering of individual
//! clauses through a [`ClauseBuilders`](crate::statement::ClauseBuilders)
//! registry.

use spanmodel_core::Value;

use crate::hints::IndexHint;
use crate::statement::SqlBuilder;

pub const INSERT: &str = "INSERT";
pub const VALUES: &str = "VALUES";
pub const ON_CONFLICT: &str = "ON CONFLICT";
pub const RETURNING: &str = "RETURNING";
pub const SELECT: &str = "SELECT";
pub const FROM: &str = "FROM";
pub const WHERE: &str = "WHERE";
pub const UPDATE: &str = "UPDATE";
pub const SET: &str = "SET";
pub const DELETE: &str = "DELETE";
pub const LIMIT: &str = "LIMIT";

/// Generic clause order for INSERT statements.
pub const CREATE_CLAUSES: &[&str] = &[INSERT, VALUES, ON_CONFLICT, RETURNING];
pub const QUERY_CLAUSES: &[&str] = &[SELECT, FROM, WHERE, LIMIT];
pub const UPDATE_CLAUSES: &[&str] = &[UPDATE, SET, WHERE, RETURNING];
pub const DELETE_CLAUSES: &[&str] = &[DELETE, FROM, WHERE, RETURNING];

/// A boolean condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `` `column` = ? ``
    Eq(String, Value),
    /// Raw SQL with `?` placeholders, bound in order.
    Raw(String, Vec<Value>),
}

impl Expr {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Expr::Eq(column.into(), value.into())
    }

    pub fn raw(sql: impl Into<String>, vars: Vec<Value>) -> Self {
        Expr::Raw(sql.into(), vars)
    }

    pub fn build(&self, b: &mut SqlBuilder<'_>) {
        match self {
            Expr::Eq(column, value) => {
                b.write_quoted(column);
                b.write_str(" = ");
                b.add_var(value.clone());
            }
            Expr::Raw(sql, vars) => {
                let mut vars = vars.iter();
                for ch in sql.chars() {
                    if ch == '?' {
                        if let Some(v) = vars.next() {
                            b.add_var(v.clone());
                            continue;
                        }
                    }
                    b.write_char(ch);
                }
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Where {
    pub exprs: Vec<Expr>,
}

impl Where {
    pub fn new(expr: Expr) -> Self {
        Self { exprs: vec![expr] }
    }

    pub fn and(mut self, expr: Expr) -> Self {
        self.exprs.push(expr);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    fn build_exprs(&self, b: &mut SqlBuilder<'_>) {
        for (i, expr) in self.exprs.iter().enumerate() {
            if i > 0 {
                b.write_str(" AND ");
            }
            expr.build(b);
        }
    }
}

/// `column = value` in SET and DO UPDATE SET lists.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: String,
    pub value: Value,
}

impl Assignment {
    pub fn new(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

fn build_assignments(assignments: &[Assignment], b: &mut SqlBuilder<'_>) {
    for (i, a) in assignments.iter().enumerate() {
        if i > 0 {
            b.write_char(',');
        }
        b.write_quoted(&a.column);
        b.write_char('=');
        b.add_var(a.value.clone());
    }
}

/// `INSERT INTO <table>`; the table defaults to the statement table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Insert {
    pub table: Option<String>,
}

impl Insert {
    pub fn build(&self, b: &mut SqlBuilder<'_>) {
        self.build_with_modifier(b, "INSERT");
    }

    /// Render with a replacement for the leading `INSERT` keyword,
    /// e.g. `INSERT OR UPDATE`.
    pub fn build_with_modifier(&self, b: &mut SqlBuilder<'_>, modifier: &str) {
        b.write_str(modifier);
        b.write_str(" INTO ");
        match &self.table {
            Some(table) => b.write_quoted(table),
            None => {
                let table = b.table().to_string();
                b.write_quoted(&table);
            }
        }
    }
}

/// Column list and one or more rows of values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Values {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Values {
    pub fn build(&self, b: &mut SqlBuilder<'_>) {
        if self.columns.is_empty() {
            b.write_str("DEFAULT VALUES");
            return;
        }
        b.write_char('(');
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                b.write_char(',');
            }
            b.write_quoted(column);
        }
        b.write_str(") VALUES ");
        for (r, row) in self.rows.iter().enumerate() {
            if r > 0 {
                b.write_char(',');
            }
            b.write_char('(');
            for (i, value) in row.iter().enumerate() {
                if i > 0 {
                    b.write_char(',');
                }
                b.add_var(value.clone());
            }
            b.write_char(')');
        }
    }
}

/// Upsert behaviour for INSERT.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OnConflict {
    /// Conflict target columns.
    pub columns: Vec<String>,
    pub where_clause: Option<Where>,
    pub target_where: Option<Where>,
    pub on_constraint: Option<String>,
    pub do_nothing: bool,
    pub do_updates: Vec<Assignment>,
    /// Overwrite every inserted column on conflict.
    pub update_all: bool,
}

impl OnConflict {
    pub fn update_all() -> Self {
        Self {
            update_all: true,
            ..Self::default()
        }
    }

    pub fn do_nothing() -> Self {
        Self {
            do_nothing: true,
            ..Self::default()
        }
    }

    pub fn do_updates(assignments: Vec<Assignment>) -> Self {
        Self {
            do_updates: assignments,
            ..Self::default()
        }
    }

    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| (*c).to_string()).collect();
        self
    }

    pub fn on_constraint(mut self, name: impl Into<String>) -> Self {
        self.on_constraint = Some(name.into());
        self
    }

    pub fn target_where(mut self, expr: Expr) -> Self {
        self.target_where = Some(Where::new(expr));
        self
    }

    pub fn filter(mut self, expr: Expr) -> Self {
        self.where_clause = Some(match self.where_clause {
            Some(existing) => existing.and(expr),
            None => Where::new(expr),
        });
        self
    }

    /// Standard `ON CONFLICT ... DO NOTHING | DO UPDATE SET ...` rendering.
    pub fn build(&self, b: &mut SqlBuilder<'_>) {
        b.write_str("ON CONFLICT ");
        if let Some(name) = &self.on_constraint {
            b.write_str("ON CONSTRAINT ");
            b.write_str(name);
            b.write_char(' ');
        } else {
            if !self.columns.is_empty() {
                b.write_char('(');
                for (i, column) in self.columns.iter().enumerate() {
                    if i > 0 {
                        b.write_char(',');
                    }
                    b.write_quoted(column);
                }
                b.write_str(") ");
            }
            if let Some(target_where) = &self.target_where {
                b.write_str("WHERE ");
                target_where.build_exprs(b);
                b.write_char(' ');
            }
        }

        if self.do_nothing {
            b.write_str("DO NOTHING");
        } else {
            b.write_str("DO UPDATE SET ");
            if self.do_updates.is_empty() && self.update_all {
                let excluded = self.excluded_assignments(b);
                build_assignments(&excluded, b);
            } else {
                build_assignments(&self.do_updates, b);
            }
        }

        if let Some(filter) = &self.where_clause {
            b.write_str(" WHERE ");
            filter.build_exprs(b);
        }
    }

    fn excluded_assignments(&self, b: &SqlBuilder<'_>) -> Vec<Assignment> {
        let Some(Clause::Values(values)) = b.clause(VALUES) else {
            return Vec::new();
        };
        values
            .columns
            .iter()
            .filter(|c| !self.columns.contains(c))
            .map(|c| Assignment {
                column: c.clone(),
                value: Value::Expr(format!("excluded.{}", b.quote(c))),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Returning {
    /// Empty means every column.
    pub columns: Vec<String>,
}

impl Returning {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn columns(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
        }
    }

    pub fn build(&self, b: &mut SqlBuilder<'_>) {
        b.write_str("RETURNING ");
        self.build_columns(b);
    }

    /// `*` or the quoted, comma-joined column list.
    pub fn build_columns(&self, b: &mut SqlBuilder<'_>) {
        if self.columns.is_empty() {
            b.write_char('*');
            return;
        }
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                b.write_char(',');
            }
            b.write_quoted(column);
        }
    }
}

/// `FROM <table>` with optional index hints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FromTable {
    pub table: Option<String>,
    pub hints: Vec<IndexHint>,
}

/// A clause of a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Insert(Insert),
    Values(Values),
    OnConflict(OnConflict),
    Returning(Returning),
    /// Selected columns; empty means `*`.
    Select(Vec<String>),
    From(FromTable),
    Where(Where),
    /// `UPDATE <table>`
    Update(Option<String>),
    Set(Vec<Assignment>),
    Delete,
    Limit(u64),
}

impl Clause {
    pub fn name(&self) -> &'static str {
        match self {
            Clause::Insert(_) => INSERT,
            Clause::Values(_) => VALUES,
            Clause::OnConflict(_) => ON_CONFLICT,
            Clause::Returning(_) => RETURNING,
            Clause::Select(_) => SELECT,
            Clause::From(_) => FROM,
            Clause::Where(_) => WHERE,
            Clause::Update(_) => UPDATE,
            Clause::Set(_) => SET,
            Clause::Delete => DELETE,
            Clause::Limit(_) => LIMIT,
        }
    }

    /// Generic rendering.
    pub fn build(&self, b: &mut SqlBuilder<'_>) {
        match self {
            Clause::Insert(insert) => insert.build(b),
            Clause::Values(values) => values.build(b),
            Clause::OnConflict(on_conflict) => on_conflict.build(b),
            Clause::Returning(returning) => returning.build(b),
            Clause::Select(columns) => {
                b.write_str("SELECT ");
                if columns.is_empty() {
                    b.write_char('*');
                } else {
                    for (i, column) in columns.iter().enumerate() {
                        if i > 0 {
                            b.write_char(',');
                        }
                        b.write_quoted(column);
                    }
                }
            }
            Clause::From(from) => {
                b.write_str("FROM ");
                let table = from.table.clone().unwrap_or_else(|| b.table().to_string());
                b.write_quoted(&table);
                for hint in &from.hints {
                    hint.build(b);
                }
            }
            Clause::Where(filter) => {
                if !filter.is_empty() {
                    b.write_str("WHERE ");
                    filter.build_exprs(b);
                }
            }
            Clause::Update(table) => {
                b.write_str("UPDATE ");
                let table = table.clone().unwrap_or_else(|| b.table().to_string());
                b.write_quoted(&table);
            }
            Clause::Set(assignments) => {
                b.write_str("SET ");
                build_assignments(assignments, b);
            }
            Clause::Delete => b.write_str("DELETE"),
            Clause::Limit(n) => {
                b.write_str("LIMIT ");
                b.write_str(&n.to_string());
            }
        }
    }
}
