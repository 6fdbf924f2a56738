//! Statements and the clause builder registry.

use std::collections::HashMap;
use std::fmt;

use spanmodel_core::{Error, Result, Value};

use crate::clause::Clause;
use crate::dialect::Dialect;

/// Renders one clause into a [`SqlBuilder`].
pub type ClauseBuilderFn = fn(&Clause, &mut SqlBuilder<'_>);

/// Per-dialect overrides of clause rendering, keyed by clause name.
///
/// Clauses without an entry use their generic rendering. A registry belongs
/// to one database handle; nothing here is process-global.
#[derive(Clone, Default)]
pub struct ClauseBuilders {
    builders: HashMap<&'static str, ClauseBuilderFn>,
}

impl ClauseBuilders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a builder, returning the one it replaces.
    pub fn register(&mut self, name: &'static str, builder: ClauseBuilderFn) -> Option<ClauseBuilderFn> {
        self.builders.insert(name, builder)
    }

    pub fn get(&self, name: &str) -> Option<ClauseBuilderFn> {
        self.builders.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.builders.contains_key(name)
    }
}

impl fmt::Debug for ClauseBuilders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&&str> = self.builders.keys().collect();
        names.sort();
        f.debug_struct("ClauseBuilders")
            .field("overrides", &names)
            .finish()
    }
}

/// Output buffer handed to clause builders.
///
/// Builders append SQL text, bind variables and errors. They can inspect
/// the other clauses of the statement being built through [`SqlBuilder::clause`].
pub struct SqlBuilder<'a> {
    dialect: &'a dyn Dialect,
    table: &'a str,
    clauses: &'a HashMap<&'static str, Clause>,
    sql: String,
    vars: Vec<Value>,
    errors: Vec<Error>,
}

impl<'a> SqlBuilder<'a> {
    pub fn write_str(&mut self, s: &str) {
        self.sql.push_str(s);
    }

    pub fn write_char(&mut self, c: char) {
        self.sql.push(c);
    }

    pub fn write_quoted(&mut self, ident: &str) {
        self.dialect.quote_to(&mut self.sql, ident);
    }

    pub fn quote(&self, ident: &str) -> String {
        self.dialect.quote(ident)
    }

    /// Bind a value. SQL expressions are written inline instead.
    pub fn add_var(&mut self, value: Value) {
        match value {
            Value::Expr(expr) => self.sql.push_str(&expr),
            other => {
                self.vars.push(other);
                self.dialect.bind_var_to(&mut self.sql, self.vars.len());
            }
        }
    }

    pub fn add_error(&mut self, err: Error) {
        self.errors.push(err);
    }

    /// Another clause of the statement being built.
    pub fn clause(&self, name: &str) -> Option<&'a Clause> {
        self.clauses.get(name)
    }

    /// The statement's current table.
    pub fn table(&self) -> &'a str {
        self.table
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }
}

/// The rendered SQL text and its bind variables.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltStatement {
    pub sql: String,
    pub vars: Vec<Value>,
}

/// A statement under construction: a table and a set of named clauses.
#[derive(Debug, Clone, Default)]
pub struct Statement {
    pub table: String,
    clauses: HashMap<&'static str, Clause>,
}

impl Statement {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            clauses: HashMap::new(),
        }
    }

    /// Add a clause, replacing any clause with the same name.
    pub fn add_clause(&mut self, clause: Clause) {
        self.clauses.insert(clause.name(), clause);
    }

    pub fn with_clause(mut self, clause: Clause) -> Self {
        self.add_clause(clause);
        self
    }

    pub fn clause(&self, name: &str) -> Option<&Clause> {
        self.clauses.get(name)
    }

    /// Render the clauses named in `order`, skipping absent ones.
    ///
    /// Errors raised by any builder abort the statement: nothing is returned
    /// except the first error.
    pub fn build(
        &self,
        dialect: &dyn Dialect,
        builders: &ClauseBuilders,
        order: &[&str],
    ) -> Result<BuiltStatement> {
        let mut b = SqlBuilder {
            dialect,
            table: &self.table,
            clauses: &self.clauses,
            sql: String::new(),
            vars: Vec::new(),
            errors: Vec::new(),
        };

        let mut first = true;
        for name in order {
            let Some(clause) = self.clauses.get(name) else {
                continue;
            };
            if !first {
                b.write_char(' ');
            }
            first = false;
            match builders.get(name) {
                Some(builder) => builder(clause, &mut b),
                None => clause.build(&mut b),
            }
        }

        if let Some(err) = b.errors.into_iter().next() {
            tracing::debug!(
                dialect = dialect.name(),
                table = %self.table,
                error = %err,
                "Statement rejected"
            );
            return Err(err);
        }
        tracing::trace!(sql = %b.sql, vars = b.vars.len(), "Built statement");
        Ok(BuiltStatement {
            sql: b.sql,
            vars: b.vars,
        })
    }
}
