//! Database handle and sessions.
//!
//! [`SpannerDb`] is created once from a [`SpannerConfig`]. It owns the
//! connection pool, the Spanner dialect and the clause builders that render
//! `INSERT OR UPDATE` and `THEN RETURN`. It is immutable after
//! [`SpannerDb::open`], so it can be shared freely.
//!
//! A [`Session`] borrows one pooled connection. It runs the model operations
//! (create, find, update, delete), raw statements, transactions and
//! migrations on that connection. A session is itself a [`Connection`], so
//! transaction bodies receive the session and keep the full API.

use asupersync::{Cx, Outcome};
use spanmodel_core::{
    ConnPool, Connection, Driver, Error, Model, Result, Row, TableSchema, TxOptions, Value,
};
use spanmodel_query::{
    BuildContext, ClauseBuilders, DeleteBuilder, Dialect, Expr, IndexHint, InsertBuilder,
    OnConflict, SelectBuilder, SpannerDialect, UpdateBuilder, spanner,
};
use spanmodel_schema::{DdlStatement, MigratorOptions, SpannerMigrator};

use crate::config::{Source, SpannerConfig};
use crate::retry::{self, RetryPolicy, TxFuture};

/// An initialised Spanner database.
pub struct SpannerDb<P: ConnPool> {
    driver_name: String,
    pool: P,
    dialect: SpannerDialect,
    builders: ClauseBuilders,
    create_clauses: &'static [&'static str],
    migrator_options: MigratorOptions,
}

impl<P: ConnPool> std::fmt::Debug for SpannerDb<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpannerDb")
            .field("driver_name", &self.driver_name)
            .field("builders", &self.builders)
            .field("create_clauses", &self.create_clauses)
            .field("migrator_options", &self.migrator_options)
            .finish_non_exhaustive()
    }
}

impl<P: ConnPool> SpannerDb<P> {
    /// Validate `config`, open its connection source and set up the dialect.
    pub fn open<D: Driver<Pool = P>>(config: SpannerConfig<D>, driver: &D) -> Result<Self> {
        let (driver_name, migrator_options, source) = config.resolve()?;
        let pool = match source {
            Source::Pool(pool) => pool,
            Source::Connector(connector) => driver.open_connector(connector)?,
            Source::Dsn(dsn) => driver.open(&driver_name, &dsn)?,
        };
        tracing::debug!(
            dialect = SpannerDialect::NAME,
            driver = %driver_name,
            batching = !migrator_options.disable_batching,
            sequence_kind = %migrator_options.sequence_kind,
            "Opened Spanner database"
        );
        Ok(Self {
            driver_name,
            pool,
            dialect: SpannerDialect,
            builders: spanner::clause_builders(),
            create_clauses: spanner::CREATE_CLAUSES,
            migrator_options,
        })
    }

    /// Dialect name, always `"spanner"`.
    pub fn name(&self) -> &'static str {
        self.dialect.name()
    }

    pub fn driver_name(&self) -> &str {
        &self.driver_name
    }

    pub fn dialect(&self) -> &SpannerDialect {
        &self.dialect
    }

    pub fn builders(&self) -> &ClauseBuilders {
        &self.builders
    }

    /// Clause order of INSERT statements.
    pub fn create_clauses(&self) -> &'static [&'static str] {
        self.create_clauses
    }

    pub fn migrator_options(&self) -> &MigratorOptions {
        &self.migrator_options
    }

    pub fn pool(&self) -> &P {
        &self.pool
    }

    pub fn build_context(&self) -> BuildContext<'_> {
        BuildContext {
            dialect: &self.dialect,
            builders: &self.builders,
            create_clauses: self.create_clauses,
        }
    }

    /// Render `sql` with its bind variables inlined, for logs.
    pub fn explain(&self, sql: &str, vars: &[Value]) -> String {
        self.dialect.explain(sql, vars)
    }

    /// Borrow a connection from the pool.
    pub async fn session(&self, cx: &Cx) -> Outcome<Session<'_, P::Conn>, Error> {
        match self.pool.acquire(cx).await {
            Outcome::Ok(conn) => Outcome::Ok(Session {
                conn,
                ctx: self.build_context(),
                migrator_options: &self.migrator_options,
            }),
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    /// Auto-migrate `schemas` on a fresh session.
    pub async fn auto_migrate(&self, cx: &Cx, schemas: &[TableSchema]) -> Outcome<(), Error> {
        match self.session(cx).await {
            Outcome::Ok(session) => session.migrator().auto_migrate(cx, schemas).await,
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    /// DDL that `auto_migrate` would run for `schemas`, without applying it.
    pub async fn auto_migrate_dry_run(
        &self,
        cx: &Cx,
        schemas: &[TableSchema],
    ) -> Outcome<Vec<DdlStatement>, Error> {
        match self.session(cx).await {
            Outcome::Ok(session) => session.migrator().auto_migrate_dry_run(cx, schemas).await,
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }
}

/// One pooled connection plus the dialect state needed to build statements.
pub struct Session<'db, C: Connection> {
    conn: C,
    ctx: BuildContext<'db>,
    migrator_options: &'db MigratorOptions,
}

impl<C: Connection> std::fmt::Debug for Session<'_, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("ctx", &self.ctx)
            .field("migrator_options", self.migrator_options)
            .finish_non_exhaustive()
    }
}

fn single_key_column<M: Model>() -> Result<&'static str> {
    let columns: Vec<&'static str> = M::fields()
        .iter()
        .filter(|f| f.primary_key)
        .map(|f| f.column_name)
        .collect();
    match columns.as_slice() {
        [column] => Ok(*column),
        [] => Err(Error::Custom(format!(
            "{} has no primary key",
            M::TABLE_NAME
        ))),
        _ => Err(Error::Custom(format!(
            "{} has a composite primary key; use a filter instead",
            M::TABLE_NAME
        ))),
    }
}

impl<'db, C: Connection> Session<'db, C> {
    pub fn connection(&self) -> &C {
        &self.conn
    }

    pub fn into_connection(self) -> C {
        self.conn
    }

    pub fn build_context(&self) -> BuildContext<'db> {
        self.ctx
    }

    /// Schema migrator running on this session's connection.
    pub fn migrator(&self) -> SpannerMigrator<'_, C> {
        SpannerMigrator::new(&self.conn, self.migrator_options.clone())
    }

    /// Insert one model.
    pub async fn create<M: Model>(&self, cx: &Cx, model: &M) -> Outcome<u64, Error> {
        tracing::debug!(table = M::TABLE_NAME, "Creating record");
        InsertBuilder::new(model).execute(cx, &self.conn, self.ctx).await
    }

    /// Insert several models in one statement.
    pub async fn create_many<M: Model>(&self, cx: &Cx, models: &[M]) -> Outcome<u64, Error> {
        if models.is_empty() {
            return Outcome::Ok(0);
        }
        tracing::debug!(table = M::TABLE_NAME, rows = models.len(), "Creating records");
        InsertBuilder::many(models)
            .execute(cx, &self.conn, self.ctx)
            .await
    }

    /// Insert one model and return the row written, including generated keys.
    pub async fn create_returning<M: Model>(&self, cx: &Cx, model: &M) -> Outcome<Option<M>, Error> {
        let rows = match InsertBuilder::new(model)
            .returning()
            .execute_returning(cx, &self.conn, self.ctx)
            .await
        {
            Outcome::Ok(rows) => rows,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };
        match rows.first().map(M::from_row).transpose() {
            Ok(model) => Outcome::Ok(model),
            Err(e) => Outcome::Err(e),
        }
    }

    /// Insert with an upsert modifier. Spanner supports update-all and
    /// do-nothing only; anything else fails before reaching the server.
    pub async fn create_on_conflict<M: Model>(
        &self,
        cx: &Cx,
        model: &M,
        on_conflict: OnConflict,
    ) -> Outcome<u64, Error> {
        InsertBuilder::new(model)
            .on_conflict(on_conflict)
            .execute(cx, &self.conn, self.ctx)
            .await
    }

    /// Look a model up by its single-column primary key.
    pub async fn find<M: Model>(&self, cx: &Cx, key: impl Into<Value>) -> Outcome<Option<M>, Error> {
        let column = match single_key_column::<M>() {
            Ok(column) => column,
            Err(e) => return Outcome::Err(e),
        };
        SelectBuilder::<M>::new()
            .filter(Expr::eq(column, key))
            .first(cx, &self.conn, self.ctx)
            .await
    }

    /// Query with an index hint on the table.
    pub async fn find_with_hint<M: Model>(
        &self,
        cx: &Cx,
        hint: IndexHint,
        filter: Expr,
    ) -> Outcome<Vec<M>, Error> {
        SelectBuilder::<M>::new()
            .hint(hint)
            .filter(filter)
            .all(cx, &self.conn, self.ctx)
            .await
    }

    /// Select models matching `filter`.
    pub async fn find_where<M: Model>(&self, cx: &Cx, filter: Expr) -> Outcome<Vec<M>, Error> {
        SelectBuilder::<M>::new()
            .filter(filter)
            .all(cx, &self.conn, self.ctx)
            .await
    }

    /// Save all non-key columns of `model`, matched by primary key.
    pub async fn update<M: Model>(&self, cx: &Cx, model: &M) -> Outcome<u64, Error> {
        tracing::debug!(table = M::TABLE_NAME, "Updating record");
        UpdateBuilder::new(model)
            .execute(cx, &self.conn, self.ctx)
            .await
    }

    /// Save only the named columns of `model`.
    pub async fn update_columns<M: Model>(
        &self,
        cx: &Cx,
        model: &M,
        columns: &[&'static str],
    ) -> Outcome<u64, Error> {
        UpdateBuilder::new(model)
            .set_only(columns)
            .execute(cx, &self.conn, self.ctx)
            .await
    }

    pub async fn delete<M: Model>(&self, cx: &Cx, model: &M) -> Outcome<u64, Error> {
        tracing::debug!(table = M::TABLE_NAME, "Deleting record");
        DeleteBuilder::from_model(model)
            .execute(cx, &self.conn, self.ctx)
            .await
    }

    /// Execute a raw statement.
    pub async fn exec(&self, cx: &Cx, sql: &str, params: &[Value]) -> Outcome<u64, Error> {
        self.conn.execute(cx, sql, params).await
    }

    /// Run a raw query.
    pub async fn query(&self, cx: &Cx, sql: &str, params: &[Value]) -> Outcome<Vec<Row>, Error> {
        self.conn.query(cx, sql, params).await
    }

    /// Run `body` in a read/write transaction, retrying it while Spanner
    /// aborts the transaction.
    pub async fn run_transaction<T, F>(&self, cx: &Cx, options: TxOptions, body: F) -> Outcome<T, Error>
    where
        F: for<'c> FnMut(&'c Cx, &'c Self) -> TxFuture<'c, T>,
    {
        retry::run_transaction(cx, self, options, body).await
    }

    /// Like [`Session::run_transaction`] with an explicit retry policy.
    pub async fn run_transaction_with_policy<T, F>(
        &self,
        cx: &Cx,
        options: TxOptions,
        policy: RetryPolicy,
        body: F,
    ) -> Outcome<T, Error>
    where
        F: for<'c> FnMut(&'c Cx, &'c Self) -> TxFuture<'c, T>,
    {
        retry::run_transaction_with_policy(cx, self, options, policy, body).await
    }
}

impl<C: Connection> Connection for Session<'_, C> {
    async fn query(&self, cx: &Cx, sql: &str, params: &[Value]) -> Outcome<Vec<Row>, Error> {
        self.conn.query(cx, sql, params).await
    }

    async fn execute(&self, cx: &Cx, sql: &str, params: &[Value]) -> Outcome<u64, Error> {
        self.conn.execute(cx, sql, params).await
    }

    async fn begin(&self, cx: &Cx, options: &TxOptions) -> Outcome<(), Error> {
        self.conn.begin(cx, options).await
    }

    async fn commit(&self, cx: &Cx) -> Outcome<(), Error> {
        self.conn.commit(cx).await
    }

    async fn rollback(&self, cx: &Cx) -> Outcome<(), Error> {
        self.conn.rollback(cx).await
    }

    fn batched_statements(&self) -> Option<Vec<String>> {
        self.conn.batched_statements()
    }
}
