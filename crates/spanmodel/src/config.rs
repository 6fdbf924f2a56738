//! Spanner dialect configuration.
//!
//! A [`SpannerConfig`] names exactly one connection source: a DSN, a
//! driver connector, or an already opened pool. The serialisable part of the
//! configuration is available separately as [`ConfigOptions`] so it can be
//! kept in a JSON file next to other application settings.
//!
//! # Example
//!
//! ```ignore
//! let config = SpannerConfig::<MyDriver>::new()
//!     .dsn("projects/p/instances/i/databases/d")
//!     .default_sequence_kind("DISABLED");
//! let db = SpannerDb::open(config, &MyDriver)?;
//! ```

use serde::{Deserialize, Serialize};
use spanmodel_core::{Driver, Error, Result};
use spanmodel_schema::{DEFAULT_SEQUENCE_KIND, MigratorOptions};

/// Driver name used when none is configured.
pub const DEFAULT_DRIVER_NAME: &str = "spanner";

pub const CONNECTOR_AND_CONN: &str = "only set one of Connector and Conn in the configuration";
pub const CONNECTOR_AND_DSN: &str = "only set one of Connector and DSN in the configuration";
pub const DSN_AND_CONN: &str = "only set one of DSN and Conn in the configuration";
pub const NO_SOURCE: &str = "set one of DSN, Connector or Conn in the configuration";

/// Serialisable configuration settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigOptions {
    pub driver_name: Option<String>,
    pub dsn: Option<String>,
    /// Run `auto_migrate` statement by statement instead of in one DDL batch.
    pub disable_auto_migrate_batching: bool,
    /// `sequence_kind` for generated sequences; `DISABLED` turns them off.
    pub default_sequence_kind: Option<String>,
}

impl ConfigOptions {
    /// Parse options from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::config(format!("invalid spanner options: {}", e)))
    }
}

/// Where connections come from.
pub(crate) enum Source<D: Driver> {
    Dsn(String),
    Connector(D::Connector),
    Pool(D::Pool),
}

/// Configuration of a Spanner database handle.
pub struct SpannerConfig<D: Driver> {
    pub driver_name: Option<String>,
    pub dsn: Option<String>,
    pub connector: Option<D::Connector>,
    pub pool: Option<D::Pool>,
    pub disable_auto_migrate_batching: bool,
    pub default_sequence_kind: Option<String>,
}

impl<D: Driver> std::fmt::Debug for SpannerConfig<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpannerConfig")
            .field("driver_name", &self.driver_name)
            .field("dsn", &self.dsn)
            .field("connector", &self.connector.is_some())
            .field("pool", &self.pool.is_some())
            .field(
                "disable_auto_migrate_batching",
                &self.disable_auto_migrate_batching,
            )
            .field("default_sequence_kind", &self.default_sequence_kind)
            .finish()
    }
}

impl<D: Driver> Default for SpannerConfig<D> {
    fn default() -> Self {
        Self {
            driver_name: None,
            dsn: None,
            connector: None,
            pool: None,
            disable_auto_migrate_batching: false,
            default_sequence_kind: None,
        }
    }
}

impl<D: Driver> SpannerConfig<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from serialised options.
    pub fn from_options(options: ConfigOptions) -> Self {
        Self {
            driver_name: options.driver_name,
            dsn: options.dsn,
            connector: None,
            pool: None,
            disable_auto_migrate_batching: options.disable_auto_migrate_batching,
            default_sequence_kind: options.default_sequence_kind,
        }
    }

    pub fn driver_name(mut self, name: impl Into<String>) -> Self {
        self.driver_name = Some(name.into());
        self
    }

    pub fn dsn(mut self, dsn: impl Into<String>) -> Self {
        self.dsn = Some(dsn.into());
        self
    }

    pub fn connector(mut self, connector: D::Connector) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn pool(mut self, pool: D::Pool) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn disable_auto_migrate_batching(mut self, value: bool) -> Self {
        self.disable_auto_migrate_batching = value;
        self
    }

    pub fn default_sequence_kind(mut self, kind: impl Into<String>) -> Self {
        self.default_sequence_kind = Some(kind.into());
        self
    }

    /// The serialisable part of this configuration.
    pub fn options(&self) -> ConfigOptions {
        ConfigOptions {
            driver_name: self.driver_name.clone(),
            dsn: self.dsn.clone(),
            disable_auto_migrate_batching: self.disable_auto_migrate_batching,
            default_sequence_kind: self.default_sequence_kind.clone(),
        }
    }

    /// Check that exactly one connection source is set.
    pub fn validate(&self) -> Result<()> {
        let has_dsn = self.dsn.as_deref().is_some_and(|d| !d.is_empty());
        let has_connector = self.connector.is_some();
        let has_pool = self.pool.is_some();
        if has_connector && has_pool {
            return Err(Error::config(CONNECTOR_AND_CONN));
        }
        if has_connector && has_dsn {
            return Err(Error::config(CONNECTOR_AND_DSN));
        }
        if has_dsn && has_pool {
            return Err(Error::config(DSN_AND_CONN));
        }
        if !(has_dsn || has_connector || has_pool) {
            return Err(Error::config(NO_SOURCE));
        }
        Ok(())
    }

    /// Validate and split into driver name, migrator settings and source.
    pub(crate) fn resolve(self) -> Result<(String, MigratorOptions, Source<D>)> {
        self.validate()?;
        let driver_name = self
            .driver_name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| DEFAULT_DRIVER_NAME.to_string());
        let migrator = MigratorOptions::default()
            .disable_batching(self.disable_auto_migrate_batching)
            .sequence_kind(
                self.default_sequence_kind
                    .filter(|k| !k.is_empty())
                    .unwrap_or_else(|| DEFAULT_SEQUENCE_KIND.to_string()),
            );
        let source = match (self.dsn, self.connector, self.pool) {
            (_, _, Some(pool)) => Source::Pool(pool),
            (_, Some(connector), None) => Source::Connector(connector),
            (Some(dsn), None, None) => Source::Dsn(dsn),
            (None, None, None) => return Err(Error::config(NO_SOURCE)),
        };
        Ok((driver_name, migrator, source))
    }
}
