//! Connection registry.
//!
//! Owns how the two database handles are built and disposed. Nothing is
//! opened until first use: the target side is a lazily-created
//! `mysql_async` pool, and source clients are opened on demand so each
//! data-phase worker gets its own pair (prepared statements are never
//! shared across workers).

use std::sync::OnceLock;

use mysql_async::Pool;
use tokio_postgres::{Client, NoTls};
use tracing::warn;

use crate::config::{FerryConfig, SourceConfig, TargetConfig};
use crate::error::{Endpoint, FerryError};

/// Builds and hands out database handles for the run.
pub struct ConnectionRegistry {
    source: SourceConfig,
    target: TargetConfig,
    pool: OnceLock<Pool>,
}

impl ConnectionRegistry {
    pub fn new(config: &FerryConfig) -> Self {
        Self {
            source: config.source.clone(),
            target: config.target.clone(),
            pool: OnceLock::new(),
        }
    }

    /// Open a fresh source client. The connection driver is spawned onto
    /// the runtime and lives until the client is dropped.
    pub async fn source_client(&self) -> Result<Client, FerryError> {
        let (client, connection) = pg_config(&self.source)
            .connect(NoTls)
            .await
            .map_err(|e| FerryError::ConnectFailed {
                endpoint: Endpoint::Source,
                message: e.to_string(),
            })?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!(error = %e, "source connection terminated");
            }
        });
        Ok(client)
    }

    /// The shared target pool, created on first use.
    fn target_pool(&self) -> &Pool {
        self.pool
            .get_or_init(|| Pool::new(mysql_opts(&self.target)))
    }

    /// Check out a target connection.
    pub async fn target_conn(&self) -> Result<mysql_async::Conn, FerryError> {
        self.target_pool()
            .get_conn()
            .await
            .map_err(|e| FerryError::ConnectFailed {
                endpoint: Endpoint::Target,
                message: e.to_string(),
            })
    }

    /// Drain and close the target pool. Source clients close when their
    /// owners drop them.
    pub async fn dispose(&self) {
        if let Some(pool) = self.pool.get() {
            if let Err(e) = pool.clone().disconnect().await {
                warn!(error = %e, "target pool shutdown failed");
            }
        }
    }
}

fn pg_config(cfg: &SourceConfig) -> tokio_postgres::Config {
    let mut pg = tokio_postgres::Config::new();
    pg.host(&cfg.host)
        .port(cfg.port)
        .dbname(&cfg.database)
        .user(&cfg.user)
        .password(&cfg.password)
        .application_name("pgferry");
    pg
}

fn mysql_opts(cfg: &TargetConfig) -> mysql_async::Opts {
    mysql_async::OptsBuilder::default()
        .ip_or_hostname(cfg.host.clone())
        .tcp_port(cfg.port)
        .db_name(Some(cfg.database.clone()))
        .user(Some(cfg.user.clone()))
        .pass(Some(cfg.password.clone()))
        .init(vec![format!(
            "SET NAMES {} COLLATE {}",
            cfg.charset, cfg.collation
        )])
        .into()
}
