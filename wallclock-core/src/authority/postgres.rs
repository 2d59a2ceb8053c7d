use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use deadpool::managed::{Metrics, RecycleError, RecycleResult};
use deadpool::{managed, Runtime};
use tokio_postgres::{Client, NoTls, SimpleQueryMessage};

use wallclock_etc::{ClockConfig, PoolConfig, DEFAULT_PROBE, DEFAULT_STATEMENT};

use crate::Tsn;

use super::{Authority, Connector};

/// DDL for the `clock` schema, sequence and `clock.new_tsn()` function.
pub const CLOCK_SCHEMA: &str = include_str!("../../sql/clock.sql");

pub type Pool = managed::Pool<Manager>;

/// Opens pooled `tokio-postgres` connections to the database of a clock.
#[derive(Clone)]
pub struct PostgresConnector {
    statement: Arc<str>,
    probe: Arc<str>,
    max_size: usize,
    connect_timeout: Option<Duration>,
    wait_timeout: Option<Duration>,
    create_timeout: Option<Duration>,
    recycle_timeout: Option<Duration>,
}

impl Default for PostgresConnector {
    fn default() -> Self {
        Self {
            statement: Arc::from(DEFAULT_STATEMENT),
            probe: Arc::from(DEFAULT_PROBE),
            max_size: PoolConfig::MAX_SIZE,
            connect_timeout: None,
            wait_timeout: None,
            create_timeout: None,
            recycle_timeout: None,
        }
    }
}

impl PostgresConnector {
    pub fn from_config(c: &ClockConfig) -> Self {
        Self {
            statement: Arc::from(c.statement.as_str()),
            probe: Arc::from(c.probe.as_str()),
            max_size: c.pool.max_size,
            connect_timeout: c.connect_timeout,
            wait_timeout: c.pool.wait_timeout,
            create_timeout: c.pool.create_timeout,
            recycle_timeout: c.pool.recycle_timeout,
        }
    }

    pub fn statement(mut self, statement: &str) -> Self {
        self.statement = Arc::from(statement);
        self
    }

    pub fn probe(mut self, probe: &str) -> Self {
        self.probe = Arc::from(probe);
        self
    }

    pub fn max_size(mut self, size: usize) -> Self {
        self.max_size = size;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout.replace(timeout);
        self
    }

    pub fn wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout.replace(timeout);
        self
    }

    fn build_pool(&self, target: &str) -> Result<Pool> {
        let mut config = target.parse::<tokio_postgres::Config>()?;
        if let Some(timeout) = self.connect_timeout {
            config.connect_timeout(timeout);
        }

        let pool = Pool::builder(Manager { config })
            .max_size(self.max_size)
            .wait_timeout(self.wait_timeout)
            .create_timeout(self.create_timeout)
            .recycle_timeout(self.recycle_timeout)
            .runtime(Runtime::Tokio1)
            .build()?;

        Ok(pool)
    }
}

#[async_trait]
impl Connector for PostgresConnector {
    async fn connect(&self, target: &str) -> Result<Arc<dyn Authority>> {
        let pool = self.build_pool(target)?;
        let id = super::next_id();

        info!(
            "initialize postgres pool #{} for wall clock authority: max_size={}",
            id, self.max_size
        );

        Ok(Arc::new(PostgresAuthority {
            id,
            pool,
            statement: Clone::clone(&self.statement),
            probe: Clone::clone(&self.probe),
        }))
    }
}

pub struct PostgresAuthority {
    id: u64,
    pool: Pool,
    statement: Arc<str>,
    probe: Arc<str>,
}

#[async_trait]
impl Authority for PostgresAuthority {
    fn id(&self) -> u64 {
        self.id
    }

    async fn ping(&self) -> Result<()> {
        let c = self.pool.get().await?;
        c.simple_query(&self.probe).await?;
        Ok(())
    }

    async fn next_tsn(&self) -> Result<Tsn> {
        let c = self.pool.get().await?;
        let messages = c.simple_query(&self.statement).await?;

        let rows = messages
            .iter()
            .filter_map(|it| match it {
                SimpleQueryMessage::Row(row) => {
                    Some((0..row.len()).map(|i| row.get(i)).collect::<Vec<_>>())
                }
                _ => None,
            })
            .collect::<Vec<_>>();

        scalar(&rows[..])
    }

    fn close(&self) {
        debug!("close postgres pool #{}", self.id);
        self.pool.close();
    }
}

/// Decodes a result set which must hold exactly one row of one bigint.
fn scalar(rows: &[Vec<Option<&str>>]) -> Result<Tsn> {
    let row = match rows {
        [row] => row,
        [] => bail!("no row returned"),
        _ => bail!("expect exactly one row, got {}", rows.len()),
    };

    let cell = match &row[..] {
        [cell] => cell,
        _ => bail!("expect exactly one column, got {}", row.len()),
    };

    match cell {
        Some(s) => s
            .parse::<Tsn>()
            .map_err(|e| anyhow!("cannot decode '{}' as bigint: {}", s, e)),
        None => bail!("null value returned"),
    }
}

pub struct Manager {
    config: tokio_postgres::Config,
}

impl managed::Manager for Manager {
    type Type = Client;
    type Error = tokio_postgres::Error;

    async fn create(&self) -> std::result::Result<Self::Type, Self::Error> {
        let (client, connection) = self.config.connect(NoTls).await?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("postgres connection of wall clock broken: {}", e);
            }
        });

        debug!("connect postgres ok");

        Ok(client)
    }

    async fn recycle(&self, c: &mut Self::Type, _metrics: &Metrics) -> RecycleResult<Self::Error> {
        if c.is_closed() {
            return Err(RecycleError::Message("connection is closed".into()));
        }
        Ok(())
    }
}
