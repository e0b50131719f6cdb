//! Database connection pool example
//!
//! Shares a small pool of simulated database connections between a handful
//! of worker tasks. Run with `RUST_LOG=nebula_pool=debug` to watch the pool
//! grow, hand out and discard connections.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use nebula_pool::{Factory, FactoryError, Pool, PoolConfig};
use tracing_subscriber::EnvFilter;

/// Where the simulated connections point.
#[derive(Debug, Clone)]
struct ConnectionSettings {
    driver: String,
    url: String,
    username: String,
}

impl ConnectionSettings {
    fn validate(&self) -> Result<(), FactoryError> {
        for (field, value) in [
            ("driver", &self.driver),
            ("url", &self.url),
            ("username", &self.username),
        ] {
            if value.is_empty() {
                return Err(FactoryError::new(format!("{field} must not be empty")));
            }
        }
        Ok(())
    }
}

/// A pretend database session.
#[derive(Debug)]
struct Connection {
    serial: u64,
    url: String,
    /// Flipped when the server drops the session.
    broken: Arc<AtomicBool>,
}

impl Connection {
    async fn query(&self, sql: &str) -> String {
        tokio::time::sleep(Duration::from_millis(5)).await;
        // Every fifth connection is dropped by the "server" after its first query.
        if self.serial % 5 == 4 {
            self.broken.store(true, Ordering::SeqCst);
        }
        format!("{} via conn-{} -> ok ({sql})", self.url, self.serial)
    }
}

struct SimulatedDatabase {
    settings: ConnectionSettings,
    next_serial: AtomicU64,
}

impl SimulatedDatabase {
    fn new(settings: ConnectionSettings) -> Result<Self, FactoryError> {
        settings.validate()?;
        Ok(Self {
            settings,
            next_serial: AtomicU64::new(0),
        })
    }
}

impl Factory for SimulatedDatabase {
    type Resource = Connection;

    async fn create(&self) -> Result<Connection, FactoryError> {
        // Opening a connection is the expensive part.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let serial = self.next_serial.fetch_add(1, Ordering::SeqCst);
        tracing::info!(
            serial,
            driver = %self.settings.driver,
            user = %self.settings.username,
            "opened connection"
        );
        Ok(Connection {
            serial,
            url: self.settings.url.clone(),
            broken: Arc::new(AtomicBool::new(false)),
        })
    }

    async fn is_alive(&self, conn: &Connection) -> bool {
        !conn.broken.load(Ordering::SeqCst)
    }

    async fn destroy(&self, conn: Connection) -> Result<(), FactoryError> {
        tracing::info!(serial = conn.serial, "closed connection");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let database = SimulatedDatabase::new(ConnectionSettings {
        driver: "postgres".to_string(),
        url: "postgres://localhost:5432/app".to_string(),
        username: "app".to_string(),
    })?;

    let config = PoolConfig::new(2, 4).with_acquire_timeout(Duration::from_secs(5));
    let pool = Pool::new(database, config).await?;

    let mut workers = Vec::new();
    for worker in 0..8 {
        let pool = pool.clone();
        workers.push(tokio::spawn(async move {
            for round in 0..3 {
                let conn = pool.acquire().await?;
                let reply = conn
                    .query(&format!("SELECT {round} /* worker {worker} */"))
                    .await;
                tracing::info!(worker, %reply, "query finished");
                pool.release(conn)?;
            }
            Ok::<_, nebula_pool::PoolError>(())
        }));
    }

    for worker in workers {
        worker.await??;
    }

    let stats = pool.stats();
    println!(
        "created={} discarded={} idle={} busy={} acquisitions={}",
        stats.created, stats.discarded, stats.idle, stats.busy, stats.total_acquisitions
    );

    pool.shutdown().await;
    Ok(())
}
