//! # Nebula Resource Pool
//!
//! A bounded pool of expensive-to-create, reusable resources (database
//! connections, sessions, clients) shared by concurrent tasks.
//!
//! - idle resources are handed out immediately, warmest first;
//! - an empty pool below capacity grows by one resource at a time in the
//!   background while callers wait;
//! - an empty pool at capacity blocks callers until a lease is returned;
//! - idle resources that fail the factory's liveness check are destroyed
//!   and never handed out.
//!
//! ```no_run
//! use nebula_pool::{Factory, FactoryError, Pool, PoolConfig};
//!
//! struct Sessions;
//!
//! impl Factory for Sessions {
//!     type Resource = String;
//!
//!     async fn create(&self) -> Result<String, FactoryError> {
//!         Ok("session".to_string())
//!     }
//! }
//!
//! # async fn run() -> nebula_pool::Result<()> {
//! let pool = Pool::new(Sessions, PoolConfig::new(2, 9)).await?;
//! let session = pool.acquire().await?;
//! assert_eq!(*session, "session");
//! pool.release(session)?;
//! pool.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod factory;
pub mod lease;
pub mod pool;

pub use error::{BoxError, FactoryError, PoolError, Result};
pub use factory::Factory;
pub use lease::{Lease, LeaseId};
pub use pool::{Pool, PoolConfig, PoolStats};
