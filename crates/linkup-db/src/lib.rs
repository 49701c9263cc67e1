//! LinkUp DB - Database abstractions
//!
//! SQLx-based persistence for the LinkUp payments ledger.
//!
//! # Example
//!
//! ```rust,ignore
//! use linkup_db::{create_pool, run_migrations, Repositories};
//!
//! let pool = create_pool("postgres://localhost/linkup").await?;
//! run_migrations(&pool).await?;
//! let repos = Repositories::new(pool);
//!
//! let booking = repos.bookings.find_by_id(booking_id).await?;
//! ```

pub mod error;
#[cfg(feature = "memory")]
pub mod memory;
pub mod models;
pub mod pg;
pub mod pool;
pub mod repo;

pub use error::{DbError, DbResult};
#[cfg(feature = "memory")]
pub use memory::MemoryStore;
pub use models::*;
pub use pg::Repositories;
pub use pool::{create_pool, create_pool_with_options, run_migrations, DbPool, PoolOptions};
pub use repo::*;
