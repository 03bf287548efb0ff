//! Test infrastructure for the clinic crates.
//!
//! - [`TestDatabase`] (feature `postgres`, default): Postgres 18 container
//!   with every migration applied, so the DCI seed is present
//! - [`TestRedis`] (feature `redis`): Redis 8 container for token store tests
//! - [`TestDataBuilder`]: per-test unique emails, article codes and lot numbers
//!
//! Container tests are `#[ignore = "requires Docker"]`; run them with
//! `cargo test -- --ignored`.
//!
//! ```rust,no_run
//! use test_utils::{TestDataBuilder, TestDatabase};
//!
//! # async fn example() {
//! let db = TestDatabase::new().await;
//! let data = TestDataBuilder::from_test_name("checkout_decrements_lots");
//! let code = data.article_code("para");
//! # }
//! ```

use std::hash::{DefaultHasher, Hash, Hasher};
use uuid::Uuid;

#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "redis")]
mod redis;

#[cfg(feature = "postgres")]
pub use postgres::TestDatabase;
#[cfg(feature = "redis")]
pub use redis::TestRedis;

/// Values unique to one test, stable across runs.
///
/// Tests sharing a container still get disjoint emails and codes as long
/// as their names differ.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn from_test_name(name: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    fn short(&self) -> u64 {
        self.seed % 100_000
    }

    /// Actor id for history entries and cart owners.
    pub fn user_id(&self) -> Uuid {
        Uuid::from_u64_pair(self.seed, !self.seed)
    }

    /// `test-{prefix}-{seed}-{suffix}`
    pub fn name(&self, prefix: &str, suffix: &str) -> String {
        format!("test-{}-{}-{}", prefix, self.seed, suffix)
    }

    /// `{local}-{seed}@clinic.test`
    pub fn email(&self, local: &str) -> String {
        format!("{}-{}@clinic.test", local, self.seed)
    }

    /// `ART-{n}-{SUFFIX}`, cut to the 50 characters the column allows.
    pub fn article_code(&self, suffix: &str) -> String {
        let mut code = format!("ART-{}-{}", self.short(), suffix.to_uppercase());
        code.truncate(50);
        code
    }

    /// `LOT-{n}-{suffix}`
    pub fn lot_number(&self, suffix: &str) -> String {
        format!("LOT-{}-{}", self.short(), suffix)
    }
}
