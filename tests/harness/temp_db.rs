use tempfile::TempDir;

use pitboss::adapter::outbound::sqlite::database::connection::{create_pool_with, SqlitePragmas};
use pitboss::adapter::outbound::sqlite::{run_migrations, DbPool};
use pitboss::testkit::app::{fast_settings, TestApp};

/// File-backed SQLite database for tests that need several connections.
pub struct TempDb {
    // Held for the lifetime of the pool; removed on drop.
    _dir: TempDir,
    pool: DbPool,
}

impl TempDb {
    pub fn create() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("pitboss.db");
        let pool = create_pool_with(
            &path.to_string_lossy(),
            5,
            SqlitePragmas::default(),
        )
        .expect("create sqlite pool");
        run_migrations(&pool).expect("run migrations");
        Self { _dir: dir, pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// A test app wired over this database.
    pub fn app(&self) -> TestApp {
        TestApp::with_pool(self.pool.clone(), &fast_settings())
    }
}
