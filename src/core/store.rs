use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use std::str::FromStr;
use std::time::Duration;

use crate::core::error::{ConfigError, Error};
use crate::types::user::{NewUser, Subscription, User, UserChanges};
use crate::types::widget::{NewWidget, Widget, WidgetPatch};

/// Users and their subscriptions.
///
/// Lookups report absence as `Ok(None)`; `Err` is reserved for validation and
/// infrastructure failures.
pub(crate) trait CredentialStore {
    async fn create_user(&self, user: NewUser) -> Result<User, Error>;

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, Error>;

    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>, Error>;

    async fn update_user(&self, id: i64, changes: UserChanges) -> Result<Option<User>, Error>;

    /// Removes the user together with their widgets and subscription.
    async fn delete_user(&self, id: i64) -> Result<bool, Error>;

    async fn list_users(&self) -> Result<Vec<(User, Option<Subscription>)>, Error>;

    /// Every account, administrators included.
    async fn count_users(&self) -> Result<i64, Error>;

    async fn get_subscription(&self, user_id: i64) -> Result<Option<Subscription>, Error>;

    /// Creates a one-year subscription if none exists, or restarts the window of
    /// an inactive or expired one.
    async fn ensure_subscription(&self, user_id: i64) -> Result<Subscription, Error>;
}

/// Widgets scoped to their owner. A widget owned by someone else is
/// indistinguishable from one that does not exist.
pub(crate) trait WidgetStore {
    async fn create_widget(&self, owner: i64, widget: NewWidget) -> Result<Widget, Error>;

    async fn list_widgets(&self, owner: i64) -> Result<Vec<Widget>, Error>;

    async fn get_widget(&self, owner: i64, id: i64) -> Result<Option<Widget>, Error>;

    async fn update_widget(
        &self,
        owner: i64,
        id: i64,
        patch: WidgetPatch,
    ) -> Result<Option<Widget>, Error>;

    async fn delete_widget(&self, owner: i64, id: i64) -> Result<bool, Error>;

    /// Widgets across all owners.
    async fn count_widgets(&self) -> Result<i64, Error>;
}

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) async fn connect(
    database_url: &str,
    max_connections: u32,
) -> Result<SqlitePool, ConfigError> {
    let in_memory = database_url.contains(":memory:");

    let mut options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT);

    if !in_memory {
        options = options.journal_mode(SqliteJournalMode::Wal);
    }

    // every pooled connection to an in-memory database would open its own copy
    let max_connections = if in_memory { 1 } else { max_connections };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    sqlx::migrate!().run(&pool).await?;

    Ok(pool)
}

/// Opens a transaction holding the write lock from its first statement, so a
/// read followed by a write never has to upgrade its lock under contention.
pub(crate) async fn begin_write(
    pool: &SqlitePool,
) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
    pool.begin_with("BEGIN IMMEDIATE").await
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    connect("sqlite::memory:", 1).await.unwrap()
}

/// A database file with several pooled connections, for tests that race writers.
#[cfg(test)]
pub(crate) async fn shared_test_pool() -> (tempfile::TempDir, SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("socialqr.db").display());

    let pool = connect(&url, 5).await.unwrap();

    (dir, pool)
}
