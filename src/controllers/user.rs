use chrono::{Duration, Utc};
use regex::Regex;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use tracing::instrument;

use crate::core::error::{self, Error};
use crate::core::store::{CredentialStore, begin_write};
use crate::types::user::{NewUser, Subscription, User, UserChanges};
use crate::utils::password;

const MAX_NAME_LEN: usize = 100;
const MAX_PASSWORD_BYTES: usize = 72;

#[derive(Clone)]
pub(crate) struct UserController {
    pool: SqlitePool,
    bcrypt_cost: u32,
    username_pattern: Regex,
}

impl std::fmt::Debug for UserController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserController")
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("username_pattern", &self.username_pattern.as_str())
            .finish()
    }
}

impl UserController {
    pub(crate) fn new(pool: SqlitePool, bcrypt_cost: u32) -> Result<Self, error::ConfigError> {
        Ok(Self {
            pool,
            bcrypt_cost,
            username_pattern: Regex::new(r"^[a-zA-Z0-9_.-]{3,32}$")?,
        })
    }

    async fn hash(&self, value: &str) -> Result<String, Error> {
        password::hash(value, self.bcrypt_cost).await
    }

    fn validate_username(&self, username: &str) -> Result<(), Error> {
        if !self.username_pattern.is_match(username) {
            return Err(Error::Validation(
                "Username must be 3-32 characters of letters, digits, '.', '_' or '-'".into(),
            ));
        }

        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), Error> {
    let name = name.trim();

    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(Error::Validation(format!(
            "Name must be between 1 and {MAX_NAME_LEN} characters"
        )));
    }

    Ok(())
}

fn validate_password(password: &str) -> Result<(), Error> {
    if password.is_empty() {
        return Err(Error::Validation("Password must not be empty".into()));
    }

    if password.len() > MAX_PASSWORD_BYTES {
        return Err(Error::Validation(format!(
            "Password must be at most {MAX_PASSWORD_BYTES} bytes"
        )));
    }

    Ok(())
}

fn map_unique_violation(e: sqlx::Error) -> Error {
    match e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => Error::DuplicateUsername,
        e => Error::Sql(e),
    }
}

impl CredentialStore for UserController {
    #[instrument(skip(self, user), fields(username = %user.username))]
    async fn create_user(&self, user: NewUser) -> Result<User, Error> {
        self.validate_username(&user.username)?;
        validate_name(&user.name)?;
        validate_password(&user.password)?;

        let password_hash = self.hash(&user.password).await?;

        let mut tx = begin_write(&self.pool).await?;

        let created = sqlx::query(
            "INSERT INTO users (username, name, hashed_password, is_admin, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, username, name, hashed_password, is_admin, created_at;",
        )
        .bind(&user.username)
        .bind(user.name.trim())
        .bind(&password_hash)
        .bind(user.is_admin)
        .bind(Utc::now())
        .map(map_user)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_unique_violation)?;

        tx.commit().await?;

        tracing::info!(id = created.id, is_admin = created.is_admin, "user created");

        Ok(created)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, Error> {
        match sqlx::query(
            "SELECT id, username, name, hashed_password, is_admin, created_at
            FROM users
            WHERE username = ?;",
        )
        .bind(username)
        .map(map_user)
        .fetch_one(&self.pool)
        .await
        {
            Ok(user) => Ok(Some(user)),
            Err(sqlx::Error::RowNotFound) => Ok(None),
            Err(e) => Err(Error::Sql(e)),
        }
    }

    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>, Error> {
        let user = sqlx::query(
            "SELECT id, username, name, hashed_password, is_admin, created_at
            FROM users
            WHERE id = ?;",
        )
        .bind(id)
        .map(map_user)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    #[instrument(skip(self, changes))]
    async fn update_user(&self, id: i64, changes: UserChanges) -> Result<Option<User>, Error> {
        if let Some(username) = &changes.username {
            self.validate_username(username)?;
        }
        if let Some(name) = &changes.name {
            validate_name(name)?;
        }
        let password_hash = match &changes.password {
            Some(password) => {
                validate_password(password)?;
                Some(self.hash(password).await?)
            }
            None => None,
        };

        let mut tx = begin_write(&self.pool).await?;

        let Some(mut user) = sqlx::query(
            "SELECT id, username, name, hashed_password, is_admin, created_at
            FROM users
            WHERE id = ?;",
        )
        .bind(id)
        .map(map_user)
        .fetch_optional(&mut *tx)
        .await?
        else {
            return Ok(None);
        };

        if let Some(username) = changes.username {
            user.username = username;
        }
        if let Some(name) = changes.name {
            user.name = name.trim().to_owned();
        }
        if let Some(password_hash) = password_hash {
            user.password_hash = password_hash;
        }

        sqlx::query(
            "UPDATE users
            SET username = ?, name = ?, hashed_password = ?
            WHERE id = ?;",
        )
        .bind(&user.username)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(map_unique_violation)?;

        tx.commit().await?;

        tracing::info!("user updated");

        Ok(Some(user))
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, id: i64) -> Result<bool, Error> {
        let mut tx = begin_write(&self.pool).await?;

        // widgets and subscriptions follow through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM users WHERE id = ?;")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let deleted = result.rows_affected() > 0;

        if deleted {
            tracing::info!("user deleted");
        }

        Ok(deleted)
    }

    async fn list_users(&self) -> Result<Vec<(User, Option<Subscription>)>, Error> {
        let users = sqlx::query(
            "SELECT
                users.id,
                users.username,
                users.name,
                users.hashed_password,
                users.is_admin,
                users.created_at,
                subscriptions.id AS subscription_id,
                subscriptions.activation_date,
                subscriptions.expiration_date,
                subscriptions.is_active
            FROM
                users
            LEFT JOIN
                subscriptions ON users.id = subscriptions.user_id
            WHERE
                users.is_admin = FALSE
            ORDER BY
                users.id;",
        )
        .map(|row: SqliteRow| {
            let user = map_user_ref(&row);
            let subscription = row
                .get::<Option<i64>, _>("subscription_id")
                .map(|subscription_id| Subscription {
                    id: subscription_id,
                    user_id: user.id,
                    activation_date: row.get("activation_date"),
                    expiration_date: row.get("expiration_date"),
                    is_active: row.get("is_active"),
                });
            (user, subscription)
        })
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn count_users(&self) -> Result<i64, Error> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users;")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn get_subscription(&self, user_id: i64) -> Result<Option<Subscription>, Error> {
        let subscription = sqlx::query(
            "SELECT id, user_id, activation_date, expiration_date, is_active
            FROM subscriptions
            WHERE user_id = ?;",
        )
        .bind(user_id)
        .map(map_subscription)
        .fetch_optional(&self.pool)
        .await?;

        Ok(subscription)
    }

    #[instrument(skip(self))]
    async fn ensure_subscription(&self, user_id: i64) -> Result<Subscription, Error> {
        let now = Utc::now();
        let expiration_date = now + Duration::days(Subscription::VALIDITY_DAYS);

        let mut tx = begin_write(&self.pool).await?;

        let existing = sqlx::query(
            "SELECT id, user_id, activation_date, expiration_date, is_active
            FROM subscriptions
            WHERE user_id = ?;",
        )
        .bind(user_id)
        .map(map_subscription)
        .fetch_optional(&mut *tx)
        .await?;

        let subscription = match existing {
            Some(subscription) if subscription.is_current(now) => return Ok(subscription),
            Some(subscription) => {
                tracing::info!(id = subscription.id, "subscription reactivated");

                sqlx::query(
                    "UPDATE subscriptions
                    SET activation_date = ?, expiration_date = ?, is_active = TRUE
                    WHERE id = ?
                    RETURNING id, user_id, activation_date, expiration_date, is_active;",
                )
                .bind(now)
                .bind(expiration_date)
                .bind(subscription.id)
                .map(map_subscription)
                .fetch_one(&mut *tx)
                .await?
            }
            None => {
                tracing::info!("subscription created");

                sqlx::query(
                    "INSERT INTO subscriptions (user_id, activation_date, expiration_date, is_active)
                    VALUES (?, ?, ?, TRUE)
                    RETURNING id, user_id, activation_date, expiration_date, is_active;",
                )
                .bind(user_id)
                .bind(now)
                .bind(expiration_date)
                .map(map_subscription)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        tx.commit().await?;

        Ok(subscription)
    }
}

fn map_user(row: SqliteRow) -> User {
    map_user_ref(&row)
}

fn map_user_ref(row: &SqliteRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        name: row.get("name"),
        password_hash: row.get("hashed_password"),
        is_admin: row.get("is_admin"),
        created_at: row.get("created_at"),
    }
}

fn map_subscription(row: SqliteRow) -> Subscription {
    Subscription {
        id: row.get("id"),
        user_id: row.get("user_id"),
        activation_date: row.get("activation_date"),
        expiration_date: row.get("expiration_date"),
        is_active: row.get("is_active"),
    }
}
