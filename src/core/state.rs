use chrono::Duration;

use crate::controllers::auth::AuthController;
use crate::controllers::user::UserController;
use crate::controllers::widget::WidgetController;
use crate::core::config::{Args, ErrorPolicy};
use crate::core::error::{ConfigError, Error};
use crate::core::store::{self, CredentialStore};
use crate::types::user::NewUser;

#[derive(Clone, Debug)]
pub struct AppState {
    pub(crate) user_controller: UserController,
    pub(crate) widget_controller: WidgetController,
    pub(crate) auth_controller: AuthController<UserController>,
    pub(crate) error_policy: ErrorPolicy,
}

impl AppState {
    /// Connects to the database, applies migrations and seeds the configured admin.
    pub async fn new(args: &Args) -> Result<Self, ConfigError> {
        args.validate()?;

        let pool = store::connect(&args.database_url, args.max_connections).await?;

        let user_controller = UserController::new(pool.clone(), args.bcrypt_cost)?;

        let state = AppState {
            widget_controller: WidgetController::new(pool),
            auth_controller: AuthController::new(
                user_controller.clone(),
                &args.secret,
                &args.issuer,
                Duration::hours(args.token_ttl_hours),
                args.bcrypt_cost,
            )?,
            user_controller,
            error_policy: args.error_policy,
        };

        if let (Some(username), Some(password)) = (&args.admin_username, &args.admin_password) {
            state.seed_admin(username, password).await?;
        }

        Ok(state)
    }

    async fn seed_admin(&self, username: &str, password: &str) -> Result<(), Error> {
        if self
            .user_controller
            .get_user_by_username(username)
            .await?
            .is_some()
        {
            tracing::debug!(username, "admin account already present");
            return Ok(());
        }

        self.user_controller
            .create_user(NewUser {
                username: username.to_owned(),
                name: "Administrator".to_owned(),
                password: password.to_owned(),
                is_admin: true,
            })
            .await?;

        tracing::info!(username, "seeded admin account");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::test_args;

    #[tokio::test]
    async fn seeds_admin_once() {
        let mut args = test_args();
        args.admin_username = Some("root".into());
        args.admin_password = Some("changeme".into());

        let state = AppState::new(&args).await.unwrap();

        let root = state
            .user_controller
            .get_user_by_username("root")
            .await
            .unwrap()
            .unwrap();
        assert!(root.is_admin);

        state.seed_admin("root", "other").await.unwrap();

        let identity = state
            .auth_controller
            .authenticate("root", "changeme")
            .await
            .unwrap();
        assert!(identity.is_admin);
    }

    #[tokio::test]
    async fn refuses_missing_secret() {
        let mut args = test_args();
        args.secret = String::new();

        assert!(matches!(
            AppState::new(&args).await,
            Err(ConfigError::Invalid(_))
        ));
    }
}
