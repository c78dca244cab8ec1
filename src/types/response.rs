use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::error::ErrorKind;
use crate::types::user::{self, Subscription};

/// Uniform wrapper for every response body.
#[derive(Debug, Serialize)]
pub(crate) struct ApiResponse<T> {
    pub(crate) success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<ErrorBody>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorBody {
    pub(crate) kind: ErrorKind,
    pub(crate) message: String,
}

impl<T> ApiResponse<T> {
    pub(crate) const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub(crate) fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorBody {
                kind,
                message: message.into(),
            }),
        }
    }
}

#[derive(Serialize)]
pub(crate) struct Token {
    pub(crate) access_token: String,
    pub(crate) token_type: &'static str,
}

impl Token {
    pub(crate) fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer",
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct Dashboard {
    pub(crate) total_users: i64,
    pub(crate) total_widgets: i64,
}

#[derive(Serialize)]
pub(crate) struct AuthStatus {
    pub(crate) authenticated: bool,
    pub(crate) is_admin: bool,
    pub(crate) username: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct User {
    pub(crate) id: i64,
    pub(crate) username: String,
    pub(crate) name: String,
    pub(crate) is_admin: bool,
    pub(crate) created_at: DateTime<Utc>,
}

impl From<&user::User> for User {
    fn from(user: &user::User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            name: user.name.clone(),
            is_admin: user.is_admin,
            created_at: user.created_at,
        }
    }
}

#[derive(Serialize)]
pub(crate) struct AdminUser {
    #[serde(flatten)]
    pub(crate) user: User,
    pub(crate) subscription: Option<Subscription>,
}

impl AdminUser {
    pub(crate) fn new(user: &user::User, subscription: Option<Subscription>) -> Self {
        Self {
            user: User::from(user),
            subscription,
        }
    }
}

#[derive(Serialize)]
pub(crate) struct SubscriptionStatus {
    pub(crate) is_active: bool,
    pub(crate) expiration_date: Option<DateTime<Utc>>,
}

impl SubscriptionStatus {
    pub(crate) fn new(subscription: Option<&Subscription>, now: DateTime<Utc>) -> Self {
        match subscription {
            Some(subscription) => Self {
                is_active: subscription.is_current(now),
                expiration_date: Some(subscription.expiration_date),
            },
            None => Self {
                is_active: false,
                expiration_date: None,
            },
        }
    }
}

#[derive(Serialize)]
pub(crate) struct Detail {
    pub(crate) detail: &'static str,
}

impl Detail {
    pub(crate) const fn new(detail: &'static str) -> Self {
        Self { detail }
    }
}
