use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub(crate) type Username = String;

#[derive(Clone, Debug)]
pub(crate) struct User {
    pub(crate) id: i64,
    pub(crate) username: Username,
    pub(crate) name: String,
    pub(crate) password_hash: String,
    pub(crate) is_admin: bool,
    pub(crate) created_at: DateTime<Utc>,
}

/// The caller resolved from a bearer token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Identity {
    pub(crate) id: i64,
    pub(crate) username: Username,
    pub(crate) is_admin: bool,
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            is_admin: user.is_admin,
        }
    }
}

#[derive(Deserialize, Serialize, Debug)]
pub(crate) struct Claims {
    pub(crate) exp: usize,
    pub(crate) iat: usize,
    pub(crate) sub: String,
    pub(crate) iss: String,
}

#[derive(Clone, Debug, Serialize)]
pub(crate) struct Subscription {
    pub(crate) id: i64,
    pub(crate) user_id: i64,
    pub(crate) activation_date: DateTime<Utc>,
    pub(crate) expiration_date: DateTime<Utc>,
    pub(crate) is_active: bool,
}

impl Subscription {
    pub(crate) const VALIDITY_DAYS: i64 = 365;

    /// Active flag set and expiration still ahead of `now`.
    pub(crate) fn is_current(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expiration_date > now
    }
}

pub(crate) struct NewUser {
    pub(crate) username: Username,
    pub(crate) name: String,
    pub(crate) password: String,
    pub(crate) is_admin: bool,
}

/// Fields left as `None` keep their stored value.
#[derive(Default)]
pub(crate) struct UserChanges {
    pub(crate) username: Option<Username>,
    pub(crate) name: Option<String>,
    pub(crate) password: Option<String>,
}
