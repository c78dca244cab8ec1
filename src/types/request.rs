use serde::Deserialize;

use crate::types::user::{NewUser, UserChanges};

#[derive(Deserialize)]
pub(crate) struct LoginData {
    pub(crate) username: String,
    pub(crate) password: String,
}

#[derive(Deserialize)]
pub(crate) struct UpdatePasswordData {
    pub(crate) current_password: String,
    pub(crate) new_password: String,
}

#[derive(Deserialize)]
pub(crate) struct NewUserData {
    pub(crate) username: String,
    pub(crate) name: String,
    pub(crate) password: String,
}

impl From<NewUserData> for NewUser {
    fn from(data: NewUserData) -> Self {
        Self {
            username: data.username,
            name: data.name,
            password: data.password,
            is_admin: false,
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct UpdateUserData {
    pub(crate) username: Option<String>,
    pub(crate) name: Option<String>,
    pub(crate) password: Option<String>,
}

impl From<UpdateUserData> for UserChanges {
    fn from(data: UpdateUserData) -> Self {
        Self {
            username: data.username,
            name: data.name,
            password: data.password,
        }
    }
}
