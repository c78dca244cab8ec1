pub(crate) mod auth;
pub(crate) mod envelope;
pub(crate) mod password;
