pub(crate) mod auth;
pub(crate) mod user;
pub(crate) mod widget;
