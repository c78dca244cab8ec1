//! bcrypt runs on the blocking pool so hashing does not stall request workers.

use crate::core::error::Error;

pub(crate) async fn hash(password: &str, cost: u32) -> Result<String, Error> {
    let password = password.to_owned();

    Ok(tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??)
}

pub(crate) async fn verify(password: &str, hash: &str) -> Result<bool, Error> {
    let password = password.to_owned();
    let hash = hash.to_owned();

    Ok(tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??)
}
