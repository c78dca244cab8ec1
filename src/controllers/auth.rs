use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use tracing::instrument;

use crate::core::error::{self, Error};
use crate::core::store::CredentialStore;
use crate::types::user::{Claims, Identity, UserChanges};
use crate::utils::password::verify as verify_password;

/// Issues and verifies bearer tokens on top of a [`CredentialStore`].
#[derive(Clone)]
pub(crate) struct AuthController<S> {
    store: S,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    ttl: Duration,
    dummy_hash: String,
}

impl<S> std::fmt::Debug for AuthController<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthController")
            .field("issuer", &self.issuer)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl<S: CredentialStore> AuthController<S> {
    pub(crate) fn new(
        store: S,
        jwt_secret: &str,
        issuer: &str,
        ttl: Duration,
        bcrypt_cost: u32,
    ) -> Result<Self, error::ConfigError> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        validation.set_issuer(&[issuer]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);

        Ok(Self {
            store,
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            validation,
            issuer: issuer.to_owned(),
            ttl,
            dummy_hash: bcrypt::hash("socialqr-timing-equalizer", bcrypt_cost)?,
        })
    }

    /// Unknown usernames and wrong passwords fail identically, and both pay for
    /// one bcrypt verification.
    #[instrument(skip(self, password))]
    pub(crate) async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Identity, Error> {
        let Some(user) = self.store.get_user_by_username(username).await? else {
            let _ = verify_password(password, &self.dummy_hash).await;
            return Err(Error::InvalidCredentials);
        };

        if let false = verify_password(password, &user.password_hash).await? {
            return Err(Error::InvalidCredentials);
        }

        Ok(Identity::from(&user))
    }

    /// Authenticates, makes sure the user holds a live subscription and hands
    /// out a token with the default lifetime.
    pub(crate) async fn login(&self, username: &str, password: &str) -> Result<String, Error> {
        let identity = self.authenticate(username, password).await?;

        self.store.ensure_subscription(identity.id).await?;

        let token = self.issue_token(&identity, None)?;

        tracing::info!(username = %identity.username, "login succeeded");

        Ok(token)
    }

    pub(crate) fn issue_token(
        &self,
        identity: &Identity,
        ttl: Option<Duration>,
    ) -> Result<String, Error> {
        let current_time = Utc::now();
        let expiration_time = current_time + ttl.unwrap_or(self.ttl);

        let claims = Claims {
            exp: expiration_time.timestamp().max(0) as usize,
            iat: current_time.timestamp() as usize,
            sub: identity.username.clone(),
            iss: self.issuer.clone(),
        };

        Ok(jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &self.encoding_key,
        )?)
    }

    fn decode_jwt(&self, token: &str) -> Option<Claims> {
        match jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(token_data) => Some(token_data.claims),
            Err(e) => {
                tracing::debug!("rejected token: {}", e);
                None
            }
        }
    }

    /// `Ok(None)` covers a missing, malformed or expired token as well as a
    /// subject that no longer exists. `Err` only signals a store failure.
    pub(crate) async fn resolve(&self, token: Option<&str>) -> Result<Option<Identity>, Error> {
        let Some(claims) = token.and_then(|token| self.decode_jwt(token)) else {
            return Ok(None);
        };

        let user = self.store.get_user_by_username(&claims.sub).await?;

        Ok(user.as_ref().map(Identity::from))
    }

    pub(crate) async fn resolve_required(&self, token: Option<&str>) -> Result<Identity, Error> {
        self.resolve(token)
            .await?
            .ok_or(Error::TokenExpiredOrInvalid)
    }

    #[instrument(skip_all, fields(username = %identity.username))]
    pub(crate) async fn change_password(
        &self,
        identity: &Identity,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), Error> {
        self.authenticate(&identity.username, current_password)
            .await?;

        let changes = UserChanges {
            password: Some(new_password.to_owned()),
            ..Default::default()
        };

        self.store
            .update_user(identity.id, changes)
            .await?
            .ok_or(Error::TokenExpiredOrInvalid)?;

        Ok(())
    }
}

pub(crate) fn require_admin(identity: &Identity) -> Result<&Identity, Error> {
    match identity.is_admin {
        true => Ok(identity),
        false => {
            tracing::warn!(username = %identity.username, "admin access denied");
            Err(Error::InsufficientRole)
        }
    }
}
