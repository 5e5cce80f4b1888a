//! JSON Web Tokens for authenticating API requests.

use axum::{
    RequestPartsExt,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{Error, user::UserId};

/// The keys for signing and verifying tokens, derived from the server's secret.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKeys {
    /// Create HMAC keys from `secret`.
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// The contents of a JSON Web Token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// The ID of the user the token was issued to.
    pub sub: i64,
    /// The expiry time of the token as a Unix timestamp.
    pub exp: i64,
    /// The time the token was issued as a Unix timestamp.
    pub iat: i64,
}

impl Claims {
    /// The user the token was issued to.
    pub fn user_id(&self) -> UserId {
        UserId::new(self.sub)
    }
}

impl<S> FromRequestParts<S> for Claims
where
    JwtKeys: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| Error::InvalidToken)?;

        decode_jwt(bearer.token(), &JwtKeys::from_ref(state))
    }
}

/// Issue a token for `user_id` that expires after `duration`.
///
/// # Errors
/// Returns [Error::TokenCreation] if the token could not be signed.
pub fn encode_jwt(user_id: UserId, duration: Duration, keys: &JwtKeys) -> Result<String, Error> {
    let now = OffsetDateTime::now_utc();
    let claims = Claims {
        sub: user_id.as_i64(),
        exp: (now + duration).unix_timestamp(),
        iat: now.unix_timestamp(),
    };

    encode(&Header::default(), &claims, &keys.encoding).map_err(|error| {
        tracing::error!("could not sign token: {error}");
        Error::TokenCreation
    })
}

/// Verify `token` and return its claims.
///
/// # Errors
/// Returns [Error::InvalidToken] if the signature is wrong, the token has expired, or it was not
/// issued to a user.
pub fn decode_jwt(token: &str, keys: &JwtKeys) -> Result<Claims, Error> {
    let claims = decode::<Claims>(token, &keys.decoding, &Validation::default())
        .map_err(|error| {
            tracing::debug!("rejected token: {error}");
            Error::InvalidToken
        })?
        .claims;

    if claims.sub == 0 {
        return Err(Error::InvalidToken);
    }

    Ok(claims)
}
