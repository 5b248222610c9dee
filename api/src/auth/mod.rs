use actix_web::{dev::Payload, error, Error, FromRequest, HttpMessage, HttpRequest};
use chrono::{Duration, Utc};
use futures::future::{err, ok, Ready};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

mod middleware;

pub use middleware::AuthenticationMiddleware;

/// Tokens are issued by the shop's identity provider with a shared secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub exp: usize,
    pub iat: usize,
}

pub struct AuthenticatedUser {
    pub user_id: String,
    pub email: Option<String>,
}

impl AuthenticatedUser {
    /// Stored with each new record as `recorded_by`.
    pub fn display_name(&self) -> &str {
        self.email.as_deref().unwrap_or(&self.user_id)
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // Claims are placed in the extensions by the authentication middleware
        match req.extensions().get::<Claims>() {
            Some(claims) => ok(AuthenticatedUser {
                user_id: claims.sub.clone(),
                email: claims.email.clone(),
            }),
            None => err(error::ErrorUnauthorized("User not authenticated")),
        }
    }
}

pub fn create_token(
    user_id: &str,
    email: Option<&str>,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, Error> {
    let now = Utc::now();
    let exp = (now + Duration::seconds(expiration_seconds as i64)).timestamp() as usize;
    let iat = now.timestamp() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        email: email.map(str::to_string),
        exp,
        iat,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| error::ErrorInternalServerError(format!("Token creation error: {}", e)))
}

pub fn validate_token(token: &str, secret: &str) -> Result<Claims, Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            error::ErrorUnauthorized("Token expired")
        }
        _ => error::ErrorUnauthorized("Invalid token"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_tokens_validate_with_the_same_secret() {
        let token = create_token("user-1", Some("owner@shop.test"), "secret", 60).unwrap();
        let claims = validate_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.email.as_deref(), Some("owner@shop.test"));

        assert!(validate_token(&token, "other-secret").is_err());
    }
}
