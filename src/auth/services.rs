pub(crate) use crate::auth::dto::{Claims, JwtKeys, UserContext};
use crate::config::JwtConfig;
use crate::error::AppError;
use crate::state::AppState;
use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::{async_trait, extract::{FromRef, FromRequestParts}, http::request::Parts};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use regex::Regex;
use std::time::Duration;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, error, warn};
use uuid::Uuid;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

impl From<&JwtConfig> for JwtKeys {
    fn from(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::from_secs((cfg.ttl_minutes.max(1) as u64) * 60),
        }
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        JwtKeys::from(&state.config.jwt)
    }
}

impl JwtKeys {
    pub fn sign(&self, user_id: Uuid) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

/// Resolves a bearer token to the user it was issued for.
pub async fn verify_identity(state: &AppState, token: &str) -> Result<UserContext, AppError> {
    let keys = JwtKeys::from_ref(state);
    let claims = keys.verify(token).map_err(|e| {
        warn!(error = %e, "invalid or expired token");
        AppError::unauthorized("Invalid or expired token")
    })?;

    let user = state
        .store
        .find_user_by_id(claims.sub)
        .await?
        .ok_or_else(|| {
            warn!(user_id = %claims.sub, "token for unknown user");
            AppError::unauthorized("User not found")
        })?;

    Ok(UserContext {
        id: user.id,
        name: user.name,
        email: user.email,
    })
}


/// Authenticated caller, resolved from `Authorization: Bearer <token>`.
pub struct AuthUser(pub UserContext);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or_else(|| AppError::unauthorized("Invalid Authorization header"))?;

        verify_identity(state, token.trim()).await.map(AuthUser)
    }
}

#[cfg(test)]
mod jwt_tests {
    use super::*;
    use crate::models::NewUser;

    fn make_keys(issuer: &str, audience: &str) -> JwtKeys {
        JwtKeys::from(&JwtConfig {
            secret: "same-secret".into(),
            issuer: issuer.into(),
            audience: audience.into(),
            ttl_minutes: 5,
        })
    }

    #[test]
    fn sign_and_verify_token() {
        let keys = JwtKeys::from_ref(&AppState::fake());
        let user_id = Uuid::new_v4();
        let token = keys.sign(user_id).expect("sign");
        let claims = keys.verify(&token).expect("verify token");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn verify_rejects_wrong_issuer_or_audience() {
        let good_keys = make_keys("good-iss", "good-aud");
        let bad_keys = make_keys("bad-iss", "bad-aud");
        let token = good_keys.sign(Uuid::new_v4()).expect("sign");
        assert!(bad_keys.verify(&token).is_err());
    }

    #[tokio::test]
    async fn verify_identity_resolves_known_user() {
        let state = AppState::fake();
        let user = state
            .store
            .insert_user(&NewUser {
                email: "ada@example.com".into(),
                name: "Ada".into(),
                password_hash: "hash".into(),
            })
            .await
            .unwrap();
        let token = JwtKeys::from_ref(&state).sign(user.id).unwrap();

        let ctx = verify_identity(&state, &token).await.expect("identity");
        assert_eq!(ctx.id, user.id);
        assert_eq!(ctx.name, "Ada");
        assert_eq!(ctx.email, "ada@example.com");
    }

    #[tokio::test]
    async fn verify_identity_rejects_unknown_user_and_garbage() {
        let state = AppState::fake();
        let token = JwtKeys::from_ref(&state).sign(Uuid::new_v4()).unwrap();
        assert!(matches!(
            verify_identity(&state, &token).await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            verify_identity(&state, "not-a-jwt").await,
            Err(AppError::Unauthorized(_))
        ));
    }

    fn parts_with(authorization: Option<&str>) -> Parts {
        let mut builder = axum::http::Request::builder().uri("/forked/users/profile");
        if let Some(value) = authorization {
            builder = builder.header(axum::http::header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn extractor_requires_bearer_header() {
        let state = AppState::fake();
        let user = state
            .store
            .insert_user(&NewUser {
                email: "ada@example.com".into(),
                name: "Ada".into(),
                password_hash: "hash".into(),
            })
            .await
            .unwrap();
        let token = JwtKeys::from_ref(&state).sign(user.id).unwrap();

        for header in [None, Some("Token abc"), Some("Bearer"), Some("Bearer not-a-jwt")] {
            let res = AuthUser::from_request_parts(&mut parts_with(header), &state).await;
            assert!(matches!(res, Err(AppError::Unauthorized(_))), "{header:?}");
        }

        for header in [format!("Bearer {token}"), format!("bearer  {token} ")] {
            let res = AuthUser::from_request_parts(&mut parts_with(Some(&header)), &state).await;
            let Ok(AuthUser(ctx)) = res else {
                panic!("rejected {header:?}");
            };
            assert_eq!(ctx.id, user.id);
            assert_eq!(ctx.email, "ada@example.com");
        }
    }
}
