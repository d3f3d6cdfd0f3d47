use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        request::Parts,
        HeaderMap,
    },
    response::{IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, SameSite, SignedCookieJar};
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::db::{User, UserResponse};
use crate::AppState;

/// Name of the signed session cookie
pub const SESSION_COOKIE: &str = "mayanetra_session";

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Session cookie value: `<user_id>:<expires_at_unix>`
fn encode_session(user_id: i64, expires_at: i64) -> String {
    format!("{}:{}", user_id, expires_at)
}

/// User id from a session value that has not expired at `now`.
fn decode_session(value: &str, now: i64) -> Option<i64> {
    let (user_id, expires_at) = value.split_once(':')?;
    let user_id: i64 = user_id.parse().ok()?;
    let expires_at: i64 = expires_at.parse().ok()?;
    (expires_at > now).then_some(user_id)
}

/// Unix time `ttl_days` after `now`, saturating at the latest representable instant.
fn session_expiry(now: DateTime<Utc>, ttl_days: i64) -> i64 {
    chrono::Duration::try_days(ttl_days)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
        .timestamp()
}

/// Add a persistent session cookie for `user` to the jar.
pub fn start_session(jar: SignedCookieJar, user: &User, ttl_days: i64) -> SignedCookieJar {
    let expires_at = session_expiry(Utc::now(), ttl_days);
    jar.add(
        Cookie::build((SESSION_COOKIE, encode_session(user.id, expires_at)))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .permanent()
            .build(),
    )
}

pub fn end_session(jar: SignedCookieJar) -> SignedCookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

/// Id of the logged-in user, if the jar carries a valid, unexpired session.
pub fn session_user_id(jar: &SignedCookieJar) -> Option<i64> {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| decode_session(cookie.value(), Utc::now().timestamp()))
}

/// Whether the client expects JSON rather than an HTML page.
pub fn wants_json(headers: &HeaderMap) -> bool {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default();
    if content_type.starts_with("application/json") {
        return true;
    }

    let requested_with = headers
        .get("X-Requested-With")
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default();
    if requested_with.eq_ignore_ascii_case("XMLHttpRequest") {
        return true;
    }

    let accept = headers
        .get(ACCEPT)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default();
    accept.contains("application/json") && !accept.contains("text/html")
}

/// The authenticated user behind the request's session cookie.
///
/// Rejects browser navigations with a redirect to `/login` and API-style
/// requests with `401`. A session whose user is gone is also cleared.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let deny = |headers: &HeaderMap| {
            if wants_json(headers) {
                ApiError::unauthorized("Authentication required").into_response()
            } else {
                Redirect::to("/login").into_response()
            }
        };

        let jar = SignedCookieJar::from_headers(&parts.headers, state.cookie_key.clone());
        let Some(user_id) = session_user_id(&jar) else {
            return Err(deny(&parts.headers));
        };

        let db = state.db().map_err(IntoResponse::into_response)?;
        match User::find_by_id(db, user_id).await {
            Ok(Some(user)) => Ok(CurrentUser(user)),
            // Stale session for a deleted account
            Ok(None) => {
                tracing::debug!(user_id, "Session user no longer exists");
                Err((end_session(jar), deny(&parts.headers)).into_response())
            }
            Err(e) => Err(ApiError::from(e).into_response()),
        }
    }
}

/// Identity of the current session
///
/// GET /me
pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from(user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_password_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert_ne!(hash, "correct horse");
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_garbage_hash() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn test_session_value_expiry() {
        let value = encode_session(7, 1_000);
        assert_eq!(decode_session(&value, 999), Some(7));
        assert_eq!(decode_session(&value, 1_000), None);
        assert_eq!(decode_session("7", 0), None);
        assert_eq!(decode_session("seven:1000", 0), None);
    }

    #[test]
    fn test_session_expiry_saturates() {
        let now = Utc::now();
        assert_eq!(session_expiry(now, 30), now.timestamp() + 30 * 24 * 60 * 60);
        assert_eq!(session_expiry(now, i64::MAX), DateTime::<Utc>::MAX_UTC.timestamp());
        assert_eq!(
            session_expiry(now, 100_000_000_000_000),
            DateTime::<Utc>::MAX_UTC.timestamp()
        );
    }

    #[test]
    fn test_wants_json() {
        let mut headers = HeaderMap::new();
        assert!(!wants_json(&headers));

        headers.insert(ACCEPT, HeaderValue::from_static("text/html,application/xhtml+xml"));
        assert!(!wants_json(&headers));

        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        assert!(wants_json(&headers));

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json; charset=utf-8"));
        assert!(wants_json(&headers));

        let mut headers = HeaderMap::new();
        headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));
        assert!(wants_json(&headers));
    }
}
