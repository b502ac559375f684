//! Owner identity resolution.
//!
//! The owner is taken from the `user-id` header, then the `user_id` cookie.
//! When both are missing a fresh id is minted and set as a cookie. Neither
//! source is verified.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use tower_cookies::cookie::SameSite;
use tower_cookies::cookie::time::Duration;
use tower_cookies::{Cookie, Cookies};
use uuid::Uuid;

/// Request header carrying the owner id.
pub const OWNER_HEADER: &str = "user-id";

/// Cookie carrying the owner id.
pub const OWNER_COOKIE: &str = "user_id";

/// Lifetime of a minted owner cookie (five years).
const OWNER_COOKIE_DAYS: i64 = 5 * 365;

/// Identifier of the caller, inserted as a request extension.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OwnerId(pub String);

/// Middleware inserting an [`OwnerId`] into every request.
pub async fn resolve_owner(cookies: Cookies, mut request: Request, next: Next) -> Response {
    let from_header = request
        .headers()
        .get(OWNER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    let owner = match from_header {
        Some(id) => id,
        None => match cookies.get(OWNER_COOKIE) {
            Some(cookie) if !cookie.value().is_empty() => cookie.value().to_string(),
            _ => mint_owner(&cookies),
        },
    };

    request.extensions_mut().insert(OwnerId(owner));
    next.run(request).await
}

fn mint_owner(cookies: &Cookies) -> String {
    let id = Uuid::new_v4().to_string();
    let cookie = Cookie::build((OWNER_COOKIE, id.clone()))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .max_age(Duration::days(OWNER_COOKIE_DAYS))
        .build();
    cookies.add(cookie);
    tracing::debug!("Minted owner id {}", id);
    id
}
