//! Cookie builders for access and refresh tokens.
//!
//! Browser clients receive both tokens as HttpOnly cookies; API clients use the
//! JSON body instead. The refresh cookie is scoped to `/auth` so it is only ever
//! sent to the refresh and logout endpoints.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

/// Cookie name for the access token.
pub const SHOPDESK_ACCESS_TOKEN: &str = "shopdesk_access_token";

/// Cookie name for the refresh token.
pub const SHOPDESK_REFRESH_TOKEN: &str = "shopdesk_refresh_token";

const REFRESH_COOKIE_PATH: &str = "/auth";

fn token_cookie(
    name: &'static str,
    value: String,
    path: &'static str,
    domain: String,
    max_age: Duration,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .path(path)
        .domain(domain)
        .max_age(max_age)
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Set the access-token cookie on the jar, living as long as the token.
///
/// ```
/// use axum_extra::extract::cookie::CookieJar;
/// use shopdesk_auth_types::cookie::{set_access_token_cookie, SHOPDESK_ACCESS_TOKEN};
///
/// let jar = set_access_token_cookie(CookieJar::new(), "a".to_string(), "shop.test".to_string(), 3600);
/// let cookie = jar.get(SHOPDESK_ACCESS_TOKEN).unwrap();
/// assert_eq!(cookie.path(), Some("/"));
/// assert_eq!(cookie.max_age(), Some(time::Duration::seconds(3600)));
/// assert!(cookie.http_only().unwrap_or(false));
/// ```
pub fn set_access_token_cookie(
    jar: CookieJar,
    value: String,
    domain: String,
    max_age_secs: u64,
) -> CookieJar {
    jar.add(token_cookie(
        SHOPDESK_ACCESS_TOKEN,
        value,
        "/",
        domain,
        Duration::seconds(max_age_secs as i64),
    ))
}

/// Set the refresh-token cookie on the jar.
///
/// ```
/// use axum_extra::extract::cookie::CookieJar;
/// use shopdesk_auth_types::cookie::{set_refresh_token_cookie, SHOPDESK_REFRESH_TOKEN};
///
/// let jar = set_refresh_token_cookie(CookieJar::new(), "r".to_string(), "shop.test".to_string(), 604800);
/// let cookie = jar.get(SHOPDESK_REFRESH_TOKEN).unwrap();
/// assert_eq!(cookie.path(), Some("/auth"));
/// assert_eq!(cookie.domain(), Some("shop.test"));
/// assert!(cookie.secure().unwrap_or(false));
/// ```
pub fn set_refresh_token_cookie(
    jar: CookieJar,
    value: String,
    domain: String,
    max_age_secs: u64,
) -> CookieJar {
    jar.add(token_cookie(
        SHOPDESK_REFRESH_TOKEN,
        value,
        REFRESH_COOKIE_PATH,
        domain,
        Duration::seconds(max_age_secs as i64),
    ))
}

/// Clear both token cookies by setting Max-Age to 0.
///
/// ```
/// use axum_extra::extract::cookie::CookieJar;
/// use shopdesk_auth_types::cookie::{clear_cookies, SHOPDESK_ACCESS_TOKEN, SHOPDESK_REFRESH_TOKEN};
///
/// let jar = clear_cookies(CookieJar::new(), "shop.test".to_string());
/// assert_eq!(jar.get(SHOPDESK_ACCESS_TOKEN).unwrap().max_age(), Some(time::Duration::ZERO));
/// assert_eq!(jar.get(SHOPDESK_REFRESH_TOKEN).unwrap().max_age(), Some(time::Duration::ZERO));
/// ```
pub fn clear_cookies(jar: CookieJar, domain: String) -> CookieJar {
    let access = token_cookie(
        SHOPDESK_ACCESS_TOKEN,
        String::new(),
        "/",
        domain.clone(),
        Duration::ZERO,
    );
    let refresh = token_cookie(
        SHOPDESK_REFRESH_TOKEN,
        String::new(),
        REFRESH_COOKIE_PATH,
        domain,
        Duration::ZERO,
    );
    jar.add(access).add(refresh)
}
