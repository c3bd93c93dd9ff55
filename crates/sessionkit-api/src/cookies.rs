//! Token cookies
//!
//! Both tokens travel as `HttpOnly; SameSite=Strict` cookies, and as
//! `Secure` unless disabled for local development.
//!
//! Author: hephaex@gmail.com

use crate::error::AppError;
use axum::http::{header, HeaderMap, HeaderValue};
use cookie::{time::Duration, Cookie, SameSite};
use sessionkit_core::{CookieConfig, CredentialPair, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};

/// Token cookie carrying `value` for `max_age_secs`
pub fn token_cookie(
    name: &'static str,
    value: String,
    max_age_secs: u64,
    config: &CookieConfig,
) -> Cookie<'static> {
    let max_age = i64::try_from(max_age_secs).unwrap_or(i64::MAX);

    Cookie::build((name, value))
        .path(config.path.clone())
        .http_only(true)
        .secure(config.secure)
        .same_site(SameSite::Strict)
        .max_age(Duration::seconds(max_age))
        .build()
}

/// Cookie that tells the client to delete `name`
pub fn removal_cookie(name: &'static str, config: &CookieConfig) -> Cookie<'static> {
    let mut cookie = token_cookie(name, String::new(), 0, config);
    cookie.make_removal();
    cookie
}

fn header_value(cookie: &Cookie<'_>) -> Result<HeaderValue, AppError> {
    HeaderValue::from_str(&cookie.to_string()).map_err(|e| {
        AppError::Internal(format!("invalid cookie value for {}: {e}", cookie.name()))
    })
}

/// `Set-Cookie` headers for a freshly issued credential pair
pub fn credential_cookies(
    pair: &CredentialPair,
    config: &CookieConfig,
) -> Result<HeaderMap, AppError> {
    let access = token_cookie(
        ACCESS_TOKEN_COOKIE,
        pair.access_token.clone(),
        pair.expires_in,
        config,
    );
    let refresh = token_cookie(
        REFRESH_TOKEN_COOKIE,
        pair.refresh_token.clone(),
        pair.refresh_expires_in,
        config,
    );

    let mut headers = HeaderMap::new();
    headers.append(header::SET_COOKIE, header_value(&access)?);
    headers.append(header::SET_COOKIE, header_value(&refresh)?);
    Ok(headers)
}

/// `Set-Cookie` headers that remove both token cookies
pub fn cleared_cookies(config: &CookieConfig) -> Result<HeaderMap, AppError> {
    let mut headers = HeaderMap::new();
    for name in [ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE] {
        headers.append(
            header::SET_COOKIE,
            header_value(&removal_cookie(name, config))?,
        );
    }
    Ok(headers)
}

/// Value of the named cookie across all `Cookie` headers, unquoted
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value_trimmed().to_string())
}
