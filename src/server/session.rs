//! Session-cookie plumbing for the HTTP surface.
//!
//! The session is a bare user id in an HttpOnly cookie; the durable store is
//! the source of truth for the account it names.

use axum::http::{HeaderMap, header};

pub const SESSION_COOKIE: &str = "cp_user";

/// 30 days.
const SESSION_MAX_AGE_SECS: u64 = 60 * 60 * 24 * 30;

/// Extract the session user id from the request's `Cookie` header.
pub fn session_user_id(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;

    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
    })
}

/// `Set-Cookie` value establishing a session.
pub fn session_cookie(user_id: &str) -> String {
    format!(
        "{SESSION_COOKIE}={user_id}; HttpOnly; SameSite=Lax; Path=/; Max-Age={SESSION_MAX_AGE_SECS}"
    )
}

/// `Set-Cookie` value clearing the session.
pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn extracts_session_id_from_cookie_header() {
        let headers = headers_with_cookie("cp_user=user-123");
        assert_eq!(session_user_id(&headers).as_deref(), Some("user-123"));
    }

    #[test]
    fn finds_session_cookie_among_others() {
        let headers = headers_with_cookie("theme=dark; cp_user=user-123; lang=en");
        assert_eq!(session_user_id(&headers).as_deref(), Some("user-123"));
    }

    #[test]
    fn missing_or_empty_cookie_yields_none() {
        assert!(session_user_id(&HeaderMap::new()).is_none());
        assert!(session_user_id(&headers_with_cookie("theme=dark")).is_none());
        assert!(session_user_id(&headers_with_cookie("cp_user=")).is_none());
    }

    #[test]
    fn set_cookie_round_trips_through_parser() {
        let set_cookie = session_cookie("user-42");
        let pair = set_cookie.split(';').next().unwrap();

        let headers = headers_with_cookie(pair);
        assert_eq!(session_user_id(&headers).as_deref(), Some("user-42"));
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("SameSite=Lax"));
        assert!(set_cookie.contains("Max-Age=2592000"));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let cleared = clear_session_cookie();
        assert!(cleared.starts_with("cp_user=;"));
        assert!(cleared.contains("Max-Age=0"));
    }
}
