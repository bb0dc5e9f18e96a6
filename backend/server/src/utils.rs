use axum::{
    body::Bytes,
    http::{HeaderMap, HeaderValue, header::COOKIE},
};
use clinic::AuthToken;
use serde::de::DeserializeOwned;

use crate::error::AppError::{self, MalformedPayload, Unauthorized};

pub const AUTH_COOKIE: &str = "auth_token";

pub fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|_| MalformedPayload)
}

pub fn cookie_token(headers: &HeaderMap) -> Option<AuthToken> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == AUTH_COOKIE && !value.is_empty())
        .map(|(_, value)| AuthToken::new(value))
}

pub fn require_token(headers: &HeaderMap) -> Result<AuthToken, AppError> {
    cookie_token(headers).ok_or(Unauthorized("Unauthorized - No token"))
}

pub fn auth_cookie(token: &str, max_age: i64, secure: bool) -> Result<HeaderValue, AppError> {
    let mut cookie =
        format!("{AUTH_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}");
    if secure {
        cookie.push_str("; Secure");
    }

    HeaderValue::from_str(&cookie).map_err(|_| AppError::BadGateway {
        message: "Login succeeded but token was not a valid cookie value".to_string(),
        details: serde_json::Value::Null,
    })
}

pub fn clear_auth_cookie(secure: bool) -> HeaderValue {
    if secure {
        HeaderValue::from_static("auth_token=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0; Secure")
    } else {
        HeaderValue::from_static("auth_token=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(cookies: &[&str]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for cookie in cookies {
            map.append(COOKIE, HeaderValue::from_str(cookie).unwrap());
        }
        map
    }

    #[test]
    fn test_cookie_token() {
        let token = cookie_token(&headers(&["theme=dark; auth_token=abc.def.ghi"])).unwrap();
        assert_eq!(token.as_str(), "abc.def.ghi");

        let token = cookie_token(&headers(&["theme=dark", "auth_token=xyz"])).unwrap();
        assert_eq!(token.as_str(), "xyz");
    }

    #[test]
    fn test_cookie_token_missing() {
        assert!(cookie_token(&headers(&[])).is_none());
        assert!(cookie_token(&headers(&["auth_token="])).is_none());
        assert!(cookie_token(&headers(&["my_auth_token=abc"])).is_none());
        assert!(require_token(&headers(&["theme=dark"])).is_err());
    }

    #[test]
    fn test_auth_cookie() {
        let cookie = auth_cookie("abc", 60, false).unwrap();
        assert_eq!(
            cookie,
            "auth_token=abc; Path=/; HttpOnly; SameSite=Lax; Max-Age=60"
        );

        let cookie = auth_cookie("abc", 60, true).unwrap();
        assert!(cookie.to_str().unwrap().ends_with("; Secure"));

        assert!(auth_cookie("bad\ntoken", 60, false).is_err());
    }

    #[test]
    fn test_clear_auth_cookie() {
        assert_eq!(
            clear_auth_cookie(false),
            "auth_token=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"
        );
    }

    #[test]
    fn test_parse_body() {
        #[derive(serde::Deserialize)]
        struct Body {
            name: String,
        }

        let body: Body = parse_body(&Bytes::from_static(br#"{"name":"x"}"#)).unwrap();
        assert_eq!(body.name, "x");

        assert!(parse_body::<Body>(&Bytes::from_static(b"not json")).is_err());
    }
}
