use crate::consts;
use crate::flash::{self, Flash};
use crate::AppState;
use actix_web::{
    body::MessageBody,
    cookie::{Cookie, SameSite},
    dev::{Payload, ServiceRequest, ServiceResponse},
    http::StatusCode,
    middleware::Next,
    web, Error, FromRequest, HttpMessage, HttpRequest, HttpResponse, ResponseError,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use futures::future::{ready, LocalBoxFuture, Ready};
use hmac::{Hmac, Mac};
use log::warn;
use rand::RngCore;
use serde::de::DeserializeOwned;
use sha2::Sha256;
use std::convert::Infallible;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Token to embed in forms, as issued to the current browser.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrfToken(String);

impl CsrfToken {
    pub fn value(&self) -> &str {
        &self.0
    }
}

impl FromRequest for CsrfToken {
    type Error = Infallible;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let token = req
            .extensions()
            .get::<CsrfToken>()
            .cloned()
            .or_else(|| {
                req.cookie(consts::CSRF_COOKIE)
                    .map(|c| CsrfToken(c.value().to_string()))
            })
            .unwrap_or_else(|| CsrfToken(String::new()));
        ready(Ok(token))
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Makes sure every browser holds a CSRF cookie and exposes it to handlers.
pub async fn ensure_token(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let existing = req
        .cookie(consts::CSRF_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty());
    let secure = req
        .app_data::<web::Data<AppState>>()
        .map(|state| state.app_cfg.is_production())
        .unwrap_or(false);

    let (token, fresh) = match existing {
        Some(token) => (token, false),
        None => (generate_token(), true),
    };
    req.extensions_mut().insert(CsrfToken(token.clone()));

    let mut res = next.call(req).await?;
    if fresh {
        let cookie = Cookie::build(consts::CSRF_COOKIE, token)
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(secure)
            .finish();
        res.response_mut().add_cookie(&cookie)?;
    }
    Ok(res)
}

/// Constant-time comparison of the cookie token with the submitted one.
fn tokens_match(expected: &str, submitted: &str) -> bool {
    if expected.is_empty() || submitted.is_empty() {
        return false;
    }
    let (Ok(mut expected_mac), Ok(mut submitted_mac)) = (
        HmacSha256::new_from_slice(consts::CSRF_COOKIE.as_bytes()),
        HmacSha256::new_from_slice(consts::CSRF_COOKIE.as_bytes()),
    ) else {
        return false;
    };
    expected_mac.update(expected.as_bytes());
    submitted_mac.update(submitted.as_bytes());
    let expected_tag = expected_mac.finalize().into_bytes();
    submitted_mac.verify_slice(&expected_tag).is_ok()
}

#[derive(Error, Debug)]
pub enum CsrfError {
    #[error("invalid or missing CSRF token")]
    Mismatch,
}

impl ResponseError for CsrfError {
    fn status_code(&self) -> StatusCode {
        StatusCode::SEE_OTHER
    }

    fn error_response(&self) -> HttpResponse {
        flash::redirect(
            consts::LOGIN_PATH,
            StatusCode::SEE_OTHER,
            Some(Flash::error("Your form expired. Please try again.")),
        )
    }
}

/// Forms that carry a CSRF token field.
pub trait CsrfProtected {
    fn csrf_token(&self) -> &str;
}

/// URL-encoded form whose token has been checked against the CSRF cookie.
pub struct CsrfForm<T>(pub T);

impl<T> CsrfForm<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> FromRequest for CsrfForm<T>
where
    T: DeserializeOwned + CsrfProtected + 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        let form = web::Form::<T>::from_request(&req, payload);
        Box::pin(async move {
            let form = form.await?.into_inner();
            let expected = req
                .cookie(consts::CSRF_COOKIE)
                .map(|c| c.value().to_string())
                .unwrap_or_default();
            if tokens_match(&expected, form.csrf_token()) {
                Ok(CsrfForm(form))
            } else {
                warn!(
                    "csrf check failed: method={} path={} peer={}",
                    req.method(),
                    req.path(),
                    req.peer_addr()
                        .map(|a| a.to_string())
                        .unwrap_or_else(|| "unknown".to_string())
                );
                Err(CsrfError::Mismatch.into())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_compare_exactly() {
        let token = generate_token();
        assert_eq!(URL_SAFE_NO_PAD.decode(&token).unwrap().len(), 32);
        assert!(tokens_match(&token, &token.clone()));
        assert!(!tokens_match(&token, &generate_token()));
        assert!(!tokens_match(&token, ""));
        assert!(!tokens_match("", ""));
    }
}
