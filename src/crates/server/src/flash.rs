use crate::consts;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::http::{header, StatusCode};
use actix_web::{HttpRequest, HttpResponse};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use log::warn;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
}

/// One-shot message carried to the next rendered page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self.kind {
            FlashKind::Success => "alert-success",
            FlashKind::Error => "alert-danger",
        }
    }

    pub fn to_cookie(&self) -> Cookie<'static> {
        let payload = serde_json::to_vec(self).unwrap_or_default();
        Cookie::build(consts::FLASH_COOKIE, URL_SAFE_NO_PAD.encode(payload))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .finish()
    }
}

/// Reads the pending flash message, if any. A malformed cookie is ignored.
pub fn read(req: &HttpRequest) -> Option<Flash> {
    let cookie = req.cookie(consts::FLASH_COOKIE)?;
    let decoded = URL_SAFE_NO_PAD.decode(cookie.value()).ok()?;
    match serde_json::from_slice(&decoded) {
        Ok(flash) => Some(flash),
        Err(e) => {
            warn!("discarding malformed flash cookie: {}", e);
            None
        }
    }
}

pub fn removal() -> Cookie<'static> {
    let mut cookie = Cookie::build(consts::FLASH_COOKIE, "").path("/").finish();
    cookie.make_removal();
    cookie
}

/// Redirect response, optionally carrying a flash message.
pub fn redirect(location: &str, status: StatusCode, flash: Option<Flash>) -> HttpResponse {
    let mut builder = HttpResponse::build(status);
    builder.insert_header((header::LOCATION, location));
    if let Some(flash) = flash {
        builder.cookie(flash.to_cookie());
    }
    builder.finish()
}
