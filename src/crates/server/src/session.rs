use crate::consts;
use actix_web::cookie::{time::Duration, Cookie, SameSite};
use actix_web::HttpRequest;
use application::auth::{SessionClaims, TokenService};
use application::error::AppError;
use domain::user::{User, UserType};
use domain::value::UserId;
use infra::auth::JwtSessionCodec;
use infra::config::AppConfigImpl;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("no session")]
    Missing,
    #[error("invalid session: {0}")]
    Invalid(String),
}

/// An authenticated session as carried by the session cookie.
#[derive(Debug, Clone)]
pub struct Session {
    claims: SessionClaims,
}

impl Session {
    pub fn user_id(&self) -> Option<UserId> {
        self.claims.subject.parse().ok()
    }

    pub fn user_type(&self) -> Option<UserType> {
        UserType::try_from(self.claims.user_type.as_str()).ok()
    }
}

/// Issues, reads and destroys session cookies.
#[derive(Clone)]
pub struct SessionManager {
    codec: Arc<dyn TokenService>,
    ttl_secs: i64,
    secure: bool,
}

impl SessionManager {
    pub fn new(codec: Arc<dyn TokenService>, ttl_secs: i64, secure: bool) -> Self {
        Self {
            codec,
            ttl_secs,
            secure,
        }
    }

    pub fn from_config(cfg: &AppConfigImpl) -> Self {
        let codec = JwtSessionCodec::from_config(cfg);
        let ttl_secs = codec.exp_secs();
        Self::new(Arc::new(codec), ttl_secs, cfg.is_production())
    }

    pub fn start(&self, req: &HttpRequest) -> Result<Session, SessionError> {
        let cookie = req.cookie(consts::SESSION_COOKIE).ok_or(SessionError::Missing)?;
        if cookie.value().is_empty() {
            return Err(SessionError::Missing);
        }
        let claims = self
            .codec
            .verify(cookie.value())
            .map_err(|e| SessionError::Invalid(e.to_string()))?;
        Ok(Session { claims })
    }

    pub fn issue(&self, user: &User) -> Result<Cookie<'static>, AppError> {
        let token = self.codec.issue(&SessionClaims::from(user))?;
        Ok(Cookie::build(consts::SESSION_COOKIE, token)
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .max_age(Duration::seconds(self.ttl_secs))
            .finish())
    }

    /// Cookie that makes the browser drop the session.
    pub fn destroy(&self) -> Cookie<'static> {
        let mut cookie = Cookie::build(consts::SESSION_COOKIE, "")
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .finish();
        cookie.make_removal();
        cookie
    }
}
