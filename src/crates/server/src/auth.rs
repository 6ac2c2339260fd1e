use crate::consts;
use crate::csrf::{CsrfForm, CsrfProtected, CsrfToken};
use crate::flash::{self, Flash};
use crate::middleware::guest_only;
use crate::render;
use crate::AppState;
use actix_web::http::StatusCode;
use actix_web::middleware::from_fn;
use actix_web::{web, HttpRequest, HttpResponse, Scope};
use application::error::AppError;
use askama::Template;
use log::{error, info, warn};
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};

const LOGIN_ATTEMPTS: usize = 5;
const LOGIN_WINDOW_SECS: u64 = 60;

/// Sliding-window limiter for login attempts, keyed by client address.
pub struct LoginLimiter {
    attempts: Mutex<HashMap<String, Vec<Instant>>>,
    max_attempts: usize,
    window: Duration,
}

impl LoginLimiter {
    pub fn new(max_attempts: usize, window_secs: u64) -> Self {
        Self {
            attempts: Mutex::new(HashMap::new()),
            max_attempts,
            window: Duration::from_secs(window_secs),
        }
    }

    pub fn is_allowed(&self, client: &str) -> bool {
        let now = Instant::now();
        let mut attempts = self.attempts.lock();
        // forget clients whose attempts have all expired
        attempts.retain(|_, seen| {
            seen.retain(|t| now.duration_since(*t) < self.window);
            !seen.is_empty()
        });
        let seen = attempts.entry(client.to_string()).or_default();
        if seen.len() >= self.max_attempts {
            false
        } else {
            seen.push(now);
            true
        }
    }
}

impl Default for LoginLimiter {
    fn default() -> Self {
        Self::new(LOGIN_ATTEMPTS, LOGIN_WINDOW_SECS)
    }
}

/// Address the login limiter keys on. Forwarding headers are client-controlled,
/// so they count only when the deployment says a proxy sets them.
fn client_ip(req: &HttpRequest, trust_forwarded: bool) -> String {
    if trust_forwarded {
        if let Some(addr) = req.connection_info().realip_remote_addr() {
            return addr.to_string();
        }
    }
    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub account: String,
    pub password: String,
    pub csrf_token: String,
}

impl CsrfProtected for LoginForm {
    fn csrf_token(&self) -> &str {
        &self.csrf_token
    }
}

#[derive(Template)]
#[template(path = "auth/login.html")]
pub struct LoginPage {
    pub flash: Option<Flash>,
    pub csrf_token: String,
    pub account: String,
    pub error: Option<String>,
}

fn login_page_with(
    req: &HttpRequest,
    status: StatusCode,
    csrf: &CsrfToken,
    account: &str,
    error: Option<&str>,
) -> HttpResponse {
    render::page(
        req,
        status,
        &LoginPage {
            flash: flash::read(req),
            csrf_token: csrf.value().to_string(),
            account: account.to_string(),
            error: error.map(str::to_string),
        },
    )
}

pub async fn login_page(req: HttpRequest, csrf: CsrfToken) -> HttpResponse {
    login_page_with(&req, StatusCode::OK, &csrf, "", None)
}

pub async fn login(
    req: HttpRequest,
    state: web::Data<AppState>,
    csrf: CsrfToken,
    form: CsrfForm<LoginForm>,
) -> HttpResponse {
    let form = form.into_inner();
    let account = form.account.trim();

    let client = client_ip(&req, state.app_cfg.server().trust_forwarded);
    if !state.login_limiter.is_allowed(&client) {
        warn!("login throttled for client {}", client);
        return login_page_with(
            &req,
            StatusCode::TOO_MANY_REQUESTS,
            &csrf,
            account,
            Some("Too many login attempts. Please try again later."),
        );
    }

    if account.is_empty() || form.password.is_empty() {
        return login_page_with(
            &req,
            StatusCode::BAD_REQUEST,
            &csrf,
            account,
            Some("Account and password are required."),
        );
    }

    let user = match state.auth.login(account, &form.password).await {
        Ok(user) => user,
        Err(AppError::Unauthorized(_)) => {
            return login_page_with(
                &req,
                StatusCode::UNAUTHORIZED,
                &csrf,
                account,
                Some("Invalid account or password."),
            );
        }
        Err(e) => {
            error!("login failed for {}: {}", account, e);
            return login_page_with(
                &req,
                StatusCode::INTERNAL_SERVER_ERROR,
                &csrf,
                account,
                Some("Login is temporarily unavailable."),
            );
        }
    };

    match state.sessions.issue(&user) {
        Ok(cookie) => {
            info!("user {} signed in", user.id);
            let mut resp = flash::redirect(
                consts::home_path(user.user_type),
                StatusCode::SEE_OTHER,
                Some(Flash::success(format!("Welcome, {}.", user.name))),
            );
            if let Err(e) = resp.add_cookie(&cookie) {
                error!("session cookie could not be set: {}", e);
                return HttpResponse::InternalServerError().finish();
            }
            resp
        }
        Err(e) => {
            error!("session could not be issued for user {}: {}", user.id, e);
            login_page_with(
                &req,
                StatusCode::INTERNAL_SERVER_ERROR,
                &csrf,
                account,
                Some("Login is temporarily unavailable."),
            )
        }
    }
}

pub async fn logout(state: web::Data<AppState>) -> HttpResponse {
    let mut resp = flash::redirect(
        consts::LOGIN_PATH,
        StatusCode::SEE_OTHER,
        Some(Flash::success("You have been signed out.")),
    );
    if let Err(e) = resp.add_cookie(&state.sessions.destroy()) {
        error!("session cookie could not be removed: {}", e);
    }
    resp
}

pub fn configure_service() -> Scope {
    web::scope("/auth")
        .service(
            web::resource("/login")
                .wrap(from_fn(guest_only))
                .route(web::get().to(login_page))
                .route(web::post().to(login)),
        )
        .route("/logout", web::get().to(logout))
}
