pub mod auth;
pub mod consts;
pub mod csrf;
pub mod dashboard;
pub mod flash;
pub mod middleware;
pub mod panel;
pub mod render;
pub mod session;

use actix_web::http::{header, StatusCode};
use actix_web::{web, HttpRequest, HttpResponse};
use application::auth::{AuthService, PasswordHasher};
use application::command::user::UserDirectoryService;
use auth::LoginLimiter;
use domain::user::UserRepository;
use infra::auth::BcryptPasswordHasher;
use infra::config::AppConfigImpl;
use infra::repository::postgres::command::user::UserRepositoryImpl;
use log::debug;
use sea_orm::DatabaseConnection;
use session::SessionManager;
use std::sync::Arc;

pub struct AppState {
    pub app_cfg: AppConfigImpl,
    pub users: UserDirectoryService,
    pub auth: AuthService,
    pub sessions: SessionManager,
    pub login_limiter: LoginLimiter,
}

impl AppState {
    pub fn new(db: DatabaseConnection, app_cfg: AppConfigImpl) -> Self {
        Self::with_repository(Arc::new(UserRepositoryImpl::new(db)), app_cfg)
    }

    pub fn with_repository(user_repo: Arc<dyn UserRepository>, app_cfg: AppConfigImpl) -> Self {
        let hasher: Arc<dyn PasswordHasher> =
            Arc::new(BcryptPasswordHasher::new(app_cfg.salt_cost));
        let sessions = SessionManager::from_config(&app_cfg);
        Self {
            users: UserDirectoryService::new(user_repo.clone(), hasher.clone()),
            auth: AuthService::new(user_repo, hasher),
            sessions,
            login_limiter: LoginLimiter::default(),
            app_cfg,
        }
    }
}

/// `/` sends signed-in users to their home and everyone else to the login page.
pub async fn index(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let location = match state.sessions.start(&req) {
        Ok(session) => match session.user_type() {
            Some(user_type) => consts::home_path(user_type),
            None => consts::LOGIN_PATH,
        },
        Err(e) => {
            debug!("index without session: {}", e);
            consts::LOGIN_PATH
        }
    };
    HttpResponse::build(StatusCode::FOUND)
        .insert_header((header::LOCATION, location))
        .finish()
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .service(auth::configure_service())
        .service(dashboard::configure_service())
        .service(panel::configure_service());
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{dashboard_user, panel_user, session_cookie, test_app, test_state};
    use actix_web::test;

    #[actix_web::test]
    async fn index_routes_by_session() {
        let state = test_state();
        let member = panel_user(&state, "member").await;
        let admin = dashboard_user(&state, "root").await;
        let app = test_app!(state);

        let cases = [
            (None, consts::LOGIN_PATH),
            (Some(session_cookie(&state, &member)), consts::PANEL_HOME_PATH),
            (Some(session_cookie(&state, &admin)), consts::DASHBOARD_HOME_PATH),
        ];
        for (cookie, expected) in cases {
            let mut req = test::TestRequest::get().uri("/");
            if let Some(cookie) = cookie {
                req = req.cookie(cookie);
            }
            let resp = test::call_service(&app, req.to_request()).await;
            assert_eq!(resp.status(), StatusCode::FOUND);
            assert_eq!(resp.headers().get(header::LOCATION).unwrap(), expected);
        }
    }

    #[actix_web::test]
    async fn csrf_cookie_is_issued_once() {
        let state = test_state();
        let app = test::init_service(
            actix_web::App::new()
                .app_data(state.clone())
                .wrap(actix_web::middleware::from_fn(csrf::ensure_token))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri(consts::LOGIN_PATH).to_request();
        let resp = test::call_service(&app, req).await;
        let issued = resp
            .response()
            .cookies()
            .find(|c| c.name() == consts::CSRF_COOKIE)
            .map(|c| c.value().to_string())
            .unwrap();
        let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(body.contains(&issued));

        let req = test::TestRequest::get()
            .uri(consts::LOGIN_PATH)
            .cookie(actix_web::cookie::Cookie::new(consts::CSRF_COOKIE, issued))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp
            .response()
            .cookies()
            .all(|c| c.name() != consts::CSRF_COOKIE));
    }
}
