use crate::{consts, AppState};
use actix_service::{forward_ready, Service, Transform};
use actix_web::{
    body::{EitherBody, MessageBody},
    dev::{Payload, ServiceRequest, ServiceResponse},
    http::{header, StatusCode},
    middleware::Next,
    web, Error, FromRequest, HttpMessage, HttpRequest, HttpResponse, ResponseError,
};
use domain::user::{User, UserType};
use futures::future::{ok, ready, LocalBoxFuture, Ready};
use log::{debug, error, warn};
use std::rc::Rc;
use thiserror::Error;

/// Reasons the access gate turns a request away.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AccessDenied {
    #[error("authentication required")]
    Unauthenticated,
    #[error("access forbidden")]
    Forbidden,
    #[error("user profile unavailable")]
    ProfileUnavailable,
}

impl ResponseError for AccessDenied {
    fn status_code(&self) -> StatusCode {
        match self {
            AccessDenied::Unauthenticated => StatusCode::UNAUTHORIZED,
            AccessDenied::Forbidden => StatusCode::FORBIDDEN,
            AccessDenied::ProfileUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .content_type("text/plain; charset=utf-8")
            .body(self.to_string())
    }
}

/// The authenticated user, placed in request extensions by [`RequireType`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequest for CurrentUser {
    type Error = AccessDenied;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<CurrentUser>()
                .cloned()
                .ok_or(AccessDenied::Unauthenticated),
        )
    }
}

// Resolves the session to a loaded user of the required type.
async fn authorize(
    state: &AppState,
    req: &HttpRequest,
    required: UserType,
) -> Result<User, AccessDenied> {
    let session = state.sessions.start(req).map_err(|e| {
        debug!("access denied on {}: {}", req.path(), e);
        AccessDenied::Unauthenticated
    })?;
    let user_id = session.user_id().ok_or_else(|| {
        warn!("access denied on {}: session without user id", req.path());
        AccessDenied::Forbidden
    })?;
    let user = state.auth.profile(user_id).await.map_err(|e| {
        error!("access denied on {}: profile of user {} unavailable: {}", req.path(), user_id, e);
        AccessDenied::ProfileUnavailable
    })?;
    if user.user_type != required {
        warn!(
            "access denied on {}: user {} is {}, needs {}",
            req.path(),
            user.id,
            user.user_type,
            required
        );
        return Err(AccessDenied::Forbidden);
    }
    Ok(user)
}

/// Lets a request through only for an authenticated user of one type.
pub struct RequireType {
    user_type: UserType,
}

impl RequireType {
    pub fn new(user_type: UserType) -> Self {
        Self { user_type }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequireType
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RequireTypeMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(RequireTypeMiddleware {
            service: Rc::new(service),
            user_type: self.user_type,
        })
    }
}

pub struct RequireTypeMiddleware<S> {
    service: Rc<S>,
    user_type: UserType,
}

impl<S, B> Service<ServiceRequest> for RequireTypeMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let required = self.user_type;
        Box::pin(async move {
            let Some(state) = req.app_data::<web::Data<AppState>>().cloned() else {
                error!("application state missing for {}", req.path());
                return Ok(req
                    .error_response(AccessDenied::ProfileUnavailable)
                    .map_into_right_body());
            };
            match authorize(&state, req.request(), required).await {
                Ok(user) => {
                    req.extensions_mut().insert(CurrentUser(user));
                    service.call(req).await.map(ServiceResponse::map_into_left_body)
                }
                Err(denied) => Ok(req.error_response(denied).map_into_right_body()),
            }
        })
    }
}

// Home of the user the session points at, if it still resolves.
async fn signed_in_home(state: &AppState, req: &HttpRequest) -> Result<&'static str, String> {
    let session = state.sessions.start(req).map_err(|e| e.to_string())?;
    let user_id = session
        .user_id()
        .ok_or_else(|| "session without user id".to_string())?;
    let user = state
        .auth
        .profile(user_id)
        .await
        .map_err(|e| e.to_string())?;
    Ok(consts::home_path(user.user_type))
}

/// Keeps signed-in users away from guest pages such as the login form.
///
/// A session that no longer resolves is dropped and the request goes on as a
/// guest.
pub async fn guest_only<B: MessageBody + 'static>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, Error> {
    let state = req.app_data::<web::Data<AppState>>().cloned();
    let has_session_cookie = req.cookie(consts::SESSION_COOKIE).is_some();

    if let (Some(state), true) = (&state, has_session_cookie) {
        match signed_in_home(state, req.request()).await {
            Ok(home) => {
                let resp = HttpResponse::Found()
                    .insert_header((header::LOCATION, home))
                    .finish();
                return Ok(req.into_response(resp).map_into_right_body());
            }
            Err(reason) => debug!("dropping stale session on {}: {}", req.path(), reason),
        }
    }

    let mut res = next.call(req).await?;
    if let (Some(state), true) = (state, has_session_cookie) {
        let reissued = res
            .response()
            .cookies()
            .any(|c| c.name() == consts::SESSION_COOKIE);
        if !reissued {
            res.response_mut().add_cookie(&state.sessions.destroy())?;
        }
    }
    Ok(res.map_into_left_body())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{panel_user, session_cookie, test_state, dashboard_user};
    use actix_web::{middleware::from_fn, test, App};

    async fn whoami(user: CurrentUser) -> HttpResponse {
        HttpResponse::Ok().body(user.0.account)
    }

    async fn guest_page() -> HttpResponse {
        HttpResponse::Ok().body("guest")
    }

    macro_rules! gated_app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data($state.clone())
                    .service(
                        web::scope("/dashboard")
                            .wrap(RequireType::new(UserType::Dashboard))
                            .route("/whoami", web::get().to(whoami)),
                    )
                    .service(
                        web::scope("/auth")
                            .wrap(from_fn(guest_only))
                            .route("/login", web::get().to(guest_page)),
                    ),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn missing_session_is_unauthorized() {
        let state = test_state();
        let app = gated_app!(state);
        let req = test::TestRequest::get().uri("/dashboard/whoami").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn tampered_session_is_unauthorized() {
        let state = test_state();
        let app = gated_app!(state);
        let req = test::TestRequest::get()
            .uri("/dashboard/whoami")
            .cookie(actix_web::cookie::Cookie::new(consts::SESSION_COOKIE, "not-a-token"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn dashboard_user_passes_and_is_exposed_to_handlers() {
        let state = test_state();
        let admin = dashboard_user(&state, "root").await;
        let app = gated_app!(state);
        let req = test::TestRequest::get()
            .uri("/dashboard/whoami")
            .cookie(session_cookie(&state, &admin))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(test::read_body(resp).await, "root");
    }

    #[actix_web::test]
    async fn panel_user_on_dashboard_route_is_forbidden() {
        let state = test_state();
        let member = panel_user(&state, "member").await;
        let app = gated_app!(state);
        let req = test::TestRequest::get()
            .uri("/dashboard/whoami")
            .cookie(session_cookie(&state, &member))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn deleted_users_session_fails_profile_load() {
        let state = test_state();
        let admin = dashboard_user(&state, "root").await;
        let gone = dashboard_user(&state, "gone").await;
        state.users.delete(admin.id, gone.id).await.unwrap();
        let app = gated_app!(state);
        let req = test::TestRequest::get()
            .uri("/dashboard/whoami")
            .cookie(session_cookie(&state, &gone))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn guest_only_redirects_signed_in_users_home() {
        let state = test_state();
        let member = panel_user(&state, "member").await;
        let app = gated_app!(state);
        let req = test::TestRequest::get()
            .uri("/auth/login")
            .cookie(session_cookie(&state, &member))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            consts::PANEL_HOME_PATH
        );
    }

    #[actix_web::test]
    async fn guest_only_drops_stale_session_and_serves_page() {
        let state = test_state();
        let app = gated_app!(state);
        let req = test::TestRequest::get()
            .uri("/auth/login")
            .cookie(actix_web::cookie::Cookie::new(consts::SESSION_COOKIE, "expired"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let removal = resp
            .response()
            .cookies()
            .find(|c| c.name() == consts::SESSION_COOKIE)
            .unwrap();
        assert_eq!(removal.value(), "");
    }

    #[actix_web::test]
    async fn guest_only_without_cookie_serves_page() {
        let state = test_state();
        let app = gated_app!(state);
        let req = test::TestRequest::get().uri("/auth/login").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.response().cookies().next().is_none());
    }
}
