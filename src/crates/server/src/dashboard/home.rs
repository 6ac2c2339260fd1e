use crate::flash::{self, Flash};
use crate::middleware::CurrentUser;
use crate::render;
use crate::AppState;
use actix_web::{web, HttpRequest, HttpResponse};
use askama::Template;
use log::warn;

#[derive(Template)]
#[template(path = "dashboard/home.html")]
pub struct DashboardHome {
    pub flash: Option<Flash>,
    pub user_name: String,
    pub user_count: u64,
}

pub async fn home(
    req: HttpRequest,
    state: web::Data<AppState>,
    current: CurrentUser,
) -> HttpResponse {
    let user_count = state.users.count().await.unwrap_or_else(|e| {
        warn!("dashboard home shows 0 users: {}", e);
        0
    });
    render::ok(
        &req,
        &DashboardHome {
            flash: flash::read(&req),
            user_name: current.0.name,
            user_count,
        },
    )
}
