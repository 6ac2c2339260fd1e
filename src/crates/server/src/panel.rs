use crate::flash::{self, Flash};
use crate::middleware::{CurrentUser, RequireType};
use crate::render;
use actix_web::dev::HttpServiceFactory;
use actix_web::{web, HttpRequest, HttpResponse};
use askama::Template;
use domain::user::UserType;

#[derive(Template)]
#[template(path = "panel/home.html")]
pub struct PanelHome {
    pub flash: Option<Flash>,
    pub user_name: String,
    pub account: String,
}

pub async fn home(req: HttpRequest, current: CurrentUser) -> HttpResponse {
    let CurrentUser(user) = current;
    render::ok(
        &req,
        &PanelHome {
            flash: flash::read(&req),
            user_name: user.name,
            account: user.account,
        },
    )
}

pub fn configure_service() -> impl HttpServiceFactory {
    web::scope("/panel")
        .wrap(RequireType::new(UserType::Panel))
        .route("/home", web::get().to(home))
}
