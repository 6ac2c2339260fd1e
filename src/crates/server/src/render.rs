use crate::consts;
use crate::flash;
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse};
use askama::Template;
use log::error;

/// Renders a page. A flash message shown by this page is cleared from the browser.
pub fn page<T: Template>(req: &HttpRequest, status: StatusCode, template: &T) -> HttpResponse {
    match template.render() {
        Ok(body) => {
            let mut builder = HttpResponse::build(status);
            builder.content_type("text/html; charset=utf-8");
            if req.cookie(consts::FLASH_COOKIE).is_some() {
                builder.cookie(flash::removal());
            }
            builder.body(body)
        }
        Err(e) => {
            error!("template render failed for {}: {}", req.path(), e);
            HttpResponse::InternalServerError()
                .content_type("text/plain; charset=utf-8")
                .body("Template error")
        }
    }
}

pub fn ok<T: Template>(req: &HttpRequest, template: &T) -> HttpResponse {
    page(req, StatusCode::OK, template)
}
