pub mod home;
pub mod users;

use crate::middleware::RequireType;
use actix_web::dev::HttpServiceFactory;
use actix_web::web;
use domain::user::UserType;

pub fn configure_service() -> impl HttpServiceFactory {
    web::scope("/dashboard")
        .wrap(RequireType::new(UserType::Dashboard))
        .route("/home", web::get().to(home::home))
        .service(
            web::resource("/users")
                .route(web::get().to(users::list))
                .route(web::post().to(users::create)),
        )
        .route("/users/create", web::get().to(users::create_form))
        .route("/users/{id}/edit", web::get().to(users::edit_form))
        .route("/users/{id}", web::post().to(users::update))
        .route("/users/{id}/delete", web::post().to(users::delete))
}
