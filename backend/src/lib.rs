pub mod auth;
pub mod catchers;
pub mod config;
pub mod controller;
pub mod cors;
pub mod error;
pub mod images;
pub mod pg_store;
pub mod processor;
pub mod rate_limiter;
pub mod routes;
pub mod store;
pub mod utils;
pub use shared::models::*;
pub use shared::user_info::AuthUser;

use rocket::{routes, catchers, Build, Rocket};
use crate::routes::AppState;
use crate::catchers::{bad_request, forbidden, internal_error, not_found, payload_too_large, too_many_requests, unauthorized, unprocessable};

/// Assembles the API around an already-built state.
pub fn build_rocket(state: AppState) -> Rocket<Build> {
    let image_base = state.config.image_public_base.clone();
    let cors = cors::CORS::new(state.config.allowed_origin.clone());

    let rocket = rocket::build()
        .attach(cors)
        .manage(state)
        .mount(
            "/api",
            routes![
                routes::get_csrf_token,
                routes::all_options,
                routes::get_contest,
                routes::get_results,
                routes::get_my_vote,
                routes::cast_vote,
                routes::submit_costume,
                routes::update_costume,
                routes::delete_costume,
                routes::upload_image,
                routes::toggle_voting,
                routes::toggle_results,
                routes::toggle_self_vote,
                routes::start_revote,
                routes::end_revote,
                routes::reset_contest,
            ],
        )
        .register(
            "/",
            catchers![
                unauthorized,
                forbidden,
                payload_too_large,
                too_many_requests,
                bad_request,
                unprocessable,
                internal_error,
                not_found
            ],
        );

    if image_base.starts_with('/') {
        rocket.mount(image_base, routes![routes::get_image])
    } else {
        rocket
    }
}
