use rocket::http::Status;
use rocket::outcome::try_outcome;
use rocket::request::{FromRequest, Outcome};
use rocket::Request;
use shared::user_info::AuthUser;
use tracing::warn;
use crate::routes::AppState;

pub const CSRF_HEADER: &str = "X-CSRF-Token";

/// An authenticated user the config recognises as a contest admin.
#[derive(Debug)]
pub struct Admin(pub AuthUser);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Admin {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let user = try_outcome!(req.guard::<AuthUser>().await);
        let Some(state) = req.rocket().state::<AppState>() else {
            return Outcome::Error((Status::InternalServerError, ()));
        };

        if state.config.is_admin(&user) {
            Outcome::Success(Admin(user))
        } else {
            warn!("Admin action refused for {}", user.id);
            Outcome::Error((Status::Forbidden, ()))
        }
    }
}

/// CSRF token sent as a header, for requests whose body is not JSON.
#[derive(Debug)]
pub struct CsrfHeader(pub String);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for CsrfHeader {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let token = req.headers().get_one(CSRF_HEADER).unwrap_or_default();
        Outcome::Success(CsrfHeader(token.to_string()))
    }
}
