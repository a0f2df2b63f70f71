use serde::{Serialize, Deserialize};

pub const ADMIN_ROLE: &str = "admin";

/// Identity asserted by the external auth provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub role: Option<String>,
}

impl AuthUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            display_name: None,
            email_verified: false,
            role: None,
        }
    }

    pub fn has_admin_role(&self) -> bool {
        self.role.as_deref().is_some_and(|r| r.eq_ignore_ascii_case(ADMIN_ROLE))
    }

    pub fn name_or_id(&self) -> &str {
        self.display_name.as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.id)
    }
}

// Backend-specific Rocket implementation
#[cfg(feature = "backend")]
mod backend_impl {
    use super::*;
    use rocket::http::Status;
    use rocket::request::{FromRequest, Outcome};
    use rocket::Request;

    pub const USER_ID_HEADER: &str = "X-User-Id";
    pub const USER_EMAIL_HEADER: &str = "X-User-Email";
    pub const USER_NAME_HEADER: &str = "X-User-Name";
    pub const EMAIL_VERIFIED_HEADER: &str = "X-Email-Verified";
    pub const USER_ROLE_HEADER: &str = "X-User-Role";

    fn non_empty(value: Option<&str>) -> Option<String> {
        value.map(str::trim).filter(|v| !v.is_empty()).map(String::from)
    }

    #[rocket::async_trait]
    impl<'r> FromRequest<'r> for AuthUser {
        type Error = ();

        async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
            let headers = req.headers();
            let Some(id) = non_empty(headers.get_one(USER_ID_HEADER)) else {
                return Outcome::Error((Status::Unauthorized, ()));
            };

            let email_verified = headers.get_one(EMAIL_VERIFIED_HEADER)
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));

            Outcome::Success(AuthUser {
                id,
                email: non_empty(headers.get_one(USER_EMAIL_HEADER)),
                display_name: non_empty(headers.get_one(USER_NAME_HEADER)),
                email_verified,
                role: non_empty(headers.get_one(USER_ROLE_HEADER)),
            })
        }
    }
}

#[cfg(feature = "backend")]
pub use backend_impl::{
    USER_ID_HEADER, USER_EMAIL_HEADER, USER_NAME_HEADER, EMAIL_VERIFIED_HEADER, USER_ROLE_HEADER,
};
