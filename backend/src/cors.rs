use rocket::fairing::{Fairing, Info, Kind};
use rocket::{Request, Response};
use rocket::http::Header;
use rocket::http::uri::Absolute;

pub struct CORS {
    allowed_origin: String,
}

impl CORS {
    pub fn new(allowed_origin: impl Into<String>) -> Self {
        Self { allowed_origin: allowed_origin.into() }
    }

    fn allows(&self, origin: &str) -> bool {
        if origin == self.allowed_origin {
            return true;
        }
        let Ok(uri) = Absolute::parse(origin) else { return false };
        uri.scheme() == "http" && uri.authority().is_some_and(|a| a.host() == "localhost")
    }
}

#[rocket::async_trait]
impl Fairing for CORS {
    fn info(&self) -> Info {
        Info {
            name: "CORS",
            kind: Kind::Response
        }
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        let Some(origin) = req.headers().get_one("Origin") else { return };

        if self.allows(origin) {
            res.set_header(Header::new("Access-Control-Allow-Origin", origin.to_string()));
            res.set_header(Header::new("Access-Control-Allow-Methods", "POST, GET, PUT, OPTIONS, DELETE"));
            res.set_header(Header::new(
                "Access-Control-Allow-Headers",
                "Content-Type, Authorization, X-CSRF-Token, X-User-Id, X-User-Email, X-User-Name, X-Email-Verified, X-User-Role",
            ));
            res.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
            res.set_header(Header::new("Access-Control-Max-Age", "86400"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_origins() {
        let cors = CORS::new("https://contest.example.com");
        assert!(cors.allows("https://contest.example.com"));
        assert!(cors.allows("http://localhost"));
        assert!(cors.allows("http://localhost:8080"));

        assert!(!cors.allows("http://localhost.evil.com"));
        assert!(!cors.allows("http://localhost.evil.com:8080"));
        assert!(!cors.allows("https://contest.example.com.evil.com"));
        assert!(!cors.allows("https://localhost:8080"));
        assert!(!cors.allows("not a uri"));
    }
}
