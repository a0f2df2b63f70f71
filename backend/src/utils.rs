use crate::error::ApiError;
use uuid::Uuid;

pub fn parse_costume_id(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id).map_err(|_| ApiError::InvalidId)
}

pub fn rate_limit_key(action: &str, user_id: &str) -> String {
    format!("{}:{}", action, user_id)
}
