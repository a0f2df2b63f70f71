use crate::error::{ContestError, UploadError};

pub const MAX_NAME_LENGTH: usize = 60;
pub const MAX_DESCRIPTION_LENGTH: usize = 500;
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
pub const MAX_KEY_SEGMENT_LENGTH: usize = 40;
pub const IMAGE_PREFIX: &str = "costume-images";

const IMAGE_TYPES: [(&str, &str); 5] = [
    ("image/jpeg", "jpg"),
    ("image/jpg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

pub fn validate_costume(name: &str, description: &str) -> Result<(), ContestError> {
    let name_len = name.trim().chars().count();
    if name_len == 0 || name_len > MAX_NAME_LENGTH { return Err(ContestError::InvalidName); }
    if description.chars().count() > MAX_DESCRIPTION_LENGTH { return Err(ContestError::DescriptionTooLong); }
    Ok(())
}

/// Checks an upload and returns the file extension to store it under.
pub fn validate_image(content_type: &str, len: usize) -> Result<&'static str, UploadError> {
    let mime = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    let ext = IMAGE_TYPES.iter()
        .find(|(t, _)| *t == mime)
        .map(|(_, ext)| *ext)
        .ok_or_else(|| UploadError::InvalidType(mime.clone()))?;

    if len == 0 { return Err(UploadError::Empty); }
    if len > MAX_IMAGE_BYTES { return Err(UploadError::TooLarge); }
    Ok(ext)
}

/// Lowercases and collapses anything outside `[a-z0-9]` into single underscores.
pub fn sanitize_key_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
        if out.len() >= MAX_KEY_SEGMENT_LENGTH { break; }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() { "anonymous".to_string() } else { trimmed.to_string() }
}

/// Keeps `[A-Za-z0-9-]` and writes every other byte as `~XX`, so distinct
/// ids always give distinct segments and `_` never appears.
pub fn escape_key_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("~{byte:02X}"));
        }
    }
    out
}

/// Storage key for a user's costume image. The id segment identifies the
/// owner; the name segment is only a readable label.
pub fn image_key(user_id: &str, user_name: &str, ext: &str) -> String {
    format!(
        "{}/{}_{}.{}",
        IMAGE_PREFIX,
        escape_key_segment(user_id),
        sanitize_key_segment(user_name),
        ext
    )
}

pub fn is_absolute_url(image_url: &str) -> bool {
    image_url.starts_with("http://") || image_url.starts_with("https://")
}

/// Storage key for an image reference, if it points into our object store.
pub fn storage_key(image_url: &str) -> Option<&str> {
    if is_absolute_url(image_url) { return None; }
    let key = image_url.trim_start_matches('/');
    key.starts_with(IMAGE_PREFIX).then_some(key)
}

pub fn resolve_image_url(image_url: &str, public_base: &str) -> String {
    if is_absolute_url(image_url) {
        image_url.to_string()
    } else {
        format!("{}/{}", public_base.trim_end_matches('/'), image_url.trim_start_matches('/'))
    }
}
