use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{info, warn};
use shared::AuthUser;

pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:8080";
pub const DEFAULT_IMAGE_PUBLIC_BASE: &str = "/images";
pub const DEFAULT_ORPHAN_SWEEP_SECONDS: u64 = 600;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub admin_emails: HashSet<String>,
    pub admin_user_ids: HashSet<String>,
    pub image_dir: PathBuf,
    pub image_public_base: String,
    pub allowed_origin: String,
    pub orphan_sweep_seconds: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn split_list(raw: Option<String>, lowercase: bool) -> HashSet<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| if lowercase { s.to_lowercase() } else { s.to_string() })
        .collect()
}

impl AppConfig {
    /// Builds the config from a secret lookup such as the runtime's secret store.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let admin_emails = split_list(get("ADMIN_EMAILS"), true);
        let admin_user_ids = split_list(get("ADMIN_USER_IDS"), false);
        if admin_emails.is_empty() && admin_user_ids.is_empty() {
            warn!("No ADMIN_EMAILS or ADMIN_USER_IDS configured - only users with the admin role can manage the contest");
        }

        let image_dir = get("IMAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join("costume_images"));

        let orphan_sweep_seconds = match get("ORPHAN_SWEEP_SECONDS").map(|v| v.trim().parse::<u64>()) {
            Some(Ok(secs)) if secs > 0 => secs,
            Some(_) => {
                warn!("Invalid ORPHAN_SWEEP_SECONDS, using default: {}", DEFAULT_ORPHAN_SWEEP_SECONDS);
                DEFAULT_ORPHAN_SWEEP_SECONDS
            }
            None => DEFAULT_ORPHAN_SWEEP_SECONDS,
        };

        let config = Self {
            admin_emails,
            admin_user_ids,
            image_dir,
            image_public_base: get("IMAGE_PUBLIC_BASE").unwrap_or_else(|| DEFAULT_IMAGE_PUBLIC_BASE.into()),
            allowed_origin: get("ALLOWED_ORIGIN").unwrap_or_else(|| DEFAULT_ALLOWED_ORIGIN.into()),
            orphan_sweep_seconds,
        };
        info!("Images stored under {}", config.image_dir.display());
        config
    }

    /// Admin by stored role, by id allow-list, or by verified email allow-list.
    pub fn is_admin(&self, user: &AuthUser) -> bool {
        if user.has_admin_role() || self.admin_user_ids.contains(&user.id) {
            return true;
        }
        user.email_verified && user.email.as_ref()
            .is_some_and(|email| self.admin_emails.contains(&email.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_detection() {
        let config = AppConfig::from_lookup(|key| match key {
            "ADMIN_EMAILS" => Some(" Boss@Example.com , ".into()),
            "ADMIN_USER_IDS" => Some("root-1".into()),
            _ => None,
        });

        let mut by_email = AuthUser::new("u1");
        by_email.email = Some("boss@example.com".into());
        assert!(!config.is_admin(&by_email));
        by_email.email_verified = true;
        assert!(config.is_admin(&by_email));

        assert!(config.is_admin(&AuthUser::new("root-1")));

        let mut by_role = AuthUser::new("u2");
        by_role.role = Some("Admin".into());
        assert!(config.is_admin(&by_role));

        assert!(!config.is_admin(&AuthUser::new("u3")));
    }

    #[test]
    fn test_defaults_and_bad_values() {
        let config = AppConfig::from_lookup(|key| (key == "ORPHAN_SWEEP_SECONDS").then(|| "soon".to_string()));
        assert_eq!(config.orphan_sweep_seconds, DEFAULT_ORPHAN_SWEEP_SECONDS);
        assert_eq!(config.allowed_origin, DEFAULT_ALLOWED_ORIGIN);
        assert_eq!(config.image_public_base, DEFAULT_IMAGE_PUBLIC_BASE);
        assert!(config.admin_emails.is_empty());
    }
}
