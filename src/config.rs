//! Service configuration, loaded once at startup from the environment.

use std::env;
use std::path::PathBuf;

/// Immutable configuration handed to the handlers through the app state.
#[derive(Debug, Clone)]
pub struct Config {
    /// Every submission is relayed to each of these addresses.
    pub recipient_emails: Vec<String>,
    /// Display name used in the From header and email footer.
    pub site_name: String,
    /// Fallback domain for the synthesized from-address when the request
    /// carries no Host header.
    pub site_domain: String,
    pub api_port: u16,
    /// Directory the landing page and client scripts are served from.
    pub static_dir: PathBuf,
    /// Path to the sendmail binary used for delivery.
    pub sendmail_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let recipient_emails: Vec<String> = env::var("RECIPIENT_EMAILS")
            .unwrap_or_else(|_| "admin@retroznak.ru,info@retroznak.ru".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if recipient_emails.is_empty() {
            return Err("RECIPIENT_EMAILS must list at least one address".to_string());
        }

        let api_port = env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .map_err(|_| "API_PORT must be a valid port number".to_string())?;

        Ok(Self {
            recipient_emails,
            site_name: env::var("SITE_NAME")
                .unwrap_or_else(|_| "Ретрознак - Домовые знаки советской эпохи".to_string()),
            site_domain: env::var("SITE_DOMAIN").unwrap_or_else(|_| "retroznak.ru".to_string()),
            api_port,
            static_dir: env::var("STATIC_DIR")
                .unwrap_or_else(|_| "static".to_string())
                .into(),
            sendmail_path: env::var("SENDMAIL_PATH")
                .unwrap_or_else(|_| "/usr/sbin/sendmail".to_string())
                .into(),
        })
    }
}

#[cfg(test)]
impl Config {
    pub(crate) fn for_tests() -> Self {
        Self {
            recipient_emails: vec![
                "admin@retroznak.ru".to_string(),
                "info@retroznak.ru".to_string(),
            ],
            site_name: "Ретрознак - Домовые знаки советской эпохи".to_string(),
            site_domain: "retroznak.ru".to_string(),
            api_port: 0,
            static_dir: "static".into(),
            sendmail_path: "/usr/sbin/sendmail".into(),
        }
    }
}
