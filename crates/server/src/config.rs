use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::OnceLock;

static SETTINGS: OnceLock<Settings> = OnceLock::new();

/// Path to the tunables file, relative to the working directory.
const CONFIG_PATH: &str = "config.toml";

/// Read-mostly configuration snapshot, resolved once at startup from the
/// environment plus optional `config.toml` tunables.
#[derive(Debug, Clone)]
pub struct Settings {
    pub environment: String,
    pub app_base_url: String,
    pub app_name: String,
    pub bind_addr: String,
    pub anthropic_api_key: Option<String>,
    pub mailgun_api_key: Option<String>,
    pub mailgun_domain: Option<String>,
    pub mailgun_from: Option<String>,
    pub mailgun_webhook_signing_key: Option<String>,
    /// Coarse dollar value each on-time notice is assumed to protect.
    pub claims_value_per_notice: Decimal,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    compliance: ComplianceTunables,
}

#[derive(Debug, Default, Deserialize)]
struct ComplianceTunables {
    /// Decimal string, e.g. "50000.00".
    claims_value_per_notice: Option<String>,
}

impl Settings {
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let tunables = load_tunables();
        let claims_value = tunables
            .compliance
            .claims_value_per_notice
            .as_deref()
            .and_then(|s| Decimal::from_str(s).ok())
            .unwrap_or_else(default_claims_value);

        Settings {
            environment: std::env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            app_base_url: std::env::var("APP_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            app_name: std::env::var("APP_NAME").unwrap_or_else(|_| "NoticeGuard".to_string()),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
            mailgun_api_key: std::env::var("MAILGUN_API_KEY").ok(),
            mailgun_domain: std::env::var("MAILGUN_DOMAIN").ok(),
            mailgun_from: std::env::var("MAILGUN_FROM").ok(),
            mailgun_webhook_signing_key: std::env::var("MAILGUN_WEBHOOK_SIGNING_KEY").ok(),
            claims_value_per_notice: claims_value,
        }
    }
}

fn default_claims_value() -> Decimal {
    Decimal::new(50_000_00, 2)
}

fn load_tunables() -> ConfigFile {
    match std::fs::read_to_string(CONFIG_PATH) {
        Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to parse {CONFIG_PATH} — using defaults");
            ConfigFile::default()
        }),
        Err(_) => ConfigFile::default(),
    }
}

/// Get the settings snapshot, resolving it on first call.
pub fn settings() -> &'static Settings {
    SETTINGS.get_or_init(Settings::from_env)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_claims_value_is_fifty_thousand() {
        assert_eq!(default_claims_value().to_string(), "50000.00");
    }

    #[test]
    fn tunables_parse_from_toml() {
        let cfg: ConfigFile =
            toml::from_str("[compliance]\nclaims_value_per_notice = \"75000.00\"\n").unwrap();
        assert_eq!(
            cfg.compliance.claims_value_per_notice.as_deref(),
            Some("75000.00")
        );
    }

    #[test]
    fn missing_tunables_default() {
        let cfg: ConfigFile = toml::from_str("").unwrap();
        assert!(cfg.compliance.claims_value_per_notice.is_none());
    }
}
