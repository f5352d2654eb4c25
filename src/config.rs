//! Integration configuration
//!
//! Loaded once at startup and shared immutably with the dispatcher and the
//! remote clients.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::codec::CNAB240_LAYOUT_ID;
use crate::types::{BankProfile, RemittanceError, RemittanceResult};
use crate::utils::validate_bank_code;

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationConfig {
    /// Processing gateway connection
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// File acceptance and storage
    #[serde(default)]
    pub files: FileConfig,

    /// Retry policies
    #[serde(default)]
    pub retry: RetryConfig,

    /// Banks with a submission target
    #[serde(default = "default_banks")]
    pub banks: Vec<BankConfig>,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            files: FileConfig::default(),
            retry: RetryConfig::default(),
            banks: default_banks(),
        }
    }
}

/// Gateway connection settings
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            username: String::new(),
            password: String::new(),
            timeout_secs: default_timeout(),
        }
    }
}

impl GatewayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"***")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Accepted file names and storage location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConfig {
    /// Directory used by the filesystem blob store
    pub directory: String,
    /// Extensions accepted for outbound remittances
    pub outbound_extensions: Vec<String>,
    /// Extensions accepted for return files
    pub inbound_extensions: Vec<String>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            directory: "./uploads/remessas".to_string(),
            outbound_extensions: vec!["rem".to_string(), "txt".to_string()],
            inbound_extensions: vec!["ret".to_string(), "txt".to_string()],
        }
    }
}

/// Retry settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts per gateway or bank submission before failing
    pub dispatch_max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Notification attempts made inline before leaving a return `reconciled`
    pub inline_notification_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            dispatch_max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
            inline_notification_attempts: 2,
        }
    }
}

/// One bank with its submission target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankConfig {
    pub code: String,
    pub name: String,
    pub endpoint: String,
    #[serde(default = "default_layout")]
    pub layout_id: String,
    pub agreement: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub account: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl BankConfig {
    /// Reference data for seeding a record store
    pub fn to_profile(&self) -> BankProfile {
        BankProfile {
            code: self.code.clone(),
            name: self.name.clone(),
            layout_id: self.layout_id.clone(),
            endpoint: self.endpoint.clone(),
            agreement: self.agreement.clone(),
            branch: self.branch.clone(),
            account: self.account.clone(),
            active: self.active,
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_layout() -> String {
    CNAB240_LAYOUT_ID.to_string()
}

fn default_true() -> bool {
    true
}

fn default_banks() -> Vec<BankConfig> {
    vec![
        BankConfig {
            code: "033".to_string(),
            name: "Santander".to_string(),
            endpoint: "/api/bancos/santander".to_string(),
            layout_id: default_layout(),
            agreement: "123456".to_string(),
            branch: "1234".to_string(),
            account: "567890-1".to_string(),
            active: true,
        },
        BankConfig {
            code: "001".to_string(),
            name: "Banco do Brasil".to_string(),
            endpoint: "/api/bancos/bb".to_string(),
            layout_id: default_layout(),
            agreement: "789012".to_string(),
            branch: "5678".to_string(),
            account: "123456-7".to_string(),
            active: true,
        },
    ]
}

impl IntegrationConfig {
    /// Load configuration from defaults, an optional file and the environment
    ///
    /// Environment variables use the `REMITTANCE` prefix and `__` as the
    /// nesting separator, e.g. `REMITTANCE__GATEWAY__BASE_URL`.
    pub fn load(path: Option<&str>) -> RemittanceResult<Self> {
        let loaded: Self = Self::builder(path)
            .and_then(|builder| builder.build())
            .and_then(|config| config.try_deserialize())
            .map_err(|e| RemittanceError::Config(e.to_string()))?;
        loaded.validate()?;
        Ok(loaded)
    }

    fn builder(
        path: Option<&str>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&IntegrationConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("REMITTANCE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        Ok(builder)
    }

    /// Check the values the dispatcher depends on
    pub fn validate(&self) -> RemittanceResult<()> {
        if self.gateway.base_url.trim().is_empty() {
            return Err(RemittanceError::Config(
                "Gateway base URL cannot be empty".to_string(),
            ));
        }
        if self.retry.dispatch_max_attempts == 0 {
            return Err(RemittanceError::Config(
                "dispatch_max_attempts must be at least 1".to_string(),
            ));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(RemittanceError::Config(
                "base_delay_ms cannot exceed max_delay_ms".to_string(),
            ));
        }
        if self.files.outbound_extensions.is_empty() || self.files.inbound_extensions.is_empty() {
            return Err(RemittanceError::Config(
                "At least one file extension must be accepted per direction".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for bank in &self.banks {
            validate_bank_code(&bank.code).map_err(|e| RemittanceError::Config(e.to_string()))?;
            if !seen.insert(bank.code.as_str()) {
                return Err(RemittanceError::Config(format!(
                    "Bank {} is configured twice",
                    bank.code
                )));
            }
        }

        Ok(())
    }

    /// Bank profiles for every configured bank
    pub fn bank_profiles(&self) -> Vec<BankProfile> {
        self.banks.iter().map(BankConfig::to_profile).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = IntegrationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.banks.len(), 2);
        assert_eq!(config.banks[0].code, "033");
        assert_eq!(config.files.outbound_extensions, vec!["rem", "txt"]);
        assert_eq!(config.gateway.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_password_is_not_logged() {
        let mut config = GatewayConfig::default();
        config.password = "s3cr3t".to_string();
        assert!(!format!("{:?}", config).contains("s3cr3t"));
    }

    #[test]
    fn test_duplicate_bank_rejected() {
        let mut config = IntegrationConfig::default();
        let duplicate = config.banks[0].clone();
        config.banks.push(duplicate);
        assert!(matches!(config.validate(), Err(RemittanceError::Config(_))));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut config = IntegrationConfig::default();
        config.retry.dispatch_max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = IntegrationConfig::load(None).unwrap();
        assert_eq!(config.retry, RetryConfig::default());
        assert_eq!(config.banks[1].agreement, "789012");
    }
}
