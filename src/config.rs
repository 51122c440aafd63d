//! Configuration types, built once at startup from environment variables.
//!
//! Every collaborator has its own `Option<…Config>`: a missing key simply
//! disables that collaborator, and the corresponding fan-out step reports
//! `Skipped`. Nothing here is re-read after startup.

use secrecy::SecretString;

use crate::error::ConfigError;

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// OpenAI analyzer configuration.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: SecretString,
    pub model: String,
}

impl OpenAiConfig {
    /// Returns `None` if `OPENAI_API_KEY` is not set (analyzer disabled).
    pub fn from_env() -> Option<Self> {
        let api_key = env_opt("OPENAI_API_KEY")?;
        let model = env_opt("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string());
        Some(Self {
            api_key: SecretString::from(api_key),
            model,
        })
    }
}

/// Microsoft Graph mail configuration (client-credentials flow).
#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: SecretString,
    pub sender: String,
}

impl GraphConfig {
    /// Requires all four credentials; any missing one disables mail.
    pub fn from_env() -> Option<Self> {
        Some(Self {
            tenant_id: env_opt("MS_TENANT_ID")?,
            client_id: env_opt("MS_CLIENT_ID")?,
            client_secret: SecretString::from(env_opt("MS_CLIENT_SECRET")?),
            sender: env_opt("MS_GRAPH_SENDER")?,
        })
    }
}

/// Mailchimp list configuration.
#[derive(Debug, Clone)]
pub struct MailchimpConfig {
    pub api_key: SecretString,
    pub server: String,
    pub audience_id: String,
}

impl MailchimpConfig {
    pub fn from_env() -> Option<Self> {
        Some(Self {
            api_key: SecretString::from(env_opt("MAILCHIMP_API_KEY")?),
            server: env_opt("MAILCHIMP_SERVER").unwrap_or_else(|| "us21".to_string()),
            audience_id: env_opt("MAILCHIMP_AUDIENCE_ID")?,
        })
    }
}

/// Motion task-management configuration.
#[derive(Debug, Clone)]
pub struct MotionConfig {
    pub api_key: SecretString,
    pub workspace_id: Option<String>,
}

impl MotionConfig {
    pub fn from_env() -> Option<Self> {
        Some(Self {
            api_key: SecretString::from(env_opt("MOTION_API_KEY")?),
            workspace_id: env_opt("MOTION_WORKSPACE_ID"),
        })
    }
}

/// Clio Grow CRM intake configuration.
#[derive(Debug, Clone)]
pub struct ClioConfig {
    pub base_url: String,
    pub inbox_token: SecretString,
}

impl ClioConfig {
    pub fn from_env() -> Option<Self> {
        Some(Self {
            base_url: env_opt("CLIO_GROW_BASE")
                .unwrap_or_else(|| "https://grow.clio.com".to_string()),
            inbox_token: SecretString::from(env_opt("CLIO_GROW_INBOX_TOKEN")?),
        })
    }
}

/// Process-wide configuration, read once at startup and treated as
/// immutable for the life of the process.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub openai: Option<OpenAiConfig>,
    pub graph: Option<GraphConfig>,
    pub mailchimp: Option<MailchimpConfig>,
    pub motion: Option<MotionConfig>,
    pub clio: Option<ClioConfig>,
    /// Recipient for internal intake alerts.
    pub notify_to: Option<String>,
    /// Additional alert recipient for score ≥ 70 leads.
    pub high_value_notify_to: Option<String>,
    /// Download link embedded in guide confirmation emails.
    pub guide_pdf_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match env_opt("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "PORT".to_string(),
                message: format!("not a port number: {raw}"),
            })?,
            None => 8080,
        };

        Ok(Self {
            port,
            openai: OpenAiConfig::from_env(),
            graph: GraphConfig::from_env(),
            mailchimp: MailchimpConfig::from_env(),
            motion: MotionConfig::from_env(),
            clio: ClioConfig::from_env(),
            notify_to: env_opt("INTAKE_NOTIFY_TO"),
            high_value_notify_to: env_opt("HIGH_VALUE_NOTIFY_TO"),
            guide_pdf_url: env_opt("LEGAL_GUIDE_PDF_URL"),
        })
    }

    /// Config with every collaborator disabled (used in tests).
    pub fn disabled() -> Self {
        Self {
            port: 0,
            openai: None,
            graph: None,
            mailchimp: None,
            motion: None,
            clio: None,
            notify_to: None,
            high_value_notify_to: None,
            guide_pdf_url: None,
        }
    }
}
