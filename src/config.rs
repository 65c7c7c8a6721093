use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File};
use serde::Deserialize;

pub const DEFAULT_SMTP_SERVER: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_IMAP_SERVER: &str = "imap.gmail.com";
pub const DEFAULT_IMAP_PORT: u16 = 993;
pub const DEFAULT_IMAP_MAILBOX: &str = "INBOX";

// Environment keys picked up by `from_env`, everything else is ignored
const RECOGNIZED_KEYS: &[&str] = &[
    "SMTP_SERVER",
    "SMTP_PORT",
    "EMAIL_ADDRESS",
    "EMAIL_PASSWORD",
    "IMAP_SERVER",
    "IMAP_PORT",
    "IMAP_MAILBOX",
    "TWILIO_ACCOUNT_SID",
    "TWILIO_AUTH_TOKEN",
    "TWILIO_PHONE_NUMBER",
    "DISCORD_BOT_TOKEN",
    "LOG_LEVEL",
    "LOG_FILE",
    "QUIET",
];

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub email: EmailConfig,
    pub messaging: MessagingConfig,
    pub discord: DiscordConfig,
    pub logging: LoggingConfig,
}

/// SMTP/IMAP settings and the account used for both.
#[derive(Debug, Deserialize, Clone)]
pub struct EmailConfig {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub email_address: Option<String>,
    pub email_password: Option<String>,
    pub imap_server: String,
    pub imap_port: u16,
    pub imap_mailbox: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_server: DEFAULT_SMTP_SERVER.to_string(),
            smtp_port: DEFAULT_SMTP_PORT,
            email_address: None,
            email_password: None,
            imap_server: DEFAULT_IMAP_SERVER.to_string(),
            imap_port: DEFAULT_IMAP_PORT,
            imap_mailbox: DEFAULT_IMAP_MAILBOX.to_string(),
        }
    }
}

impl EmailConfig {
    /// Login address and password, if both are set and non-empty.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        Some((
            non_empty(&self.email_address)?,
            non_empty(&self.email_password)?,
        ))
    }
}

/// Twilio account settings.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct MessagingConfig {
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,
    pub twilio_phone_number: Option<String>,
}

impl MessagingConfig {
    pub fn credentials(&self) -> Option<(&str, &str)> {
        Some((
            non_empty(&self.twilio_account_sid)?,
            non_empty(&self.twilio_auth_token)?,
        ))
    }

    pub fn sender_number(&self) -> Option<&str> {
        non_empty(&self.twilio_phone_number)
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DiscordConfig {
    pub discord_bot_token: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    pub log_level: Option<String>,
    pub log_file: Option<String>,
    #[serde(default)]
    pub quiet: bool,
}

// Blank values count as unset, anything else is passed through untouched
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

// Only the recognized keys are read, so unrelated non-UTF-8 variables are never decoded
fn recognized_env_vars() -> Result<Vec<(String, String)>, ConfigError> {
    let mut vars = Vec::new();
    for key in RECOGNIZED_KEYS {
        match std::env::var(key) {
            Ok(value) => vars.push((key.to_string(), value)),
            Err(std::env::VarError::NotPresent) => {}
            Err(std::env::VarError::NotUnicode(_)) => {
                return Err(ConfigError::Message(format!(
                    "environment variable {} is not valid UTF-8",
                    key
                )));
            }
        }
    }
    Ok(vars)
}

impl AppConfig {
    // Load config from defaults, then the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(recognized_env_vars()?)
    }

    // Load config from defaults, then the given key/value pairs
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let builder = apply_overrides(Self::configure_defaults()?, vars)?;
        Self::from_config(builder.build()?)
    }

    // Load config from a specific file path; environment values still win
    pub fn new_from_file(path: &str) -> Result<Self, ConfigError> {
        let builder =
            Self::configure_defaults()?.add_source(File::with_name(path).required(true));
        let builder = apply_overrides(builder, recognized_env_vars()?)?;
        Self::from_config(builder.build()?)
    }

    fn configure_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("smtp_server", DEFAULT_SMTP_SERVER)?
            .set_default("smtp_port", i64::from(DEFAULT_SMTP_PORT))?
            .set_default("imap_server", DEFAULT_IMAP_SERVER)?
            .set_default("imap_port", i64::from(DEFAULT_IMAP_PORT))?
            .set_default("imap_mailbox", DEFAULT_IMAP_MAILBOX)
    }

    // All sections share one flat key space, so each is deserialized from the same source
    fn from_config(config: Config) -> Result<Self, ConfigError> {
        Ok(Self {
            email: config.clone().try_deserialize()?,
            messaging: config.clone().try_deserialize()?,
            discord: config.clone().try_deserialize()?,
            logging: config.try_deserialize()?,
        })
    }
}

fn apply_overrides<I>(
    mut builder: ConfigBuilder<DefaultState>,
    vars: I,
) -> Result<ConfigBuilder<DefaultState>, ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, value) in vars {
        if RECOGNIZED_KEYS.contains(&key.as_str()) {
            builder = builder.set_override(key.to_lowercase(), value)?;
        }
    }
    Ok(builder)
}
