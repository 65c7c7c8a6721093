use crate::config::EmailConfig;
use crate::traits::{BodyFormat, OutboundMessage};
use async_trait::async_trait;
use lettre::address::Envelope;
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

// Implicit TLS port, everything else upgrades with STARTTLS
const SMTPS_PORT: u16 = 465;

// Abstract the mailer so we can mock it
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SmtpMailer: Send + Sync {
    async fn send(&self, envelope: Envelope, email: &[u8]) -> anyhow::Result<()>;
}

// Wrapper for Real Lettre Transport
pub struct RealSmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

#[async_trait]
impl SmtpMailer for RealSmtpMailer {
    async fn send(&self, envelope: Envelope, email: &[u8]) -> anyhow::Result<()> {
        self.transport
            .send_raw(&envelope, email)
            .await
            .map_err(|e| anyhow::anyhow!("SMTP send error: {}", e))
            .map(|_| ())
    }
}

// Factory trait
#[cfg_attr(test, mockall::automock)]
pub trait SmtpMailerFactory: Send + Sync {
    fn create(&self, config: &EmailConfig) -> anyhow::Result<Box<dyn SmtpMailer>>;
}

pub struct RealSmtpMailerFactory;

impl SmtpMailerFactory for RealSmtpMailerFactory {
    fn create(&self, config: &EmailConfig) -> anyhow::Result<Box<dyn SmtpMailer>> {
        let (username, password) = config
            .credentials()
            .ok_or_else(|| anyhow::anyhow!("SMTP credentials are not configured"))?;
        let creds = Credentials::new(username.to_string(), password.to_string());

        let builder = if config.smtp_port == SMTPS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_server)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server)
        }
        .map_err(|e| anyhow::anyhow!("Invalid SMTP host {}: {}", config.smtp_server, e))?;

        let transport = builder
            .port(config.smtp_port)
            .credentials(creds)
            .build();

        Ok(Box::new(RealSmtpMailer { transport }))
    }
}

/// Builds a `multipart/mixed` message carrying the body as a single plain
/// text or HTML part.
pub fn build_message(from: &str, message: &OutboundMessage) -> anyhow::Result<Message> {
    let from: Mailbox = from
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid sender address {}: {}", from, e))?;
    let to: Mailbox = message
        .to
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid recipient address {}: {}", message.to, e))?;

    let content_type = match message.format {
        BodyFormat::Plain => ContentType::TEXT_PLAIN,
        BodyFormat::Html => ContentType::TEXT_HTML,
    };
    let part = SinglePart::builder()
        .header(content_type)
        .body(message.body.clone());

    Message::builder()
        .from(from)
        .to(to)
        .subject(message.subject.clone().unwrap_or_default())
        .multipart(MultiPart::mixed().singlepart(part))
        .map_err(|e| anyhow::anyhow!("Failed to build email: {}", e))
}
