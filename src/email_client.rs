use crate::config::EmailConfig;
use crate::imap_receiver::{ImapMailboxReader, parse_inbound};
use crate::smtp_sender::{RealSmtpMailerFactory, SmtpMailer, SmtpMailerFactory, build_message};
use crate::traits::{InboundMessage, MailboxReader, OutboundMessage};
use crate::worker::offload;
use log::{error, info, warn};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Default number of messages returned by `list_recent`.
pub const DEFAULT_LIST_LIMIT: usize = 10;

#[cfg(test)]
#[path = "./email_client_tests.rs"]
mod email_client_tests;

/// Sends mail over SMTP and lists the inbox over IMAP.
///
/// Construction never fails. Without an address and password the client is
/// unconfigured: sends return `false` and listings return nothing, without
/// touching the network. Transport failures are logged and absorbed the
/// same way.
pub struct EmailClient {
    config: EmailConfig,
    factory: Arc<dyn SmtpMailerFactory>,
    mailer: OnceCell<Arc<dyn SmtpMailer>>,
    mailbox: Arc<dyn MailboxReader>,
}

impl EmailClient {
    pub fn new(config: EmailConfig) -> Self {
        let mailbox = Arc::new(ImapMailboxReader::new(config.clone()));
        Self::with_backends(config, Arc::new(RealSmtpMailerFactory), mailbox)
    }

    pub fn with_backends(
        config: EmailConfig,
        factory: Arc<dyn SmtpMailerFactory>,
        mailbox: Arc<dyn MailboxReader>,
    ) -> Self {
        if config.credentials().is_none() {
            warn!("[EMAIL] Email credentials not set, sending and reading are disabled");
        }

        Self {
            config,
            factory,
            mailer: OnceCell::new(),
            mailbox,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.config.credentials().is_some()
    }

    /// Sends one email, returning whether the server accepted it.
    pub async fn send(&self, to: &str, subject: &str, body: &str, is_html: bool) -> bool {
        let Some((from, _)) = self.config.credentials() else {
            error!("[EMAIL] Email credentials not configured");
            return false;
        };

        let message = OutboundMessage::email(to, subject, body, is_html);
        match self.deliver(from, &message).await {
            Ok(()) => {
                info!("[EMAIL] Successfully sent email to {}", to);
                true
            }
            Err(e) => {
                error!("[EMAIL] Error sending email to {}: {:?}", to, e);
                false
            }
        }
    }

    async fn deliver(&self, from: &str, message: &OutboundMessage) -> anyhow::Result<()> {
        let email = build_message(from, message)?;
        let envelope = email.envelope().clone();
        let content = email.formatted();

        let mailer = self
            .mailer
            .get_or_try_init(|| async {
                self.factory
                    .create(&self.config)
                    .map(Arc::<dyn SmtpMailer>::from)
            })
            .await?
            .clone();

        offload(async move { mailer.send(envelope, &content).await }).await
    }

    /// Lists up to `limit` of the most recent inbox messages, oldest first.
    pub async fn list_recent(&self, limit: usize) -> Vec<InboundMessage> {
        if !self.is_configured() {
            error!("[EMAIL] Email credentials not configured");
            return Vec::new();
        }

        if limit == 0 {
            return Vec::new();
        }

        let mailbox = self.mailbox.clone();
        match offload(async move { mailbox.fetch_recent(limit).await }).await {
            Ok(raw_messages) => {
                let messages: Vec<InboundMessage> = raw_messages
                    .iter()
                    .filter_map(|raw| {
                        let parsed = parse_inbound(raw);
                        if parsed.is_none() {
                            warn!("[EMAIL] Skipping message that could not be parsed");
                        }
                        parsed
                    })
                    .collect();
                info!("[EMAIL] Retrieved {} emails", messages.len());
                messages
            }
            Err(e) => {
                error!("[EMAIL] Error reading emails: {:?}", e);
                Vec::new()
            }
        }
    }
}
