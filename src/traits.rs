use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyFormat {
    #[default]
    Plain,
    Html,
}

/// A single message about to be sent. Lives only for the duration of the send call.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub to: String,
    pub subject: Option<String>,
    pub body: String,
    pub format: BodyFormat,
}

impl OutboundMessage {
    pub fn email(to: &str, subject: &str, body: &str, is_html: bool) -> Self {
        Self {
            to: to.to_string(),
            subject: Some(subject.to_string()),
            body: body.to_string(),
            format: if is_html {
                BodyFormat::Html
            } else {
                BodyFormat::Plain
            },
        }
    }

    pub fn text(to: &str, body: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: None,
            body: body.to_string(),
            format: BodyFormat::Plain,
        }
    }
}

/// Summary of a message returned by a listing call.
///
/// Email listings fill `subject`; messaging listings fill `to` and `status`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct InboundMessage {
    pub from: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub body: String,
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// What the messaging provider reports back after accepting a send request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeliveryReceipt {
    pub sid: Option<String>,
    pub status: Option<String>,
}

impl DeliveryReceipt {
    /// A send only counts when the provider handed back a delivery identifier.
    pub fn is_accepted(&self) -> bool {
        self.sid.as_deref().is_some_and(|sid| !sid.is_empty())
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailboxReader: Send + Sync {
    /// Connects/Authenticates and returns the raw RFC 822 content of the
    /// `limit` most recent messages, oldest first
    async fn fetch_recent(&self, limit: usize) -> anyhow::Result<Vec<Vec<u8>>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagingProvider: Send + Sync {
    /// Whether this provider can talk to anything at all
    fn is_available(&self) -> bool;

    /// Submits one message for delivery
    async fn create_message(
        &self,
        from: &str,
        to: &str,
        body: &str,
    ) -> anyhow::Result<DeliveryReceipt>;

    /// Most recent messages known to the account, newest first
    async fn list_messages(&self, limit: usize) -> anyhow::Result<Vec<InboundMessage>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_requires_sid() {
        assert!(!DeliveryReceipt::default().is_accepted());
        assert!(
            !DeliveryReceipt {
                sid: Some(String::new()),
                status: Some("queued".to_string()),
            }
            .is_accepted()
        );
        assert!(
            DeliveryReceipt {
                sid: Some("SM123".to_string()),
                status: None,
            }
            .is_accepted()
        );
    }

    #[test]
    fn test_outbound_constructors() {
        let email = OutboundMessage::email("bob@example.com", "Hi", "<b>x</b>", true);
        assert_eq!(email.format, BodyFormat::Html);
        assert_eq!(email.subject.as_deref(), Some("Hi"));

        let sms = OutboundMessage::text("+15557654321", "hello");
        assert_eq!(sms.format, BodyFormat::Plain);
        assert!(sms.subject.is_none());
    }
}
