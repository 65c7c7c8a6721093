use crate::config::MessagingConfig;
use crate::traits::{DeliveryReceipt, InboundMessage, MessagingProvider, OutboundMessage};
use crate::worker::offload;
use async_trait::async_trait;
use log::{error, info, warn};
use std::sync::Arc;

const WHATSAPP_PREFIX: &str = "whatsapp:";

/// Stand-in provider used when no real one can be built. Never touches the network.
pub struct DisabledProvider {
    reason: &'static str,
}

impl DisabledProvider {
    pub fn new(reason: &'static str) -> Self {
        Self { reason }
    }

    pub fn reason(&self) -> &'static str {
        self.reason
    }
}

#[async_trait]
impl MessagingProvider for DisabledProvider {
    fn is_available(&self) -> bool {
        false
    }

    async fn create_message(
        &self,
        _from: &str,
        _to: &str,
        _body: &str,
    ) -> anyhow::Result<DeliveryReceipt> {
        Ok(DeliveryReceipt::default())
    }

    async fn list_messages(&self, _limit: usize) -> anyhow::Result<Vec<InboundMessage>> {
        Ok(Vec::new())
    }
}

#[cfg(feature = "twilio")]
fn connect_provider(account_sid: &str, auth_token: &str) -> Arc<dyn MessagingProvider> {
    info!("[MESSAGING] Twilio client initialized");
    Arc::new(crate::twilio::TwilioProvider::new(
        account_sid.to_string(),
        auth_token.to_string(),
    ))
}

#[cfg(not(feature = "twilio"))]
fn connect_provider(_account_sid: &str, _auth_token: &str) -> Arc<dyn MessagingProvider> {
    warn!("[MESSAGING] Twilio not available, built without the `twilio` feature");
    Arc::new(DisabledProvider::new("twilio support not compiled in"))
}

/// Formats a phone number as a WhatsApp channel address.
pub fn whatsapp_address(number: &str) -> String {
    format!("{}{}", WHATSAPP_PREFIX, number)
}

/// SMS and WhatsApp delivery through a messaging provider.
///
/// Every operation is a single provider round trip. Failures, including a
/// missing provider or sender number, are logged and reported as `false` or
/// an empty list.
pub struct MessagingClient {
    provider: Arc<dyn MessagingProvider>,
    from_number: Option<String>,
}

impl MessagingClient {
    pub fn new(config: MessagingConfig) -> Self {
        let from_number = config.sender_number().map(str::to_string);

        let provider = match config.credentials() {
            Some((account_sid, auth_token)) => connect_provider(account_sid, auth_token),
            None => {
                warn!("[MESSAGING] Twilio credentials not set, messaging is disabled");
                Arc::new(DisabledProvider::new("credentials not configured"))
            }
        };

        Self::with_provider(provider, from_number)
    }

    pub fn with_provider(provider: Arc<dyn MessagingProvider>, from_number: Option<String>) -> Self {
        Self {
            provider,
            from_number,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.provider.is_available()
    }

    pub async fn send_sms(&self, to: &str, message: &str) -> bool {
        if !self.is_ready() {
            error!("[MESSAGING] Twilio client not initialized");
            return false;
        }

        let Some(from) = self.from_number.clone() else {
            error!("[MESSAGING] TWILIO_PHONE_NUMBER not set");
            return false;
        };

        self.dispatch("SMS", from, OutboundMessage::text(to, message), to)
            .await
    }

    /// Same as `send_sms`, with both numbers tagged as WhatsApp addresses.
    pub async fn send_whatsapp(&self, to: &str, message: &str) -> bool {
        if !self.is_ready() {
            error!("[MESSAGING] Twilio client not initialized");
            return false;
        }

        let Some(from) = self.from_number.as_deref().map(whatsapp_address) else {
            error!("[MESSAGING] TWILIO_PHONE_NUMBER not set");
            return false;
        };

        let outbound = OutboundMessage::text(&whatsapp_address(to), message);
        self.dispatch("WhatsApp", from, outbound, to).await
    }

    async fn dispatch(
        &self,
        kind: &str,
        from: String,
        message: OutboundMessage,
        display_to: &str,
    ) -> bool {
        let provider = self.provider.clone();
        let result = offload(async move {
            provider
                .create_message(&from, &message.to, &message.body)
                .await
        })
        .await;

        match result {
            Ok(receipt) if receipt.is_accepted() => {
                info!(
                    "[MESSAGING] {} sent to {} (SID: {})",
                    kind,
                    display_to,
                    receipt.sid.unwrap_or_default()
                );
                true
            }
            Ok(_) => {
                error!("[MESSAGING] Failed to send {} to {}", kind, display_to);
                false
            }
            Err(e) => {
                error!("[MESSAGING] Error sending {}: {:?}", kind, e);
                false
            }
        }
    }

    /// Most recent messages on the account, any conversation, newest first.
    pub async fn list_recent(&self, limit: usize) -> Vec<InboundMessage> {
        if !self.is_ready() {
            error!("[MESSAGING] Twilio client not initialized");
            return Vec::new();
        }

        if limit == 0 {
            return Vec::new();
        }

        let provider = self.provider.clone();
        match offload(async move { provider.list_messages(limit).await }).await {
            Ok(mut messages) => {
                messages.truncate(limit);
                messages
            }
            Err(e) => {
                error!("[MESSAGING] Error getting messages: {:?}", e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockMessagingProvider;

    const FROM: &str = "+15551234567";
    const TO: &str = "+15557654321";

    fn ready_provider() -> MockMessagingProvider {
        let mut provider = MockMessagingProvider::new();
        provider.expect_is_available().return_const(true);
        provider
    }

    fn accepted(sid: &str) -> DeliveryReceipt {
        DeliveryReceipt {
            sid: Some(sid.to_string()),
            status: Some("queued".to_string()),
        }
    }

    #[tokio::test]
    async fn test_send_sms_success() {
        let mut provider = ready_provider();
        provider
            .expect_create_message()
            .times(1)
            .withf(|from, to, body| {
                from.to_string() == FROM && to.to_string() == TO && body.to_string() == "hi"
            })
            .returning(|_, _, _| Ok(accepted("SM1")));

        let client = MessagingClient::with_provider(Arc::new(provider), Some(FROM.to_string()));
        assert!(client.is_ready());
        assert!(client.send_sms(TO, "hi").await);
    }

    #[tokio::test]
    async fn test_send_whatsapp_tags_both_numbers() {
        let mut provider = ready_provider();
        provider
            .expect_create_message()
            .times(1)
            .withf(|from, to, _| {
                from.to_string() == "whatsapp:+15551234567"
                    && to.to_string() == "whatsapp:+15557654321"
            })
            .returning(|_, _, _| Ok(accepted("SM2")));

        let client = MessagingClient::with_provider(Arc::new(provider), Some(FROM.to_string()));
        assert!(client.send_whatsapp(TO, "hello").await);
    }

    #[tokio::test]
    async fn test_send_sms_without_sender_number() {
        let mut provider = ready_provider();
        provider.expect_create_message().never();

        let client = MessagingClient::with_provider(Arc::new(provider), None);
        assert!(!client.send_sms(TO, "hi").await);
        assert!(!client.send_whatsapp(TO, "hi").await);
    }

    #[tokio::test]
    async fn test_credentials_without_sender_number() {
        let config = MessagingConfig {
            twilio_account_sid: Some("AC123".to_string()),
            twilio_auth_token: Some("token".to_string()),
            twilio_phone_number: None,
        };

        let _ = rustls::crypto::ring::default_provider().install_default();
        let client = MessagingClient::new(config);
        assert_eq!(client.is_ready(), cfg!(feature = "twilio"));
        assert!(!client.send_sms(TO, "hi").await);
    }

    #[tokio::test]
    async fn test_unconfigured_client() {
        let client = MessagingClient::new(MessagingConfig {
            twilio_phone_number: Some(FROM.to_string()),
            ..MessagingConfig::default()
        });

        assert!(!client.is_ready());
        assert!(!client.send_sms(TO, "hi").await);
        assert!(!client.send_whatsapp(TO, "hi").await);
        assert!(client.list_recent(10).await.is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_provider_is_never_called() {
        let mut provider = MockMessagingProvider::new();
        provider.expect_is_available().return_const(false);
        provider.expect_create_message().never();
        provider.expect_list_messages().never();

        let client = MessagingClient::with_provider(Arc::new(provider), Some(FROM.to_string()));
        assert!(!client.send_sms(TO, "hi").await);
        assert!(client.list_recent(5).await.is_empty());
    }

    #[tokio::test]
    async fn test_receipt_without_sid_is_failure() {
        let mut provider = ready_provider();
        provider
            .expect_create_message()
            .times(1)
            .returning(|_, _, _| Ok(DeliveryReceipt::default()));

        let client = MessagingClient::with_provider(Arc::new(provider), Some(FROM.to_string()));
        assert!(!client.send_sms(TO, "hi").await);
    }

    #[tokio::test]
    async fn test_provider_error_is_absorbed() {
        let mut provider = ready_provider();
        provider
            .expect_create_message()
            .times(1)
            .returning(|_, _, _| Err(anyhow::anyhow!("Twilio API error: 401")));
        provider
            .expect_list_messages()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("connection reset")));

        let client = MessagingClient::with_provider(Arc::new(provider), Some(FROM.to_string()));
        assert!(!client.send_whatsapp(TO, "hi").await);
        assert!(client.list_recent(10).await.is_empty());
    }

    #[tokio::test]
    async fn test_list_recent_respects_limit() {
        let mut provider = ready_provider();
        provider
            .expect_list_messages()
            .times(1)
            .withf(|limit| *limit == 2)
            .returning(|_| {
                Ok((0..3)
                    .map(|i| InboundMessage {
                        from: TO.to_string(),
                        to: Some(FROM.to_string()),
                        body: format!("message {}", i),
                        status: Some("received".to_string()),
                        ..InboundMessage::default()
                    })
                    .collect())
            });

        let client = MessagingClient::with_provider(Arc::new(provider), None);
        let messages = client.list_recent(2).await;

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].body, "message 0");
        assert_eq!(messages[0].status.as_deref(), Some("received"));
    }

    #[tokio::test]
    async fn test_list_recent_zero_limit() {
        let mut provider = ready_provider();
        provider.expect_list_messages().never();

        let client = MessagingClient::with_provider(Arc::new(provider), Some(FROM.to_string()));
        assert!(client.list_recent(0).await.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_provider_is_noop() {
        let provider = DisabledProvider::new("credentials not configured");
        assert!(!provider.is_available());
        assert_eq!(provider.reason(), "credentials not configured");

        let receipt = provider.create_message(FROM, TO, "hi").await.unwrap();
        assert!(!receipt.is_accepted());
        assert!(provider.list_messages(10).await.unwrap().is_empty());
    }

    #[test]
    fn test_whatsapp_address() {
        assert_eq!(whatsapp_address("+15551234567"), "whatsapp:+15551234567");
    }
}
