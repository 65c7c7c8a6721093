use crate::config::EmailConfig;
use crate::traits::{InboundMessage, MailboxReader};
use async_imap::Session;
use async_native_tls::{TlsConnector, TlsStream};
use async_trait::async_trait;
use futures::{StreamExt, pin_mut};
use mail_parser::MessageParser;
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};

type ImapSession = Session<TlsStream<Compat<TcpStream>>>;

/// Bodies returned by inbox listings are cut to this many characters.
pub const MAX_BODY_CHARS: usize = 500;

pub struct ImapMailboxReader {
    config: EmailConfig,
}

impl ImapMailboxReader {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    async fn connect(&self) -> anyhow::Result<ImapSession> {
        let (username, password) = self
            .config
            .credentials()
            .ok_or_else(|| anyhow::anyhow!("IMAP credentials are not configured"))?;

        let addr = format!("{}:{}", self.config.imap_server, self.config.imap_port);
        let tcp_stream = TcpStream::connect(&addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to connect to {}: {}", addr, e))?;

        let tls = TlsConnector::new();
        let tls_stream = tls
            .connect(&self.config.imap_server, tcp_stream.compat())
            .await
            .map_err(|e| anyhow::anyhow!("TLS connection failed: {}", e))?;

        let client = async_imap::Client::new(tls_stream);

        let session = client
            .login(username, password)
            .await
            .map_err(|e| anyhow::anyhow!("Login failed: {:?}", e.0))?;

        Ok(session)
    }
}

#[async_trait]
impl MailboxReader for ImapMailboxReader {
    async fn fetch_recent(&self, limit: usize) -> anyhow::Result<Vec<Vec<u8>>> {
        let mut session = self.connect().await?;

        let mailbox = &self.config.imap_mailbox;
        session
            .select(mailbox)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to select mailbox {}: {}", mailbox, e))?;

        let search_result = session
            .search("ALL")
            .await
            .map_err(|e| anyhow::anyhow!("Search failed: {}", e))?;

        // Sequence numbers grow with arrival order, so the tail is the most recent
        let mut seq_nums: Vec<u32> = search_result.into_iter().collect();
        seq_nums.sort_unstable();
        let recent = seq_nums.split_off(seq_nums.len().saturating_sub(limit));

        let mut fetched: Vec<(u32, Vec<u8>)> = Vec::with_capacity(recent.len());

        if !recent.is_empty() {
            let sequence_set = recent
                .iter()
                .map(|n| n.to_string())
                .collect::<Vec<_>>()
                .join(",");

            let fetch_stream = session
                .fetch(sequence_set, "RFC822")
                .await
                .map_err(|e| anyhow::anyhow!("Fetch failed for messages: {}", e))?;
            pin_mut!(fetch_stream);

            while let Some(fetch_result) = fetch_stream.next().await {
                let message = fetch_result
                    .map_err(|e| anyhow::anyhow!("Error reading fetch result: {}", e))?;

                if let Some(body) = message.body() {
                    fetched.push((message.message, body.to_vec()));
                }
            }
        }

        session
            .logout()
            .await
            .map_err(|e| anyhow::anyhow!("Logout failed: {}", e))?;

        fetched.sort_by_key(|(seq, _)| *seq);
        Ok(fetched.into_iter().map(|(_, body)| body).collect())
    }
}

/// Decodes a raw RFC 822 message into a listing summary.
///
/// The plain text part wins over HTML when the message is multipart.
/// Returns `None` if the bytes are not a parseable message.
pub fn parse_inbound(raw: &[u8]) -> Option<InboundMessage> {
    let message = MessageParser::default().parse(raw)?;

    let from = message
        .from()
        .and_then(|address| address.first())
        .map(|addr| {
            let address = addr.address.as_deref().unwrap_or_default();
            match addr.name.as_deref() {
                Some(name) if !name.is_empty() => format!("{} <{}>", name, address),
                _ => address.to_string(),
            }
        })
        .unwrap_or_default();

    let body = message
        .body_text(0)
        .map(|text| truncate_chars(&text, MAX_BODY_CHARS))
        .unwrap_or_default();

    Some(InboundMessage {
        from,
        to: None,
        subject: Some(message.subject().unwrap_or_default().to_string()),
        body,
        date: message.date().map(|date| date.to_rfc3339()),
        status: None,
    })
}

/// Keeps at most `max` characters (not bytes) of `text`.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
