/*!
 * Copyright (c) 2026 Ming Lyu, aka mingcheng
 *
 * This source code is licensed under the MIT License,
 * which is located in the LICENSE file in the source tree's root directory.
 *
 * File: twilio.rs
 * Author: mingcheng <mingcheng@apache.org>
 * File Created: 2026-10-14 10:05:19
 *
 * Modified By: mingcheng <mingcheng@apache.org>
 * Last Modified: 2026-10-16 17:44:38
 */

use crate::traits::{DeliveryReceipt, InboundMessage, MessagingProvider};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;

/// Twilio Programmable Messaging over its REST API.
pub struct TwilioProvider {
    account_sid: String,
    auth_token: String,
    client: Client,
    api_url: String,
}

#[derive(Debug, Deserialize)]
struct TwilioMessage {
    sid: Option<String>,
    from: Option<String>,
    to: Option<String>,
    body: Option<String>,
    date_sent: Option<String>,
    status: Option<String>,
}

// Largest page the Messages list resource will return
const MAX_PAGE_SIZE: usize = 1000;

#[derive(Debug, Deserialize)]
struct TwilioMessagePage {
    #[serde(default)]
    messages: Vec<TwilioMessage>,
    next_page_uri: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TwilioError {
    code: Option<i64>,
    message: Option<String>,
}

impl TwilioProvider {
    pub fn new(account_sid: String, auth_token: String) -> Self {
        Self {
            account_sid,
            auth_token,
            client: Client::new(),
            api_url: "https://api.twilio.com".to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_api_url(account_sid: String, auth_token: String, api_url: String) -> Self {
        Self {
            account_sid,
            auth_token,
            client: Client::new(),
            api_url,
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_url, self.account_sid
        )
    }

    async fn check(response: reqwest::Response) -> anyhow::Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let error: TwilioError = response.json().await.unwrap_or_default();
        Err(anyhow::anyhow!(
            "Twilio API error: {} (code {}): {}",
            status,
            error.code.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string()),
            error.message.unwrap_or_default()
        ))
    }
}

/// Normalizes Twilio's RFC 2822 timestamps to RFC 3339, passing anything else through.
fn normalize_date(date: String) -> String {
    chrono::DateTime::parse_from_rfc2822(&date)
        .map(|parsed| parsed.to_rfc3339())
        .unwrap_or(date)
}

impl From<TwilioMessage> for InboundMessage {
    fn from(message: TwilioMessage) -> Self {
        Self {
            from: message.from.unwrap_or_default(),
            to: message.to,
            subject: None,
            body: message.body.unwrap_or_default(),
            date: message.date_sent.map(normalize_date),
            status: message.status,
        }
    }
}

#[async_trait]
impl MessagingProvider for TwilioProvider {
    fn is_available(&self) -> bool {
        true
    }

    async fn create_message(
        &self,
        from: &str,
        to: &str,
        body: &str,
    ) -> anyhow::Result<DeliveryReceipt> {
        let params = [("To", to), ("From", from), ("Body", body)];

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&params)
            .send()
            .await?;

        let message: TwilioMessage = Self::check(response).await?.json().await?;
        debug!(
            "Twilio accepted message {:?} with status {:?}",
            message.sid, message.status
        );

        Ok(DeliveryReceipt {
            sid: message.sid,
            status: message.status,
        })
    }

    /// Pages through the account's messages until `limit` are collected or
    /// Twilio reports no further page. Each page holds at most 1000 entries.
    async fn list_messages(&self, limit: usize) -> anyhow::Result<Vec<InboundMessage>> {
        let mut messages = Vec::new();
        if limit == 0 {
            return Ok(messages);
        }

        let page_size = limit.min(MAX_PAGE_SIZE);
        let mut request = self
            .client
            .get(self.messages_url())
            .query(&[("PageSize", page_size)]);

        loop {
            let response = request
                .basic_auth(&self.account_sid, Some(&self.auth_token))
                .send()
                .await?;
            let page: TwilioMessagePage = Self::check(response).await?.json().await?;

            let remaining = limit - messages.len();
            messages.extend(
                page.messages
                    .into_iter()
                    .take(remaining)
                    .map(InboundMessage::from),
            );

            match page.next_page_uri {
                Some(uri) if messages.len() < limit && !uri.is_empty() => {
                    request = self.client.get(format!("{}{}", self.api_url, uri));
                }
                _ => break,
            }
        }

        Ok(messages)
    }
}
