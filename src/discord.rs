use crate::config::DiscordConfig;
use log::debug;

/// Placeholder for a Discord bot channel. Only holds the bot token for now.
pub struct DiscordClient {
    bot_token: Option<String>,
}

impl DiscordClient {
    pub fn new(config: DiscordConfig) -> Self {
        let bot_token = config
            .discord_bot_token
            .filter(|token| !token.trim().is_empty());
        debug!(
            "[DISCORD] Bot token {}",
            if bot_token.is_some() { "loaded" } else { "not set" }
        );
        Self { bot_token }
    }

    pub fn is_configured(&self) -> bool {
        self.bot_token.is_some()
    }
}
