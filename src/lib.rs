//! Thin email (SMTP/IMAP) and SMS/WhatsApp (Twilio) client wrappers for agents.
//!
//! Each wrapper is built from an explicit config struct and never returns an
//! error to its caller: failures are logged and reported as `false` or an
//! empty list.

pub mod config;
pub mod discord;
pub mod email_client;
pub mod imap_receiver;
pub mod messaging_client;
pub mod smtp_sender;
pub mod traits;
#[cfg(feature = "twilio")]
pub mod twilio;
pub mod worker;

pub use config::AppConfig;
pub use discord::DiscordClient;
pub use email_client::{DEFAULT_LIST_LIMIT, EmailClient};
pub use messaging_client::MessagingClient;
pub use traits::{InboundMessage, OutboundMessage};
