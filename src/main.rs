/*!
 * Copyright (c) 2026 Ming Lyu, aka mingcheng
 *
 * This source code is licensed under the MIT License,
 * which is located in the LICENSE file in the source tree's root directory.
 *
 * File: main.rs
 * Author: mingcheng <mingcheng@apache.org>
 * File Created: 2026-10-12 10:03:17
 *
 * Modified By: mingcheng <mingcheng@apache.org>
 * Last Modified: 2026-10-16 18:37:05
 */

use agent_comms::config::{AppConfig, LoggingConfig};
use agent_comms::{
    DEFAULT_LIST_LIMIT, DiscordClient, EmailClient, InboundMessage, MessagingClient,
};
use clap::{Parser, Subcommand};
use log::info;
use rustls::crypto;
use std::io::Write;

struct MultiWriter {
    writers: Vec<Box<dyn Write + Send + 'static>>,
}

impl Write for MultiWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        for w in &mut self.writers {
            let _ = w.write(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        for w in &mut self.writers {
            let _ = w.flush();
        }
        Ok(())
    }
}

/// Manual smoke test for the email and messaging wrappers
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show which wrappers are configured
    Status,
    /// Send one email
    SendEmail {
        #[arg(long)]
        to: String,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        body: String,
        #[arg(long)]
        html: bool,
    },
    /// List the most recent inbox messages
    ReadEmail {
        #[arg(short, long, default_value_t = DEFAULT_LIST_LIMIT)]
        limit: usize,
    },
    /// Send one SMS
    SendSms {
        #[arg(long)]
        to: String,
        #[arg(long)]
        message: String,
    },
    /// Send one WhatsApp message
    SendWhatsapp {
        #[arg(long)]
        to: String,
        #[arg(long)]
        message: String,
    },
    /// List the most recent SMS/WhatsApp messages on the account
    ListMessages {
        #[arg(short, long, default_value_t = DEFAULT_LIST_LIMIT)]
        limit: usize,
    },
}

fn initialize_logger(config: &LoggingConfig) -> anyhow::Result<()> {
    let mut builder = env_logger::Builder::new();

    if let Some(level) = &config.log_level {
        builder.parse_filters(level);
    } else if let Ok(env_level) = std::env::var("RUST_LOG") {
        builder.parse_filters(&env_level);
    } else {
        builder.filter_level(log::LevelFilter::Info);
    }

    if let Some(log_file) = &config.log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .map_err(|e| anyhow::anyhow!("Failed to open log file {}: {}", log_file, e))?;

        if config.quiet {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        } else {
            let multi_writer = MultiWriter {
                writers: vec![Box::new(file), Box::new(std::io::stderr())],
            };
            builder.target(env_logger::Target::Pipe(Box::new(multi_writer)));
        }
    } else if config.quiet {
        builder.target(env_logger::Target::Pipe(Box::new(std::io::sink())));
    }

    builder.init();
    Ok(())
}

fn print_messages(messages: &[InboundMessage]) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(messages)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = crypto::ring::default_provider().install_default();
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let config = match args.config {
        Some(path) => AppConfig::new_from_file(&path),
        None => AppConfig::from_env(),
    }
    .unwrap_or_else(|e| {
        eprintln!("Failed to load config: {:?}", e);
        eprintln!("Set SMTP_*/IMAP_*/EMAIL_*/TWILIO_* environment variables, add them to a `.env` file, or specify a config file with --config.");
        std::process::exit(1);
    });

    initialize_logger(&config.logging)?;

    match args.command {
        Command::Status => {
            let email = EmailClient::new(config.email);
            let messaging = MessagingClient::new(config.messaging);
            let discord = DiscordClient::new(config.discord);

            info!("Email configured: {}", email.is_configured());
            info!("Messaging ready: {}", messaging.is_ready());
            info!("Discord configured: {}", discord.is_configured());
        }
        Command::SendEmail {
            to,
            subject,
            body,
            html,
        } => {
            let email = EmailClient::new(config.email);
            let sent = email.send(&to, &subject, &body, html).await;
            println!("Send result: {}", sent);
        }
        Command::ReadEmail { limit } => {
            let email = EmailClient::new(config.email);
            print_messages(&email.list_recent(limit).await)?;
        }
        Command::SendSms { to, message } => {
            let messaging = MessagingClient::new(config.messaging);
            let sent = messaging.send_sms(&to, &message).await;
            println!("SMS result: {}", sent);
        }
        Command::SendWhatsapp { to, message } => {
            let messaging = MessagingClient::new(config.messaging);
            let sent = messaging.send_whatsapp(&to, &message).await;
            println!("WhatsApp result: {}", sent);
        }
        Command::ListMessages { limit } => {
            let messaging = MessagingClient::new(config.messaging);
            print_messages(&messaging.list_recent(limit).await)?;
        }
    }

    Ok(())
}
