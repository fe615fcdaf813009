use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;

use dispo_mail::display::{PREVIEW_LEN, relative_time, truncate_preview};
use dispo_mail::http::ReqwestClient;
use dispo_mail::{Address, CodeExtractor, MailConfig, MailboxObserver, MailboxSession, Orchestrator, PollReport};

/// Prints the mailbox to stderr as it changes.
struct ConsoleObserver;

impl MailboxObserver for ConsoleObserver {
    fn address_bound(&self, address: &Address) {
        eprintln!("📬 Mailbox: {address}");
    }

    fn messages_received(&self, report: &PollReport) {
        let now = Utc::now();
        for enriched in report.new_messages() {
            let message = &enriched.message;
            eprintln!(
                "\n✉️  {}: {} ({})",
                message.sender,
                message.subject,
                relative_time(message.received_at, now)
            );
            eprintln!("   {}", truncate_preview(&message.body, PREVIEW_LEN));
            if !enriched.codes.is_empty() {
                let codes: Vec<&str> = enriched.codes.iter().map(|c| c.as_str()).collect();
                eprintln!("   🔑 {}", codes.join(", "));
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = MailConfig::from_env().context("reading configuration")?;
    let http = Arc::new(ReqwestClient::new(&config).context("building HTTP client")?);
    let orchestrator = Orchestrator::from_config(http, &config)?;

    eprintln!("dispo-mail v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Domains: {}", orchestrator.available_domains().join(", "));
    eprintln!("   Polling every {}s. Ctrl+C to quit.\n", config.poll_interval.as_secs());

    let session = MailboxSession::new(
        orchestrator,
        CodeExtractor::default_rules(),
        Arc::new(ConsoleObserver),
        config.poll_interval,
    );

    match config.address.as_deref() {
        Some(input) => {
            session
                .access(input)
                .await
                .with_context(|| format!("opening mailbox {input:?}"))?;
        }
        None => {
            session.generate(config.preferred_domain.as_deref()).await;
        }
    }

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl+C")?;
    tracing::info!("Ctrl+C received, shutting down...");
    session
        .set_polling(false, config.poll_interval)
        .await;

    Ok(())
}
