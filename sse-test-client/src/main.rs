use anyhow::Result;
use clap::Parser;
use colored::*;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

mod api_client;
mod backoff;
mod sse_client;

use api_client::{ApiClient, TicketId};
use backoff::BackoffPolicy;
use sse_client::{SubscriberClient, FALLBACK};

#[derive(Parser)]
#[command(name = "sse-test-client")]
#[command(about = "Watch tickets and print their events as they arrive")]
struct Cli {
    /// API base URL including the prefix (e.g., http://localhost:8000/api/v1)
    #[arg(long, default_value = "http://localhost:8000/api/v1")]
    base_url: String,

    /// Subscriber id; defaults to user_<unix seconds>
    #[arg(long)]
    subscriber_id: Option<String>,

    /// Ticket to watch; repeat for several
    #[arg(long = "watch", value_name = "TICKET_ID")]
    watches: Vec<TicketId>,

    /// Consecutive failed connects before giving up
    #[arg(long, default_value_t = 5)]
    max_retries: u32,

    #[arg(long, default_value_t = 500)]
    base_delay_ms: u64,

    #[arg(long, default_value_t = 30_000)]
    max_delay_ms: u64,

    /// Enable verbose output
    #[arg(long, short)]
    verbose: bool,
}

fn default_subscriber_id() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    format!("user_{secs}")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    }

    let api = ApiClient::new(reqwest::Client::new(), &cli.base_url);
    let policy = BackoffPolicy {
        max_retries: cli.max_retries,
        base_delay: Duration::from_millis(cli.base_delay_ms),
        max_delay: Duration::from_millis(cli.max_delay_ms),
    };
    let subscriber_id = cli.subscriber_id.unwrap_or_else(default_subscriber_id);

    let mut client = SubscriberClient::new(api, subscriber_id, policy);
    for ticket_id in &cli.watches {
        client.watch(*ticket_id);
    }

    client.on(
        "connected",
        Box::new(|_, data| {
            println!("{} {}", "✓ connected".green().bold(), data);
        }),
    );
    client.on(
        FALLBACK,
        Box::new(|event_type, data| {
            let ticket = data
                .get("id")
                .map(|id| format!("ticket {id}"))
                .unwrap_or_else(|| "ticket ?".to_string());
            println!("{} {} {}", event_type.cyan().bold(), ticket.yellow(), data);
        }),
    );

    println!(
        "{} Subscribing as {} to {:?}",
        "→".blue(),
        client.subscriber_id().bright_white(),
        cli.watches
    );

    let interrupted = tokio::select! {
        result = client.run() => {
            if let Err(e) = result {
                println!("{} {e:#}", "✗".bright_red().bold());
                std::process::exit(1);
            }
            false
        }
        _ = tokio::signal::ctrl_c() => true,
    };

    if interrupted {
        println!("\n{} Stopping", "→".blue());
        for ticket_id in &cli.watches {
            if let Err(e) = client.unwatch(*ticket_id).await {
                log::warn!("{e:#}");
            }
        }
    }

    Ok(())
}
