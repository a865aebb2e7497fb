//! Sends one push through the configured notifier, bypassing the poller.
//! Usage: `send-test-alert [body text]`

use quake_alerts::{notify, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let settings = Settings::load()?;
    let notifier = notify::from_settings(&settings, settings.http_client()?)?;

    let body = std::env::args()
        .skip(1)
        .collect::<Vec<_>>()
        .join(" ");
    let msg = settings
        .alert
        .message(Some(if body.is_empty() { "Test alert" } else { &body }));

    notifier.send(&msg).await?;
    println!("sent to topic '{}' via {}", msg.topic, notifier.name());
    Ok(())
}
