//! Example: Logging in and following the realtime feed
//!
//! Reads the client configuration from the environment (a `.env` file is
//! honoured), signs in, lists properties and then prints realtime events
//! until Ctrl-C.
//!
//! # Setup
//!
//! ```bash
//! export PROPDESK_API_URL=http://localhost:5000/api
//! export PROPDESK_EMAIL=admin@example.com
//! export PROPDESK_PASSWORD=secret
//! cargo run -p propdesk-infra --example realtime_feed
//! ```

use propdesk_domain::PropertyFilters;
use propdesk_infra::{config, ApiClient, ClientEvent};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let client = ApiClient::from_config(config::load()?)?;

    if !client.is_authenticated() {
        let email = std::env::var("PROPDESK_EMAIL")?;
        let password = std::env::var("PROPDESK_PASSWORD")?;
        client.login(&email, &password).await?;
    }

    let user = client.current_user().await?;
    info!(user = %user.name, role = %user.role, "signed in");

    let properties = client.list_properties(&PropertyFilters::default()).await?;
    info!(count = properties.len(), "properties loaded");

    let mut events = client.subscribe();
    client.setup_websocket(&user.id).await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(ClientEvent::RealtimeMessage(message)) => info!(%message, "realtime message"),
                Ok(ClientEvent::AuthLogout { reason }) => {
                    warn!(%reason, "session ended");
                    break;
                }
                Ok(other) => info!(event = other.name(), "client event"),
                Err(err) => warn!(error = %err, "event stream lagged"),
            },
        }
    }

    client.close_websocket().await;
    Ok(())
}
