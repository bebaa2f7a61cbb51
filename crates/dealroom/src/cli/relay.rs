//! `dealroom relay`: forward notifications between the two teams.

use anyhow::{bail, Context, Result};
use dealroom_bus::Relay;
use tracing::info;

use super::settings::GlobalArgs;

pub async fn run(args: &GlobalArgs) -> Result<()> {
    if args.no_bus {
        bail!("--no-bus disables notifications; the relay has nothing to do");
    }

    let endpoints = args.endpoints();
    let relay = Relay::bind(&endpoints)
        .await
        .with_context(|| format!("Failed to bind relay on {} / {}", endpoints.publish_addr, endpoints.subscribe_addr))?;

    let bound = relay.endpoints();
    println!("Relay running. Press Ctrl-C to stop.");
    println!("  publishers connect to:  {}", bound.publish_addr);
    println!("  subscribers connect to: {}", bound.subscribe_addr);

    let forwarded = relay
        .run(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    info!(forwarded, "Relay stopped");
    println!("Relay stopped after forwarding {} messages", forwarded);
    Ok(())
}
