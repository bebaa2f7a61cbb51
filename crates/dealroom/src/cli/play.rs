//! `dealroom play`: one team's interactive session.

use std::sync::Arc;

use anyhow::{Context, Result};
use dealroom_bus::NotificationBus;
use dealroom_protocol::{Role, SystemConfig};
use dealroom_session::{NegotiationSession, SessionContext, SessionOutcome};
use tracing::info;

use super::output::TableRenderer;
use super::store::{open_store, sheet_for};
use super::terminal::TerminalDriver;

pub async fn run(config: &SystemConfig, role: Role) -> Result<()> {
    let sheet = sheet_for(config)?;
    let store = open_store(config).await?;
    let bus = NotificationBus::connect(config.bus.as_ref(), config.timeouts.bus_connect).await;

    println!("Dealroom: {} negotiation", sheet.name());
    println!(
        "You are {} ({}).{}",
        role.team_label(),
        role.as_str(),
        if bus.is_available() {
            ""
        } else {
            " Live updates are off; refresh to see changes."
        }
    );

    let ctx = SessionContext {
        store: store.clone(),
        bus,
        sheet,
        timeouts: config.timeouts,
    };
    let mut session = NegotiationSession::new(role, ctx, Arc::new(TableRenderer));

    // Ctrl-C pauses the session like 'exit' does.
    let signals = session.signals();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted; leaving session");
            signals.shutdown.cancel();
        }
    });

    let mut driver = TerminalDriver::spawn(session.render_gate());
    let outcome = session.run(&mut driver).await;
    ctrl_c.abort();
    store.close().await;

    match outcome.context("Negotiation session failed")? {
        SessionOutcome::Settled(view) => {
            println!();
            println!("Negotiation complete. Final {}: {}", view.game, view.display_value());
        }
        SessionOutcome::Abandoned => {
            let team = match role {
                Role::Proposer => 1,
                Role::Counterparty => 2,
            };
            println!();
            println!(
                "Session paused. Run `dealroom play --team {}` to return.",
                team
            );
        }
    }
    Ok(())
}
