//! Store commands: `init`, `status`, `reset`.

use anyhow::{bail, Context, Result};
use dealroom_db::{StoreConfig, TermStore};
use dealroom_protocol::SystemConfig;
use dealroom_session::{SessionError, Settlement, SettlementView, TermSheet};

use super::output::terms_table;

pub fn sheet_for(config: &SystemConfig) -> Result<TermSheet> {
    TermSheet::by_name(&config.game)
        .ok_or_else(|| SessionError::UnknownGame(config.game.clone()).into())
}

pub async fn open_store(config: &SystemConfig) -> Result<TermStore> {
    let store_config = StoreConfig::from_url(&config.state_store_url)
        .with_busy_timeout(config.timeouts.store_busy);
    TermStore::open(&store_config, &config.game)
        .await
        .with_context(|| {
            format!(
                "Shared term store unavailable at {}. Check --state-store or DEALROOM_STATE_STORE",
                config.state_store_url
            )
        })
}

/// `dealroom init`
pub async fn init(config: &SystemConfig) -> Result<()> {
    let sheet = sheet_for(config)?;
    let store = open_store(config).await?;

    let seeded = store.initialize(sheet.terms()).await?;
    store
        .verify_terms(sheet.terms())
        .await
        .context("Stored terms do not match this game")?;
    store.close().await;

    if seeded {
        println!(
            "Initialized '{}' with {} terms at {}",
            sheet.name(),
            sheet.terms().len(),
            config.state_store_url
        );
    } else {
        println!("'{}' already initialized; nothing to do", sheet.name());
    }
    Ok(())
}

/// `dealroom status`
pub async fn status(config: &SystemConfig, json: bool) -> Result<()> {
    let sheet = sheet_for(config)?;
    let store = open_store(config).await?;
    let snapshot = store.get_all().await?;
    let fully_approved = store.is_fully_approved().await? && !snapshot.is_empty();
    store.close().await;

    let view = SettlementView::compute(&sheet, snapshot);

    if json {
        let settlement = match &view.result {
            Ok(settlement) => serde_json::to_value(settlement)?,
            Err(e) => serde_json::json!({ "state": "error", "error": e.to_string() }),
        };
        let value = serde_json::json!({
            "game": view.game,
            "fully_approved": fully_approved,
            "terms": view.snapshot,
            "settlement": settlement,
            "display": view.display_value(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    if view.snapshot.is_empty() {
        println!("No '{}' negotiation yet. Run `dealroom init` or `dealroom play --team 1`.", view.game);
        return Ok(());
    }

    println!("{}", terms_table(&view.snapshot));
    match &view.result {
        Ok(Settlement::Settled { .. }) => println!("Settled: {}", view.display_value()),
        _ => println!("Settlement: {}", view.display_value()),
    }
    Ok(())
}

/// `dealroom reset`
pub async fn reset(config: &SystemConfig, yes: bool) -> Result<()> {
    if !yes {
        bail!(
            "Reset clears every value and approval of '{}'. Re-run with --yes to confirm.",
            config.game
        );
    }
    let store = open_store(config).await?;
    let cleared = store.reset().await?;
    store.close().await;
    println!("Cleared {} terms of '{}'", cleared, config.game);
    Ok(())
}
