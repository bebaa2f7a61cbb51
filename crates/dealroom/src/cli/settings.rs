//! Global flags and resolved configuration.

use anyhow::{bail, Result};
use clap::Args;
use dealroom_protocol::defaults::DEFAULT_GAME;
use dealroom_protocol::paths::{dealroom_home, default_logs_dir, default_state_store_url};
use dealroom_protocol::{BusEndpoints, SystemConfig, Timeouts};
use dealroom_session::TermSheet;

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Shared state store URL (default: sqlite:~/.dealroom/negotiation.sqlite)
    #[arg(long, env = "DEALROOM_STATE_STORE", global = true)]
    pub state_store: Option<String>,

    /// Relay endpoint that publishers connect to
    #[arg(long, env = "DEALROOM_BUS_PUBLISH", global = true)]
    pub bus_publish: Option<String>,

    /// Relay endpoint that subscribers connect to
    #[arg(long, env = "DEALROOM_BUS_SUBSCRIBE", global = true)]
    pub bus_subscribe: Option<String>,

    /// Run without live notifications (manual refresh only)
    #[arg(long, global = true)]
    pub no_bus: bool,

    /// Game (term sheet) to negotiate
    #[arg(long, env = "DEALROOM_GAME", default_value = DEFAULT_GAME, global = true)]
    pub game: String,
}

impl GlobalArgs {
    /// Bus endpoints from flags and environment, ignoring `--no-bus`.
    pub fn endpoints(&self) -> BusEndpoints {
        let defaults = BusEndpoints::default();
        BusEndpoints {
            publish_addr: self.bus_publish.clone().unwrap_or(defaults.publish_addr),
            subscribe_addr: self.bus_subscribe.clone().unwrap_or(defaults.subscribe_addr),
        }
    }

    pub fn resolve(&self) -> Result<SystemConfig> {
        if TermSheet::by_name(&self.game).is_none() {
            bail!(
                "Unknown game '{}'. Available: {}",
                self.game,
                TermSheet::available().join(", ")
            );
        }

        Ok(SystemConfig {
            state_store_url: self
                .state_store
                .clone()
                .unwrap_or_else(default_state_store_url),
            bus: (!self.no_bus).then(|| self.endpoints()),
            game: self.game.clone(),
            timeouts: Timeouts::default(),
        })
    }
}

/// `dealroom config`
pub fn show(config: &SystemConfig, json: bool) -> Result<()> {
    let home = dealroom_home();
    let logs = default_logs_dir();

    if json {
        let value = serde_json::json!({
            "home": home.to_string_lossy(),
            "logs": logs.to_string_lossy(),
            "state_store": config.state_store_url,
            "game": config.game,
            "bus": config.bus.as_ref().map(|b| serde_json::json!({
                "publish": b.publish_addr,
                "subscribe": b.subscribe_addr,
            })),
            "timeouts_ms": {
                "bus_connect": config.timeouts.bus_connect.as_millis() as u64,
                "listener_read": config.timeouts.listener_read.as_millis() as u64,
                "listener_join": config.timeouts.listener_join.as_millis() as u64,
                "store_busy": config.timeouts.store_busy.as_millis() as u64,
            },
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("DEALROOM CONFIGURATION");
    println!("======================");
    println!();
    println!("Home:         {}", home.display());
    println!("Logs:         {}", logs.display());
    println!("State store:  {}", config.state_store_url);
    println!("Game:         {}", config.game);
    match &config.bus {
        Some(bus) => {
            println!("Bus publish:  {}", bus.publish_addr);
            println!("Bus subscribe: {}", bus.subscribe_addr);
        }
        None => println!("Bus:          disabled (manual refresh only)"),
    }
    println!(
        "Timeouts:     connect {}ms, listener read {}ms, join {}ms, store busy {}ms",
        config.timeouts.bus_connect.as_millis(),
        config.timeouts.listener_read.as_millis(),
        config.timeouts.listener_join.as_millis(),
        config.timeouts.store_busy.as_millis(),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(game: &str, no_bus: bool) -> GlobalArgs {
        GlobalArgs {
            state_store: Some("sqlite:/tmp/deal.sqlite".to_string()),
            bus_publish: None,
            bus_subscribe: Some("tcp://127.0.0.1:7000".to_string()),
            no_bus,
            game: game.to_string(),
        }
    }

    #[test]
    fn test_resolve_uses_flags_and_defaults() {
        let config = args("valuation", false).resolve().unwrap();
        assert_eq!(config.state_store_url, "sqlite:/tmp/deal.sqlite");
        let bus = config.bus.unwrap();
        assert_eq!(bus.publish_addr, BusEndpoints::default().publish_addr);
        assert_eq!(bus.subscribe_addr, "tcp://127.0.0.1:7000");
    }

    #[test]
    fn test_no_bus_disables_endpoints() {
        let config = args("valuation", true).resolve().unwrap();
        assert!(config.bus.is_none());
    }

    #[test]
    fn test_unknown_game_rejected() {
        let err = args("bidding", false).resolve().unwrap_err();
        assert!(err.to_string().contains("Unknown game"));
    }
}
