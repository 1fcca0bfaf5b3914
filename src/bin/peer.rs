//! Tank Duel headless peer
//!
//! Connects to the relay, waits for an opponent and plays one match with
//! commands typed on stdin. HUD changes and the final banner are logged.

use tracing::{info, warn};

use tank_duel::config::Config;
use tank_duel::peer::console::spawn_stdin_reader;
use tank_duel::peer::{run_peer, PeerDriver, SharedInput};
use tank_duel::util::logging::init_tracing;
use tank_duel::util::shutdown::shutdown_signal;
use tank_duel::ws::PeerLink;
use tank_duel::VERSION;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    init_tracing(&config.log_level, config.log_format);

    info!(version = VERSION, unit = ?config.unit_kind, "Starting Tank Duel peer");

    let link = PeerLink::connect(&config.relay_url).await?;

    let input = SharedInput::new();
    spawn_stdin_reader(input.clone());
    let driver = PeerDriver::new(config.match_config(), input, config.tick_rate);

    tokio::select! {
        outcome = run_peer(driver, link, config.tick_rate) => {
            let outcome = outcome?;
            info!(outcome = ?outcome, "Peer exiting");
        }
        _ = shutdown_signal() => {
            warn!("Match abandoned");
        }
    }

    Ok(())
}
