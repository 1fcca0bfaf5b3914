//! Peer game loop: relay link in, input sampled, match stepped, messages out

use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::game::{GameMatch, Hud, InputSource, MatchConfig, MatchPhase};
use crate::util::time::{tick_delta, tick_duration};
use crate::ws::client::{ClientError, PeerLink};
use crate::ws::protocol::PeerMsg;

/// Drives one [`GameMatch`] tick by tick, independent of the transport
pub struct PeerDriver<I: InputSource> {
    game: GameMatch,
    input: I,
    dt: f32,
    last_hud: Option<Hud>,
}

impl<I: InputSource> PeerDriver<I> {
    pub fn new(config: MatchConfig, input: I, tick_rate: u32) -> Self {
        Self {
            game: GameMatch::with_arcade(config),
            input,
            dt: tick_delta(tick_rate),
            last_hud: None,
        }
    }

    pub fn game(&self) -> &GameMatch {
        &self.game
    }

    pub fn input_mut(&mut self) -> &mut I {
        &mut self.input
    }

    /// Final phase once the match is decided
    pub fn outcome(&self) -> Option<MatchPhase> {
        Some(self.game.phase()).filter(|phase| phase.is_terminal())
    }

    /// One tick: apply received messages in order, sample input, simulate.
    /// Returns the messages to send to the peer.
    pub fn tick(&mut self, incoming: Vec<PeerMsg>) -> Vec<PeerMsg> {
        for msg in incoming {
            let kind = msg.kind();
            if let Err(violation) = self.game.handle_message(msg) {
                debug!(kind, violation = %violation, "Message not applied");
            }
        }

        let frame = self.input.sample();
        self.game.tick(&frame, self.dt);
        self.report_hud();

        self.game.drain_outbox()
    }

    fn report_hud(&mut self) {
        let hud = self.game.hud();
        if self.last_hud.as_ref() == Some(&hud) {
            return;
        }

        info!(
            phase = ?hud.phase,
            angle = hud.angle,
            power = hud.power,
            shell = hud.shell.label(),
            health = hud.health,
            opponent_health = ?hud.opponent_health,
            "HUD"
        );
        if let Some(banner) = hud.banner {
            info!("{}", banner);
        }
        self.last_hud = Some(hud);
    }
}

/// Run a peer against the relay until the match is decided
pub async fn run_peer<I: InputSource>(
    mut driver: PeerDriver<I>,
    mut link: PeerLink,
    tick_rate: u32,
) -> Result<MatchPhase, ClientError> {
    let mut ticker = interval(tick_duration(tick_rate));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let incoming = link.poll_incoming()?;
        for msg in driver.tick(incoming) {
            link.send(msg)?;
        }

        if let Some(outcome) = driver.outcome() {
            info!(outcome = ?outcome, "Match finished");
            return Ok(outcome);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{InputCommand, Key, ScriptedInput};
    use crate::ws::protocol::MoveDirection;

    fn driver() -> PeerDriver<ScriptedInput> {
        PeerDriver::new(MatchConfig::default(), ScriptedInput::new(), 60)
    }

    /// Two drivers wired back to back, as a paired relay session would
    fn handshake() -> (PeerDriver<ScriptedInput>, PeerDriver<ScriptedInput>) {
        let mut a = driver();
        let mut b = driver();

        a.tick(vec![PeerMsg::Welcome { id: "a".into() }]);
        let to_b = a.tick(vec![PeerMsg::PeerJoined {
            first_to_join: false,
            id: "b".into(),
        }]);
        assert_eq!(
            to_b.first(),
            Some(&PeerMsg::PeerJoined {
                first_to_join: true,
                id: "a".into()
            })
        );

        let mut incoming = vec![PeerMsg::Welcome { id: "b".into() }];
        incoming.extend(to_b);
        assert!(b.tick(incoming).is_empty());

        (a, b)
    }

    #[test]
    fn test_handshake_orders_turns() {
        let (a, b) = handshake();
        assert_eq!(a.game().phase(), MatchPhase::LocalTurn);
        assert_eq!(b.game().phase(), MatchPhase::RemoteTurn);
        assert_eq!(a.game().opponent_id(), Some("b"));
        assert_eq!(b.game().opponent_id(), Some("a"));
    }

    #[test]
    fn test_shot_hands_turn_over() {
        let (mut a, mut b) = handshake();

        a.input_mut().push(InputCommand::Hold(MoveDirection::Right));
        a.input_mut().push(InputCommand::Aim { x: 400.0, y: 300.0 });
        a.input_mut().push(InputCommand::Tap(Key::Confirm));
        let mut to_b = a.tick(Vec::new());
        to_b.extend(a.tick(Vec::new()));

        a.input_mut().push(InputCommand::Hold(MoveDirection::Stop));
        a.input_mut().push(InputCommand::Aim { x: 500.0, y: 300.0 });
        a.input_mut().push(InputCommand::Tap(Key::Confirm));
        to_b.extend(a.tick(Vec::new()));

        assert_eq!(a.game().phase(), MatchPhase::RemoteTurn);
        assert!(matches!(
            to_b.last(),
            Some(PeerMsg::FireShell { power, .. }) if (*power - 500.0).abs() < 1e-3
        ));

        b.tick(to_b);
        assert_eq!(b.game().phase(), MatchPhase::LocalTurn);
        assert_eq!(b.game().projectiles().len(), 1);
        assert!(a.outcome().is_none());
        assert!(b.outcome().is_none());
    }

    #[test]
    fn test_out_of_turn_message_does_not_stop_the_loop() {
        let (mut a, _b) = handshake();
        let out = a.tick(vec![PeerMsg::FireShell {
            angle: 45.0,
            power: 300.0,
        }]);
        assert_eq!(a.game().phase(), MatchPhase::LocalTurn);
        assert!(a.game().projectiles().is_empty());
        assert!(matches!(out.as_slice(), [PeerMsg::UnitMove { .. }]));
    }
}
