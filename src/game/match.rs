//! Match state and the turn/fire state machine
//!
//! Each peer runs its own [`GameMatch`]. The local unit is driven by input,
//! the remote unit is a mirror driven only by [`PeerMsg`]s. Both peers must
//! reach the same outcome from the same message stream, so nothing here uses
//! randomness or wall-clock time.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ws::protocol::{PeerMsg, WeaponKind};

use super::ballistics::{reflect_angle, ProjectileSpawn};
use super::input::{InputEdges, InputFrame, Key};
use super::physics::{ArcadeWorld, ArenaLayout, BodyClass, BodyDesc, BodyHandle, Contact, PhysicsWorld};
use super::unit::{Side, Unit, UnitKind};

/// Match phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    /// Waiting for the opponent's join handshake
    WaitingForPeer,
    /// This peer moves and fires
    LocalTurn,
    /// The opponent moves and fires
    RemoteTurn,
    Won,
    Lost,
}

impl MatchPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, MatchPhase::Won | MatchPhase::Lost)
    }

    fn is_live(self) -> bool {
        matches!(self, MatchPhase::LocalTurn | MatchPhase::RemoteTurn)
    }
}

/// Aiming step within a local turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireSubphase {
    SettingAngle,
    SettingPower,
}

/// Current aim. Never sent as such; the peer only sees the final shot.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AimState {
    /// Degrees, 0 = right, 90 = up, 180 = left
    pub angle: f32,
    pub power: f32,
}

/// What to do with a message that arrives in a phase where it is not expected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DesyncPolicy {
    /// Log and drop
    #[default]
    Ignore,
    /// Apply anyway
    Apply,
}

/// Message that does not fit the current match phase
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProtocolViolation {
    #[error("{kind} received during {phase:?}")]
    UnexpectedMessage {
        kind: &'static str,
        phase: MatchPhase,
    },

    #[error("join from {id} after the handshake completed")]
    DuplicateJoin { id: String },
}

/// Match configuration shared by both peers
#[derive(Debug, Clone)]
pub struct MatchConfig {
    pub arena: ArenaLayout,
    /// Upper bound for shot power; never above the field width
    pub max_power: f32,
    /// Chassis for both units. Not on the wire, so peers must agree.
    pub unit_kind: UnitKind,
    pub local_spawn: (f32, f32),
    pub remote_spawn: (f32, f32),
    pub desync_policy: DesyncPolicy,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            arena: ArenaLayout::default(),
            max_power: 800.0,
            unit_kind: UnitKind::Light,
            local_spawn: (100.0, 540.0),
            remote_spawn: (1180.0, 540.0),
            desync_policy: DesyncPolicy::Ignore,
        }
    }
}

/// Logical owner of a physics body
#[derive(Debug, Clone, Copy, PartialEq)]
enum Entity {
    Unit(Side),
    Shell { damage: f32, weapon: WeaponKind },
}

/// Read-only view for the HUD
#[derive(Debug, Clone, PartialEq)]
pub struct Hud {
    pub phase: MatchPhase,
    pub angle: f32,
    pub power: f32,
    pub shell: WeaponKind,
    pub health: f32,
    pub opponent_health: Option<f32>,
    pub banner: Option<&'static str>,
}

/// One peer's view of the duel
pub struct GameMatch<W: PhysicsWorld = ArcadeWorld> {
    config: MatchConfig,
    phase: MatchPhase,
    fire_phase: FireSubphase,
    aim: AimState,
    self_id: String,
    opponent_id: Option<String>,
    local: Unit,
    remote: Option<Unit>,
    world: W,
    /// Physics handle -> logical entity
    bodies: HashMap<BodyHandle, Entity>,
    unit_bodies: HashMap<Side, BodyHandle>,
    edges: InputEdges,
    outbox: Vec<PeerMsg>,
}

impl GameMatch<ArcadeWorld> {
    /// Create a match on the default arcade world
    pub fn with_arcade(config: MatchConfig) -> Self {
        let world = ArcadeWorld::new(config.arena.clone());
        Self::new(config, world)
    }
}

impl<W: PhysicsWorld> GameMatch<W> {
    pub fn new(config: MatchConfig, world: W) -> Self {
        let (x, y) = config.local_spawn;
        let local = Unit::new(Side::Local, config.unit_kind, x, y);

        let mut game_match = Self {
            config,
            phase: MatchPhase::WaitingForPeer,
            fire_phase: FireSubphase::SettingAngle,
            aim: AimState::default(),
            self_id: Uuid::new_v4().to_string(),
            opponent_id: None,
            local,
            remote: None,
            world,
            bodies: HashMap::new(),
            unit_bodies: HashMap::new(),
            edges: InputEdges::default(),
            outbox: Vec::new(),
        };
        game_match.spawn_unit_body(Side::Local);
        game_match
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn fire_phase(&self) -> FireSubphase {
        self.fire_phase
    }

    pub fn aim(&self) -> AimState {
        self.aim
    }

    pub fn self_id(&self) -> &str {
        &self.self_id
    }

    pub fn opponent_id(&self) -> Option<&str> {
        self.opponent_id.as_deref()
    }

    pub fn local(&self) -> &Unit {
        &self.local
    }

    pub fn remote(&self) -> Option<&Unit> {
        self.remote.as_ref()
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    /// Handles of projectiles currently in flight
    pub fn projectiles(&self) -> Vec<BodyHandle> {
        let mut handles: Vec<BodyHandle> = self
            .bodies
            .iter()
            .filter(|(_, e)| matches!(e, Entity::Shell { .. }))
            .map(|(h, _)| *h)
            .collect();
        handles.sort();
        handles
    }

    /// Take every message queued for the peer since the last call
    pub fn drain_outbox(&mut self) -> Vec<PeerMsg> {
        std::mem::take(&mut self.outbox)
    }

    /// End-of-match text
    pub fn banner(&self) -> Option<&'static str> {
        match self.phase {
            MatchPhase::Won => Some("You Win! :)"),
            MatchPhase::Lost => Some("You Lose! :("),
            _ => None,
        }
    }

    pub fn hud(&self) -> Hud {
        Hud {
            phase: self.phase,
            angle: self.aim.angle,
            power: self.aim.power,
            shell: self.local.weapon,
            health: self.local.health,
            opponent_health: self.remote.as_ref().map(|r| r.health),
            banner: self.banner(),
        }
    }

    /// One polling tick: input, physics, then health checks
    pub fn tick(&mut self, frame: &InputFrame, dt: f32) {
        self.handle_input(frame);
        self.step(dt);
    }

    /// Interpret local input. Only polled during the local turn.
    pub fn handle_input(&mut self, frame: &InputFrame) {
        // Sampled in every phase so releases during the remote turn are seen
        self.edges.update(frame);
        if self.phase != MatchPhase::LocalTurn {
            return;
        }

        // Movement is mirrored every polled tick, including stops
        let direction = frame.movement();
        self.local.move_dir(direction);
        self.outbox.push(PeerMsg::UnitMove { direction });

        for key in [Key::ShellLight, Key::ShellHeavy, Key::ShellExplosive] {
            if !self.edges.take_pressed(key) {
                continue;
            }
            if let Some(shell) = key.weapon() {
                self.local.select_weapon(shell);
                self.outbox.push(PeerMsg::ShellSwitch { shell });
                debug!(shell = ?shell, "Shell selected");
            }
        }

        match self.fire_phase {
            FireSubphase::SettingAngle => {
                self.update_angle(frame);
                if self.edges.take_pressed(Key::Confirm) {
                    self.fire_phase = FireSubphase::SettingPower;
                    debug!(angle = self.aim.angle, "Angle locked");
                }
            }
            FireSubphase::SettingPower => {
                if frame.is_held(Key::Cancel) {
                    self.fire_phase = FireSubphase::SettingAngle;
                    debug!("Aim cancelled");
                    return;
                }
                self.update_power(frame);
                if self.edges.take_pressed(Key::Confirm) {
                    self.fire_local();
                }
            }
        }
    }

    /// Apply a message from the peer (or the relay).
    ///
    /// Returns an error when the message was dropped because it does not fit
    /// the current phase.
    pub fn handle_message(&mut self, msg: PeerMsg) -> Result<(), ProtocolViolation> {
        if self.phase.is_terminal() {
            debug!(kind = msg.kind(), phase = ?self.phase, "Match over, ignoring message");
            return Ok(());
        }

        match msg {
            PeerMsg::Welcome { id } => {
                if self.phase != MatchPhase::WaitingForPeer {
                    return Err(self.violation("welcome"));
                }
                debug!(id = %id, "Relay assigned id");
                self.self_id = id;
                Ok(())
            }
            PeerMsg::PeerJoined { first_to_join, id } => self.handle_join(first_to_join, id),
            other => {
                if self.phase != MatchPhase::RemoteTurn {
                    let violation = self.violation(other.kind());
                    match self.config.desync_policy {
                        DesyncPolicy::Ignore => {
                            warn!(violation = %violation, "Protocol violation, dropping message");
                            return Err(violation);
                        }
                        DesyncPolicy::Apply if self.remote.is_none() => {
                            warn!(violation = %violation, "Protocol violation with no opponent, dropping message");
                            return Err(violation);
                        }
                        DesyncPolicy::Apply => {
                            warn!(violation = %violation, "Protocol violation, applying anyway");
                        }
                    }
                }
                self.apply_remote(other);
                Ok(())
            }
        }
    }

    /// Advance physics, resolve hits and check for a winner
    pub fn step(&mut self, dt: f32) {
        self.sync_unit_velocities();
        let report = self.world.step(dt);

        for handle in report.removed {
            self.bodies.remove(&handle);
        }
        for contact in report.contacts {
            self.resolve_hit(contact);
        }

        self.sync_unit_positions();
        self.observe_units();
    }

    fn violation(&self, kind: &'static str) -> ProtocolViolation {
        ProtocolViolation::UnexpectedMessage {
            kind,
            phase: self.phase,
        }
    }

    /// Returns false if the match is already over
    fn set_phase(&mut self, next: MatchPhase) -> bool {
        if self.phase.is_terminal() {
            debug!(phase = ?self.phase, next = ?next, "Match over, phase change refused");
            return false;
        }
        if next == MatchPhase::LocalTurn {
            self.fire_phase = FireSubphase::SettingAngle;
        }
        info!(from = ?self.phase, to = ?next, "Phase change");
        self.phase = next;
        true
    }

    fn handle_join(&mut self, first_to_join: bool, id: String) -> Result<(), ProtocolViolation> {
        if self.phase != MatchPhase::WaitingForPeer || self.remote.is_some() {
            let violation = ProtocolViolation::DuplicateJoin { id };
            warn!(violation = %violation, "Ignoring join");
            return Err(violation);
        }

        let (x, y) = self.config.remote_spawn;
        self.remote = Some(Unit::new(Side::Remote, self.config.unit_kind, x, y));
        self.spawn_unit_body(Side::Remote);
        info!(opponent_id = %id, first_to_join, "Opponent joined");
        self.opponent_id = Some(id);

        if first_to_join {
            // Our announcement was answered; the waiting peer moves first
            self.set_phase(MatchPhase::RemoteTurn);
        } else {
            self.outbox.push(PeerMsg::PeerJoined {
                first_to_join: true,
                id: self.self_id.clone(),
            });
            self.set_phase(MatchPhase::LocalTurn);
        }
        Ok(())
    }

    /// Replay a peer action on the mirrored unit
    fn apply_remote(&mut self, msg: PeerMsg) {
        let Some(remote) = self.remote.as_mut() else {
            return;
        };

        match msg {
            PeerMsg::UnitMove { direction } => {
                remote.move_dir(direction.mirrored());
            }
            PeerMsg::ShellSwitch { shell } => {
                remote.select_weapon(shell);
                debug!(shell = ?shell, "Opponent selected shell");
            }
            PeerMsg::FireShell { angle, power } => {
                let mirrored = reflect_angle(angle);
                let spawns = remote.fire(mirrored, power);
                info!(angle = mirrored, power, shell = ?remote.weapon, "Opponent fired");
                self.spawn_projectiles(spawns);
                self.set_phase(MatchPhase::LocalTurn);
            }
            PeerMsg::Welcome { .. } | PeerMsg::PeerJoined { .. } => {}
        }
    }

    fn update_angle(&mut self, frame: &InputFrame) {
        let dx = frame.pointer_x - self.local.x;
        let dy = self.local.y - frame.pointer_y;
        if dx == 0.0 {
            return;
        }

        let angle = dy.atan2(dx).to_degrees();
        self.aim.angle = if angle < -90.0 {
            180.0
        } else if angle < 0.0 {
            0.0
        } else {
            angle
        };
    }

    fn update_power(&mut self, frame: &InputFrame) {
        let limit = self.config.max_power.min(self.config.arena.width);
        self.aim.power = frame.pointer_x.clamp(0.0, limit);
    }

    fn fire_local(&mut self) {
        let AimState { angle, power } = self.aim;
        let spawns = self.local.fire(angle, power);
        info!(angle, power, shell = ?self.local.weapon, "Shot fired");

        self.spawn_projectiles(spawns);
        self.outbox.push(PeerMsg::FireShell { angle, power });
        self.fire_phase = FireSubphase::SettingAngle;
        self.set_phase(MatchPhase::RemoteTurn);
    }

    fn unit(&self, side: Side) -> Option<&Unit> {
        match side {
            Side::Local => Some(&self.local),
            Side::Remote => self.remote.as_ref(),
        }
    }

    fn unit_mut(&mut self, side: Side) -> Option<&mut Unit> {
        match side {
            Side::Local => Some(&mut self.local),
            Side::Remote => self.remote.as_mut(),
        }
    }

    fn spawn_unit_body(&mut self, side: Side) {
        let Some(unit) = self.unit(side) else {
            return;
        };
        let stats = unit.stats();
        let desc = BodyDesc {
            class: BodyClass::Unit,
            x: unit.x,
            y: unit.y,
            half_w: stats.half_width,
            half_h: stats.half_height,
            vel_x: 0.0,
            vel_y: 0.0,
            gravity: stats.weight,
            bounce: 0.0,
        };

        let handle = self.world.add_body(desc);
        self.bodies.insert(handle, Entity::Unit(side));
        self.unit_bodies.insert(side, handle);
    }

    fn spawn_projectiles(&mut self, spawns: Vec<ProjectileSpawn>) {
        for spawn in spawns {
            let handle = self.world.add_body(BodyDesc {
                class: BodyClass::Projectile,
                x: spawn.x,
                y: spawn.y,
                half_w: spawn.radius,
                half_h: spawn.radius,
                vel_x: spawn.vel_x,
                vel_y: spawn.vel_y,
                gravity: spawn.gravity,
                bounce: spawn.bounce,
            });
            self.bodies.insert(
                handle,
                Entity::Shell {
                    damage: spawn.damage,
                    weapon: spawn.weapon,
                },
            );
        }
    }

    fn sync_unit_velocities(&mut self) {
        for side in [Side::Local, Side::Remote] {
            let (Some(handle), Some(vel_x)) = (
                self.unit_bodies.get(&side).copied(),
                self.unit(side).map(|u| u.vel_x),
            ) else {
                continue;
            };
            self.world.set_velocity_x(handle, vel_x);
        }
    }

    fn sync_unit_positions(&mut self) {
        for side in [Side::Local, Side::Remote] {
            let Some(handle) = self.unit_bodies.get(&side).copied() else {
                continue;
            };
            if let Some((x, y)) = self.world.position(handle) {
                if let Some(unit) = self.unit_mut(side) {
                    unit.set_position(x, y);
                }
            }
        }
    }

    /// Damage callback for a projectile touching a unit
    fn resolve_hit(&mut self, contact: Contact) {
        let Some(Entity::Shell { damage, weapon }) = self.bodies.get(&contact.projectile).copied()
        else {
            return;
        };
        let Some(Entity::Unit(side)) = self.bodies.get(&contact.unit).copied() else {
            return;
        };

        self.bodies.remove(&contact.projectile);
        self.world.remove_body(contact.projectile);

        if let Some(unit) = self.unit_mut(side) {
            unit.apply_damage(damage);
            debug!(side = ?unit.side, shell = ?weapon, health = unit.health, "Unit hit");
        }
    }

    /// Consume dirty flags and move to a terminal phase on destruction.
    /// The local unit is checked first, so mutual destruction is a loss.
    fn observe_units(&mut self) {
        if self.local.consume_dirty() {
            info!(health = self.local.health, "Local unit damaged");
            if self.local.is_destroyed() && self.phase.is_live() {
                self.set_phase(MatchPhase::Lost);
            }
        }

        let remote_destroyed = self.remote.as_mut().map_or(false, |remote| {
            if !remote.consume_dirty() {
                return false;
            }
            info!(health = remote.health, "Opponent unit damaged");
            remote.is_destroyed()
        });
        if remote_destroyed && self.phase.is_live() {
            self.set_phase(MatchPhase::Won);
        }
    }
}
