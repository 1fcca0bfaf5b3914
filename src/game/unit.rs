//! Unit model - per-participant tank state

use serde::{Deserialize, Serialize};

use crate::ws::protocol::{MoveDirection, WeaponKind};

use super::ballistics::{compute_launch, ProjectileSpawn};

/// Which participant a unit belongs to, from this peer's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Input-controlled
    Local,
    /// Mirrored from protocol messages
    Remote,
}

/// Unit chassis types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// Fast, lightly armored
    Light,
    /// Slow, heavily armored
    Heavy,
}

impl Default for UnitKind {
    fn default() -> Self {
        Self::Light
    }
}

/// Constant stats per unit type
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitStats {
    pub max_health: f32,
    /// Flat reduction applied to every incoming hit
    pub armor: f32,
    /// Horizontal speed while moving (px/s)
    pub speed: f32,
    /// Gravity applied to the unit body (px/s²)
    pub weight: f32,
    pub half_width: f32,
    pub half_height: f32,
}

impl UnitStats {
    pub fn for_kind(kind: UnitKind) -> Self {
        match kind {
            UnitKind::Light => Self {
                max_health: 100.0,
                armor: 5.0,
                speed: 100.0,
                weight: 300.0,
                half_width: 24.0,
                half_height: 14.0,
            },
            UnitKind::Heavy => Self {
                max_health: 100.0,
                armor: 10.0,
                speed: 50.0,
                weight: 400.0,
                half_width: 28.0,
                half_height: 16.0,
            },
        }
    }
}

/// A participant's tank
#[derive(Debug, Clone)]
pub struct Unit {
    pub side: Side,
    pub kind: UnitKind,
    pub health: f32,
    pub x: f32,
    pub y: f32,
    pub vel_x: f32,
    pub weapon: WeaponKind,
    dirty: bool,
}

impl Unit {
    pub fn new(side: Side, kind: UnitKind, x: f32, y: f32) -> Self {
        let stats = UnitStats::for_kind(kind);
        Self {
            side,
            kind,
            health: stats.max_health,
            x,
            y,
            vel_x: 0.0,
            weapon: WeaponKind::default(),
            dirty: false,
        }
    }

    pub fn stats(&self) -> UnitStats {
        UnitStats::for_kind(self.kind)
    }

    pub fn armor(&self) -> f32 {
        self.stats().armor
    }

    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    /// Position reported back by the physics world
    pub fn set_position(&mut self, x: f32, y: f32) {
        self.x = x;
        self.y = y;
    }

    /// Set horizontal velocity from a movement command
    pub fn move_dir(&mut self, direction: MoveDirection) {
        let speed = self.stats().speed;
        self.vel_x = match direction {
            MoveDirection::Left => -speed,
            MoveDirection::Right => speed,
            MoveDirection::Stop => 0.0,
        };
    }

    /// Launch the equipped shell from the current position
    pub fn fire(&self, angle_deg: f32, power: f32) -> Vec<ProjectileSpawn> {
        compute_launch(self.x, self.y, angle_deg, power, self.weapon)
    }

    pub fn select_weapon(&mut self, weapon: WeaponKind) {
        self.weapon = weapon;
    }

    /// Subtract `damage - armor` from health. Health is not floored; the match
    /// reacts to `health <= 0` when it consumes the dirty flag.
    pub fn apply_damage(&mut self, damage: f32) {
        self.health -= damage - self.armor();
        self.dirty = true;
    }

    /// Returns whether the unit changed since the last call, clearing the flag.
    /// Only the first caller after a change sees `true`.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn is_destroyed(&self) -> bool {
        self.health <= 0.0
    }
}
