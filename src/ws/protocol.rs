//! WebSocket protocol message definitions
//! These are the wire types relayed between the two peers

use serde::{Deserialize, Serialize};

/// Shell types a unit can load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponKind {
    /// Standard shell
    Light,
    /// Slow-falling heavy round, double damage
    Heavy,
    /// Three bouncy fragments with low damage each
    Explosive,
}

impl Default for WeaponKind {
    fn default() -> Self {
        Self::Light
    }
}

impl WeaponKind {
    pub fn label(self) -> &'static str {
        match self {
            WeaponKind::Light => "Light",
            WeaponKind::Heavy => "Heavy",
            WeaponKind::Explosive => "Explosive",
        }
    }
}

/// Horizontal movement command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveDirection {
    Left,
    Right,
    Stop,
}

impl MoveDirection {
    /// The same command seen from the opposite side of the field
    pub fn mirrored(self) -> Self {
        match self {
            MoveDirection::Left => MoveDirection::Right,
            MoveDirection::Right => MoveDirection::Left,
            MoveDirection::Stop => MoveDirection::Stop,
        }
    }
}

/// Messages exchanged between peers through the relay.
///
/// Everything is fire-and-forget: there are no acknowledgments and no
/// sequence numbers, so receivers rely on the relay delivering a peer's
/// messages in the order they were sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PeerMsg {
    /// Sent by the relay to a new connection only, carrying its own id
    Welcome { id: String },

    /// Turn-order handshake
    PeerJoined {
        /// `false` when announced by the relay, `true` in the waiting peer's reply
        #[serde(rename = "firstToJoin")]
        first_to_join: bool,
        /// Connection id of the sender
        id: String,
    },

    /// Continuous movement of the sender's unit, sent every polled tick
    UnitMove { direction: MoveDirection },

    /// Turn-ending shot
    FireShell {
        /// Degrees in the sender's frame of reference
        angle: f32,
        power: f32,
    },

    /// Sender loaded a different shell
    ShellSwitch { shell: WeaponKind },
}

impl PeerMsg {
    /// Short name used in logs and violation reports
    pub fn kind(&self) -> &'static str {
        match self {
            PeerMsg::Welcome { .. } => "welcome",
            PeerMsg::PeerJoined { .. } => "peer_joined",
            PeerMsg::UnitMove { .. } => "unit_move",
            PeerMsg::FireShell { .. } => "fire_shell",
            PeerMsg::ShellSwitch { .. } => "shell_switch",
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
