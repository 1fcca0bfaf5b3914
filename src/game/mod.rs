//! Game simulation modules

pub mod ballistics;
pub mod input;
pub mod r#match;
pub mod physics;
pub mod unit;

pub use input::{InputCommand, InputFrame, InputSource, Key, ScriptedInput};
pub use physics::{ArcadeWorld, PhysicsWorld};
pub use r#match::{DesyncPolicy, GameMatch, Hud, MatchConfig, MatchPhase, ProtocolViolation};
pub use unit::{Side, Unit, UnitKind};
