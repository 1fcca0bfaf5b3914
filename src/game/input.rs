//! Input sampling and edge detection
//!
//! The rendering/input collaborator reports raw held state once per tick.
//! Discrete presses (confirm, weapon keys) are derived here so the state
//! machine never does its own up/down bookkeeping.

use std::collections::VecDeque;

use crate::ws::protocol::{MoveDirection, WeaponKind};

const KEY_COUNT: usize = 7;

/// Keys the match reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    MoveLeft,
    MoveRight,
    ShellLight,
    ShellHeavy,
    ShellExplosive,
    Confirm,
    Cancel,
}

impl Key {
    pub const ALL: [Key; KEY_COUNT] = [
        Key::MoveLeft,
        Key::MoveRight,
        Key::ShellLight,
        Key::ShellHeavy,
        Key::ShellExplosive,
        Key::Confirm,
        Key::Cancel,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Weapon selected by this key, if it is a weapon key
    pub fn weapon(self) -> Option<WeaponKind> {
        match self {
            Key::ShellLight => Some(WeaponKind::Light),
            Key::ShellHeavy => Some(WeaponKind::Heavy),
            Key::ShellExplosive => Some(WeaponKind::Explosive),
            _ => None,
        }
    }
}

/// Raw input for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputFrame {
    pub pointer_x: f32,
    pub pointer_y: f32,
    held: [bool; KEY_COUNT],
}

impl InputFrame {
    pub fn new(pointer_x: f32, pointer_y: f32) -> Self {
        Self {
            pointer_x,
            pointer_y,
            held: [false; KEY_COUNT],
        }
    }

    pub fn with_held(mut self, key: Key) -> Self {
        self.set_held(key, true);
        self
    }

    pub fn set_held(&mut self, key: Key, held: bool) {
        self.held[key.index()] = held;
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held[key.index()]
    }

    /// Movement intent; left wins when both are held
    pub fn movement(&self) -> MoveDirection {
        if self.is_held(Key::MoveLeft) {
            MoveDirection::Left
        } else if self.is_held(Key::MoveRight) {
            MoveDirection::Right
        } else {
            MoveDirection::Stop
        }
    }
}

/// Transition of a single key between two samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEdge {
    Pressed,
    Released,
}

/// Tracks one key's held state across samples
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeDetector {
    was_held: bool,
}

impl EdgeDetector {
    pub fn update(&mut self, held: bool) -> Option<KeyEdge> {
        let edge = match (self.was_held, held) {
            (false, true) => Some(KeyEdge::Pressed),
            (true, false) => Some(KeyEdge::Released),
            _ => None,
        };
        self.was_held = held;
        edge
    }
}

/// Edge detectors for every key. Presses seen in the latest sample can be
/// taken once; whatever is not taken is dropped at the next sample.
#[derive(Debug, Clone, Default)]
pub struct InputEdges {
    detectors: [EdgeDetector; KEY_COUNT],
    pressed: [bool; KEY_COUNT],
}

impl InputEdges {
    pub fn update(&mut self, frame: &InputFrame) {
        for key in Key::ALL {
            let edge = self.detectors[key.index()].update(frame.is_held(key));
            self.pressed[key.index()] = edge == Some(KeyEdge::Pressed);
        }
    }

    /// True once per up→down transition
    pub fn take_pressed(&mut self, key: Key) -> bool {
        std::mem::take(&mut self.pressed[key.index()])
    }
}

/// Source of per-tick input (keyboard/mouse, console, scripted bot)
pub trait InputSource {
    fn sample(&mut self) -> InputFrame;
}

/// Discrete commands that a script or console can feed into a [`ScriptedInput`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputCommand {
    /// Keep a movement key held until the next hold command
    Hold(MoveDirection),
    /// Move the pointer
    Aim { x: f32, y: f32 },
    /// Press and release a key
    Tap(Key),
}

/// Input source driven by queued commands. Each tap is held for exactly one
/// sample and released on the next, so consecutive taps produce distinct edges.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    pointer: (f32, f32),
    movement: Option<Key>,
    taps: VecDeque<Key>,
    releasing: bool,
}

impl ScriptedInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: InputCommand) {
        match command {
            InputCommand::Hold(direction) => {
                self.movement = match direction {
                    MoveDirection::Left => Some(Key::MoveLeft),
                    MoveDirection::Right => Some(Key::MoveRight),
                    MoveDirection::Stop => None,
                };
            }
            InputCommand::Aim { x, y } => self.pointer = (x, y),
            InputCommand::Tap(key) => self.taps.push_back(key),
        }
    }

    pub fn pending_taps(&self) -> usize {
        self.taps.len()
    }
}

impl InputSource for ScriptedInput {
    fn sample(&mut self) -> InputFrame {
        let mut frame = InputFrame::new(self.pointer.0, self.pointer.1);
        if let Some(key) = self.movement {
            frame.set_held(key, true);
        }

        if self.releasing {
            self.releasing = false;
        } else if let Some(key) = self.taps.pop_front() {
            frame.set_held(key, true);
            self.releasing = true;
        }

        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_detector_transitions() {
        let mut detector = EdgeDetector::default();
        assert_eq!(detector.update(false), None);
        assert_eq!(detector.update(true), Some(KeyEdge::Pressed));
        assert_eq!(detector.update(true), None);
        assert_eq!(detector.update(false), Some(KeyEdge::Released));
    }

    #[test]
    fn test_held_key_presses_once() {
        let mut edges = InputEdges::default();
        let held = InputFrame::default().with_held(Key::Confirm);

        edges.update(&held);
        assert!(edges.take_pressed(Key::Confirm));
        assert!(!edges.take_pressed(Key::Confirm));

        edges.update(&held);
        assert!(!edges.take_pressed(Key::Confirm));

        edges.update(&InputFrame::default());
        edges.update(&held);
        assert!(edges.take_pressed(Key::Confirm));
    }

    #[test]
    fn test_untaken_press_is_dropped() {
        let mut edges = InputEdges::default();
        edges.update(&InputFrame::default().with_held(Key::Cancel));
        edges.update(&InputFrame::default());
        assert!(!edges.take_pressed(Key::Cancel));
    }

    #[test]
    fn test_movement_priority() {
        let both = InputFrame::default()
            .with_held(Key::MoveLeft)
            .with_held(Key::MoveRight);
        assert_eq!(both.movement(), MoveDirection::Left);
        assert_eq!(InputFrame::default().movement(), MoveDirection::Stop);
    }

    #[test]
    fn test_scripted_taps_release_between_presses() {
        let mut input = ScriptedInput::new();
        input.push(InputCommand::Aim { x: 400.0, y: 300.0 });
        input.push(InputCommand::Tap(Key::Confirm));
        input.push(InputCommand::Tap(Key::Confirm));

        let samples: Vec<bool> = (0..4)
            .map(|_| input.sample().is_held(Key::Confirm))
            .collect();
        assert_eq!(samples, vec![true, false, true, false]);
        assert_eq!(input.pending_taps(), 0);
    }

    #[test]
    fn test_scripted_hold_persists() {
        let mut input = ScriptedInput::new();
        input.push(InputCommand::Hold(MoveDirection::Right));
        assert_eq!(input.sample().movement(), MoveDirection::Right);
        assert_eq!(input.sample().movement(), MoveDirection::Right);
        input.push(InputCommand::Hold(MoveDirection::Stop));
        assert_eq!(input.sample().movement(), MoveDirection::Stop);
    }
}
