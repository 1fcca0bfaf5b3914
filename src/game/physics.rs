//! Arcade physics for the duel arena
//!
//! The match talks to physics only through [`PhysicsWorld`]; bodies are
//! opaque handles and the mapping back to units and shells lives in the
//! match, not on the bodies.

use std::collections::BTreeMap;

/// Opaque physics body handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(u32);

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Aabb {
    pub fn from_center(x: f32, y: f32, half_w: f32, half_h: f32) -> Self {
        Self {
            min_x: x - half_w,
            min_y: y - half_h,
            max_x: x + half_w,
            max_y: y + half_h,
        }
    }

    /// Strict overlap; touching edges do not count
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min_x < other.max_x
            && self.max_x > other.min_x
            && self.min_y < other.max_y
            && self.max_y > other.min_y
    }
}

/// What a body represents to the physics step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyClass {
    Unit,
    Projectile,
}

/// Body creation parameters
#[derive(Debug, Clone, Copy)]
pub struct BodyDesc {
    pub class: BodyClass,
    pub x: f32,
    pub y: f32,
    pub half_w: f32,
    pub half_h: f32,
    pub vel_x: f32,
    pub vel_y: f32,
    /// Downward acceleration (px/s²)
    pub gravity: f32,
    /// Velocity retained when bouncing off obstacles and bounds
    pub bounce: f32,
}

#[derive(Debug, Clone)]
struct Body {
    desc: BodyDesc,
}

impl Body {
    fn bounds(&self) -> Aabb {
        Aabb::from_center(self.desc.x, self.desc.y, self.desc.half_w, self.desc.half_h)
    }
}

/// Projectile touching a unit during a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    pub unit: BodyHandle,
    pub projectile: BodyHandle,
}

/// Result of a physics step
#[derive(Debug, Clone, Default)]
pub struct StepReport {
    /// Projectile/unit overlaps, at most one per projectile
    pub contacts: Vec<Contact>,
    /// Bodies the world removed on its own (projectiles that hit the ground)
    pub removed: Vec<BodyHandle>,
}

/// Physics engine seen by the match
pub trait PhysicsWorld {
    fn add_body(&mut self, desc: BodyDesc) -> BodyHandle;
    fn remove_body(&mut self, handle: BodyHandle);
    fn set_velocity_x(&mut self, handle: BodyHandle, vel_x: f32);
    fn position(&self, handle: BodyHandle) -> Option<(f32, f32)>;
    fn step(&mut self, dt: f32) -> StepReport;
}

/// Static block in the arena
#[derive(Debug, Clone, Copy)]
pub struct Obstacle {
    pub bounds: Aabb,
    /// Projectiles touching this obstacle are destroyed instead of bouncing
    pub destroys_projectiles: bool,
}

/// Arena geometry
#[derive(Debug, Clone)]
pub struct ArenaLayout {
    pub width: f32,
    pub height: f32,
    pub obstacles: Vec<Obstacle>,
}

impl ArenaLayout {
    pub const WIDTH: f32 = 1280.0;
    pub const HEIGHT: f32 = 720.0;
    pub const GROUND_TOP: f32 = 700.0;
}

impl Default for ArenaLayout {
    fn default() -> Self {
        Self {
            width: Self::WIDTH,
            height: Self::HEIGHT,
            obstacles: vec![
                // Ground
                Obstacle {
                    bounds: Aabb {
                        min_x: 0.0,
                        min_y: Self::GROUND_TOP,
                        max_x: Self::WIDTH,
                        max_y: Self::HEIGHT,
                    },
                    destroys_projectiles: true,
                },
                // Center wall
                Obstacle {
                    bounds: Aabb::from_center(640.0, 610.0, 20.0, 90.0),
                    destroys_projectiles: false,
                },
            ],
        }
    }
}

/// Minimal velocity/gravity world with AABB collisions
#[derive(Debug, Clone)]
pub struct ArcadeWorld {
    layout: ArenaLayout,
    bodies: BTreeMap<BodyHandle, Body>,
    next_handle: u32,
}

impl ArcadeWorld {
    pub fn new(layout: ArenaLayout) -> Self {
        Self {
            layout,
            bodies: BTreeMap::new(),
            next_handle: 0,
        }
    }

    pub fn velocity(&self, handle: BodyHandle) -> Option<(f32, f32)> {
        self.bodies
            .get(&handle)
            .map(|b| (b.desc.vel_x, b.desc.vel_y))
    }

    /// Integrate one body. Returns false if the body must be removed.
    fn integrate(layout: &ArenaLayout, body: &mut Body, dt: f32) -> bool {
        let d = &mut body.desc;
        let is_projectile = d.class == BodyClass::Projectile;
        let restitution = if is_projectile { d.bounce } else { 0.0 };

        d.vel_y += d.gravity * dt;

        // Horizontal pass
        d.x += d.vel_x * dt;
        for obstacle in &layout.obstacles {
            let bounds = Aabb::from_center(d.x, d.y, d.half_w, d.half_h);
            if !bounds.overlaps(&obstacle.bounds) {
                continue;
            }
            if is_projectile && obstacle.destroys_projectiles {
                return false;
            }
            if d.vel_x > 0.0 {
                d.x = obstacle.bounds.min_x - d.half_w;
            } else if d.vel_x < 0.0 {
                d.x = obstacle.bounds.max_x + d.half_w;
            }
            d.vel_x = -d.vel_x * restitution;
        }

        // Vertical pass
        d.y += d.vel_y * dt;
        for obstacle in &layout.obstacles {
            let bounds = Aabb::from_center(d.x, d.y, d.half_w, d.half_h);
            if !bounds.overlaps(&obstacle.bounds) {
                continue;
            }
            if is_projectile && obstacle.destroys_projectiles {
                return false;
            }
            if d.vel_y > 0.0 {
                d.y = obstacle.bounds.min_y - d.half_h;
            } else if d.vel_y < 0.0 {
                d.y = obstacle.bounds.max_y + d.half_h;
            }
            d.vel_y = -d.vel_y * restitution;
        }

        // World bounds
        let min_x = d.half_w;
        let max_x = layout.width - d.half_w;
        if d.x < min_x {
            d.x = min_x;
            d.vel_x = -d.vel_x * restitution;
        } else if d.x > max_x {
            d.x = max_x;
            d.vel_x = -d.vel_x * restitution;
        }

        let min_y = d.half_h;
        let max_y = layout.height - d.half_h;
        if d.y < min_y {
            d.y = min_y;
            d.vel_y = -d.vel_y * restitution;
        } else if d.y > max_y {
            if is_projectile {
                return false;
            }
            d.y = max_y;
            d.vel_y = 0.0;
        }

        true
    }
}

impl Default for ArcadeWorld {
    fn default() -> Self {
        Self::new(ArenaLayout::default())
    }
}

impl PhysicsWorld for ArcadeWorld {
    fn add_body(&mut self, desc: BodyDesc) -> BodyHandle {
        let handle = BodyHandle(self.next_handle);
        self.next_handle += 1;
        self.bodies.insert(handle, Body { desc });
        handle
    }

    fn remove_body(&mut self, handle: BodyHandle) {
        self.bodies.remove(&handle);
    }

    fn set_velocity_x(&mut self, handle: BodyHandle, vel_x: f32) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            body.desc.vel_x = vel_x;
        }
    }

    fn position(&self, handle: BodyHandle) -> Option<(f32, f32)> {
        self.bodies.get(&handle).map(|b| (b.desc.x, b.desc.y))
    }

    fn step(&mut self, dt: f32) -> StepReport {
        let mut report = StepReport::default();

        for (handle, body) in self.bodies.iter_mut() {
            if !Self::integrate(&self.layout, body, dt) {
                report.removed.push(*handle);
            }
        }
        for handle in &report.removed {
            self.bodies.remove(handle);
        }

        let units: Vec<(BodyHandle, Aabb)> = self
            .bodies
            .iter()
            .filter(|(_, b)| b.desc.class == BodyClass::Unit)
            .map(|(h, b)| (*h, b.bounds()))
            .collect();

        for (handle, body) in &self.bodies {
            if body.desc.class != BodyClass::Projectile {
                continue;
            }
            let bounds = body.bounds();
            if let Some((unit, _)) = units.iter().find(|(_, u)| u.overlaps(&bounds)) {
                report.contacts.push(Contact {
                    unit: *unit,
                    projectile: *handle,
                });
            }
        }

        report
    }
}
