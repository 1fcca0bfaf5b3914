//! Ballistics - weapon profiles and shot launch computation

use crate::ws::protocol::WeaponKind;

/// Vertical spawn offset for single-shell weapons (above the unit)
pub const SHELL_SPAWN_OFFSET_Y: f32 = -30.0;

/// Spawn offsets for the explosive spread: center, left, right
pub const EXPLOSIVE_SPREAD: [(f32, f32); 3] = [(0.0, -25.0), (-20.0, -30.0), (20.0, -30.0)];

/// Weapon stats per shell type
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeaponStats {
    /// Damage per hit, before armor
    pub damage: f32,
    /// Gravity applied to the projectile (px/s²)
    pub weight: f32,
    /// Velocity retained on bounce (0 = dead stop, 1 = elastic)
    pub bounce: f32,
    /// Projectiles spawned per shot
    pub projectile_count: usize,
    /// Projectile hitbox radius
    pub projectile_radius: f32,
}

impl WeaponStats {
    pub fn for_kind(kind: WeaponKind) -> Self {
        match kind {
            WeaponKind::Light => Self {
                damage: 25.0,
                weight: 300.0,
                bounce: 0.2,
                projectile_count: 1,
                projectile_radius: 6.0,
            },
            WeaponKind::Heavy => Self {
                damage: 50.0,
                weight: 600.0,
                bounce: 0.2,
                projectile_count: 1,
                projectile_radius: 7.0,
            },
            WeaponKind::Explosive => Self {
                damage: 10.0,
                weight: 300.0,
                bounce: 0.8,
                projectile_count: EXPLOSIVE_SPREAD.len(),
                projectile_radius: 4.0,
            },
        }
    }
}

/// A projectile ready to be handed to the physics world
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectileSpawn {
    pub weapon: WeaponKind,
    pub x: f32,
    pub y: f32,
    pub vel_x: f32,
    pub vel_y: f32,
    pub gravity: f32,
    pub bounce: f32,
    pub damage: f32,
    pub radius: f32,
}

/// Initial velocity for a shot. Screen y grows downwards, so a positive
/// angle launches upwards (negative y velocity).
pub fn launch_velocity(angle_deg: f32, power: f32) -> (f32, f32) {
    let angle = angle_deg.to_radians();
    (angle.cos() * power, -angle.sin() * power)
}

/// Compute every projectile a shot spawns from a unit at the given origin
pub fn compute_launch(
    origin_x: f32,
    origin_y: f32,
    angle_deg: f32,
    power: f32,
    weapon: WeaponKind,
) -> Vec<ProjectileSpawn> {
    let stats = WeaponStats::for_kind(weapon);
    let (vel_x, vel_y) = launch_velocity(angle_deg, power);

    let offsets: &[(f32, f32)] = match weapon {
        WeaponKind::Explosive => &EXPLOSIVE_SPREAD,
        WeaponKind::Light | WeaponKind::Heavy => &[(0.0, SHELL_SPAWN_OFFSET_Y)],
    };

    offsets
        .iter()
        .map(|&(dx, dy)| ProjectileSpawn {
            weapon,
            x: origin_x + dx,
            y: origin_y + dy,
            vel_x,
            vel_y,
            gravity: stats.weight,
            bounce: stats.bounce,
            damage: stats.damage,
            radius: stats.projectile_radius,
        })
        .collect()
}

/// Reflect an angle across the vertical axis. Peers face each other, so a
/// shot received from the opponent must be reflected before it is replayed.
pub fn reflect_angle(angle_deg: f32) -> f32 {
    180.0 - angle_deg
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_single_shell_spawns_above_origin() {
        let spawns = compute_launch(100.0, 540.0, 45.0, 300.0, WeaponKind::Light);
        assert_eq!(spawns.len(), 1);
        assert_eq!(spawns[0].x, 100.0);
        assert_eq!(spawns[0].y, 510.0);
        assert_eq!(spawns[0].damage, 25.0);
        assert_eq!(spawns[0].gravity, 300.0);
    }

    #[test]
    fn test_explosive_spread() {
        let spawns = compute_launch(100.0, 540.0, 60.0, 400.0, WeaponKind::Explosive);
        assert_eq!(spawns.len(), 3);

        let positions: Vec<(f32, f32)> = spawns.iter().map(|s| (s.x, s.y)).collect();
        assert_eq!(positions, vec![(100.0, 515.0), (80.0, 510.0), (120.0, 510.0)]);

        // All fragments share one velocity and the explosive profile
        for spawn in &spawns {
            assert_eq!((spawn.vel_x, spawn.vel_y), (spawns[0].vel_x, spawns[0].vel_y));
            assert_eq!(spawn.damage, 10.0);
            assert_eq!(spawn.bounce, 0.8);
        }
    }

    #[test]
    fn test_horizontal_angles() {
        let (vx, vy) = launch_velocity(0.0, 200.0);
        assert_eq!(vx, 200.0);
        assert!(vy.abs() < 1e-3);

        let (vx, vy) = launch_velocity(180.0, 200.0);
        assert!((vx + 200.0).abs() < 1e-3);
        assert!(vy.abs() < 1e-3);
    }

    #[test]
    fn test_reflect_examples() {
        assert_eq!(reflect_angle(45.0), 135.0);
        assert_eq!(reflect_angle(90.0), 90.0);
        assert_eq!(reflect_angle(0.0), 180.0);
    }

    proptest! {
        #[test]
        fn prop_launch_direction(angle in 0.01f32..179.99, power in 1.0f32..800.0) {
            prop_assume!((angle - 90.0).abs() > 0.01);
            let (vx, vy) = launch_velocity(angle, power);
            prop_assert_eq!(vx.signum(), angle.to_radians().cos().signum());
            prop_assert!(vy <= 0.0);
        }

        #[test]
        fn prop_reflect_is_involutive(angle in 0.0f32..180.0) {
            prop_assert!((reflect_angle(reflect_angle(angle)) - angle).abs() < 1e-4);
        }
    }
}
