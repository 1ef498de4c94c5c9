//! Local player components

use bevy::prelude::*;

use crate::constants::PLAYER_MAX_HEALTH;

/// Marker for the locally controlled player
#[derive(Component)]
pub struct LocalPlayer;

/// Absolute world location (feet position)
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Location(pub Vec3);

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Health(pub i32);

impl Default for Health {
    fn default() -> Self {
        Self(PLAYER_MAX_HEALTH)
    }
}

impl Health {
    /// Take damage, never dropping below zero
    pub fn damage(&mut self, amount: i32) {
        self.0 = (self.0 - amount).clamp(0, PLAYER_MAX_HEALTH);
    }
}
