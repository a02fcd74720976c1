use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Linear state shared by every simulated body
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub position: Vec3,
    pub velocity: Vec3,
    pub acceleration: Vec3,
}

impl Body {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }
}

/// Anything the world integrates each tick
pub trait Entity {
    fn body(&self) -> &Body;
    fn body_mut(&mut self) -> &mut Body;
    /// Position at the start of the current tick
    fn last_position(&self) -> Vec3;
    fn set_last_position(&mut self, position: Vec3);

    /// Distance moved so far this tick
    fn displacement(&self) -> Vec3 {
        self.body().position - self.last_position()
    }
}
