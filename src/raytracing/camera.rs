use super::math::{Ray, Vec3};

/// Pinhole camera looking down the negative z axis, with the image plane
/// placed `distance` units in front of the viewpoint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub distance: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::zero(), 1000.0)
    }
}

impl Camera {
    pub fn new(position: Vec3, distance: f64) -> Self {
        Self { position, distance }
    }

    /// Create a ray from the viewpoint through the point (x, y) of the image plane,
    /// with x growing to the right and y growing upward from the image center.
    pub fn shoot_to(&self, x: f64, y: f64) -> Ray {
        let target = self.position + Vec3::new(x, y, -self.distance);
        Ray::new(self.position, target - self.position)
    }
}
