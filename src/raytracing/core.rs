use super::camera::Camera;
use super::math::{Ray, Vec3};

/// Rays whose vertical component is below this never meet the floor
const PARALLEL_EPSILON: f64 = 1e-6;

pub trait RayIntersectable {
    /// Returns the hit parameter `t` of the closest intersection with `t >= 0`,
    /// None when the ray misses.
    fn intersect(&self, ray: &Ray) -> Option<f64>;
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    pub color: Vec3,
    /// diffuse reflection constant
    pub kd: f64,
    /// specular reflection constant
    pub ks: f64,
    pub shininess: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f64,
    pub material: Material,
}

/// Infinite checkered plane parallel to xz at height `y`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Floor {
    pub y: f64,
    /// hits with a z smaller than this are discarded, it bounds the visible floor
    pub far_z: f64,
    pub cell_size: f64,
    pub even_color: Vec3,
    pub odd_color: Vec3,
}

/// Directional light.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Light {
    /// normalized direction in which the light travels
    pub direction: Vec3,
    pub intensity: f64,
}

impl Light {
    pub fn new(direction: Vec3, intensity: f64) -> Self {
        Light {
            direction: direction.normalize(),
            intensity,
        }
    }

    /// Unit vector from a surface point toward the light
    pub fn to_light(&self) -> Vec3 {
        -self.direction
    }
}

/// The closed set of shapes a scene is made of.
#[derive(Clone, Copy, Debug)]
pub enum Solid<'a> {
    Sphere(&'a Sphere),
    Floor(&'a Floor),
}

impl RayIntersectable for Solid<'_> {
    fn intersect(&self, ray: &Ray) -> Option<f64> {
        match self {
            Solid::Sphere(sphere) => sphere.intersect(ray),
            Solid::Floor(floor) => floor.intersect(ray),
        }
    }
}

pub struct RaycastResult<'a> {
    pub solid: Solid<'a>,
    pub t: f64,
    pub hit_point: Vec3,
}

impl Sphere {
    /// Both roots of the ray/sphere quadratic, smaller first.
    /// Tangent rays (zero discriminant) are treated as a miss.
    pub fn roots(&self, ray: &Ray) -> Option<(f64, f64)> {
        let p = ray.origin;
        let v = ray.direction;
        let c = self.center;
        let a = v.dot(v);
        let b = 2.0 * v.dot(p - c);
        let c_coef = p.dot(p) - 2.0 * p.dot(c) + c.dot(c) - self.radius * self.radius;
        let discriminant = b * b - 4.0 * a * c_coef;
        if discriminant <= 0.0 {
            return None;
        }
        let sqrt_discriminant = discriminant.sqrt();
        let t1 = (-b - sqrt_discriminant) / (2.0 * a);
        let t2 = (-b + sqrt_discriminant) / (2.0 * a);
        Some((t1, t2))
    }

    pub fn normal_at(&self, point: Vec3) -> Vec3 {
        (point - self.center).normalize()
    }
}

impl RayIntersectable for Sphere {
    fn intersect(&self, ray: &Ray) -> Option<f64> {
        let (t1, t2) = self.roots(ray)?;
        if t1 >= 0.0 {
            Some(t1)
        } else if t2 >= 0.0 {
            // the origin is inside the sphere
            Some(t2)
        } else {
            None
        }
    }
}

impl RayIntersectable for Floor {
    fn intersect(&self, ray: &Ray) -> Option<f64> {
        if ray.direction.y.abs() < PARALLEL_EPSILON {
            return None;
        }
        let t = (self.y - ray.origin.y) / ray.direction.y;
        if t < 0.0 {
            return None;
        }
        if ray.at(t).z < self.far_z {
            return None;
        }
        Some(t)
    }
}

/// Immutable description of everything that gets rendered.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    pub camera: Camera,
    pub light: Light,
    /// ambient term added to the sphere shading
    pub ambient: f64,
    pub background: Vec3,
    pub sphere: Sphere,
    pub floor: Floor,
}

impl Default for Scene {
    /// The classic sphere resting on a yellow and gray checkerboard.
    fn default() -> Self {
        Scene {
            camera: Camera::default(),
            light: Light::new(Vec3::new(-2.0, -4.0, -2.0), 1.0),
            ambient: 0.2,
            background: Vec3::zero(),
            sphere: Sphere {
                center: Vec3::new(0.0, 0.0, -1500.0),
                radius: 150.0,
                material: Material {
                    color: Vec3::new(0.2, 0.9, 0.9),
                    kd: 0.8,
                    ks: 0.8,
                    shininess: 32.0,
                },
            },
            floor: Floor {
                y: -150.0,
                far_z: -3000.0,
                cell_size: 100.0,
                even_color: Vec3::new(1.0, 1.0, 0.7),
                odd_color: Vec3::new(0.6, 0.6, 0.6),
            },
        }
    }
}

impl Scene {
    pub fn solids(&self) -> [Solid<'_>; 2] {
        [Solid::Sphere(&self.sphere), Solid::Floor(&self.floor)]
    }

    /// First solid, in scene order, hit by the ray with `t > 0`.
    /// The sphere is always tested before the floor, even when the floor is closer.
    pub fn first_hit<'a>(&'a self, ray: &Ray) -> Option<RaycastResult<'a>> {
        self.solids().into_iter().find_map(|solid| {
            let t = solid.intersect(ray).filter(|t| *t > 0.0)?;
            Some(RaycastResult {
                solid,
                t,
                hit_point: ray.at(t),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-6, "{} != {}", a, b);
    }

    #[test]
    fn roots_through_center_are_symmetric() {
        let scene = Scene::default();
        let ray = Ray::new(Vec3::zero(), Vec3::new(0.0, 0.0, -1.0));
        let (t1, t2) = scene.sphere.roots(&ray).unwrap();
        assert_close((t1 + t2) / 2.0, 1500.0);
        assert_close(scene.sphere.intersect(&ray).unwrap(), 1500.0 - 150.0);
    }

    #[test]
    fn tangent_ray_is_a_miss() {
        // discriminant is exactly zero here, reported as no intersection
        let scene = Scene::default();
        let ray = Ray::new(Vec3::new(0.0, 150.0, 0.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(scene.sphere.roots(&ray).is_none());
        assert!(scene.sphere.intersect(&ray).is_none());
    }

    #[test]
    fn origin_inside_sphere_returns_far_root() {
        let scene = Scene::default();
        let ray = Ray::new(scene.sphere.center, Vec3::new(1.0, 0.0, 0.0));
        assert_close(scene.sphere.intersect(&ray).unwrap(), 150.0);
    }

    #[test]
    fn sphere_behind_origin_is_a_miss() {
        let scene = Scene::default();
        let ray = Ray::new(Vec3::zero(), Vec3::new(0.0, 0.0, 1.0));
        assert!(scene.sphere.roots(&ray).is_some());
        assert!(scene.sphere.intersect(&ray).is_none());
    }

    #[test]
    fn horizontal_ray_never_hits_floor() {
        let floor = Scene::default().floor;
        for height in [-1000.0, -150.0, 0.0, 1000.0] {
            let ray = Ray::new(Vec3::new(0.0, height, 0.0), Vec3::new(0.3, 0.0, -1.0));
            assert!(floor.intersect(&ray).is_none());
        }
    }

    #[test]
    fn floor_hit_and_far_clip() {
        let floor = Scene::default().floor;
        let near = Ray::new(Vec3::zero(), Vec3::new(0.0, -150.0, -1000.0));
        let t = floor.intersect(&near).unwrap();
        assert_close(near.at(t).y, -150.0);
        assert_close(near.at(t).z, -1000.0);

        let far = Ray::new(Vec3::zero(), Vec3::new(0.0, -150.0, -4000.0));
        assert!(floor.intersect(&far).is_none());

        let upward = Ray::new(Vec3::zero(), Vec3::new(0.0, 1.0, -1.0));
        assert!(floor.intersect(&upward).is_none());
    }

    #[test]
    fn first_hit_follows_scene_order() {
        let scene = Scene::default();
        let center = Ray::new(Vec3::zero(), Vec3::new(0.0, 0.0, -1.0));
        let hit = scene.first_hit(&center).unwrap();
        assert!(matches!(hit.solid, Solid::Sphere(_)));
        assert_close(hit.t, 1350.0);

        let down = Ray::new(Vec3::zero(), Vec3::new(0.0, -150.0, -1000.0));
        let hit = scene.first_hit(&down).unwrap();
        assert!(matches!(hit.solid, Solid::Floor(_)));

        let sky = Ray::new(Vec3::zero(), Vec3::new(0.0, 1.0, -1.0));
        assert!(scene.first_hit(&sky).is_none());
    }

    #[test]
    fn sunken_sphere_is_tested_before_floor() {
        let mut scene = Scene::default();
        scene.sphere.center = Vec3::new(0.0, -400.0, -1500.0);
        let ray = Ray::new(Vec3::zero(), scene.sphere.center);
        let floor_t = scene.floor.intersect(&ray).unwrap();
        let sphere_t = scene.sphere.intersect(&ray).unwrap();
        assert!(floor_t < sphere_t);

        let hit = scene.first_hit(&ray).unwrap();
        assert!(matches!(hit.solid, Solid::Sphere(_)));
        assert_close(hit.t, sphere_t);
    }

    #[test]
    fn light_is_normalized() {
        let light = Light::new(Vec3::new(-2.0, -4.0, -2.0), 1.0);
        assert_close(light.direction.len(), 1.0);
        assert!(light.to_light().y > 0.0);
    }
}
