use super::core::{Floor, RayIntersectable, Scene, Solid, Sphere};
use super::math::{Ray, Vec3};

/// How far along the light direction a shadow ray starts, to avoid hitting its own surface
const SHADOW_BIAS: f64 = 1e-4;

/// Two-color tiling of the floor based on the parity of the cell indices.
pub fn checker_color(floor: &Floor, x: f64, z: f64) -> Vec3 {
    let ix = (x / floor.cell_size).floor() as i64;
    let iz = (z / floor.cell_size).floor() as i64;
    if (ix + iz).rem_euclid(2) == 0 {
        floor.even_color
    } else {
        floor.odd_color
    }
}

/// Lambert term, `to_light` and `normal` must be unit vectors.
pub fn diffuse(kd: f64, intensity: f64, to_light: Vec3, normal: Vec3) -> f64 {
    kd * intensity * to_light.dot(normal).max(0.0)
}

/// Phong highlight seen from `to_viewer`.
pub fn specular(
    ks: f64,
    intensity: f64,
    shininess: f64,
    to_light: Vec3,
    normal: Vec3,
    to_viewer: Vec3,
) -> f64 {
    let reflected = (normal * (2.0 * to_light.dot(normal)) - to_light).normalize();
    ks * intensity * to_viewer.dot(reflected).max(0.0).powf(shininess)
}

/// Color of the sphere surface at `point` as seen along `ray`.
pub fn shade_sphere(scene: &Scene, sphere: &Sphere, ray: &Ray, point: Vec3) -> Vec3 {
    let normal = sphere.normal_at(point);
    let to_light = scene.light.to_light();
    let to_viewer = -ray.direction;
    let material = &sphere.material;

    let id = diffuse(material.kd, scene.light.intensity, to_light, normal);
    let is = specular(
        material.ks,
        scene.light.intensity,
        material.shininess,
        to_light,
        normal,
        to_viewer,
    );
    // the highlight is white, it is not tinted by the surface color
    (material.color * id + is + scene.ambient).min_each(1.0)
}

/// True when the sphere blocks the light coming to `point`.
pub fn in_shadow(scene: &Scene, point: Vec3) -> bool {
    let to_light = scene.light.to_light();
    let shadow_ray = Ray::new(point + to_light * SHADOW_BIAS, to_light);
    matches!(scene.sphere.intersect(&shadow_ray), Some(t) if t > 0.0)
}

/// Checker color at `point`, halved when in shadow.
pub fn shade_floor(scene: &Scene, floor: &Floor, point: Vec3) -> Vec3 {
    let base = checker_color(floor, point.x, point.z);
    if in_shadow(scene, point) {
        base * 0.5
    } else {
        base
    }
}

/// Resolve the color seen along a single ray.
pub fn cast(scene: &Scene, ray: &Ray) -> Vec3 {
    match scene.first_hit(ray) {
        Some(result) => match result.solid {
            Solid::Sphere(sphere) => shade_sphere(scene, sphere, ray, result.hit_point),
            Solid::Floor(floor) => shade_floor(scene, floor, result.hit_point),
        },
        None => scene.background,
    }
}
