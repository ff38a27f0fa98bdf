//! Camera rays and ray/scene intersection.

use glam::{Mat4, Vec2, Vec3};

use super::scene::{Mesh, NodeId, Scene};

const EPSILON: f32 = 1e-6;

/// A half-line with a unit direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Start point
    pub origin: Vec3,
    /// Unit direction
    pub direction: Vec3,
}

impl Ray {
    /// A ray from `origin` towards `direction`; the direction is normalized.
    #[must_use]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Point at parameter `t`.
    #[must_use]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Möller–Trumbore test against one triangle; returns the hit distance.
    ///
    /// Back faces (clockwise as seen from the origin) are skipped unless
    /// `double_sided` is set.
    #[must_use]
    pub fn intersect_triangle(&self, [a, b, c]: [Vec3; 3], double_sided: bool) -> Option<f32> {
        let edge1 = b - a;
        let edge2 = c - a;
        let p = self.direction.cross(edge2);
        let det = edge1.dot(p);
        if det.abs() < EPSILON || (!double_sided && det < 0.0) {
            return None;
        }
        let inv_det = 1.0 / det;
        let s = self.origin - a;
        let u = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = s.cross(edge1);
        let v = self.direction.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = edge2.dot(q) * inv_det;
        (t > EPSILON).then_some(t)
    }

    /// Slab test against an axis-aligned box; returns the entry distance,
    /// or zero when the origin is inside.
    #[must_use]
    pub fn intersect_aabb(&self, min: Vec3, max: Vec3) -> Option<f32> {
        let inv = self.direction.recip();
        let t1 = (min - self.origin) * inv;
        let t2 = (max - self.origin) * inv;
        let t_near = t1.min(t2).max_element();
        let t_far = t1.max(t2).min_element();
        (t_far >= t_near.max(0.0)).then_some(t_near.max(0.0))
    }
}

/// Pointer position in normalized device coordinates, `-1..=1` on both axes
/// with `+y` up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pointer(pub Vec2);

impl Pointer {
    /// Converts a pixel position inside a `width` x `height` viewport.
    #[must_use]
    pub fn from_pixels(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self(Vec2::new(
            (x / width) * 2.0 - 1.0,
            -((y / height) * 2.0 - 1.0),
        ))
    }
}

/// A perspective camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Eye position
    pub position: Vec3,
    /// Point looked at
    pub target: Vec3,
    /// Up vector
    pub up: Vec3,
    /// Vertical field of view in degrees
    pub fov_y_degrees: f32,
    /// Viewport width over height
    pub aspect: f32,
    /// Near clip distance
    pub near: f32,
    /// Far clip distance
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 5.0, 10.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y_degrees: 60.0,
            aspect: 1.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Camera {
    /// Projection times view.
    #[must_use]
    pub fn view_projection(&self) -> Mat4 {
        let projection = Mat4::perspective_rh(
            self.fov_y_degrees.to_radians(),
            self.aspect,
            self.near,
            self.far,
        );
        projection * Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// The world-space ray through `pointer`.
    #[must_use]
    pub fn ray(&self, pointer: Pointer) -> Ray {
        let inverse = self.view_projection().inverse();
        let far_point = inverse.project_point3(pointer.0.extend(0.5));
        Ray::new(self.position, far_point - self.position)
    }
}

/// One ray hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    /// Distance from the ray origin
    pub distance: f32,
    /// World-space hit point
    pub point: Vec3,
    /// Mesh node that was hit
    pub node: NodeId,
}

fn world_bounds(mesh: &Mesh, world: Mat4) -> Option<(Vec3, Vec3)> {
    let (min, max) = mesh.bounds()?;
    let corners = (0..8).map(|i| {
        Vec3::new(
            if i & 1 == 0 { min.x } else { max.x },
            if i & 2 == 0 { min.y } else { max.y },
            if i & 4 == 0 { min.z } else { max.z },
        )
    });
    corners.map(|c| world.transform_point3(c)).fold(None, |acc, p| match acc {
        None => Some((p, p)),
        Some((lo, hi)) => Some((lo.min(p), hi.max(p))),
    })
}

fn nearest_hit(mesh: &Mesh, world: Mat4, ray: &Ray) -> Option<f32> {
    let (min, max) = world_bounds(mesh, world)?;
    ray.intersect_aabb(min, max)?;
    mesh.triangles()
        .iter()
        .filter_map(|tri| {
            let world_tri = tri.map(|v| world.transform_point3(v));
            ray.intersect_triangle(world_tri, mesh.material.double_sided)
        })
        .min_by(f32::total_cmp)
}

/// Every pickable mesh hit by `ray`, nearest first. Each mesh contributes
/// its nearest hit; equal distances keep traversal order.
#[must_use]
pub fn intersect_scene(scene: &Scene, ray: &Ray) -> Vec<Intersection> {
    let mut hits: Vec<Intersection> = scene
        .traverse()
        .into_iter()
        .filter_map(|id| {
            let mesh = scene.node(id)?.mesh.as_ref().filter(|m| m.pickable)?;
            let distance = nearest_hit(mesh, scene.world_transform(id), ray)?;
            Some(Intersection {
                distance,
                point: ray.at(distance),
                node: id,
            })
        })
        .collect();
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hits
}
