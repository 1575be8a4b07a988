//! Ray casting against the render graph.
//!
//! Boxes, cylinders and bounds proxies are tested as oriented boxes (slab
//! method in the node's local frame); spheres are tested exactly. Rays that
//! start inside a shape do not hit it.

use glam::{Mat4, Vec3};

use crate::graph::{NodeId, SceneGraph};
use desk_core::Shape;

/// A ray with a unit direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Start point.
    pub origin: Vec3,
    /// Unit direction.
    pub direction: Vec3,
}

impl Ray {
    /// Create a ray; the direction is normalized.
    #[must_use]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// A ray pointing straight down (-Y).
    #[must_use]
    pub fn down(origin: Vec3) -> Self {
        Self {
            origin,
            direction: Vec3::NEG_Y,
        }
    }

    /// Point at distance `t`.
    #[must_use]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// The nearest intersection of a ray with a drawable node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Drawable node that was hit.
    pub node: NodeId,
    /// Distance along the ray.
    pub distance: f32,
    /// World-space hit point.
    pub point: Vec3,
    /// World-space unit surface normal.
    pub normal: Vec3,
}

/// Intersect every drawable node under `roots`, skipping the subtree of
/// `exclude`. Returns the nearest hit.
#[must_use]
pub fn intersect(
    graph: &SceneGraph,
    ray: &Ray,
    roots: &[NodeId],
    exclude: Option<NodeId>,
) -> Option<Hit> {
    let mut best: Option<Hit> = None;
    for &root in roots {
        for node in graph.subtree(root) {
            if exclude.is_some_and(|skip| graph.is_in_subtree(node, skip)) {
                continue;
            }
            let Some(spec) = graph.mesh_spec(node) else {
                continue;
            };
            let world = graph.world_matrix(node);
            if let Some((distance, normal)) = ray_shape(ray, world, &spec.shape) {
                if !best.as_ref().is_some_and(|b| b.distance <= distance) {
                    best = Some(Hit {
                        node,
                        distance,
                        point: ray.at(distance),
                        normal,
                    });
                }
            }
        }
    }
    best
}

/// Nearest hit under the scene root, resolved to the item container it belongs to.
#[must_use]
pub fn pick_item(graph: &SceneGraph, ray: &Ray) -> Option<(NodeId, Hit)> {
    let hit = intersect(graph, ray, &[graph.root()], None)?;
    graph.tagged_ancestor(hit.node).map(|item| (item, hit))
}

/// Ray vs. shape placed by `world`. Returns world distance and world normal.
fn ray_shape(ray: &Ray, world: Mat4, shape: &Shape) -> Option<(f32, Vec3)> {
    if world.determinant().abs() <= f32::EPSILON {
        return None;
    }
    let inverse = world.inverse();
    let origin = inverse.transform_point3(ray.origin);
    // Not normalized: the ray parameter then matches world distance.
    let direction = inverse.transform_vector3(ray.direction);

    let (t, local_normal) = match *shape {
        Shape::Sphere { radius } => ray_sphere(origin, direction, radius)?,
        _ => {
            let (min, max) = shape.local_bounds();
            ray_box(origin, direction, min, max)?
        }
    };
    let normal = inverse
        .transpose()
        .transform_vector3(local_normal)
        .normalize_or_zero();
    Some((t, normal))
}

fn ray_box(origin: Vec3, direction: Vec3, min: Vec3, max: Vec3) -> Option<(f32, Vec3)> {
    let mut t_near = f32::NEG_INFINITY;
    let mut t_far = f32::INFINITY;
    let mut normal = Vec3::ZERO;

    for axis in 0..3 {
        let (o, d, lo, hi) = (origin[axis], direction[axis], min[axis], max[axis]);
        if d.abs() < 1e-9 {
            if o < lo || o > hi {
                return None;
            }
            continue;
        }
        let inv = 1.0 / d;
        let (t0, t1) = ((lo - o) * inv, (hi - o) * inv);
        let (t_enter, t_exit) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
        if t_enter > t_near {
            t_near = t_enter;
            normal = Vec3::ZERO;
            normal[axis] = -d.signum();
        }
        t_far = t_far.min(t_exit);
        if t_near > t_far {
            return None;
        }
    }

    (t_near >= 0.0 && t_near.is_finite()).then_some((t_near, normal))
}

fn ray_sphere(origin: Vec3, direction: Vec3, radius: f32) -> Option<(f32, Vec3)> {
    let a = direction.length_squared();
    let b = 2.0 * origin.dot(direction);
    let c = origin.length_squared() - radius * radius;
    if c < 0.0 || a <= f32::EPSILON {
        return None;
    }
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }
    let t = (-b - discriminant.sqrt()) / (2.0 * a);
    (t >= 0.0).then(|| (t, (origin + direction * t) / radius))
}
