//! Part trees produced by model recipes.
//!
//! A recipe never touches the render graph directly. It fills a [`PartNode`]
//! container with primitives and materials, and the scene crate turns that
//! tree into render nodes and resource handles.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// A primitive shape, centered on its local origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    /// Axis-aligned box.
    Box {
        /// Extent along X.
        width: f32,
        /// Extent along Y.
        height: f32,
        /// Extent along Z.
        depth: f32,
    },
    /// Y-aligned cylinder (or cone frustum).
    Cylinder {
        /// Radius of the top cap.
        radius_top: f32,
        /// Radius of the bottom cap.
        radius_bottom: f32,
        /// Extent along Y.
        height: f32,
    },
    /// Sphere.
    Sphere {
        /// Radius.
        radius: f32,
    },
    /// Invisible-geometry stand-in with explicit bounds, used for imported models.
    Bounds {
        /// Minimum corner.
        min: Vec3,
        /// Maximum corner.
        max: Vec3,
    },
}

impl Shape {
    /// Convenience constructor for a box.
    #[must_use]
    pub const fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        Self::Box {
            width,
            height,
            depth,
        }
    }

    /// Convenience constructor for a straight cylinder.
    #[must_use]
    pub const fn cylinder(radius: f32, height: f32) -> Self {
        Self::Cylinder {
            radius_top: radius,
            radius_bottom: radius,
            height,
        }
    }

    /// Local axis-aligned bounds as `(min, max)`.
    #[must_use]
    pub fn local_bounds(&self) -> (Vec3, Vec3) {
        match *self {
            Self::Box {
                width,
                height,
                depth,
            } => {
                let half = Vec3::new(width, height, depth) * 0.5;
                (-half, half)
            }
            Self::Cylinder {
                radius_top,
                radius_bottom,
                height,
            } => {
                let r = radius_top.max(radius_bottom);
                let half = Vec3::new(r, height * 0.5, r);
                (-half, half)
            }
            Self::Sphere { radius } => (Vec3::splat(-radius), Vec3::splat(radius)),
            Self::Bounds { min, max } => (min, max),
        }
    }
}

/// Surface appearance of a mesh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialSpec {
    /// CSS-style hex color.
    pub color: String,
    /// PBR roughness in `[0, 1]`.
    pub roughness: f32,
    /// PBR metalness in `[0, 1]`.
    pub metalness: f32,
    /// Opacity in `[0, 1]`.
    pub opacity: f32,
}

impl MaterialSpec {
    /// An opaque material with the given color and PBR factors.
    #[must_use]
    pub fn new(color: impl Into<String>, roughness: f32, metalness: f32) -> Self {
        Self {
            color: color.into(),
            roughness,
            metalness,
            opacity: 1.0,
        }
    }

    /// Override the opacity.
    #[must_use]
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }
}

impl Default for MaterialSpec {
    fn default() -> Self {
        Self::new("#cccccc", 0.5, 0.0)
    }
}

/// A shape paired with its material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshSpec {
    /// Geometry.
    pub shape: Shape,
    /// Material.
    pub material: MaterialSpec,
}

/// Local transform of a part. Rotation is Euler XYZ in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PartTransform {
    /// Translation in the parent frame.
    pub translation: Vec3,
    /// Euler rotation (XYZ order, radians).
    pub rotation: Vec3,
    /// Non-uniform scale.
    pub scale: Vec3,
}

impl Default for PartTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

/// A node in a recipe's output tree: a group, a mesh, or both.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PartNode {
    /// Debug label.
    pub label: String,
    /// Local transform.
    pub transform: PartTransform,
    /// Geometry, if this node is drawable.
    pub mesh: Option<MeshSpec>,
    /// Child parts.
    pub children: Vec<PartNode>,
}

impl PartNode {
    /// An empty group.
    #[must_use]
    pub fn group(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    /// A drawable part.
    #[must_use]
    pub fn mesh(label: impl Into<String>, shape: Shape, material: MaterialSpec) -> Self {
        Self {
            label: label.into(),
            mesh: Some(MeshSpec { shape, material }),
            ..Self::default()
        }
    }

    /// Set the local translation.
    #[must_use]
    pub fn at(mut self, x: f32, y: f32, z: f32) -> Self {
        self.transform.translation = Vec3::new(x, y, z);
        self
    }

    /// Set the local rotation (radians).
    #[must_use]
    pub fn rotated(mut self, x: f32, y: f32, z: f32) -> Self {
        self.transform.rotation = Vec3::new(x, y, z);
        self
    }

    /// Append a child and return self for chaining.
    #[must_use]
    pub fn with_child(mut self, child: PartNode) -> Self {
        self.children.push(child);
        self
    }

    /// Append a child.
    pub fn push(&mut self, child: PartNode) {
        self.children.push(child);
    }

    /// Number of drawable parts in this subtree.
    #[must_use]
    pub fn mesh_count(&self) -> usize {
        usize::from(self.mesh.is_some()) + self.children.iter().map(PartNode::mesh_count).sum::<usize>()
    }

    /// Whether the subtree contains nothing drawable.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mesh_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mesh_count_is_recursive() {
        let tree = PartNode::group("root")
            .with_child(PartNode::mesh("a", Shape::cuboid(1.0, 1.0, 1.0), MaterialSpec::default()))
            .with_child(
                PartNode::group("inner")
                    .with_child(PartNode::mesh("b", Shape::cylinder(0.1, 1.0), MaterialSpec::default())),
            );
        assert_eq!(tree.mesh_count(), 2);
        assert!(!tree.is_empty());
        assert!(PartNode::group("empty").is_empty());
    }

    #[test]
    fn test_shape_bounds() {
        let (min, max) = Shape::cuboid(2.0, 4.0, 6.0).local_bounds();
        assert_eq!(min, Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(max, Vec3::new(1.0, 2.0, 3.0));

        let (min, max) = Shape::Sphere { radius: 0.5 }.local_bounds();
        assert_eq!(min, Vec3::splat(-0.5));
        assert_eq!(max, Vec3::splat(0.5));
    }
}
