//! Asynchronous geometry for imported models.
//!
//! Imported models carry their file as a `data:` URL in `params.dataUrl`.
//! A [`ModelResolver`] turns that into a part tree off the main path; the
//! reconciler links the result once the future completes.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use glam::{EulerRot, Quat, Vec3};

use desk_core::{LayoutItem, MaterialSpec, PartNode, PartTransform, Shape};

use crate::error::{SceneError, SceneResult};

/// Produces the part tree of an asynchronously loaded item.
#[async_trait]
pub trait ModelResolver: Send + Sync {
    /// Resolve the geometry of `item`.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Resolve`] if the model cannot be loaded.
    async fn resolve(&self, item: &LayoutItem) -> SceneResult<PartNode>;
}

/// Decodes glTF/GLB data URLs into bounds proxies: one box per mesh
/// primitive, node transforms preserved.
#[derive(Debug, Clone, Default)]
pub struct GltfResolver;

impl GltfResolver {
    /// Create a new resolver.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Synchronous core of [`ModelResolver::resolve`].
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Resolve`] for malformed data URLs or documents.
    pub fn resolve_bytes(bytes: &[u8], material: &MaterialSpec) -> SceneResult<PartNode> {
        let gltf = gltf::Gltf::from_slice(bytes)
            .map_err(|e| SceneError::Resolve(format!("invalid glTF: {e}")))?;
        let scene = gltf
            .default_scene()
            .or_else(|| gltf.scenes().next())
            .ok_or_else(|| SceneError::Resolve("glTF has no scene".to_string()))?;

        let mut root = PartNode::group("gltf");
        for node in scene.nodes() {
            root.push(convert_node(&node, material));
        }
        if root.mesh_count() == 0 {
            return Err(SceneError::Resolve("glTF has no drawable primitives".to_string()));
        }
        Ok(root)
    }
}

#[async_trait]
impl ModelResolver for GltfResolver {
    async fn resolve(&self, item: &LayoutItem) -> SceneResult<PartNode> {
        let data_url = item
            .params
            .str("dataUrl")
            .ok_or_else(|| SceneError::Resolve(format!("item {} has no dataUrl", item.id)))?;
        let bytes = decode_data_url(data_url)?;
        let color = item.params.str("color").unwrap_or("#ffffff");
        let material = MaterialSpec::new(color, 0.6, 0.1);
        tracing::debug!(
            "Resolving imported model {} ({} bytes)",
            item.id,
            bytes.len()
        );
        Self::resolve_bytes(&bytes, &material)
    }
}

/// Decode the payload of a base64 `data:` URL.
///
/// # Errors
///
/// Returns [`SceneError::Resolve`] if the URL is not base64 data.
pub fn decode_data_url(url: &str) -> SceneResult<Vec<u8>> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| SceneError::Resolve("not a data URL".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| SceneError::Resolve("data URL has no payload".to_string()))?;
    if !header.ends_with(";base64") {
        return Err(SceneError::Resolve(format!(
            "unsupported data URL encoding: {header}"
        )));
    }
    STANDARD
        .decode(payload.trim())
        .map_err(|e| SceneError::Resolve(format!("invalid base64 payload: {e}")))
}

fn convert_node(node: &gltf::Node<'_>, material: &MaterialSpec) -> PartNode {
    let label = node
        .name()
        .map_or_else(|| format!("node_{}", node.index()), str::to_string);
    let (translation, rotation, scale) = node.transform().decomposed();
    let (rx, ry, rz) = Quat::from_array(rotation).to_euler(EulerRot::XYZ);

    let mut part = PartNode::group(label);
    part.transform = PartTransform {
        translation: Vec3::from_array(translation),
        rotation: Vec3::new(rx, ry, rz),
        scale: Vec3::from_array(scale),
    };

    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            let Some((min, max)) = primitive_bounds(&primitive) else {
                tracing::trace!(
                    "Skipping primitive {} of mesh {} without position bounds",
                    primitive.index(),
                    mesh.index()
                );
                continue;
            };
            part.push(PartNode::mesh(
                format!("primitive_{}", primitive.index()),
                Shape::Bounds { min, max },
                material.clone(),
            ));
        }
    }
    for child in node.children() {
        part.push(convert_node(&child, material));
    }
    part
}

fn primitive_bounds(primitive: &gltf::Primitive<'_>) -> Option<(Vec3, Vec3)> {
    let accessor = primitive.get(&gltf::Semantic::Positions)?;
    let min = vec3_from_json(&accessor.min()?)?;
    let max = vec3_from_json(&accessor.max()?)?;
    (min.cmple(max).all()).then_some((min, max))
}

#[allow(clippy::cast_possible_truncation)]
fn vec3_from_json(value: &serde_json::Value) -> Option<Vec3> {
    let values = value.as_array()?;
    if values.len() != 3 {
        return None;
    }
    let mut out = [0.0f32; 3];
    for (slot, v) in out.iter_mut().zip(values) {
        *slot = v.as_f64()? as f32;
    }
    Some(Vec3::from_array(out))
}
