//! Built-in recipes. Dimensions are meters, angles are degrees in params.

use std::f32::consts::FRAC_PI_2;

use glam::Vec3;
use serde_json::Value;

use super::{CatalogGroup, ModelRecipe, MountAnchor};
use crate::error::BuildError;
use crate::item::{ItemId, ItemKind, LayoutItem, Params, MOUNT_SLOT};
use crate::parts::{MaterialSpec, PartNode, Shape};

/// One boxed recipe per built-in kind.
#[must_use]
pub fn builtin_recipes() -> Vec<Box<dyn ModelRecipe>> {
    vec![
        Box::new(DeskRect),
        Box::new(DeskL),
        Box::new(Monitor),
        Box::new(MonitorWithoutStand),
        Box::new(Macbook),
        Box::new(SlabDevice::PHONE),
        Box::new(SlabDevice::TABLET),
        Box::new(PcCase),
        Box::new(Keyboard::FULL),
        Box::new(Keyboard::TENKEYLESS),
        Box::new(Keyboard::COMPACT),
        Box::new(Keyboard::SIXTY),
        Box::new(SlabDevice::MOUSE),
        Box::new(SlabDevice::MOUSE_PAD),
        Box::new(Stylus),
        Box::new(Speaker),
        Box::new(SoundBar),
        Box::new(Headphone),
        Box::new(Microphone),
        Box::new(UniversalStand),
        Box::new(MonitorArm),
        Box::new(RoundBaseStand),
        Box::new(RectangleBaseStand),
        Box::new(MonitorRiser),
        Box::new(TableLight),
        Box::new(CustomBox),
        Box::new(CustomCylinder),
        Box::new(CustomSphere),
        Box::new(ImportedModel),
    ]
}

fn material(item: &LayoutItem, fallback: &str, roughness: f32, metalness: f32) -> MaterialSpec {
    let color = item.params.str("color").unwrap_or(fallback);
    MaterialSpec::new(color, roughness, metalness)
}

fn host_params() -> Params {
    Params::new().with(MOUNT_SLOT, Value::Null)
}

// ---------------------------------------------------------------------------
// Desks
// ---------------------------------------------------------------------------

const TOP_THICKNESS: f32 = 0.04;
const LEG_RADIUS: f32 = 0.03;
const LEG_INSET: f32 = 0.05;

struct DeskRect;

impl ModelRecipe for DeskRect {
    fn kind(&self) -> ItemKind {
        ItemKind::DeskRect
    }

    fn catalog_group(&self) -> Option<CatalogGroup> {
        Some(CatalogGroup::Desks)
    }

    fn default_params(&self) -> Params {
        Params::new()
            .with("width", 1.2)
            .with("depth", 0.6)
            .with("height", 0.75)
            .with("color", "#8B4513")
            .with("showLegs", true)
    }

    // Desks always stand on the floor.
    fn create_default(&self, id: ItemId, _anchor_y: f32) -> LayoutItem {
        LayoutItem::new(id, self.kind()).with_params(self.default_params())
    }

    fn build(&self, container: &mut PartNode, item: &LayoutItem) -> Result<(), BuildError> {
        let p = &item.params;
        let width = p.require_positive(self.kind(), "width")?;
        let depth = p.require_positive(self.kind(), "depth")?;
        let height = p.require_positive(self.kind(), "height")?;
        let mat = material(item, "#8B4513", 0.7, 0.0);

        container.push(
            PartNode::mesh("top", Shape::cuboid(width, TOP_THICKNESS, depth), mat)
                .at(0.0, height - TOP_THICKNESS / 2.0, 0.0),
        );

        if p.bool_or("showLegs", true) {
            let leg_height = height - TOP_THICKNESS;
            let leg_mat = MaterialSpec::new("#333333", 0.4, 0.6);
            let x = width / 2.0 - LEG_INSET;
            let z = depth / 2.0 - LEG_INSET;
            for (sx, sz) in [(-1.0, -1.0), (1.0, -1.0), (-1.0, 1.0), (1.0, 1.0)] {
                container.push(
                    PartNode::mesh("leg", Shape::cylinder(LEG_RADIUS, leg_height), leg_mat.clone())
                        .at(sx * x, leg_height / 2.0, sz * z),
                );
            }
        }
        Ok(())
    }
}

struct DeskL;

impl ModelRecipe for DeskL {
    fn kind(&self) -> ItemKind {
        ItemKind::DeskL
    }

    fn catalog_group(&self) -> Option<CatalogGroup> {
        Some(CatalogGroup::Desks)
    }

    fn default_params(&self) -> Params {
        Params::new()
            .with("widthA", 1.2)
            .with("depthA", 0.6)
            .with("widthB", 0.8)
            .with("depthB", 0.5)
            .with("height", 0.75)
            .with("color", "#8B4513")
    }

    fn create_default(&self, id: ItemId, _anchor_y: f32) -> LayoutItem {
        LayoutItem::new(id, self.kind()).with_params(self.default_params())
    }

    fn build(&self, container: &mut PartNode, item: &LayoutItem) -> Result<(), BuildError> {
        let p = &item.params;
        let kind = self.kind();
        let width_a = p.require_positive(kind, "widthA")?;
        let depth_a = p.require_positive(kind, "depthA")?;
        let width_b = p.require_positive(kind, "widthB")?;
        let depth_b = p.require_positive(kind, "depthB")?;
        let height = p.require_positive(kind, "height")?;
        let mat = material(item, "#8B4513", 0.7, 0.0);
        let top_y = height - TOP_THICKNESS / 2.0;
        let leg_height = height - TOP_THICKNESS;
        let leg_mat = MaterialSpec::new("#333333", 0.4, 0.6);

        // Wing A runs along +X, wing B along +Z; they share the corner at the origin.
        container.push(
            PartNode::mesh("top-a", Shape::cuboid(width_a, TOP_THICKNESS, depth_a), mat.clone())
                .at(width_a / 2.0, top_y, depth_a / 2.0),
        );
        container.push(
            PartNode::mesh("top-b", Shape::cuboid(depth_b, TOP_THICKNESS, width_b), mat)
                .at(depth_b / 2.0, top_y, width_b / 2.0),
        );
        container.push(
            PartNode::mesh("panel-a", Shape::cuboid(0.04, leg_height, depth_a), leg_mat.clone())
                .at(width_a - 0.02, leg_height / 2.0, depth_a / 2.0),
        );
        container.push(
            PartNode::mesh("panel-b", Shape::cuboid(depth_b, leg_height, 0.04), leg_mat.clone())
                .at(depth_b / 2.0, leg_height / 2.0, width_b - 0.02),
        );
        container.push(
            PartNode::mesh("corner", Shape::cuboid(0.04, leg_height, 0.04), leg_mat)
                .at(0.02, leg_height / 2.0, 0.02),
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Devices
// ---------------------------------------------------------------------------

struct Monitor;

impl ModelRecipe for Monitor {
    fn kind(&self) -> ItemKind {
        ItemKind::Monitor
    }

    fn catalog_group(&self) -> Option<CatalogGroup> {
        Some(CatalogGroup::Devices)
    }

    fn default_params(&self) -> Params {
        Params::new()
            .with("width", 0.54)
            .with("height", 0.32)
            .with("depth", 0.03)
            .with("baseWidth", 0.243)
            .with("baseDepth", 0.18)
            .with("baseHeight", 0.01)
            .with("standWidth", 0.102)
            .with("standDepth", 0.027)
            .with("standHeight", 0.34)
            .with("screenTiltX", 0.0)
            .with("screenSlideY", -0.05)
            .with("showStand", true)
            .with("color", "#333333")
    }

    fn build(&self, container: &mut PartNode, item: &LayoutItem) -> Result<(), BuildError> {
        let p = &item.params;
        let kind = self.kind();
        let width = p.require_positive(kind, "width")?;
        let height = p.require_positive(kind, "height")?;
        let depth = p.require_positive(kind, "depth")?;
        let tilt = p.f32("screenTiltX").unwrap_or(0.0).to_radians();
        let frame = material(item, "#333333", 0.6, 0.1);
        let metal = MaterialSpec::new("#b0b0b0", 0.2, 0.8);

        let mut screen = PartNode::group("screen").rotated(tilt, 0.0, 0.0);
        screen.push(PartNode::mesh("bezel", Shape::cuboid(width, height, depth), frame));
        screen.push(
            PartNode::mesh(
                "panel",
                Shape::cuboid(width - 0.01, height - 0.01, 0.002),
                MaterialSpec::new("#000000", 0.1, 0.0),
            )
            .at(0.0, 0.0, depth / 2.0 + 0.001),
        );

        if p.bool_or("showStand", true) {
            let base_width = p.require_positive(kind, "baseWidth")?;
            let base_depth = p.require_positive(kind, "baseDepth")?;
            let base_height = p.require_positive(kind, "baseHeight")?;
            let stand_width = p.require_positive(kind, "standWidth")?;
            let stand_depth = p.require_positive(kind, "standDepth")?;
            let stand_height = p.require_positive(kind, "standHeight")?;
            let slide = p.f32("screenSlideY").unwrap_or(0.0);
            let stand_z = -base_depth / 2.0 + stand_depth / 2.0 + 0.02;

            container.push(
                PartNode::mesh(
                    "base",
                    Shape::cuboid(base_width, base_height, base_depth),
                    metal.clone(),
                )
                .at(0.0, base_height / 2.0, 0.0),
            );
            container.push(
                PartNode::mesh(
                    "neck",
                    Shape::cuboid(stand_width, stand_height, stand_depth),
                    metal,
                )
                .at(0.0, base_height + stand_height / 2.0, stand_z),
            );
            screen.transform.translation = Vec3::new(
                0.0,
                base_height + stand_height + slide,
                stand_z + stand_depth / 2.0 + depth / 2.0,
            );
        } else {
            screen.transform.translation = Vec3::new(0.0, height / 2.0, 0.0);
        }
        container.push(screen);
        Ok(())
    }
}

/// A monitor panel without a foot. The panel rests on its bottom edge when
/// free-standing and is centered on the anchor when mounted.
struct MonitorWithoutStand;

impl ModelRecipe for MonitorWithoutStand {
    fn kind(&self) -> ItemKind {
        ItemKind::MonitorWithoutStand
    }

    fn catalog_group(&self) -> Option<CatalogGroup> {
        Some(CatalogGroup::Devices)
    }

    fn default_params(&self) -> Params {
        Params::new()
            .with("width", 0.54)
            .with("height", 0.32)
            .with("depth", 0.03)
            .with("color", "#333333")
    }

    fn build(&self, container: &mut PartNode, item: &LayoutItem) -> Result<(), BuildError> {
        let kind = self.kind();
        let width = item.params.require_positive(kind, "width")?;
        let height = item.params.require_positive(kind, "height")?;
        let depth = item.params.require_positive(kind, "depth")?;
        let border = 0.015_f32.min(width / 4.0).min(height / 4.0);
        let y = if item.is_mounted() { 0.0 } else { height / 2.0 };

        container.push(
            PartNode::group("screen")
                .at(0.0, y, 0.0)
                .with_child(PartNode::mesh(
                    "bezel",
                    Shape::cuboid(width, height, depth),
                    material(item, "#333333", 0.6, 0.1),
                ))
                .with_child(
                    PartNode::mesh(
                        "panel",
                        Shape::cuboid(width - 2.0 * border, height - 2.0 * border, 0.002),
                        MaterialSpec::new("#111111", 0.2, 0.8),
                    )
                    .at(0.0, 0.0, depth / 2.0 + 0.001),
                ),
        );
        Ok(())
    }
}

struct Macbook;

impl ModelRecipe for Macbook {
    fn kind(&self) -> ItemKind {
        ItemKind::Macbook
    }

    fn catalog_group(&self) -> Option<CatalogGroup> {
        Some(CatalogGroup::Devices)
    }

    fn default_params(&self) -> Params {
        Params::new()
            .with("width", 0.3)
            .with("height", 0.015)
            .with("depth", 0.21)
            .with("openAngle", 110.0)
            .with("color", "#CCCCCC")
    }

    fn build(&self, container: &mut PartNode, item: &LayoutItem) -> Result<(), BuildError> {
        let p = &item.params;
        let kind = self.kind();
        let width = p.require_positive(kind, "width")?;
        let height = p.require_positive(kind, "height")?;
        let depth = p.require_positive(kind, "depth")?;
        let open = p.f32("openAngle").unwrap_or(110.0).clamp(0.0, 180.0);
        let shell = material(item, "#CCCCCC", 0.3, 0.8);
        let lid_thickness = height / 2.0;

        container.push(
            PartNode::mesh("body", Shape::cuboid(width, height, depth), shell.clone())
                .at(0.0, height / 2.0, 0.0),
        );
        // The lid hinges at the back edge; 0 degrees is closed flat on the body.
        let hinge = PartNode::group("hinge")
            .at(0.0, height, -depth / 2.0)
            .rotated(-open.to_radians(), 0.0, 0.0)
            .with_child(
                PartNode::mesh("lid", Shape::cuboid(width, lid_thickness, depth), shell)
                    .at(0.0, lid_thickness / 2.0, depth / 2.0),
            );
        container.push(hinge);
        Ok(())
    }
}

/// Devices that are a single rounded slab: phone, tablet, mouse, mouse pad.
struct SlabDevice {
    kind: ItemKind,
    size: [f32; 3],
    color: &'static str,
    roughness: f32,
    metalness: f32,
    group: CatalogGroup,
}

impl SlabDevice {
    const PHONE: Self = Self {
        kind: ItemKind::Phone,
        size: [0.07, 0.008, 0.14],
        color: "#E0E0E0",
        roughness: 0.3,
        metalness: 0.6,
        group: CatalogGroup::Devices,
    };
    const TABLET: Self = Self {
        kind: ItemKind::Tablet,
        size: [0.25, 0.007, 0.18],
        color: "#AAAAAA",
        roughness: 0.3,
        metalness: 0.6,
        group: CatalogGroup::Devices,
    };
    const MOUSE: Self = Self {
        kind: ItemKind::Mouse,
        size: [0.06, 0.03, 0.1],
        color: "#333333",
        roughness: 0.5,
        metalness: 0.1,
        group: CatalogGroup::Accessories,
    };
    const MOUSE_PAD: Self = Self {
        kind: ItemKind::MousePad,
        size: [0.8, 0.003, 0.3],
        color: "#222222",
        roughness: 0.9,
        metalness: 0.0,
        group: CatalogGroup::Accessories,
    };
}

impl ModelRecipe for SlabDevice {
    fn kind(&self) -> ItemKind {
        self.kind
    }

    fn catalog_group(&self) -> Option<CatalogGroup> {
        Some(self.group)
    }

    fn default_params(&self) -> Params {
        let [width, height, depth] = self.size;
        Params::new()
            .with("width", f64::from(width))
            .with("height", f64::from(height))
            .with("depth", f64::from(depth))
            .with("color", self.color)
    }

    fn build(&self, container: &mut PartNode, item: &LayoutItem) -> Result<(), BuildError> {
        let width = item.params.require_positive(self.kind, "width")?;
        let height = item.params.require_positive(self.kind, "height")?;
        let depth = item.params.require_positive(self.kind, "depth")?;
        container.push(
            PartNode::mesh(
                "body",
                Shape::cuboid(width, height, depth),
                material(item, self.color, self.roughness, self.metalness),
            )
            .at(0.0, height / 2.0, 0.0),
        );
        Ok(())
    }
}

/// Named tower sizes as `[width, height, depth]`.
static PC_CASE_PRESETS: [(&str, [f32; 3]); 6] = [
    ("itx", [0.15, 0.25, 0.25]),
    ("matx", [0.2, 0.45, 0.4]),
    ("atx", [0.22, 0.5, 0.45]),
    ("eatx", [0.25, 0.6, 0.5]),
    ("c24", [0.155, 0.249, 0.249]),
    ("rider-r2", [0.149, 0.278, 0.206]),
];

const CASE_FOOT_HEIGHT: f32 = 0.02;

struct PcCase;

impl PcCase {
    /// A known `preset` overrides the explicit dimensions.
    fn size(params: &Params) -> Result<[f32; 3], BuildError> {
        let kind = ItemKind::PcCase;
        let preset = params
            .str("preset")
            .and_then(|name| PC_CASE_PRESETS.iter().find(|(key, _)| *key == name));
        match preset {
            Some((_, size)) => Ok(*size),
            None => Ok([
                params.require_positive(kind, "width")?,
                params.require_positive(kind, "height")?,
                params.require_positive(kind, "depth")?,
            ]),
        }
    }
}

impl ModelRecipe for PcCase {
    fn kind(&self) -> ItemKind {
        ItemKind::PcCase
    }

    fn catalog_group(&self) -> Option<CatalogGroup> {
        Some(CatalogGroup::Devices)
    }

    fn default_params(&self) -> Params {
        Params::new()
            .with("preset", "")
            .with("width", 0.2)
            .with("height", 0.45)
            .with("depth", 0.4)
            .with("color", "#2b2b2b")
    }

    fn build(&self, container: &mut PartNode, item: &LayoutItem) -> Result<(), BuildError> {
        let [width, height, depth] = Self::size(&item.params)?;
        let body_height = (height - CASE_FOOT_HEIGHT).max(0.01);
        let mat = material(item, "#2b2b2b", 0.4, 0.8);

        container.push(
            PartNode::mesh("body", Shape::cuboid(width, body_height, depth), mat.clone())
                .at(0.0, CASE_FOOT_HEIGHT + body_height / 2.0, 0.0),
        );
        let x = width / 2.0 - 0.02;
        let z = depth / 2.0 - 0.02;
        for (sx, sz) in [(-1.0, -1.0), (1.0, -1.0), (-1.0, 1.0), (1.0, 1.0)] {
            container.push(
                PartNode::mesh("foot", Shape::cylinder(0.01, CASE_FOOT_HEIGHT), mat.clone())
                    .at(sx * x, CASE_FOOT_HEIGHT / 2.0, sz * z),
            );
        }
        Ok(())
    }
}

/// Keyboards differ only in footprint; the key block follows the case.
struct Keyboard {
    kind: ItemKind,
    width: f32,
    depth: f32,
}

impl Keyboard {
    const FULL: Self = Self {
        kind: ItemKind::Keyboard,
        width: 0.44,
        depth: 0.14,
    };
    const TENKEYLESS: Self = Self {
        kind: ItemKind::Keyboard87,
        width: 0.36,
        depth: 0.14,
    };
    const COMPACT: Self = Self {
        kind: ItemKind::Keyboard68,
        width: 0.32,
        depth: 0.11,
    };
    const SIXTY: Self = Self {
        kind: ItemKind::Keyboard60,
        width: 0.30,
        depth: 0.11,
    };
}

impl ModelRecipe for Keyboard {
    fn kind(&self) -> ItemKind {
        self.kind
    }

    fn catalog_group(&self) -> Option<CatalogGroup> {
        Some(CatalogGroup::Accessories)
    }

    fn default_params(&self) -> Params {
        Params::new()
            .with("width", f64::from(self.width))
            .with("height", 0.02)
            .with("depth", f64::from(self.depth))
            .with("color", "#333333")
    }

    fn build(&self, container: &mut PartNode, item: &LayoutItem) -> Result<(), BuildError> {
        let width = item.params.require_positive(self.kind, "width")?;
        let height = item.params.require_positive(self.kind, "height")?;
        let depth = item.params.require_positive(self.kind, "depth")?;
        container.push(
            PartNode::mesh(
                "case",
                Shape::cuboid(width, height, depth),
                material(item, "#333333", 0.6, 0.2),
            )
            .at(0.0, height / 2.0, 0.0),
        );
        container.push(
            PartNode::mesh(
                "keys",
                Shape::cuboid((width - 0.02).max(0.01), 0.004, (depth - 0.02).max(0.01)),
                MaterialSpec::new("#1a1a1a", 0.8, 0.0),
            )
            .at(0.0, height + 0.002, 0.0),
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Pens and audio
// ---------------------------------------------------------------------------

/// A pen lying along +Z with its tip forward.
struct Stylus;

impl ModelRecipe for Stylus {
    fn kind(&self) -> ItemKind {
        ItemKind::Stylus
    }

    fn catalog_group(&self) -> Option<CatalogGroup> {
        Some(CatalogGroup::Accessories)
    }

    fn default_params(&self) -> Params {
        Params::new()
            .with("length", 0.17)
            .with("radius", 0.0045)
            .with("color", "#ffffff")
    }

    fn build(&self, container: &mut PartNode, item: &LayoutItem) -> Result<(), BuildError> {
        let kind = self.kind();
        let length = item.params.require_positive(kind, "length")?;
        let radius = item.params.require_positive(kind, "radius")?;
        let body = material(item, "#ffffff", 0.4, 0.5);

        // Built upright along +Y, then laid down so +Y points along +Z.
        container.push(
            PartNode::group("pen")
                .at(0.0, radius, length * 0.425)
                .rotated(FRAC_PI_2, 0.0, 0.0)
                .with_child(
                    PartNode::mesh("barrel", Shape::cylinder(radius, length * 0.8), body.clone())
                        .at(0.0, -length * 0.4, 0.0),
                )
                .with_child(
                    PartNode::mesh(
                        "tip",
                        Shape::Cylinder {
                            radius_top: 0.0,
                            radius_bottom: radius,
                            height: length * 0.15,
                        },
                        MaterialSpec::new("#888888", 0.3, 0.5),
                    )
                    .at(0.0, length * 0.075, 0.0),
                )
                .with_child(
                    PartNode::mesh("cap", Shape::Sphere { radius }, body)
                        .at(0.0, -length * 0.8, 0.0),
                ),
        );
        Ok(())
    }
}

/// Bookshelf speaker: a cabinet with one front driver and a rear knob.
struct Speaker;

impl ModelRecipe for Speaker {
    fn kind(&self) -> ItemKind {
        ItemKind::Speaker
    }

    fn catalog_group(&self) -> Option<CatalogGroup> {
        Some(CatalogGroup::Accessories)
    }

    fn default_params(&self) -> Params {
        Params::new()
            .with("width", 0.15)
            .with("height", 0.226)
            .with("depth", 0.197)
            .with("color", "#2e2e2e")
    }

    fn build(&self, container: &mut PartNode, item: &LayoutItem) -> Result<(), BuildError> {
        let kind = self.kind();
        let width = item.params.require_positive(kind, "width")?;
        let height = item.params.require_positive(kind, "height")?;
        let depth = item.params.require_positive(kind, "depth")?;
        let shell = material(item, "#2e2e2e", 0.6, 0.3);
        let driver_radius = width.min(height) * 0.4;

        container.push(
            PartNode::mesh("cabinet", Shape::cuboid(width, height, depth), shell.clone())
                .at(0.0, height / 2.0, 0.0),
        );
        container.push(
            PartNode::mesh(
                "surround",
                Shape::cylinder(driver_radius * 1.15, 0.004),
                MaterialSpec::new("#1b1b1b", 0.85, 0.0),
            )
            .at(0.0, height * 0.5, depth / 2.0 + 0.002)
            .rotated(FRAC_PI_2, 0.0, 0.0),
        );
        container.push(
            PartNode::mesh(
                "driver",
                Shape::Cylinder {
                    radius_top: driver_radius * 0.2,
                    radius_bottom: driver_radius,
                    height: 0.01,
                },
                MaterialSpec::new("#3a3a3a", 0.3, 0.1),
            )
            .at(0.0, height * 0.5, depth / 2.0 + 0.004)
            .rotated(-FRAC_PI_2, 0.0, 0.0),
        );
        container.push(
            PartNode::mesh("knob", Shape::cylinder(0.01, 0.01), shell)
                .at(width / 2.0 - 0.02, height - 0.02, -depth / 2.0 - 0.005)
                .rotated(FRAC_PI_2, 0.0, 0.0),
        );
        Ok(())
    }
}

/// Long low speaker with a grille on the front and top and a side knob.
struct SoundBar;

impl ModelRecipe for SoundBar {
    fn kind(&self) -> ItemKind {
        ItemKind::SoundBar
    }

    fn catalog_group(&self) -> Option<CatalogGroup> {
        Some(CatalogGroup::Accessories)
    }

    fn default_params(&self) -> Params {
        Params::new()
            .with("width", 0.45)
            .with("height", 0.05)
            .with("depth", 0.05)
            .with("color", "#2e2e2e")
    }

    fn build(&self, container: &mut PartNode, item: &LayoutItem) -> Result<(), BuildError> {
        let kind = self.kind();
        let width = item.params.require_positive(kind, "width")?;
        let height = item.params.require_positive(kind, "height")?;
        let depth = item.params.require_positive(kind, "depth")?;
        let shell = material(item, "#2e2e2e", 0.6, 0.3);
        let grille = MaterialSpec::new("#4a4a4a", 0.3, 0.8);
        let body_width = (width - 0.02).max(0.01);
        let knob_radius = height.min(depth) * 0.3;

        container.push(
            PartNode::mesh("body", Shape::cuboid(body_width, height, depth), shell.clone())
                .at(0.0, height / 2.0, 0.0),
        );
        container.push(
            PartNode::mesh(
                "front-grille",
                Shape::cuboid(body_width * 0.95, height * 0.9, 0.0002),
                grille.clone(),
            )
            .at(0.0, height * 0.55, depth / 2.0 + 0.0001),
        );
        container.push(
            PartNode::mesh(
                "top-grille",
                Shape::cuboid(body_width * 0.95, 0.0002, depth * 0.9),
                grille,
            )
            .at(0.0, height + 0.0001, depth * 0.05),
        );
        container.push(
            PartNode::mesh("knob", Shape::cylinder(knob_radius, 0.02), shell)
                .at(body_width / 2.0, height / 2.0, 0.0)
                .rotated(0.0, 0.0, FRAC_PI_2),
        );
        Ok(())
    }
}

/// Over-ear headphones standing on their cups. The headband is three bars.
struct Headphone;

impl ModelRecipe for Headphone {
    fn kind(&self) -> ItemKind {
        ItemKind::Headphone
    }

    fn catalog_group(&self) -> Option<CatalogGroup> {
        Some(CatalogGroup::Accessories)
    }

    fn default_params(&self) -> Params {
        Params::new()
            .with("width", 0.18)
            .with("depth", 0.08)
            .with("color", "#333333")
    }

    fn build(&self, container: &mut PartNode, item: &LayoutItem) -> Result<(), BuildError> {
        let kind = self.kind();
        let width = item.params.require_positive(kind, "width")?;
        let depth = item.params.require_positive(kind, "depth")?;
        let shell = material(item, "#333333", 0.4, 0.5);
        let cushion = MaterialSpec::new("#555555", 0.7, 0.2);
        let cup_radius = depth * 0.5;
        let band = depth * 0.1;
        let band_top = cup_radius + width / 2.0;

        for (label, side) in [("left", -1.0), ("right", 1.0)] {
            container.push(
                PartNode::group(label)
                    .at(side * (width / 2.0 + 0.004), cup_radius, 0.0)
                    .rotated(0.0, 0.0, FRAC_PI_2)
                    .with_child(PartNode::mesh(
                        "cup",
                        Shape::Cylinder {
                            radius_top: cup_radius,
                            radius_bottom: depth * 0.4,
                            height: 0.04,
                        },
                        shell.clone(),
                    ))
                    .with_child(
                        PartNode::mesh(
                            "cushion",
                            Shape::cylinder(cup_radius - 0.005, 0.01),
                            cushion.clone(),
                        )
                        .at(0.0, side * 0.025, 0.0),
                    ),
            );
            container.push(
                PartNode::mesh("band-side", Shape::cuboid(band, width / 2.0, band), shell.clone())
                    .at(side * (width / 2.0 + 0.004), cup_radius + width / 4.0, 0.0),
            );
        }
        container.push(
            PartNode::mesh("band-top", Shape::cuboid(width + 0.008 + band, band, band), shell)
                .at(0.0, band_top, 0.0),
        );
        Ok(())
    }
}

/// Capsule microphone on a short post, lying back along -Z.
struct Microphone;

impl ModelRecipe for Microphone {
    fn kind(&self) -> ItemKind {
        ItemKind::Microphone
    }

    fn catalog_group(&self) -> Option<CatalogGroup> {
        Some(CatalogGroup::Accessories)
    }

    fn default_params(&self) -> Params {
        Params::new()
            .with("capsuleRadius", 0.03)
            .with("capsuleHeight", 0.1)
            .with("standRadius", 0.015)
            .with("standHeight", 0.15)
            .with("color", "#444444")
    }

    fn build(&self, container: &mut PartNode, item: &LayoutItem) -> Result<(), BuildError> {
        let p = &item.params;
        let kind = self.kind();
        let capsule_radius = p.require_positive(kind, "capsuleRadius")?;
        let capsule_height = p.require_positive(kind, "capsuleHeight")?;
        let stand_radius = p.require_positive(kind, "standRadius")?;
        let stand_height = p.require_positive(kind, "standHeight")?;
        let body = material(item, "#444444", 0.5, 0.4);
        let mesh = MaterialSpec::new("#a0a0a0", 0.3, 0.8);

        container.push(
            PartNode::group("mic")
                .at(0.0, stand_radius.max(capsule_radius), -stand_height * 0.3)
                .rotated(-FRAC_PI_2, 0.0, 0.0)
                .with_child(
                    PartNode::mesh(
                        "capsule",
                        Shape::cylinder(capsule_radius, capsule_height),
                        mesh.clone(),
                    )
                    .at(0.0, capsule_height / 2.0, 0.0),
                )
                .with_child(
                    PartNode::mesh("grille", Shape::Sphere { radius: capsule_radius }, mesh)
                        .at(0.0, capsule_height, 0.0),
                )
                .with_child(
                    PartNode::mesh("post", Shape::cylinder(stand_radius, stand_height), body)
                        .at(0.0, -stand_height / 2.0, 0.0),
                ),
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Mount hosts
// ---------------------------------------------------------------------------

const STAND_BASE_THICKNESS: f32 = 0.02;

struct UniversalStand;

impl ModelRecipe for UniversalStand {
    fn kind(&self) -> ItemKind {
        ItemKind::UniversalStand
    }

    fn catalog_group(&self) -> Option<CatalogGroup> {
        Some(CatalogGroup::Accessories)
    }

    fn default_params(&self) -> Params {
        host_params()
            .with("baseSize", 0.25)
            .with("poleHeight", 0.4)
            .with("armLength", 0.3)
            .with("color", "#555555")
    }

    fn build(&self, container: &mut PartNode, item: &LayoutItem) -> Result<(), BuildError> {
        let kind = self.kind();
        let base = item.params.require_positive(kind, "baseSize")?;
        let pole = item.params.require_positive(kind, "poleHeight")?;
        let arm = item.params.require_positive(kind, "armLength")?;
        let mat = material(item, "#555555", 0.7, 0.0);

        container.push(
            PartNode::mesh("base", Shape::cylinder(base / 2.0, STAND_BASE_THICKNESS), mat.clone())
                .at(0.0, STAND_BASE_THICKNESS / 2.0, 0.0),
        );
        container.push(
            PartNode::mesh("pole", Shape::cylinder(0.02, pole), mat.clone())
                .at(0.0, pole / 2.0 + STAND_BASE_THICKNESS, 0.0),
        );
        container.push(
            PartNode::mesh("arm", Shape::cylinder(0.015, arm), mat)
                .at(arm / 2.0, pole + STAND_BASE_THICKNESS, 0.0)
                .rotated(0.0, 0.0, FRAC_PI_2),
        );
        Ok(())
    }

    fn is_mount_host(&self) -> bool {
        true
    }

    fn mount_anchor(&self, params: &Params) -> Result<MountAnchor, BuildError> {
        let arm = params.require_f32(self.kind(), "armLength")?;
        let pole = params.require_f32(self.kind(), "poleHeight")?;
        Ok(MountAnchor::offset(Vec3::new(arm, pole + STAND_BASE_THICKNESS, 0.0)))
    }
}

struct MonitorArm;

impl ModelRecipe for MonitorArm {
    fn kind(&self) -> ItemKind {
        ItemKind::MonitorArm
    }

    fn catalog_group(&self) -> Option<CatalogGroup> {
        Some(CatalogGroup::Accessories)
    }

    fn default_params(&self) -> Params {
        host_params()
            .with("baseHeight", 0.05)
            .with("poleHeight", 0.45)
            .with("armLength", 0.35)
            .with("armYaw", 0.0)
            .with("tiltX", 0.0)
            .with("color", "#2b2b2b")
    }

    fn build(&self, container: &mut PartNode, item: &LayoutItem) -> Result<(), BuildError> {
        let kind = self.kind();
        let base = item.params.require_positive(kind, "baseHeight")?;
        let pole = item.params.require_positive(kind, "poleHeight")?;
        let arm = item.params.require_positive(kind, "armLength")?;
        let yaw = item.params.f32("armYaw").unwrap_or(0.0).to_radians();
        let mat = material(item, "#2b2b2b", 0.4, 0.6);

        container.push(
            PartNode::mesh("clamp", Shape::cuboid(0.08, base, 0.1), mat.clone())
                .at(0.0, base / 2.0, 0.0),
        );
        container.push(
            PartNode::mesh("pole", Shape::cylinder(0.02, pole), mat.clone())
                .at(0.0, base + pole / 2.0, 0.0),
        );
        container.push(
            PartNode::group("arm")
                .at(0.0, base + pole, 0.0)
                .rotated(0.0, yaw, 0.0)
                .with_child(
                    PartNode::mesh("beam", Shape::cuboid(arm, 0.03, 0.05), mat)
                        .at(arm / 2.0, 0.0, 0.0),
                ),
        );
        Ok(())
    }

    fn is_mount_host(&self) -> bool {
        true
    }

    fn mount_anchor(&self, params: &Params) -> Result<MountAnchor, BuildError> {
        let kind = self.kind();
        let base = params.require_f32(kind, "baseHeight")?;
        let pole = params.require_f32(kind, "poleHeight")?;
        let arm = params.require_f32(kind, "armLength")?;
        let yaw = params.f32("armYaw").unwrap_or(0.0).to_radians();
        let tilt = params.f32("tiltX").unwrap_or(0.0).to_radians();
        Ok(MountAnchor {
            translation: Vec3::new(arm * yaw.cos(), base + pole, -arm * yaw.sin()),
            rotation: Vec3::new(tilt, yaw, 0.0),
        })
    }
}

struct RoundBaseStand;

impl ModelRecipe for RoundBaseStand {
    fn kind(&self) -> ItemKind {
        ItemKind::RoundBaseStand
    }

    fn catalog_group(&self) -> Option<CatalogGroup> {
        Some(CatalogGroup::Accessories)
    }

    fn default_params(&self) -> Params {
        host_params()
            .with("baseRadius", 0.1)
            .with("baseHeight", 0.015)
            .with("poleHeight", 0.25)
            .with("pivotRadius", 0.02)
            .with("tiltX", 0.0)
            .with("color", "#666666")
    }

    fn build(&self, container: &mut PartNode, item: &LayoutItem) -> Result<(), BuildError> {
        let kind = self.kind();
        let radius = item.params.require_positive(kind, "baseRadius")?;
        let base = item.params.require_positive(kind, "baseHeight")?;
        let pole = item.params.require_positive(kind, "poleHeight")?;
        let pivot = item.params.require_positive(kind, "pivotRadius")?;
        let mat = material(item, "#666666", 0.5, 0.4);

        container.push(
            PartNode::mesh("base", Shape::cylinder(radius, base), mat.clone())
                .at(0.0, base / 2.0, 0.0),
        );
        container.push(
            PartNode::mesh("pole", Shape::cylinder(0.012, pole), mat.clone())
                .at(0.0, base + pole / 2.0, 0.0),
        );
        container.push(
            PartNode::mesh("pivot", Shape::Sphere { radius: pivot }, mat)
                .at(0.0, base + pole, 0.0),
        );
        Ok(())
    }

    fn is_mount_host(&self) -> bool {
        true
    }

    fn mount_anchor(&self, params: &Params) -> Result<MountAnchor, BuildError> {
        pivot_anchor(self.kind(), params)
    }
}

/// Anchor on the front of a pole-top pivot, tilted about X.
fn pivot_anchor(kind: ItemKind, params: &Params) -> Result<MountAnchor, BuildError> {
    let base = params.require_f32(kind, "baseHeight")?;
    let pole = params.require_f32(kind, "poleHeight")?;
    let pivot = params.require_f32(kind, "pivotRadius")?;
    let tilt = params.f32("tiltX").unwrap_or(0.0).to_radians();
    Ok(MountAnchor {
        translation: Vec3::new(0.0, base + pole + pivot, pivot),
        rotation: Vec3::new(tilt, 0.0, 0.0),
    })
}

struct RectangleBaseStand;

impl ModelRecipe for RectangleBaseStand {
    fn kind(&self) -> ItemKind {
        ItemKind::RectangleBaseStand
    }

    fn catalog_group(&self) -> Option<CatalogGroup> {
        Some(CatalogGroup::Accessories)
    }

    fn default_params(&self) -> Params {
        host_params()
            .with("baseWidth", 0.2)
            .with("baseDepth", 0.15)
            .with("baseHeight", 0.015)
            .with("poleHeight", 0.25)
            .with("pivotRadius", 0.02)
            .with("tiltX", 0.0)
            .with("color", "#666666")
    }

    fn build(&self, container: &mut PartNode, item: &LayoutItem) -> Result<(), BuildError> {
        let kind = self.kind();
        let width = item.params.require_positive(kind, "baseWidth")?;
        let depth = item.params.require_positive(kind, "baseDepth")?;
        let base = item.params.require_positive(kind, "baseHeight")?;
        let pole = item.params.require_positive(kind, "poleHeight")?;
        let pivot = item.params.require_positive(kind, "pivotRadius")?;
        let mat = material(item, "#666666", 0.5, 0.4);

        container.push(
            PartNode::mesh("base", Shape::cuboid(width, base, depth), mat.clone())
                .at(0.0, base / 2.0, 0.0),
        );
        container.push(
            PartNode::mesh("pole", Shape::cuboid(0.03, pole, 0.02), mat.clone())
                .at(0.0, base + pole / 2.0, 0.0),
        );
        container.push(
            PartNode::mesh("pivot", Shape::Sphere { radius: pivot }, mat)
                .at(0.0, base + pole, 0.0),
        );
        Ok(())
    }

    fn is_mount_host(&self) -> bool {
        true
    }

    fn mount_anchor(&self, params: &Params) -> Result<MountAnchor, BuildError> {
        pivot_anchor(self.kind(), params)
    }
}

// ---------------------------------------------------------------------------
// Surfaces
// ---------------------------------------------------------------------------

/// A shelf on four slim legs; anything dropped on it lands on the top panel.
struct MonitorRiser;

impl ModelRecipe for MonitorRiser {
    fn kind(&self) -> ItemKind {
        ItemKind::MonitorRiser
    }

    fn catalog_group(&self) -> Option<CatalogGroup> {
        Some(CatalogGroup::Accessories)
    }

    fn default_params(&self) -> Params {
        Params::new()
            .with("width", 0.5)
            .with("depth", 0.255)
            .with("height", 0.07)
            .with("panelThickness", 0.02)
            .with("color", "#eeeeee")
    }

    fn build(&self, container: &mut PartNode, item: &LayoutItem) -> Result<(), BuildError> {
        let kind = self.kind();
        let width = item.params.require_positive(kind, "width")?;
        let depth = item.params.require_positive(kind, "depth")?;
        let height = item.params.require_positive(kind, "height")?;
        let panel = item.params.require_positive(kind, "panelThickness")?;
        if panel >= height {
            return Err(BuildError::InvalidParam {
                kind,
                key: "panelThickness".to_string(),
                reason: format!("{panel} is not below height {height}"),
            });
        }
        let mat = material(item, "#eeeeee", 0.7, 0.2);
        let leg_height = height - panel;

        container.push(
            PartNode::mesh("panel", Shape::cuboid(width, panel, depth), mat.clone())
                .at(0.0, height - panel / 2.0, 0.0),
        );
        let x = width / 2.0 - 0.0075;
        for (sx, sz) in [(-1.0, -1.0), (1.0, -1.0), (-1.0, 1.0), (1.0, 1.0)] {
            container.push(
                PartNode::mesh("leg", Shape::cuboid(0.015, leg_height, depth * 0.2), mat.clone())
                    .at(sx * x, leg_height / 2.0, sz * depth * 0.4),
            );
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Lights
// ---------------------------------------------------------------------------

struct TableLight;

impl ModelRecipe for TableLight {
    fn kind(&self) -> ItemKind {
        ItemKind::TableLight
    }

    fn catalog_group(&self) -> Option<CatalogGroup> {
        Some(CatalogGroup::Accessories)
    }

    fn default_params(&self) -> Params {
        Params::new()
            .with("baseRadius", 0.085)
            .with("baseHeight", 0.018)
            .with("poleWidth", 0.032)
            .with("poleDepth", 0.018)
            .with("poleHeight", 0.4)
            .with("shellWidth", 0.042)
            .with("shellLength", 0.4)
            .with("shellThickness", 0.012)
            .with("openAngle", 0.0)
            .with("color", "#ffffff")
    }

    fn build(&self, container: &mut PartNode, item: &LayoutItem) -> Result<(), BuildError> {
        let p = &item.params;
        let kind = self.kind();
        let base_radius = p.require_positive(kind, "baseRadius")?;
        let base_height = p.require_positive(kind, "baseHeight")?;
        let pole_width = p.require_positive(kind, "poleWidth")?;
        let pole_depth = p.require_positive(kind, "poleDepth")?;
        let pole_height = p.require_positive(kind, "poleHeight")?;
        let shell_width = p.require_positive(kind, "shellWidth")?;
        let shell_length = p.require_positive(kind, "shellLength")?;
        let shell_thickness = p.require_positive(kind, "shellThickness")?;
        let open = p.f32("openAngle").unwrap_or(0.0).to_radians();
        let body = material(item, "#ffffff", 0.4, 0.5);
        let diffuser = MaterialSpec::new("#fffbe6", 0.2, 0.0).with_opacity(0.9);

        container.push(
            PartNode::mesh("base", Shape::cylinder(base_radius, base_height), body.clone())
                .at(0.0, base_height / 2.0, 0.0),
        );
        container.push(
            PartNode::mesh(
                "pole",
                Shape::cuboid(pole_width, pole_height, pole_depth),
                body.clone(),
            )
            .at(0.0, base_height + pole_height / 2.0, 0.0),
        );
        // The head hinges at the pole top and extends forward along +Z.
        container.push(
            PartNode::group("head")
                .at(0.0, base_height + pole_height, 0.0)
                .rotated(-open, 0.0, 0.0)
                .with_child(
                    PartNode::mesh(
                        "shell",
                        Shape::cuboid(shell_width, shell_thickness, shell_length),
                        body,
                    )
                    .at(0.0, 0.0, shell_length / 2.0 - pole_depth / 2.0),
                )
                .with_child(
                    PartNode::mesh(
                        "diffuser",
                        Shape::cuboid(shell_width * 0.8, 0.002, shell_length * 0.9),
                        diffuser,
                    )
                    .at(0.0, -shell_thickness / 2.0, shell_length / 2.0 - pole_depth / 2.0),
                ),
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Custom primitives
// ---------------------------------------------------------------------------

struct CustomBox;

impl ModelRecipe for CustomBox {
    fn kind(&self) -> ItemKind {
        ItemKind::CustomBox
    }

    fn catalog_group(&self) -> Option<CatalogGroup> {
        Some(CatalogGroup::Others)
    }

    fn default_params(&self) -> Params {
        Params::new()
            .with("width", 0.2)
            .with("height", 0.4)
            .with("depth", 0.5)
            .with("color", "#BEBEBE")
    }

    fn build(&self, container: &mut PartNode, item: &LayoutItem) -> Result<(), BuildError> {
        let kind = self.kind();
        let width = item.params.require_positive(kind, "width")?;
        let height = item.params.require_positive(kind, "height")?;
        let depth = item.params.require_positive(kind, "depth")?;
        container.push(
            PartNode::mesh(
                "box",
                Shape::cuboid(width, height, depth),
                material(item, "#BEBEBE", 0.5, 0.0),
            )
            .at(0.0, height / 2.0, 0.0),
        );
        Ok(())
    }
}

struct CustomCylinder;

impl ModelRecipe for CustomCylinder {
    fn kind(&self) -> ItemKind {
        ItemKind::CustomCylinder
    }

    fn catalog_group(&self) -> Option<CatalogGroup> {
        Some(CatalogGroup::Others)
    }

    fn default_params(&self) -> Params {
        Params::new()
            .with("radiusTop", 0.1)
            .with("radiusBottom", 0.1)
            .with("height", 0.3)
            .with("color", "#BEBEBE")
    }

    fn build(&self, container: &mut PartNode, item: &LayoutItem) -> Result<(), BuildError> {
        let kind = self.kind();
        let radius_top = item.params.require_f32(kind, "radiusTop")?.max(0.0);
        let radius_bottom = item.params.require_positive(kind, "radiusBottom")?;
        let height = item.params.require_positive(kind, "height")?;
        container.push(
            PartNode::mesh(
                "cylinder",
                Shape::Cylinder {
                    radius_top,
                    radius_bottom,
                    height,
                },
                material(item, "#BEBEBE", 0.5, 0.0),
            )
            .at(0.0, height / 2.0, 0.0),
        );
        Ok(())
    }
}

struct CustomSphere;

impl ModelRecipe for CustomSphere {
    fn kind(&self) -> ItemKind {
        ItemKind::CustomSphere
    }

    fn catalog_group(&self) -> Option<CatalogGroup> {
        Some(CatalogGroup::Others)
    }

    fn default_params(&self) -> Params {
        Params::new().with("radius", 0.1).with("color", "#BEBEBE")
    }

    fn build(&self, container: &mut PartNode, item: &LayoutItem) -> Result<(), BuildError> {
        let radius = item.params.require_positive(self.kind(), "radius")?;
        container.push(
            PartNode::mesh(
                "sphere",
                Shape::Sphere { radius },
                material(item, "#BEBEBE", 0.5, 0.0),
            )
            .at(0.0, radius, 0.0),
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Imported models
// ---------------------------------------------------------------------------

struct ImportedModel;

impl ModelRecipe for ImportedModel {
    fn kind(&self) -> ItemKind {
        ItemKind::ImportedModel
    }

    fn catalog_group(&self) -> Option<CatalogGroup> {
        None
    }

    fn default_params(&self) -> Params {
        Params::new()
            .with("fileName", "")
            .with("dataUrl", "")
            .with("color", "#ffffff")
    }

    // Geometry arrives later through the scene crate's resolver.
    fn build(&self, _container: &mut PartNode, _item: &LayoutItem) -> Result<(), BuildError> {
        Ok(())
    }

    fn is_async(&self) -> bool {
        true
    }
}
