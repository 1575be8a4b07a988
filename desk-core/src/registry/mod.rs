//! Model registry: per-kind default factories and geometry recipes.
//!
//! Every [`ItemKind`] maps to exactly one boxed [`ModelRecipe`]. Adding a kind
//! means adding one enum variant and one recipe; the recipe declares its own
//! menu group, so the catalog follows the registry.

mod recipes;

use std::collections::HashMap;

use glam::Vec3;
use serde::Serialize;

use crate::error::{BuildError, CoreError, CoreResult};
use crate::item::{Coord3, ItemId, ItemKind, LayoutItem, Params};
use crate::parts::PartNode;

pub use recipes::builtin_recipes;

/// Local transform a host applies to the item mounted on it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MountAnchor {
    /// Offset from the host origin.
    pub translation: Vec3,
    /// Euler rotation (XYZ order, radians).
    pub rotation: Vec3,
}

impl MountAnchor {
    /// An anchor with no rotation.
    #[must_use]
    pub const fn offset(translation: Vec3) -> Self {
        Self {
            translation,
            rotation: Vec3::ZERO,
        }
    }
}

/// The contract each item kind implements.
///
/// Both [`create_default`](ModelRecipe::create_default) and
/// [`build`](ModelRecipe::build) must be deterministic: the same item always
/// yields the same part tree.
pub trait ModelRecipe: Send + Sync {
    /// The kind this recipe serves.
    fn kind(&self) -> ItemKind;

    /// Default parameters for a freshly added item.
    fn default_params(&self) -> Params;

    /// Create a new item resting at height `anchor_y`.
    fn create_default(&self, id: ItemId, anchor_y: f32) -> LayoutItem {
        LayoutItem::new(id, self.kind())
            .with_position(Coord3::new(0.0, anchor_y, 0.0))
            .with_params(self.default_params())
    }

    /// Populate an empty container with this item's parts.
    ///
    /// # Errors
    ///
    /// Returns a [`BuildError`] when a parameter is missing or malformed.
    fn build(&self, container: &mut PartNode, item: &LayoutItem) -> Result<(), BuildError>;

    /// Whether this kind can host a mounted item.
    fn is_mount_host(&self) -> bool {
        false
    }

    /// Where a mounted item sits relative to this host.
    ///
    /// # Errors
    ///
    /// [`BuildError::NotMountHost`] for kinds without an anchor, or a param
    /// error if the anchor inputs are malformed.
    fn mount_anchor(&self, _params: &Params) -> Result<MountAnchor, BuildError> {
        Err(BuildError::NotMountHost(self.kind()))
    }

    /// Whether the geometry is resolved asynchronously instead of built.
    fn is_async(&self) -> bool {
        false
    }

    /// Menu group this kind is listed under, or `None` to keep it out of the catalog.
    fn catalog_group(&self) -> Option<CatalogGroup>;
}

/// The fixed menu groups, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogGroup {
    /// Desks.
    Desks,
    /// Screens, computers and handhelds.
    Devices,
    /// Peripherals, audio, stands and lights.
    Accessories,
    /// Free-form primitives.
    Others,
}

impl CatalogGroup {
    /// Every group, in display order.
    pub const ALL: [CatalogGroup; 4] = [
        CatalogGroup::Desks,
        CatalogGroup::Devices,
        CatalogGroup::Accessories,
        CatalogGroup::Others,
    ];

    /// Menu key of the group.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Desks => "desks",
            Self::Devices => "devices",
            Self::Accessories => "accessories",
            Self::Others => "others",
        }
    }
}

/// A menu group of kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogCategory {
    /// Category key (`desks`, `devices`, `accessories`, `others`).
    pub key: &'static str,
    /// Kinds in display order.
    pub kinds: Vec<ItemKind>,
}

/// Lookup table from kind to recipe.
pub struct ModelRegistry {
    recipes: HashMap<ItemKind, Box<dyn ModelRecipe>>,
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.recipes.keys().collect();
        kinds.sort();
        f.debug_struct("ModelRegistry").field("kinds", &kinds).finish()
    }
}

impl ModelRegistry {
    /// An empty registry.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            recipes: HashMap::new(),
        }
    }

    /// A registry with every built-in kind.
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();
        for recipe in builtin_recipes() {
            registry.register(recipe);
        }
        registry
    }

    /// Register a recipe, replacing any previous one for the same kind.
    pub fn register(&mut self, recipe: Box<dyn ModelRecipe>) {
        self.recipes.insert(recipe.kind(), recipe);
    }

    /// Get the recipe for a kind.
    #[must_use]
    pub fn get(&self, kind: ItemKind) -> Option<&dyn ModelRecipe> {
        self.recipes.get(&kind).map(AsRef::as_ref)
    }

    /// Whether a recipe is registered for the kind.
    #[must_use]
    pub fn contains(&self, kind: ItemKind) -> bool {
        self.recipes.contains_key(&kind)
    }

    /// Registered kinds in catalog order.
    #[must_use]
    pub fn kinds(&self) -> Vec<ItemKind> {
        ItemKind::ALL
            .into_iter()
            .filter(|kind| self.recipes.contains_key(kind))
            .collect()
    }

    /// Create a default item of `kind` resting at `anchor_y`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownKind`] if no recipe is registered.
    pub fn create_default(&self, kind: ItemKind, id: ItemId, anchor_y: f32) -> CoreResult<LayoutItem> {
        self.get(kind)
            .map(|recipe| recipe.create_default(id, anchor_y))
            .ok_or_else(|| CoreError::UnknownKind(kind.to_string()))
    }

    /// Build the part tree of an item into a fresh container labelled with its id.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::UnregisteredKind`] or the recipe's own error.
    pub fn build(&self, item: &LayoutItem) -> Result<PartNode, BuildError> {
        let recipe = self
            .get(item.kind)
            .ok_or(BuildError::UnregisteredKind(item.kind))?;
        let mut container = PartNode::group(item.id.as_str());
        recipe.build(&mut container, item)?;
        Ok(container)
    }

    /// Whether items of this kind can host a mounted item.
    #[must_use]
    pub fn is_mount_host(&self, kind: ItemKind) -> bool {
        self.get(kind).is_some_and(ModelRecipe::is_mount_host)
    }

    /// Whether items of this kind are resolved asynchronously.
    #[must_use]
    pub fn is_async(&self, kind: ItemKind) -> bool {
        self.get(kind).is_some_and(ModelRecipe::is_async)
    }

    /// Mount anchor for a host item.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] if the kind is not a host or its params are malformed.
    pub fn mount_anchor(&self, host: &LayoutItem) -> Result<MountAnchor, BuildError> {
        self.get(host.kind)
            .ok_or(BuildError::UnregisteredKind(host.kind))?
            .mount_anchor(&host.params)
    }

    /// Kinds grouped for menus, each in [`ItemKind::ALL`] order.
    ///
    /// Only registered recipes with a [`CatalogGroup`] are listed; empty groups
    /// are omitted.
    #[must_use]
    pub fn catalog(&self) -> Vec<CatalogCategory> {
        let listed: Vec<(ItemKind, CatalogGroup)> = self
            .kinds()
            .into_iter()
            .filter_map(|kind| {
                let group = self.get(kind)?.catalog_group()?;
                Some((kind, group))
            })
            .collect();

        CatalogGroup::ALL
            .into_iter()
            .map(|group| CatalogCategory {
                key: group.key(),
                kinds: listed
                    .iter()
                    .filter(|(_, g)| *g == group)
                    .map(|(kind, _)| *kind)
                    .collect(),
            })
            .filter(|category| !category.kinds.is_empty())
            .collect()
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::MOUNT_SLOT;
    use crate::parts::{MeshSpec, Shape};

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn test_builtin_covers_every_kind() {
        let registry = ModelRegistry::with_builtin();
        for kind in ItemKind::ALL {
            assert!(registry.contains(kind), "missing recipe for {kind}");
        }
    }

    #[test]
    fn test_every_sync_kind_builds_from_defaults() {
        let registry = ModelRegistry::with_builtin();
        for kind in ItemKind::ALL {
            let item = registry
                .create_default(kind, ItemId::new(), 0.75)
                .expect("default item");
            let tree = registry.build(&item).expect("build");
            if registry.is_async(kind) {
                assert!(tree.is_empty(), "{kind} should build a placeholder");
            } else {
                assert!(!tree.is_empty(), "{kind} built nothing");
            }
        }
    }

    #[test]
    fn test_build_is_deterministic() {
        let registry = ModelRegistry::with_builtin();
        let item = registry
            .create_default(ItemKind::Monitor, ItemId::from("m"), 0.0)
            .expect("monitor");
        assert_eq!(registry.build(&item).expect("a"), registry.build(&item).expect("b"));
    }

    #[test]
    fn test_default_placement_uses_anchor_except_desks() {
        let registry = ModelRegistry::with_builtin();
        let keyboard = registry
            .create_default(ItemKind::Keyboard, ItemId::new(), 0.75)
            .expect("keyboard");
        assert!((keyboard.position.y - 0.75).abs() < 1e-6);

        let desk = registry
            .create_default(ItemKind::DeskRect, ItemId::new(), 0.75)
            .expect("desk");
        assert!(desk.position.y.abs() < 1e-6);
        assert!((desk.params.f32("height").expect("height") - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_hosts_carry_empty_mount_slot() {
        let registry = ModelRegistry::with_builtin();
        for kind in ItemKind::ALL {
            let item = registry.create_default(kind, ItemId::new(), 0.0).expect("item");
            assert_eq!(registry.is_mount_host(kind), item.params.contains(MOUNT_SLOT), "{kind}");
            assert!(item.params.mounted_item_id().is_none());
        }
    }

    #[test]
    fn test_universal_stand_anchor() {
        let registry = ModelRegistry::with_builtin();
        let stand = registry
            .create_default(ItemKind::UniversalStand, ItemId::new(), 0.0)
            .expect("stand");
        let anchor = registry.mount_anchor(&stand).expect("anchor");
        assert!(approx(anchor.translation, Vec3::new(0.3, 0.42, 0.0)));
        assert!(approx(anchor.rotation, Vec3::ZERO));
    }

    #[test]
    fn test_monitor_arm_anchor_follows_yaw() {
        let registry = ModelRegistry::with_builtin();
        let mut arm = registry
            .create_default(ItemKind::MonitorArm, ItemId::new(), 0.0)
            .expect("arm");
        arm.params.set("armYaw", 90.0);
        arm.params.set("tiltX", -10.0);
        let anchor = registry.mount_anchor(&arm).expect("anchor");

        let length = arm.params.f32("armLength").expect("armLength");
        let top = arm.params.f32("baseHeight").expect("baseHeight")
            + arm.params.f32("poleHeight").expect("poleHeight");
        assert!(approx(anchor.translation, Vec3::new(0.0, top, -length)));
        assert!(approx(
            anchor.rotation,
            Vec3::new((-10.0f32).to_radians(), 90.0f32.to_radians(), 0.0)
        ));
    }

    #[test]
    fn test_non_host_has_no_anchor() {
        let registry = ModelRegistry::with_builtin();
        let mouse = registry
            .create_default(ItemKind::Mouse, ItemId::new(), 0.0)
            .expect("mouse");
        assert_eq!(
            registry.mount_anchor(&mouse),
            Err(BuildError::NotMountHost(ItemKind::Mouse))
        );
    }

    #[test]
    fn test_build_reports_missing_param() {
        let registry = ModelRegistry::with_builtin();
        let mut item = registry
            .create_default(ItemKind::CustomBox, ItemId::new(), 0.0)
            .expect("box");
        item.params.remove("width");
        assert!(matches!(
            registry.build(&item),
            Err(BuildError::MissingParam { kind: ItemKind::CustomBox, .. })
        ));
    }

    #[test]
    fn test_catalog_groups() {
        let registry = ModelRegistry::with_builtin();
        let catalog = registry.catalog();
        let keys: Vec<_> = catalog.iter().map(|c| c.key).collect();
        assert_eq!(keys, vec!["desks", "devices", "accessories", "others"]);

        let listed: Vec<ItemKind> = catalog.iter().flat_map(|c| c.kinds.clone()).collect();
        for kind in ItemKind::ALL {
            let expected = usize::from(kind != ItemKind::ImportedModel);
            let count = listed.iter().filter(|k| **k == kind).count();
            assert_eq!(count, expected, "{kind} listed {count} times");
        }

        let accessories = &catalog[2].kinds;
        assert_eq!(
            &accessories[..5],
            &[
                ItemKind::MousePad,
                ItemKind::Keyboard,
                ItemKind::Keyboard87,
                ItemKind::Keyboard68,
                ItemKind::Keyboard60,
            ]
        );
        assert!(catalog[1].kinds.contains(&ItemKind::PcCase));
    }

    struct Lamp;

    impl ModelRecipe for Lamp {
        fn kind(&self) -> ItemKind {
            ItemKind::CustomSphere
        }

        fn default_params(&self) -> Params {
            Params::new().with("radius", 0.05)
        }

        fn build(&self, container: &mut PartNode, _item: &LayoutItem) -> Result<(), BuildError> {
            container.push(PartNode::group("bulb"));
            Ok(())
        }

        fn catalog_group(&self) -> Option<CatalogGroup> {
            Some(CatalogGroup::Devices)
        }
    }

    #[test]
    fn test_catalog_follows_registered_recipes() {
        let mut registry = ModelRegistry::empty();
        registry.register(Box::new(Lamp));
        assert_eq!(
            registry.catalog(),
            vec![CatalogCategory {
                key: "devices",
                kinds: vec![ItemKind::CustomSphere],
            }]
        );

        // Replacing a built-in recipe moves its kind to the new group.
        let mut builtin = ModelRegistry::with_builtin();
        builtin.register(Box::new(Lamp));
        let catalog = builtin.catalog();
        let others = catalog.iter().find(|c| c.key == "others").expect("others");
        assert!(!others.kinds.contains(&ItemKind::CustomSphere));
        let devices = catalog.iter().find(|c| c.key == "devices").expect("devices");
        assert_eq!(devices.kinds.last(), Some(&ItemKind::CustomSphere));
    }

    fn part<'a>(tree: &'a PartNode, label: &str) -> &'a PartNode {
        tree.children
            .iter()
            .find(|child| child.label == label)
            .unwrap_or_else(|| panic!("no part {label}"))
    }

    #[test]
    fn test_keyboard_layouts_share_recipe_with_own_footprint() {
        let registry = ModelRegistry::with_builtin();
        let mut widths = Vec::new();
        for kind in [
            ItemKind::Keyboard,
            ItemKind::Keyboard87,
            ItemKind::Keyboard68,
            ItemKind::Keyboard60,
        ] {
            let item = registry.create_default(kind, ItemId::new(), 0.75).expect("keyboard");
            let tree = registry.build(&item).expect("build");
            assert_eq!(tree.mesh_count(), 2, "{kind}");
            let Some(MeshSpec {
                shape: Shape::Box { width, .. },
                ..
            }) = &part(&tree, "case").mesh
            else {
                panic!("{kind} case is not a box");
            };
            widths.push(*width);
        }
        for (width, expected) in widths.into_iter().zip([0.44, 0.36, 0.32, 0.30]) {
            assert!((width - expected).abs() < 1e-6, "{width} != {expected}");
        }
    }

    #[test]
    fn test_pc_case_preset_overrides_dimensions() {
        let registry = ModelRegistry::with_builtin();
        let mut case = registry
            .create_default(ItemKind::PcCase, ItemId::new(), 0.0)
            .expect("case");
        let body_size = |case: &LayoutItem| {
            let tree = registry.build(case).expect("build");
            let (min, max) = part(&tree, "body")
                .mesh
                .as_ref()
                .map(|mesh| mesh.shape.local_bounds())
                .expect("mesh");
            max - min
        };

        case.params.set("preset", "itx");
        assert!(approx(body_size(&case), Vec3::new(0.15, 0.23, 0.25)));

        case.params.set("preset", "no-such-size");
        assert!(approx(body_size(&case), Vec3::new(0.2, 0.43, 0.4)));
    }

    #[test]
    fn test_rectangle_base_stand_anchor_matches_round_stand() {
        let registry = ModelRegistry::with_builtin();
        let round = registry
            .create_default(ItemKind::RoundBaseStand, ItemId::new(), 0.0)
            .expect("round");
        let rect = registry
            .create_default(ItemKind::RectangleBaseStand, ItemId::new(), 0.0)
            .expect("rect");
        assert!(registry.is_mount_host(ItemKind::RectangleBaseStand));
        assert_eq!(
            registry.mount_anchor(&rect).expect("rect anchor"),
            registry.mount_anchor(&round).expect("round anchor")
        );
    }

    #[test]
    fn test_monitor_riser_rejects_panel_thicker_than_height() {
        let registry = ModelRegistry::with_builtin();
        let mut riser = registry
            .create_default(ItemKind::MonitorRiser, ItemId::new(), 0.0)
            .expect("riser");
        assert_eq!(registry.build(&riser).expect("build").mesh_count(), 5);
        riser.params.set("panelThickness", 0.1);
        assert!(matches!(
            registry.build(&riser),
            Err(BuildError::InvalidParam { kind: ItemKind::MonitorRiser, .. })
        ));
    }

    #[test]
    fn test_empty_registry_rejects_everything() {
        let registry = ModelRegistry::empty();
        assert!(registry.create_default(ItemKind::Mouse, ItemId::new(), 0.0).is_err());
        assert!(registry.catalog().is_empty());
        assert!(!registry.is_mount_host(ItemKind::UniversalStand));
    }
}
