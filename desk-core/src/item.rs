//! Layout items - the building blocks of a desk layout.

use std::fmt;
use std::str::FromStr;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{BuildError, CoreError};

/// Param key holding the id of the item mounted on a host.
pub const MOUNT_SLOT: &str = "mountedItemId";

/// Param key older layout files used for [`MOUNT_SLOT`].
pub const LEGACY_MOUNT_SLOT: &str = "mountedObjectId";

/// Unique identifier for a layout item.
///
/// Ids are opaque strings so that layout files written by other tools round
/// trip unchanged. Freshly created items get a UUID v4.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Create a new unique item ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an existing identifier.
    #[must_use]
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// The kind tag of a layout item.
///
/// The set is closed: every kind has exactly one entry in the
/// [`ModelRegistry`](crate::registry::ModelRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ItemKind {
    /// Rectangular desk.
    DeskRect,
    /// L-shaped corner desk.
    DeskL,
    /// Monitor on its own foot.
    Monitor,
    /// Bare monitor panel, usually mounted on an arm or stand.
    MonitorWithoutStand,
    /// Laptop.
    Macbook,
    /// Phone.
    #[serde(alias = "iphone")]
    Phone,
    /// Tablet.
    Tablet,
    /// Desktop PC tower.
    #[serde(alias = "pc_case")]
    PcCase,
    /// Full-size keyboard.
    #[serde(alias = "keyboard-108")]
    Keyboard,
    /// Tenkeyless keyboard.
    #[serde(rename = "keyboard-87")]
    Keyboard87,
    /// 65% keyboard.
    #[serde(rename = "keyboard-68")]
    Keyboard68,
    /// 60% keyboard.
    #[serde(rename = "keyboard-60")]
    Keyboard60,
    /// Mouse.
    Mouse,
    /// Mouse pad / desk mat.
    MousePad,
    /// Stylus pen lying on its side.
    Stylus,
    /// Bookshelf speaker.
    Speaker,
    /// Sound bar.
    SoundBar,
    /// Headphones lying flat.
    Headphone,
    /// Desk microphone on a short stand.
    Microphone,
    /// Pole stand with a straight arm; mount host.
    UniversalStand,
    /// Clamp-on monitor arm with yaw and tilt; mount host.
    MonitorArm,
    /// Round base stand with a tilting pivot; mount host.
    RoundBaseStand,
    /// Rectangular base stand with a tilting pivot; mount host.
    RectangleBaseStand,
    /// Shelf that raises a monitor off the desk top.
    MonitorRiser,
    /// Desk lamp.
    #[serde(alias = "round-base-table-light")]
    TableLight,
    /// Free-form box primitive.
    CustomBox,
    /// Free-form cylinder primitive.
    CustomCylinder,
    /// Free-form sphere primitive.
    CustomSphere,
    /// User-imported glTF model, resolved asynchronously.
    ImportedModel,
}

impl ItemKind {
    /// Every kind, in catalog order.
    pub const ALL: [ItemKind; 29] = [
        ItemKind::DeskRect,
        ItemKind::DeskL,
        ItemKind::Monitor,
        ItemKind::MonitorWithoutStand,
        ItemKind::Macbook,
        ItemKind::Phone,
        ItemKind::Tablet,
        ItemKind::PcCase,
        ItemKind::MousePad,
        ItemKind::Keyboard,
        ItemKind::Keyboard87,
        ItemKind::Keyboard68,
        ItemKind::Keyboard60,
        ItemKind::Mouse,
        ItemKind::Stylus,
        ItemKind::Speaker,
        ItemKind::SoundBar,
        ItemKind::Headphone,
        ItemKind::Microphone,
        ItemKind::UniversalStand,
        ItemKind::MonitorArm,
        ItemKind::RoundBaseStand,
        ItemKind::RectangleBaseStand,
        ItemKind::MonitorRiser,
        ItemKind::TableLight,
        ItemKind::CustomBox,
        ItemKind::CustomCylinder,
        ItemKind::CustomSphere,
        ItemKind::ImportedModel,
    ];

    /// The serialized tag for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DeskRect => "desk-rect",
            Self::DeskL => "desk-l",
            Self::Monitor => "monitor",
            Self::MonitorWithoutStand => "monitor-without-stand",
            Self::Macbook => "macbook",
            Self::Phone => "phone",
            Self::Tablet => "tablet",
            Self::PcCase => "pc-case",
            Self::Keyboard => "keyboard",
            Self::Keyboard87 => "keyboard-87",
            Self::Keyboard68 => "keyboard-68",
            Self::Keyboard60 => "keyboard-60",
            Self::Mouse => "mouse",
            Self::MousePad => "mouse-pad",
            Self::Stylus => "stylus",
            Self::Speaker => "speaker",
            Self::SoundBar => "sound-bar",
            Self::Headphone => "headphone",
            Self::Microphone => "microphone",
            Self::UniversalStand => "universal-stand",
            Self::MonitorArm => "monitor-arm",
            Self::RoundBaseStand => "round-base-stand",
            Self::RectangleBaseStand => "rectangle-base-stand",
            Self::MonitorRiser => "monitor-riser",
            Self::TableLight => "table-light",
            Self::CustomBox => "custom-box",
            Self::CustomCylinder => "custom-cylinder",
            Self::CustomSphere => "custom-sphere",
            Self::ImportedModel => "imported-model",
        }
    }

    /// Whether this is one of the desk kinds (at most one per document).
    #[must_use]
    pub const fn is_desk(self) -> bool {
        matches!(self, Self::DeskRect | Self::DeskL)
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CoreError::UnknownKind(s.to_string()))
    }
}

/// A serializable `{x, y, z}` triple used for positions (meters) and
/// rotations (degrees).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coord3 {
    /// X component.
    pub x: f32,
    /// Y component.
    pub y: f32,
    /// Z component.
    pub z: f32,
}

impl Coord3 {
    /// Create a new triple.
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Convert to a glam vector.
    #[must_use]
    pub const fn to_vec3(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    /// Whether every component is finite.
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<Vec3> for Coord3 {
    fn from(v: Vec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

/// Kind-specific parameters of an item: dimensions, colors, flags and, for
/// mount hosts, the [`MOUNT_SLOT`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(Map<String, Value>);

impl Params {
    /// Create an empty parameter record.
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Insert or overwrite a parameter.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    /// Get a raw parameter value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Whether a parameter key is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Remove a parameter, returning its previous value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Read a numeric parameter.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn f32(&self, key: &str) -> Option<f32> {
        self.0.get(key).and_then(Value::as_f64).map(|v| v as f32)
    }

    /// Read a numeric parameter that a recipe cannot do without.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::MissingParam`] if absent and
    /// [`BuildError::InvalidParam`] if present but not a finite number.
    pub fn require_f32(&self, kind: ItemKind, key: &str) -> Result<f32, BuildError> {
        let value = self.0.get(key).ok_or_else(|| BuildError::MissingParam {
            kind,
            key: key.to_string(),
        })?;
        #[allow(clippy::cast_possible_truncation)]
        let number = value.as_f64().map(|v| v as f32).filter(|v| v.is_finite());
        number.ok_or_else(|| BuildError::InvalidParam {
            kind,
            key: key.to_string(),
            reason: format!("expected a finite number, got {value}"),
        })
    }

    /// Read a numeric parameter that must be strictly positive.
    ///
    /// # Errors
    ///
    /// Same as [`Params::require_f32`], plus [`BuildError::InvalidParam`] for
    /// zero or negative values.
    pub fn require_positive(&self, kind: ItemKind, key: &str) -> Result<f32, BuildError> {
        let value = self.require_f32(kind, key)?;
        if value > 0.0 {
            Ok(value)
        } else {
            Err(BuildError::InvalidParam {
                kind,
                key: key.to_string(),
                reason: format!("must be positive, got {value}"),
            })
        }
    }

    /// Read a boolean flag with a fallback.
    #[must_use]
    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        self.0.get(key).and_then(Value::as_bool).unwrap_or(default)
    }

    /// Read a string parameter.
    #[must_use]
    pub fn str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// The id of the item mounted on this host, if any.
    #[must_use]
    pub fn mounted_item_id(&self) -> Option<ItemId> {
        self.str(MOUNT_SLOT).map(ItemId::from)
    }

    /// Fill or clear the mount slot.
    pub fn set_mounted_item_id(&mut self, id: Option<&ItemId>) {
        let value = id.map_or(Value::Null, |id| Value::String(id.to_string()));
        self.0.insert(MOUNT_SLOT.to_string(), value);
    }

    /// Merge another record into this one, overwriting existing keys.
    pub fn merge(&mut self, patch: &Map<String, Value>) {
        for (key, value) in patch {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Rename the legacy mount slot key to the current one.
    pub(crate) fn normalize_legacy_keys(&mut self) {
        if let Some(value) = self.0.remove(LEGACY_MOUNT_SLOT) {
            self.0.entry(MOUNT_SLOT.to_string()).or_insert(value);
        }
    }

    /// Iterate over the parameters.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

/// One placed, typed, parameterized entry of a layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutItem {
    /// Unique identifier.
    pub id: ItemId,
    /// Item kind tag.
    #[serde(alias = "type")]
    pub kind: ItemKind,
    /// Optional display label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Free-standing position in meters. Kept but ignored while mounted.
    #[serde(default)]
    pub position: Coord3,
    /// Free-standing rotation in degrees (XYZ order). Kept but ignored while mounted.
    #[serde(default)]
    pub rotation: Coord3,
    /// Kind-specific parameters.
    #[serde(default)]
    pub params: Params,
    /// Host this item is mounted on.
    #[serde(default)]
    pub mounted_to_id: Option<ItemId>,
}

impl LayoutItem {
    /// Create an item at the origin with empty params.
    #[must_use]
    pub fn new(id: ItemId, kind: ItemKind) -> Self {
        Self {
            id,
            kind,
            name: None,
            position: Coord3::default(),
            rotation: Coord3::default(),
            params: Params::new(),
            mounted_to_id: None,
        }
    }

    /// Set the position.
    #[must_use]
    pub fn with_position(mut self, position: Coord3) -> Self {
        self.position = position;
        self
    }

    /// Set the rotation (degrees).
    #[must_use]
    pub fn with_rotation(mut self, rotation: Coord3) -> Self {
        self.rotation = rotation;
        self
    }

    /// Set the params.
    #[must_use]
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Whether this item is currently mounted on a host.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.mounted_to_id.is_some()
    }

    /// Whether this item is a desk.
    #[must_use]
    pub fn is_desk(&self) -> bool {
        self.kind.is_desk()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags_round_trip_through_from_str() {
        for kind in ItemKind::ALL {
            let parsed: ItemKind = kind.as_str().parse().expect("known tag");
            assert_eq!(parsed, kind);
        }
        assert!("standing-desk".parse::<ItemKind>().is_err());
    }

    #[test]
    fn test_kind_serializes_kebab_case_and_accepts_aliases() {
        let json = serde_json::to_string(&ItemKind::UniversalStand).expect("serialize");
        assert_eq!(json, "\"universal-stand\"");

        let legacy: ItemKind = serde_json::from_str("\"iphone\"").expect("alias");
        assert_eq!(legacy, ItemKind::Phone);

        let tkl: ItemKind = serde_json::from_str("\"keyboard-87\"").expect("keyboard-87");
        assert_eq!(tkl, ItemKind::Keyboard87);
        assert_eq!(
            serde_json::to_string(&ItemKind::Keyboard60).expect("serialize"),
            "\"keyboard-60\""
        );
        let tower: ItemKind = serde_json::from_str("\"pc_case\"").expect("alias");
        assert_eq!(tower, ItemKind::PcCase);
    }

    #[test]
    fn test_item_reads_legacy_type_field() {
        let json = r#"{
            "id": "abc",
            "type": "custom-box",
            "position": {"x": 1.0, "y": 0.75, "z": 0.0},
            "rotation": {"x": 0, "y": 90, "z": 0},
            "params": {"width": 0.2},
            "mountedToId": null
        }"#;
        let item: LayoutItem = serde_json::from_str(json).expect("parse");
        assert_eq!(item.id.as_str(), "abc");
        assert_eq!(item.kind, ItemKind::CustomBox);
        assert!((item.rotation.y - 90.0).abs() < f32::EPSILON);
        assert!(!item.is_mounted());
    }

    #[test]
    fn test_require_f32_reports_missing_and_invalid() {
        let params = Params::new().with("width", 0.5).with("color", "#fff");
        assert!((params.require_f32(ItemKind::CustomBox, "width").expect("width") - 0.5).abs() < 1e-6);

        let missing = params.require_f32(ItemKind::CustomBox, "depth");
        assert!(matches!(missing, Err(BuildError::MissingParam { .. })));

        let invalid = params.require_f32(ItemKind::CustomBox, "color");
        assert!(matches!(invalid, Err(BuildError::InvalidParam { .. })));
    }

    #[test]
    fn test_mount_slot_set_and_clear() {
        let mut params = Params::new();
        assert!(params.mounted_item_id().is_none());

        let id = ItemId::from("laptop");
        params.set_mounted_item_id(Some(&id));
        assert_eq!(params.mounted_item_id(), Some(id));

        params.set_mounted_item_id(None);
        assert!(params.mounted_item_id().is_none());
        assert!(params.contains(MOUNT_SLOT));
    }

    #[test]
    fn test_legacy_mount_key_is_renamed() {
        let mut params = Params::new().with(LEGACY_MOUNT_SLOT, "phone-1");
        params.normalize_legacy_keys();
        assert!(!params.contains(LEGACY_MOUNT_SLOT));
        assert_eq!(params.mounted_item_id(), Some(ItemId::from("phone-1")));
    }
}
