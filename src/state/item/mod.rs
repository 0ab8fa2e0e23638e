//! Timeline items
//!
//! An [`Item`] is a placed, typed entity occupying `[start, start + duration)`
//! frames in one row. Placement fields are shared by every kind; the rest lives
//! in an [`ItemPayload`]. All reads and writes go through roles so the model
//! can report exactly what changed.

mod factory;
mod payload;

pub use factory::create_item;
pub use payload::{
    AimPayload, ArmPayload, AudioPayload, ItemPayload, TrackPayload, ValuePayload, VideoPayload,
};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::{ItemId, LoadError};
use crate::core::media::{AudioInfo, VideoInfo};

/// Code of the first kind; lower codes are reserved.
const USER_TYPE: u8 = 2;

/// The kinds of item a timeline can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ItemKind {
    /// Robot arm pose
    Arm,
    /// Camera rail position
    Track,
    /// Camera aim target
    Aim,
    /// Video clip
    Video,
    /// Zoom keyframe
    Zoom,
    /// Focus keyframe
    Focus,
    /// Audio clip
    Audio,
}

impl ItemKind {
    pub const ALL: [ItemKind; 7] = [
        ItemKind::Arm,
        ItemKind::Track,
        ItemKind::Aim,
        ItemKind::Video,
        ItemKind::Zoom,
        ItemKind::Focus,
        ItemKind::Audio,
    ];

    /// Persisted type code stored in the identifier.
    pub const fn type_code(self) -> u8 {
        match self {
            ItemKind::Arm => USER_TYPE + 1,
            ItemKind::Track => USER_TYPE + 2,
            ItemKind::Aim => USER_TYPE + 3,
            ItemKind::Video => USER_TYPE + 4,
            ItemKind::Zoom => USER_TYPE + 5,
            ItemKind::Focus => USER_TYPE + 6,
            ItemKind::Audio => USER_TYPE + 7,
        }
    }

    pub fn from_type_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.type_code() == code)
    }

    pub const fn type_name(self) -> &'static str {
        match self {
            ItemKind::Arm => "Arm",
            ItemKind::Track => "Track",
            ItemKind::Aim => "Aim",
            ItemKind::Video => "Video",
            ItemKind::Zoom => "Zoom",
            ItemKind::Focus => "Focus",
            ItemKind::Audio => "Audio",
        }
    }
}

bitflags! {
    /// Set of item roles, used to report what an edit touched.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RoleMask: u32 {
        const START = 0x01;
        const DURATION = 0x02;
        const NUMBER = 0x04;
        const TOOL_TIP = 0x08;
        const ENABLED = 0x10;
        const POSITION = 1 << 6;
        const ANGLES = 1 << 7;
        const TRACKING = 1 << 8;
        const VALUE = 1 << 9;
        const MEDIA_INFO = 1 << 10;
        const PATH = 1 << 11;
    }
}

/// A single addressable item property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemRole {
    Start,
    Duration,
    /// 1-based position in the row; maintained by the model
    Number,
    /// Derived description; read-only
    ToolTip,
    Enabled,
    Position,
    Angles,
    Tracking,
    Value,
    MediaInfo,
    Path,
}

impl ItemRole {
    pub const fn mask(self) -> RoleMask {
        match self {
            ItemRole::Start => RoleMask::START,
            ItemRole::Duration => RoleMask::DURATION,
            ItemRole::Number => RoleMask::NUMBER,
            ItemRole::ToolTip => RoleMask::TOOL_TIP,
            ItemRole::Enabled => RoleMask::ENABLED,
            ItemRole::Position => RoleMask::POSITION,
            ItemRole::Angles => RoleMask::ANGLES,
            ItemRole::Tracking => RoleMask::TRACKING,
            ItemRole::Value => RoleMask::VALUE,
            ItemRole::MediaInfo => RoleMask::MEDIA_INFO,
            ItemRole::Path => RoleMask::PATH,
        }
    }
}

/// Value read from or written to an item role.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Int(i64),
    Bool(bool),
    Float(f64),
    Text(String),
    Vec3([f64; 3]),
    List(Vec<f64>),
    Video(VideoInfo),
    Audio(AudioInfo),
}

impl PropertyValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Floats accept integer values too.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(value) if value.is_finite() => Some(*value),
            PropertyValue::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Non-empty text only.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(value) if !value.trim().is_empty() => Some(value),
            _ => None,
        }
    }

    pub fn as_vec3(&self) -> Option<[f64; 3]> {
        match self {
            PropertyValue::Vec3(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[f64]> {
        match self {
            PropertyValue::List(value) => Some(value),
            _ => None,
        }
    }
}

/// Structural operations that are not plain property writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemOperation {
    /// Add `param` to the sequence number
    IncreaseNumber,
    /// Subtract `param` from the sequence number
    DecreaseNumber,
    /// The item became (`param == 1`) or stopped being (`param == 0`) its row's head
    UpdateAsHead,
    /// The item became (`param == 1`) or stopped being (`param == 0`) its row's tail
    UpdateAsTail,
}

impl ItemOperation {
    /// Boundary operations are forwarded to observers once applied.
    pub const fn is_boundary(self) -> bool {
        matches!(self, ItemOperation::UpdateAsHead | ItemOperation::UpdateAsTail)
    }
}

/// Hint for the kind of editor a property editor should show.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EditorHint {
    SpinBox,
    DoubleSpinBox { decimals: u32, minimum: f64, maximum: f64 },
    CheckBox,
    LineEdit,
}

/// One row of a property editor.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyElement {
    pub label: &'static str,
    pub role: ItemRole,
    pub read_only: bool,
    pub editor: EditorHint,
}

impl PropertyElement {
    fn new(label: &'static str, role: ItemRole, read_only: bool, editor: EditorHint) -> Self {
        Self {
            label,
            role,
            read_only,
            editor,
        }
    }
}

/// Common envelope of a persisted item.
#[derive(Debug, Serialize, Deserialize)]
struct ItemEnvelope {
    number: i64,
    start: i64,
    duration: i64,
    enabled: bool,
}

/// A placed timeline item.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    id: ItemId,
    number: i64,
    start: i64,
    duration: i64,
    enabled: bool,
    dirty: bool,
    payload: ItemPayload,
}

impl Item {
    pub(crate) fn new(id: ItemId, kind: ItemKind) -> Self {
        Self {
            id,
            number: 0,
            start: 0,
            duration: 0,
            enabled: true,
            dirty: false,
            payload: ItemPayload::new(kind),
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn kind(&self) -> ItemKind {
        self.payload.kind()
    }

    pub fn row(&self) -> usize {
        self.id.row()
    }

    /// First frame covered.
    pub fn start(&self) -> i64 {
        self.start
    }

    /// Frame count, zero for instantaneous keyframes.
    pub fn duration(&self) -> i64 {
        self.duration
    }

    /// One past the last frame covered.
    pub fn end(&self) -> i64 {
        self.start.saturating_add(self.duration)
    }

    /// 1-based position among the row's items.
    pub fn number(&self) -> i64 {
        self.number
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn reset_dirty(&mut self) {
        self.dirty = false;
    }

    pub fn payload(&self) -> &ItemPayload {
        &self.payload
    }

    pub fn type_name(&self) -> &'static str {
        self.kind().type_name()
    }

    pub fn tool_tip(&self) -> String {
        let base = format!("Start: {}\nDuration: {}", self.start, self.duration);
        match self.payload.tool_tip_detail() {
            Some(detail) => format!("{}\n{}", base, detail),
            None => base,
        }
    }

    /// Roles this item answers to.
    pub fn roles(&self) -> RoleMask {
        RoleMask::START
            | RoleMask::DURATION
            | RoleMask::NUMBER
            | RoleMask::TOOL_TIP
            | RoleMask::ENABLED
            | self.payload.roles()
    }

    /// Read a role. Roles this kind does not carry read as `None`.
    pub fn property(&self, role: ItemRole) -> Option<PropertyValue> {
        match role {
            ItemRole::Start => Some(PropertyValue::Int(self.start)),
            ItemRole::Duration => Some(PropertyValue::Int(self.duration)),
            ItemRole::Number => Some(PropertyValue::Int(self.number)),
            ItemRole::ToolTip => Some(PropertyValue::Text(self.tool_tip())),
            ItemRole::Enabled => Some(PropertyValue::Bool(self.enabled)),
            _ => self.payload.property(role),
        }
    }

    /// Write a role.
    ///
    /// Returns `None` when the value is rejected (wrong shape, empty, negative
    /// placement, read-only or foreign role), otherwise the roles that changed,
    /// which is empty when the value was already current. Placement checks are
    /// the model's job; this only enforces the item's own constraints.
    pub fn set_property(&mut self, role: ItemRole, value: &PropertyValue) -> Option<RoleMask> {
        let changed = match role {
            ItemRole::Start => {
                let start = value.as_i64().filter(|start| *start >= 0)?;
                self.set_start(start)
            }
            ItemRole::Duration => {
                let duration = value.as_i64().filter(|duration| *duration >= 0)?;
                self.set_duration(duration)
            }
            ItemRole::Enabled => {
                let enabled = value.as_bool()?;
                if enabled == self.enabled {
                    RoleMask::empty()
                } else {
                    self.enabled = enabled;
                    RoleMask::ENABLED
                }
            }
            ItemRole::Number | ItemRole::ToolTip => return None,
            _ => self.payload.set_property(role, value)?,
        };
        if !changed.is_empty() {
            self.dirty = true;
        }
        Some(changed)
    }

    /// Apply a structural operation and return the roles it changed.
    pub fn operate(&mut self, op: ItemOperation, param: i64) -> RoleMask {
        match op {
            ItemOperation::IncreaseNumber => self.set_number(self.number + param),
            ItemOperation::DecreaseNumber => self.set_number(self.number - param),
            ItemOperation::UpdateAsHead | ItemOperation::UpdateAsTail => RoleMask::empty(),
        }
    }

    pub(crate) fn set_number(&mut self, number: i64) -> RoleMask {
        if number == self.number {
            return RoleMask::empty();
        }
        self.number = number;
        self.dirty = true;
        RoleMask::NUMBER
    }

    pub(crate) fn set_start(&mut self, start: i64) -> RoleMask {
        if start == self.start {
            return RoleMask::empty();
        }
        self.start = start;
        self.dirty = true;
        RoleMask::START | RoleMask::TOOL_TIP
    }

    pub(crate) fn set_duration(&mut self, duration: i64) -> RoleMask {
        if duration == self.duration {
            return RoleMask::empty();
        }
        self.duration = duration;
        self.dirty = true;
        RoleMask::DURATION | RoleMask::TOOL_TIP
    }

    /// Fields a property editor may show for this kind.
    pub fn editable_properties(&self) -> Vec<PropertyElement> {
        let mut elements = vec![
            PropertyElement::new("Number:", ItemRole::Number, true, EditorHint::SpinBox),
            PropertyElement::new("Start:", ItemRole::Start, false, EditorHint::SpinBox),
            PropertyElement::new("Duration:", ItemRole::Duration, false, EditorHint::SpinBox),
            PropertyElement::new("Enabled:", ItemRole::Enabled, false, EditorHint::CheckBox),
        ];
        let keyframe = EditorHint::DoubleSpinBox {
            decimals: 3,
            minimum: 0.0,
            maximum: 1_000_000.0,
        };
        match self.kind() {
            ItemKind::Focus => {
                elements.push(PropertyElement::new("Focus:", ItemRole::Value, false, keyframe));
            }
            ItemKind::Zoom => {
                elements.push(PropertyElement::new("Zoom:", ItemRole::Value, false, keyframe));
            }
            ItemKind::Track => elements.push(PropertyElement::new(
                "Position:",
                ItemRole::Position,
                false,
                EditorHint::DoubleSpinBox {
                    decimals: 3,
                    minimum: f64::MIN,
                    maximum: f64::MAX,
                },
            )),
            ItemKind::Arm => {
                elements.push(PropertyElement::new(
                    "Tracking:",
                    ItemRole::Tracking,
                    false,
                    EditorHint::CheckBox,
                ));
            }
            ItemKind::Video | ItemKind::Audio => {
                elements.push(PropertyElement::new(
                    "Path:",
                    ItemRole::Path,
                    true,
                    EditorHint::LineEdit,
                ));
            }
            ItemKind::Aim => {}
        }
        elements
    }

    /// Persist the item: the common envelope plus the kind's fields.
    pub fn save(&self) -> serde_json::Value {
        let envelope = ItemEnvelope {
            number: self.number,
            start: self.start,
            duration: self.duration,
            enabled: self.enabled,
        };
        let mut document = serde_json::Map::new();
        for part in [serde_json::to_value(&envelope), self.payload.to_json()] {
            match part {
                Ok(serde_json::Value::Object(fields)) => document.extend(fields),
                Ok(_) => {}
                Err(err) => tracing::error!(item = %self.id, %err, "failed to save item field"),
            }
        }
        serde_json::Value::Object(document)
    }

    /// Restore the item from [`Item::save`] output. On failure the item is
    /// left untouched.
    pub fn load(&mut self, document: &serde_json::Value) -> Result<(), LoadError> {
        let type_name = self.type_name();
        let malformed = |source: serde_json::Error| {
            tracing::error!(item = %self.id, type_name, %source, "failed to load item");
            LoadError::MalformedItem { type_name, source }
        };
        let envelope = ItemEnvelope::deserialize(document).map_err(malformed)?;
        let payload = ItemPayload::from_json(self.kind(), document).map_err(malformed)?;
        if envelope.start < 0 || envelope.duration < 0 {
            tracing::error!(
                item = %self.id,
                start = envelope.start,
                duration = envelope.duration,
                "negative placement"
            );
            return Err(LoadError::InconsistentIndex(self.id));
        }

        self.number = envelope.number;
        self.start = envelope.start;
        self.duration = envelope.duration;
        self.enabled = envelope.enabled;
        self.payload = payload;
        Ok(())
    }

    /// Replace the kind's data from a document, leaving placement alone.
    pub(crate) fn load_payload(
        &mut self,
        document: &serde_json::Value,
    ) -> Result<RoleMask, LoadError> {
        let payload = ItemPayload::from_json(self.kind(), document).map_err(|source| {
            LoadError::MalformedItem {
                type_name: self.type_name(),
                source,
            }
        })?;
        let enabled = document
            .get("enabled")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(self.enabled);

        let mut changed = RoleMask::empty();
        if payload != self.payload {
            changed |= self.payload.roles() | RoleMask::TOOL_TIP;
            self.payload = payload;
        }
        if enabled != self.enabled {
            self.enabled = enabled;
            changed |= RoleMask::ENABLED;
        }
        if !changed.is_empty() {
            self.dirty = true;
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(kind: ItemKind) -> Item {
        Item::new(ItemId::new(kind.type_code(), 0, 1), kind)
    }

    #[test]
    fn test_type_codes_are_stable() {
        let codes: Vec<u8> = ItemKind::ALL.iter().map(|kind| kind.type_code()).collect();
        assert_eq!(codes, vec![3, 4, 5, 6, 7, 8, 9]);
        for kind in ItemKind::ALL {
            assert_eq!(ItemKind::from_type_code(kind.type_code()), Some(kind));
        }
        assert_eq!(ItemKind::from_type_code(0), None);
        assert_eq!(ItemKind::from_type_code(42), None);
    }

    #[test]
    fn test_duration_change_touches_tooltip() {
        let mut item = item(ItemKind::Arm);
        let changed = item.set_property(ItemRole::Duration, &PropertyValue::Int(12));
        assert_eq!(changed, Some(RoleMask::DURATION | RoleMask::TOOL_TIP));
        assert!(item.is_dirty());
        assert_eq!(item.end(), 12);
    }

    #[test]
    fn test_rejected_values() {
        let mut item = item(ItemKind::Focus);
        assert!(item.set_property(ItemRole::Start, &PropertyValue::Int(-1)).is_none());
        assert!(item.set_property(ItemRole::Start, &PropertyValue::Text("3".into())).is_none());
        assert!(item.set_property(ItemRole::Number, &PropertyValue::Int(4)).is_none());
        assert!(item.set_property(ItemRole::ToolTip, &PropertyValue::Text("x".into())).is_none());
        assert!(item.set_property(ItemRole::Angles, &PropertyValue::List(vec![1.0])).is_none());
        assert!(!item.is_dirty());
    }

    #[test]
    fn test_unknown_role_reads_none() {
        let item = item(ItemKind::Track);
        assert!(item.property(ItemRole::MediaInfo).is_none());
        assert_eq!(item.property(ItemRole::Position), Some(PropertyValue::Float(0.0)));
    }

    #[test]
    fn test_number_operations() {
        let mut item = item(ItemKind::Zoom);
        assert_eq!(item.operate(ItemOperation::IncreaseNumber, 3), RoleMask::NUMBER);
        assert_eq!(item.operate(ItemOperation::DecreaseNumber, 1), RoleMask::NUMBER);
        assert_eq!(item.number(), 2);
        assert_eq!(item.operate(ItemOperation::UpdateAsHead, 1), RoleMask::empty());
        assert_eq!(item.number(), 2);
    }

    #[test]
    fn test_tooltip() {
        let mut item = item(ItemKind::Focus);
        item.set_property(ItemRole::Start, &PropertyValue::Int(4));
        item.set_property(ItemRole::Value, &PropertyValue::Float(0.25));
        assert_eq!(item.tool_tip(), "Start: 4\nDuration: 0\nFocus: 0.250");
    }

    #[test]
    fn test_save_envelope_and_payload() {
        let mut arm = item(ItemKind::Arm);
        arm.set_property(ItemRole::Angles, &PropertyValue::List(vec![10.0, 20.0]));
        arm.set_property(ItemRole::Tracking, &PropertyValue::Bool(true));
        arm.set_start(5);
        let saved = arm.save();
        assert_eq!(saved["start"], 5);
        assert_eq!(saved["enabled"], true);
        assert_eq!(saved["tracking"], true);
        assert_eq!(saved["angles"], serde_json::json!([10.0, 20.0]));

        let mut restored = item(ItemKind::Arm);
        restored.load(&saved).unwrap();
        assert_eq!(restored.payload(), arm.payload());
        assert_eq!(restored.start(), 5);
    }

    #[test]
    fn test_load_missing_field_leaves_item_untouched() {
        let mut aim = item(ItemKind::Aim);
        aim.set_start(9);
        let document =
            serde_json::json!({ "number": 1, "start": 2, "duration": 3, "enabled": true });
        let err = aim.load(&document).unwrap_err();
        assert!(matches!(err, LoadError::MalformedItem { type_name: "Aim", .. }));
        assert_eq!(aim.start(), 9);
    }

    #[test]
    fn test_load_type_mismatch_fails() {
        let mut zoom = item(ItemKind::Zoom);
        let document = serde_json::json!({
            "number": 1,
            "start": "two",
            "duration": 3,
            "enabled": true,
            "value": 1.0,
        });
        assert!(zoom.load(&document).is_err());
    }

    #[test]
    fn test_editable_properties_vary_by_kind() {
        let zoom = item(ItemKind::Zoom);
        let labels: Vec<_> = zoom.editable_properties().iter().map(|e| e.label).collect();
        assert!(labels.contains(&"Zoom:"));
        let aim = item(ItemKind::Aim);
        assert_eq!(aim.editable_properties().len(), 4);
    }
}
