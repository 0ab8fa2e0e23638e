//! Kind-specific item data.

use serde::{Deserialize, Serialize};

use super::{ItemKind, ItemRole, PropertyValue, RoleMask};
use crate::core::media::{AudioInfo, VideoInfo};

/// Joint angles of a robot arm pose.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArmPayload {
    /// One angle per joint, in degrees
    pub angles: Vec<f64>,
    /// Whether the arm keeps tracking the aim target
    pub tracking: bool,
}

/// Camera aim target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AimPayload {
    /// World position `[x, y, z]`
    pub position: [f64; 3],
}

/// Position along the camera rail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackPayload {
    pub position: f64,
}

/// Scalar keyframe value, shared by focus and zoom.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValuePayload {
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoPayload {
    pub media_info: VideoInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioPayload {
    pub media_info: AudioInfo,
}

/// Data carried by an item on top of its placement.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemPayload {
    Arm(ArmPayload),
    Track(TrackPayload),
    Aim(AimPayload),
    Video(VideoPayload),
    Zoom(ValuePayload),
    Focus(ValuePayload),
    Audio(AudioPayload),
}

impl ItemPayload {
    /// Default payload for a kind.
    pub fn new(kind: ItemKind) -> Self {
        match kind {
            ItemKind::Arm => ItemPayload::Arm(ArmPayload::default()),
            ItemKind::Track => ItemPayload::Track(TrackPayload::default()),
            ItemKind::Aim => ItemPayload::Aim(AimPayload::default()),
            ItemKind::Video => ItemPayload::Video(VideoPayload::default()),
            ItemKind::Zoom => ItemPayload::Zoom(ValuePayload::default()),
            ItemKind::Focus => ItemPayload::Focus(ValuePayload::default()),
            ItemKind::Audio => ItemPayload::Audio(AudioPayload::default()),
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            ItemPayload::Arm(_) => ItemKind::Arm,
            ItemPayload::Track(_) => ItemKind::Track,
            ItemPayload::Aim(_) => ItemKind::Aim,
            ItemPayload::Video(_) => ItemKind::Video,
            ItemPayload::Zoom(_) => ItemKind::Zoom,
            ItemPayload::Focus(_) => ItemKind::Focus,
            ItemPayload::Audio(_) => ItemKind::Audio,
        }
    }

    /// Roles this payload answers to.
    pub fn roles(&self) -> RoleMask {
        match self {
            ItemPayload::Arm(_) => RoleMask::ANGLES | RoleMask::TRACKING,
            ItemPayload::Track(_) | ItemPayload::Aim(_) => RoleMask::POSITION,
            ItemPayload::Zoom(_) | ItemPayload::Focus(_) => RoleMask::VALUE,
            ItemPayload::Video(_) | ItemPayload::Audio(_) => RoleMask::MEDIA_INFO | RoleMask::PATH,
        }
    }

    pub(crate) fn property(&self, role: ItemRole) -> Option<PropertyValue> {
        match (self, role) {
            (ItemPayload::Arm(arm), ItemRole::Angles) => {
                Some(PropertyValue::List(arm.angles.clone()))
            }
            (ItemPayload::Arm(arm), ItemRole::Tracking) => Some(PropertyValue::Bool(arm.tracking)),
            (ItemPayload::Aim(aim), ItemRole::Position) => Some(PropertyValue::Vec3(aim.position)),
            (ItemPayload::Track(track), ItemRole::Position) => {
                Some(PropertyValue::Float(track.position))
            }
            (ItemPayload::Zoom(zoom), ItemRole::Value) => Some(PropertyValue::Float(zoom.value)),
            (ItemPayload::Focus(focus), ItemRole::Value) => Some(PropertyValue::Float(focus.value)),
            (ItemPayload::Video(video), ItemRole::MediaInfo) => {
                Some(PropertyValue::Video(video.media_info.clone()))
            }
            (ItemPayload::Video(video), ItemRole::Path) => {
                Some(PropertyValue::Text(video.media_info.path.clone()))
            }
            (ItemPayload::Audio(audio), ItemRole::MediaInfo) => {
                Some(PropertyValue::Audio(audio.media_info.clone()))
            }
            (ItemPayload::Audio(audio), ItemRole::Path) => {
                Some(PropertyValue::Text(audio.media_info.path.clone()))
            }
            _ => None,
        }
    }

    /// Apply a payload property. `None` when the role does not belong to this
    /// kind or the value has the wrong shape; otherwise the changed roles.
    pub(crate) fn set_property(
        &mut self,
        role: ItemRole,
        value: &PropertyValue,
    ) -> Option<RoleMask> {
        match (self, role) {
            (ItemPayload::Arm(arm), ItemRole::Angles) => {
                let angles = value.as_list()?;
                Some(replace(&mut arm.angles, angles.to_vec(), RoleMask::ANGLES))
            }
            (ItemPayload::Arm(arm), ItemRole::Tracking) => {
                Some(replace(&mut arm.tracking, value.as_bool()?, RoleMask::TRACKING))
            }
            (ItemPayload::Aim(aim), ItemRole::Position) => {
                Some(replace(&mut aim.position, value.as_vec3()?, RoleMask::POSITION))
            }
            (ItemPayload::Track(track), ItemRole::Position) => {
                Some(replace(&mut track.position, value.as_f64()?, RoleMask::POSITION))
            }
            (ItemPayload::Zoom(keyframe) | ItemPayload::Focus(keyframe), ItemRole::Value) => {
                Some(replace(
                    &mut keyframe.value,
                    value.as_f64()?,
                    RoleMask::VALUE | RoleMask::TOOL_TIP,
                ))
            }
            (ItemPayload::Video(video), ItemRole::MediaInfo) => {
                let PropertyValue::Video(info) = value else {
                    return None;
                };
                video.media_info = info.clone();
                Some(RoleMask::MEDIA_INFO | RoleMask::TOOL_TIP)
            }
            (ItemPayload::Audio(audio), ItemRole::MediaInfo) => {
                let PropertyValue::Audio(info) = value else {
                    return None;
                };
                audio.media_info = info.clone();
                Some(RoleMask::MEDIA_INFO | RoleMask::TOOL_TIP)
            }
            (ItemPayload::Video(video), ItemRole::Path) => Some(replace(
                &mut video.media_info.path,
                value.as_text()?.to_string(),
                RoleMask::MEDIA_INFO | RoleMask::PATH | RoleMask::TOOL_TIP,
            )),
            (ItemPayload::Audio(audio), ItemRole::Path) => Some(replace(
                &mut audio.media_info.path,
                value.as_text()?.to_string(),
                RoleMask::MEDIA_INFO | RoleMask::PATH | RoleMask::TOOL_TIP,
            )),
            _ => None,
        }
    }

    /// Extra tooltip lines for this kind.
    pub(crate) fn tool_tip_detail(&self) -> Option<String> {
        match self {
            ItemPayload::Zoom(zoom) => Some(format!("Zoom: {:.3}", zoom.value)),
            ItemPayload::Focus(focus) => Some(format!("Focus: {:.3}", focus.value)),
            ItemPayload::Video(video) => Some(video.media_info.info_string()),
            ItemPayload::Audio(audio) => Some(audio.media_info.info_string()),
            ItemPayload::Arm(_) | ItemPayload::Track(_) | ItemPayload::Aim(_) => None,
        }
    }

    pub(crate) fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            ItemPayload::Arm(data) => serde_json::to_value(data),
            ItemPayload::Track(data) => serde_json::to_value(data),
            ItemPayload::Aim(data) => serde_json::to_value(data),
            ItemPayload::Video(data) => serde_json::to_value(data),
            ItemPayload::Zoom(data) | ItemPayload::Focus(data) => serde_json::to_value(data),
            ItemPayload::Audio(data) => serde_json::to_value(data),
        }
    }

    /// Decode the payload of `kind` from an item document.
    pub(crate) fn from_json(kind: ItemKind, value: &serde_json::Value) -> serde_json::Result<Self> {
        Ok(match kind {
            ItemKind::Arm => ItemPayload::Arm(ArmPayload::deserialize(value)?),
            ItemKind::Track => ItemPayload::Track(TrackPayload::deserialize(value)?),
            ItemKind::Aim => ItemPayload::Aim(AimPayload::deserialize(value)?),
            ItemKind::Video => ItemPayload::Video(VideoPayload::deserialize(value)?),
            ItemKind::Zoom => ItemPayload::Zoom(ValuePayload::deserialize(value)?),
            ItemKind::Focus => ItemPayload::Focus(ValuePayload::deserialize(value)?),
            ItemKind::Audio => ItemPayload::Audio(AudioPayload::deserialize(value)?),
        })
    }
}

/// Store `value` in `slot`, reporting `mask` if it changed and nothing otherwise.
fn replace<T: PartialEq>(slot: &mut T, value: T, mask: RoleMask) -> RoleMask {
    if *slot == value {
        return RoleMask::empty();
    }
    *slot = value;
    mask
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_payload_reports_tooltip() {
        let mut payload = ItemPayload::new(ItemKind::Zoom);
        let changed = payload.set_property(ItemRole::Value, &PropertyValue::Float(1.5));
        assert_eq!(changed, Some(RoleMask::VALUE | RoleMask::TOOL_TIP));
        assert_eq!(payload.tool_tip_detail().as_deref(), Some("Zoom: 1.500"));

        let unchanged = payload.set_property(ItemRole::Value, &PropertyValue::Float(1.5));
        assert_eq!(unchanged, Some(RoleMask::empty()));
    }

    #[test]
    fn test_foreign_role_is_rejected() {
        let mut payload = ItemPayload::new(ItemKind::Aim);
        assert!(payload.set_property(ItemRole::Value, &PropertyValue::Float(1.0)).is_none());
        assert!(payload.property(ItemRole::Tracking).is_none());
    }

    #[test]
    fn test_wrong_value_shape_is_rejected() {
        let mut payload = ItemPayload::new(ItemKind::Arm);
        assert!(payload.set_property(ItemRole::Tracking, &PropertyValue::Float(1.0)).is_none());
        assert!(payload.set_property(ItemRole::Angles, &PropertyValue::Bool(true)).is_none());
    }

    #[test]
    fn test_media_path_updates_info() {
        let mut payload = ItemPayload::new(ItemKind::Audio);
        let changed = payload.set_property(ItemRole::Path, &PropertyValue::Text("a.wav".into()));
        assert!(changed.unwrap().contains(RoleMask::PATH | RoleMask::MEDIA_INFO));
        match payload.property(ItemRole::MediaInfo) {
            Some(PropertyValue::Audio(info)) => assert_eq!(info.path, "a.wav"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_payload_json_by_kind() {
        let payload = ItemPayload::Aim(AimPayload {
            position: [1.0, 2.0, 3.0],
        });
        let json = payload.to_json().unwrap();
        assert_eq!(json, serde_json::json!({ "position": [1.0, 2.0, 3.0] }));
        assert_eq!(ItemPayload::from_json(ItemKind::Aim, &json).unwrap(), payload);
        assert!(ItemPayload::from_json(ItemKind::Arm, &json).is_err());
    }
}
