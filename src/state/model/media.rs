use std::path::Path;

use super::TimelineModel;
use crate::core::media::{frames_for_millis, MediaInfoLoader};
use crate::state::{ItemId, ItemKind, ItemRole, PropertyValue};

impl TimelineModel {
    /// Probe a media file and attach it to a video or audio item, resizing
    /// the item to the clip's length at the timeline frame rate.
    ///
    /// Fails when the item is not a media item, the file cannot be probed or
    /// the resized item would overlap a neighbour.
    pub fn attach_media(&mut self, id: ItemId, path: &Path, loader: &dyn MediaInfoLoader) -> bool {
        let Some(item) = self.item(id) else {
            tracing::warn!(item = %id, "attach media to unknown item");
            return false;
        };
        let (info, duration) = match item.kind() {
            ItemKind::Video => match loader.load_video(path) {
                Some(info) => {
                    let duration = frames_for_millis(info.duration, self.fps);
                    (PropertyValue::Video(info), duration)
                }
                None => {
                    tracing::warn!(path = %path.display(), "failed to probe video");
                    return false;
                }
            },
            ItemKind::Audio => match loader.load_audio(path, self.fps) {
                Some(info) => {
                    let duration = info.frame_count;
                    (PropertyValue::Audio(info), duration)
                }
                None => {
                    tracing::warn!(path = %path.display(), "failed to probe audio");
                    return false;
                }
            },
            kind => {
                tracing::warn!(item = %id, kind = kind.type_name(), "item does not hold media");
                return false;
            }
        };

        if self.is_frame_range_occupied(id.row(), item.start(), duration, Some(id)) {
            tracing::warn!(item = %id, duration, "media does not fit in the row");
            return false;
        }
        tracing::info!(item = %id, path = %path.display(), duration, "media attached");
        self.set_item_property(id, ItemRole::MediaInfo, &info)
            && self.set_item_property(id, ItemRole::Duration, &PropertyValue::Int(duration))
    }
}
