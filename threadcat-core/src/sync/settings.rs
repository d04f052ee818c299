use serde::{Deserialize, Serialize};
use threadcat_model::MediaKind;

use crate::remote::Attachment;

/// Extensions (with leading dot) accepted for document attachments.
pub const DEFAULT_MEDIA_EXTENSIONS: &[&str] = &[
    ".mp4", ".mkv", ".avi", ".mov", ".wmv", ".flv", ".webm", ".jpg", ".jpeg",
    ".png", ".gif", ".bmp", ".webp", ".heic",
];

/// Subset of [`DEFAULT_MEDIA_EXTENSIONS`] classified as video.
pub const DEFAULT_VIDEO_EXTENSIONS: &[&str] =
    &[".mp4", ".mkv", ".avi", ".mov", ".wmv", ".flv", ".webm"];

pub const DEFAULT_TOPIC_LABEL: &str = "General";
pub const DEFAULT_UNKNOWN_TOPIC_PREFIX: &str = "Unknown";
pub const DEFAULT_TOPIC_PAGE_SIZE: usize = 100;

fn to_owned_list(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

/// Knobs shared by the resolver, scanner and reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Name given to the default thread when the remote reports none.
    pub default_topic_label: String,
    /// Prefix of the `"<prefix> (<id>)"` placeholder for unresolved topics.
    pub unknown_topic_prefix: String,
    /// Page size of the remote thread listing.
    pub topic_page_size: usize,
    /// Document extensions treated as media.
    pub media_extensions: Vec<String>,
    /// Document extensions treated as video rather than photo.
    pub video_extensions: Vec<String>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            default_topic_label: DEFAULT_TOPIC_LABEL.to_string(),
            unknown_topic_prefix: DEFAULT_UNKNOWN_TOPIC_PREFIX.to_string(),
            topic_page_size: DEFAULT_TOPIC_PAGE_SIZE,
            media_extensions: to_owned_list(DEFAULT_MEDIA_EXTENSIONS),
            video_extensions: to_owned_list(DEFAULT_VIDEO_EXTENSIONS),
        }
    }
}

impl SyncSettings {
    /// Media kind and extension of an attachment, or `None` for non-media.
    ///
    /// Photos and videos are accepted outright. Documents qualify through a
    /// recognised extension first, then through an `image/` or `video/` MIME
    /// type.
    pub fn classify(&self, attachment: &Attachment) -> Option<(MediaKind, String)> {
        match attachment {
            Attachment::Photo => Some((MediaKind::Photo, String::new())),
            Attachment::Video => Some((MediaKind::Video, String::new())),
            Attachment::Document {
                mime_type,
                extension,
            } => {
                let ext = extension.clone().unwrap_or_default();
                let lowered = ext.to_lowercase();
                if !lowered.is_empty() && contains(&self.media_extensions, &lowered) {
                    let kind = if contains(&self.video_extensions, &lowered) {
                        MediaKind::Video
                    } else {
                        MediaKind::Photo
                    };
                    return Some((kind, ext));
                }
                let mime = mime_type.as_deref().unwrap_or_default();
                if mime.starts_with("video/") {
                    Some((MediaKind::Video, ext))
                } else if mime.starts_with("image/") {
                    Some((MediaKind::Photo, ext))
                } else {
                    None
                }
            }
        }
    }
}

fn contains(list: &[String], ext: &str) -> bool {
    list.iter().any(|candidate| candidate.eq_ignore_ascii_case(ext))
}
