//! `t.me` link parsing and construction.

use once_cell::sync::Lazy;
use regex::Regex;
use threadcat_model::{ChatId, MediaRecord};
use tracing::warn;

use crate::remote::ChatSource;

static PRIVATE_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/c/(\d+)").expect("valid private link pattern"));

static PUBLIC_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:t\.me/(?:s/)?|^@)([A-Za-z][A-Za-z0-9_]{3,})")
        .expect("valid public link pattern")
});

/// Chat identified from a link, with the best title known so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedChat {
    pub chat_id: ChatId,
    pub title: String,
}

/// Title given to chats registered from a private link until their first
/// scan fetches the real one.
pub fn pending_title(link_part: &str) -> String {
    format!("Pending chat ({link_part})")
}

/// Parses a private `t.me/c/<digits>` link without any remote call.
pub fn parse_private_link(link: &str) -> Option<ResolvedChat> {
    let digits = PRIVATE_LINK.captures(link)?.get(1)?.as_str();
    let chat_id = ChatId::from_private_link_part(digits).ok()?;
    Some(ResolvedChat {
        chat_id,
        title: pending_title(digits),
    })
}

/// Public handle named by a `t.me/<handle>` link or an `@handle`.
pub fn parse_public_handle(link: &str) -> Option<&str> {
    let handle = PUBLIC_LINK.captures(link.trim())?.get(1)?.as_str();
    (handle != "c" && handle != "joinchat").then_some(handle)
}

/// Resolves a chat link to a chat id.
///
/// Private links resolve offline; public handles go through the remote.
/// Returns `None` for anything unparseable or unknown to the remote.
pub async fn resolve_chat_link(source: &dyn ChatSource, link: &str) -> Option<ResolvedChat> {
    if link.contains("/c/") {
        return parse_private_link(link);
    }
    let handle = parse_public_handle(link)?;
    match source.resolve_handle(handle).await {
        Ok((chat_id, title)) => Some(ResolvedChat { chat_id, title }),
        Err(err) => {
            warn!(handle, error = %err, "public link did not resolve");
            None
        }
    }
}

/// Deep link to the message a record was captured from.
pub fn message_link(record: &MediaRecord) -> String {
    format!(
        "https://t.me/c/{}/{}?thread={}",
        record.chat_id.link_part(),
        record.message_id,
        record.topic_id
    )
}
