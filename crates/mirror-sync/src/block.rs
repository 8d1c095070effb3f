//! Block tree model.
//!
//! A [`Block`] keeps the handful of fields the engine acts on as typed
//! values and carries everything else through untouched, so the snapshot a
//! renderer reads is the API's own representation plus the engine's
//! additions (`children`, `local`).

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Block type tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// `heading_1` ..= `heading_3`.
    Heading(u8),
    Paragraph,
    BulletedListItem,
    NumberedListItem,
    Quote,
    Callout,
    Image,
    File,
    Video,
    Embed,
    Bookmark,
    ColumnList,
    Column,
    Toggle,
    /// Any tag the engine has no special handling for.
    Other(String),
}

impl BlockKind {
    /// Parse a wire tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "heading_1" => Self::Heading(1),
            "heading_2" => Self::Heading(2),
            "heading_3" => Self::Heading(3),
            "paragraph" => Self::Paragraph,
            "bulleted_list_item" => Self::BulletedListItem,
            "numbered_list_item" => Self::NumberedListItem,
            "quote" => Self::Quote,
            "callout" => Self::Callout,
            "image" => Self::Image,
            "file" => Self::File,
            "video" => Self::Video,
            "embed" => Self::Embed,
            "bookmark" => Self::Bookmark,
            "column_list" => Self::ColumnList,
            "column" => Self::Column,
            "toggle" => Self::Toggle,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Wire tag, also the key the type-specific payload lives under.
    #[must_use]
    pub fn tag(&self) -> String {
        match self {
            Self::Heading(level) => format!("heading_{level}"),
            Self::Paragraph => "paragraph".to_owned(),
            Self::BulletedListItem => "bulleted_list_item".to_owned(),
            Self::NumberedListItem => "numbered_list_item".to_owned(),
            Self::Quote => "quote".to_owned(),
            Self::Callout => "callout".to_owned(),
            Self::Image => "image".to_owned(),
            Self::File => "file".to_owned(),
            Self::Video => "video".to_owned(),
            Self::Embed => "embed".to_owned(),
            Self::Bookmark => "bookmark".to_owned(),
            Self::ColumnList => "column_list".to_owned(),
            Self::Column => "column".to_owned(),
            Self::Toggle => "toggle".to_owned(),
            Self::Other(tag) => tag.clone(),
        }
    }

    /// Asset slot name for block types whose file is mirrored locally.
    #[must_use]
    pub fn asset_slot(&self) -> Option<&'static str> {
        match self {
            Self::Image => Some("image"),
            Self::File => Some("file"),
            _ => None,
        }
    }
}

/// One node of a page's content tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Block {
    pub id: String,
    pub kind: BlockKind,
    /// Type-specific content, stored on the wire under the type tag.
    pub payload: Value,
    /// Whether the API reports nested children.
    pub has_children: bool,
    /// Fetched children, in API order.
    pub children: Vec<Block>,
    /// All other top-level fields, passed through.
    pub extra: Map<String, Value>,
}

impl Block {
    /// Remote URL of the block's file, for `image` and `file` blocks.
    pub fn asset_url(&self) -> Option<&str> {
        self.kind.asset_slot()?;
        file_url(&self.payload)
    }

    /// Record the local copy of the block's file in its payload.
    pub fn set_local(&mut self, path: &Path) {
        if let Some(payload) = self.payload.as_object_mut() {
            payload.insert(
                "local".to_owned(),
                Value::String(path.to_string_lossy().into_owned()),
            );
        }
    }

    /// Concatenated plain text of the block's rich text.
    pub fn plain_text(&self) -> String {
        rich_text_plain(self.payload.get("rich_text"))
    }
}

/// URL of a file object: `{"type": "file", "file": {"url": ..}}` for hosted
/// files or `{"type": "external", "external": {"url": ..}}` for links.
pub fn file_url(file: &Value) -> Option<&str> {
    let source = file.get("type")?.as_str()?;
    if source != "file" && source != "external" {
        return None;
    }
    file.get(source)?.get("url")?.as_str()
}

/// Join the `plain_text` of every segment in a rich text array.
pub(crate) fn rich_text_plain(rich_text: Option<&Value>) -> String {
    rich_text
        .and_then(Value::as_array)
        .map(|segments| {
            segments
                .iter()
                .filter_map(|s| s.get("plain_text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default()
}

impl TryFrom<Map<String, Value>> for Block {
    type Error = String;

    fn try_from(mut map: Map<String, Value>) -> Result<Self, Self::Error> {
        let id = match map.remove("id") {
            Some(Value::String(id)) => id,
            _ => return Err("block is missing an id".to_owned()),
        };
        let tag = match map.remove("type") {
            Some(Value::String(tag)) => tag,
            _ => return Err(format!("block {id} is missing a type")),
        };
        let payload = map
            .remove(&tag)
            .unwrap_or_else(|| Value::Object(Map::new()));
        let has_children = map
            .remove("has_children")
            .as_ref()
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let children = match map.remove("children") {
            Some(Value::Array(items)) => items
                .into_iter()
                .map(serde_json::from_value)
                .collect::<Result<Vec<Block>, _>>()
                .map_err(|e| format!("block {id}: {e}"))?,
            _ => Vec::new(),
        };

        Ok(Self {
            id,
            kind: BlockKind::from_tag(&tag),
            payload,
            has_children,
            children,
            extra: map,
        })
    }
}

impl From<Block> for Map<String, Value> {
    fn from(block: Block) -> Self {
        let tag = block.kind.tag();
        let mut map = block.extra;
        map.insert("id".to_owned(), Value::String(block.id));
        map.insert("type".to_owned(), Value::String(tag.clone()));
        map.insert(tag, block.payload);
        map.insert("has_children".to_owned(), Value::Bool(block.has_children));
        if !block.children.is_empty() {
            let children = block
                .children
                .into_iter()
                .map(|child| Value::Object(child.into()))
                .collect();
            map.insert("children".to_owned(), Value::Array(children));
        }
        map
    }
}
