//! Typed access to database row properties.
//!
//! Rows are kept as raw JSON in snapshots; these helpers read a property by
//! name and expected kind. A missing property or a kind mismatch is `None`,
//! never an error.

use serde_json::Value;

use crate::block::rich_text_plain;

/// Property kinds with typed accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    Title,
    RichText,
    Select,
    MultiSelect,
    Status,
    Files,
    Date,
    Url,
    People,
    Number,
    Checkbox,
}

impl PropertyKind {
    /// Wire tag of the kind.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::RichText => "rich_text",
            Self::Select => "select",
            Self::MultiSelect => "multi_select",
            Self::Status => "status",
            Self::Files => "files",
            Self::Date => "date",
            Self::Url => "url",
            Self::People => "people",
            Self::Number => "number",
            Self::Checkbox => "checkbox",
        }
    }
}

/// A decoded property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Title and rich text, as plain text.
    Text(String),
    /// Select and status option name.
    Choice(Option<String>),
    MultiSelect(Vec<String>),
    Files(Vec<FileEntry>),
    Date(Option<DateRange>),
    Url(Option<String>),
    /// Person names, or ids for people without a visible name.
    People(Vec<String>),
    Number(Option<f64>),
    Checkbox(bool),
}

/// One entry of a files property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub url: Option<String>,
    /// Local copy, once the asset cache has mirrored it.
    pub local: Option<String>,
}

/// Date or date range as sent by the API (ISO 8601 date or datetime).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    pub start: String,
    pub end: Option<String>,
}

/// Read property `name` of `row` as `kind`.
pub fn property(row: &Value, name: &str, kind: PropertyKind) -> Option<PropertyValue> {
    let prop = row.get("properties")?.get(name)?;
    if prop.get("type")?.as_str()? != kind.tag() {
        return None;
    }
    let body = prop.get(kind.tag()).unwrap_or(&Value::Null);

    Some(match kind {
        PropertyKind::Title | PropertyKind::RichText => {
            PropertyValue::Text(rich_text_plain(Some(body)))
        }
        PropertyKind::Select | PropertyKind::Status => PropertyValue::Choice(option_name(body)),
        PropertyKind::MultiSelect => PropertyValue::MultiSelect(
            body.as_array()
                .map(|options| options.iter().filter_map(option_name).collect())
                .unwrap_or_default(),
        ),
        PropertyKind::Files => PropertyValue::Files(
            body.as_array()
                .map(|files| files.iter().map(file_entry).collect())
                .unwrap_or_default(),
        ),
        PropertyKind::Date => PropertyValue::Date(date_range(body)),
        PropertyKind::Url => PropertyValue::Url(body.as_str().map(str::to_owned)),
        PropertyKind::People => PropertyValue::People(
            body.as_array()
                .map(|people| people.iter().filter_map(person).collect())
                .unwrap_or_default(),
        ),
        PropertyKind::Number => PropertyValue::Number(body.as_f64()),
        PropertyKind::Checkbox => PropertyValue::Checkbox(body.as_bool().unwrap_or(false)),
    })
}

/// Plain text of the row's title property, whatever it is named.
pub fn title(row: &Value) -> Option<String> {
    let properties = row.get("properties")?.as_object()?;
    properties
        .keys()
        .find_map(|name| match property(row, name, PropertyKind::Title)? {
            PropertyValue::Text(text) => Some(text),
            _ => None,
        })
}

/// Mutable entries of a files property, or `None` for other kinds.
pub(crate) fn files_mut(prop: &mut Value) -> Option<&mut Vec<Value>> {
    if prop.get("type")?.as_str()? != PropertyKind::Files.tag() {
        return None;
    }
    prop.get_mut(PropertyKind::Files.tag())?.as_array_mut()
}

fn option_name(option: &Value) -> Option<String> {
    option.get("name")?.as_str().map(str::to_owned)
}

fn file_entry(file: &Value) -> FileEntry {
    let text = |key: &str| file.get(key).and_then(Value::as_str).map(str::to_owned);
    FileEntry {
        name: text("name").unwrap_or_default(),
        url: crate::block::file_url(file).map(str::to_owned),
        local: text("local"),
    }
}

fn date_range(date: &Value) -> Option<DateRange> {
    Some(DateRange {
        start: date.get("start")?.as_str()?.to_owned(),
        end: date.get("end").and_then(Value::as_str).map(str::to_owned),
    })
}

fn person(user: &Value) -> Option<String> {
    user.get("name")
        .and_then(Value::as_str)
        .or_else(|| user.get("id").and_then(Value::as_str))
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn row() -> Value {
        json!({
            "id": "r1",
            "properties": {
                "Name": {"id": "title", "type": "title", "title": [{"plain_text": "Launch "}, {"plain_text": "post"}]},
                "Summary": {"type": "rich_text", "rich_text": [{"plain_text": "Short"}]},
                "Category": {"type": "select", "select": {"name": "News"}},
                "Stage": {"type": "status", "status": {"name": "Done"}},
                "Empty": {"type": "select", "select": null},
                "Tags": {"type": "multi_select", "multi_select": [{"name": "a"}, {"name": "b"}]},
                "Attachments": {"type": "files", "files": [
                    {"name": "brief.pdf", "type": "file", "file": {"url": "https://files/brief.pdf"}, "local": "assets/brief.pdf"},
                    {"name": "link", "type": "external", "external": {"url": "https://cdn/x.png"}}
                ]},
                "Published": {"type": "date", "date": {"start": "2024-03-01", "end": null}},
                "Link": {"type": "url", "url": "https://example.com"},
                "Authors": {"type": "people", "people": [{"id": "u1", "name": "Ada"}, {"id": "u2"}]},
                "Score": {"type": "number", "number": 4.5},
                "Featured": {"type": "checkbox", "checkbox": true}
            }
        })
    }

    #[test]
    fn test_text_kinds() {
        let row = row();
        assert_eq!(
            property(&row, "Name", PropertyKind::Title),
            Some(PropertyValue::Text("Launch post".to_owned()))
        );
        assert_eq!(
            property(&row, "Summary", PropertyKind::RichText),
            Some(PropertyValue::Text("Short".to_owned()))
        );
    }

    #[test]
    fn test_option_kinds() {
        let row = row();
        assert_eq!(
            property(&row, "Category", PropertyKind::Select),
            Some(PropertyValue::Choice(Some("News".to_owned())))
        );
        assert_eq!(
            property(&row, "Stage", PropertyKind::Status),
            Some(PropertyValue::Choice(Some("Done".to_owned())))
        );
        assert_eq!(
            property(&row, "Empty", PropertyKind::Select),
            Some(PropertyValue::Choice(None))
        );
        assert_eq!(
            property(&row, "Tags", PropertyKind::MultiSelect),
            Some(PropertyValue::MultiSelect(vec!["a".to_owned(), "b".to_owned()]))
        );
    }

    #[test]
    fn test_files() {
        let Some(PropertyValue::Files(files)) = property(&row(), "Attachments", PropertyKind::Files)
        else {
            panic!("expected files");
        };
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].url.as_deref(), Some("https://files/brief.pdf"));
        assert_eq!(files[0].local.as_deref(), Some("assets/brief.pdf"));
        assert_eq!(files[1].name, "link");
        assert_eq!(files[1].local, None);
    }

    #[test]
    fn test_scalar_kinds() {
        let row = row();
        assert_eq!(
            property(&row, "Published", PropertyKind::Date),
            Some(PropertyValue::Date(Some(DateRange {
                start: "2024-03-01".to_owned(),
                end: None
            })))
        );
        assert_eq!(
            property(&row, "Link", PropertyKind::Url),
            Some(PropertyValue::Url(Some("https://example.com".to_owned())))
        );
        assert_eq!(
            property(&row, "Authors", PropertyKind::People),
            Some(PropertyValue::People(vec!["Ada".to_owned(), "u2".to_owned()]))
        );
        assert_eq!(
            property(&row, "Score", PropertyKind::Number),
            Some(PropertyValue::Number(Some(4.5)))
        );
        assert_eq!(
            property(&row, "Featured", PropertyKind::Checkbox),
            Some(PropertyValue::Checkbox(true))
        );
    }

    #[test]
    fn test_missing_or_mismatched_is_none() {
        let row = row();
        assert_eq!(property(&row, "Nope", PropertyKind::Title), None);
        assert_eq!(property(&row, "Score", PropertyKind::Checkbox), None);
        assert_eq!(property(&json!({"id": "r"}), "Name", PropertyKind::Title), None);
    }

    #[test]
    fn test_title_finds_title_property() {
        assert_eq!(title(&row()).as_deref(), Some("Launch post"));
        assert_eq!(title(&json!({"properties": {}})), None);
    }

    #[test]
    fn test_files_mut_only_for_files() {
        let mut row = row();
        let props = row["properties"].as_object_mut().unwrap();
        assert_eq!(files_mut(props.get_mut("Attachments").unwrap()).map(|f| f.len()), Some(2));
        assert!(files_mut(props.get_mut("Name").unwrap()).is_none());
    }
}
