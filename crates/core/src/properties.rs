//! Type-tagged Notion property values for page creation.
//!
//! The create-page API wants a different JSON shape per property type, so a
//! write path looks up the mapped [`PropertyDescriptor`] for a role and asks
//! this module to wrap the caller's value accordingly.

use serde_json::{json, Map, Value};

use crate::error::CoreError;
use crate::schema::PropertyDescriptor;

/// Wrap a text value for the property's declared type.
///
/// Select-like properties reuse the spelling of a declared option when the
/// value matches one case-insensitively, so `"photo"` lands on `"Photo"`.
pub fn text_value(property: &PropertyDescriptor, value: &str) -> Result<Value, CoreError> {
    use crate::schema::PropertyKind::*;

    let value = value.trim();
    let payload = match property.kind {
        Title => json!({ "title": [{ "text": { "content": value } }] }),
        RichText => json!({ "rich_text": [{ "text": { "content": value } }] }),
        Select => json!({ "select": { "name": canonical_option(property, value) } }),
        MultiSelect => json!({ "multi_select": [{ "name": canonical_option(property, value) }] }),
        Status => json!({ "status": { "name": canonical_option(property, value) } }),
        Url => json!({ "url": value }),
        Date => json!({ "date": { "start": value } }),
        other => {
            return Err(CoreError::Validation(format!(
                "Property '{}' has unsupported type '{other}' for a text value",
                property.name
            )))
        }
    };
    Ok(payload)
}

/// Wrap a date (`YYYY-MM-DD`) for a date-typed property.
pub fn date_value(property: &PropertyDescriptor, start: &str) -> Result<Value, CoreError> {
    match property.kind {
        crate::schema::PropertyKind::Date => Ok(json!({ "date": { "start": start } })),
        other => Err(CoreError::Validation(format!(
            "Property '{}' has type '{other}', expected a date",
            property.name
        ))),
    }
}

/// Attach an externally hosted file to a files-typed property.
///
/// URL-typed properties are accepted as well and receive the bare URL.
pub fn file_value(property: &PropertyDescriptor, name: &str, url: &str) -> Result<Value, CoreError> {
    use crate::schema::PropertyKind::*;

    match property.kind {
        Files => Ok(json!({
            "files": [{
                "type": "external",
                "name": file_name(name, url),
                "external": { "url": url }
            }]
        })),
        Url => Ok(json!({ "url": url })),
        other => Err(CoreError::Validation(format!(
            "Property '{}' has type '{other}', expected files",
            property.name
        ))),
    }
}

/// Assemble the `properties` object of a create-page request.
#[derive(Debug, Default)]
pub struct PropertiesBuilder {
    map: Map<String, Value>,
}

impl PropertiesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, property: &PropertyDescriptor, value: Value) -> &mut Self {
        self.map.insert(property.name.clone(), value);
        self
    }

    pub fn build(self) -> Value {
        Value::Object(self.map)
    }
}

fn canonical_option<'a>(property: &'a PropertyDescriptor, value: &'a str) -> &'a str {
    property
        .options
        .iter()
        .find(|opt| opt.eq_ignore_ascii_case(value))
        .map(String::as_str)
        .unwrap_or(value)
}

/// Notion caps file names at 100 characters; fall back to the URL's last
/// path segment when no name is given.
fn file_name(name: &str, url: &str) -> String {
    let base = if name.trim().is_empty() {
        url.rsplit('/')
            .next()
            .and_then(|seg| seg.split(['?', '#']).next())
            .filter(|seg| !seg.is_empty())
            .unwrap_or("image")
    } else {
        name.trim()
    };
    base.chars().take(100).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::PropertyKind;
    use assert_matches::assert_matches;

    #[test]
    fn select_reuses_declared_option_spelling() {
        let prop = PropertyDescriptor::new("Type", PropertyKind::Select).with_options(["Photo", "Reel"]);

        let value = text_value(&prop, "photo").unwrap();

        assert_eq!(value, json!({ "select": { "name": "Photo" } }));
    }

    #[test]
    fn select_keeps_unknown_option_verbatim() {
        let prop = PropertyDescriptor::new("Platform", PropertyKind::Select);
        let value = text_value(&prop, "Threads").unwrap();
        assert_eq!(value, json!({ "select": { "name": "Threads" } }));
    }

    #[test]
    fn rich_text_and_multi_select_shapes() {
        let text = PropertyDescriptor::new("Platform", PropertyKind::RichText);
        assert_eq!(
            text_value(&text, " TikTok ").unwrap(),
            json!({ "rich_text": [{ "text": { "content": "TikTok" } }] })
        );

        let multi = PropertyDescriptor::new("Platform", PropertyKind::MultiSelect);
        assert_eq!(
            text_value(&multi, "TikTok").unwrap(),
            json!({ "multi_select": [{ "name": "TikTok" }] })
        );
    }

    #[test]
    fn unsupported_text_kind_rejected() {
        let prop = PropertyDescriptor::new("Done", PropertyKind::Checkbox);
        assert_matches!(text_value(&prop, "yes"), Err(CoreError::Validation(_)));
    }

    #[test]
    fn date_requires_date_kind() {
        let date = PropertyDescriptor::new("Publish Date", PropertyKind::Date);
        assert_eq!(
            date_value(&date, "2024-05-01").unwrap(),
            json!({ "date": { "start": "2024-05-01" } })
        );

        let text = PropertyDescriptor::new("Notes", PropertyKind::RichText);
        assert_matches!(date_value(&text, "2024-05-01"), Err(CoreError::Validation(_)));
    }

    #[test]
    fn file_value_names_external_file() {
        let prop = PropertyDescriptor::new("Image", PropertyKind::Files);

        let named = file_value(&prop, "Look1", "http://x/i.png").unwrap();
        assert_eq!(named["files"][0]["name"], "Look1");
        assert_eq!(named["files"][0]["external"]["url"], "http://x/i.png");

        let unnamed = file_value(&prop, "", "http://x/dir/pic.jpg?sig=1").unwrap();
        assert_eq!(unnamed["files"][0]["name"], "pic.jpg");
    }

    #[test]
    fn builder_keys_by_property_name() {
        let title = PropertyDescriptor::new("Name", PropertyKind::Title);
        let mut builder = PropertiesBuilder::new();
        builder.insert(&title, text_value(&title, "Look1").unwrap());

        let built = builder.build();

        assert_eq!(built["Name"]["title"][0]["text"]["content"], "Look1");
    }
}
