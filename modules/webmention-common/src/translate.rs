// Aggregator payload → canonical Mention.
//
// Payloads follow webmention.io's jf2 shape: `wm-source`, `wm-target`,
// `wm-property`, `wm-received`, `wm-id`, plus the parsed entry fields
// (`published`, `url`, `content`, `author`).

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{Result, WebmentionError};
use crate::types::{Author, Mention, MentionContent, MentionType};
use crate::urls::parse_mention_url;

#[derive(Debug, Deserialize)]
struct AggregatorEntry {
    #[serde(rename = "wm-source")]
    source: Option<String>,
    #[serde(rename = "wm-target")]
    target: Option<String>,
    #[serde(rename = "wm-property")]
    property: Option<String>,
    #[serde(rename = "wm-received")]
    received: Option<String>,
    #[serde(rename = "wm-id")]
    id: Option<serde_json::Value>,
    published: Option<String>,
    url: Option<String>,
    content: Option<serde_json::Value>,
    author: Option<Author>,
}

/// Translate one aggregator entry. Fails with `Validation` when the entry is
/// not an object or lacks a usable `wm-source` / `wm-target`; batch callers
/// skip the entry and keep going.
///
/// `receivedAt` comes from `wm-received`, then `published`, then the current
/// time.
pub fn translate(payload: &serde_json::Value) -> Result<Mention> {
    if !payload.is_object() {
        return Err(WebmentionError::validation(
            "Webmention payload must be a JSON object",
        ));
    }
    let entry = AggregatorEntry::deserialize(payload)
        .map_err(|e| WebmentionError::validation(format!("Malformed webmention payload: {e}")))?;

    let source = required(entry.source, "wm-source")?;
    let target = required(entry.target, "wm-target")?;

    // An entry with neither timestamp is stamped at translation time, so only
    // such entries translate differently on each call.
    let parsed_at = entry.published.as_deref().and_then(parse_timestamp);
    let received_at = entry
        .received
        .as_deref()
        .and_then(parse_timestamp)
        .or(parsed_at)
        .unwrap_or_else(Utc::now);

    let property = entry.property.filter(|p| !p.is_empty());
    let mention_type = property
        .as_deref()
        .map(MentionType::from_property)
        .unwrap_or(MentionType::Generic);

    let mut mention = Mention::new(source, target, mention_type, received_at);
    mention.parsed_at = parsed_at;
    mention.url = entry.url.filter(|u| !u.is_empty());
    mention.id = entry.id.and_then(|id| match id {
        serde_json::Value::String(s) if !s.is_empty() => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    });
    mention.content = entry.content.and_then(content_from_value);
    mention.author = entry.author.and_then(Author::normalized);
    if let Some(property) = property {
        mention
            .properties
            .insert(property, serde_json::Value::String(mention.target.clone()));
    }

    Ok(mention)
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    let value = value.ok_or_else(|| WebmentionError::validation(format!("Missing \"{field}\"")))?;
    parse_mention_url(field, &value)?;
    Ok(value)
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// jf2 content is usually `{ "html": ..., "text": ... }` but plain strings occur.
fn content_from_value(value: serde_json::Value) -> Option<MentionContent> {
    match value {
        serde_json::Value::String(text) => MentionContent::text(text).normalized(),
        serde_json::Value::Object(map) => {
            let field = |key: &str| map.get(key).and_then(|v| v.as_str()).map(String::from);
            MentionContent {
                text: field("text").or_else(|| field("value")),
                html: field("html"),
            }
            .normalized()
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn like_payload() -> serde_json::Value {
        json!({
            "type": "entry",
            "author": {
                "type": "card",
                "name": "Ada",
                "photo": "",
                "url": "https://a.example/"
            },
            "url": "https://a.example/likes/1",
            "published": "2024-03-01T10:00:00+01:00",
            "wm-received": "2024-03-01T09:05:00Z",
            "wm-id": 1769410,
            "wm-source": "https://a.example/likes/1",
            "wm-target": "https://mysite.example/article",
            "like-of": "https://mysite.example/article",
            "wm-property": "like-of",
            "wm-private": false
        })
    }

    #[test]
    fn translates_known_property() {
        let mention = translate(&like_payload()).unwrap();

        assert_eq!(mention.source, "https://a.example/likes/1");
        assert_eq!(mention.target, "https://mysite.example/article");
        assert_eq!(mention.mention_type, MentionType::Like);
        assert_eq!(mention.id.as_deref(), Some("1769410"));
        assert_eq!(mention.url.as_deref(), Some("https://a.example/likes/1"));
        assert_eq!(
            mention.received_at,
            "2024-03-01T09:05:00Z".parse::<DateTime<Utc>>().unwrap()
        );
        assert_eq!(
            mention.parsed_at,
            Some("2024-03-01T09:00:00Z".parse::<DateTime<Utc>>().unwrap())
        );
        assert_eq!(
            mention.properties.get("like-of"),
            Some(&json!("https://mysite.example/article"))
        );
    }

    #[test]
    fn empty_author_fields_are_dropped() {
        let mention = translate(&like_payload()).unwrap();
        let author = mention.author.unwrap();
        assert_eq!(author.name.as_deref(), Some("Ada"));
        assert_eq!(author.photo, None);
    }

    #[test]
    fn unknown_property_maps_to_generic_and_keeps_tag() {
        let mut payload = like_payload();
        payload["wm-property"] = json!("rsvp");
        let mention = translate(&payload).unwrap();

        assert_eq!(mention.mention_type, MentionType::Generic);
        assert_eq!(
            mention.properties.get("rsvp"),
            Some(&json!("https://mysite.example/article"))
        );
    }

    #[test]
    fn absent_property_maps_to_generic_without_extra_field() {
        let mut payload = like_payload();
        payload.as_object_mut().unwrap().remove("wm-property");
        let mention = translate(&payload).unwrap();

        assert_eq!(mention.mention_type, MentionType::Generic);
        assert!(mention.properties.is_empty());
    }

    #[test]
    fn optional_fields_absent_when_missing_or_null() {
        let payload = json!({
            "wm-source": "https://a.example/post",
            "wm-target": "https://mysite.example/article",
            "wm-property": "mention-of",
            "published": null,
            "content": null,
        });
        let mention = translate(&payload).unwrap();

        assert_eq!(mention.parsed_at, None);
        assert_eq!(mention.content, None);
        assert_eq!(mention.author, None);
        assert_eq!(mention.id, None);

        let json = serde_json::to_value(&mention).unwrap();
        assert!(json.get("parsedAt").is_none());
        assert!(json.get("content").is_none());
    }

    #[test]
    fn content_object_and_string_forms() {
        let mut payload = like_payload();
        payload["content"] = json!({
            "content-type": "text/html",
            "value": "Nice post",
            "html": "<p>Nice post</p>",
            "text": "Nice post"
        });
        let mention = translate(&payload).unwrap();
        assert_eq!(
            mention.content,
            Some(MentionContent {
                text: Some("Nice post".into()),
                html: Some("<p>Nice post</p>".into()),
            })
        );

        payload["content"] = json!("Plain reply");
        let mention = translate(&payload).unwrap();
        assert_eq!(mention.content, Some(MentionContent::text("Plain reply")));
    }

    #[test]
    fn missing_source_or_target_is_a_validation_error() {
        let mut payload = like_payload();
        payload.as_object_mut().unwrap().remove("wm-source");
        let err = translate(&payload).unwrap_err();
        assert!(matches!(err, WebmentionError::Validation(_)));
        assert_eq!(err.to_string(), "Missing \"wm-source\"");

        let mut payload = like_payload();
        payload["wm-target"] = json!("not a url");
        assert!(matches!(
            translate(&payload),
            Err(WebmentionError::Validation(_))
        ));

        assert!(matches!(
            translate(&json!(["not", "an", "object"])),
            Err(WebmentionError::Validation(_))
        ));
    }
}
