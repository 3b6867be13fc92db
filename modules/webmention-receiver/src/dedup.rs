use webmention_common::Mention;

/// Two records for the same slot are equivalent when every field matches
/// except the processing timestamps, which drift on every re-verification.
pub fn is_equivalent(prev: &Mention, next: &Mention) -> bool {
    // Destructured so a new field on Mention has to be considered here.
    let Mention {
        source,
        target,
        mention_type,
        received_at: _,
        parsed_at: _,
        url,
        content,
        author,
        id,
        properties,
    } = prev;

    *source == next.source
        && *target == next.target
        && *mention_type == next.mention_type
        && *url == next.url
        && *content == next.content
        && *author == next.author
        && *id == next.id
        && *properties == next.properties
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use webmention_common::{Author, MentionContent, MentionType};

    fn reply() -> Mention {
        let mut m = Mention::new(
            "https://a.example/post",
            "https://mysite.example/article",
            MentionType::Reply,
            Utc::now(),
        );
        m.parsed_at = Some(Utc::now());
        m.content = Some(MentionContent::text("Nice"));
        m.author = Some(Author {
            name: Some("Ada".into()),
            photo: None,
            url: None,
        });
        m
    }

    #[test]
    fn reflexive() {
        let m = reply();
        assert!(is_equivalent(&m, &m));
    }

    #[test]
    fn ignores_timestamps() {
        let prev = reply();
        let mut next = prev.clone();
        next.received_at = prev.received_at + Duration::hours(3);
        next.parsed_at = None;
        assert!(is_equivalent(&prev, &next));
    }

    #[test]
    fn sensitive_to_every_other_field() {
        let prev = reply();
        let variants: Vec<Box<dyn Fn(&mut Mention)>> = vec![
            Box::new(|m| m.source = "https://b.example/post".into()),
            Box::new(|m| m.target = "https://mysite.example/other".into()),
            Box::new(|m| m.mention_type = MentionType::Like),
            Box::new(|m| m.url = Some("https://a.example/p/1".into())),
            Box::new(|m| m.content = Some(MentionContent::text("Edited"))),
            Box::new(|m| m.content = None),
            Box::new(|m| m.author = None),
            Box::new(|m| m.id = Some("99".into())),
            Box::new(|m| {
                m.properties
                    .insert("in-reply-to".into(), serde_json::json!(m.target.clone()));
            }),
        ];

        for (i, mutate) in variants.iter().enumerate() {
            let mut next = prev.clone();
            mutate(&mut next);
            assert!(!is_equivalent(&prev, &next), "variant {i} should differ");
        }
    }
}
