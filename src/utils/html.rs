// src/utils/html.rs

use std::collections::HashSet;

/// Reduces user-supplied text to plain text.
///
/// Every tag is stripped (`<script>` and `<style>` together with their
/// content), the entities ammonia writes back out are decoded, then
/// surrounding whitespace is trimmed. Names and enrollment ids end up in the
/// admin listing, so markup never reaches storage.
pub fn clean_text(input: &str) -> String {
    let mut text = strip_tags(input);
    // Entity-encoded markup decodes into real tags; strip those too.
    if text.contains('<') {
        text = strip_tags(&text);
    }
    text.trim().to_string()
}

fn strip_tags(input: &str) -> String {
    let cleaned = ammonia::Builder::empty()
        .clean_content_tags(HashSet::from(["script", "style"]))
        .clean(input)
        .to_string();
    decode_text_entities(&cleaned)
}

/// Undoes the escaping ammonia's serializer applies to text nodes.
/// `&amp;` goes last so `&amp;lt;` stays the literal text `&lt;`.
fn decode_text_entities(serialized: &str) -> String {
    serialized
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(clean_text("  Juan Perez "), "Juan Perez");
        assert_eq!(clean_text("A00123456"), "A00123456");
    }

    #[test]
    fn test_markup_is_stripped() {
        assert_eq!(clean_text("<b>Ada</b>"), "Ada");
        assert_eq!(clean_text("<script>alert(1)</script>Ada"), "Ada");
    }

    #[test]
    fn test_special_characters_are_stored_unescaped() {
        assert_eq!(clean_text("Smith & Jones"), "Smith & Jones");
        assert_eq!(clean_text("O'Brien \"Jr\""), "O'Brien \"Jr\"");
        assert_eq!(clean_text("A-1 > B-2"), "A-1 > B-2");
    }

    #[test]
    fn test_encoded_markup_is_stripped() {
        assert_eq!(clean_text("&lt;b&gt;Ada&lt;/b&gt;"), "Ada");
        assert_eq!(clean_text("&amp;lt;b&amp;gt;"), "&lt;b&gt;");
    }
}
