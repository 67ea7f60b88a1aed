use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::math::latex_to_spoken;

/// Delimiter inserted between extracted markup segments. A sentence
/// boundary gives the synthesizer a natural pause between blocks.
pub const NARRATION_SEGMENT_DELIMITER: &str = ". ";

/// How an embedded-object tag contributes to the spoken narration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EmbeddedTagKind {
    /// Hyperlinks and glossary cross-references: spoken as their display
    /// text, taken from the escaped `text-with-value` attribute.
    LinkLike,
    /// Math expressions: the escaped `math-content-with-value` attribute
    /// holds a JSON object whose `raw_latex` field is rendered to words.
    MathExpression,
    /// Images, videos, tabs, collapsibles: nothing to speak.
    NoSpokenContent,
}

/// The whitelisted lesson RTE tags. Anything else is left alone by the
/// transform pass and text-extracted verbatim.
const EMBEDDED_TAGS: &[(&str, EmbeddedTagKind)] = &[
    ("lesson-link", EmbeddedTagKind::LinkLike),
    ("lesson-glossary", EmbeddedTagKind::LinkLike),
    ("lesson-math", EmbeddedTagKind::MathExpression),
    ("lesson-image", EmbeddedTagKind::NoSpokenContent),
    ("lesson-video", EmbeddedTagKind::NoSpokenContent),
    ("lesson-tabs", EmbeddedTagKind::NoSpokenContent),
    ("lesson-collapsible", EmbeddedTagKind::NoSpokenContent),
];

// One pattern per whitelisted tag, matching the self-closing form and the
// paired form (lazy body so adjacent elements stay separate).
static EMBEDDED_TAG_PATTERNS: Lazy<Vec<(Regex, EmbeddedTagKind)>> = Lazy::new(|| {
    EMBEDDED_TAGS
        .iter()
        .map(|(name, kind)| {
            let pattern = format!(
                r"<{name}\b[^>]*/>|<{name}\b[^>]*>[\s\S]*?</{name}>",
                name = name
            );
            (Regex::new(&pattern).unwrap(), *kind)
        })
        .collect()
});

static TEXT_WITH_VALUE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"text-with-value\s*=\s*"([^"]*)""#).unwrap());
static MATH_CONTENT_WITH_VALUE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"math-content-with-value\s*=\s*"([^"]*)""#).unwrap());

// Block-level boundaries become segment breaks before tags are stripped.
static BLOCK_BOUNDARY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</(?:p|div|li|h[1-6]|blockquote|pre|tr)>|<br\s*/?>").unwrap());
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static ENTITY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"&(#x?[0-9A-Fa-f]+|[A-Za-z]+);").unwrap());

/// Escaped JSON payload of a `math-content-with-value` attribute.
#[derive(Debug, serde::Deserialize)]
struct MathContent {
    raw_latex: String,
}

/// Flatten lesson markup into the plain text that is actually spoken.
///
/// Whitelisted embedded-object tags are first collapsed into plain
/// paragraphs carrying their spoken equivalent (or nothing), then all
/// remaining markup is stripped: block boundaries become segments, each
/// segment is trimmed, empty segments are dropped, and the survivors are
/// joined with [`NARRATION_SEGMENT_DELIMITER`].
pub fn extract_narration_text(markup: &str) -> String {
    let transformed = transform_embedded_tags(markup);
    let with_breaks = BLOCK_BOUNDARY_RE.replace_all(&transformed, "\n");
    let stripped = TAG_RE.replace_all(&with_breaks, "");
    let unescaped = unescape_html(&stripped);

    unescaped
        .split('\n')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(NARRATION_SEGMENT_DELIMITER)
}

/// Replace every whitelisted embedded-object element with a plain
/// paragraph holding its spoken text.
fn transform_embedded_tags(markup: &str) -> String {
    let mut result = markup.to_string();
    for (pattern, kind) in EMBEDDED_TAG_PATTERNS.iter() {
        result = pattern
            .replace_all(&result, |caps: &Captures| {
                let element = &caps[0];
                format!("<p>{}</p>", spoken_text_for_element(element, *kind))
            })
            .into_owned();
    }
    result
}

fn spoken_text_for_element(element: &str, kind: EmbeddedTagKind) -> String {
    match kind {
        EmbeddedTagKind::LinkLike => decode_text_attribute(element).unwrap_or_default(),
        EmbeddedTagKind::MathExpression => decode_math_attribute(element)
            .map(|content| latex_to_spoken(&content.raw_latex))
            .unwrap_or_default(),
        EmbeddedTagKind::NoSpokenContent => String::new(),
    }
}

/// Pull the display text out of an escaped `text-with-value` attribute:
/// HTML-unescape the raw attribute, then JSON-decode the resulting string.
fn decode_text_attribute(element: &str) -> Option<String> {
    let raw = TEXT_WITH_VALUE_RE.captures(element)?.get(1)?.as_str();
    let unescaped = unescape_html(raw);
    match serde_json::from_str::<String>(&unescaped) {
        Ok(text) => Some(text),
        Err(err) => {
            tracing::warn!(
                error = %err,
                attribute = raw,
                "Malformed text-with-value attribute, speaking nothing for element"
            );
            None
        }
    }
}

fn decode_math_attribute(element: &str) -> Option<MathContent> {
    let raw = MATH_CONTENT_WITH_VALUE_RE.captures(element)?.get(1)?.as_str();
    let unescaped = unescape_html(raw);
    match serde_json::from_str::<MathContent>(&unescaped) {
        Ok(content) => Some(content),
        Err(err) => {
            tracing::warn!(
                error = %err,
                attribute = raw,
                "Malformed math-content-with-value attribute, speaking nothing for element"
            );
            None
        }
    }
}

/// Resolve named and numeric HTML entities. Single pass, so doubly-escaped
/// input stays escaped one level down, matching standard unescape semantics.
pub fn unescape_html(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &Captures| {
            let body = &caps[1];
            match body {
                "amp" => "&".to_string(),
                "lt" => "<".to_string(),
                "gt" => ">".to_string(),
                "quot" => "\"".to_string(),
                "apos" => "'".to_string(),
                "nbsp" => " ".to_string(),
                _ => {
                    let decoded = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
                        u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
                    } else if let Some(dec) = body.strip_prefix('#') {
                        dec.parse::<u32>().ok().and_then(char::from_u32)
                    } else {
                        None
                    };
                    decoded
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| caps[0].to_string())
                }
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_link_tag_speaks_display_text() {
        let markup = r#"<p>See <lesson-link text-with-value="&quot;Open Set&quot;" url-with-value="&quot;/topic/open-set&quot;"></lesson-link> for details.</p>"#;
        let text = extract_narration_text(markup);
        assert_eq!(text, "See Open Set. for details.");
    }

    #[test]
    fn test_glossary_tag_speaks_display_text() {
        let markup = r#"<lesson-glossary text-with-value="&quot;prime number&quot;"></lesson-glossary>"#;
        assert_eq!(extract_narration_text(markup), "prime number");
    }

    #[test]
    fn test_math_tag_renders_spoken_expression() {
        let markup = r#"<lesson-math math-content-with-value="{&quot;raw_latex&quot;: &quot;x^2&quot;, &quot;svg_filename&quot;: &quot;&quot;}"></lesson-math>"#;
        let text = extract_narration_text(markup);
        assert!(!text.is_empty());
        assert!(!text.contains('^'));
        assert!(!text.contains('\\'));
        assert_eq!(text, "x squared");
    }

    #[test]
    fn test_media_tags_have_no_spoken_content() {
        let markup = r#"<p>Before.</p><lesson-image filepath-with-value="&quot;img.png&quot;"></lesson-image><lesson-video video_id-with-value="&quot;abc&quot;"></lesson-video><p>After.</p>"#;
        assert_eq!(extract_narration_text(markup), "Before.. After.");
    }

    #[test]
    fn test_tabs_and_collapsible_are_silent() {
        let markup = r#"<lesson-tabs tab_contents-with-value="[]"></lesson-tabs><lesson-collapsible content-with-value="&quot;hidden&quot;"></lesson-collapsible><p>Visible.</p>"#;
        assert_eq!(extract_narration_text(markup), "Visible.");
    }

    #[test]
    fn test_self_closing_embedded_tag() {
        let markup = r#"<p>An image: <lesson-image filepath-with-value="&quot;img.png&quot;" /> done.</p>"#;
        assert_eq!(extract_narration_text(markup), "An image:. done.");
    }

    #[test]
    fn test_unknown_custom_tag_keeps_inner_text() {
        let markup = "<p><custom-widget>still spoken</custom-widget></p>";
        assert_eq!(extract_narration_text(markup), "still spoken");
    }

    #[test]
    fn test_segments_are_trimmed_and_joined() {
        let markup = "<p>  First paragraph  </p><p>Second paragraph</p>";
        assert_eq!(
            extract_narration_text(markup),
            "First paragraph. Second paragraph"
        );
    }

    #[test]
    fn test_empty_paragraphs_are_dropped() {
        let markup = "<p>One</p><p>   </p><p></p><p>Two</p>";
        assert_eq!(extract_narration_text(markup), "One. Two");
    }

    #[test]
    fn test_entities_in_text_are_unescaped() {
        let markup = "<p>Tom &amp; Jerry &#64; home</p>";
        assert_eq!(extract_narration_text(markup), "Tom & Jerry @ home");
    }

    #[test]
    fn test_malformed_attribute_speaks_nothing() {
        let markup = r#"<p>Intro</p><lesson-link text-with-value="not json"></lesson-link>"#;
        assert_eq!(extract_narration_text(markup), "Intro");
    }

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(extract_narration_text("just words"), "just words");
    }

    #[test]
    fn test_unescape_html_numeric_forms() {
        assert_eq!(unescape_html("&#x2F;&#47;"), "//");
        assert_eq!(unescape_html("&quot;hi&quot;"), "\"hi\"");
        assert_eq!(unescape_html("&unknown;"), "&unknown;");
    }
}
