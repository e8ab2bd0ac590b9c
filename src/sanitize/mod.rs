use regex::Regex;
use std::sync::LazyLock;

use crate::wire::ArtifactKind;

/// Which passes to run over a backend response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanitizeMode {
    /// Reasoning spans only; keeps markup, stylesheet and script syntax intact.
    Code,
    /// Reasoning spans, then every char outside the plain-text whitelist.
    Prose,
}

impl From<ArtifactKind> for SanitizeMode {
    fn from(kind: ArtifactKind) -> Self {
        if kind.is_code() {
            SanitizeMode::Code
        } else {
            SanitizeMode::Prose
        }
    }
}

static REASONING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<\s*think\s*>.*?<\s*/\s*think\s*>").expect("static reasoning pattern"));

pub fn sanitize(raw: &str, mode: SanitizeMode) -> String {
    let stripped = strip_reasoning(raw);
    match mode {
        SanitizeMode::Code => stripped.trim().to_string(),
        SanitizeMode::Prose => keep_plain_text(&stripped).trim().to_string(),
    }
}

/// Removes reasoning spans until none is left. A single regex pass is not
/// enough: `<thi<think>x</think>nk>` only becomes a span after the inner one
/// is gone.
pub fn strip_reasoning(raw: &str) -> String {
    let mut current = raw.to_string();
    loop {
        let next = REASONING_RE.replace_all(&current, "");
        if next.len() == current.len() {
            return current;
        }
        current = next.into_owned();
    }
}

fn keep_plain_text(s: &str) -> String {
    s.chars().filter(|c| is_plain_text(*c)).collect()
}

fn is_plain_text(c: char) -> bool {
    c.is_alphanumeric() || c.is_whitespace() || matches!(c, '.' | ',' | '?' | '!' | '\'' | '"' | '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn removes_every_reasoning_span() {
        let raw = "<think>plan</think>Hello <THINK>\nmore\nlines\n</Think> world< think >x</ think >";
        assert_eq!(sanitize(raw, SanitizeMode::Code), "Hello  world");
    }

    #[test]
    fn text_without_spans_is_only_trimmed() {
        assert_eq!(sanitize("  body { color: red; }\n", SanitizeMode::Code), "body { color: red; }");
    }

    #[test]
    fn first_close_tag_ends_the_span() {
        let raw = "<think>a <think>b</think> keep</think>tail";
        assert_eq!(sanitize(raw, SanitizeMode::Code), "keep</think>tail");
    }

    #[test]
    fn unterminated_span_is_left_alone() {
        assert_eq!(sanitize("<think>dangling", SanitizeMode::Code), "<think>dangling");
    }

    #[test]
    fn prose_drops_markup_characters() {
        let raw = "<think>hmm</think> <h1>Fresh & Bright!</h1> Café's \"best\" - 24/7? ";
        assert_eq!(sanitize(raw, SanitizeMode::Prose), "h1Fresh  Bright!h1 Café's \"best\" - 247?");
    }

    #[test]
    fn code_keeps_syntax() {
        let css = "<think>pick colors</think>\n.hero { color: #0a0; }\n@media (max-width: 600px) { a > b {} }";
        assert_eq!(
            sanitize(css, SanitizeMode::Code),
            ".hero { color: #0a0; }\n@media (max-width: 600px) { a > b {} }"
        );
    }

    #[test]
    fn idempotent_across_modes() {
        let samples = [
            "",
            "   ",
            "plain",
            "<think></think>",
            "<thi<think>x</think>nk>hidden</think> shown",
            "a<think>1</think>b<think>2</think>c<think>3</think>d",
            "  <div class=\"x\">Hi!</div>  <think>\n\n</think>  ",
            "émoji 🚀 and tabs\t\there",
        ];
        for s in samples {
            for mode in [SanitizeMode::Code, SanitizeMode::Prose] {
                let once = sanitize(s, mode);
                assert_eq!(sanitize(&once, mode), once, "input {s:?} mode {mode:?}");
            }
        }
    }

    #[test]
    fn nested_formation_is_removed() {
        assert_eq!(sanitize("<thi<think>x</think>nk>hidden</think> shown", SanitizeMode::Code), "shown");
    }

    #[test]
    fn mode_follows_artifact_kind() {
        assert_eq!(SanitizeMode::from(ArtifactKind::Script), SanitizeMode::Code);
        assert_eq!(SanitizeMode::from(ArtifactKind::Prose), SanitizeMode::Prose);
    }

    fn any_mode() -> impl Strategy<Value = SanitizeMode> {
        prop_oneof![Just(SanitizeMode::Code), Just(SanitizeMode::Prose)]
    }

    // Free text mixed with tag fragments, so partial and nested spans show up.
    fn noisy_text() -> impl Strategy<Value = String> {
        prop::collection::vec(
            prop_oneof![
                "[a-zA-Z0-9 .,!?<>/#{}\n\t-]{0,8}",
                Just("<think>".to_string()),
                Just("</think>".to_string()),
                Just("< THINK >".to_string()),
                Just("<thi".to_string()),
                Just("nk>".to_string()),
            ],
            0..12,
        )
        .prop_map(|parts| parts.concat())
    }

    proptest! {
        #[test]
        fn sanitizing_twice_changes_nothing(raw in noisy_text(), mode in any_mode()) {
            let once = sanitize(&raw, mode);
            prop_assert_eq!(sanitize(&once, mode), once);
        }

        #[test]
        fn inserted_reasoning_pairs_are_all_removed(
            segments in prop::collection::vec("[a-zA-Z0-9 .,;:{}()#\n-]{0,12}", 1..6),
            thoughts in prop::collection::vec("[a-zA-Z0-9 \n]{0,12}", 0..6),
        ) {
            let mut raw = String::new();
            for (i, segment) in segments.iter().enumerate() {
                raw.push_str(segment);
                if let Some(thought) = thoughts.get(i) {
                    raw.push_str(&format!("<think>{thought}</think>"));
                }
            }
            let cleaned = sanitize(&raw, SanitizeMode::Code);
            prop_assert!(!cleaned.contains("<think"));
            prop_assert_eq!(cleaned, segments.concat().trim().to_string());
        }
    }
}
