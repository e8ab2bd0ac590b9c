//! Reads free-text edit instructions: how long the answer may be, and what
//! kind of content the user is asking for.

use regex::Regex;
use std::sync::LazyLock;

pub const DEFAULT_CODE_BUDGET: u32 = 200;
pub const DEFAULT_TEXT_BUDGET: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationBudget {
    max_tokens: u32,
}

impl GenerationBudget {
    /// Returns `None` for zero; a budget always allows at least one token.
    pub fn new(max_tokens: u32) -> Option<Self> {
        (max_tokens > 0).then_some(Self { max_tokens })
    }

    pub fn max_tokens(self) -> u32 {
        self.max_tokens
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Code,
    Heading,
    Body,
}

static CODE_COUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*(tokens?|words?)?").expect("static code budget pattern"));

static WORD_COUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*words?").expect("static word budget pattern"));

pub fn is_code_category(category: Option<&str>) -> bool {
    category
        .map(|c| {
            let c = c.trim();
            c.eq_ignore_ascii_case("css") || c.eq_ignore_ascii_case("js")
        })
        .unwrap_or(false)
}

pub fn derive_budget(instructions: &str, category: Option<&str>) -> GenerationBudget {
    let (re, default) = if is_code_category(category) {
        (&*CODE_COUNT_RE, DEFAULT_CODE_BUDGET)
    } else {
        (&*WORD_COUNT_RE, DEFAULT_TEXT_BUDGET)
    };

    re.captures(instructions)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .and_then(GenerationBudget::new)
        .unwrap_or(GenerationBudget { max_tokens: default })
}

pub fn is_heading_intent(instructions: &str) -> bool {
    instructions.to_lowercase().contains("heading")
}

pub fn classify(instructions: &str, category: Option<&str>) -> Intent {
    if is_code_category(category) {
        Intent::Code
    } else if is_heading_intent(instructions) {
        Intent::Heading
    } else {
        Intent::Body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_defaults_to_200() {
        assert_eq!(derive_budget("code", Some("css")).max_tokens(), 200);
        assert_eq!(derive_budget("tighten the selectors", Some("CSS")).max_tokens(), 200);
    }

    #[test]
    fn code_takes_first_integer() {
        assert_eq!(derive_budget("150 tokens max", Some("js")).max_tokens(), 150);
        assert_eq!(derive_budget("about 80 words, then 300 tokens", Some("Js")).max_tokens(), 80);
        assert_eq!(derive_budget("use 2 columns", Some("css")).max_tokens(), 2);
    }

    #[test]
    fn text_needs_a_word_count() {
        assert_eq!(derive_budget("Limit to 30 words please", None).max_tokens(), 30);
        assert_eq!(derive_budget("make it 45 words", None).max_tokens(), 45);
        assert_eq!(derive_budget("one WORD: 1 word", Some("Fitness")).max_tokens(), 1);
        assert_eq!(derive_budget("150 tokens max", None).max_tokens(), 50);
        assert_eq!(derive_budget("3 columns and 20 words", None).max_tokens(), 20);
    }

    #[test]
    fn zero_and_overflow_fall_back() {
        assert_eq!(derive_budget("0 words", None).max_tokens(), 50);
        assert_eq!(derive_budget("99999999999 tokens", Some("css")).max_tokens(), 200);
    }

    #[test]
    fn heading_intent() {
        assert!(is_heading_intent("Make this a heading"));
        assert!(is_heading_intent("shorter HEADINGS"));
        assert!(!is_heading_intent("Rewrite the paragraph"));
    }

    #[test]
    fn classify_prefers_code_category() {
        assert_eq!(classify("make the heading red", Some("css")), Intent::Code);
        assert_eq!(classify("make the heading punchier", None), Intent::Heading);
        assert_eq!(classify("friendlier tone", Some("Yoga")), Intent::Body);
    }
}
