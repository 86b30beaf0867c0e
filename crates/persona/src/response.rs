//! Post-processing of generated replies.

use chatwithyou_core::character::Character;
use regex_lite::Regex;
use std::sync::LazyLock;

/// Phrases in which the model discloses that it is an AI. Longer
/// alternatives come first so they win over their prefixes. English
/// phrases only match as whole words.
const DISCLOSURE_PATTERN: &str = r"(?i)作为一个语言模型|作为语言模型|作为一个AI|作为AI|我是一个AI|我是AI助手|我是人工智能|\b(?:as an AI language model|as a language model|as an AI|I am an AI|I'm an AI)\b";

static DISCLOSURE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(DISCLOSURE_PATTERN).ok());

/// Generic self-introduction prefixes stripped from the start of a reply.
const LEADING_PREFIXES: [&str; 2] = ["我是", "作为"];

/// Punctuation left dangling at the start after a phrase is removed.
const LEADING_SEPARATORS: &[char] = &[',', '，', '、', '。', '.', ':', '：', ';', '；', '!', '！'];

pub const MIN_REPLY_CHARS: usize = 10;
pub const MAX_REPLY_CHARS: usize = 500;
/// Replies longer than this are accepted without a keyword match.
pub const LONG_REPLY_CHARS: usize = 50;

pub struct ResponseProcessor;

impl ResponseProcessor {
    /// Remove AI self-disclosure phrases and role prefixes, then trim.
    pub fn clean(text: &str, character_name: &str) -> String {
        let mut cleaned = text.trim().to_string();

        if let Some(re) = DISCLOSURE.as_ref() {
            cleaned = re.replace_all(&cleaned, "").into_owned();
        }

        let mut rest = trim_leading(&cleaned);

        if !character_name.is_empty() {
            if let Some(after) = rest.strip_prefix(character_name) {
                if let Some(after) = after.strip_prefix(['：', ':']) {
                    rest = trim_leading(after);
                }
            }
        }

        for prefix in LEADING_PREFIXES {
            if let Some(after) = rest.strip_prefix(prefix) {
                rest = trim_leading(after);
                break;
            }
        }

        rest.trim().to_string()
    }

    /// Advisory quality check; callers log a failure and still use the text.
    ///
    /// Lengths are counted in characters.
    pub fn validate(text: &str, character: &Character) -> bool {
        let len = text.chars().count();
        if !(MIN_REPLY_CHARS..=MAX_REPLY_CHARS).contains(&len) {
            return false;
        }

        let trait_match = character
            .personality
            .iter()
            .filter(|t| !t.is_empty())
            .any(|t| text.contains(t.as_str()));

        let quote_match = character
            .quotes
            .iter()
            .flat_map(|q| q.split_whitespace())
            .filter(|w| w.chars().count() > 2)
            .any(|w| text.contains(w));

        let name_match = character
            .name
            .chars()
            .next()
            .is_some_and(|first| text.contains(first));

        trait_match || quote_match || name_match || len > LONG_REPLY_CHARS
    }
}

fn trim_leading(s: &str) -> &str {
    s.trim_start_matches(|c: char| c.is_whitespace() || LEADING_SEPARATORS.contains(&c))
}
