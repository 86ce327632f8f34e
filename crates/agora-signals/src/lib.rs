//! Quality-signal detection over free text
//!
//! Stateless keyword/regex classifiers that decide which bonus rules a post
//! or comment triggers. Everything here is pure; persistence of the awards
//! happens in the ledger crate.

#![deny(unsafe_code)]

use lazy_static::lazy_static;
use regex::Regex;

/// Keywords signalling timely, news-shaped content
const NEWS_KEYWORDS: &[&str] = &[
    "breaking",
    "just announced",
    "just released",
    "latest",
    "today",
    "this morning",
    "this week",
    "yesterday",
    "hours ago",
    "minutes ago",
    "report says",
    "according to",
    "sources say",
    "officially",
    "launches",
    "unveils",
    "reveals",
    "confirms",
];

/// Markers of the recommended news post template
const NEWS_TEMPLATE_MARKERS: &[&str] = &["\u{1F4F0}", "\u{1F4A1}", "\u{1F52E}", "\u{2753}"];

const CONTRARIAN_KEYWORDS: &[&str] = &[
    "however",
    "disagree",
    "contrarian",
    "unpopular opinion",
    "on the other hand",
    "counter-argument",
    "devil's advocate",
    "overblown",
    "overhyped",
    "underestimated",
    "overlooked",
    "i'd push back",
    "the opposite",
    "against the consensus",
    "most people miss",
    "what everyone gets wrong",
];

const PREDICTION_KEYWORDS: &[&str] = &[
    "i predict",
    "my prediction",
    "will likely",
    "expect to see",
    "by 2025",
    "by 2026",
    "by 2027",
    "in the next",
    "within months",
    "within weeks",
    "odds are",
    "probability",
    "forecast",
    "will reach",
    "will surpass",
    "\u{1F52E}",
];

lazy_static! {
    static ref DATA_PATTERNS: Vec<Regex> = [
        r"\d+(\.\d+)?%",
        r"\$[\d,.]+[BMK]?",
        r"Q[1-4]\s+\d{4}",
        r"\d{4}\s+(revenue|earnings|profit|growth|GDP|CPI|inflation)",
        r"YoY|QoQ|MoM",
        r"(billion|million|trillion)",
        r"market cap",
        r"\d+x\s+",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){}", p)).expect("static data pattern"))
    .collect();
    static ref CROSS_TOPIC_PATTERNS: Vec<Regex> = [
        r"as I mentioned in",
        r"related to .* channel",
        r"similar to the .* discussion",
        r"connects to",
        r"this ties into",
        r"cross-posting",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){}", p)).expect("static cross-topic pattern"))
    .collect();
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    let lower = text.to_lowercase();
    keywords.iter().any(|kw| lower.contains(kw))
}

/// Timely news language anywhere in the text.
pub fn has_news_keywords(text: &str) -> bool {
    contains_any(text, NEWS_KEYWORDS)
}

/// Whether the text follows the news template: at least 3 of the 4 section
/// markers present.
pub fn has_news_template(text: &str) -> bool {
    NEWS_TEMPLATE_MARKERS
        .iter()
        .filter(|m| text.contains(*m))
        .count()
        >= 3
}

/// Quantitative backing: percentages, dollar amounts, quarters, period
/// comparisons, magnitude words.
pub fn has_data_patterns(text: &str) -> bool {
    DATA_PATTERNS.iter().any(|p| p.is_match(text))
}

/// Pushback against the prevailing take.
pub fn has_contrarian_signals(text: &str) -> bool {
    contains_any(text, CONTRARIAN_KEYWORDS)
}

/// A forward-looking claim.
pub fn has_prediction(text: &str) -> bool {
    contains_any(text, PREDICTION_KEYWORDS)
}

/// A reference linking this comment to another topic or discussion.
pub fn has_cross_topic_reference(text: &str) -> bool {
    CROSS_TOPIC_PATTERNS.iter().any(|p| p.is_match(text))
}

/// Truncate `text` to at most `limit` characters, appending an ellipsis when
/// anything was cut. Operates on character boundaries, never mid-codepoint.
pub fn truncate_excerpt(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut out: String = text.chars().take(limit).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_news_keywords() {
        assert!(has_news_keywords("BREAKING: model weights leaked"));
        assert!(has_news_keywords("the company officially confirms the deal"));
        assert!(!has_news_keywords("a quiet reflection on type systems"));
    }

    #[test]
    fn test_news_template_threshold() {
        // three of four markers is enough
        assert!(has_news_template("\u{1F4F0} what \u{1F4A1} why \u{2753} open question"));
        assert!(has_news_template(
            "\u{1F4F0} a \u{1F4A1} b \u{1F52E} c \u{2753} d"
        ));
        assert!(!has_news_template("\u{1F4F0} only \u{1F4A1} two markers"));
    }

    #[test]
    fn test_data_patterns() {
        assert!(has_data_patterns("revenue grew 12.5% YoY"));
        assert!(has_data_patterns("a $3.2B raise"));
        assert!(has_data_patterns("Q3 2025 guidance"));
        assert!(has_data_patterns("two billion users"));
        assert!(!has_data_patterns("no numbers here at all"));
    }

    #[test]
    fn test_contrarian_and_prediction() {
        assert!(has_contrarian_signals("Unpopular opinion: this is overhyped"));
        assert!(has_prediction("I predict this will reach parity by 2026"));
        assert!(has_prediction("\u{1F52E} calling it now"));
        assert!(!has_prediction("a summary of what happened"));
    }

    #[test]
    fn test_cross_topic() {
        assert!(has_cross_topic_reference("As I mentioned in the infra thread"));
        assert!(has_cross_topic_reference("this ties into the earlier point"));
        assert!(!has_cross_topic_reference("standalone remark"));
    }

    #[test]
    fn test_truncate_excerpt() {
        assert_eq!(truncate_excerpt("short", 300), "short");
        let long = "x".repeat(305);
        let cut = truncate_excerpt(&long, 300);
        assert_eq!(cut.chars().count(), 303);
        assert!(cut.ends_with("..."));
        // multibyte safety
        let emoji = "\u{1F52E}".repeat(10);
        assert_eq!(truncate_excerpt(&emoji, 4).chars().count(), 7);
    }
}
