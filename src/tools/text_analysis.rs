//! Text Analysis Tool Implementation

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::{ToolOutput, into_map, parse_args, require, timestamp};
use crate::core::error::ToolError;
use crate::core::registry::{ToolDescriptor, ToolKind, ToolRegistry};

const POSITIVE_WORDS: [&str; 8] = [
    "good", "great", "excellent", "amazing", "wonderful", "love", "like", "happy",
];
const NEGATIVE_WORDS: [&str; 8] = [
    "bad", "terrible", "awful", "hate", "dislike", "sad", "angry", "frustrated",
];

/// Number of leading words kept by the `summary` analysis.
pub const SUMMARY_WORDS: usize = 10;

pub fn register(registry: &mut ToolRegistry) {
    registry.register(ToolDescriptor {
        kind: ToolKind::TextAnalysis,
        name: ToolKind::TextAnalysis.name(),
        title: "Text Analysis",
        description: "Analyze text for sentiment, word count, or summary",
        input_schema: json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "description": "Text to analyze"
                },
                "analysis_type": {
                    "type": "string",
                    "enum": ["sentiment", "word_count", "summary"],
                    "default": "sentiment",
                    "description": "Type of analysis to perform"
                }
            },
            "required": ["text"]
        }),
        invoking: "Analyzing text...",
        invoked: "Analysis completed.",
    });
}

#[derive(Debug, Deserialize)]
struct TextAnalysisArgs {
    text: Option<String>,
    #[serde(alias = "analysisType")]
    analysis_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalysisType {
    #[default]
    Sentiment,
    WordCount,
    Summary,
}

impl AnalysisType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sentiment => "sentiment",
            Self::WordCount => "word_count",
            Self::Summary => "summary",
        }
    }
}

impl FromStr for AnalysisType {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sentiment" => Ok(Self::Sentiment),
            "word_count" => Ok(Self::WordCount),
            "summary" => Ok(Self::Summary),
            other => Err(ToolError::invalid(format!(
                "Unknown analysis type: {other} (expected one of: sentiment, word_count, summary)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Positive => "Positive",
            Self::Negative => "Negative",
            Self::Neutral => "Neutral",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentimentScore {
    pub label: Sentiment,
    pub positive: usize,
    pub negative: usize,
}

/// Keyword sentiment. Each listed word counts once if it appears anywhere in
/// the lowercased text as a substring, so "badger" scores a negative hit and
/// "dislike" scores both "like" and "dislike".
pub fn score_sentiment(text: &str) -> SentimentScore {
    let lower = text.to_lowercase();
    let positive = POSITIVE_WORDS.iter().filter(|w| lower.contains(*w)).count();
    let negative = NEGATIVE_WORDS.iter().filter(|w| lower.contains(*w)).count();

    let label = match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => Sentiment::Positive,
        std::cmp::Ordering::Less => Sentiment::Negative,
        std::cmp::Ordering::Equal => Sentiment::Neutral,
    };
    SentimentScore { label, positive, negative }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// First [`SUMMARY_WORDS`] words joined by single spaces plus `...`, or the
/// original text unchanged when it is short enough. The flag reports
/// truncation.
pub fn summarize(text: &str) -> (String, bool) {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() > SUMMARY_WORDS {
        (format!("{}...", words[..SUMMARY_WORDS].join(" ")), true)
    } else {
        (text.to_string(), false)
    }
}

pub fn run(arguments: &Map<String, Value>) -> Result<ToolOutput, ToolError> {
    let args: TextAnalysisArgs = parse_args(arguments)?;
    let text = require(args.text, "text")?;
    let analysis = match args.analysis_type.as_deref() {
        Some(raw) => raw.parse::<AnalysisType>()?,
        None => AnalysisType::default(),
    };

    let mut output = match analysis {
        AnalysisType::Sentiment => {
            let score = score_sentiment(&text);
            ToolOutput {
                text: format!(
                    "Sentiment Analysis: {} (Positive: {}, Negative: {})",
                    score.label, score.positive, score.negative
                ),
                structured: into_map(json!({
                    "sentiment": score.label.to_string(),
                    "positive_score": score.positive,
                    "negative_score": score.negative,
                })),
            }
        }
        AnalysisType::WordCount => {
            let words = word_count(&text);
            ToolOutput {
                text: format!("Word Count: {words} words"),
                structured: into_map(json!({
                    "word_count": words,
                    "character_count": text.chars().count(),
                })),
            }
        }
        AnalysisType::Summary => {
            let (summary, truncated) = summarize(&text);
            ToolOutput {
                text: format!("Summary: {summary}"),
                structured: into_map(json!({
                    "summary": summary,
                    "original_length": word_count(&text),
                    "truncated": truncated,
                })),
            }
        }
    };

    output
        .structured
        .insert("analysis_type".into(), Value::from(analysis.as_str()));
    output.structured.insert("timestamp".into(), Value::from(timestamp()));
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn positive_sentiment() {
        let score = score_sentiment("I love this, it is wonderful");
        assert_eq!(score, SentimentScore { label: Sentiment::Positive, positive: 2, negative: 0 });
    }

    #[test]
    fn negative_sentiment() {
        let score = score_sentiment("This is terrible and awful");
        assert_eq!(score.label, Sentiment::Negative);
        assert_eq!(score.negative, 2);
    }

    #[test]
    fn neutral_sentiment() {
        assert_eq!(score_sentiment("It is fine").label, Sentiment::Neutral);
    }

    #[test]
    fn matching_is_case_insensitive_substring() {
        assert_eq!(score_sentiment("GREAT").positive, 1);
        // substring hits are kept as-is
        assert_eq!(score_sentiment("a badger").negative, 1);
        let dislike = score_sentiment("I dislike it");
        assert_eq!((dislike.positive, dislike.negative), (1, 1));
        assert_eq!(dislike.label, Sentiment::Neutral);
    }

    #[test]
    fn repeated_keywords_count_once() {
        assert_eq!(score_sentiment("good good good").positive, 1);
    }

    #[test]
    fn counts_whitespace_delimited_words() {
        assert_eq!(word_count("Hello world this is a test"), 6);
        assert_eq!(word_count("  spaced\tout\nwords  "), 3);
        assert_eq!(word_count(""), 0);
    }

    #[test]
    fn summary_truncates_after_ten_words() {
        let text = "one two three four five six seven eight nine ten eleven twelve";
        let (summary, truncated) = summarize(text);
        assert_eq!(summary, "one two three four five six seven eight nine ten...");
        assert!(truncated);
    }

    #[test]
    fn short_summary_returns_original_text() {
        let text = "  short   text  ";
        assert_eq!(summarize(text), (text.to_string(), false));
    }

    #[test]
    fn run_defaults_to_sentiment() {
        let out = run(&args(json!({"text": "happy days"}))).unwrap();
        assert_eq!(out.text, "Sentiment Analysis: Positive (Positive: 1, Negative: 0)");
        assert_eq!(out.structured["analysis_type"], "sentiment");
    }

    #[test]
    fn run_word_count() {
        let out = run(&args(json!({"text": "Hello world this is a test", "analysis_type": "word_count"}))).unwrap();
        assert_eq!(out.text, "Word Count: 6 words");
        assert_eq!(out.structured["word_count"], 6);
        assert_eq!(out.structured["character_count"], 26);
    }

    #[test]
    fn accepts_camel_case_analysis_type() {
        let out = run(&args(json!({"text": "a b", "analysisType": "summary"}))).unwrap();
        assert_eq!(out.text, "Summary: a b");
    }

    #[test]
    fn unknown_analysis_type_fails() {
        let err = run(&args(json!({"text": "x", "analysis_type": "topics"}))).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument(msg) if msg.starts_with("Unknown analysis type: topics")));
    }
}
