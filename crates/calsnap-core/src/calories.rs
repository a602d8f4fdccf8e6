//! Calorie figure extraction from OCR text.
//!
//! Orchestration only sees the [`CalorieParser`] trait. The shipped parser
//! understands the Japanese "推定消費カロリー ... kcal" label; other phrasings,
//! units, or locales are added as further parsers and combined with
//! [`ChainedCalorieParser`]. Text that no parser recognises yields `None`, which
//! callers treat as "no signal yet" rather than an error.

use regex::Regex;
use std::fmt::Debug;

use crate::error::{AppError, AppResult};

/// Label, any non-digit run, the figure, optional whitespace, then the unit.
///
/// The figure is ASCII or full-width digits only; `\d` would also admit other
/// Unicode digit scripts that `parse_figure` cannot read.
pub const ESTIMATED_BURN_JA_PATTERN: &str = r"(?i)推定消費カロリー\D*?([0-9０-９.．]+)\s*kcal";

pub trait CalorieParser: Send + Sync + Debug {
    /// Parser identifier, used in logs.
    fn name(&self) -> &str;

    /// Return the calorie figure found in `text`, if any.
    fn parse(&self, text: &str) -> Option<f64>;
}

/// Regex-driven parser. Capture group 1 must hold the numeric figure.
#[derive(Debug, Clone)]
pub struct PatternCalorieParser {
    name: String,
    regex: Regex,
}

impl PatternCalorieParser {
    pub fn new(name: impl Into<String>, pattern: &str) -> AppResult<Self> {
        let regex = Regex::new(pattern)
            .map_err(|e| AppError::Config(format!("invalid calorie pattern: {}", e)))?;
        if regex.captures_len() < 2 {
            return Err(AppError::Config(
                "calorie pattern must capture the numeric figure in group 1".to_string(),
            ));
        }
        Ok(Self {
            name: name.into(),
            regex,
        })
    }

    /// Parser for "推定消費カロリー ... kcal" as printed by the fitness app.
    pub fn estimated_burn_ja() -> Self {
        Self {
            name: "estimated_burn_ja".to_string(),
            regex: Regex::new(ESTIMATED_BURN_JA_PATTERN).expect("static pattern compiles"),
        }
    }
}

impl CalorieParser for PatternCalorieParser {
    fn name(&self) -> &str {
        &self.name
    }

    fn parse(&self, text: &str) -> Option<f64> {
        let captured = self.regex.captures(text)?.get(1)?.as_str();
        let value = parse_figure(captured);
        if value.is_none() {
            tracing::warn!(
                parser = %self.name,
                figure = %captured,
                "Matched calorie label but the figure is not a number"
            );
        }
        value
    }
}

/// Runs parsers in order and returns the first figure found.
#[derive(Debug, Default)]
pub struct ChainedCalorieParser {
    parsers: Vec<Box<dyn CalorieParser>>,
}

impl ChainedCalorieParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, parser: impl CalorieParser + 'static) -> Self {
        self.parsers.push(Box::new(parser));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }
}

impl CalorieParser for ChainedCalorieParser {
    fn name(&self) -> &str {
        "chained"
    }

    fn parse(&self, text: &str) -> Option<f64> {
        self.parsers.iter().find_map(|parser| {
            let value = parser.parse(text)?;
            tracing::debug!(parser = %parser.name(), calories = value, "Calorie figure matched");
            Some(value)
        })
    }
}

/// Parse a captured figure, accepting full-width digits as the OCR often
/// returns them for Japanese screenshots.
fn parse_figure(raw: &str) -> Option<f64> {
    let normalized: String = raw
        .chars()
        .map(|c| match c {
            '０'..='９' => char::from(b'0' + (c as u32 - '０' as u32) as u8),
            '．' => '.',
            other => other,
        })
        .collect();
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> PatternCalorieParser {
        PatternCalorieParser::estimated_burn_ja()
    }

    #[test]
    fn parses_labelled_decimal_figure() {
        assert_eq!(parser().parse("推定消費カロリー: 512.5kcal"), Some(512.5));
    }

    #[test]
    fn parses_figure_separated_by_space() {
        assert_eq!(parser().parse("推定消費カロリー 420kcal"), Some(420.0));
    }

    #[test]
    fn unit_is_case_insensitive_and_may_follow_whitespace() {
        assert_eq!(parser().parse("推定消費カロリー 300 KCAL"), Some(300.0));
        assert_eq!(parser().parse("推定消費カロリー：180　Kcal"), Some(180.0));
    }

    #[test]
    fn finds_label_inside_longer_text() {
        let text = "ウォーキング\n時間 00:42:10\n推定消費カロリー\n231kcal\n距離 3.2km";
        assert_eq!(parser().parse(text), Some(231.0));
    }

    #[test]
    fn accepts_full_width_digits() {
        assert_eq!(parser().parse("推定消費カロリー：５１２kcal"), Some(512.0));
    }

    #[test]
    fn accepts_full_width_decimal_point() {
        assert_eq!(parser().parse("推定消費カロリー ２３１．５kcal"), Some(231.5));
    }

    #[test]
    fn other_digit_scripts_are_not_captured() {
        // Arabic-Indic ٤٢٠
        assert_eq!(parser().parse("推定消費カロリー \u{664}\u{662}\u{660} kcal"), None);
        assert_eq!(parser().parse("推定消費カロリー ٤٢٠kcal 推定消費カロリー 12kcal"), Some(12.0));
    }

    #[test]
    fn other_units_or_labels_do_not_match() {
        assert_eq!(parser().parse("推定消費カロリー 420kJ"), None);
        assert_eq!(parser().parse("消費カロリー 420kcal"), None);
        assert_eq!(parser().parse("Estimated calories burned: 420 kcal"), None);
        assert_eq!(parser().parse(""), None);
    }

    #[test]
    fn malformed_figure_is_not_a_value() {
        assert_eq!(parser().parse("推定消費カロリー 1.2.3kcal"), None);
        assert_eq!(parser().parse("推定消費カロリー .kcal"), None);
    }

    #[test]
    fn chained_parser_uses_first_match() {
        let english = PatternCalorieParser::new(
            "estimated_burn_en",
            r"(?i)estimated calories\D*?([\d.]+)\s*kcal",
        )
        .unwrap();
        let chained = ChainedCalorieParser::new().with(parser()).with(english);

        assert_eq!(chained.parse("Estimated calories: 99 kcal"), Some(99.0));
        assert_eq!(chained.parse("推定消費カロリー 42kcal"), Some(42.0));
        assert_eq!(chained.parse("nothing here"), None);
        assert!(!chained.is_empty());
    }

    #[test]
    fn pattern_without_capture_group_is_rejected() {
        let err = PatternCalorieParser::new("bad", r"kcal").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(PatternCalorieParser::new("bad", r"(").is_err());
    }
}
