use serde::{Deserialize, Serialize};

use crate::calories::CalorieParser;

/// Text extracted from one image, plus the calorie figure found in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrResult {
    pub text: String,
    pub calories: Option<f64>,
}

impl OcrResult {
    /// Trim the raw model output and run `parser` over it.
    pub fn parse(raw_text: &str, parser: &dyn CalorieParser) -> Self {
        let text = raw_text.trim().to_string();
        let calories = parser.parse(&text);
        Self { text, calories }
    }
}
