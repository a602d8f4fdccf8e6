use serde::{Deserialize, Serialize};

/// Message pushed to the notification channel for one completion event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub subject: String,
    pub message: String,
}

impl Notification {
    /// Build the notification for a parsed calorie value.
    ///
    /// The downstream automation reads the number from the `Calories=` body, so
    /// both lines carry the value formatted the same way. Whole values keep a
    /// trailing `.0` (`420.0`), the form existing mail rules match on.
    pub fn for_calories(calories: f64) -> Self {
        Self {
            subject: format!("OCR Calories {:?}", calories),
            message: format!("Calories={:?}", calories),
        }
    }
}
