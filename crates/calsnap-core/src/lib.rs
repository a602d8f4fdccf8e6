//! Calsnap Core Library
//!
//! This crate provides the domain models, event envelopes, error types,
//! configuration, and calorie parsing shared by every calsnap component.

pub mod calories;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use calories::{CalorieParser, ChainedCalorieParser, PatternCalorieParser};
pub use config::{Config, NotifyBackend, PipelineConfig, Stage};
pub use error::{AppError, AppResult};
pub use models::{
    EventEnvelope, FeedPage, FeedPost, Notification, ObjectCreatedDetail, OcrCompleted, OcrResult,
    PipelineEvent, PostRef, StoredObject,
};
