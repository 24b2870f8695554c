#![forbid(unsafe_code)]

pub mod cache;
pub mod error;
pub mod merge;
pub mod progress_service;
pub mod request;

pub use learn_core::Clock;

pub use cache::ProgressCache;
pub use error::ProgressServiceError;
pub use progress_service::ProgressService;
pub use request::{
    ProgressOverview, ProgressResponse, TopicReport, UpdateProgressRequest, ValidatedUpdate,
};
