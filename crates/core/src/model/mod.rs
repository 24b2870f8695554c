mod ids;
mod progress;
mod summary;

pub use ids::{ParseIdError, UserId};
pub use progress::{ChapterStatus, LearningProgress, MAX_READ_DURATION, ParseStatusError};
pub use summary::{ChapterProgressView, NextChapter, OverallProgress, TopicProgress};
