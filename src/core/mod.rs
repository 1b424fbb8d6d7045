pub mod batch;
pub mod cache;
pub mod fetcher;
pub mod merge;
pub mod pacer;

pub use crate::domain::model::{EnrichedSubject, SubjectId, SubjectSeed};
pub use crate::domain::ports::{ChunkFetcher, ConfigProvider};
pub use crate::utils::error::Result;
