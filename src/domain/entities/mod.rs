mod embedding;
mod event;
mod scene;
mod source;

pub use embedding::Embedding;
pub use event::{ChangeEvent, OperationType, ResumeToken};
pub use scene::{ContentSummary, Scene, VideoContext};
pub use source::{
    AudioData, AudioMetadata, EnrichedData, SceneEntry, SourceDocument, TimeValue, VideoInfo,
};
