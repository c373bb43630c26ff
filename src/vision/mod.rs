pub mod classifier;
pub mod frame;
pub mod pipeline;

pub use classifier::{parse_classification, Classification, EmotionClassifier, HttpClassifier};
pub use frame::{Frame, FrameSource, SnapshotFrameSource};
pub use pipeline::{EmotionSampler, SamplerOptions};
