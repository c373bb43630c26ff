pub mod command;
pub mod conversation;
pub mod pipeline;
pub mod player;
pub mod prompt;
pub mod unit;

pub use command::SpeechCommand;
pub use conversation::ConversationState;
pub use pipeline::{PipelineOptions, RetryPolicy, SpeechPipeline, SpeechStage};
