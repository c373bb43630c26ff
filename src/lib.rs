pub mod config;
pub mod error;
pub mod kernel;
pub mod outputs;
pub mod process;
pub mod services;
pub mod speech;
pub mod vision;

pub use error::{Error, Result};
pub use kernel::debounce::{DebounceGate, Decision};
pub use kernel::emotion::{Emotion, EmotionLabel, EmotionSample};
pub use kernel::reactor::Reactor;
