use std::fmt;
use tracing::warn;

use crate::kernel::emotion::Emotion;

/// Line protocol into the speech unit: `CHANGE <emotion>` or `SAME`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechCommand {
    Change(Emotion),
    Same,
}

impl SpeechCommand {
    /// Empty and unrecognized lines yield `None` and are ignored by the unit.
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        match words.next()? {
            "CHANGE" => {
                let name = words.next()?;
                match name.parse() {
                    Ok(emotion) => Some(SpeechCommand::Change(emotion)),
                    Err(e) => {
                        warn!("Ignoring speech command: {}", e);
                        None
                    }
                }
            }
            "SAME" => Some(SpeechCommand::Same),
            _ => None,
        }
    }

    /// Wire form, without the trailing newline.
    pub fn to_line(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SpeechCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeechCommand::Change(emotion) => write!(f, "CHANGE {}", emotion),
            SpeechCommand::Same => f.write_str("SAME"),
        }
    }
}
