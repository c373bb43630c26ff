/// What the robot said last. Single writer: the speech pipeline, and only
/// after an utterance was both generated and played.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationState {
    previous_utterance: String,
    has_spoken_before: bool,
}

impl ConversationState {
    pub fn previous_utterance(&self) -> &str {
        &self.previous_utterance
    }

    pub fn has_spoken_before(&self) -> bool {
        self.has_spoken_before
    }

    pub(crate) fn commit(&mut self, utterance: &str) {
        self.previous_utterance = utterance.to_string();
        self.has_spoken_before = true;
    }
}
