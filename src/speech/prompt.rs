use super::conversation::ConversationState;
use crate::kernel::emotion::Emotion;

/// Which conversational cue is being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptRequest {
    EmotionChanged(Emotion),
    Continuation,
}

/// Pure function of the conversation and the request.
///
/// - first `EmotionChanged`: initial template, emotion only
/// - later `EmotionChanged`: changed template, emotion + previous utterance
/// - `Continuation`: same template, previous utterance
///
/// `language`, when set, asks for the reply in that language.
pub fn build_prompt(
    conversation: &ConversationState,
    request: PromptRequest,
    language: Option<&str>,
) -> String {
    let body = match request {
        PromptRequest::EmotionChanged(emotion) if !conversation.has_spoken_before() => format!(
            "The user's current emotional state is {}. Generate a single short casual sentence reacting to that emotion.",
            emotion
        ),
        PromptRequest::EmotionChanged(emotion) => format!(
            "The user's emotional state changed to {}; your previous response was '{}'. Generate the next casual sentence continuing as the same speaker.",
            emotion,
            conversation.previous_utterance()
        ),
        PromptRequest::Continuation => format!(
            "Your previous response was '{}'. Generate the next casual sentence continuing as the same speaker.",
            conversation.previous_utterance()
        ),
    };

    match language.map(str::trim).filter(|l| !l.is_empty()) {
        Some(lang) => format!("{} Return only the sentence, in {}.", body, lang),
        None => body,
    }
}
