mod common;

use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{FlakySynthesizer, RecordingPlayer, ScriptedGenerator};
use moodbot::speech::prompt::{build_prompt, PromptRequest};
use moodbot::speech::{ConversationState, PipelineOptions, RetryPolicy, SpeechCommand, SpeechPipeline};
use moodbot::{Emotion, Error};
use tempfile::TempDir;

struct Rig {
    generator: Arc<ScriptedGenerator>,
    synthesizer: Arc<FlakySynthesizer>,
    player: Arc<RecordingPlayer>,
    pipeline: SpeechPipeline,
    dir: TempDir,
}

fn rig(generator: ScriptedGenerator, synthesizer: FlakySynthesizer, player: RecordingPlayer, retry: RetryPolicy) -> Rig {
    let dir = tempfile::tempdir().unwrap();
    let generator = Arc::new(generator);
    let synthesizer = Arc::new(synthesizer);
    let player = Arc::new(player);
    let options = PipelineOptions {
        audio_dir: dir.path().to_path_buf(),
        retry,
        ..PipelineOptions::default()
    };
    let pipeline = SpeechPipeline::new(generator.clone(), synthesizer.clone(), player.clone(), options);
    Rig { generator, synthesizer, player, pipeline, dir }
}

fn no_backoff() -> RetryPolicy {
    RetryPolicy::unbounded(Duration::ZERO)
}

fn leftover_files(dir: &TempDir) -> usize {
    std::fs::read_dir(dir.path()).unwrap().count()
}

#[test]
fn test_prompt_templates() {
    let fresh = ConversationState::default();
    let initial = build_prompt(&fresh, PromptRequest::EmotionChanged(Emotion::Happy), None);
    assert_eq!(
        initial,
        "The user's current emotional state is happy. Generate a single short casual sentence reacting to that emotion."
    );

    let with_language = build_prompt(&fresh, PromptRequest::EmotionChanged(Emotion::Sad), Some("Korean"));
    assert!(with_language.ends_with(" Return only the sentence, in Korean."));
    assert_eq!(build_prompt(&fresh, PromptRequest::Continuation, Some("  ")), build_prompt(&fresh, PromptRequest::Continuation, None));
}

#[tokio::test]
async fn test_first_change_then_same_builds_on_previous_utterance() {
    let mut rig = rig(Default::default(), Default::default(), Default::default(), no_backoff());

    let spoken = rig.pipeline.handle(SpeechCommand::Change(Emotion::Happy)).await.unwrap();
    assert_eq!(spoken, "utterance 1");
    assert_eq!(rig.pipeline.conversation().previous_utterance(), "utterance 1");
    assert!(rig.pipeline.conversation().has_spoken_before());

    rig.pipeline.handle(SpeechCommand::Same).await.unwrap();
    rig.pipeline.handle(SpeechCommand::Change(Emotion::Sad)).await.unwrap();

    let prompts = rig.generator.prompts.lock().unwrap().clone();
    assert!(prompts[0].starts_with("The user's current emotional state is happy."));
    assert_eq!(
        prompts[1],
        "Your previous response was 'utterance 1'. Generate the next casual sentence continuing as the same speaker."
    );
    assert_eq!(
        prompts[2],
        "The user's emotional state changed to sad; your previous response was 'utterance 2'. Generate the next casual sentence continuing as the same speaker."
    );
    assert_eq!(
        *rig.player.played.lock().unwrap(),
        vec!["utterance 1", "utterance 2", "utterance 3"]
    );
}

#[tokio::test]
async fn test_synthesis_failures_retry_whole_sequence() {
    let synthesizer = FlakySynthesizer { fail_first: 2, ..Default::default() };
    let mut rig = rig(Default::default(), synthesizer, Default::default(), no_backoff());

    let spoken = rig.pipeline.speak_emotion_changed(Emotion::Happy).await.unwrap();

    // Each retry starts again from generation.
    assert_eq!(rig.generator.prompts.lock().unwrap().len(), 3);
    assert_eq!(rig.synthesizer.failures.load(Ordering::SeqCst), 2);
    assert_eq!(spoken, "utterance 3");
    assert_eq!(*rig.player.played.lock().unwrap(), vec!["utterance 3"]);
    assert_eq!(rig.pipeline.conversation().previous_utterance(), "utterance 3");
    assert_eq!(rig.pipeline.pending_text(), 0);
    assert_eq!(rig.pipeline.pending_audio(), 0);
}

#[tokio::test]
async fn test_generation_failures_retry_until_success() {
    let generator = ScriptedGenerator { fail_first: 4, ..Default::default() };
    let mut rig = rig(generator, Default::default(), Default::default(), no_backoff());

    let spoken = rig.pipeline.speak_continuation().await.unwrap();

    assert_eq!(spoken, "utterance 5");
    assert_eq!(rig.synthesizer.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_playback_failure_regenerates_and_cleans_up() {
    let player = RecordingPlayer { fail_first: 1, ..Default::default() };
    let mut rig = rig(Default::default(), Default::default(), player, no_backoff());

    let spoken = rig.pipeline.speak_emotion_changed(Emotion::Fear).await.unwrap();

    assert_eq!(spoken, "utterance 2");
    assert_eq!(rig.player.calls.load(Ordering::SeqCst), 2);
    assert_eq!(leftover_files(&rig.dir), 0, "failed and played files are both removed");
}

#[tokio::test]
async fn test_bounded_retries_leave_conversation_untouched() {
    let synthesizer = FlakySynthesizer { fail_first: 100, ..Default::default() };
    let mut rig = rig(
        Default::default(),
        synthesizer,
        Default::default(),
        RetryPolicy::bounded(Duration::ZERO, 3),
    );

    match rig.pipeline.speak_emotion_changed(Emotion::Angry).await {
        Err(Error::RetriesExhausted { attempts, last }) => {
            assert_eq!(attempts, 3);
            assert!(last.contains("quota exceeded"), "{}", last);
        }
        other => panic!("expected retries exhausted, got {:?}", other),
    }
    assert_eq!(*rig.pipeline.conversation(), ConversationState::default());
    assert!(rig.player.played.lock().unwrap().is_empty());

    // The next command still uses the initial template.
    let mut prompts = rig.generator.prompts.lock().unwrap().clone();
    prompts.dedup();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].starts_with("The user's current emotional state is angry."));
}

#[tokio::test]
async fn test_audio_files_are_unique_and_removed() {
    let mut rig = rig(Default::default(), Default::default(), Default::default(), no_backoff());

    for _ in 0..5 {
        rig.pipeline.speak_continuation().await.unwrap();
    }

    let paths = rig.player.paths.lock().unwrap().clone();
    let unique: HashSet<_> = paths.iter().collect();
    assert_eq!(unique.len(), 5);
    for path in &paths {
        let name = path.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("moodbot_") && name.ends_with(".mp3"), "{}", name);
        assert!(!path.exists());
    }
    assert_eq!(leftover_files(&rig.dir), 0);
}

#[tokio::test]
async fn test_backoff_is_waited_between_attempts() {
    let synthesizer = FlakySynthesizer { fail_first: 1, ..Default::default() };
    let mut rig = rig(
        Default::default(),
        synthesizer,
        Default::default(),
        RetryPolicy::unbounded(Duration::from_millis(50)),
    );

    let started = tokio::time::Instant::now();
    rig.pipeline.speak_continuation().await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(50));
}

#[cfg(unix)]
#[tokio::test]
async fn test_command_player_reports_exit_status() {
    use moodbot::speech::player::{AudioPlayer, CommandPlayer};

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("clip.mp3");
    std::fs::write(&file, b"ID3").unwrap();

    CommandPlayer::new("true", Vec::new()).play(&file).await.unwrap();
    let err = CommandPlayer::new("false", Vec::new()).play(&file).await.unwrap_err();
    assert!(err.to_string().contains("play"), "{}", err);
    let err = CommandPlayer::new("moodbot-no-such-player", Vec::new()).play(&file).await.unwrap_err();
    assert!(err.to_string().contains("cannot run"), "{}", err);
}

#[tokio::test]
async fn test_retry_drains_text_left_by_failed_synthesis() {
    let synthesizer = FlakySynthesizer { fail_first: 1, ..Default::default() };
    let mut rig = rig(Default::default(), synthesizer, Default::default(), no_backoff());

    let spoken = rig.pipeline.speak_continuation().await.unwrap();

    assert_eq!(spoken, "utterance 2");
    assert_eq!(rig.pipeline.pending_text(), 0);
}

#[tokio::test]
async fn test_without_drain_stale_text_is_spoken_first() {
    let dir = tempfile::tempdir().unwrap();
    let generator = Arc::new(ScriptedGenerator::default());
    let player = Arc::new(RecordingPlayer::default());
    let options = PipelineOptions {
        audio_dir: dir.path().to_path_buf(),
        retry: no_backoff(),
        drain_on_retry: false,
        ..PipelineOptions::default()
    };
    let mut pipeline = SpeechPipeline::new(
        generator.clone(),
        Arc::new(FlakySynthesizer { fail_first: 1, ..Default::default() }),
        player.clone(),
        options,
    );

    let spoken = pipeline.speak_continuation().await.unwrap();

    assert_eq!(spoken, "utterance 1");
    assert_eq!(pipeline.conversation().previous_utterance(), "utterance 1");
    assert_eq!(pipeline.pending_text(), 1, "the retry's own text is still queued");
    assert_eq!(generator.prompts.lock().unwrap().len(), 2);
}
