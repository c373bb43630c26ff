use std::io::Write;
use std::time::Duration;

use moodbot::config::{Config, SpeechMode};
use moodbot::kernel::debounce::RepeatPolicy;
use moodbot::kernel::scheduler::EyebrowProfile;
use moodbot::{Emotion, Error};

#[test]
fn test_defaults_are_valid() {
    let config = Config::load(None).unwrap();
    assert_eq!(config.controller.debounce_interval(), Duration::from_millis(300));
    assert_eq!(config.controller.window(), Duration::from_secs(2));
    assert_eq!(config.controller.repeat_policy, RepeatPolicy::Hold);
    assert_eq!(config.eyebrow.port, "/dev/ttyACM0");
    assert_eq!(config.eyebrow.baud, 9600);
    assert_eq!(config.speech.mode, SpeechMode::Process);
    assert_eq!(config.speech.retry_policy().max_attempts, None);
    assert_eq!(config.shutdown.grace(), Duration::from_secs(1));
    assert_eq!(config.eyebrow.angle_table().unwrap().angle_for(Emotion::Angry).unwrap(), 40);
}

#[test]
fn test_partial_toml_keeps_other_defaults() {
    let config = Config::from_toml(
        r#"
        [controller]
        debounce_interval_ms = 500
        repeat_policy = "heartbeat"
        emit_repeats = false

        [eyebrow]
        profile = "alternate"
        overrides = { happy = 100 }

        [speech]
        mode = "task"
        language = "Korean"
        max_attempts = 4
        "#,
    )
    .unwrap();
    config.validate().unwrap();

    assert_eq!(config.controller.debounce_interval(), Duration::from_millis(500));
    assert_eq!(config.controller.repeat_policy, RepeatPolicy::Heartbeat);
    assert!(!config.controller.emit_repeats);
    assert_eq!(config.controller.poll_interval(), Duration::from_millis(100));
    assert_eq!(config.eyebrow.profile, EyebrowProfile::Alternate);

    let table = config.eyebrow.angle_table().unwrap();
    assert_eq!(table.angle_for(Emotion::Happy).unwrap(), 100);
    assert_eq!(table.angle_for(Emotion::Angry).unwrap(), 160);

    let options = config.speech.pipeline_options();
    assert_eq!(options.language.as_deref(), Some("Korean"));
    assert_eq!(options.retry.max_attempts, Some(4));
    assert_eq!(config.speech.mode, SpeechMode::Task);
}

#[test]
fn test_unknown_keys_are_rejected() {
    assert!(matches!(Config::from_toml("[controller]\ndebounce = 3\n"), Err(Error::Toml(_))));
    assert!(matches!(Config::from_toml("[eyebrow.overrides]\nconfused = 90\n"), Err(Error::Toml(_))));
}

#[test]
fn test_validation() {
    let invalid = [
        "[controller]\ndebounce_interval_ms = 0\n",
        "[controller]\nwindow_ms = 0\n",
        "[controller]\nconfidence_threshold = 1.5\n",
        "[controller]\nmax_consecutive_capture_failures = 0\n",
        "[eyebrow.overrides]\nsad = 181\n",
        "[speech]\nmax_attempts = 0\n",
    ];
    for text in invalid {
        let config = Config::from_toml(text).unwrap();
        assert!(matches!(config.validate(), Err(Error::Config(_))), "accepted: {}", text);
    }
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[shutdown]\ngrace_ms = 250").unwrap();

    let config = Config::load(Some(file.path())).unwrap();
    assert_eq!(config.shutdown.grace(), Duration::from_millis(250));

    let missing = Config::load(Some(std::path::Path::new("/nonexistent/moodbot.toml")));
    assert!(matches!(missing, Err(Error::Config(_))));
}
