#![cfg(unix)]

use std::time::Duration;

use moodbot::process::{LineChannel, ProcessSpec, ProcessSupervisor};
use moodbot::Error;

async fn wait_for_exit<C: LineChannel>(channel: &mut C) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while channel.is_alive() {
        assert!(tokio::time::Instant::now() < deadline, "{} never exited", channel.name());
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_lines_reach_a_live_child() {
    let mut cat = ProcessSupervisor::spawn(&ProcessSpec::new("cat", "cat")).unwrap();
    assert!(cat.is_alive());
    assert!(cat.id().is_some());

    cat.write_line("happy").await.unwrap();
    cat.write_line("sad").await.unwrap();

    // `cat` exits on its own once stdin closes.
    cat.terminate(Duration::from_secs(5)).await;
    assert!(!cat.is_alive());
    assert!(cat.exit_status().unwrap().success());
}

#[tokio::test]
async fn test_write_after_exit_is_broken_channel() {
    let mut child = ProcessSupervisor::spawn(&ProcessSpec::new("pattern", "true")).unwrap();
    wait_for_exit(&mut child).await;

    match child.write_line("happy").await {
        Err(Error::BrokenChannel { name, .. }) => assert_eq!(name, "pattern"),
        other => panic!("expected broken channel, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unresponsive_child_is_killed_after_grace() {
    let spec = ProcessSpec::new("sleeper", "sleep").args(["30"]);
    let mut child = ProcessSupervisor::spawn(&spec).unwrap();

    let started = tokio::time::Instant::now();
    child.terminate(Duration::from_millis(100)).await;

    assert!(!child.is_alive());
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(!child.exit_status().map_or(false, |s| s.success()));
}

#[tokio::test]
async fn test_terminate_is_idempotent() {
    let mut cat = ProcessSupervisor::spawn(&ProcessSpec::new("cat", "cat")).unwrap();
    cat.terminate(Duration::from_secs(1)).await;
    cat.terminate(Duration::from_secs(1)).await;
    assert!(!cat.is_alive());
    assert!(cat.write_line("late").await.is_err());
}

#[tokio::test]
async fn test_missing_executable_is_unavailable() {
    let spec = ProcessSpec::new("pattern", "./definitely/not/here/mouthLED.exe");
    assert!(matches!(ProcessSupervisor::spawn(&spec), Err(Error::ProcessUnavailable(_))));

    let spec = ProcessSpec::new("pattern", "moodbot-no-such-binary");
    assert!(matches!(ProcessSupervisor::spawn(&spec), Err(Error::ProcessUnavailable(_))));
}
