use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use moodbot::config::{Config, SpeechMode};
use moodbot::kernel::reactor::{Reactor, ReactorConfig};
use moodbot::kernel::time::MonotonicClock;
use moodbot::outputs::{
    ActuatorFanout, AngleSink, ChannelSpeechSink, PatternProcess, ProcessSpeechSink, SerialEyebrow,
    SpeechSink,
};
use moodbot::process::{ProcessSpec, ProcessSupervisor};
use moodbot::speech::{unit, SpeechPipeline};
use moodbot::vision::{EmotionSampler, HttpClassifier, SnapshotFrameSource};
use moodbot::{DebounceGate, Emotion};

/// moodbot - emotion-driven face controller
#[derive(Parser)]
#[command(name = "moodbot", version, about)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "MOODBOT_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the control loop (default)
    Run,
    /// Run the speech unit, reading CHANGE/SAME commands from stdin
    Speak,
    /// Move the eyebrow servo to the angle mapped for an emotion
    TestEyebrow {
        emotion: String,
    },
    /// Speak one emotion-change utterance through the full pipeline
    TestSpeech {
        #[arg(default_value = "happy")]
        emotion: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    if config.speech.tts_api_key.is_none() {
        config.speech.tts_api_key = std::env::var("MOODBOT_TTS_API_KEY").ok();
    }

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted by user");
            signal_token.cancel();
        }
    });

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run_controller(&config, cli.config, shutdown).await,
        Command::Speak => {
            let mut pipeline = SpeechPipeline::from_config(&config.speech)?;
            let stdin = BufReader::new(tokio::io::stdin());
            unit::run_lines(&mut pipeline, stdin, shutdown).await?;
            Ok(())
        }
        Command::TestEyebrow { emotion } => {
            let angle = config.eyebrow.angle_table()?.angle_for_name(&emotion)?;
            let mut eyebrow = SerialEyebrow::new(
                config.eyebrow.port.clone(),
                config.eyebrow.baud,
                config.eyebrow.timeout(),
            );
            eyebrow.send_angle(angle).await?;
            eyebrow.close().await;
            tracing::info!(%emotion, angle, "eyebrow moved");
            Ok(())
        }
        Command::TestSpeech { emotion } => {
            let emotion: Emotion = emotion.parse()?;
            let mut pipeline = SpeechPipeline::from_config(&config.speech)?;
            let spoken = pipeline.speak_emotion_changed(emotion).await?;
            tracing::info!(utterance = %spoken, "spoken");
            Ok(())
        }
    }
}

async fn run_controller(
    config: &Config,
    config_path: Option<PathBuf>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let clock = MonotonicClock::new();
    let angles = config.eyebrow.angle_table()?;

    let sampler = EmotionSampler::new(
        Box::new(SnapshotFrameSource::new(&config.vision.snapshot_path)),
        Box::new(HttpClassifier::new(
            config.vision.classifier_url.clone(),
            std::time::Duration::from_millis(config.vision.classifier_timeout_ms),
            tokio::runtime::Handle::current(),
        )?),
        clock,
        config.controller.sampler_options(),
    );

    let mut eyebrow = SerialEyebrow::new(
        config.eyebrow.port.clone(),
        config.eyebrow.baud,
        config.eyebrow.timeout(),
    );
    if let Err(e) = eyebrow.connect().await {
        tracing::warn!(error = %e, "eyebrow port unavailable; will retry on first move");
    }

    let pattern_spec = ProcessSpec::new("pattern", &config.pattern.program).args(config.pattern.args.clone());
    let pattern = ProcessSupervisor::spawn(&pattern_spec).context("starting pattern renderer")?;

    let speech: Box<dyn SpeechSink> = match config.speech.mode {
        SpeechMode::Process => {
            let exe = std::env::current_exe().context("locating moodbot executable")?;
            let mut args = Vec::new();
            if let Some(path) = config_path {
                args.push("--config".to_string());
                args.push(path.display().to_string());
            }
            args.push("speak".to_string());
            let spec = ProcessSpec::new("speech", exe).args(args);
            let handle = ProcessSupervisor::spawn(&spec).context("starting speech unit")?;
            Box::new(ProcessSpeechSink::new(handle))
        }
        SpeechMode::Task => {
            let pipeline = SpeechPipeline::from_config(&config.speech)?;
            let (tx, task) = unit::spawn_task(pipeline, config.speech.queue_capacity, shutdown.clone());
            Box::new(ChannelSpeechSink::new(tx, Some(task)))
        }
    };

    let fanout = ActuatorFanout::new(angles, Box::new(eyebrow), Box::new(PatternProcess::new(pattern)), speech)
        .with_repeats(config.controller.emit_repeats);
    let gate = DebounceGate::new(config.controller.debounce_interval())
        .with_repeat_policy(config.controller.repeat_policy);

    let mut reactor = Reactor::new(sampler, gate, fanout, ReactorConfig::from_config(config));
    reactor.run(shutdown).await;
    Ok(())
}
