use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::AsyncBufReadExt;
use tracing_subscriber::EnvFilter;

use voxchat::voice::Recorder;
use voxchat::{
    AgentClient, AudioCapture, AudioPlayback, Config, SessionId, VoiceChatWidget, WidgetState,
};

/// Voxchat - talk to a conversational AI agent from your terminal
#[derive(Parser)]
#[command(name = "voxchat", version, about)]
struct Cli {
    /// Base URL of the chat agent
    #[arg(short, long, env = "VOXCHAT_SERVER")]
    server: Option<String>,

    /// Session identifier; omit to generate a random one
    #[arg(long, env = "VOXCHAT_SESSION")]
    session: Option<String>,

    /// Local audio file to play when the agent is unreachable
    #[arg(long)]
    fallback: Option<std::path::PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn,voxchat=info",
        1 => "info,voxchat=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestSpeaker => test_speaker(),
        };
    }

    let config = Config::load(voxchat::config::Overrides {
        server_url: cli.server,
        session_id: cli.session,
        fallback_audio: cli.fallback,
    })?;
    tracing::debug!(?config, "loaded configuration");

    let session = SessionId::resolve(config.session_id.as_deref());
    let recorder = AudioCapture::new()?;
    let backend = AgentClient::new(&config.server_url);
    let sink = AudioPlayback::new()?;

    let mut widget = VoiceChatWidget::new(session, recorder, backend, sink)
        .with_fallback_override(config.fallback_audio.clone());

    println!("voxchat - session {}", widget.session());
    println!("server: {}", config.server_url);
    println!("Press Enter to start/stop recording, 'q' + Enter to quit.");

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "q" | "quit" | "exit" => break,
            _ => {
                if let Err(e) = widget.toggle().await {
                    tracing::warn!(error = %e, "toggle rejected");
                }
            }
        }
    }

    if widget.state() == WidgetState::Recording {
        tracing::debug!("exiting mid-recording, capture discarded");
    }
    drop(widget);

    tracing::info!("goodbye");
    Ok(())
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::new()?;
    capture.start()?;

    println!("Sample rate: {} Hz", capture.sample_rate());
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.peek_samples();
        let energy = calculate_rms(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "#".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}]",
            i + 1,
            energy,
            peak,
            meter
        );

        capture.clear();
    }

    let samples = capture.finalize()?;
    println!("\n---");
    println!("Captured {} residual samples.", samples.len());
    println!("If you saw movement in the meter, your mic is working.");

    Ok(())
}

/// Calculate RMS energy
#[allow(clippy::cast_precision_loss)]
fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Test speaker output with a sine wave
fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let playback = AudioPlayback::new()?;

    let sample_rate = 24000_u32;
    let frequency = 440.0_f32;
    let duration_secs = 2.0_f32;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let num_samples = (sample_rate as f32 * duration_secs) as usize;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3
        })
        .collect();

    println!("Playing {} samples at {sample_rate} Hz...", samples.len());
    playback.play_samples(samples, sample_rate)?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working.");

    Ok(())
}
