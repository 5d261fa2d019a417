//! Emberlock CLI
//!
//! Drives the unlock engine against a simulated device. Microphone and
//! camera input come from the command line and JSON files, so enrollment
//! and the full unlock pipeline can be exercised without hardware.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use emberlock_lib::auth::{AuthOutcome, LogProgressSink};
use emberlock_lib::biometrics::{EncryptedFileStore, Frame, Modality};
use emberlock_lib::capture::stub::{
    Script, ScriptedEyeCapture, ScriptedFallback, ScriptedVoiceCapture,
};
use emberlock_lib::capture::FaceScan;
use emberlock_lib::config::AppConfig;
use emberlock_lib::device::SimulatedDevice;
use emberlock_lib::paths::AppPaths;
use emberlock_lib::service::{AuthService, Collaborators};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "emberlock")]
#[command(about = "Voice + iris two-factor device unlock")]
#[command(version)]
struct Cli {
    /// Keep config and enrollments under this directory instead of the OS defaults
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show enrollment state and available fallback methods
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Enroll the voice factor from a spoken phrase transcript
    EnrollVoice { phrase: String },
    /// Enroll the iris factor from a frame JSON file ({width, height, pixels})
    EnrollIris { frame: PathBuf },
    /// Delete enrollment records
    Reset {
        #[arg(value_enum, default_value_t = ResetTarget::All)]
        target: ResetTarget,
    },
    /// Run the full unlock pipeline with the given captures
    Unlock {
        /// Transcript heard while waiting for the wake phrase
        #[arg(long)]
        utterance: String,
        /// Voice print sample
        #[arg(long)]
        voice_sample: String,
        /// Face scan JSON file ({signals, frame})
        #[arg(long)]
        scan: PathBuf,
        /// High-resolution iris frame JSON file
        #[arg(long)]
        iris: PathBuf,
    },
    /// Unlock through the fallback methods only
    Fallback {
        /// Result of the platform biometric prompt; omit when unavailable
        #[arg(long, value_enum)]
        biometric: Option<PromptAnswer>,
        /// Result of the device credential prompt
        #[arg(long, value_enum, default_value_t = PromptAnswer::Fail)]
        credential: PromptAnswer,
        /// Simulate a device without a secure lock screen
        #[arg(long)]
        insecure: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ResetTarget {
    Voice,
    Iris,
    All,
}

#[derive(Clone, Copy, ValueEnum)]
enum PromptAnswer {
    Pass,
    Fail,
}

impl PromptAnswer {
    fn script(self) -> Script<bool> {
        Script::Respond(matches!(self, PromptAnswer::Pass))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let paths = match &cli.home {
        Some(root) => AppPaths::rooted(root),
        None => AppPaths::new()?,
    };
    paths.ensure_directories()?;
    let config = AppConfig::load_or_create(&paths.config_file())?;
    log::info!("Configuration loaded");

    match cli.command {
        Commands::Status { json } => {
            let service = build_service(&paths, &config, Collaborators::from(Scripted::idle()))?;
            let status = service.enrollment_status()?;
            let fallbacks = service.available_fallbacks();
            if json {
                let out = serde_json::json!({ "enrollment": status, "fallbacks": fallbacks });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("voice enrolled: {}", status.voice);
                println!("iris enrolled:  {}", status.iris);
                let names: Vec<String> = fallbacks.iter().map(|m| m.to_string()).collect();
                println!("fallbacks:      {}", names.join(", "));
            }
        }
        Commands::EnrollVoice { phrase } => {
            let service = build_service(&paths, &config, Collaborators::from(Scripted::idle()))?;
            let record = service.enroll_voice(&phrase)?;
            println!("Voice enrolled at {}", record.created_at);
        }
        Commands::EnrollIris { frame } => {
            let frame: Frame = read_json(&frame)?;
            let service = build_service(&paths, &config, Collaborators::from(Scripted::idle()))?;
            let record = service.enroll_iris(&frame)?;
            println!("Iris enrolled at {}", record.created_at);
        }
        Commands::Reset { target } => {
            let service = build_service(&paths, &config, Collaborators::from(Scripted::idle()))?;
            let modalities: &[Modality] = match target {
                ResetTarget::Voice => &[Modality::Voice],
                ResetTarget::Iris => &[Modality::Iris],
                ResetTarget::All => &Modality::ALL,
            };
            for modality in modalities {
                service.clear_enrollment(*modality)?;
                println!("Cleared {} enrollment", modality);
            }
        }
        Commands::Unlock {
            utterance,
            voice_sample,
            scan,
            iris,
        } => {
            let scan: FaceScan = read_json(&scan)?;
            let iris: Frame = read_json(&iris)?;

            let mut scripted = Scripted::idle();
            scripted.voice = ScriptedVoiceCapture::new()
                .phrase(Script::Respond(utterance))
                .print(Script::Respond(voice_sample));
            scripted.eyes = ScriptedEyeCapture::new()
                .scan(Script::Respond(scan))
                .frame(Script::Respond(iris));

            let service = Arc::new(build_service(&paths, &config, Collaborators::from(scripted))?);
            let handle = service.start_session(Arc::new(LogProgressSink))?;

            let on_interrupt = service.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_interrupt.cancel_active();
                }
            });

            match handle.join().await? {
                AuthOutcome::Unlocked => println!("Unlocked"),
                AuthOutcome::UnlockedByFallback(method) => {
                    println!("Unlocked via {} fallback", method)
                }
                AuthOutcome::Cancelled => println!("Cancelled"),
                AuthOutcome::SetupRequired(modality) => {
                    bail!("{} is not enrolled; run enroll-{} first", modality, modality)
                }
                AuthOutcome::Failed(reason) => bail!("Authentication failed: {}", reason),
            }
        }
        Commands::Fallback {
            biometric,
            credential,
            insecure,
        } => {
            let mut fallback =
                ScriptedFallback::new(biometric.is_some()).credential(credential.script());
            if let Some(answer) = biometric {
                fallback = fallback.biometric(answer.script());
            }

            let mut scripted = Scripted::idle();
            scripted.fallback = fallback;
            scripted.device = SimulatedDevice::locked().with_secure(!insecure);

            let service = build_service(&paths, &config, Collaborators::from(scripted))?;
            let outcome = service
                .unlock_with_fallback(&CancellationToken::new())
                .await?;
            println!("{:?}", outcome);
        }
    }

    Ok(())
}

/// Scripted stand-ins for the platform collaborators
struct Scripted {
    voice: ScriptedVoiceCapture,
    eyes: ScriptedEyeCapture,
    device: SimulatedDevice,
    fallback: ScriptedFallback,
}

impl Scripted {
    /// Collaborators with nothing queued; any capture reports unavailable
    fn idle() -> Self {
        Self {
            voice: ScriptedVoiceCapture::new(),
            eyes: ScriptedEyeCapture::new(),
            device: SimulatedDevice::locked(),
            fallback: ScriptedFallback::new(false),
        }
    }
}

impl From<Scripted> for Collaborators {
    fn from(s: Scripted) -> Self {
        Collaborators {
            voice: Arc::new(s.voice),
            eyes: Arc::new(s.eyes),
            device: Arc::new(s.device),
            fallback: Arc::new(s.fallback),
        }
    }
}

fn build_service(
    paths: &AppPaths,
    config: &AppConfig,
    collaborators: Collaborators,
) -> Result<AuthService> {
    let store = EncryptedFileStore::open(paths.enrollments_dir())
        .context("Failed to open enrollment store")?;
    Ok(AuthService::new(config, Arc::new(store), collaborators))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}
