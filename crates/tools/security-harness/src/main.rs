//! CLI harness for the Newsbite device security layer
//!
//! This tool allows testing:
//! - Encrypted store reads and writes against a SQLite file
//! - Legacy plaintext values and key policies
//! - App lock behaviour over scripted lifecycle sequences

mod credentials;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use credentials::FileCredentialHolder;
use directories::ProjectDirs;
use newsbite_security::mock::{
    MockAuthenticator, MockIntegrityChecker, MockScreenCapture, RecordingAdvisoryPresenter,
};
use newsbite_security::{
    AppLifecycleState, AuthenticationOutcome, DeviceSecurityController, PlatformKind,
    SecurityConfig, SecurityPlatform, SecuritySnapshot,
};
use newsbite_storage::{
    EncryptedStore, KeyManager, KeyPolicy, MemoryBackend, MemoryCredentialHolder,
    SecureCredentialHolder, SqliteBackend, StoreConfig,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "security-harness")]
#[command(about = "Newsbite device security testing harness", long_about = None)]
struct Cli {
    /// Data directory (defaults to the platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// JSON config file with `store` and `security` sections
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read and write the encrypted store
    Store {
        /// Derive the key from the fixed fallback secret (no confidentiality)
        #[arg(long)]
        insecure_fixed_key: bool,

        #[command(subcommand)]
        action: StoreAction,
    },

    /// Run the app lock over a scripted lifecycle
    Simulate {
        /// Comma-separated lifecycle states
        #[arg(short, long, value_delimiter = ',', default_value = "active,background,active")]
        events: Vec<String>,

        /// Start with the app lock preference off
        #[arg(long)]
        lock_disabled: bool,

        /// Outcome of every authentication prompt
        #[arg(short, long, value_enum, default_value_t = Outcome::Success)]
        outcome: Outcome,

        /// Device has no authentication hardware
        #[arg(long)]
        no_hardware: bool,

        /// No biometric or passcode enrolled
        #[arg(long)]
        not_enrolled: bool,

        /// Device reports as rooted/jailbroken
        #[arg(long)]
        rooted: bool,

        /// Behave as the web build
        #[arg(long)]
        web: bool,
    },
}

#[derive(Subcommand)]
enum StoreAction {
    /// Store a JSON value (bare text is stored as a string)
    Set { key: String, value: String },
    /// Print the value under a key
    Get { key: String },
    /// Delete a key
    Remove { key: String },
    /// Delete every key
    Clear,
}

#[derive(Clone, Copy, ValueEnum)]
enum Outcome {
    Success,
    Failed,
    Cancelled,
}

impl From<Outcome> for AuthenticationOutcome {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success => AuthenticationOutcome::Success,
            Outcome::Failed => AuthenticationOutcome::Failed,
            Outcome::Cancelled => AuthenticationOutcome::Cancelled,
        }
    }
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct HarnessConfig {
    store: StoreConfig,
    security: SecurityConfig,
}

impl HarnessConfig {
    fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&json)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.store.validate()?;
        config.security.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = HarnessConfig::load(cli.config.as_deref())?;
    let data_dir = cli.data_dir.unwrap_or_else(default_data_dir);

    match cli.command {
        Commands::Store {
            insecure_fixed_key,
            action,
        } => {
            let mut store_config = config.store;
            if insecure_fixed_key {
                store_config.key_policy = KeyPolicy::insecure_fallback();
            }
            run_store(&data_dir, &store_config, action).await?;
        }
        Commands::Simulate {
            events,
            lock_disabled,
            outcome,
            no_hardware,
            not_enrolled,
            rooted,
            web,
        } => {
            let events = events
                .iter()
                .map(|e| e.parse::<AppLifecycleState>())
                .collect::<Result<Vec<_>, _>>()?;

            let mut security_config = config.security;
            if web {
                security_config.platform = PlatformKind::Web;
            }

            let auth = MockAuthenticator::with_outcome(outcome.into());
            auth.set_hardware(!no_hardware);
            auth.set_enrolled(!not_enrolled);

            run_simulation(
                security_config,
                auth,
                rooted,
                !lock_disabled,
                &events,
            )
            .await?;
        }
    }

    Ok(())
}

fn default_data_dir() -> PathBuf {
    ProjectDirs::from("com", "Newsbite", "Newsbite")
        .map(|dirs| dirs.data_local_dir().join("security-harness"))
        .unwrap_or_else(|| PathBuf::from("."))
}

async fn run_store(data_dir: &Path, config: &StoreConfig, action: StoreAction) -> anyhow::Result<()> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("creating {}", data_dir.display()))?;

    let db_path = data_dir.join("store.sqlite3");
    let backend = Arc::new(SqliteBackend::open(&db_path)?);
    let holder: Option<Arc<dyn SecureCredentialHolder>> = if config.key_policy.is_confidential() {
        Some(Arc::new(FileCredentialHolder::new(
            data_dir.join("dev_credentials.json"),
        )))
    } else {
        None
    };

    let store = EncryptedStore::from_config(backend.clone(), holder, config)?;
    info!("Store: {} ({} keys)", db_path.display(), backend.count()?);

    match action {
        StoreAction::Set { key, value } => {
            let value = serde_json::from_str::<serde_json::Value>(&value)
                .unwrap_or(serde_json::Value::String(value));
            store.set_item(&key, &value).await?;
            info!("Stored '{}'", key);
        }
        StoreAction::Get { key } => {
            match store.get_item_with_format::<serde_json::Value>(&key).await {
                Some((value, format)) => {
                    info!("'{}' decoded as {:?}", key, format);
                    println!("{}", serde_json::to_string_pretty(&value)?);
                }
                None => println!("(absent)"),
            }
        }
        StoreAction::Remove { key } => {
            store.remove_item(&key).await?;
            info!("Removed '{}'", key);
        }
        StoreAction::Clear => {
            store.clear().await?;
            info!("Cleared store");
        }
    }

    Ok(())
}

async fn run_simulation(
    config: SecurityConfig,
    auth: MockAuthenticator,
    rooted: bool,
    lock_enabled: bool,
    events: &[AppLifecycleState],
) -> anyhow::Result<()> {
    let store = Arc::new(EncryptedStore::new(
        Arc::new(MemoryBackend::new()),
        KeyManager::with_holder(Arc::new(MemoryCredentialHolder::new()), "secure_storage_key"),
    ));
    if lock_enabled {
        store.set_item(&config.app_lock_key, &true).await?;
    }

    let auth = Arc::new(auth);
    let capture = Arc::new(MockScreenCapture::new());
    let presenter = Arc::new(RecordingAdvisoryPresenter::new());
    let integrity = if rooted {
        MockIntegrityChecker::compromised()
    } else {
        MockIntegrityChecker::intact()
    };
    let platform = SecurityPlatform::new()
        .with_authenticator(auth.clone())
        .with_integrity_checker(Arc::new(integrity))
        .with_screen_capture(capture.clone())
        .with_advisory_presenter(presenter.clone());

    let controller = DeviceSecurityController::new(store, platform, config)?;

    let snapshot = controller.init().await;
    print_step("init", &snapshot)?;

    for event in events {
        controller.handle_lifecycle_change(*event).await;
        print_step(event.as_str(), &controller.snapshot())?;
    }

    info!("Prompts shown: {}", auth.prompt_count());
    info!("Screen capture calls: {:?}", capture.calls());
    for advisory in presenter.presented() {
        info!("Advisory: {} - {}", advisory.title, advisory.message);
    }

    Ok(())
}

fn print_step(label: &str, snapshot: &SecuritySnapshot) -> anyhow::Result<()> {
    println!(
        "{:<12} {} gate={:?}",
        label,
        serde_json::to_string(snapshot)?,
        snapshot.gate()
    );
    Ok(())
}
