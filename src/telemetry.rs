//! Logging setup
//!
//! Structured logs go to a daily rolling JSON file in the log directory.
//! Verbose mode adds compact console output on stderr, keeping stdout free
//! for model replies.

use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

/// Log file name prefix inside the log directory
pub const LOG_FILE_PREFIX: &str = "ark_chat.log";

/// Keeps the background log writer alive; drop it last
pub struct Telemetry {
    session_id: Uuid,
    log_dir: PathBuf,
    _file_guard: Option<WorkerGuard>,
}

impl Telemetry {
    /// Install the global subscriber.
    ///
    /// `RUST_LOG` wins when set. A subscriber installed earlier (in tests,
    /// for instance) is left in place.
    pub fn init(log_dir: PathBuf, verbose: bool) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&log_dir)?;

        let session_id = Uuid::new_v4();

        let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX);
        let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);

        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            if verbose {
                EnvFilter::new("debug,hyper=info,hyper_util=info,reqwest=info,h2=info,rustls=info")
            } else {
                EnvFilter::new("info,hyper=warn,hyper_util=warn,reqwest=warn,h2=warn,rustls=warn")
            }
        });

        if verbose {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_target(false)
                        .compact()
                        .with_writer(std::io::stderr),
                )
                .with(fmt::layer().json().with_writer(non_blocking))
                .try_init()
                .ok();
        } else {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(non_blocking))
                .try_init()
                .ok();
        }

        tracing::info!(
            session_id = %session_id,
            log_dir = %log_dir.display(),
            "Telemetry initialized"
        );

        Ok(Self {
            session_id,
            log_dir,
            _file_guard: Some(file_guard),
        })
    }

    /// Default log directory: `<data dir>/ark-chat/logs`, or `.ark_chat_logs`
    /// when the platform has no data directory
    pub fn default_log_dir() -> PathBuf {
        dirs::data_dir()
            .map(|dir| dir.join("ark-chat").join("logs"))
            .unwrap_or_else(|| PathBuf::from(".ark_chat_logs"))
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }
}
