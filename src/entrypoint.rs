//! Command-line entry point shared by all source binaries.
//!
//! Implements the host framework's command protocol: `spec`, `check`,
//! `discover`, and `read`, each taking `--config <path>` (and `read`
//! optionally `--catalog <path>` and `--state <path>`). Protocol messages
//! go to stdout, one JSON line each; logs go to stderr.

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::protocol::{
    Catalog, CatalogStream, ConfiguredCatalog, ConnectionStatus, Message, StateMessage, Status,
};
use crate::source::Source;

/// Parsed command line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Spec,
    Check {
        config: PathBuf,
    },
    Discover {
        config: PathBuf,
    },
    Read {
        config: PathBuf,
        catalog: Option<PathBuf>,
        state: Option<PathBuf>,
    },
}

impl Command {
    /// Parses `args` (without the binary name).
    pub fn parse(args: &[String]) -> Result<Self> {
        let mut iter = args.iter();
        let command = iter
            .next()
            .context("Missing command (expected spec, check, discover, or read)")?;

        let mut config = None;
        let mut catalog = None;
        let mut state = None;
        while let Some(flag) = iter.next() {
            let value = iter
                .next()
                .with_context(|| format!("Missing value for {}", flag))?;
            match flag.as_str() {
                "--config" => config = Some(PathBuf::from(value)),
                "--catalog" => catalog = Some(PathBuf::from(value)),
                "--state" => state = Some(PathBuf::from(value)),
                other => bail!("Unknown argument: {}", other),
            }
        }

        let require_config = |config: Option<PathBuf>| -> Result<PathBuf> {
            config.with_context(|| format!("{} requires --config <path>", command))
        };

        match command.as_str() {
            "spec" => Ok(Command::Spec),
            "check" => Ok(Command::Check {
                config: require_config(config)?,
            }),
            "discover" => Ok(Command::Discover {
                config: require_config(config)?,
            }),
            "read" => Ok(Command::Read {
                config: require_config(config)?,
                catalog,
                state,
            }),
            other => bail!(
                "Unknown command: {} (expected spec, check, discover, or read)",
                other
            ),
        }
    }
}

/// Runs one command against a source and exits when it completes.
pub async fn launch(source: &dyn Source, args: &[String]) -> Result<()> {
    let command = Command::parse(args)?;
    info!(source = source.name(), command = ?command, "Source starting");

    match command {
        Command::Spec => {
            Message::Spec {
                spec: source.spec(),
            }
            .emit()?;
        }
        Command::Check { config } => {
            let config = load_json(&config).await?;
            let (ok, message) = source.check_connection(&config).await?;
            let status = if ok {
                ConnectionStatus {
                    status: Status::Succeeded,
                    message: None,
                }
            } else {
                ConnectionStatus {
                    status: Status::Failed,
                    message,
                }
            };
            Message::ConnectionStatus {
                connection_status: status,
            }
            .emit()?;
        }
        Command::Discover { config } => {
            let config = load_json(&config).await?;
            let streams = source.streams(&config).await?;
            let catalog = Catalog {
                streams: streams
                    .iter()
                    .map(|s| CatalogStream {
                        name: s.name().to_string(),
                        json_schema: s.json_schema(),
                        supported_sync_modes: s.sync_modes(),
                    })
                    .collect(),
            };
            Message::Catalog { catalog }.emit()?;
        }
        Command::Read {
            config,
            catalog,
            state,
        } => {
            let config = load_json(&config).await?;
            let mut streams = source.streams(&config).await?;

            if let Some(path) = catalog {
                let configured: ConfiguredCatalog = serde_json::from_value(load_json(&path).await?)
                    .context("Failed to parse configured catalog")?;
                let selected: Vec<String> = configured
                    .streams
                    .into_iter()
                    .map(|s| s.stream.name)
                    .collect();
                streams.retain(|s| selected.iter().any(|name| name == s.name()));
            }

            if let Some(path) = state {
                let persisted = load_json(&path).await?;
                if let Value::Object(by_stream) = persisted {
                    for stream in streams.iter_mut() {
                        if let Some(value) = by_stream.get(stream.name()) {
                            stream.set_state(value.clone());
                        }
                    }
                }
            }

            for stream in &streams {
                let slices = stream.slices();
                info!(
                    stream = stream.name(),
                    slices = slices.len(),
                    "Reading stream"
                );
                let mut count = 0usize;
                for slice in &slices {
                    let records = stream.read_records(slice).await?;
                    count += records.len();
                    for record in records {
                        Message::Record { record }.emit()?;
                    }
                }
                info!(stream = stream.name(), records = count, "Stream complete");

                if let Some(snapshot) = stream.state() {
                    let mut by_stream = serde_json::Map::new();
                    by_stream.insert(stream.name().to_string(), snapshot);
                    Message::State {
                        state: StateMessage {
                            data: Value::Object(by_stream),
                        },
                    }
                    .emit()?;
                }
            }
        }
    }

    Ok(())
}

/// Reads and parses one JSON file.
async fn load_json(path: &Path) -> Result<Value> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}
