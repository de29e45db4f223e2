use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

use crate::aggregate::Granularity;
use crate::auth::Token;
use crate::config::Config;
use crate::error::ConfigError;
use crate::orchestrator::Orchestrator;
use crate::output::{bright_green, PreviewFormat, PreviewSink};
use crate::persist::{FileProvider, HttpObjectStore, ObjectAcl, ObjectStoreProvider, PersistenceProvider};
use crate::source::{JsonFileSource, PipelineStateSource};

#[derive(Parser)]
#[command(name = "cctray")]
#[command(author, version, about = "Pipeline status feed publisher", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./cctray.toml, .json, .yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// JSON document with the current pipeline snapshots
    #[arg(short, long, global = true, env = "CCTRAY_STATE")]
    state: Option<PathBuf>,

    /// One feed entry per pipeline or per pipeline stage
    #[arg(short, long, global = true, value_enum)]
    granularity: Option<Granularity>,

    /// Overall time budget for one cycle, in seconds
    #[arg(long, global = true)]
    deadline_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish the feed to an S3-compatible object store
    S3 {
        /// Target bucket
        #[arg(long, env = "BUCKET")]
        bucket: Option<String>,

        /// Target object key
        #[arg(long, env = "KEY")]
        key: Option<String>,

        /// Object store endpoint
        #[arg(long, env = "CCTRAY_S3_ENDPOINT")]
        endpoint: Option<String>,

        /// Bearer token for the object store
        #[arg(long, env = "CCTRAY_S3_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Upload timeout in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Write the feed to a local file
    File {
        /// Target file (defaults to file.path from the configuration)
        path: Option<PathBuf>,
    },

    /// Print the feed without publishing it
    Preview {
        #[arg(short, long, value_enum, default_value_t = PreviewFormat::Table)]
        format: PreviewFormat,
    },
}

impl Cli {
    fn load_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;

        if let Some(state) = &self.state {
            config.source.path = state.clone();
        }
        if let Some(granularity) = self.granularity {
            config.feed.granularity = granularity;
        }
        if let Some(deadline_secs) = self.deadline_secs {
            config.cycle.deadline_secs = deadline_secs;
        }

        match &self.command {
            Commands::S3 {
                bucket,
                key,
                endpoint,
                token,
                timeout_secs,
            } => {
                let s3 = &mut config.s3;
                if bucket.is_some() {
                    s3.bucket.clone_from(bucket);
                }
                if key.is_some() {
                    s3.key.clone_from(key);
                }
                if let Some(endpoint) = endpoint {
                    s3.endpoint.clone_from(endpoint);
                }
                if token.is_some() {
                    s3.token.clone_from(token);
                }
                if let Some(timeout_secs) = timeout_secs {
                    s3.timeout_secs = *timeout_secs;
                }
            }
            Commands::File { path: Some(path) } => {
                config.file.path = Some(path.clone());
            }
            Commands::File { path: None } | Commands::Preview { .. } => {}
        }

        config.cycle.validate()?;
        Ok(config)
    }

    /// Builds the sink for the selected command, failing on missing settings
    /// before any cycle runs.
    fn build_sink(&self, config: &Config) -> Result<Arc<dyn PersistenceProvider>> {
        let sink: Arc<dyn PersistenceProvider> = match &self.command {
            Commands::S3 { .. } => {
                let (bucket, key) = config.s3.address()?;
                let token = config.s3.token.as_deref().map(Token::from);
                let store = HttpObjectStore::new(&config.s3.endpoint, token)?;
                let acl = if config.s3.public_read {
                    ObjectAcl::PublicRead
                } else {
                    ObjectAcl::Private
                };

                Arc::new(
                    ObjectStoreProvider::new(Arc::new(store), bucket, key)
                        .with_timeout(config.s3.timeout())
                        .with_acl(acl),
                )
            }
            Commands::File { .. } => {
                let path = config
                    .file
                    .path
                    .clone()
                    .ok_or(ConfigError::Missing("file.path"))?;
                Arc::new(FileProvider::new(path))
            }
            Commands::Preview { format } => Arc::new(PreviewSink::new(*format, std::io::stdout())),
        };

        Ok(sink)
    }

    pub async fn execute(&self) -> Result<()> {
        let config = self.load_config()?;
        let sink = self.build_sink(&config)?;
        let source: Arc<dyn PipelineStateSource> =
            Arc::new(JsonFileSource::new(&config.source.path));

        info!(
            "Publishing {:?} feed from {} to {}",
            config.feed.granularity,
            config.source.path.display(),
            sink.target()
        );

        let orchestrator = Orchestrator::new(source, sink, config.feed.granularity)
            .with_deadline(config.cycle.deadline())
            .with_persist_reserve(config.cycle.persist_reserve());

        let report = orchestrator
            .run_cycle()
            .await
            .context("Status cycle failed, previously published feed left unchanged")?;

        if !matches!(self.command, Commands::Preview { .. }) {
            eprintln!(
                "{} Published {} projects to {} in {:.1}s",
                bright_green("✓"),
                report.projects.len(),
                report.target,
                report.elapsed.as_secs_f64()
            );
        }

        Ok(())
    }
}
