use clap::Parser;
use seqmgr_core::{DeletePolicy, WorkflowConfig};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "seqmgr-studio")]
#[command(about = "seqmgr Studio - manage change-capture sequences over HTTP")]
#[command(version)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "3000")]
    pub port: u16,

    /// Address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Directory for the sequence store (default: temporary)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// JSON fixture with databases, publication members and consumers
    /// (default: built-in demo data)
    #[arg(long)]
    pub seed: Option<PathBuf>,

    /// Session timeout in minutes
    #[arg(long, default_value_t = 60)]
    pub session_timeout: u64,

    /// Maximum concurrent sessions
    #[arg(long, default_value_t = 10)]
    pub max_sessions: usize,

    /// Refuse to delete sequences that consumers still reference
    #[arg(long, default_value_t = false)]
    pub block_delete_in_use: bool,

    /// Verify publications and read tables from the seeded databases' URLs
    #[cfg(feature = "postgres")]
    #[arg(long, default_value_t = false)]
    pub live_publication_check: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Debug, Clone)]
pub struct StudioConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: Option<PathBuf>,
    pub seed: Option<PathBuf>,
    pub session_timeout: Duration,
    pub max_sessions: usize,
    pub workflow: WorkflowConfig,
    pub live_publication_check: bool,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            data_dir: None,
            seed: None,
            session_timeout: Duration::from_secs(60 * 60),
            max_sessions: 10,
            workflow: WorkflowConfig::default(),
            live_publication_check: false,
        }
    }
}

impl From<Args> for StudioConfig {
    fn from(args: Args) -> Self {
        let delete_policy = if args.block_delete_in_use {
            DeletePolicy::Block
        } else {
            DeletePolicy::Warn
        };

        #[cfg(feature = "postgres")]
        let live_publication_check = args.live_publication_check;
        #[cfg(not(feature = "postgres"))]
        let live_publication_check = false;

        Self {
            host: args.host,
            port: args.port,
            data_dir: args.data_dir,
            seed: args.seed,
            session_timeout: Duration::from_secs(args.session_timeout * 60),
            max_sessions: args.max_sessions,
            workflow: WorkflowConfig::new().with_delete_policy(delete_policy),
            live_publication_check,
        }
    }
}

impl StudioConfig {
    /// Set the maximum number of sessions.
    pub fn with_max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = max;
        self
    }

    /// Set the session timeout.
    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    /// Set the workflow configuration.
    pub fn with_workflow(mut self, workflow: WorkflowConfig) -> Self {
        self.workflow = workflow;
        self
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_args() {
        let args = Args::try_parse_from(["seqmgr-studio"]).unwrap();
        let config = StudioConfig::from(args);

        assert_eq!(config.listen_addr(), "127.0.0.1:3000");
        assert_eq!(config.session_timeout, Duration::from_secs(3600));
        assert_eq!(config.workflow.delete_policy, DeletePolicy::Warn);
        assert!(config.seed.is_none());
        assert!(!config.live_publication_check);
    }

    #[test]
    fn test_args_into_config() {
        let args = Args::try_parse_from([
            "seqmgr-studio",
            "--port",
            "8080",
            "--host",
            "0.0.0.0",
            "--data-dir",
            "/var/lib/seqmgr",
            "--session-timeout",
            "5",
            "--max-sessions",
            "3",
            "--block-delete-in-use",
        ])
        .unwrap();
        let config = StudioConfig::from(args);

        assert_eq!(config.base_url(), "http://0.0.0.0:8080");
        assert_eq!(config.data_dir, Some(PathBuf::from("/var/lib/seqmgr")));
        assert_eq!(config.session_timeout, Duration::from_secs(300));
        assert_eq!(config.max_sessions, 3);
        assert!(config.workflow.blocks_in_use_delete());
    }
}
