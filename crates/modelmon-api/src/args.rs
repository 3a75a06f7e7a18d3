use std::path::PathBuf;

use clap::Parser;

use modelmon_api::config::{DEFAULT_CONTAINER, KV_API_ENV, TSDB_API_ENV};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    #[arg(long, env = "MODELMON_API_ADDR", default_value = "0.0.0.0:18100")]
    pub listen_addr: String,

    /// KV web API address; `tcp://host:port` is accepted.
    #[arg(long, env = KV_API_ENV)]
    pub kv_api: Option<String>,

    /// Time-series (frames) service address.
    #[arg(long, env = TSDB_API_ENV)]
    pub tsdb_api: Option<String>,

    #[arg(long, env = "MODELMON_CONTAINER", default_value = DEFAULT_CONTAINER)]
    pub container: String,

    /// Per-request store timeout in seconds.
    #[arg(long, env = "MODELMON_STORE_TIMEOUT_SECS", default_value_t = 30)]
    pub store_timeout_secs: u64,

    /// Attempts per store call, including the first.
    #[arg(long, env = "MODELMON_STORE_RETRIES", default_value_t = 3)]
    pub store_attempts: u32,

    /// Serve from process-local stores instead of the KV/time-series services.
    #[arg(long, env = "MODELMON_IN_MEMORY", default_value_t = false)]
    pub in_memory: bool,

    /// JSON fixture loaded into the in-memory stores at startup.
    #[arg(long, env = "MODELMON_SEED_FILE", requires = "in_memory")]
    pub seed_file: Option<PathBuf>,

    /// OTLP endpoint for exporting traces.
    #[arg(long, env = "MODELMON_OTLP_URL")]
    pub otlp_endpoint: Option<String>,

    #[arg(long, env = "MODELMON_OTLP_TOKEN")]
    pub otlp_token: Option<String>,
}
