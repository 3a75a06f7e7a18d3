use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "modelmon")]
#[command(about = "Inspect model endpoint monitoring records", long_about = None)]
pub struct Args {
    /// Model monitoring API URL
    #[arg(
        long,
        env = "MODELMON_API_URL",
        default_value = "http://127.0.0.1:18100"
    )]
    pub api_url: String,

    /// Session key forwarded to the KV and time-series stores
    #[arg(long, env = "V3IO_ACCESS_KEY")]
    pub session_key: Option<String>,

    /// Print raw JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Model endpoint records
    Endpoints {
        #[command(subcommand)]
        subcommand: EndpointsCommand,
    },
}

#[derive(Debug, ClapArgs)]
pub struct WindowArgs {
    /// Window start (`now-1h`, RFC 3339, epoch millis)
    #[arg(long)]
    pub start: Option<String>,

    /// Window end
    #[arg(long)]
    pub end: Option<String>,

    /// Attach metrics; bare flag requests the default set
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_name = "NAMES")]
    pub metrics: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum EndpointsCommand {
    /// List endpoints of a project
    List {
        #[arg(long)]
        project: String,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        function: Option<String>,
        #[arg(long)]
        tag: Option<String>,
        /// `key` or `key=value` (repeatable)
        #[arg(long = "label")]
        labels: Vec<String>,
        #[command(flatten)]
        window: WindowArgs,
    },
    /// Show one endpoint
    Get {
        #[arg(long)]
        project: String,
        endpoint_id: String,
        /// Include feature statistics
        #[arg(long)]
        features: bool,
        #[command(flatten)]
        window: WindowArgs,
    },
    /// Delete an endpoint record
    Clear {
        #[arg(long)]
        project: String,
        endpoint_id: String,
    },
}
