use clap::Parser;
use pkg_api::server::{ServerConfig, start_server};
use pkg_constants::paths::{DEFAULT_SERVER_CONFIG, DEFAULT_SERVER_DATA_DIR, DEFAULT_SERVER_PORT};
use pkg_controllers::resourcequota::QuotaControllerConfig;
use pkg_types::config::{ServerConfigFile, load_config_file};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "k3rs-quota", about = "k3rs resource quota server")]
struct Cli {
    /// Path to YAML config file
    #[arg(long, short, default_value = DEFAULT_SERVER_CONFIG)]
    config: String,

    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Directory for SlateDB state storage
    #[arg(long)]
    data_dir: Option<String>,

    /// Seconds between full quota resync sweeps
    #[arg(long)]
    resync_interval_secs: Option<u64>,

    /// Namespaces synced concurrently by the quota controller
    #[arg(long)]
    workers: Option<usize>,

    /// Log output format: text or json
    #[arg(long)]
    log_format: Option<String>,
}

fn init_tracing(format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load config file (returns defaults if file not found)
    let file_cfg: ServerConfigFile = load_config_file(&cli.config)?;

    let log_format = cli
        .log_format
        .or(file_cfg.log_format)
        .unwrap_or_else(|| "text".to_string());
    init_tracing(&log_format);
    info!("Config file: {}", cli.config);

    // Merge: CLI args > config file > defaults
    let port = cli.port.or(file_cfg.port).unwrap_or(DEFAULT_SERVER_PORT);
    let data_dir = cli
        .data_dir
        .or(file_cfg.data_dir)
        .unwrap_or_else(|| DEFAULT_SERVER_DATA_DIR.to_string());
    let defaults = QuotaControllerConfig::default();
    let controller = QuotaControllerConfig {
        resync_interval: cli
            .resync_interval_secs
            .or(file_cfg.resync_interval_secs)
            .map(Duration::from_secs)
            .unwrap_or(defaults.resync_interval),
        workers: cli
            .workers
            .or(file_cfg.sync_workers)
            .unwrap_or(defaults.workers),
    };
    if controller.resync_interval.is_zero() {
        anyhow::bail!("resync interval must be at least one second");
    }

    info!("Starting k3rs-quota");
    info!("  Port:      {}", port);
    info!("  Data dir:  {}", data_dir);
    info!("  Resync:    {}s", controller.resync_interval.as_secs());
    info!("  Workers:   {}", controller.workers);

    let config = ServerConfig {
        addr: SocketAddr::from(([0, 0, 0, 0], port)),
        data_dir,
        controller,
    };

    start_server(config).await?;

    Ok(())
}
