use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chronos_ldp::config::{RuntimeProfile, ServerConfig, DEFAULT_ADDR, DEFAULT_MAX_BODY_BYTES};
use chronos_ldp::controller::VersioningController;
use chronos_ldp::server::LdpServer;
use chronos_ldp::Repository;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Clone, Debug)]
#[clap(author, version, about = "Versioned LDP repository with Memento TimeMaps", long_about = None)]
struct Args {
    #[clap(long, default_value = DEFAULT_ADDR)]
    addr: String,

    /// Public base URL of resources. Defaults to http://{addr}.
    #[clap(long)]
    base_url: Option<String>,

    /// Journal file. Without one the repository lives in memory.
    #[clap(long)]
    journal: Option<PathBuf>,

    /// fsync every journal append.
    #[clap(long)]
    strict_durability: bool,

    #[clap(long)]
    worker_threads: Option<usize>,

    /// Where constraint documents are published.
    #[clap(long)]
    constraints_url: Option<String>,

    /// Also type TimeMap RDF bodies as memento:TimeMap.
    #[clap(long)]
    timemap_body_typing: bool,

    #[clap(long, default_value_t = DEFAULT_MAX_BODY_BYTES)]
    max_body_bytes: u64,
}

impl Args {
    fn server_config(&self) -> ServerConfig {
        let mut config = ServerConfig::new(&self.addr, self.base_url.as_deref());
        if let Some(url) = &self.constraints_url {
            config.constraints_url = url.trim_end_matches('/').to_string();
        }
        config.journal = self.journal.clone();
        config.strict_durability = self.strict_durability;
        config.timemap_body_typing = self.timemap_body_typing;
        config.max_body_bytes = self.max_body_bytes;
        config
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,chronos_ldp=info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let profile = RuntimeProfile::detect().with_worker_threads(args.worker_threads);
    let config = args.server_config();

    info!("--- [Chronos LDP] ---");
    info!("Detected Cores: {}", profile.logical_cores);
    info!("Worker Threads: {}", profile.worker_threads);
    info!(
        "Durability Mode: {}",
        match (&config.journal, config.strict_durability) {
            (None, _) => "In-Memory",
            (Some(_), true) => "Strict (Fsync)",
            (Some(_), false) => "High Throughput (Async)",
        }
    );

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(profile.worker_threads)
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Could not start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(async_main(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn async_main(config: ServerConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let repository = match &config.journal {
        Some(path) => {
            info!("Opening journal {}", path.display());
            Repository::open(path, config.strict_durability)?
        }
        None => Repository::in_memory(),
    };

    let addr = config.addr.clone();
    let controller = Arc::new(VersioningController::new(Arc::new(repository), config));
    LdpServer::new(controller).run(&addr).await
}
