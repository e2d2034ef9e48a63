use {
    std::sync::Arc,
    walletflow::{
        config::{Config, OutputFormat},
        error::ScanError,
        pipeline::run_scan,
        rpc::HttpRpcClient,
    },
};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    // Logs go to stderr; stdout carries only the report
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    if let Err(e) = run().await {
        log::error!("❌ {}", e);
        eprintln!("walletflow: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), ScanError> {
    let config = Config::from_env()?;

    log::info!("🚀 Starting walletflow...");
    log::info!("📊 Configuration:");
    log::info!("   API_ENDPOINT: {}", config.api_endpoint);
    log::info!("   Block window: {}", config.block_window);
    log::info!(
        "   Fetch attempts: {} (timeout {}s)",
        config.max_fetch_attempts,
        config.rpc_timeout.as_secs()
    );
    log::info!("   Event buffer: {}", config.event_buffer);

    let client = HttpRpcClient::from_config(&config).map_err(ScanError::Client)?;
    let report = run_scan(Arc::new(client), &config.scan_settings()).await?;

    match config.output_format {
        OutputFormat::Text => println!("{}", report),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report)
                .map_err(|e| ScanError::Output(e.to_string()))?;
            println!("{}", json);
        }
    }

    Ok(())
}
