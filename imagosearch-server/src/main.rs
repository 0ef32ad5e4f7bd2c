use anyhow::Result;
use clap::Parser;
use imago::api::ApiServer;
use imago::config::Config;
use imago::{ElasticsearchClient, SearchService};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "imago-server")]
#[command(about = "Imago media search API server")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "imago.toml")]
    config: String,

    /// Host to bind to (overrides server.bind_addr)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides server.bind_addr)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(std::path::Path::new(&args.config))?;

    // Initialize tracing; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));
    let registry = tracing_subscriber::registry().with(filter);
    if config.observability.log_format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Config file: {}", args.config);
    tracing::info!(
        "Elasticsearch at {} (index '{}')",
        config.elasticsearch.url(),
        config.elasticsearch.index
    );

    let metrics = if config.observability.metrics_enabled {
        Some(PrometheusBuilder::new().install_recorder()?)
    } else {
        None
    };

    let engine = Arc::new(ElasticsearchClient::new(&config.elasticsearch)?);
    let service = Arc::new(SearchService::from_config(engine, &config));

    let mut server = ApiServer::with_cors(service, config.server.cors.clone());
    if let Some(handle) = metrics {
        server = server.with_metrics(handle);
    }

    let addr = bind_addr(&config.server.bind_addr, args.host, args.port);
    tracing::info!("Starting Imago search server on {}", addr);

    server.serve(&addr).await?;

    Ok(())
}

/// Apply CLI host/port overrides to the configured `host:port`
fn bind_addr(configured: &str, host: Option<String>, port: Option<u16>) -> String {
    let (conf_host, conf_port) = configured.rsplit_once(':').unwrap_or((configured, "8000"));
    let host = host.unwrap_or_else(|| conf_host.to_string());
    let port = port.map_or_else(|| conf_port.to_string(), |p| p.to_string());
    format!("{}:{}", host, port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_addr_overrides() {
        assert_eq!(bind_addr("127.0.0.1:8000", None, None), "127.0.0.1:8000");
        assert_eq!(bind_addr("127.0.0.1:8000", Some("0.0.0.0".into()), None), "0.0.0.0:8000");
        assert_eq!(bind_addr("127.0.0.1:8000", None, Some(9000)), "127.0.0.1:9000");
        assert_eq!(bind_addr("localhost", None, None), "localhost:8000");
    }
}
