//! CLI binary for the federated search aggregator.

use clap::Parser;
use fedsearch::cli::Cli;
use fedsearch::render::{emitted, render_page, to_pretty_json};
use fedsearch::{AppConfig, AppError};
use federated_search::{Aggregator, HttpTransport, SearchSession};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("fedsearch=info,federated_search=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if cli.pages == 0 {
        return Err(AppError::Usage("--pages must be at least 1".into()).into());
    }

    let config = match cli.config {
        Some(ref path) => AppConfig::from_file(path)?,
        None => {
            let path = AppConfig::default_config_path();
            if path.exists() {
                AppConfig::from_file(&path)?
            } else {
                AppConfig::default()
            }
        }
    };
    let taxonomy = if cli.facets { config.load_taxonomy()? } else { None };

    let transport = HttpTransport::new(&config.search)?;
    let sorts = config.sorts.clone().unwrap_or_default();
    let aggregator = Aggregator::with_sorts(transport, config.search.clone(), sorts)?;
    let mut session = SearchSession::new();
    let mut request = cli.to_request();

    for page in 0..cli.pages {
        let Some(response) = aggregator.execute(&mut session, &request).await? else {
            info!("empty query, nothing to do");
            break;
        };
        let rendered = render_page(&request, &response, taxonomy.as_ref())?;
        println!("{}", to_pretty_json(&rendered)?);

        let count = emitted(&response);
        if count == 0 {
            break;
        }
        info!(page, count, secondary = session.use_secondary, "page fetched");

        let start = request.start.unwrap_or(0) + count;
        request.start = Some(start);
        request.aggregations_to_update.clear();
    }

    Ok(())
}
