pub mod arguments;
pub mod scheduler;
pub mod watchtower;

use {
    alloy::providers::{Provider, ProviderBuilder},
    anyhow::{Context, Result},
    arguments::Arguments,
    clap::Parser,
    composable::{
        OrderCatalog,
        chain::AlloyChain,
        order_book::{OrderBookApi, OrderBookClient},
    },
    std::sync::Arc,
    watchtower::{Watchtower, load_multiplexers},
};

pub async fn start(args: impl Iterator<Item = String>) {
    let args = Arguments::parse_from(args);
    observe::tracing::initialize(&observe::Config {
        filter: args.log_filter.clone(),
        stderr_threshold: args.log_stderr_threshold.into_level(),
        format: match args.use_json_logs {
            true => observe::Format::Json,
            false => observe::Format::Text,
        },
    });
    tracing::info!("running watchtower with validated arguments:\n{}", args);

    if let Err(err) = run(args).await {
        tracing::error!(?err, "watchtower stopped");
        std::process::exit(1);
    }
}

/// Assumes tracing has already been set up.
pub async fn run(args: Arguments) -> Result<()> {
    let provider = ProviderBuilder::new()
        .connect_http(args.node_url.clone())
        .erased();
    let chain_id = provider.get_chain_id().await.context("chain id")?;

    let client = reqwest::Client::builder()
        .timeout(args.http_timeout)
        .build()?;
    let order_book: Arc<dyn OrderBookApi> = match args.orderbook_url.clone() {
        Some(url) => Arc::new(OrderBookClient::new(client, url)),
        None => Arc::new(OrderBookClient::for_chain(client, chain_id)?),
    };

    let multiplexers = load_multiplexers(&args.multiplexers, &OrderCatalog::default())?;
    tracing::info!(
        chain_id,
        multiplexers = multiplexers.len(),
        orders = multiplexers.iter().map(|m| m.len()).sum::<usize>(),
        "loaded multiplexers"
    );

    let mut watchtower = Watchtower::new(
        args.owner,
        chain_id,
        Arc::new(AlloyChain::new(provider)),
        order_book,
        multiplexers,
    )?;
    if let Err(err) = watchtower.check_roots().await {
        tracing::warn!(?err, "could not check committed roots");
    }

    let mut errors_in_a_row = 0;
    loop {
        match watchtower.single_run().await {
            Ok(_) => errors_in_a_row = 0,
            Err(err) if errors_in_a_row < args.errors_in_a_row_before_alert => {
                errors_in_a_row += 1;
                tracing::warn!(?err, "watchtower run error");
            }
            Err(err) => {
                errors_in_a_row = 0;
                tracing::error!(?err, "watchtower run error");
            }
        }
        tokio::time::sleep(args.poll_interval).await;
    }
}
