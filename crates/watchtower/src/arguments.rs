use {
    alloy::primitives::Address,
    std::{
        fmt::{self, Display, Formatter},
        path::PathBuf,
        time::Duration,
    },
    tracing::level_filters::LevelFilter,
    url::Url,
};

#[derive(clap::Parser)]
pub struct Arguments {
    /// The Ethereum node URL to connect to.
    #[clap(long, env, default_value = "http://localhost:8545")]
    pub node_url: Url,

    /// Base URL of the order book API. Defaults to the production API of the
    /// node's chain.
    #[clap(long, env)]
    pub orderbook_url: Option<Url>,

    /// The safe owning the conditional orders.
    #[clap(long, env)]
    pub owner: Address,

    /// Files containing multiplexers serialized as JSON, separated by commas.
    #[clap(long, env, use_value_delimiter = true, required = true)]
    pub multiplexers: Vec<PathBuf>,

    /// Time between two polls of the orders.
    #[clap(long, env, default_value = "12s", value_parser = humantime::parse_duration)]
    pub poll_interval: Duration,

    /// Timeout of order book requests.
    #[clap(long, env, default_value = "10s", value_parser = humantime::parse_duration)]
    pub http_timeout: Duration,

    /// How many failed runs in a row are logged as warnings before they are
    /// reported as errors.
    #[clap(long, env, default_value = "5")]
    pub errors_in_a_row_before_alert: u32,

    #[clap(long, env, default_value = "warn,watchtower=debug,composable=debug")]
    pub log_filter: String,

    #[clap(long, env, default_value = "error")]
    pub log_stderr_threshold: LevelFilter,

    #[clap(long, env)]
    pub use_json_logs: bool,
}

impl Display for Arguments {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Self {
            node_url: _,
            orderbook_url,
            owner,
            multiplexers,
            poll_interval,
            http_timeout,
            errors_in_a_row_before_alert,
            log_filter,
            log_stderr_threshold,
            use_json_logs,
        } = self;

        writeln!(f, "node_url: SECRET")?;
        writeln!(f, "orderbook_url: {orderbook_url:?}")?;
        writeln!(f, "owner: {owner}")?;
        writeln!(f, "multiplexers: {multiplexers:?}")?;
        writeln!(f, "poll_interval: {poll_interval:?}")?;
        writeln!(f, "http_timeout: {http_timeout:?}")?;
        writeln!(
            f,
            "errors_in_a_row_before_alert: {errors_in_a_row_before_alert}"
        )?;
        writeln!(f, "log_filter: {log_filter}")?;
        writeln!(f, "log_stderr_threshold: {log_stderr_threshold}")?;
        writeln!(f, "use_json_logs: {use_json_logs}")?;
        Ok(())
    }
}
