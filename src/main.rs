use anyhow::{Result, bail};
use clap::{CommandFactory, Parser};
use serde_json::Value;
use std::path::PathBuf;
use tracing::info;
use upstox_gateway::api::UpstoxClient;
use upstox_gateway::api::order::{PlaceOrderArgs, parse_segment};
use upstox_gateway::cli::{self, Output};
use upstox_gateway::config::Config;
use upstox_gateway::operation::Operation;
use upstox_gateway::server;
use upstox_gateway::tools::{ToolContext, mcp};

#[derive(Parser)]
#[command(
    name = "upstox",
    version,
    about = "Upstox brokerage gateway: CLI, HTTP proxy and agent tools"
)]
struct Cli {
    /// Run as an HTTP proxy instead of a one-shot command
    #[arg(short, long)]
    server: bool,

    /// Port for server mode
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Show the user profile
    GetProfile,

    /// Show funds and margin
    GetFundsMargin {
        /// SEC for equity, COM for commodity
        #[arg(long)]
        segment: Option<String>,
    },

    /// List long-term holdings
    LongTermHoldings,

    /// List short-term positions
    ShortTermPositions,

    /// List MTF positions
    MtfPositions,

    /// List the day's orders
    OrderBook,

    /// Place an order
    PlaceOrder {
        /// Instrument token, e.g. NSE_EQ|INE848E01016
        #[arg(long)]
        instrument: String,

        #[arg(long, allow_negative_numbers = true)]
        quantity: i64,

        /// BUY or SELL
        #[arg(long)]
        transaction: String,

        /// D, I, M, CO or BO
        #[arg(long, default_value = "D")]
        product: String,

        /// MARKET, LIMIT, SL or SL-M
        #[arg(long = "type", default_value = "MARKET")]
        order_type: String,

        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        price: f64,

        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        trigger: f64,

        /// DAY or IOC
        #[arg(long, default_value = "DAY")]
        validity: String,

        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        disclosed: i64,

        #[arg(long)]
        tag: Option<String>,

        /// After-market order
        #[arg(long)]
        amo: bool,

        /// Let the exchange slice large orders
        #[arg(long)]
        slice: bool,
    },

    /// Serve the agent tools over stdio (MCP)
    Mcp,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("upstox_gateway=info")),
        )
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    if cli.server {
        server::serve(&config).await?;
        return Ok(());
    }

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let client = UpstoxClient::from_config(&config)?;
    let token = config.access_token().map(String::from);

    let Some(op) = build_operation(command).transpose() else {
        let ctx = ToolContext::new(client, token);
        mcp::serve_stdio(&ctx).await?;
        return Ok(());
    };

    match cli::run_once(&client, token.as_deref(), op).await {
        Output::Print(v) => print_json(&v),
        Output::Nothing => Ok(()),
        Output::Failed(message) => bail!(message),
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = if cli.config.exists() {
        info!(path = %cli.config.display(), "loading config");
        Config::load(&cli.config)?
    } else {
        Config::from_env()
    };
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    config.validate()?;
    Ok(config)
}

/// `None` for commands that are not upstream operations.
fn build_operation(command: Command) -> upstox_gateway::error::Result<Option<Operation>> {
    let op = match command {
        Command::GetProfile => Operation::GetProfile,
        Command::GetFundsMargin { segment } => Operation::GetFundsMargin {
            segment: parse_segment(segment.as_deref())?,
        },
        Command::LongTermHoldings => Operation::LongTermHoldings,
        Command::ShortTermPositions => Operation::ShortTermPositions,
        Command::MtfPositions => Operation::MtfPositions,
        Command::OrderBook => Operation::OrderBook,
        Command::PlaceOrder {
            instrument,
            quantity,
            transaction,
            product,
            order_type,
            price,
            trigger,
            validity,
            disclosed,
            tag,
            amo,
            slice,
        } => Operation::PlaceOrder(
            PlaceOrderArgs {
                instrument_token: Some(instrument),
                quantity: Some(quantity),
                transaction_type: Some(transaction),
                product: Some(product),
                order_type: Some(order_type),
                validity: Some(validity),
                price: Some(price),
                trigger_price: Some(trigger),
                disclosed_quantity: Some(disclosed),
                is_amo: Some(amo),
                slice: Some(slice),
                tag,
            }
            .validate()?,
        ),
        Command::Mcp => return Ok(None),
    };
    Ok(Some(op))
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
