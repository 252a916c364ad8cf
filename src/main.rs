//! Earn Rebalancer - Main Entry Point

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use earn_rebalancer::api::{create_router, AppState, RebalanceResponse, RedeemResponse};
use earn_rebalancer::config::Config;
use earn_rebalancer::exchange::{BinanceClient, ExchangeGateway, MockExchange};
use earn_rebalancer::rebalance::{EngineSettings, RebalanceEngine, RebalanceRequest};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Earn Rebalancer CLI
#[derive(Parser)]
#[command(name = "earn-rebalancer")]
#[command(version, about = "50/50 spot rebalancing with Simple Earn redemption on Binance")]
struct Cli {
    /// Use the in-memory mock exchange instead of Binance
    #[arg(long, global = true)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default)
    Serve {
        /// Listen port, overrides configuration
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the current price of a symbol
    Price {
        /// Trading pair, e.g. BTCUSDT
        symbol: String,
    },

    /// Run one rebalance and print the result
    Rebalance {
        /// Base asset, e.g. BTC
        #[arg(long)]
        base: String,

        /// Quote asset, e.g. USDT
        #[arg(long)]
        quote: String,

        /// Base asset quantity held
        #[arg(long)]
        base_qty: Decimal,

        /// Quote asset quantity held
        #[arg(long)]
        quote_qty: Decimal,

        /// Simulate only, never redeem or trade
        #[arg(long)]
        dev: bool,
    },

    /// Redeem an amount from flexible Simple Earn
    Redeem {
        #[arg(long)]
        asset: String,

        #[arg(long)]
        amount: Decimal,

        /// Simulate only
        #[arg(long)]
        dev: bool,
    },
}

/// Trading mode: Live (real Binance) or Mock (paper trading).
#[derive(Debug, Clone, Copy, PartialEq)]
enum TradingMode {
    Live,
    Mock,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging()?;

    let config = Config::load()?;
    config.validate()?;

    let trading_mode = if cli.mock {
        TradingMode::Mock
    } else {
        TradingMode::Live
    };
    let engine = Arc::new(build_engine(&config, trading_mode).await?);

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => serve(config, engine, trading_mode, port).await,
        Commands::Price { symbol } => {
            let quote = engine.quote(&symbol).await?;
            print_json(&quote)
        }
        Commands::Rebalance {
            base,
            quote,
            base_qty,
            quote_qty,
            dev,
        } => {
            let simulate = dev || config.environment.is_development();
            let request = RebalanceRequest::new(
                base,
                quote,
                base_qty,
                quote_qty,
                config.rebalance.max_trade_value_usd,
            )
            .with_simulate(simulate);

            let report = engine.run(&request).await.map_err(|e| {
                if e.funds_redeemed() {
                    error!(pair = %request.pair_key(), error = %e, "Redeemed funds were left in spot");
                }
                e
            })?;
            print_json(&RebalanceResponse::from_report(&request, report))
        }
        Commands::Redeem { asset, amount, dev } => {
            let simulate = dev || config.environment.is_development();
            let outcome = engine.redeem(&asset, amount, simulate).await?;
            print_json(&RedeemResponse::new(outcome))
        }
    }
}

async fn build_engine(config: &Config, mode: TradingMode) -> Result<RebalanceEngine> {
    let gateway: Arc<dyn ExchangeGateway> = match mode {
        TradingMode::Live => {
            if config.binance.api_key.is_empty() || config.binance.secret_key.is_empty() {
                warn!("⚠️  No API keys provided. Signed calls (redeem, orders) will be rejected.");
            }
            Arc::new(BinanceClient::new(&config.binance)?)
        }
        TradingMode::Mock => {
            info!("📝 MOCK EXCHANGE - Paper trading enabled");
            Arc::new(MockExchange::with_demo_markets().await)
        }
    };

    Ok(RebalanceEngine::new(gateway, EngineSettings::from(&config.rebalance)))
}

async fn serve(
    mut config: Config,
    engine: Arc<RebalanceEngine>,
    mode: TradingMode,
    port: Option<u16>,
) -> Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }

    info!("╔════════════════════════════════════════════════════════════╗");
    info!(
        "║              Earn Rebalancer v{} - {:<6}                ║",
        env!("CARGO_PKG_VERSION"),
        format!("{mode:?}")
    );
    info!("╚════════════════════════════════════════════════════════════╝");
    log_config(&config);

    let state = Arc::new(AppState::from_config(engine, &config));
    let router = create_router(state);

    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("✅ Server started on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("🛑 Shutdown signal received");
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Initialize logging to stdout and an hourly rolling file.
fn init_logging() -> Result<()> {
    use tracing_subscriber::fmt::writer::MakeWriterExt;

    std::fs::create_dir_all("logs")?;

    let file_appender = tracing_appender::rolling::hourly("logs", "earn-rebalancer.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);

    // Leak the guard to keep it alive for the program duration
    Box::leak(Box::new(_guard));

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("earn_rebalancer=debug".parse()?)
                .add_directive(Level::INFO.into()),
        )
        .with_writer(std::io::stdout.and(file_writer))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .init();

    Ok(())
}

/// Log configuration on startup.
fn log_config(config: &Config) {
    info!("📋 Configuration:");
    info!("   Environment: {:?}", config.environment);
    info!("   Binance Testnet: {}", config.binance.testnet);
    info!("   Max Trade Value: ${}", config.rebalance.max_trade_value_usd);
    info!("   Settlement Delay: {}s", config.rebalance.settlement_delay_secs);
    info!("   Redeem Buffer: {}x", config.rebalance.redeem_buffer);
    info!("   Serialize Pairs: {}", config.rebalance.serialize_pairs);
    if config.environment.is_development() {
        warn!("🧪 DEVELOPMENT MODE - every rebalance is simulated");
    }
}
