use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use quoterie::QuoterieError;
use quoterie::auth::Credentials;
use quoterie::config::fetch_config;
use quoterie::engine::Engine;
use quoterie::feed::market::MarketFeed;
use quoterie::feed::private::PrivateFeed;
use quoterie::instrument::inst_type_from_inst_id;
use quoterie::monitor::{BookConsistencyMonitor, SpotTickerPoller};
use quoterie::params::ParamsLoader;
use quoterie::state::{MarketState, OrderCache, PortfolioState, shared};
use quoterie::strategy::SampleMaker;
use quoterie::trade::TradeClient;

#[tokio::main]
async fn main() -> Result<(), QuoterieError> {
    // Initialize tracing subscriber for logging output.
    tracing_subscriber::fmt::init();

    let app_config = fetch_config()?;
    let exchange = app_config.exchange;
    let (Some(api_key), Some(secret_key), Some(passphrase)) = (
        exchange.api_key.clone(),
        exchange.secret_key.clone(),
        exchange.passphrase.clone(),
    ) else {
        return Err(QuoterieError::Config(
            "OKX_API_KEY, OKX_SECRET_KEY and OKX_PASSPHRASE are required".to_string(),
        ));
    };
    // REST client and private feed each sign independently.
    let rest_credentials = Credentials::new(api_key.clone(), secret_key.clone(), passphrase.clone());
    let feed_credentials = Credentials::new(api_key, secret_key, passphrase);

    let trade = Arc::new(TradeClient::new(exchange.rest_url.clone(), rest_credentials));

    // Instrument metadata drives tick/lot conformance and risk valuation.
    let inst_type = inst_type_from_inst_id(&app_config.inst_id)?;
    let instruments: HashMap<_, _> = trade
        .instruments(inst_type)
        .await?
        .into_iter()
        .map(|i| (i.inst_id.clone(), i))
        .collect();
    let instrument = instruments
        .get(&app_config.inst_id)
        .cloned()
        .ok_or_else(|| QuoterieError::InstrumentNotFound(app_config.inst_id.clone()))?;
    info!(
        inst_id = %instrument.inst_id,
        tick_sz = %instrument.tick_sz,
        lot_sz = %instrument.lot_sz,
        "Trading instrument resolved"
    );

    let market = shared(MarketState::new());
    let portfolio = shared(PortfolioState::new());
    let orders = shared(OrderCache::new());

    let (market_cmd_tx, market_cmd_rx) = mpsc::unbounded_channel();
    tokio::spawn(
        MarketFeed::new(
            exchange.public_ws_url.clone(),
            app_config.inst_id.clone(),
            market.clone(),
            market_cmd_rx,
        )
        .run(),
    );
    tokio::spawn(
        PrivateFeed::new(
            exchange.private_ws_url.clone(),
            feed_credentials,
            orders.clone(),
            portfolio.clone(),
        )
        .run(),
    );
    tokio::spawn(BookConsistencyMonitor::new(market.clone(), market_cmd_tx.clone()).run());
    // Spot tickers back USDT valuation of currencies outside the traded
    // instrument's subscriptions.
    tokio::spawn(SpotTickerPoller::new(trade.clone(), market.clone()).run());

    let params = ParamsLoader::new(&app_config.params_file)?;
    Engine::new(
        instrument,
        instruments,
        market,
        portfolio,
        orders,
        market_cmd_tx,
        trade,
        SampleMaker,
        params,
    )
    .run()
    .await;

    Ok(())
}
