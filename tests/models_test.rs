//! Deserialization tests for the OKX WebSocket V5 and REST model types,
//! plus end-to-end book maintenance over recorded fixture messages.

use rust_decimal_macros::dec;

use quoterie::book::OrderBook;
use quoterie::models::account::{AccountPush, PositionsPush};
use quoterie::models::book::{BookAction, BookPush};
use quoterie::models::instrument::{CtType, InstState, Instrument, InstType, RestResponse};
use quoterie::models::order::{OrderSide, OrderState, OrderType, OrdersPush, PosSide, TdMode};
use quoterie::models::request::OrderAck;
use quoterie::models::ticker::{MarkPricePush, TickerPush};

const BOOKS_SNAPSHOT_JSON: &str = include_str!("fixtures/books_snapshot.json");
const BOOKS_UPDATE_JSON: &str = include_str!("fixtures/books_update.json");
const ORDERS_JSON: &str = include_str!("fixtures/orders.json");
const ACCOUNT_JSON: &str = include_str!("fixtures/account.json");
const POSITIONS_JSON: &str = include_str!("fixtures/positions.json");
const TICKERS_JSON: &str = include_str!("fixtures/tickers.json");
const MARK_PRICE_JSON: &str = include_str!("fixtures/mark_price.json");
const BATCH_ORDERS_RESPONSE_JSON: &str = include_str!("fixtures/batch_orders_response.json");
const INSTRUMENTS_JSON: &str = include_str!("fixtures/instruments.json");

#[test]
fn test_books_snapshot_deserializes() {
    let push: BookPush =
        serde_json::from_str(BOOKS_SNAPSHOT_JSON).expect("Failed to deserialize book snapshot");

    assert_eq!(push.arg.channel, "books");
    assert_eq!(push.arg.inst_id.as_deref(), Some("BTC-USDT"));
    assert_eq!(push.effective_action(), BookAction::Snapshot);

    let data = &push.data[0];
    assert_eq!(data.asks.len(), 3);
    assert_eq!(data.bids.len(), 3);
    assert_eq!(data.asks[0], ["8476.98", "415", "0", "13"]);
    assert_eq!(data.ts, "1597026383085");
    assert_eq!(data.checksum, Some(242848535));
}

#[test]
fn test_book_apply_snapshot_then_update_verifies() {
    let snapshot: BookPush = serde_json::from_str(BOOKS_SNAPSHOT_JSON).unwrap();
    let update: BookPush = serde_json::from_str(BOOKS_UPDATE_JSON).unwrap();

    let mut book = OrderBook::new("BTC-USDT");
    book.apply(snapshot.effective_action(), &snapshot.data[0])
        .expect("snapshot should apply");
    assert!(book.verify(), "snapshot checksum should match");
    assert_eq!(book.best_bid_price().unwrap(), dec!(8476.97));
    assert_eq!(book.best_ask_price().unwrap(), dec!(8476.98));

    book.apply(update.effective_action(), &update.data[0])
        .expect("update should apply");
    assert!(book.verify(), "post-update checksum should match");
    // the 8477 ask was deleted, 8477.5 inserted, best bid resized
    assert_eq!(book.asks().len(), 3);
    assert_eq!(book.best_bid().unwrap().quantity, dec!(300));
    assert_eq!(book.timestamp_ms(), 1597026383427);
}

#[test]
fn test_orders_push_deserializes() {
    let push: OrdersPush =
        serde_json::from_str(ORDERS_JSON).expect("Failed to deserialize orders push");

    assert_eq!(push.arg.channel, "orders");
    assert_eq!(push.data.len(), 2);

    let partial = &push.data[0];
    assert_eq!(partial.ord_id, "312269865356374016");
    assert_eq!(partial.cl_ord_id, "b15");
    assert_eq!(partial.inst_type, InstType::Swap);
    assert_eq!(partial.side, OrderSide::Buy);
    assert_eq!(partial.ord_type, OrderType::Limit);
    assert_eq!(partial.state, OrderState::PartiallyFilled);
    assert_eq!(partial.px, Some(dec!(59200)));
    assert_eq!(partial.sz, dec!(2));
    assert_eq!(partial.acc_fill_sz, dec!(1));
    assert_eq!(partial.effective_fill_price(), Some(dec!(59200)));
    assert_eq!(partial.td_mode, Some(TdMode::Cross));
    assert_eq!(partial.pos_side, Some(PosSide::Net));
    assert_eq!(partial.u_time, 1597026462465);

    // empty-string fill fields parse as absent
    let live = &push.data[1];
    assert_eq!(live.cl_ord_id, "");
    assert_eq!(live.state, OrderState::Live);
    assert_eq!(live.effective_fill_price(), None);
    assert_eq!(live.acc_fill_sz, dec!(0));
}

#[test]
fn test_account_push_deserializes() {
    let push: AccountPush =
        serde_json::from_str(ACCOUNT_JSON).expect("Failed to deserialize account push");

    let account = &push.data[0];
    assert_eq!(account.u_time, 1597026383085);
    assert_eq!(account.total_eq, dec!(41624.32));
    assert_eq!(account.details.len(), 2);

    let usdt = account.detail("USDT").expect("USDT balance present");
    assert_eq!(usdt.cash_bal, dec!(41307.92));
    // empty liab string parses as zero
    let btc = account.detail("BTC").expect("BTC balance present");
    assert_eq!(btc.liab, dec!(0));
}

#[test]
fn test_positions_push_deserializes() {
    let push: PositionsPush =
        serde_json::from_str(POSITIONS_JSON).expect("Failed to deserialize positions push");

    let position = &push.data[0];
    assert_eq!(position.inst_id, "BTC-USDT-SWAP");
    assert_eq!(position.inst_type, InstType::Swap);
    assert_eq!(position.pos_side, PosSide::Net);
    assert_eq!(position.pos, dec!(10));
    assert_eq!(position.avg_px, Some(dec!(59210.5)));
    assert_eq!(position.upl, dec!(12.35));
}

#[test]
fn test_ticker_push_deserializes() {
    let push: TickerPush =
        serde_json::from_str(TICKERS_JSON).expect("Failed to deserialize ticker push");

    let ticker = &push.data[0];
    assert_eq!(ticker.inst_id, "BTC-USDT");
    assert_eq!(ticker.last, dec!(9999.99));
    assert_eq!(ticker.bid_px, dec!(9999.98));
    assert_eq!(ticker.ask_px, dec!(10000));
    assert_eq!(ticker.mid(), dec!(9999.99));
}

#[test]
fn test_mark_price_push_deserializes() {
    let push: MarkPricePush =
        serde_json::from_str(MARK_PRICE_JSON).expect("Failed to deserialize mark price push");

    let mark = &push.data[0];
    assert_eq!(mark.inst_id, "BTC-USDT-SWAP");
    assert_eq!(mark.mark_px, Some(dec!(59205.3)));
    assert_eq!(mark.ts, 1597026383085);
}

#[test]
fn test_batch_orders_response_deserializes() {
    let response: RestResponse<OrderAck> = serde_json::from_str(BATCH_ORDERS_RESPONSE_JSON)
        .expect("Failed to deserialize batch response");

    assert!(response.is_ok());
    assert_eq!(response.data.len(), 2);
    let ok = &response.data[0];
    assert!(ok.is_ok());
    assert_eq!(ok.ord_id, "312269865356374016");
    let failed = &response.data[1];
    assert!(!failed.is_ok());
    assert_eq!(failed.s_code, "51008");
    assert_eq!(failed.cl_ord_id, "cid2");
}

#[test]
fn test_instruments_response_deserializes() {
    let response: RestResponse<Instrument> =
        serde_json::from_str(INSTRUMENTS_JSON).expect("Failed to deserialize instruments");

    assert!(response.is_ok());
    let instrument = &response.data[0];
    assert_eq!(instrument.inst_id, "BTC-USDT-SWAP");
    assert_eq!(instrument.inst_type, InstType::Swap);
    assert_eq!(instrument.ct_type, Some(CtType::Linear));
    assert_eq!(instrument.ct_val, dec!(0.01));
    assert_eq!(instrument.tick_sz, dec!(0.1));
    assert_eq!(instrument.lot_sz, dec!(1));
    // empty expTime parses as zero
    assert_eq!(instrument.exp_time, 0);
    assert_eq!(instrument.state, Some(InstState::Live));
}
