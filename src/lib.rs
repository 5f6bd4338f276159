//! OKX WebSocket V5 market-making client library.
//!
//! Maintains a local, checksum-verified view of exchange state (order
//! books, open orders, balances and positions) from snapshot/delta feeds,
//! and reconciles a strategy's proposed quote ladders against its live
//! resting orders into minimal place/amend/cancel batches.

pub mod auth;
pub mod book;
pub mod config;
pub mod engine;
pub mod error;
pub mod feed;
pub mod instrument;
pub mod models;
pub mod monitor;
pub mod orders;
pub mod params;
pub mod reconcile;
pub mod risk;
pub mod state;
pub mod strategy;
pub mod tracker;
pub mod trade;

pub use error::{QuoterieError, Result};
