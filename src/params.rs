//! Strategy parameters, hot-reloaded from a JSON file.
//!
//! The engine re-reads the file between cycles whenever its
//! modification time changes, so quoting can be retuned without a
//! restart. Missing fields fall back to defaults, so a params file only
//! needs to name what it overrides.

use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

use crate::error::Result;
use crate::models::order::TdMode;

/// Quoting and risk-limit parameters for the sample maker.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StrategyParams {
    /// Distance between adjacent ladder levels, as a fraction of the
    /// touch price.
    pub step_pct: Decimal,
    /// Number of price levels quoted on each side.
    pub order_count_per_side: usize,
    /// Single order size, expressed as a multiple of the lot size.
    pub size_lot_multiple: Decimal,
    /// Stop quoting bids once net bought quantity reaches this.
    pub max_net_buy: Decimal,
    /// Stop quoting asks once net sold quantity reaches this.
    pub max_net_sell: Decimal,
    /// Preferred trade mode; `None` lets the account level decide.
    pub td_mode_preference: Option<TdMode>,
    /// Currencies excluded from exposure reporting.
    pub risk_free_ccys: Vec<String>,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            // 5 bps between levels
            step_pct: Decimal::new(5, 4),
            order_count_per_side: 5,
            size_lot_multiple: Decimal::ONE,
            max_net_buy: Decimal::from(100),
            max_net_sell: Decimal::from(100),
            td_mode_preference: None,
            risk_free_ccys: vec!["USDT".to_string(), "USDC".to_string(), "DAI".to_string()],
        }
    }
}

/// Re-reads the params file when its mtime changes.
#[derive(Debug)]
pub struct ParamsLoader {
    path: PathBuf,
    last_modified: Option<SystemTime>,
    current: StrategyParams,
}

impl ParamsLoader {
    /// Loads the file once up front; a missing file starts from
    /// defaults and is picked up when it appears.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let mut loader = Self {
            path: path.into(),
            last_modified: None,
            current: StrategyParams::default(),
        };
        loader.refresh()?;
        Ok(loader)
    }

    pub fn current(&self) -> &StrategyParams {
        &self.current
    }

    /// Reloads the file if it changed since the last read. Returns
    /// `true` when new parameters were applied.
    pub fn refresh(&mut self) -> Result<bool> {
        let modified = match fs::metadata(&self.path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            // absent file keeps the current parameters
            Err(_) => return Ok(false),
        };
        if self.last_modified == Some(modified) {
            return Ok(false);
        }
        let raw = fs::read_to_string(&self.path)?;
        self.current = serde_json::from_str(&raw)?;
        self.last_modified = Some(modified);
        info!(path = %self.path.display(), "strategy parameters loaded");
        Ok(true)
    }
}
