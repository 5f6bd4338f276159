//! Instrument reference data models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{de_decimal_or_zero, de_ms_or_zero};

/// Instrument family: spot pair, margin pair, perpetual swap, dated
/// futures, or option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InstType {
    Spot,
    Margin,
    Swap,
    Futures,
    Option,
}

impl InstType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstType::Spot => "SPOT",
            InstType::Margin => "MARGIN",
            InstType::Swap => "SWAP",
            InstType::Futures => "FUTURES",
            InstType::Option => "OPTION",
        }
    }
}

/// Contract settlement style for derivatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CtType {
    Linear,
    Inverse,
}

/// Listing state of an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstState {
    Live,
    Suspend,
    Preopen,
    Test,
}

/// Reference data for a single tradable instrument.
#[derive(Debug, Clone, Deserialize)]
pub struct Instrument {
    #[serde(rename = "instType")]
    pub inst_type: InstType,
    #[serde(rename = "instId")]
    pub inst_id: String,
    #[serde(rename = "uly", default)]
    pub underlying: String,
    #[serde(rename = "baseCcy", default)]
    pub base_ccy: String,
    #[serde(rename = "quoteCcy", default)]
    pub quote_ccy: String,
    #[serde(rename = "settleCcy", default)]
    pub settle_ccy: String,
    /// Contract face value (derivatives only).
    #[serde(rename = "ctVal", default, deserialize_with = "de_decimal_or_zero")]
    pub ct_val: Decimal,
    /// Contract multiplier (derivatives only).
    #[serde(rename = "ctMult", default, deserialize_with = "de_decimal_or_zero")]
    pub ct_mult: Decimal,
    #[serde(rename = "ctType", default, deserialize_with = "de_opt_ct_type")]
    pub ct_type: Option<CtType>,
    /// Price tick size.
    #[serde(rename = "tickSz", default, deserialize_with = "de_decimal_or_zero")]
    pub tick_sz: Decimal,
    /// Order size increment.
    #[serde(rename = "lotSz", default, deserialize_with = "de_decimal_or_zero")]
    pub lot_sz: Decimal,
    /// Minimum order size.
    #[serde(rename = "minSz", default, deserialize_with = "de_decimal_or_zero")]
    pub min_sz: Decimal,
    #[serde(rename = "expTime", default, deserialize_with = "de_ms_or_zero")]
    pub exp_time: u64,
    #[serde(default)]
    pub state: Option<InstState>,
}

/// Spot instruments report `ctType` as an empty string.
fn de_opt_ct_type<'de, D>(deserializer: D) -> Result<Option<CtType>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize as _;
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some("linear") => Ok(Some(CtType::Linear)),
        Some("inverse") => Ok(Some(CtType::Inverse)),
        Some(other) => Err(serde::de::Error::custom(format!(
            "unknown contract type {other:?}"
        ))),
    }
}

/// Generic OKX REST envelope: `{"code": "0", "msg": "", "data": [...]}`.
#[derive(Debug, Deserialize)]
pub struct RestResponse<T> {
    pub code: String,
    #[serde(default)]
    pub msg: String,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

impl<T> RestResponse<T> {
    /// `"0"` is the only success code.
    pub fn is_ok(&self) -> bool {
        self.code == "0"
    }
}
