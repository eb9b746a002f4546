//! SmartAPI data structures

use chrono::DateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{AngelError, AngelResult};
use crate::types::Candle;

/// Common response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub status: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub errorcode: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Payload of a successful response
    pub fn into_data(self) -> AngelResult<T> {
        if !self.status {
            return Err(AngelError::Api {
                code: self.errorcode,
                message: self.message,
            });
        }
        self.data
            .ok_or_else(|| AngelError::Parse(format!("missing data: {}", self.message)))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub clientcode: String,
    pub password: String,
    pub totp: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    pub jwt_token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CandleRequest {
    pub exchange: String,
    pub symboltoken: String,
    pub interval: String,
    pub fromdate: String,
    pub todate: String,
}

/// Raw candle row: `[timestamp, open, high, low, close, volume]`
#[derive(Debug, Clone, Deserialize)]
pub struct CandleRow(pub Vec<Value>);

impl CandleRow {
    pub fn to_candle(&self) -> AngelResult<Candle> {
        let field = |i: usize| {
            self.0
                .get(i)
                .ok_or_else(|| AngelError::Parse(format!("candle row too short: {:?}", self.0)))
        };
        let timestamp = field(0)?
            .as_str()
            .ok_or_else(|| AngelError::Parse("candle timestamp is not a string".into()))?;
        let datetime = DateTime::parse_from_rfc3339(timestamp)
            .map_err(|e| AngelError::Parse(format!("bad candle timestamp {:?}: {}", timestamp, e)))?;

        Ok(Candle {
            datetime,
            open: decimal(field(1)?)?,
            high: decimal(field(2)?)?,
            low: decimal(field(3)?)?,
            close: decimal(field(4)?)?,
        })
    }
}

fn decimal(value: &Value) -> AngelResult<Decimal> {
    serde_json::from_value(value.clone())
        .map_err(|e| AngelError::Parse(format!("bad price {}: {}", value, e)))
}

#[derive(Debug, Clone, Serialize)]
pub struct LtpRequest {
    pub exchange: String,
    pub tradingsymbol: String,
    pub symboltoken: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LtpData {
    #[serde(default)]
    pub exchange: String,
    #[serde(default)]
    pub tradingsymbol: String,
    #[serde(default)]
    pub symboltoken: String,
    pub ltp: Decimal,
}

/// Scrip master entry; unused columns are ignored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScripRecord {
    pub token: String,
    pub symbol: String,
    pub name: String,
    pub exch_seg: String,
}
