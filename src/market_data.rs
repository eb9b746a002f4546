//! Market data source consumed by the loader and the live monitor

use async_trait::async_trait;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use crate::error::MarketDataError;
use crate::types::{Candle, Symbol, Token};

#[async_trait]
pub trait MarketData: Send + Sync {
    /// Candles for `token` between `from` and `to` (session-local times).
    async fn candles(
        &self,
        token: &Token,
        from: NaiveDateTime,
        to: NaiveDateTime,
        interval: &str,
    ) -> Result<Vec<Candle>, MarketDataError>;

    /// Last traded price.
    async fn last_price(
        &self,
        exchange: &str,
        symbol: &Symbol,
        token: &Token,
    ) -> Result<Decimal, MarketDataError>;
}
