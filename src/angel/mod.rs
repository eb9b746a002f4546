//! Angel One SmartAPI Integration
//!
//! Session login, scrip master download, historical candles and LTP for
//! the breakout tracker.

pub mod auth;
pub mod client;
pub mod error;
pub mod types;

pub use auth::{generate_totp, Session};
pub use client::{AngelClient, ClientConfig};
pub use error::{AngelError, AngelResult};
pub use types::*;

pub const API_BASE_URL: &str = "https://apiconnect.angelone.in";

pub const SCRIP_MASTER_URL: &str =
    "https://margincalculator.angelbroking.com/OpenAPI_File/files/OpenAPIScripMaster.json";

/// Candle timestamp format used in request windows
pub const CANDLE_WINDOW_FORMAT: &str = "%Y-%m-%d %H:%M";
