//! Breakout Tracker
//!
//! Watches a list of NSE equities for a re-touch of their intraday breakout
//! level. For each symbol the high (bullish) or low (bearish) of the
//! one-minute candle at the breakout time becomes the reference price; live
//! prices are then polled every cycle and an alert is raised when the whole
//! rupee part of the live price equals that of the reference price.
//!
//! The pipeline runs one way:
//! watchlist → breakout price loader → match engine → alert history.
//!
//! ## Example
//! ```no_run
//! use breakout_tracker::angel::AngelClient;
//! use breakout_tracker::config::{Config, Credentials};
//! use breakout_tracker::engine::Engine;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let credentials = Credentials::from_env()?;
//!     let mut client = AngelClient::new(credentials.api_key.clone())?;
//!     client.login(&credentials, chrono::Utc::now().timestamp() as u64).await?;
//!     let engine = Engine::from_config(&config);
//!     println!("{} items", engine.items().len());
//!     Ok(())
//! }
//! ```

pub mod angel;
pub mod common;
pub mod config;
pub mod display;
pub mod engine;
pub mod error;
pub mod history;
pub mod loader;
pub mod market_data;
pub mod monitor;
pub mod resolver;
pub mod types;
pub mod watchlist;

pub use config::Config;
pub use engine::{CycleReport, Engine};
pub use market_data::MarketData;
pub use types::*;

pub use angel::AngelClient;
