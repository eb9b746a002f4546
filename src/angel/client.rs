//! SmartAPI Client
//!
//! HTTP client for the Angel One SmartAPI with:
//! - TOTP session login
//! - Request pacing shared across all calls
//! - Scrip master download for symbol resolution
//! - `MarketData` implementation for candles and LTP

use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::{Client, RequestBuilder};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use super::auth::{generate_totp, Session};
use super::error::{AngelError, AngelResult};
use super::types::*;
use super::{API_BASE_URL, CANDLE_WINDOW_FORMAT, SCRIP_MASTER_URL};
use crate::common::{Pacer, PacerConfig};
use crate::config::{BrokerConfig, Credentials};
use crate::error::MarketDataError;
use crate::market_data::MarketData;
use crate::types::{Candle, Symbol, Token};

const LOGIN_PATH: &str = "/rest/auth/angelbroking/user/v1/loginByPassword";
const CANDLE_PATH: &str = "/rest/secure/angelbroking/historical/v1/getCandleData";
const LTP_PATH: &str = "/rest/secure/angelbroking/order/v1/getLtpData";

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub exchange: String,
    pub timeout: Duration,
    pub pacer: PacerConfig,
    pub client_local_ip: String,
    pub client_public_ip: String,
    pub mac_address: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            exchange: "NSE".to_string(),
            timeout: Duration::from_secs(30),
            pacer: PacerConfig::default().with_spacing(Duration::from_millis(100)),
            client_local_ip: "127.0.0.1".to_string(),
            client_public_ip: "127.0.0.1".to_string(),
            mac_address: "00:00:00:00:00:00".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn from_broker(broker: &BrokerConfig) -> Self {
        Self {
            exchange: broker.exchange.clone(),
            timeout: Duration::from_secs(broker.timeout_secs),
            client_local_ip: broker.client_local_ip.clone(),
            client_public_ip: broker.client_public_ip.clone(),
            mac_address: broker.mac_address.clone(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_spacing(mut self, spacing: Duration) -> Self {
        self.pacer = self.pacer.with_spacing(spacing);
        self
    }
}

/// Angel One SmartAPI Client
pub struct AngelClient {
    client: Client,
    api_key: String,
    config: ClientConfig,
    pacer: Pacer,
    session: Option<Session>,
}

impl AngelClient {
    pub fn new(api_key: impl Into<String>) -> AngelResult<Self> {
        Self::with_config(api_key, ClientConfig::default())
    }

    pub fn with_config(api_key: impl Into<String>, config: ClientConfig) -> AngelResult<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        let pacer = Pacer::new(config.pacer.clone());

        Ok(Self {
            client,
            api_key: api_key.into(),
            config,
            pacer,
            session: None,
        })
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.is_some()
    }

    /// Log in with client code, MPIN and a TOTP derived from the current time.
    pub async fn login(&mut self, credentials: &Credentials, unix_time: u64) -> AngelResult<()> {
        let totp = generate_totp(&credentials.totp_key, unix_time)?;
        let request = LoginRequest {
            clientcode: credentials.client_id.clone(),
            password: credentials.mpin.clone(),
            totp,
        };

        let data: LoginData = self
            .post(LOGIN_PATH, &request, false)
            .await
            .map_err(|e| match e {
                AngelError::Api { code, message } => AngelError::Auth(format!("{}: {}", code, message)),
                other => other,
            })?;

        info!("Logged in as {}", credentials.client_id);
        self.session = Some(Session {
            jwt_token: data.jwt_token,
        });
        Ok(())
    }

    /// Download the public scrip master list.
    pub async fn fetch_scrip_master(&self) -> AngelResult<Vec<ScripRecord>> {
        self.pacer.wait().await;
        let response = self.client.get(SCRIP_MASTER_URL).send().await?;
        if !response.status().is_success() {
            return Err(AngelError::Api {
                code: response.status().as_u16().to_string(),
                message: "scrip master download failed".to_string(),
            });
        }
        let records: Vec<ScripRecord> = response
            .json()
            .await
            .map_err(|e| AngelError::Parse(e.to_string()))?;
        info!("Downloaded {} scrip master records", records.len());
        Ok(records)
    }

    /// Historical candles for a token between two session-local times.
    pub async fn get_candles(
        &self,
        exchange: &str,
        token: &Token,
        interval: &str,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> AngelResult<Vec<Candle>> {
        let request = CandleRequest {
            exchange: exchange.to_string(),
            symboltoken: token.to_string(),
            interval: interval.to_string(),
            fromdate: from.format(CANDLE_WINDOW_FORMAT).to_string(),
            todate: to.format(CANDLE_WINDOW_FORMAT).to_string(),
        };

        let rows: Vec<CandleRow> = self.post(CANDLE_PATH, &request, true).await?;
        debug!("Fetched {} candles for token {}", rows.len(), token);
        rows.iter().map(CandleRow::to_candle).collect()
    }

    /// Last traded price
    pub async fn get_ltp(&self, exchange: &str, symbol: &Symbol, token: &Token) -> AngelResult<Decimal> {
        let request = LtpRequest {
            exchange: exchange.to_string(),
            tradingsymbol: symbol.to_string(),
            symboltoken: token.to_string(),
        };
        let data: LtpData = self.post(LTP_PATH, &request, true).await?;
        Ok(data.ltp)
    }

    fn headers(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .header("X-UserType", "USER")
            .header("X-SourceID", "WEB")
            .header("X-ClientLocalIP", &self.config.client_local_ip)
            .header("X-ClientPublicIP", &self.config.client_public_ip)
            .header("X-MACAddress", &self.config.mac_address)
            .header("X-PrivateKey", &self.api_key)
    }

    async fn post<B, T>(&self, path: &str, body: &B, authenticated: bool) -> AngelResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut builder = self.headers(self.client.post(format!("{}{}", API_BASE_URL, path)));
        if authenticated {
            let session = self.session.as_ref().ok_or(AngelError::NotLoggedIn)?;
            builder = builder.header("Authorization", format!("Bearer {}", session.jwt_token));
        }

        self.pacer.wait().await;
        let response = builder.json(body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AngelError::Api {
                code: status.as_u16().to_string(),
                message: text,
            });
        }

        let envelope: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| AngelError::Parse(e.to_string()))?;
        envelope.into_data()
    }
}

#[async_trait]
impl MarketData for AngelClient {
    async fn candles(
        &self,
        token: &Token,
        from: NaiveDateTime,
        to: NaiveDateTime,
        interval: &str,
    ) -> Result<Vec<Candle>, MarketDataError> {
        let candles = self
            .get_candles(&self.config.exchange, token, interval, from, to)
            .await?;
        if candles.is_empty() {
            return Err(MarketDataError::Empty);
        }
        Ok(candles)
    }

    async fn last_price(
        &self,
        exchange: &str,
        symbol: &Symbol,
        token: &Token,
    ) -> Result<Decimal, MarketDataError> {
        Ok(self.get_ltp(exchange, symbol, token).await?)
    }
}
