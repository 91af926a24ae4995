use super::{CopyTicks, LastError, RawTick, Terminal, TerminalError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Response envelope shared by every bridge endpoint.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct BridgeResponse<T> {
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    last_error: Option<LastError>,
}

#[derive(Debug, Serialize)]
struct SymbolSelectRequest<'a> {
    symbol: &'a str,
    enable: bool,
}

#[derive(Debug, Serialize)]
struct CopyTicksRangeRequest<'a> {
    symbol: &'a str,
    date_from: i64,
    date_to: i64,
    flags: i32,
}

/// Terminal client speaking JSON to an HTTP bridge running next to the terminal.
///
/// Every operation is a `POST <base_url>/<operation>`. The bridge answers with
/// `{"result": ..., "last_error": [code, "message"]}`, `last_error` being
/// optional.
pub struct HttpTerminal {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTerminal {
    /// Creates a client for the bridge at `base_url` with a default HTTP client.
    ///
    /// # Arguments
    /// * `base_url`: Bridge root, e.g. `http://127.0.0.1:8222`; a trailing `/` is ignored
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    /// Creates a client for the bridge at `base_url` that sends requests
    /// through `client`, for callers that need their own timeouts or proxies.
    ///
    /// # Arguments
    /// * `base_url`: Bridge root; a trailing `/` is ignored
    /// * `client`: Preconfigured `reqwest::Client` used for every request
    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    /// The bridge root without a trailing `/`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Posts `body` to `<base_url>/<operation>` and decodes the envelope.
    ///
    /// # Errors
    /// Returns `Http` on transport or decoding failures and `Status` on a
    /// non-2xx response
    async fn call<B, T>(
        &self,
        operation: &'static str,
        body: &B,
    ) -> Result<BridgeResponse<T>, TerminalError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, operation);
        tracing::debug!(%url, "terminal bridge request");

        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TerminalError::Status { operation, status });
        }

        Ok(response.json::<BridgeResponse<T>>().await?)
    }
}

#[async_trait]
impl Terminal for HttpTerminal {
    async fn initialize(&self) -> Result<bool, TerminalError> {
        let response: BridgeResponse<bool> = self.call("initialize", &json!({})).await?;
        Ok(response.result.unwrap_or(false))
    }

    async fn last_error(&self) -> Result<LastError, TerminalError> {
        let response: BridgeResponse<LastError> = self.call("last_error", &json!({})).await?;
        Ok(response
            .result
            .or(response.last_error)
            .unwrap_or_else(|| LastError(1, "Success".to_string())))
    }

    async fn symbol_select(&self, symbol: &str, enable: bool) -> Result<bool, TerminalError> {
        let request = SymbolSelectRequest { symbol, enable };
        let response: BridgeResponse<bool> = self.call("symbol_select", &request).await?;
        Ok(response.result.unwrap_or(false))
    }

    async fn copy_ticks_range(
        &self,
        symbol: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        flags: CopyTicks,
    ) -> Result<Option<Vec<RawTick>>, TerminalError> {
        let request = CopyTicksRangeRequest {
            symbol,
            date_from: from.timestamp(),
            date_to: to.timestamp(),
            flags: flags.as_flag(),
        };
        let response: BridgeResponse<Vec<RawTick>> =
            self.call("copy_ticks_range", &request).await?;

        if response.result.is_none() {
            if let Some(err) = &response.last_error {
                tracing::debug!(symbol, error = %err, "copy_ticks_range returned no result");
            }
        }

        Ok(response.result)
    }

    async fn shutdown(&self) -> Result<(), TerminalError> {
        let response: BridgeResponse<bool> = self.call("shutdown", &json!({})).await?;
        match (response.result, response.last_error) {
            (Some(false), Some(err)) => Err(TerminalError::Rejected(err)),
            _ => Ok(()),
        }
    }
}
