//! Remote sale-submission endpoint.
//!
//! The sync engine drains the queue through the [`SaleEndpoint`] seam;
//! production uses the reqwest-backed [`HttpEndpoint`], tests install a
//! recording mock. Delivery is at-least-once — a sale whose response was
//! lost is retried — so every payload carries the client-generated sale id
//! (`clientSaleId`) and the server is expected to deduplicate on it.

use std::future::Future;
use std::time::Duration;

use chrono::SecondsFormat;
use serde_json::Value;
use tracing::warn;

use crate::error::SubmitError;
use crate::sale::PendingSale;

/// Submission timeout. Longer than the health probe: a slow-but-alive
/// dashboard should still get the sale.
const SUBMIT_TIMEOUT: Duration = Duration::from_secs(15);

/// One sale per request, success or failure per record. No batching.
pub trait SaleEndpoint {
    fn submit(
        &self,
        sale: &PendingSale,
    ) -> impl Future<Output = Result<(), SubmitError>> + Send;
}

/// POSTs each sale to the dashboard sale-sync route, authenticated with the
/// terminal API key header.
pub struct HttpEndpoint {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl HttpEndpoint {
    pub fn new(url: impl Into<String>, api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(SUBMIT_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "failed to build submit client; using default");
                reqwest::Client::new()
            });
        Self {
            client,
            url: url.into(),
            api_key,
        }
    }

    /// Wire payload for one sale. The id doubles as the server-side
    /// deduplication key.
    fn payload(sale: &PendingSale) -> Value {
        serde_json::json!({
            "clientSaleId": sale.id,
            "items": sale.items,
            "totalAmount": sale.total,
            "customerName": sale.customer_name,
            "paymentMethod": sale.payment_method,
            "createdAt": sale.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        })
    }
}

impl SaleEndpoint for HttpEndpoint {
    async fn submit(&self, sale: &PendingSale) -> Result<(), SubmitError> {
        let mut request = self.client.post(&self.url).json(&Self::payload(sale));
        if let Some(key) = self.api_key.as_deref() {
            request = request.header("X-POS-API-Key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SubmitError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SubmitError::Rejected(format!(
                "HTTP {}: {}",
                status.as_u16(),
                truncate(&body, 200)
            )));
        }

        // Some dashboard routes answer 200 with an explicit failure body.
        match response.json::<Value>().await {
            Ok(body) => {
                if body.get("success").and_then(Value::as_bool) == Some(false) {
                    let message = body
                        .get("error")
                        .and_then(Value::as_str)
                        .unwrap_or("endpoint reported failure");
                    return Err(SubmitError::Rejected(message.to_string()));
                }
                Ok(())
            }
            // An unparseable 2xx body still counts as accepted.
            Err(_) => Ok(()),
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
