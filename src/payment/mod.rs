//! Payment gateway client for transaction creation and status checks.
//!
//! The gateway authenticates with HTTP basic auth (server key as the
//! username, empty password) and notifies us of status changes through
//! the webhook in `api::webhooks`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::PaymentConfig;

/// Client for the third-party payment gateway.
#[derive(Clone)]
pub struct PaymentClient {
    config: PaymentConfig,
    client: reqwest::Client,
}

/// Request body for creating a gateway transaction
#[derive(Debug, Serialize)]
struct CreateTransactionRequest<'a> {
    order_id: &'a str,
    gross_amount: i64,
    customer_name: &'a str,
    customer_email: &'a str,
}

/// Gateway handoff returned on transaction creation
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayTransaction {
    pub token: String,
    pub redirect_url: String,
}

/// Transaction state as reported by the gateway
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayStatus {
    pub order_id: String,
    pub transaction_status: String,
}

impl PaymentClient {
    pub fn new(config: PaymentConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Whether the gateway integration is usable
    pub fn is_enabled(&self) -> bool {
        self.config.is_configured()
    }

    fn base_url(&self) -> Result<&str> {
        self.config
            .base_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("Payment gateway base URL not configured"))
    }

    fn server_key(&self) -> Result<&str> {
        self.config
            .server_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("Payment gateway server key not configured"))
    }

    /// Create a transaction for a booking and return the payment handoff
    pub async fn create_transaction(
        &self,
        order_id: &str,
        gross_amount: i64,
        customer_name: &str,
        customer_email: &str,
    ) -> Result<GatewayTransaction> {
        let url = format!("{}/v1/transactions", self.base_url()?);

        let response = self
            .client
            .post(&url)
            .basic_auth(self.server_key()?, Some(""))
            .header("User-Agent", "Rentr")
            .json(&CreateTransactionRequest {
                order_id,
                gross_amount,
                customer_name,
                customer_email,
            })
            .send()
            .await
            .context("Failed to reach payment gateway")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Payment gateway error: {} - {}", status, body);
        }

        response
            .json()
            .await
            .context("Failed to parse payment gateway response")
    }

    /// Fetch the current status of a gateway transaction
    pub async fn fetch_status(&self, order_id: &str) -> Result<GatewayStatus> {
        let url = format!("{}/v1/transactions/{}/status", self.base_url()?, order_id);

        let response = self
            .client
            .get(&url)
            .basic_auth(self.server_key()?, Some(""))
            .header("User-Agent", "Rentr")
            .send()
            .await
            .context("Failed to reach payment gateway")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Payment gateway error: {} - {}", status, body);
        }

        response
            .json()
            .await
            .context("Failed to parse payment gateway response")
    }
}
