//! reqwest implementation of [`FinanceBackend`]

use async_trait::async_trait;
use clubledger_config::Config;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::error::{ClientError, ClientResult};
use crate::models::{BackendPaymentStats, Invoice, Payment, PaymentRefund, Transaction};
use crate::types::PaymentStatus;
use crate::{decode_collection, FinanceBackend};

/// Structured error body returned by the backend
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

impl ErrorBody {
    /// `error` wins over `message` when both are present
    fn into_message(self) -> Option<String> {
        self.error.or(self.message).filter(|m| !m.trim().is_empty())
    }
}

/// Backend client over HTTPS with bearer-token authorization
pub struct HttpBackend {
    client: Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl HttpBackend {
    /// Build a client for the configured backend
    pub fn new(config: &Config) -> ClientResult<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.backend.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            base_url: config.backend_url().to_string(),
            token: RwLock::new(config.backend.token.clone()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Replace the bearer token (e.g. after signing in again)
    pub async fn set_token(&self, token: Option<String>) {
        *self.token.write().await = token;
    }

    pub async fn has_token(&self) -> bool {
        self.token.read().await.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request, attaching the token and mapping non-2xx responses
    async fn send(&self, request: RequestBuilder, what: &str) -> ClientResult<Response> {
        let request = match self.token.read().await.as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await.map_err(|e| {
            log::warn!("Request for {} failed: {}", what, e);
            ClientError::from(e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            log::warn!("Backend rejected the session token for {}; clearing it", what);
            *self.token.write().await = None;
            return Err(ClientError::Unauthorized);
        }

        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound { resource: what.to_string() });
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(ErrorBody::into_message)
            .unwrap_or_else(|| {
                if text.trim().is_empty() {
                    status.canonical_reason().unwrap_or("request failed").to_string()
                } else {
                    text
                }
            });

        log::warn!("Backend answered {} for {}: {}", status.as_u16(), what, message);
        Err(ClientError::Backend { status: status.as_u16(), message })
    }

    async fn get_json(&self, path: &str) -> ClientResult<serde_json::Value> {
        log::debug!("GET {}", path);
        let response = self.send(self.client.get(self.url(path)), path).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl FinanceBackend for HttpBackend {
    async fn list_transactions(&self) -> ClientResult<Vec<Transaction>> {
        let value = self.get_json("/financial-transactions").await?;
        decode_collection(value, "transactions")
    }

    async fn create_transaction(&self, transaction: &Transaction) -> ClientResult<()> {
        let request = self.client.post(self.url("/financial-transactions")).json(transaction);
        self.send(request, "/financial-transactions").await?;
        Ok(())
    }

    async fn update_transaction(&self, id: &str, transaction: &Transaction) -> ClientResult<()> {
        let path = format!("/financial-transactions/{}", id);
        let request = self.client.put(self.url(&path)).json(transaction);
        self.send(request, &path).await?;
        Ok(())
    }

    async fn list_payments(&self, status: Option<PaymentStatus>) -> ClientResult<Vec<Payment>> {
        let path = match status {
            Some(status) => format!("/payments?status={}", status),
            None => "/payments".to_string(),
        };
        let value = self.get_json(&path).await?;
        decode_collection(value, "payments")
    }

    async fn payment_stats(&self) -> ClientResult<BackendPaymentStats> {
        let value = self.get_json("/payments/stats").await?;
        // some deployments wrap the snapshot in {stats: {...}}
        let value = match value {
            serde_json::Value::Object(mut map) if map.get("stats").map_or(false, |v| v.is_object()) => {
                map.remove("stats").unwrap_or_default()
            }
            other => other,
        };
        Ok(serde_json::from_value(value)?)
    }

    async fn refund_payment(&self, id: &str, refund: &PaymentRefund) -> ClientResult<()> {
        let path = format!("/payments/{}/refund", id);
        log::debug!("POST {} request_id={}", path, refund.request_id);
        let request = self
            .client
            .post(self.url(&path))
            .header("Idempotency-Key", refund.request_id.as_str())
            .json(refund);
        self.send(request, &path).await?;
        Ok(())
    }

    async fn update_payment_status(&self, id: &str, status: PaymentStatus) -> ClientResult<()> {
        let path = format!("/payments/{}", id);
        let request = self
            .client
            .put(self.url(&path))
            .json(&serde_json::json!({ "status": status }));
        self.send(request, &path).await?;
        Ok(())
    }

    async fn list_invoices(&self) -> ClientResult<Vec<Invoice>> {
        let value = self.get_json("/invoices").await?;
        decode_collection(value, "invoices")
    }

    async fn create_invoice(&self, invoice: &Invoice) -> ClientResult<()> {
        let request = self.client.post(self.url("/invoices")).json(invoice);
        self.send(request, "/invoices").await?;
        Ok(())
    }

    async fn update_invoice(&self, id: &str, invoice: &Invoice) -> ClientResult<()> {
        let path = format!("/invoices/{}", id);
        let request = self.client.put(self.url(&path)).json(invoice);
        self.send(request, &path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend_for(server: &MockServer, token: Option<&str>) -> HttpBackend {
        let mut config = Config::default();
        config.backend.base_url = format!("{}/api/", server.uri());
        config.backend.token = token.map(|t| t.to_string());
        HttpBackend::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_list_transactions_wrapped_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/financial-transactions"))
            .and(header("Authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "transactions": [{
                    "_id": "t1",
                    "type": "income",
                    "category": "registration",
                    "amount": 100,
                    "description": "Spring",
                    "date": "2024-03-01",
                    "status": "completed"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = backend_for(&server, Some("secret"));
        let transactions = backend.list_transactions().await.unwrap();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].id, "t1");
        assert_eq!(transactions[0].amount, Decimal::from(100));
    }

    #[tokio::test]
    async fn test_list_payments_with_status_filter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/payments"))
            .and(query_param("status", "failed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "p1", "amount": 30, "status": "failed"}
            ])))
            .mount(&server)
            .await;

        let backend = backend_for(&server, None);
        let declined = backend.list_payments(Some(PaymentStatus::Failed)).await.unwrap();
        assert_eq!(declined.len(), 1);
        assert_eq!(declined[0].status, PaymentStatus::Failed);
    }

    #[tokio::test]
    async fn test_unauthorized_clears_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/invoices"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let backend = backend_for(&server, Some("expired"));
        assert!(backend.has_token().await);
        let err = backend.list_invoices().await.unwrap_err();
        assert!(err.is_session_fatal());
        assert!(!backend.has_token().await);
    }

    #[tokio::test]
    async fn test_backend_error_message_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/payments/p1/refund"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"error": "Refund exceeds remaining amount"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let backend = backend_for(&server, None);
        let refund = PaymentRefund {
            amount: Decimal::from(10),
            reason: "Duplicate payment".to_string(),
            request_id: "req-1".to_string(),
        };
        match backend.refund_payment("p1", &refund).await {
            Err(ClientError::Backend { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "Refund exceeds remaining amount");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_field_preferred_over_message() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/payments/p3"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "success": false,
                "message": "Conflict",
                "error": "Payment is not failed"
            })))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/payments/p4"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "No such payment"})))
            .mount(&server)
            .await;

        let backend = backend_for(&server, None);
        match backend.update_payment_status("p3", PaymentStatus::Pending).await {
            Err(ClientError::Backend { status, message }) => {
                assert_eq!(status, 409);
                assert_eq!(message, "Payment is not failed");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        let err = backend.update_payment_status("p4", PaymentStatus::Pending).await.unwrap_err();
        assert!(err.to_string().contains("No such payment"));
    }

    #[tokio::test]
    async fn test_refund_sends_idempotency_key_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/payments/p7/refund"))
            .and(header("Idempotency-Key", "req-42"))
            .and(body_json(json!({"amount": 25.5, "reason": "Overcharge", "requestId": "req-42"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;

        let backend = backend_for(&server, None);
        let refund = PaymentRefund {
            amount: Decimal::new(2550, 2),
            reason: "Overcharge".to_string(),
            request_id: "req-42".to_string(),
        };
        backend.refund_payment("p7", &refund).await.unwrap();
    }

    #[tokio::test]
    async fn test_payment_stats_unwraps_stats_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/payments/stats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "stats": {"totalRevenue": 500, "todayRevenue": 20, "totalPayments": 9}
            })))
            .mount(&server)
            .await;

        let backend = backend_for(&server, None);
        let stats = backend.payment_stats().await.unwrap();
        assert_eq!(stats.total_revenue, Decimal::from(500));
        assert_eq!(stats.total_payments, 9);
    }

    #[tokio::test]
    async fn test_retry_puts_pending_status() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/payments/p3"))
            .and(body_json(json!({"status": "pending"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let backend = backend_for(&server, None);
        backend.update_payment_status("p3", PaymentStatus::Pending).await.unwrap();
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let mut config = Config::default();
        config.backend.base_url = "http://127.0.0.1:9".to_string();
        config.backend.timeout_secs = Some(2);
        let backend = HttpBackend::new(&config).unwrap();
        let err = backend.list_transactions().await.unwrap_err();
        assert!(matches!(err, ClientError::Transport { .. }));
    }
}
