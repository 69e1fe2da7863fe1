use anyhow::{Context, Result};
use reqwest::{Client, Method};

pub type TicketId = u64;

/// Watch management endpoints of the notifier.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// `base_url` includes the API prefix, e.g. `http://localhost:8000/api/v1`.
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn watch(&self, subscriber_id: &str, ticket_id: TicketId) -> Result<()> {
        self.send(Method::POST, subscriber_id, ticket_id)
            .await
            .with_context(|| format!("Failed to watch ticket {ticket_id}"))
    }

    pub async fn unwatch(&self, subscriber_id: &str, ticket_id: TicketId) -> Result<()> {
        self.send(Method::DELETE, subscriber_id, ticket_id)
            .await
            .with_context(|| format!("Failed to unwatch ticket {ticket_id}"))
    }

    async fn send(&self, method: Method, subscriber_id: &str, ticket_id: TicketId) -> Result<()> {
        let url = format!("{}/sse/watch/{}", self.base_url, ticket_id);

        let response = self
            .client
            .request(method, &url)
            .query(&[("subscriber_id", subscriber_id)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            anyhow::bail!("{} - Response: {}", status, body);
        }

        Ok(())
    }
}
