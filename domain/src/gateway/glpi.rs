use crate::error::{DomainErrorKind, Error, ExternalErrorKind, InternalErrorKind};
use crate::ticket::{NewFollowup, NewSolution, NewTicket, TicketFilter};
use events::{DomainEvent, EventPublisher, TicketId};
use glpi_auth::client::{APP_TOKEN_HEADER, SESSION_TOKEN_HEADER};
use glpi_auth::{GlpiSessionManager, Token};
use log::*;
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::{json, Map, Value};
use service::AppState;
use std::sync::Arc;

/// GLPI REST client for tickets.
///
/// Every call obtains a session from the shared `SessionManager`. A 401/403
/// answer invalidates that session and the call is repeated exactly once with
/// a fresh one. After a successful mutation one `DomainEvent` is published;
/// a failed publish is logged and never fails the mutation.
pub struct TicketGateway {
    client: reqwest::Client,
    api_url: String,
    app_token: SecretString,
    session: Arc<GlpiSessionManager>,
    publisher: EventPublisher,
}

impl TicketGateway {
    pub fn new(
        client: reqwest::Client,
        glpi_url: &str,
        app_token: &str,
        session: Arc<GlpiSessionManager>,
        publisher: EventPublisher,
    ) -> Self {
        Self {
            client,
            api_url: format!("{}/apirest.php", glpi_url.trim_end_matches('/')),
            app_token: SecretString::new(app_token.to_string()),
            session,
            publisher,
        }
    }

    pub fn from_state(app_state: &AppState) -> Result<Self, Error> {
        let glpi_url = app_state.glpi_url()?;
        let app_token = app_state.config.glpi_app_token().map_err(|e| {
            warn!("GLPI app token missing from config");
            Error::internal(InternalErrorKind::Config, &e.to_string())
        })?;

        Ok(Self::new(
            app_state.http_client.clone(),
            glpi_url,
            app_token,
            Arc::clone(&app_state.session_manager),
            app_state.event_publisher.clone(),
        ))
    }

    /// `POST Ticket`. Returns the upstream answer, e.g. `{"id": 12, "message": ""}`.
    pub async fn create_ticket(&self, ticket: NewTicket) -> Result<Value, Error> {
        let input = to_object(&ticket)?;
        let result = self.send(Method::POST, "Ticket", &[], Some(&input)).await?;

        let ticket_id = created_id(&result).ok_or_else(|| {
            warn!("GLPI accepted the ticket but returned no id: {result}");
            Error::external(
                ExternalErrorKind::Other("Missing id in upstream response".to_string()),
                &result.to_string(),
            )
        })?;
        info!("Created ticket {ticket_id}");

        self.notify(DomainEvent::TicketCreated {
            ticket_id,
            ticket: with_id(input, ticket_id),
        })
        .await;
        Ok(result)
    }

    /// `PUT Ticket/{id}` with the given fields.
    pub async fn update_ticket(
        &self,
        ticket_id: TicketId,
        fields: Map<String, Value>,
    ) -> Result<Value, Error> {
        let result = self
            .send(Method::PUT, &format!("Ticket/{ticket_id}"), &[], Some(&fields))
            .await?;
        info!("Updated ticket {ticket_id}");

        self.notify(DomainEvent::TicketUpdated {
            ticket_id,
            ticket: with_id(fields, ticket_id),
        })
        .await;
        Ok(result)
    }

    /// `POST Ticket/{id}/ITILFollowup`.
    pub async fn add_followup(
        &self,
        ticket_id: TicketId,
        followup: NewFollowup,
    ) -> Result<Value, Error> {
        let mut input = Map::new();
        input.insert("items_id".to_string(), json!(ticket_id));
        input.insert("itemtype".to_string(), json!("Ticket"));
        input.insert("content".to_string(), json!(followup.content));
        input.insert("is_private".to_string(), json!(u8::from(followup.is_private)));

        let result = self
            .send(
                Method::POST,
                &format!("Ticket/{ticket_id}/ITILFollowup"),
                &[],
                Some(&input),
            )
            .await?;
        info!("Added followup to ticket {ticket_id}");

        let followup = match created_id(&result) {
            Some(id) => with_id(input, id),
            None => Value::Object(input),
        };
        self.notify(DomainEvent::FollowupAdded {
            ticket_id,
            followup,
        })
        .await;
        Ok(result)
    }

    /// `POST Ticket/{id}/ITILSolution`. The ticket takes `solution.status` (5, closed, by default).
    pub async fn add_solution(
        &self,
        ticket_id: TicketId,
        solution: NewSolution,
    ) -> Result<Value, Error> {
        let mut input = Map::new();
        input.insert("itemtype".to_string(), json!("Ticket"));
        input.insert("items_id".to_string(), json!(ticket_id));
        input.insert("content".to_string(), json!(solution.content));
        input.insert("status".to_string(), json!(solution.status));

        let result = self
            .send(
                Method::POST,
                &format!("Ticket/{ticket_id}/ITILSolution"),
                &[],
                Some(&input),
            )
            .await?;
        info!("Added solution to ticket {ticket_id}");

        let solution = match created_id(&result) {
            Some(id) => with_id(input, id),
            None => Value::Object(input),
        };
        self.notify(DomainEvent::SolutionAdded {
            ticket_id,
            solution,
        })
        .await;
        Ok(result)
    }

    /// `GET Ticket/{id}` with dropdowns expanded. Reads publish nothing.
    pub async fn get_ticket(&self, ticket_id: TicketId, with_logs: bool) -> Result<Value, Error> {
        let query = [
            ("expand_dropdowns".to_string(), "true".to_string()),
            ("with_logs".to_string(), with_logs.to_string()),
        ];
        self.send(Method::GET, &format!("Ticket/{ticket_id}"), &query, None)
            .await
    }

    /// `GET search/Ticket` restricted by the filter's criteria.
    pub async fn search_tickets(&self, filter: &TicketFilter) -> Result<Value, Error> {
        let result = self
            .send(Method::GET, "search/Ticket", &filter.to_query(), None)
            .await?;
        debug!(
            "Ticket search matched {} ticket(s)",
            result.get("totalcount").and_then(Value::as_u64).unwrap_or(0)
        );
        Ok(result)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        input: Option<&Map<String, Value>>,
    ) -> Result<Value, Error> {
        let body = input.map(|input| json!({ "input": input }));
        let body = body.as_ref();

        let token = self.session.ensure_valid().await?;
        let mut response = self
            .execute(method.clone(), path, query, body, &token)
            .await?;

        if is_session_rejection(response.status()) {
            warn!(
                "GLPI rejected the session on {method} {path} ({}), renewing and retrying once",
                response.status()
            );
            self.session.invalidate(&token).await;
            let token = self.session.ensure_valid().await?;
            response = self
                .execute(method.clone(), path, query, body, &token)
                .await?;
        }

        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<Value>().await?);
        }

        let error_text = response.text().await.unwrap_or_default();
        warn!("GLPI {method} {path} failed: {status} - {error_text}");
        let kind = if is_session_rejection(status) {
            ExternalErrorKind::Authentication(Some(status.as_u16()))
        } else {
            ExternalErrorKind::Upstream(Some(status.as_u16()))
        };
        Err(Error::external(
            kind,
            &format!("{method} {path} returned {status}: {error_text}"),
        ))
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
        token: &Token,
    ) -> Result<reqwest::Response, Error> {
        let url = format!("{}/{}", self.api_url, path);
        debug!("{method} {url}");

        let mut request = self
            .client
            .request(method, &url)
            .header(APP_TOKEN_HEADER, self.app_token.expose_secret())
            .header(SESSION_TOKEN_HEADER, token.expose())
            .query(query);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to send GLPI request: {e:?}");
                Error::from(e)
            })?;
        Ok(response)
    }

    async fn notify(&self, event: DomainEvent) {
        let ticket_id = event.ticket_id();
        if let Err(e) = self.publisher.publish(event).await {
            warn!("Failed to publish event for ticket {ticket_id}: {e}");
        }
    }
}

fn is_session_rejection(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

/// `{"id": 12, ...}` as returned by GLPI item creation.
fn created_id(result: &Value) -> Option<u64> {
    result.get("id").and_then(Value::as_u64)
}

fn with_id(mut input: Map<String, Value>, id: u64) -> Value {
    input.insert("id".to_string(), json!(id));
    Value::Object(input)
}

fn to_object<T: Serialize>(value: &T) -> Result<Map<String, Value>, Error> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(Error::internal(
            InternalErrorKind::Other("Expected a JSON object".to_string()),
            &other.to_string(),
        )),
        Err(e) => Err(Error {
            source: Some(Box::new(e)),
            error_kind: DomainErrorKind::Internal(
                InternalErrorKind::Other("Failed to serialize input".to_string()),
            ),
        }),
    }
}
