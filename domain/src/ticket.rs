use crate::error::Error;
use crate::gateway::glpi::TicketGateway;
use events::TicketId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use service::AppState;

const INCIDENT: u8 = 1;
const MEDIUM: u8 = 3;
/// GLPI ticket status "closed".
pub const STATUS_CLOSED: u8 = 5;

/// Fields of a new GLPI ticket. Levels run from 1 (very high) to 5 (very low).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTicket {
    pub name: String,
    pub content: String,
    pub itilcategories_id: u64,
    /// 1 = incident, 2 = request
    #[serde(rename = "type", default = "default_ticket_type")]
    pub ticket_type: u8,
    #[serde(default = "default_level")]
    pub urgency: u8,
    #[serde(default = "default_level")]
    pub impact: u8,
    #[serde(default = "default_level")]
    pub priority: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requesttypes_id: Option<u64>,
}

impl NewTicket {
    pub fn new(name: &str, content: &str, itilcategories_id: u64) -> Self {
        Self {
            name: name.to_string(),
            content: content.to_string(),
            itilcategories_id,
            ticket_type: INCIDENT,
            urgency: MEDIUM,
            impact: MEDIUM,
            priority: MEDIUM,
            entities_id: None,
            requesttypes_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFollowup {
    pub content: String,
    #[serde(default)]
    pub is_private: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSolution {
    pub content: String,
    /// Ticket status applied with the solution.
    #[serde(default = "default_solution_status")]
    pub status: u8,
}

impl NewSolution {
    pub fn closing(content: &str) -> Self {
        Self {
            content: content.to_string(),
            status: STATUS_CLOSED,
        }
    }
}

/// Ticket search filters. GLPI matches each set field with `equals`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TicketFilter {
    pub status: Option<u8>,
    pub category_id: Option<u64>,
    pub requester_id: Option<u64>,
    /// GLPI result window, e.g. `0-49`.
    pub range: Option<String>,
}

// GLPI search option ids for the Ticket itemtype.
const SEARCH_STATUS: u16 = 12;
const SEARCH_CATEGORY: u16 = 7;
const SEARCH_REQUESTER: u16 = 4;

impl TicketFilter {
    /// Renders the filter as `search/Ticket` query pairs.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let fields = [
            (SEARCH_STATUS, self.status.map(u64::from)),
            (SEARCH_CATEGORY, self.category_id),
            (SEARCH_REQUESTER, self.requester_id),
        ];

        let mut query = Vec::new();
        for (index, (field, value)) in fields
            .into_iter()
            .filter_map(|(field, value)| value.map(|v| (field, v)))
            .enumerate()
        {
            if index > 0 {
                query.push((format!("criteria[{index}][link]"), "AND".to_string()));
            }
            query.push((format!("criteria[{index}][field]"), field.to_string()));
            query.push((format!("criteria[{index}][searchtype]"), "equals".to_string()));
            query.push((format!("criteria[{index}][value]"), value.to_string()));
        }
        if let Some(range) = &self.range {
            query.push(("range".to_string(), range.clone()));
        }
        query
    }
}

fn default_ticket_type() -> u8 {
    INCIDENT
}

fn default_level() -> u8 {
    MEDIUM
}

fn default_solution_status() -> u8 {
    STATUS_CLOSED
}

pub async fn get(
    app_state: &AppState,
    ticket_id: TicketId,
    with_logs: bool,
) -> Result<Value, Error> {
    TicketGateway::from_state(app_state)?
        .get_ticket(ticket_id, with_logs)
        .await
}

pub async fn search(app_state: &AppState, filter: &TicketFilter) -> Result<Value, Error> {
    TicketGateway::from_state(app_state)?
        .search_tickets(filter)
        .await
}

pub async fn create(app_state: &AppState, ticket: NewTicket) -> Result<Value, Error> {
    TicketGateway::from_state(app_state)?
        .create_ticket(ticket)
        .await
}

pub async fn update(
    app_state: &AppState,
    ticket_id: TicketId,
    fields: Map<String, Value>,
) -> Result<Value, Error> {
    TicketGateway::from_state(app_state)?
        .update_ticket(ticket_id, fields)
        .await
}

pub async fn add_followup(
    app_state: &AppState,
    ticket_id: TicketId,
    followup: NewFollowup,
) -> Result<Value, Error> {
    TicketGateway::from_state(app_state)?
        .add_followup(ticket_id, followup)
        .await
}

pub async fn add_solution(
    app_state: &AppState,
    ticket_id: TicketId,
    solution: NewSolution,
) -> Result<Value, Error> {
    TicketGateway::from_state(app_state)?
        .add_solution(ticket_id, solution)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_ticket_fills_glpi_defaults() {
        let ticket: NewTicket = serde_json::from_value(json!({
            "name": "VPN down",
            "content": "Cannot connect since 9am",
            "itilcategories_id": 2
        }))
        .unwrap();

        let body = serde_json::to_value(&ticket).unwrap();
        assert_eq!(
            body,
            json!({
                "name": "VPN down",
                "content": "Cannot connect since 9am",
                "itilcategories_id": 2,
                "type": 1,
                "urgency": 3,
                "impact": 3,
                "priority": 3
            })
        );
    }

    #[test]
    fn optional_ids_are_sent_when_present() {
        let mut ticket = NewTicket::new("a", "b", 1);
        ticket.entities_id = Some(3);
        let body = serde_json::to_value(&ticket).unwrap();
        assert_eq!(body["entities_id"], 3);
        assert!(body.get("requesttypes_id").is_none());
    }

    #[test]
    fn solution_closes_the_ticket_by_default() {
        let solution: NewSolution =
            serde_json::from_value(json!({"content": "Rebooted"})).unwrap();
        assert_eq!(solution.status, STATUS_CLOSED);

        let followup: NewFollowup = serde_json::from_value(json!({"content": "x"})).unwrap();
        assert!(!followup.is_private);
    }

    #[test]
    fn filter_links_criteria_after_the_first() {
        let filter = TicketFilter {
            status: Some(2),
            requester_id: Some(14),
            range: Some("0-49".to_string()),
            ..TicketFilter::default()
        };

        let query: Vec<(String, String)> = filter.to_query();
        let pairs: Vec<(&str, &str)> = query
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("criteria[0][field]", "12"),
                ("criteria[0][searchtype]", "equals"),
                ("criteria[0][value]", "2"),
                ("criteria[1][link]", "AND"),
                ("criteria[1][field]", "4"),
                ("criteria[1][searchtype]", "equals"),
                ("criteria[1][value]", "14"),
                ("range", "0-49"),
            ]
        );
    }

    #[test]
    fn empty_filter_has_no_criteria() {
        assert!(TicketFilter::default().to_query().is_empty());
    }
}
