//! ServiceNow Table API response models.

use serde::{Deserialize, Deserializer};

/// Envelope returned by `GET /api/now/table/{table}`.
#[derive(Debug, Clone, Deserialize)]
pub struct TableResponse<T> {
    #[serde(default = "Vec::new")]
    pub result: Vec<T>,
}

/// A ticket row with display values, as requested via `sysparm_fields`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceNowTicket {
    #[serde(default, deserialize_with = "display_string")]
    pub number: String,
    #[serde(rename = "location.name", default, deserialize_with = "display_string")]
    pub location: String,
    #[serde(rename = "cmdb_ci.name", default, deserialize_with = "display_string")]
    pub configuration_item: String,
    #[serde(default, deserialize_with = "display_string")]
    pub short_description: String,
    #[serde(default, deserialize_with = "display_string")]
    pub state: String,
    #[serde(default, deserialize_with = "display_string")]
    pub category: String,
    #[serde(default, deserialize_with = "display_string")]
    pub priority: String,
    #[serde(default, deserialize_with = "display_string")]
    pub risk: String,
    #[serde(rename = "assigned_to.name", default, deserialize_with = "display_string")]
    pub assigned_to: String,
    #[serde(default, deserialize_with = "display_string")]
    pub opened_at: String,
    #[serde(rename = "sys_updated_by", default, deserialize_with = "display_string")]
    pub updated_by: String,
    #[serde(default, deserialize_with = "display_string")]
    pub closed_at: String,
}

/// Fields requested from every ticket table.
pub const TICKET_FIELDS: [&str; 12] = [
    "number",
    "location.name",
    "cmdb_ci.name",
    "short_description",
    "state",
    "category",
    "priority",
    "risk",
    "assigned_to.name",
    "opened_at",
    "sys_updated_by",
    "closed_at",
];

/// Accept a plain string, null, a number, or a `{display_value, link}` object.
fn display_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        serde_json::Value::Object(map) => map
            .get("display_value")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string(),
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_deserializes_dot_walked_fields() {
        let body = r#"{"result": [{
            "number": "INC0010001",
            "location.name": "Head Office",
            "cmdb_ci.name": "fw01",
            "short_description": "VPN down",
            "state": "Resolved",
            "category": null,
            "priority": "2 - High",
            "assigned_to.name": {"display_value": "Jo Tech", "link": "https://x/api"},
            "opened_at": "2024-03-02 09:15:00 AM",
            "sys_updated_by": "jtech",
            "closed_at": ""
        }]}"#;
        let response: TableResponse<ServiceNowTicket> = serde_json::from_str(body).unwrap();
        let ticket = &response.result[0];
        assert_eq!(ticket.number, "INC0010001");
        assert_eq!(ticket.location, "Head Office");
        assert_eq!(ticket.category, "");
        assert_eq!(ticket.risk, "");
        assert_eq!(ticket.assigned_to, "Jo Tech");
        assert_eq!(ticket.updated_by, "jtech");
    }
}
