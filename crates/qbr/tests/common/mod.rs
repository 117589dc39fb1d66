//! Shared fixtures for the HTTP integration tests.

#![allow(dead_code)]

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use url::Url;
use wiremock::{MockServer, Request, ResponseTemplate};

use qbr::models::{PrtgCredentials, PrtgInstance};
use qbr::{Customer, ReportWindow, SheetTargets};

pub const TIMEOUT: Duration = Duration::from_secs(5);

/// 2024-01-05 13:04:05 to 2024-04-04 13:04:05 UTC.
pub fn fixed_window() -> ReportWindow {
    ReportWindow {
        start: Utc.with_ymd_and_hms(2024, 1, 5, 13, 4, 5).unwrap(),
        end: Utc.with_ymd_and_hms(2024, 4, 4, 13, 4, 5).unwrap(),
    }
}

pub fn in_window(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, 8, 0, 0).unwrap()
}

pub fn customer(name: &str) -> Customer {
    Customer {
        name: name.to_string(),
        servicenow_aliases: Vec::new(),
        opsgenie_tag: None,
        prtg_instances: Vec::new(),
        prtg_probe_substrings: Vec::new(),
        sheets: SheetTargets::default(),
    }
}

pub fn token_instance(server: &MockServer, token: &str) -> PrtgInstance {
    PrtgInstance {
        url: Url::parse(&server.uri()).unwrap(),
        credentials: PrtgCredentials::ApiToken(token.to_string()),
    }
}

pub fn passhash_instance(server: &MockServer, username: &str, passhash: &str) -> PrtgInstance {
    PrtgInstance {
        url: Url::parse(&server.uri()).unwrap(),
        credentials: PrtgCredentials::Passhash {
            username: username.to_string(),
            passhash: passhash.to_string(),
        },
    }
}

// ============================================================================
// Opsgenie
// ============================================================================

pub fn opsgenie_query(tag: &str) -> String {
    format!("createdAt >= 05-01-2024 AND tag: \"{tag}\"")
}

pub fn opsgenie_alert(id: &str, created_at: DateTime<Utc>) -> Value {
    json!({
        "id": id,
        "tinyId": "42",
        "alias": format!("alias-{id}"),
        "message": format!("Alert {id}"),
        "status": "closed",
        "acknowledged": true,
        "isSeen": true,
        "tags": ["acme"],
        "count": 1,
        "source": "prtg",
        "owner": "",
        "priority": "P3",
        "createdAt": created_at.to_rfc3339(),
        "updatedAt": created_at.to_rfc3339()
    })
}

pub fn opsgenie_page(alerts: Vec<Value>, next: Option<&str>) -> ResponseTemplate {
    let mut paging = json!({"first": "https://api.opsgenie.com/v2/alerts?offset=0"});
    if let Some(next) = next {
        paging["next"] = json!(next);
    }
    ResponseTemplate::new(200).set_body_json(json!({
        "data": alerts,
        "paging": paging,
        "took": 0.05,
        "requestId": "0f7e4c2a"
    }))
}

// ============================================================================
// ServiceNow
// ============================================================================

/// Basic auth header for `svc` / `pw`.
pub const SERVICENOW_AUTH: &str = "Basic c3ZjOnB3";

pub fn servicenow_query(alias: &str) -> String {
    format!(
        "company.name={alias}^sys_created_on>=javascript:gs.dateGenerate('2024-01-05','13:04:05')^ORDERBYsys_created_on"
    )
}

pub fn servicenow_ticket(number: &str, opened_at: &str) -> Value {
    json!({
        "number": number,
        "location.name": "HQ",
        "cmdb_ci.name": "fw01",
        "short_description": format!("Ticket {number}"),
        "state": "Closed",
        "category": "Network",
        "priority": "3 - Moderate",
        "risk": "",
        "assigned_to.name": "Jo Tech",
        "opened_at": opened_at,
        "sys_updated_by": "jtech",
        "closed_at": ""
    })
}

pub fn servicenow_result(tickets: Vec<Value>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"result": tickets}))
}

// ============================================================================
// PRTG
// ============================================================================

pub fn prtg_sensor(objid: u64, name: &str, status: &str, status_raw: i64) -> Value {
    json!({
        "objid": objid,
        "name": name,
        "parentid": 2001,
        "downtimesince": "1 h 5 m",
        "downtimesince_raw": 3900,
        "status": status,
        "status_raw": status_raw,
        "probe": "Acme Probe",
        "group": "Servers",
        "device": "dc01",
        "message": "<div>timeout</div>",
        "message_raw": "timeout"
    })
}

pub fn prtg_table(sensors: Vec<Value>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "prtg-version": "23.4.90.1299",
        "treesize": sensors.len(),
        "sensors": sensors
    }))
}

/// Two alerting sensors and one that is up.
pub fn prtg_mixed_table(base: u64) -> ResponseTemplate {
    prtg_table(vec![
        prtg_sensor(base, "Ping", "Down", 5),
        prtg_sensor(base + 1, "Disk Free", "Warning", 4),
        prtg_sensor(base + 2, "CPU Load", "Up", 3),
    ])
}

// ============================================================================
// Smartsheet
// ============================================================================

pub const SMARTSHEET_AUTH: &str = "Bearer ss-key";

pub fn smartsheet_sheet(id: u64, columns: usize, row_ids: &[u64]) -> ResponseTemplate {
    // Column indices listed in reverse to check ordering by index.
    let columns: Vec<Value> = (0..columns)
        .rev()
        .map(|i| json!({"id": 1000 + i, "index": i, "title": format!("Col {i}")}))
        .collect();
    let rows: Vec<Value> = row_ids
        .iter()
        .enumerate()
        .map(|(n, id)| json!({"id": id, "rowNumber": n + 1}))
        .collect();
    ResponseTemplate::new(200).set_body_json(json!({
        "id": id,
        "name": format!("Sheet {id}"),
        "totalRowCount": row_ids.len(),
        "columns": columns,
        "rows": rows
    }))
}

pub fn smartsheet_success() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "message": "SUCCESS",
        "resultCode": 0,
        "result": []
    }))
}

/// Requests the server saw with the given method and path.
pub async fn requests_to(server: &MockServer, method: &str, path: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.method.as_str() == method && r.url.path() == path)
        .collect()
}

/// Rows posted to one sheet, in request order.
pub async fn posted_rows(server: &MockServer, sheet_id: u64) -> Vec<Value> {
    requests_to(server, "POST", &format!("/sheets/{sheet_id}/rows"))
        .await
        .iter()
        .flat_map(|r| {
            let body: Vec<Value> = serde_json::from_slice(&r.body).unwrap();
            body
        })
        .collect()
}
