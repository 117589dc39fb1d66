//! PRTG table API response models and sensor status codes.

use serde::{Deserialize, Deserializer};

/// Raw sensor status codes that count as alerting.
///
/// Warning, Down, Unusual, Down (Acknowledged), Down (Partial). Up (3) and
/// the Paused states (7, 8, 9, 12) are excluded, as are Unknown and
/// housekeeping states such as Scanning.
pub const ALERTING_STATUSES: [i64; 5] = [4, 5, 10, 13, 14];

/// Whether a raw PRTG status code is an alerting state.
#[must_use]
pub fn is_alerting(status_raw: i64) -> bool {
    ALERTING_STATUSES.contains(&status_raw)
}

/// Columns requested from `table.json`.
pub const SENSOR_COLUMNS: &str = "objid,name,parentid,downtimesince,status,probe,group,device,message";

/// Body of `GET /api/table.json?content=sensors`.
#[derive(Debug, Clone, Deserialize)]
pub struct SensorTable {
    #[serde(rename = "prtg-version", default)]
    pub prtg_version: String,
    #[serde(default)]
    pub treesize: u64,
    #[serde(default)]
    pub sensors: Vec<PrtgSensor>,
}

/// One row of the sensors table.
///
/// PRTG returns display values next to `_raw` values; the message display
/// value is HTML, so the raw message is used instead.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrtgSensor {
    pub objid: Option<u64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: String,
    #[serde(default)]
    pub status_raw: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub downtimesince: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub probe: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub group: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub device: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub message_raw: String,
}

// PRTG renders empty cells as "" and numeric cells as numbers.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alerting_statuses() {
        assert!(is_alerting(4));
        assert!(is_alerting(5));
        assert!(is_alerting(14));
        assert!(!is_alerting(3), "up is not alerting");
        assert!(!is_alerting(7), "paused by user is not alerting");
        assert!(!is_alerting(9), "paused by schedule is not alerting");
        assert!(!is_alerting(1));
    }

    #[test]
    fn test_sensor_table_deserializes() {
        let body = r#"{
            "prtg-version": "23.4.90.1299",
            "treesize": 1,
            "sensors": [{
                "objid": 2044,
                "name": "Ping",
                "parentid": 2043,
                "downtimesince": "3 h 12 m",
                "downtimesince_raw": 11520,
                "status": "Down",
                "status_raw": 5,
                "probe": "Acme Probe",
                "group": "Servers",
                "device": "dc01",
                "message": "<div class=\"status\">Request timed out</div>",
                "message_raw": "Request timed out"
            }]
        }"#;
        let table: SensorTable = serde_json::from_str(body).unwrap();
        assert_eq!(table.treesize, 1);
        let sensor = &table.sensors[0];
        assert_eq!(sensor.objid, Some(2044));
        assert_eq!(sensor.status_raw, 5);
        assert_eq!(sensor.message_raw, "Request timed out");
    }
}
