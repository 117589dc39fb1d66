//! PRTG collector against mock PRTG servers.

mod common;

use common::{
    customer, fixed_window, passhash_instance, prtg_mixed_table, prtg_sensor, prtg_table,
    token_instance, TIMEOUT,
};
use qbr::{Collector, PrtgCollector, Record, SourceError};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sensor_names(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .map(|r| match r {
            Record::Sensor(sensor) => sensor.name.clone(),
            other => panic!("unexpected record: {other:?}"),
        })
        .collect()
}

#[tokio::test]
async fn test_collects_alerting_sensors_from_every_instance() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/table.json"))
        .and(query_param("apitoken", "tok1"))
        .and(query_param("content", "sensors"))
        .and(query_param("filter_probe", "@sub(Acme)"))
        .and(query_param("filter_status", "5"))
        .respond_with(prtg_mixed_table(100))
        .expect(1)
        .mount(&first)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/table.json"))
        .and(query_param("username", "qbr"))
        .and(query_param("passhash", "123456"))
        .respond_with(prtg_table(vec![
            prtg_sensor(200, "HTTP", "Down (Partial)", 14),
            prtg_sensor(201, "Backup", "Paused (paused by user)", 7),
        ]))
        .expect(1)
        .mount(&second)
        .await;

    let mut acme = customer("Acme");
    acme.prtg_probe_substrings = vec!["Acme".to_string()];
    acme.prtg_instances = vec![
        token_instance(&first, "tok1"),
        passhash_instance(&second, "qbr", "123456"),
    ];

    let collector = PrtgCollector::new(TIMEOUT).unwrap();
    let records = collector.collect(&acme, &fixed_window()).await.unwrap();

    // Up and paused sensors are dropped; instance order is kept.
    assert_eq!(sensor_names(&records), vec!["Ping", "Disk Free", "HTTP"]);

    let Record::Sensor(sensor) = &records[0] else {
        panic!("expected a sensor");
    };
    assert_eq!(sensor.object_id, Some(100));
    assert_eq!(sensor.message, "timeout");
    assert!(sensor.instance.starts_with(&first.uri()));
}

#[tokio::test]
async fn test_failed_instance_does_not_hide_others() {
    let healthy = MockServer::start().await;
    let broken = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/table.json"))
        .respond_with(prtg_mixed_table(1))
        .mount(&healthy)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/table.json"))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html>Internal error</html>"))
        .mount(&broken)
        .await;

    let mut acme = customer("Acme");
    acme.prtg_instances = vec![
        token_instance(&broken, "tok"),
        token_instance(&healthy, "tok"),
    ];

    let collector = PrtgCollector::new(TIMEOUT).unwrap();
    let records = collector.collect(&acme, &fixed_window()).await.unwrap();
    assert_eq!(records.len(), 2);
}

#[tokio::test]
async fn test_all_instances_failing_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/table.json"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    let mut acme = customer("Acme");
    acme.prtg_instances = vec![token_instance(&server, "a"), token_instance(&server, "b")];

    let collector = PrtgCollector::new(TIMEOUT).unwrap();
    let result = collector.collect(&acme, &fixed_window()).await;

    match result {
        Err(SourceError::AllInstancesFailed { failed, last }) => {
            assert_eq!(failed, 2);
            assert!(matches!(*last, SourceError::Auth(_)));
        }
        other => panic!("expected all instances to fail, got {other:?}"),
    }
}

#[tokio::test]
async fn test_customer_without_instances_yields_nothing() {
    let collector = PrtgCollector::new(TIMEOUT).unwrap();
    let records = collector
        .collect(&customer("Acme"), &fixed_window())
        .await
        .unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_credentials_are_not_in_error_messages() {
    let mut acme = customer("Acme");
    acme.prtg_instances = vec![qbr::models::PrtgInstance {
        // Nothing listens on port 1.
        url: url::Url::parse("http://127.0.0.1:1").unwrap(),
        credentials: qbr::models::PrtgCredentials::ApiToken("super-secret".to_string()),
    }];

    let collector = PrtgCollector::new(TIMEOUT).unwrap();
    let err = collector
        .collect(&acme, &fixed_window())
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::AllInstancesFailed { failed: 1, .. }));
    assert!(!err.to_string().contains("super-secret"));
    assert!(!format!("{err:?}").contains("super-secret"));
}
