use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use assert_cmd::{assert::Assert, Command};
use mockito::{Matcher, Server};
use once_cell::sync::Lazy;

use fiware_admin::constants::defaults;
use predicates::prelude::*;
use serde_json::{json, Value};

const SAMPLE_TOKEN: &str = "secret";

fn write_config(dir: &Path, server: &Server) -> PathBuf {
    let path = dir.join("config.json");
    let config = json!({
        "config": {
            "endpoint": format!("{}/v2", server.url()),
            "token": SAMPLE_TOKEN,
            "service": "smartcity",
            "retry_max_elapsed_secs": 0
        }
    });
    std::fs::write(&path, config.to_string()).unwrap();
    path
}

fn admin_assert<I, S>(args: I) -> Assert
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::cargo_bin("fiware-admin").unwrap();
    cmd.env_remove("FIWARE_ENDPOINT")
        .env_remove("FIWARE_TOKEN")
        .env_remove("FIWARE_SERVICE")
        .args(args)
        .assert()
}

fn mock_listing(server: &mut Server, entities: &[Value]) -> (mockito::Mock, mockito::Mock) {
    let first = server
        .mock("GET", "/v2/entities")
        .match_query(Matcher::UrlEncoded("offset".into(), "0".into()))
        .match_header("fiware-service", "smartcity")
        .with_body(serde_json::to_vec(entities).unwrap())
        .create();
    let last = server
        .mock("GET", "/v2/entities")
        .match_query(Matcher::UrlEncoded(
            "offset".into(),
            defaults::PAGE_LIMIT.to_string(),
        ))
        .with_body("[]")
        .create();
    (first, last)
}

static SAMPLE_ENTITIES: Lazy<Vec<Value>> = Lazy::new(|| {
    vec![
        json!({"id": "urn:ngsi-ld:Playground:1", "type": "Playground",
               "name": {"type": "Text", "value": "Stadtpark", "metadata": {}}}),
        json!({"id": "urn:ngsi-ld:Playground:2", "type": "Playground",
               "name": {"type": "Text", "value": "Donaulände", "metadata": {}}}),
    ]
});

#[test]
fn missing_config_option_fails() {
    admin_assert(["count"])
        .failure()
        .stderr(predicate::str::contains("-c/--config"));
}

#[test]
fn unknown_subcommand_fails() {
    let tempdir = tempfile::tempdir().unwrap();
    let config = tempdir.path().join("config.json");
    admin_assert([OsStr::new("frobnicate"), OsStr::new("-c"), config.as_os_str()])
        .failure()
        .stderr(predicate::str::contains("Subcommand must be one of"));
}

#[test]
fn unreadable_config_fails() {
    let tempdir = tempfile::tempdir().unwrap();
    let config = tempdir.path().join("missing.json");
    admin_assert([OsStr::new("count"), OsStr::new("-c"), config.as_os_str()])
        .failure()
        .stderr(predicate::str::contains("could not read config file"));
}

#[test]
fn count_prints_total() {
    let tempdir = tempfile::tempdir().unwrap();
    let mut server = Server::new();
    let (m0, m1) = mock_listing(&mut server, &SAMPLE_ENTITIES);
    let config = write_config(tempdir.path(), &server);

    admin_assert([OsStr::new("count"), OsStr::new("-c"), config.as_os_str()])
        .success()
        .stdout(predicate::str::contains("Total entities in Orion: 2"));
    m0.assert();
    m1.assert();
}

#[test]
fn fetch_prints_entities_as_json() {
    let tempdir = tempfile::tempdir().unwrap();
    let mut server = Server::new();
    let (_m0, _m1) = mock_listing(&mut server, &SAMPLE_ENTITIES);
    let config = write_config(tempdir.path(), &server);

    let assert = admin_assert([OsStr::new("fetch"), OsStr::new("-c"), config.as_os_str()]).success();
    let printed: Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(printed, Value::Array(SAMPLE_ENTITIES.clone()));
}

#[test]
fn service_option_overrides_config() {
    let tempdir = tempfile::tempdir().unwrap();
    let mut server = Server::new();
    let m = server
        .mock("GET", "/v2/entities")
        .match_query(Matcher::Any)
        .match_header("fiware-service", "krems")
        .with_body("[]")
        .expect(1)
        .create();
    let config = write_config(tempdir.path(), &server);

    admin_assert([
        OsStr::new("count"),
        OsStr::new("-c"),
        config.as_os_str(),
        OsStr::new("-s"),
        OsStr::new("krems"),
    ])
    .success()
    .stdout(predicate::str::contains("Total entities in Orion: 0"));
    m.assert();
}

#[test]
fn delete_posts_delete_batch() {
    let tempdir = tempfile::tempdir().unwrap();
    let mut server = Server::new();
    let (_m0, _m1) = mock_listing(&mut server, &SAMPLE_ENTITIES);
    let m = server
        .mock("POST", "/v2/op/update")
        .match_body(Matcher::Json(json!({
            "actionType": "delete",
            "entities": [
                {"id": "urn:ngsi-ld:Playground:1", "type": "Playground"},
                {"id": "urn:ngsi-ld:Playground:2", "type": "Playground"}
            ]
        })))
        .with_status(204)
        .expect(1)
        .create();
    let config = write_config(tempdir.path(), &server);

    admin_assert([OsStr::new("delete"), OsStr::new("-c"), config.as_os_str()])
        .success()
        .stdout(predicate::str::contains("Batch 1 result: 204"));
    m.assert();
}

#[test]
fn query_prints_latest_value() {
    let tempdir = tempfile::tempdir().unwrap();
    let mut server = Server::new();
    let _m = server
        .mock("GET", "/v2/entities/urn:ngsi-ld:AirQuality:STEF")
        .with_body(
            json!({
                "id": "urn:ngsi-ld:AirQuality:STEF",
                "type": "AirQuality",
                "NO2": {"type": "Number", "value": 21.5, "metadata": {}},
                "TimeInstant": {"type": "DateTime", "value": "2025-06-10T12:00:00.000Z", "metadata": {}}
            })
            .to_string(),
        )
        .create();
    let config = write_config(tempdir.path(), &server);

    admin_assert([
        OsStr::new("query"),
        OsStr::new("urn:ngsi-ld:AirQuality:STEF"),
        OsStr::new("NO2"),
        OsStr::new("-c"),
        config.as_os_str(),
    ])
    .success()
    .stdout(predicate::str::contains(
        "urn:ngsi-ld:AirQuality:STEF NO2 = 21.5 (2025-06-10T12:00:00.000Z)",
    ));
}

#[test]
fn query_unknown_entity_fails() {
    let tempdir = tempfile::tempdir().unwrap();
    let mut server = Server::new();
    let _m = server
        .mock("GET", "/v2/entities/urn:ngsi-ld:AirQuality:NONE")
        .with_status(404)
        .with_body(r#"{"error":"NotFound"}"#)
        .create();
    let config = write_config(tempdir.path(), &server);

    admin_assert([
        OsStr::new("query"),
        OsStr::new("urn:ngsi-ld:AirQuality:NONE"),
        OsStr::new("NO2"),
        OsStr::new("-c"),
        config.as_os_str(),
    ])
    .failure()
    .stderr(predicate::str::contains("No attribute 'NO2' found"));
}

#[test]
fn generate_uploads_measurements() {
    let tempdir = tempfile::tempdir().unwrap();
    let mut server = Server::new();
    let m = server
        .mock("POST", "/v2/op/update")
        .match_body(Matcher::PartialJson(json!({"actionType": "append_strict"})))
        .with_status(204)
        .expect(1)
        .create();
    let config = write_config(tempdir.path(), &server);
    let metadata = tempdir.path().join("metadata.json");
    std::fs::write(
        &metadata,
        json!({"location": {"type": "geo:json", "value": {"type": "Point", "coordinates": [15.6, 48.4]}}})
            .to_string(),
    )
    .unwrap();

    admin_assert([
        OsStr::new("generate"),
        OsStr::new("-c"),
        config.as_os_str(),
        OsStr::new("-t"),
        OsStr::new("WindSpeed"),
        OsStr::new("--min"),
        OsStr::new("3"),
        OsStr::new("--max"),
        OsStr::new("9"),
        OsStr::new("--count"),
        OsStr::new("5"),
        OsStr::new("--metadata"),
        metadata.as_os_str(),
    ])
    .success()
    .stdout(predicate::str::contains("urn:ngsi-ld:WindSpeed:"))
    .stdout(predicate::str::contains("geo:json"))
    .stdout(predicate::str::contains("Batch 1 result: 204"));
    m.assert();
}

#[test]
fn generate_rejects_inverted_range() {
    let tempdir = tempfile::tempdir().unwrap();
    let mut server = Server::new();
    let m = server.mock("POST", Matcher::Any).expect(0).create();
    let config = write_config(tempdir.path(), &server);

    admin_assert([
        OsStr::new("generate"),
        OsStr::new("-c"),
        config.as_os_str(),
        OsStr::new("--min"),
        OsStr::new("10"),
        OsStr::new("--max"),
        OsStr::new("1"),
    ])
    .failure()
    .stderr(predicate::str::contains("invalid range"));
    m.assert();
}
