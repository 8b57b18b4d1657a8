use redbox_api::{connect, BackendVersion, Config, Error};
use std::io::Write;
use tempfile::NamedTempFile;

const SERVERS: &str = r#"
[http]
timeout_secs = 15

[servers.Test1_9]
version = "Redbox1"
base_url = "http://localhost:9000/redbox/api/v1"
api_key = "v1-key"
solr_url = "http://localhost:9000/solr/fascinator"

[servers.Test2_0]
version = "Redbox2"
base_url = "http://localhost:1500"
api_key = "v2-key"
branding = "default"
portal = "rdmp"

[servers.Legacy]
version = "Redbox1.9"
base_url = "http://localhost:1600"
branding = "default"
portal = "rdmp"

[servers.Untagged]
base_url = "http://localhost:1700"
branding = "default"
portal = "rdmp"
"#;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_from_file() {
    let file = write_config(SERVERS);
    let config = Config::load(Some(file.path())).unwrap();

    assert_eq!(config.http.timeout_secs, 15);
    assert_eq!(config.servers.len(), 4);
}

#[test]
fn test_version_tag_selects_backend() {
    let file = write_config(SERVERS);
    let config = Config::load(Some(file.path())).unwrap();

    let cases = [
        ("Test1_9", BackendVersion::Redbox1),
        ("Test2_0", BackendVersion::Redbox2),
        ("Legacy", BackendVersion::Redbox2),
        ("Untagged", BackendVersion::Redbox2),
    ];
    for (name, expected) in cases {
        let server = config.server(name).unwrap();
        let backend = connect(server, &config.http).unwrap();
        assert_eq!(backend.version(), expected, "server {name}");
    }
}

#[test]
fn test_redbox1_without_solr_is_rejected() {
    let file = write_config(
        r#"
        [servers.Broken]
        version = "Redbox1"
        base_url = "http://localhost:9000/redbox/api/v1"
        "#,
    );
    let config = Config::load(Some(file.path())).unwrap();
    let err = connect(config.server("Broken").unwrap(), &config.http).unwrap_err();
    assert!(matches!(err, Error::InvalidInput { ref field, .. } if field == "solr_url"));
}

#[test]
fn test_redbox2_without_portal_is_rejected() {
    let file = write_config(
        r#"
        [servers.Broken]
        base_url = "http://localhost:1500"
        branding = "default"
        "#,
    );
    let config = Config::load(Some(file.path())).unwrap();
    assert!(connect(config.server("Broken").unwrap(), &config.http).is_err());
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.toml");
    assert!(matches!(Config::load(Some(missing.as_path())), Err(Error::Config(_))));
}

#[test]
fn test_empty_config_is_rejected() {
    let file = write_config("[http]\ntimeout_secs = 5\n");
    assert!(matches!(
        Config::load(Some(file.path())),
        Err(Error::InvalidInput { .. })
    ));
}
