use std::io::Write;

use folio::config::{FolioConfig, WidgetSettings};
use folio::error::FolioError;
use folio::profile::Profile;
use folio::provider::ChatProvider;
use folio::session::SessionClient;
use folio::types::ReasoningEffort;
use pretty_assertions::assert_eq;
use tempfile::NamedTempFile;

fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn settings_file_overrides_defaults() {
    let file = write_temp(
        r#"
model = "gemini-2.5-flash"
max_output_tokens = 800
reasoning_effort = "low"
base_url = "http://localhost:9999/v1beta"
"#,
    );

    let settings = WidgetSettings::from_file(file.path()).unwrap();
    let config = FolioConfig::with_settings(settings);
    let generation = config.generation_settings();

    assert_eq!(config.model(), "gemini-2.5-flash");
    assert_eq!(config.base_url(), Some("http://localhost:9999/v1beta"));
    assert_eq!(generation.max_output_tokens, Some(800));
    assert_eq!(generation.reasoning_effort, Some(ReasoningEffort::Low));
    assert!(generation.temperature.is_none());
}

#[test]
fn explicit_missing_file_is_a_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    let err = FolioConfig::load(Some(&missing)).unwrap_err();
    assert!(matches!(err, FolioError::Configuration(_)));
}

#[test]
fn malformed_settings_file_is_a_toml_error() {
    let file = write_temp("max_output_tokens = \"many\"\n");
    let err = WidgetSettings::from_file(file.path()).unwrap_err();
    assert!(matches!(err, FolioError::Toml(_)));
}

#[test]
fn profile_loads_from_file() {
    let file = write_temp(
        r#"
owner = "Ada"
resume = "/ada.pdf"
greeting = "Hello!"
suggested_questions = ["What did Ada build?"]
preamble = """
You answer questions about Ada.
"""
"#,
    );
    let profile = Profile::load(file.path()).unwrap();
    assert_eq!(profile.owner, "Ada");
    assert_eq!(profile.resume.as_deref(), Some("/ada.pdf"));
    assert_eq!(profile.preamble, "You answer questions about Ada.");
    assert_eq!(profile.welcome_panel().suggested_questions.len(), 1);
}

#[test]
fn client_from_config_uses_the_configured_model() {
    let settings = WidgetSettings {
        model: "gemini-2.0-flash".to_string(),
        ..WidgetSettings::default()
    };
    let mut client = SessionClient::from_config(&FolioConfig::with_settings(settings));
    assert_eq!(client.provider().provider_name(), "google");
    assert_eq!(client.provider().model_id(), "gemini-2.0-flash");

    let session = client.open().unwrap();
    assert_eq!(session.settings().max_output_tokens, Some(500));
}
