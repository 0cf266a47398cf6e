use std::io::Write;

use cogent_core::config::ExecutionConfig;
use cogent_core::error::ErrorKind;

#[test]
fn test_load_full_config_from_file() {
    let toml_content = r#"
chat_timeout_secs = 120
task_timeout_secs = 900
subtask_timeout_secs = 30
max_iterations = 20
safety_margin = 3
retry_on_failure = true
max_retry_attempts = 5
debug = true
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = ExecutionConfig::load(tmp.path()).expect("load config");

    assert_eq!(config.chat_timeout_secs, 120);
    assert_eq!(config.task_timeout_secs, 900);
    assert_eq!(config.subtask_timeout_secs, 30);
    assert_eq!(config.max_iterations, 20);
    assert_eq!(config.safety_margin, 3);
    assert!(config.retry_on_failure);
    assert_eq!(config.max_retry_attempts, 5);
    assert!(config.debug);
    assert_eq!(config.hard_iteration_limit(), 60);
}

#[test]
fn test_env_var_expansion_in_config() {
    std::env::set_var("COGENT_TEST_MAX_ITERATIONS", "8");

    let toml_content = r#"
max_iterations = ${COGENT_TEST_MAX_ITERATIONS}
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = ExecutionConfig::load(tmp.path()).expect("load config");
    assert_eq!(config.max_iterations, 8);

    std::env::remove_var("COGENT_TEST_MAX_ITERATIONS");
}

#[test]
fn test_minimal_config_uses_defaults() {
    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(b"max_iterations = 10\n").expect("write toml");

    let config = ExecutionConfig::load(tmp.path()).expect("load config");

    assert_eq!(config.max_iterations, 10);
    assert_eq!(config.chat_timeout_secs, 300);
    assert_eq!(config.task_timeout_secs, 600);
    assert_eq!(config.subtask_timeout_secs, 60);
    assert_eq!(config.safety_margin, 2);
    assert!(!config.retry_on_failure);
    assert!(!config.debug);
}

#[test]
fn test_invalid_combination_rejected_at_load() {
    let toml_content = r#"
task_timeout_secs = 10
subtask_timeout_secs = 30
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let err = ExecutionConfig::load(tmp.path()).expect_err("load should fail");
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_missing_file_is_a_config_error() {
    let err = ExecutionConfig::load(std::path::Path::new("/nonexistent/cogent.toml"))
        .expect_err("load should fail");
    assert_eq!(err.kind(), ErrorKind::Configuration);
}
