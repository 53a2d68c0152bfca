mod common;

use bulwark::{options::*, Coordinator, Error, LogTarget, SinkKind};
use bulwark_logging::Error as LoggingError;
use common::{First, Journal};
use std::fs;

#[test]
fn every_supported_level_constructs() {
  for level in ["debug", "info", "warn", "error"] {
    let journal = Journal::default();
    let result = Coordinator::new(
      None,
      vec![
        with_log_level(level),
        with_log_output(LogTarget::writer(journal.writer())),
      ],
    );
    assert!(result.is_ok(), "level {:?} should be accepted", level);
    assert_eq!(result.unwrap().options().log_level, level);
  }
}

#[test]
fn any_other_level_fails_construction() {
  for level in ["", "trace", "INFO", "Debug", "warning", "fatal", " info"] {
    let journal = Journal::default();
    let result = Coordinator::new(
      None,
      vec![
        with_log_level(level),
        with_log_output(LogTarget::writer(journal.writer())),
      ],
    );
    match result {
      Err(Error::Logging(LoggingError::InvalidLevel { value, .. })) => assert_eq!(value, level),
      other => panic!("level {:?} should be rejected, got {:?}", level, other),
    }
  }
}

#[test]
fn default_options_construct_on_stdout() {
  let coordinator = Coordinator::new(None, Vec::new()).unwrap();
  assert_eq!(coordinator.sink_kind(), SinkKind::Stdout);
  assert_eq!(coordinator.options().log_level, "debug");
  assert!(!coordinator.options().has_release_fn);
}

#[test]
fn rolling_file_output_writes_plain_lines() {
  let temp_dir = tempfile::tempdir().unwrap();
  let path = temp_dir.path().join("logs").join("project.log");

  let coordinator = Coordinator::new(
    None,
    vec![
      with_log_level("info"),
      with_log_output(LogTarget::RollingFile),
      with_log_path(&path),
      with_log_max_file_num(3),
      with_log_max_file_size(1024 * 1024),
    ],
  )
  .unwrap();
  assert_eq!(coordinator.sink_kind(), SinkKind::RollingFile);

  coordinator.error_transmit("storage", "error", Some(&First), false, false);

  let contents = fs::read_to_string(&path).unwrap();
  assert!(contents.contains("storage"));
  assert!(contents.contains("first"));
  assert!(!contents.contains('\x1b'), "file output carries no highlight band");
}

#[test]
fn rolling_file_output_rotates_and_caps_file_count() {
  let temp_dir = tempfile::tempdir().unwrap();
  let path = temp_dir.path().join("app.log");

  let coordinator = Coordinator::new(
    None,
    vec![
      with_log_output(LogTarget::RollingFile),
      with_log_path(&path),
      with_log_max_file_num(2),
      with_log_max_file_size(64),
    ],
  )
  .unwrap();

  for _ in 0..20 {
    coordinator.error_transmit("rotation", "info", Some(&First), false, false);
  }

  let files: Vec<_> = fs::read_dir(temp_dir.path()).unwrap().collect();
  assert_eq!(files.len(), 2, "one rolled file plus the active file");
  assert!(path.exists());
}

#[test]
fn unusable_rolling_file_path_fails_construction() {
  let temp_dir = tempfile::tempdir().unwrap();
  let blocker = temp_dir.path().join("blocker");
  fs::write(&blocker, b"not a directory").unwrap();

  let result = Coordinator::new(
    None,
    vec![
      with_log_output(LogTarget::RollingFile),
      with_log_path(blocker.join("nested").join("app.log")),
    ],
  );
  assert!(matches!(
    result,
    Err(Error::Logging(LoggingError::AppenderSetup { .. }))
  ));
}

#[test]
fn unrecognized_output_falls_back_to_stdout() {
  let coordinator = Coordinator::new(
    None,
    vec![with_log_output(LogTarget::parse("syslog"))],
  )
  .unwrap();
  assert_eq!(coordinator.sink_kind(), SinkKind::Stdout);
}

#[test]
fn options_document_feeds_construction() {
  let raw = bulwark::OptionsRaw::from_yaml_str("log_level: warn\nerr_chan_len: 5\n").unwrap();
  let coordinator = Coordinator::new(None, raw.into_option_fns()).unwrap();
  assert_eq!(coordinator.options().log_level, "warn");
  assert_eq!(coordinator.options().err_chan_len, 5);
}

#[test]
fn options_document_with_bad_level_fails_construction() {
  let raw = bulwark::OptionsRaw::from_json_str(r#"{"log_level":"loud"}"#).unwrap();
  assert!(Coordinator::new(None, raw.into_option_fns()).is_err());
}
