use crate::error::{Error, Result};
use crate::options::{
  with_err_chan_len, with_log_level, with_log_max_file_num, with_log_max_file_size,
  with_log_output, with_log_path, OptionFn,
};
use bulwark_logging::LogTarget;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// The serializable subset of [`Options`](crate::Options).
///
/// Every field is optional; absent fields keep whatever the defaults (or
/// earlier option mutators) set. Callbacks cannot be expressed here.
///
/// ```yaml
/// log_level: info
/// log_output: rotating-file
/// log_path: /var/log/app/app.log
/// log_max_file_num: 5
/// log_max_file_size: 1048576
/// ```
#[derive(Debug, Deserialize, PartialEq, Eq, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct OptionsRaw {
  pub log_level: Option<String>,
  pub log_output: Option<String>,
  pub log_path: Option<String>,
  pub log_max_file_num: Option<usize>,
  pub log_max_file_size: Option<u64>,
  pub err_chan_len: Option<usize>,
}

impl OptionsRaw {
  pub fn from_yaml_str(document: &str) -> Result<Self> {
    serde_yaml::from_str(document).map_err(|e| Error::ConfigParse(e.to_string()))
  }

  pub fn from_json_str(document: &str) -> Result<Self> {
    serde_json::from_str(document).map_err(|e| Error::ConfigParse(e.to_string()))
  }

  /// Reads a document from disk. `.json` files are parsed as JSON, anything else as YAML.
  pub fn from_file(path: &Path) -> Result<Self> {
    let document = fs::read_to_string(path)?;
    match path.extension().and_then(|ext| ext.to_str()) {
      Some("json") => Self::from_json_str(&document),
      _ => Self::from_yaml_str(&document),
    }
  }

  /// Converts the document into option mutators, one per present field.
  pub fn into_option_fns(self) -> Vec<OptionFn> {
    let mut option_fns = Vec::new();
    if let Some(level) = self.log_level {
      option_fns.push(with_log_level(level));
    }
    if let Some(output) = self.log_output {
      option_fns.push(with_log_output(LogTarget::parse(&output)));
    }
    if let Some(path) = self.log_path {
      option_fns.push(with_log_path(path));
    }
    if let Some(num) = self.log_max_file_num {
      option_fns.push(with_log_max_file_num(num));
    }
    if let Some(size) = self.log_max_file_size {
      option_fns.push(with_log_max_file_size(size));
    }
    if let Some(len) = self.err_chan_len {
      option_fns.push(with_err_chan_len(len));
    }
    option_fns
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::options::Options;
  use pretty_assertions::assert_eq;
  use std::path::PathBuf;

  #[test]
  fn yaml_document_sets_present_fields_only() {
    let raw = OptionsRaw::from_yaml_str("log_level: warn\nlog_max_file_num: 4\n").unwrap();
    assert_eq!(
      raw,
      OptionsRaw {
        log_level: Some("warn".to_string()),
        log_max_file_num: Some(4),
        ..Default::default()
      }
    );

    let options = Options::build(raw.into_option_fns());
    assert_eq!(options.log_level, "warn");
    assert_eq!(options.log_max_file_num, 4);
    assert_eq!(options.log_path, PathBuf::from("./project.log"));
  }

  #[test]
  fn json_document_matches_equivalent_mutators() {
    let raw = OptionsRaw::from_json_str(
      r#"{"log_level":"info","log_output":"rotating-file","log_path":"logs/app.log","log_max_file_size":2048,"err_chan_len":8}"#,
    )
    .unwrap();
    let from_document = Options::build(raw.into_option_fns());
    let from_code = Options::build(vec![
      with_log_level("info"),
      with_log_output(LogTarget::RollingFile),
      with_log_path("logs/app.log"),
      with_log_max_file_size(2048),
      with_err_chan_len(8),
    ]);

    assert_eq!(from_document.log_level, from_code.log_level);
    assert!(matches!(from_document.log_output, LogTarget::RollingFile));
    assert_eq!(from_document.log_path, from_code.log_path);
    assert_eq!(from_document.log_max_file_size, from_code.log_max_file_size);
    assert_eq!(from_document.err_chan_len, from_code.err_chan_len);
  }

  #[test]
  fn unknown_output_name_is_kept_for_the_sink_to_reject() {
    let raw = OptionsRaw::from_yaml_str("log_output: syslog").unwrap();
    let options = Options::build(raw.into_option_fns());
    assert!(matches!(options.log_output, LogTarget::Unrecognized(name) if name == "syslog"));
  }

  #[test]
  fn unknown_fields_are_rejected() {
    let result = OptionsRaw::from_yaml_str("log_colour: blue");
    assert!(matches!(result, Err(Error::ConfigParse(_))));
  }

  #[test]
  fn from_file_picks_the_parser_by_extension() {
    let temp_dir = tempfile::tempdir().unwrap();
    let json_path = temp_dir.path().join("bulwark.json");
    std::fs::write(&json_path, r#"{"log_level":"error"}"#).unwrap();
    let yaml_path = temp_dir.path().join("bulwark.yaml");
    std::fs::write(&yaml_path, "log_level: debug").unwrap();

    assert_eq!(
      OptionsRaw::from_file(&json_path).unwrap().log_level.as_deref(),
      Some("error")
    );
    assert_eq!(
      OptionsRaw::from_file(&yaml_path).unwrap().log_level.as_deref(),
      Some("debug")
    );
  }

  #[test]
  fn from_file_reports_a_missing_file() {
    let result = OptionsRaw::from_file(Path::new("/definitely/not/here.yaml"));
    assert!(matches!(result, Err(Error::ConfigRead(_))));
  }
}
