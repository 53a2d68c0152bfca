use crate::error::{Error, Result};

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const ROLLED_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

// Regex to parse the middle of rolled filenames like: "prefix.YYYY-MM-DD_HH-MM-SS.1.log"
// Captures: 1=timestamp, 2=sequence
static ROLLED_FILE_REGEX: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"^\.(\d{4}-\d{2}-\d{2}_\d{2}-\d{2}-\d{2})\.(\d+)$").expect("Rolled file regex should be valid")
});

/// Where the active file lives and when it is rolled over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollingPolicy {
  pub directory: PathBuf,
  pub file_name_prefix: String,
  pub file_name_suffix: String,
  /// Roll once the active file reaches this many bytes. `None` never rolls.
  pub max_file_size: Option<u64>,
  /// Maximum number of files on disk, the active file included. `None` keeps everything.
  pub max_files: Option<usize>,
}

impl RollingPolicy {
  /// Splits `path` into directory, stem and extension. A zero limit disables that limit.
  pub fn from_path(path: &Path, max_files: usize, max_file_size: u64) -> Self {
    let directory = match path.parent() {
      Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
      _ => PathBuf::from("."),
    };
    let file_name_prefix = path
      .file_stem()
      .and_then(|s| s.to_str())
      .unwrap_or("bulwark")
      .to_string();
    let file_name_suffix = path
      .extension()
      .and_then(|s| s.to_str())
      .map(|ext| format!(".{}", ext))
      .unwrap_or_default();

    Self {
      directory,
      file_name_prefix,
      file_name_suffix,
      max_file_size: (max_file_size > 0).then_some(max_file_size),
      max_files: (max_files > 0).then_some(max_files),
    }
  }

  pub fn base_path(&self) -> PathBuf {
    self
      .directory
      .join(format!("{}{}", self.file_name_prefix, self.file_name_suffix))
  }

  fn rolled_path(&self, timestamp: DateTime<Local>, sequence: u32) -> PathBuf {
    self.directory.join(format!(
      "{}.{}.{}{}",
      self.file_name_prefix,
      format_timestamp(timestamp),
      sequence,
      self.file_name_suffix
    ))
  }

  /// Recovers `(timestamp, sequence)` from a file name produced by `rolled_path`.
  fn parse_rolled_name(&self, file_name: &str) -> Option<(DateTime<Local>, u32)> {
    let middle = file_name
      .strip_prefix(&self.file_name_prefix)?
      .strip_suffix(&self.file_name_suffix)?;
    let caps = ROLLED_FILE_REGEX.captures(middle)?;
    let naive = NaiveDateTime::parse_from_str(&caps[1], ROLLED_TIMESTAMP_FORMAT).ok()?;
    let timestamp = Local.from_local_datetime(&naive).earliest()?;
    let sequence = caps[2].parse::<u32>().ok()?;
    Some((timestamp, sequence))
  }
}

fn format_timestamp(timestamp: DateTime<Local>) -> String {
  timestamp.format(ROLLED_TIMESTAMP_FORMAT).to_string()
}

/// A parsed rolled file, ordered newest first.
#[derive(Debug, Eq, PartialEq, Clone)]
struct RolledFile {
  timestamp: DateTime<Local>,
  sequence: u32,
  path: PathBuf,
}

impl Ord for RolledFile {
  fn cmp(&self, other: &Self) -> std::cmp::Ordering {
    // Sort by timestamp DESCENDING (newest first), then by sequence DESCENDING.
    other
      .timestamp
      .cmp(&self.timestamp)
      .then_with(|| other.sequence.cmp(&self.sequence))
  }
}

impl PartialOrd for RolledFile {
  fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
    Some(self.cmp(other))
  }
}

/// A `Write` implementation that rolls the active file by size and caps the file count.
pub struct RollingWriter {
  policy: RollingPolicy,
  writer: Option<BufWriter<File>>,
  current_path: PathBuf,
  current_size: u64,
}

impl RollingWriter {
  /// Opens (or creates) the active file, creating the directory if needed.
  pub fn new(policy: RollingPolicy) -> Result<Self> {
    if !policy.directory.exists() {
      fs::create_dir_all(&policy.directory).map_err(|e| Error::AppenderSetup {
        appender_name: "rolling_file".to_string(),
        reason: format!("Failed to create directory {:?}: {}", policy.directory, e),
      })?;
    }

    let current_path = policy.base_path();
    let (writer, current_size) = Self::open_file(&current_path)?;

    Ok(Self {
      policy,
      writer: Some(writer),
      current_path,
      current_size,
    })
  }

  pub fn current_path(&self) -> &Path {
    &self.current_path
  }

  fn open_file(path: &Path) -> Result<(BufWriter<File>, u64)> {
    let file = OpenOptions::new()
      .create(true)
      .append(true)
      .open(path)
      .map_err(|e| Error::AppenderSetup {
        appender_name: "rolling_file".to_string(),
        reason: format!("Failed to open log file {:?}: {}", path, e),
      })?;
    let current_size = file.metadata()?.len();
    Ok((BufWriter::new(file), current_size))
  }

  fn roll(&mut self, now: DateTime<Local>) -> Result<()> {
    // 1. Flush and close the active file before renaming it.
    if let Some(mut old_writer) = self.writer.take() {
      old_writer.flush()?;
    }

    // 2. Next sequence number among files rolled within the same second.
    let rolled_files = self.find_rolled_files()?;
    let stamp = format_timestamp(now);
    let next_sequence = rolled_files
      .iter()
      .filter(|rf| format_timestamp(rf.timestamp) == stamp)
      .map(|rf| rf.sequence)
      .max()
      .unwrap_or(0)
      + 1;

    // 3. Rename the active file.
    let rolled_path = self.policy.rolled_path(now, next_sequence);
    if self.current_path.exists() {
      fs::rename(&self.current_path, &rolled_path)?;
    }

    // 4. Reopen the active file and reset state.
    let (new_writer, new_size) = Self::open_file(&self.current_path)?;
    self.writer = Some(new_writer);
    self.current_size = new_size;

    // 5. Enforce the file-count cap.
    let mut all_files = rolled_files;
    all_files.push(RolledFile {
      timestamp: now,
      sequence: next_sequence,
      path: rolled_path,
    });
    all_files.sort();
    self.cleanup(all_files);
    Ok(())
  }

  fn find_rolled_files(&self) -> Result<Vec<RolledFile>> {
    let mut files = Vec::new();
    if !self.policy.directory.exists() {
      return Ok(files);
    }

    for entry in fs::read_dir(&self.policy.directory)? {
      let path = entry?.path();
      if !path.is_file() {
        continue;
      }
      if let Some(file_name) = path.file_name().and_then(|n| n.to_str()) {
        if let Some((timestamp, sequence)) = self.policy.parse_rolled_name(file_name) {
          files.push(RolledFile {
            timestamp,
            sequence,
            path,
          });
        }
      }
    }
    files.sort();
    Ok(files)
  }

  /// Deletes rolled files beyond the retention limit. `sorted_files` is newest first.
  fn cleanup(&self, sorted_files: Vec<RolledFile>) {
    let Some(max_files) = self.policy.max_files else {
      return;
    };
    // The active file counts against the cap.
    let max_rolled = max_files.saturating_sub(1);
    for old_file in sorted_files.iter().skip(max_rolled) {
      if let Err(e) = fs::remove_file(&old_file.path) {
        eprintln!(
          "[bulwark_logging:WARN] Failed to delete old log file {:?}: {}",
          old_file.path, e
        );
      }
    }
  }

  fn write_internal(&mut self, buf: &[u8], now: DateTime<Local>) -> std::io::Result<usize> {
    let to_io_error = |e: Error| std::io::Error::new(std::io::ErrorKind::Other, e.to_string());

    if self.writer.is_none() {
      // A previous roll failed half way; reopen the active file.
      let (writer, size) = Self::open_file(&self.current_path).map_err(to_io_error)?;
      self.current_size = size;
      self.writer = Some(writer);
    }

    let bytes_written = match self.writer.as_mut() {
      Some(writer) => writer.write(buf)?,
      None => 0,
    };
    if bytes_written > 0 {
      self.current_size += bytes_written as u64;
      if let Some(max_size) = self.policy.max_file_size {
        if self.current_size >= max_size {
          self.roll(now).map_err(to_io_error)?;
        }
      }
    }
    Ok(bytes_written)
  }
}

impl Write for RollingWriter {
  fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
    self.write_internal(buf, Local::now())
  }

  fn flush(&mut self) -> std::io::Result<()> {
    match self.writer.as_mut() {
      Some(writer) => writer.flush(),
      None => Ok(()),
    }
  }
}

impl Drop for RollingWriter {
  fn drop(&mut self) {
    let _ = self.flush();
  }
}
