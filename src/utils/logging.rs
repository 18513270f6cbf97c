use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::core::message::ChatMessage;

/// Optional append-only transcript log, independent of `tracing`
/// diagnostics. Inactive until a file is set; toggling keeps the file.
pub struct TranscriptLog {
    file_path: Option<String>,
    is_active: bool,
}

impl TranscriptLog {
    pub fn new(log_file: Option<String>) -> Result<Self, Box<dyn std::error::Error>> {
        let mut log = TranscriptLog {
            file_path: log_file,
            is_active: false,
        };
        if let Some(path) = log.file_path.clone() {
            log.test_file_access(&path)?;
            log.is_active = true;
        }
        Ok(log)
    }

    pub fn set_log_file(&mut self, path: String) -> Result<String, Box<dyn std::error::Error>> {
        self.test_file_access(&path)?;
        self.file_path = Some(path.clone());
        self.is_active = true;
        Ok(format!("Transcript logging enabled to: {path}"))
    }

    pub fn toggle(&mut self) -> Result<String, Box<dyn std::error::Error>> {
        match &self.file_path {
            Some(path) => {
                self.is_active = !self.is_active;
                if self.is_active {
                    Ok(format!("Transcript logging resumed to: {path}"))
                } else {
                    Ok(format!("Transcript logging paused (file: {path})"))
                }
            }
            None => Err("No log file set; pass one at startup to enable logging.".into()),
        }
    }

    /// Append one finalized message. User turns carry a sender prefix,
    /// system turns a `##` marker, assistant turns land as-is.
    pub fn log_message(&self, message: &ChatMessage) -> Result<(), Box<dyn std::error::Error>> {
        let Some(file_path) = self.file_path.as_deref().filter(|_| self.is_active) else {
            return Ok(());
        };

        let file = OpenOptions::new().create(true).append(true).open(file_path)?;
        let mut writer = BufWriter::new(file);

        let rendered = if message.sender.is_user() {
            format!("{}: {}", message.sender.as_str(), message.text)
        } else if message.sender.is_system() {
            format!("## {}", message.text)
        } else {
            message.text.clone()
        };

        for line in rendered.lines() {
            writeln!(writer, "{line}")?;
        }
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn status_string(&self) -> String {
        match (&self.file_path, self.is_active) {
            (None, _) => "disabled".to_string(),
            (Some(path), true) => format!(
                "active ({})",
                Path::new(path)
                    .file_name()
                    .unwrap_or_default()
                    .to_string_lossy()
            ),
            (Some(path), false) => format!(
                "paused ({})",
                Path::new(path)
                    .file_name()
                    .unwrap_or_default()
                    .to_string_lossy()
            ),
        }
    }

    fn test_file_access(&self, path: &str) -> Result<(), Box<dyn std::error::Error>> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.flush()?;
        Ok(())
    }
}
