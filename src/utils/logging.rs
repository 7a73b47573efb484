use crate::core::message::{Message, Role};
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Appends finished conversation turns to a plain-text transcript file.
///
/// A log without a file accepts every call and writes nothing.
#[derive(Debug, Default)]
pub struct TranscriptLog {
    file_path: Option<PathBuf>,
}

impl TranscriptLog {
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Opens (or creates) the transcript, failing early if it is not writable.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            file_path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// User messages are prefixed with `You:`, assistant replies are written
    /// as-is and system prompts are skipped.
    pub fn log_message(&self, message: &Message) -> io::Result<()> {
        match message.role {
            Role::User => self.write_block(&format!("You: {}", message.content)),
            Role::Assistant if !message.content.is_empty() => self.write_block(&message.content),
            _ => Ok(()),
        }
    }

    /// Writes an out-of-band note such as an interrupted reply marker.
    pub fn log_note(&self, note: &str) -> io::Result<()> {
        self.write_block(&format!("## {note}"))
    }

    fn write_block(&self, content: &str) -> io::Result<()> {
        let Some(file_path) = &self.file_path else {
            return Ok(());
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)?;
        let mut writer = BufWriter::new(file);

        for line in content.lines() {
            writeln!(writer, "{line}")?;
        }
        // Blank line between entries.
        writeln!(writer)?;
        writer.flush()
    }
}
