use super::dialect::{Dialect, EndSignal};
use super::error::StreamError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    Streaming,
    Finished,
    Failed,
}

/// Decides when a turn is over.
///
/// Only the signals owned by the configured dialect count; `Finished` and
/// `Failed` are terminal.
#[derive(Debug)]
pub struct CompletionDetector {
    dialect: Dialect,
    state: DetectorState,
    frames: usize,
}

impl CompletionDetector {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            state: DetectorState::Streaming,
            frames: 0,
        }
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    pub fn is_terminal(&self) -> bool {
        self.state != DetectorState::Streaming
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Records one decoded frame and its end marker, if any.
    pub fn observe(&mut self, end: Option<EndSignal>) -> DetectorState {
        if self.is_terminal() {
            return self.state;
        }
        self.frames += 1;

        match end {
            Some(signal) if signal.dialect() == self.dialect => {
                self.state = DetectorState::Finished;
            }
            Some(signal) => {
                tracing::debug!(
                    ?signal,
                    dialect = self.dialect.as_str(),
                    "ignoring end signal from another dialect"
                );
            }
            None => {}
        }
        self.state
    }

    pub fn fail(&mut self) {
        if self.state == DetectorState::Streaming {
            self.state = DetectorState::Failed;
        }
    }

    /// Input is exhausted. Anything short of `Finished` is a truncated stream.
    pub fn end_of_input(&mut self) -> Result<(), StreamError> {
        match self.state {
            DetectorState::Finished => Ok(()),
            _ => {
                self.state = DetectorState::Failed;
                Err(StreamError::Truncated {
                    frames: self.frames,
                })
            }
        }
    }
}
