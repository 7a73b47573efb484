use std::io::{self, Write};
use std::time::Duration;

use ratatui::crossterm::cursor::MoveToColumn;
use ratatui::crossterm::queue;
use ratatui::crossterm::style::Print;
use ratatui::crossterm::terminal::{Clear, ClearType};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const FRAMES: [char; 4] = ['|', '/', '-', '\\'];
const TICK: Duration = Duration::from_millis(100);

/// Handle to a running waiting indicator.
///
/// The indicator stops when [`WaitingIndicator::stop`] is called or when the
/// handle is dropped, whichever comes first.
pub struct WaitingIndicator {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl WaitingIndicator {
    /// Starts drawing a spinner on stderr. A disabled indicator draws nothing
    /// but can still be stopped.
    pub fn start(enabled: bool) -> Self {
        let token = CancellationToken::new();
        let task = enabled.then(|| tokio::spawn(spin(token.clone())));
        Self { token, task }
    }

    /// Stops the spinner and waits for it to clear its line.
    pub async fn stop(mut self) {
        self.token.cancel();
        // Join so the line is cleared before the reply starts printing.
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for WaitingIndicator {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn spin(token: CancellationToken) {
    let mut interval = tokio::time::interval(TICK);
    let mut frame = 0usize;
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = interval.tick() => {
                let _ = draw(&mut io::stderr(), FRAMES[frame % FRAMES.len()]);
                frame = frame.wrapping_add(1);
            }
        }
    }
    let _ = clear(&mut io::stderr());
}

fn draw(out: &mut impl Write, glyph: char) -> io::Result<()> {
    queue!(out, MoveToColumn(0), Print(glyph))?;
    out.flush()
}

fn clear(out: &mut impl Write) -> io::Result<()> {
    queue!(out, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
    out.flush()
}
