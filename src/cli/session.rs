//! One prompt/reply exchange as seen from the terminal.

use std::error::Error;
use std::io::{self, Write};

use tracing::warn;

use crate::core::client::{ClientError, CompanionClient};
use crate::core::message::Message;
use crate::core::stream::DeltaCallback;
use crate::ui::render::ReplyRenderer;
use crate::utils::logging::TranscriptLog;

pub struct Session {
    client: CompanionClient,
    log: TranscriptLog,
    pending_images: Vec<String>,
    generate: bool,
}

impl Session {
    pub fn new(
        client: CompanionClient,
        log: TranscriptLog,
        images: Vec<String>,
        generate: bool,
    ) -> Self {
        Self {
            client,
            log,
            pending_images: images,
            generate,
        }
    }

    pub fn client(&self) -> &CompanionClient {
        &self.client
    }

    pub fn log(&self) -> &TranscriptLog {
        &self.log
    }

    pub fn clear_history(&mut self) {
        self.client.conversation_mut().clear();
    }

    /// Replaces the system prompt for the following turns. History is kept.
    pub fn set_system_prompt(&mut self, prompt: &str) {
        self.client.conversation_mut().set_system_prompt(prompt);
    }

    /// Sends `prompt` and renders the reply.
    ///
    /// Returns `Ok(false)` when the stream failed but the session can go on;
    /// the failure and any partial text have already been reported.
    pub async fn exchange(&mut self, prompt: &str) -> Result<bool, Box<dyn Error>> {
        let settings = self.client.settings();
        let (color, output) = (settings.color, settings.output);
        let images = std::mem::take(&mut self.pending_images);
        let user = Message::user(prompt).with_images(images.clone());
        self.log.log_message(&user)?;

        let mut renderer = ReplyRenderer::stdout(color, output);
        let result = {
            let callback: DeltaCallback<'_> =
                Box::new(|delta| renderer.write_delta(&delta.content).map_err(Into::into));
            if self.generate {
                self.client
                    .send_generate(prompt, &images, Some(callback))
                    .await
            } else {
                self.client.send_chat(user, Some(callback)).await
            }
        };
        renderer.finish()?;

        match result {
            Ok(reply) => {
                if !output {
                    println!("{}", reply.content);
                }
                self.log.log_message(&reply)?;
                Ok(true)
            }
            Err(err) => {
                report_failure(&err, output)?;
                if let Some(partial) = err.partial_content() {
                    self.log.log_message(&Message::assistant(partial))?;
                    self.log.log_note("reply incomplete")?;
                }
                match err {
                    ClientError::Stream(_) | ClientError::Request { .. } => Ok(false),
                    other => Err(other.into()),
                }
            }
        }
    }
}

fn report_failure(err: &ClientError, streamed: bool) -> io::Result<()> {
    warn!(error = %err, "reply failed");
    let mut stderr = io::stderr();
    if let Some(partial) = err.partial_content() {
        if !streamed {
            writeln!(stderr, "{partial}")?;
        }
        writeln!(stderr, "(incomplete)")?;
    }
    writeln!(stderr, "❌ Error: {err}")?;
    stderr.flush()
}
