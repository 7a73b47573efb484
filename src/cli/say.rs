//! One-shot "say" command

use std::error::Error;

use crate::cli::session::Session;

pub async fn run_say(mut session: Session, prompt: String) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err("Usage: aicompanion say <prompt>".into());
    }

    if session.exchange(prompt).await? {
        Ok(())
    } else {
        Err("no complete reply received".into())
    }
}
