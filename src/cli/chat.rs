//! Interactive line-based chat loop

use std::error::Error;
use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::cli::session::Session;
use crate::core::config::data::path_display;

const PROMPT: &str = ">>> ";

#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Skip,
    Quit,
    Clear,
    System(&'a str),
    Prompt(&'a str),
}

fn classify(line: &str) -> Input<'_> {
    let line = line.trim();
    match line {
        "" => Input::Skip,
        "/bye" | "/exit" | "/quit" => Input::Quit,
        "/clear" => Input::Clear,
        _ => match line.strip_prefix("/system") {
            Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => {
                Input::System(rest.trim())
            }
            _ => Input::Prompt(line),
        },
    }
}

pub async fn run_chat(mut session: Session) -> Result<(), Box<dyn Error>> {
    let settings = session.client().settings();
    eprintln!(
        "Chatting with {} via {} (/bye to quit)",
        settings.model, settings.provider
    );
    if let Some(path) = session.log().path() {
        eprintln!("Logging to {}", path_display(path));
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{PROMPT}");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };

        match classify(&line) {
            Input::Skip => continue,
            Input::Quit => break,
            Input::Clear => {
                session.clear_history();
                eprintln!("History cleared");
            }
            Input::System("") => eprintln!("Usage: /system <prompt>"),
            Input::System(prompt) => {
                session.set_system_prompt(prompt);
                eprintln!("System prompt updated");
            }
            Input::Prompt(prompt) => {
                let completed = session.exchange(prompt).await?;
                debug!(completed, "turn finished");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_handles_commands_and_blank_lines() {
        assert_eq!(classify("   "), Input::Skip);
        assert_eq!(classify("/bye"), Input::Quit);
        assert_eq!(classify(" /clear "), Input::Clear);
        assert_eq!(classify("  hello there \n"), Input::Prompt("hello there"));
    }

    #[test]
    fn system_command_takes_the_rest_of_the_line() {
        assert_eq!(
            classify("/system  answer in French "),
            Input::System("answer in French")
        );
        assert_eq!(classify("/system"), Input::System(""));
        assert_eq!(classify("/systems are fun"), Input::Prompt("/systems are fun"));
    }
}
