//! Interactive prompt seam between the sync engine and whatever is driving
//! it. The engine only ever asks for an address or a destination folder
//! through this trait, so tests can swap in a scripted double.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};

use crate::error::SyncError;

/// Narrow interaction capability required by the Address Resolver and the
/// single-file download. `None` results mean the user cancelled.
pub trait Interact {
    fn choose_one(&mut self, prompt: &str, options: &[String])
        -> Result<Option<String>, SyncError>;
    fn prompt_text(&mut self, prompt: &str, default: &str) -> Result<Option<String>, SyncError>;
    fn confirm(&mut self, prompt: &str) -> Result<bool, SyncError>;
    fn choose_folder(&mut self, prompt: &str) -> Result<Option<PathBuf>, SyncError>;
}

/// Console implementation. Uses dialoguer when attached to a terminal and
/// plain line-reads otherwise, so piped invocations still work.
pub struct ConsoleInteract;

fn use_dialoguer() -> bool {
    io::stdin().is_terminal() && io::stdout().is_terminal()
}

fn prompt_err(e: dialoguer::Error) -> SyncError {
    SyncError::Prompt(io::Error::other(e))
}

fn read_line(prompt: &str) -> Result<String, SyncError> {
    print!("{prompt}");
    io::stdout().flush().map_err(SyncError::Prompt)?;
    let mut line = String::new();
    io::stdin().read_line(&mut line).map_err(SyncError::Prompt)?;
    Ok(line.trim().to_string())
}

impl Interact for ConsoleInteract {
    fn choose_one(
        &mut self,
        prompt: &str,
        options: &[String],
    ) -> Result<Option<String>, SyncError> {
        if use_dialoguer() {
            let theme = ColorfulTheme::default();
            let selection = Select::with_theme(&theme)
                .with_prompt(prompt)
                .items(options)
                .default(0)
                .interact_opt()
                .map_err(prompt_err)?;
            return Ok(selection.map(|i| options[i].clone()));
        }
        let listed = options.join(" / ");
        let answer = read_line(&format!("{prompt} ({listed}): "))?;
        if answer.is_empty() {
            return Ok(None);
        }
        Ok(options
            .iter()
            .find(|o| o.eq_ignore_ascii_case(&answer))
            .cloned())
    }

    fn prompt_text(&mut self, prompt: &str, default: &str) -> Result<Option<String>, SyncError> {
        let entry = if use_dialoguer() {
            let theme = ColorfulTheme::default();
            Input::<String>::with_theme(&theme)
                .with_prompt(prompt)
                .with_initial_text(default.to_string())
                .allow_empty(true)
                .interact_text()
                .map_err(prompt_err)?
        } else {
            let answer = read_line(&format!("{prompt} [{default}]: "))?;
            if answer.is_empty() {
                default.to_string()
            } else {
                answer
            }
        };
        let entry = entry.trim().to_string();
        if entry.is_empty() {
            Ok(None)
        } else {
            Ok(Some(entry))
        }
    }

    fn confirm(&mut self, prompt: &str) -> Result<bool, SyncError> {
        if use_dialoguer() {
            let theme = ColorfulTheme::default();
            let answer = Confirm::with_theme(&theme)
                .with_prompt(prompt)
                .default(true)
                .interact_opt()
                .map_err(prompt_err)?;
            return Ok(answer.unwrap_or(false));
        }
        let answer = read_line(&format!("{prompt} [Y/n]: "))?;
        Ok(answer.is_empty() || answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
    }

    fn choose_folder(&mut self, prompt: &str) -> Result<Option<PathBuf>, SyncError> {
        Ok(self
            .prompt_text(prompt, "")?
            .map(PathBuf::from))
    }
}
