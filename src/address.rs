//! Controller address resolution.
//!
//! A previously used address is remembered in a one-line `ip.txt` hint
//! record co-located with the directory being synced. The hint is
//! authoritative when present; otherwise the user is walked through
//! persisting one or picking from a short list.

use std::fs;
use std::io::{self, Write};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use crate::error::SyncError;
use crate::interact::Interact;

pub const HINT_FILE_NAME: &str = "ip.txt";

const OTHER_OPTION: &str = "Other...";

/// State of the per-directory hint record.
#[derive(Debug, PartialEq, Eq)]
pub enum Hint {
    Missing,
    Empty,
    Address(String),
}

pub fn hint_path(dir: &Path) -> PathBuf {
    dir.join(HINT_FILE_NAME)
}

pub fn read_hint(dir: &Path) -> Result<Hint, SyncError> {
    let path = hint_path(dir);
    match fs::read_to_string(&path) {
        Ok(body) => {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                Ok(Hint::Empty)
            } else {
                Ok(Hint::Address(trimmed.to_string()))
            }
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Hint::Missing),
        Err(e) => Err(SyncError::local(path, e)),
    }
}

/// Write-then-rename so a half-written record is never read back as a
/// valid address on a later run.
pub fn write_hint(dir: &Path, address: &str) -> Result<(), SyncError> {
    fs::create_dir_all(dir).map_err(|e| SyncError::local(dir, e))?;
    let path = hint_path(dir);
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| SyncError::local(dir, e))?;
    tmp.write_all(address.as_bytes())
        .map_err(|e| SyncError::local(&path, e))?;
    tmp.persist(&path)
        .map_err(|e| SyncError::local(&path, e.error))?;
    Ok(())
}

/// Four dot-separated octets, each 0-255.
pub fn is_valid_address(s: &str) -> bool {
    s.parse::<Ipv4Addr>().is_ok()
}

/// Determine the controller address for `dir`.
///
/// Precedence: the hint record wins outright; with no record the user may
/// persist a new one; failing that a short-list selection (with a custom
/// escape hatch) decides. Cancellation at any step is `AddressRequired`.
pub fn resolve_address(
    dir: &Path,
    default_candidate: &str,
    known: &[String],
    ui: &mut dyn Interact,
) -> Result<String, SyncError> {
    match read_hint(dir)? {
        Hint::Address(addr) => return Ok(addr),
        Hint::Missing => {
            let prompt = format!(
                "No saved address for {}. Remember one in {}?",
                dir.display(),
                HINT_FILE_NAME
            );
            if ui.confirm(&prompt)? {
                match ui.prompt_text("Controller IP address", default_candidate)? {
                    Some(entry) if is_valid_address(&entry) => {
                        write_hint(dir, &entry)?;
                        return Ok(entry);
                    }
                    _ => {
                        // Leave an empty-bodied record rather than a
                        // half-typed address; the next run goes straight
                        // to the short-list selection.
                        write_hint(dir, "")?;
                    }
                }
            }
        }
        Hint::Empty => {}
    }

    let mut options: Vec<String> = vec![default_candidate.to_string()];
    for addr in known {
        if !options.contains(addr) {
            options.push(addr.clone());
        }
    }
    options.push(OTHER_OPTION.to_string());

    match ui.choose_one("Controller address", &options)? {
        None => Err(SyncError::AddressRequired),
        Some(choice) if choice == OTHER_OPTION => {
            match ui.prompt_text("Controller IP address", "")? {
                Some(entry) if is_valid_address(&entry) => Ok(entry),
                _ => Err(SyncError::AddressRequired),
            }
        }
        Some(choice) => Ok(choice),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Scripted interaction double. Panics when the resolver asks for
    /// something the test did not script.
    #[derive(Default)]
    struct Scripted {
        confirms: VecDeque<bool>,
        texts: VecDeque<Option<String>>,
        choices: VecDeque<Option<String>>,
        calls: usize,
    }

    impl Interact for Scripted {
        fn choose_one(
            &mut self,
            _prompt: &str,
            _options: &[String],
        ) -> Result<Option<String>, SyncError> {
            self.calls += 1;
            Ok(self.choices.pop_front().expect("unscripted choose_one"))
        }
        fn prompt_text(
            &mut self,
            _prompt: &str,
            _default: &str,
        ) -> Result<Option<String>, SyncError> {
            self.calls += 1;
            Ok(self.texts.pop_front().expect("unscripted prompt_text"))
        }
        fn confirm(&mut self, _prompt: &str) -> Result<bool, SyncError> {
            self.calls += 1;
            Ok(self.confirms.pop_front().expect("unscripted confirm"))
        }
        fn choose_folder(&mut self, _prompt: &str) -> Result<Option<PathBuf>, SyncError> {
            self.calls += 1;
            panic!("unscripted choose_folder");
        }
    }

    const DEFAULT: &str = "192.168.10.124";

    #[test]
    fn address_validation() {
        assert!(is_valid_address("192.168.1.1"));
        assert!(is_valid_address("0.0.0.0"));
        assert!(!is_valid_address("999.1.1.1"));
        assert!(!is_valid_address("1.2.3"));
        assert!(!is_valid_address("1.2.3.4.5"));
        assert!(!is_valid_address(""));
        assert!(!is_valid_address("robot.local"));
    }

    #[test]
    fn hint_wins_without_prompting() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(HINT_FILE_NAME), " 10.0.0.9 \n").unwrap();
        let mut ui = Scripted::default();
        let addr = resolve_address(dir.path(), DEFAULT, &[], &mut ui).unwrap();
        assert_eq!(addr, "10.0.0.9");
        assert_eq!(ui.calls, 0);
    }

    #[test]
    fn hint_creation_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut ui = Scripted {
            confirms: VecDeque::from([true]),
            texts: VecDeque::from([Some("192.168.1.50".to_string())]),
            ..Default::default()
        };
        let first = resolve_address(dir.path(), DEFAULT, &[], &mut ui).unwrap();
        assert_eq!(first, "192.168.1.50");
        assert_eq!(
            std::fs::read_to_string(dir.path().join(HINT_FILE_NAME)).unwrap(),
            "192.168.1.50"
        );

        // Second resolution reads the record back and asks nothing.
        let mut quiet = Scripted::default();
        let second = resolve_address(dir.path(), DEFAULT, &[], &mut quiet).unwrap();
        assert_eq!(second, first);
        assert_eq!(quiet.calls, 0);
    }

    #[test]
    fn declined_record_falls_to_selection() {
        let dir = tempfile::tempdir().unwrap();
        let mut ui = Scripted {
            confirms: VecDeque::from([false]),
            choices: VecDeque::from([Some(DEFAULT.to_string())]),
            ..Default::default()
        };
        let addr = resolve_address(dir.path(), DEFAULT, &[], &mut ui).unwrap();
        assert_eq!(addr, DEFAULT);
        assert!(!dir.path().join(HINT_FILE_NAME).exists());
    }

    #[test]
    fn invalid_entry_leaves_empty_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut ui = Scripted {
            confirms: VecDeque::from([true]),
            texts: VecDeque::from([Some("999.1.1.1".to_string())]),
            choices: VecDeque::from([Some(DEFAULT.to_string())]),
            ..Default::default()
        };
        let addr = resolve_address(dir.path(), DEFAULT, &[], &mut ui).unwrap();
        assert_eq!(addr, DEFAULT);
        assert_eq!(read_hint(dir.path()).unwrap(), Hint::Empty);
    }

    #[test]
    fn cancel_at_selection_requires_address() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(HINT_FILE_NAME), "").unwrap();
        let mut ui = Scripted {
            choices: VecDeque::from([None]),
            ..Default::default()
        };
        let err = resolve_address(dir.path(), DEFAULT, &[], &mut ui).unwrap_err();
        assert!(matches!(err, SyncError::AddressRequired));
    }

    #[test]
    fn custom_entry_is_validated() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(HINT_FILE_NAME), "").unwrap();
        let mut ui = Scripted {
            choices: VecDeque::from([Some(OTHER_OPTION.to_string())]),
            texts: VecDeque::from([Some("1.2.3.4.5".to_string())]),
            ..Default::default()
        };
        let err = resolve_address(dir.path(), DEFAULT, &[], &mut ui).unwrap_err();
        assert!(matches!(err, SyncError::AddressRequired));

        let mut ui = Scripted {
            choices: VecDeque::from([Some(OTHER_OPTION.to_string())]),
            texts: VecDeque::from([Some("172.16.0.3".to_string())]),
            ..Default::default()
        };
        let addr = resolve_address(dir.path(), DEFAULT, &[], &mut ui).unwrap();
        assert_eq!(addr, "172.16.0.3");
    }

    #[test]
    fn known_addresses_are_offered_once() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(HINT_FILE_NAME), "").unwrap();
        let known = vec![DEFAULT.to_string(), "10.1.1.1".to_string()];
        let mut ui = Scripted {
            choices: VecDeque::from([Some("10.1.1.1".to_string())]),
            ..Default::default()
        };
        let addr = resolve_address(dir.path(), DEFAULT, &known, &mut ui).unwrap();
        assert_eq!(addr, "10.1.1.1");
    }
}
