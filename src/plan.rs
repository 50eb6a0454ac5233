//! Pure selection and ordering logic. Planners never touch the network;
//! they turn local/remote listings into an ordered, immutable plan that
//! the engine drives through a session strictly in sequence.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::error::SyncError;
use crate::session::RemoteEntry;

/// Default program suffix on FANUC controllers.
pub const LS_SUFFIX: &str = ".LS";

/// One source/destination pair. For uploads `local` is the source and
/// `remote` the flat name in the controller's working directory; for
/// downloads the roles reverse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferItem {
    pub local: PathBuf,
    pub remote: String,
}

/// Ordered sequence of transfers for one sync operation. Computed once,
/// consumed in order; a mid-plan failure leaves a well-defined prefix
/// applied.
#[derive(Debug, Clone, Default)]
pub struct TransferPlan {
    pub items: Vec<TransferItem>,
}

impl TransferPlan {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Case-insensitive suffix match; the rest of the name is untouched.
/// Names are not guaranteed ASCII, so the cut point must land on a char
/// boundary; when it does not, the suffix cannot match.
pub fn has_suffix_ci(name: &str, suffix: &str) -> bool {
    let Some(start) = name.len().checked_sub(suffix.len()) else {
        return false;
    };
    name.is_char_boundary(start) && name[start..].eq_ignore_ascii_case(suffix)
}

fn base_name(path: &Path) -> Result<String, SyncError> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            SyncError::InvalidSelection(format!("{} has no file name", path.display()))
        })
}

/// Build the upload plan.
///
/// Single-file mode uploads the selection as-is (the caller already chose
/// it). Directory mode takes the immediate entries only, keeps regular
/// files ending in `.LS` case-insensitively, and preserves the listing's
/// natural order. Remote names are base names: the upload namespace is
/// flat.
pub fn plan_upload(local: &Path, is_dir: bool) -> Result<TransferPlan, SyncError> {
    let mut items = Vec::new();
    if is_dir {
        let entries = fs::read_dir(local).map_err(|e| SyncError::local(local, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| SyncError::local(local, e))?;
            let file_type = entry.file_type().map_err(|e| SyncError::local(entry.path(), e))?;
            if !file_type.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if has_suffix_ci(&name, LS_SUFFIX) {
                items.push(TransferItem {
                    local: entry.path(),
                    remote: name,
                });
            }
        }
    } else {
        items.push(TransferItem {
            local: local.to_path_buf(),
            remote: base_name(local)?,
        });
    }
    Ok(TransferPlan { items })
}

/// Remote file entries, optionally filtered by suffix. Directories never
/// qualify.
pub fn select_remote(entries: &[RemoteEntry], suffix: Option<&str>) -> Vec<RemoteEntry> {
    entries
        .iter()
        .filter(|e| !e.is_dir)
        .filter(|e| suffix.is_none_or(|s| has_suffix_ci(&e.name, s)))
        .cloned()
        .collect()
}

/// Create a fresh, collision-free `<date>-<TAG>_<NN>` folder under `root`.
///
/// The candidate is recomputed from the current counter on every
/// iteration, so an existing `_01`/`_02` always yields `_03` and a folder
/// from an earlier invocation is never reused.
pub fn dated_folder(root: &Path, date: NaiveDate, tag: &str) -> Result<PathBuf, SyncError> {
    let base = format!("{}-{}", date.format("%Y-%m-%d"), tag);
    let mut counter = 1u32;
    loop {
        let candidate = root.join(format!("{base}_{counter:02}"));
        if !candidate.exists() {
            fs::create_dir_all(&candidate).map_err(|e| SyncError::local(&candidate, e))?;
            return Ok(candidate);
        }
        counter += 1;
    }
}

/// Download every given remote file into `dest`, listing order preserved.
pub fn plan_download(files: &[RemoteEntry], dest: &Path) -> TransferPlan {
    TransferPlan {
        items: files
            .iter()
            .map(|f| TransferItem {
                local: dest.join(&f.name),
                remote: f.name.clone(),
            })
            .collect(),
    }
}

/// Update-existing policy: refresh only remote files whose name is
/// already present in `dest` (case-insensitive). Files present remotely
/// but not locally are returned as skips, deliberately not errors.
pub fn plan_update_existing(
    entries: &[RemoteEntry],
    suffix: &str,
    dest: &Path,
) -> Result<(TransferPlan, Vec<String>), SyncError> {
    let mut existing = Vec::new();
    let listing = fs::read_dir(dest).map_err(|e| SyncError::local(dest, e))?;
    for entry in listing {
        let entry = entry.map_err(|e| SyncError::local(dest, e))?;
        if entry.file_type().map_err(|e| SyncError::local(entry.path(), e))?.is_file() {
            existing.push(entry.file_name().to_string_lossy().to_lowercase());
        }
    }

    let mut items = Vec::new();
    let mut skipped = Vec::new();
    for file in select_remote(entries, Some(suffix)) {
        if existing.contains(&file.name.to_lowercase()) {
            items.push(TransferItem {
                local: dest.join(&file.name),
                remote: file.name,
            });
        } else {
            skipped.push(file.name);
        }
    }
    Ok((TransferPlan { items }, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"x").unwrap();
    }

    fn remote_file(name: &str) -> RemoteEntry {
        RemoteEntry {
            name: name.to_string(),
            is_dir: false,
            size: 1,
        }
    }

    #[test]
    fn suffix_match_is_case_insensitive_only_at_the_end() {
        assert!(has_suffix_ci("A.LS", ".LS"));
        assert!(has_suffix_ci("b.ls", ".LS"));
        assert!(!has_suffix_ci("d.LSX", ".LS"));
        assert!(!has_suffix_ci("LS", ".LS"));
    }

    #[test]
    fn suffix_match_tolerates_multibyte_names() {
        // The cut point lands inside 'é'; must reject, not panic.
        assert!(!has_suffix_ci("é.X", ".LS"));
        assert!(has_suffix_ci("é.LS", ".LS"));
        assert!(!has_suffix_ci("日本語", ".LS"));
    }

    #[test]
    fn directory_upload_tolerates_multibyte_names() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "é.X");
        touch(dir.path(), "MAIN.LS");

        let plan = plan_upload(dir.path(), true).unwrap();
        let names: Vec<&str> = plan.items.iter().map(|i| i.remote.as_str()).collect();
        assert_eq!(names, ["MAIN.LS"]);
    }

    #[test]
    fn directory_upload_filters_by_suffix() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.LS");
        touch(dir.path(), "b.ls");
        touch(dir.path(), "c.txt");
        touch(dir.path(), "d.LSX");
        fs::create_dir(dir.path().join("sub.LS")).unwrap();

        let plan = plan_upload(dir.path(), true).unwrap();
        let mut names: Vec<&str> = plan.items.iter().map(|i| i.remote.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, ["a.LS", "b.ls"]);
    }

    #[test]
    fn single_file_upload_ignores_extension() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "notes.txt");
        let plan = plan_upload(&dir.path().join("notes.txt"), false).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.items[0].remote, "notes.txt");
    }

    #[test]
    fn dated_folder_never_reuses_existing_counters() {
        let root = tempfile::tempdir().unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        fs::create_dir(root.path().join("2024-01-01-LS_01")).unwrap();
        fs::create_dir(root.path().join("2024-01-01-LS_02")).unwrap();

        let created = dated_folder(root.path(), date, "LS").unwrap();
        assert_eq!(created, root.path().join("2024-01-01-LS_03"));
        assert!(created.is_dir());
    }

    #[test]
    fn dated_folder_disambiguates_within_one_day() {
        let root = tempfile::tempdir().unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let first = dated_folder(root.path(), date, "ALL").unwrap();
        let second = dated_folder(root.path(), date, "ALL").unwrap();
        assert_eq!(first, root.path().join("2024-06-30-ALL_01"));
        assert_eq!(second, root.path().join("2024-06-30-ALL_02"));
    }

    #[test]
    fn select_remote_drops_directories() {
        let entries = vec![
            remote_file("MAIN.LS"),
            RemoteEntry {
                name: "md".to_string(),
                is_dir: true,
                size: 0,
            },
            remote_file("README.txt"),
        ];
        let all = select_remote(&entries, None);
        assert_eq!(all.len(), 2);
        let ls_only = select_remote(&entries, Some(".LS"));
        assert_eq!(ls_only.len(), 1);
        assert_eq!(ls_only[0].name, "MAIN.LS");
    }

    #[test]
    fn update_existing_skips_files_absent_locally() {
        let dest = tempfile::tempdir().unwrap();
        touch(dest.path(), "x.ls");

        let entries = vec![remote_file("x.ls"), remote_file("y.ls")];
        let (plan, skipped) = plan_update_existing(&entries, ".LS", dest.path()).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.items[0].remote, "x.ls");
        assert_eq!(skipped, ["y.ls"]);
    }

    #[test]
    fn update_existing_matches_names_case_insensitively() {
        let dest = tempfile::tempdir().unwrap();
        touch(dest.path(), "PICKUP.LS");

        let entries = vec![remote_file("pickup.ls")];
        let (plan, skipped) = plan_update_existing(&entries, ".LS", dest.path()).unwrap();
        assert_eq!(plan.len(), 1);
        assert!(skipped.is_empty());
    }
}
