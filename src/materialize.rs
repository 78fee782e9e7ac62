//! Best-effort, idempotent creation of directories and empty files under a batch base.
//!
//! A failure on one entry is logged and recorded, never propagated: the rest of the batch
//! still runs. The only batch-level failure is a missing named base directory.

use std::io::{self, ErrorKind};

use anyhow::{Context, Error};
use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, error, warn};

use crate::manifest::BasePath;
use crate::util;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Mode {
    #[default]
    Apply,
    DryRun,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ItemStatus {
    Created,
    Existed,
    /// Dry-run only: the entry is absent and would be created.
    Planned,
}

#[derive(Debug)]
pub struct ItemFailure {
    pub path: Utf8PathBuf,
    pub error: Error,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub items: Vec<ItemStatus>,
    pub failures: Vec<ItemFailure>,
}

impl BatchReport {
    pub fn count(&self, status: ItemStatus) -> usize {
        self.items.iter().filter(|item| **item == status).count()
    }

    fn record(&mut self, status: ItemStatus) {
        self.items.push(status);
    }

    fn fail(&mut self, path: Utf8PathBuf, error: Error) {
        error!("{:#}", error);
        self.failures.push(ItemFailure { path, error });
    }
}

#[derive(Debug)]
pub enum Outcome {
    /// The named base directory was missing; nothing was attempted.
    Skipped,
    Completed(BatchReport),
}

impl Outcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }

    pub fn report(&self) -> Option<&BatchReport> {
        match self {
            Outcome::Completed(report) => Some(report),
            Outcome::Skipped => None,
        }
    }
}

fn base_missing(base: &BasePath) -> bool {
    if base.is_present() {
        return false;
    }
    warn!(
        "base directory `{}` not found; skipping operations within it",
        base
    );
    true
}

/// Ensure every entry of `dirs` exists as a directory under `base`.
pub fn create_dirs(base: &BasePath, dirs: &[Utf8PathBuf], mode: Mode) -> Outcome {
    println!("Creating directories under {}", base);
    if base_missing(base) {
        return Outcome::Skipped;
    }

    let mut report = BatchReport::default();
    for relative in dirs {
        let path = base.resolve(relative);
        let result = match mode {
            Mode::DryRun => plan_dir(&path),
            Mode::Apply => util::fs::ensure_dir(&path).map(|created| {
                if created {
                    ItemStatus::Created
                } else {
                    ItemStatus::Existed
                }
            }),
        };

        match result.with_context(|| format!("creating directory {}", path)) {
            Ok(status) => {
                print_status("dir", &path, status);
                report.record(status);
            }
            Err(err) => report.fail(path, err),
        }
    }
    Outcome::Completed(report)
}

/// Ensure every entry of `files` exists as a file under `base`, creating missing parents.
///
/// Existing files keep their contents.
pub fn create_files(base: &BasePath, files: &[Utf8PathBuf], mode: Mode) -> Outcome {
    println!("Creating empty files under {}", base);
    if base_missing(base) {
        return Outcome::Skipped;
    }

    let mut report = BatchReport::default();
    for relative in files {
        let path = base.resolve(relative);
        match ensure_file(&path, mode) {
            Ok(status) => {
                print_status("file", &path, status);
                report.record(status);
            }
            Err(err) => report.fail(path, err),
        }
    }
    Outcome::Completed(report)
}

fn ensure_file(path: &Utf8Path, mode: Mode) -> anyhow::Result<ItemStatus> {
    let parent = path.parent().filter(|p| !p.as_str().is_empty());
    if let Some(parent) = parent.filter(|p| !p.is_dir()) {
        if mode == Mode::DryRun {
            plan_dir(parent).with_context(|| format!("creating parent directory {}", parent))?;
            println!("  would create parent directory {}", parent);
        } else {
            util::fs::ensure_dir(parent)
                .with_context(|| format!("creating parent directory {}", parent))?;
            println!("  created parent directory {}", parent);
        }
    }

    if mode == Mode::DryRun {
        debug!("dry-run: checking {}", path);
        return plan_file(path).with_context(|| format!("creating file {}", path));
    }

    let created = util::fs::touch(path).with_context(|| format!("creating file {}", path))?;
    Ok(if created {
        ItemStatus::Created
    } else {
        ItemStatus::Existed
    })
}

/// Dry-run counterpart of `util::fs::ensure_dir`: fails where creation would fail.
fn plan_dir(path: &Utf8Path) -> io::Result<ItemStatus> {
    if path.is_dir() {
        return Ok(ItemStatus::Existed);
    }
    if path.exists() {
        return Err(io::Error::new(
            ErrorKind::AlreadyExists,
            "path exists and is not a directory",
        ));
    }
    let nearest = path
        .ancestors()
        .skip(1)
        .filter(|ancestor| !ancestor.as_str().is_empty())
        .find(|ancestor| ancestor.exists());
    if let Some(blocker) = nearest.filter(|ancestor| !ancestor.is_dir()) {
        return Err(io::Error::new(
            ErrorKind::NotADirectory,
            format!("{} is not a directory", blocker),
        ));
    }
    Ok(ItemStatus::Planned)
}

/// Dry-run counterpart of `util::fs::touch`; assumes the parent is already checked.
fn plan_file(path: &Utf8Path) -> io::Result<ItemStatus> {
    if path.is_file() {
        Ok(ItemStatus::Existed)
    } else if path.exists() {
        Err(io::Error::new(
            ErrorKind::AlreadyExists,
            "path exists and is not a regular file",
        ))
    } else {
        Ok(ItemStatus::Planned)
    }
}

fn print_status(kind: &str, path: &Utf8Path, status: ItemStatus) {
    let label = match status {
        ItemStatus::Created => "created",
        ItemStatus::Existed => "exists ",
        ItemStatus::Planned => "would create",
    };
    println!("  {} {} {}", label, kind, path);
}
