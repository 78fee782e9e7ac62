use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info};

use crate::cli::{Cli, Command};
use crate::manifest::{self, BasePath, Manifest};
use crate::materialize::{self, ItemStatus, Mode, Outcome};

const DISCOVERED_MANIFEST: &str = "skelgen.toml";
const BACKEND_BATCH: &str = "backend";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ManifestSource {
    Explicit,
    Discovered,
    Builtin,
}

impl ManifestSource {
    fn as_str(&self) -> &'static str {
        match self {
            ManifestSource::Explicit => "explicit",
            ManifestSource::Discovered => "discovered",
            ManifestSource::Builtin => "built-in",
        }
    }
}

#[derive(Debug)]
struct ResolvedManifest {
    manifest: Manifest,
    path: Option<Utf8PathBuf>,
    source: ManifestSource,
}

impl ResolvedManifest {
    fn describe(&self) -> String {
        match &self.path {
            Some(path) => format!("{} ({})", path, self.source.as_str()),
            None => self.source.as_str().to_owned(),
        }
    }
}

pub fn run(cli: Cli) -> Result<()> {
    let ctx = CliContext::from(&cli);
    ctx.apply_chdir()?;

    match cli.command.unwrap_or(Command::Apply) {
        Command::Apply => handle_apply(&ctx),
        Command::Show => handle_show(&ctx),
        Command::Generate { path, force } => handle_generate(path, force),
    }
}

fn handle_apply(ctx: &CliContext) -> Result<()> {
    let resolved = ctx.resolve_manifest(Utf8Path::new("."))?;
    println!("Using manifest: {}", resolved.describe());
    for batch in &resolved.manifest.batches {
        match &batch.base {
            BasePath::CurrentDir => println!(
                "Batch `{}` will be created relative to the current directory.",
                batch.name
            ),
            base => println!("Batch `{}` will be created under {}.", batch.name, base),
        }
    }

    let summary = run_manifest(&resolved.manifest, ctx.mode());
    println!();
    println!("{}", summary.render());
    for report in summary.reports() {
        for failure in &report.failures {
            println!("  failed {}: {:#}", failure.path, failure.error);
        }
    }
    Ok(())
}

fn handle_show(ctx: &CliContext) -> Result<()> {
    let resolved = ctx.resolve_manifest(Utf8Path::new("."))?;
    println!("Manifest: {}", resolved.describe());
    print!("{}", manifest::format_summary(&resolved.manifest));
    Ok(())
}

fn handle_generate(path: Option<PathBuf>, force: bool) -> Result<()> {
    let target = match path {
        Some(path) => Utf8PathBuf::from_path_buf(path)
            .map_err(|_| anyhow!("manifest generate path must be valid UTF-8"))?,
        None => Utf8PathBuf::from(DISCOVERED_MANIFEST),
    };
    let existed = target.exists();
    manifest::write_example_manifest(&target, force)?;
    if existed {
        println!("Overwrote manifest at {}", target);
    } else {
        println!("Wrote built-in manifest to {}", target);
    }
    Ok(())
}

/// Per-batch result of a run.
#[derive(Debug)]
pub struct BatchSummary {
    pub name: String,
    pub dirs: Outcome,
    /// `None` when the directory step was skipped.
    pub files: Option<Outcome>,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub batches: Vec<BatchSummary>,
}

impl RunSummary {
    fn reports(&self) -> impl Iterator<Item = &materialize::BatchReport> {
        self.batches
            .iter()
            .flat_map(|batch| std::iter::once(&batch.dirs).chain(batch.files.as_ref()))
            .filter_map(Outcome::report)
    }

    pub fn count(&self, status: ItemStatus) -> usize {
        self.reports().map(|report| report.count(status)).sum()
    }

    pub fn failures(&self) -> usize {
        self.reports().map(|report| report.failures.len()).sum()
    }

    pub fn skipped(&self) -> impl Iterator<Item = &str> {
        self.batches
            .iter()
            .filter(|batch| !batch.dirs.is_completed())
            .map(|batch| batch.name.as_str())
    }

    pub fn render(&self) -> String {
        let mut line = format!(
            "Skeleton creation complete: {} created, {} already present, {} failed",
            self.count(ItemStatus::Created),
            self.count(ItemStatus::Existed),
            self.failures()
        );
        let planned = self.count(ItemStatus::Planned);
        if planned > 0 {
            line.push_str(&format!(", {} would be created", planned));
        }
        let skipped: Vec<_> = self.skipped().collect();
        if !skipped.is_empty() {
            line.push_str(&format!("; skipped: {}", skipped.join(", ")));
        }
        line
    }
}

/// Materialize every batch in order; a batch's files run only when its directories did.
pub fn run_manifest(manifest: &Manifest, mode: Mode) -> RunSummary {
    let mut summary = RunSummary::default();
    for batch in &manifest.batches {
        info!("materializing batch `{}` under {}", batch.name, batch.base);
        let dirs = materialize::create_dirs(&batch.base, &batch.dirs, mode);
        let files = if dirs.is_completed() {
            Some(materialize::create_files(&batch.base, &batch.files, mode))
        } else {
            debug!("skipping files for batch `{}`", batch.name);
            None
        };
        summary.batches.push(BatchSummary {
            name: batch.name.clone(),
            dirs,
            files,
        });
    }
    summary
}

#[derive(Debug)]
struct CliContext {
    chdir: Option<PathBuf>,
    file: Option<PathBuf>,
    server_dir: Option<String>,
    dry_run: bool,
}

impl CliContext {
    fn apply_chdir(&self) -> Result<()> {
        if let Some(path) = &self.chdir {
            std::env::set_current_dir(path)
                .with_context(|| format!("changing directory to {}", path.display()))?;
        }
        Ok(())
    }

    fn mode(&self) -> Mode {
        if self.dry_run {
            Mode::DryRun
        } else {
            Mode::Apply
        }
    }

    /// Explicit `--file` first, then `skelgen.toml` in `root`, then the built-in layout.
    fn resolve_manifest(&self, root: &Utf8Path) -> Result<ResolvedManifest> {
        let mut resolved = if let Some(path) = &self.file {
            let path = Utf8PathBuf::from_path_buf(path.clone())
                .map_err(|_| anyhow!("manifest path must be valid UTF-8"))?;
            ResolvedManifest {
                manifest: manifest::load_from_path(&path)?,
                path: Some(path),
                source: ManifestSource::Explicit,
            }
        } else {
            let discovered = root.join(DISCOVERED_MANIFEST);
            if discovered.is_file() {
                ResolvedManifest {
                    manifest: manifest::load_from_path(&discovered)?,
                    path: Some(discovered),
                    source: ManifestSource::Discovered,
                }
            } else {
                ResolvedManifest {
                    manifest: manifest::builtin()?,
                    path: None,
                    source: ManifestSource::Builtin,
                }
            }
        };

        if let Some(server_dir) = &self.server_dir {
            let batch = resolved.manifest.batch_mut(BACKEND_BATCH).ok_or_else(|| {
                anyhow!(
                    "--server-dir given but manifest has no `{}` batch",
                    BACKEND_BATCH
                )
            })?;
            batch.base = BasePath::parse(server_dir);
        }

        Ok(resolved)
    }
}

impl From<&Cli> for CliContext {
    fn from(cli: &Cli) -> Self {
        Self {
            chdir: cli.chdir.clone(),
            file: cli.file.clone(),
            server_dir: cli.server_dir.clone(),
            dry_run: cli.dry_run,
        }
    }
}
