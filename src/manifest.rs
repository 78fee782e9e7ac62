use std::fmt::{self, Write as _};
use std::fs;

use anyhow::{Context, Result, bail};
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use serde::Deserialize;

use crate::templates;

/// Root of a batch: the working directory itself, or a named (relative or absolute) directory.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(from = "String")]
pub enum BasePath {
    #[default]
    CurrentDir,
    Named(Utf8PathBuf),
}

impl BasePath {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "" | "." => BasePath::CurrentDir,
            other => BasePath::Named(Utf8PathBuf::from(other)),
        }
    }

    /// Resolve a batch entry against this base.
    pub fn resolve(&self, relative: &Utf8Path) -> Utf8PathBuf {
        match self {
            BasePath::CurrentDir => relative.to_path_buf(),
            BasePath::Named(base) => base.join(relative),
        }
    }

    /// The current directory always counts as present.
    pub fn is_present(&self) -> bool {
        match self {
            BasePath::CurrentDir => true,
            BasePath::Named(base) => base.is_dir(),
        }
    }
}

impl From<String> for BasePath {
    fn from(raw: String) -> Self {
        BasePath::parse(&raw)
    }
}

impl fmt::Display for BasePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BasePath::CurrentDir => f.write_str("."),
            BasePath::Named(base) if base.is_absolute() => write!(f, "{}", base),
            BasePath::Named(base) => write!(f, "./{}", base),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Batch {
    pub name: String,
    #[serde(default)]
    pub base: BasePath,
    #[serde(default)]
    pub dirs: Vec<Utf8PathBuf>,
    #[serde(default)]
    pub files: Vec<Utf8PathBuf>,
}

/// Ordered set of batches for one run. Duplicate entries are allowed.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(rename = "batch", default)]
    pub batches: Vec<Batch>,
}

impl Manifest {
    pub fn batch_mut(&mut self, name: &str) -> Option<&mut Batch> {
        self.batches.iter_mut().find(|batch| batch.name == name)
    }

    fn validate(&self) -> Result<()> {
        for batch in &self.batches {
            if batch.name.trim().is_empty() {
                bail!("batch names must not be empty");
            }
            for entry in batch.dirs.iter().chain(&batch.files) {
                validate_entry(entry)
                    .with_context(|| format!("batch `{}` entry `{}`", batch.name, entry))?;
            }
        }
        Ok(())
    }
}

fn validate_entry(entry: &Utf8Path) -> Result<()> {
    if entry.as_str().trim().is_empty() {
        bail!("path must not be empty");
    }
    for component in entry.components() {
        match component {
            Utf8Component::Prefix(_) | Utf8Component::RootDir => {
                bail!("path must be relative to its batch base")
            }
            Utf8Component::ParentDir => bail!("path must not contain `..`"),
            Utf8Component::CurDir | Utf8Component::Normal(_) => {}
        }
    }
    Ok(())
}

pub fn parse(raw: &str) -> Result<Manifest> {
    let manifest: Manifest = toml::from_str(raw)?;
    manifest.validate()?;
    Ok(manifest)
}

pub fn load_from_path(path: &Utf8Path) -> Result<Manifest> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading manifest {}", path))?;
    parse(&raw).with_context(|| format!("parsing manifest {}", path))
}

/// The layout compiled into the binary.
pub fn builtin() -> Result<Manifest> {
    let raw = templates::get_string(templates::DEFAULT_MANIFEST)?;
    parse(&raw).context("parsing built-in manifest")
}

pub fn write_example_manifest(path: &Utf8Path, overwrite: bool) -> Result<()> {
    if path.exists() && !overwrite {
        bail!("{} already exists; rerun with --force to overwrite", path);
    }

    templates::write_manifest(path, templates::DEFAULT_MANIFEST)
}

pub fn format_summary(manifest: &Manifest) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Batches defined: {}", manifest.batches.len());
    for batch in &manifest.batches {
        let _ = writeln!(
            out,
            "  - {} (base: {}; dirs: {}; files: {})",
            batch.name,
            batch.base,
            batch.dirs.len(),
            batch.files.len()
        );
        for dir in &batch.dirs {
            let _ = writeln!(out, "      {}/", dir);
        }
        for file in &batch.files {
            let _ = writeln!(out, "      {}", file);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_has_backend_then_frontend() {
        let manifest = builtin().unwrap();
        let names: Vec<_> = manifest.batches.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["backend", "frontend"]);

        let backend = &manifest.batches[0];
        assert_eq!(backend.base, BasePath::Named("server".into()));
        assert!(backend.dirs.contains(&Utf8PathBuf::from("controllers")));
        assert!(
            backend
                .files
                .contains(&Utf8PathBuf::from("routes/aiRoutes.js"))
        );

        let frontend = &manifest.batches[1];
        assert_eq!(frontend.base, BasePath::CurrentDir);
        assert!(
            frontend
                .files
                .contains(&Utf8PathBuf::from("public/pictures/.gitkeep"))
        );
    }

    #[test]
    fn base_path_parsing() {
        assert_eq!(BasePath::parse("."), BasePath::CurrentDir);
        assert_eq!(BasePath::parse(""), BasePath::CurrentDir);
        assert_eq!(
            BasePath::parse("server"),
            BasePath::Named(Utf8PathBuf::from("server"))
        );
    }

    #[test]
    fn resolve_skips_base_for_current_dir() {
        let rel = Utf8Path::new("src/hooks");
        assert_eq!(BasePath::CurrentDir.resolve(rel), Utf8PathBuf::from("src/hooks"));
        assert_eq!(
            BasePath::parse("server").resolve(rel),
            Utf8PathBuf::from("server/src/hooks")
        );
    }

    #[test]
    fn base_defaults_to_current_dir() {
        let manifest = parse("[[batch]]\nname = \"root\"\ndirs = [\"a\"]\n").unwrap();
        assert_eq!(manifest.batches[0].base, BasePath::CurrentDir);
        assert!(manifest.batches[0].files.is_empty());
    }

    #[test]
    fn duplicates_are_accepted() {
        let raw = r#"
            [[batch]]
            name = "dup"
            dirs = ["a", "a", "./a"]
            files = ["a/x.js", "a/x.js"]
        "#;
        let manifest = parse(raw).unwrap();
        assert_eq!(manifest.batches[0].dirs.len(), 3);
        assert_eq!(manifest.batches[0].files.len(), 2);
    }

    #[test]
    fn escaping_entries_are_rejected() {
        let parent = parse("[[batch]]\nname = \"x\"\nfiles = [\"../up.js\"]\n").unwrap_err();
        assert!(format!("{parent:#}").contains("`..`"));

        let absolute = parse("[[batch]]\nname = \"x\"\ndirs = [\"/etc/x\"]\n").unwrap_err();
        assert!(format!("{absolute:#}").contains("relative"));

        let empty = parse("[[batch]]\nname = \"x\"\ndirs = [\"\"]\n").unwrap_err();
        assert!(format!("{empty:#}").contains("empty"));
    }

    #[test]
    fn bases_are_not_restricted_to_the_working_tree() {
        let raw = r#"
            [[batch]]
            name = "abs"
            base = "/srv/app"
            dirs = ["routes"]

            [[batch]]
            name = "sibling"
            base = "../api"
            files = ["index.js"]
        "#;
        let manifest = parse(raw).unwrap();
        assert_eq!(
            manifest.batches[0].base.resolve(Utf8Path::new("routes")),
            Utf8PathBuf::from("/srv/app/routes")
        );
        assert_eq!(
            manifest.batches[1].base,
            BasePath::Named(Utf8PathBuf::from("../api"))
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(parse("[[batch]]\nname = \"x\"\ndirectories = [\"a\"]\n").is_err());
    }

    #[test]
    fn summary_lists_batches() {
        let manifest = builtin().unwrap();
        let summary = format_summary(&manifest);
        assert!(summary.contains("Batches defined: 2"));
        assert!(summary.contains("backend (base: ./server"));
        assert!(summary.contains("frontend (base: .;"));
    }
}
