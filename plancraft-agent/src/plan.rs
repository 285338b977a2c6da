//! # Plan Store
//!
//! Plans are plain Markdown files in a single directory, one per planning run:
//!
//! ```text
//! plans/
//!   implementation_plan_20250114_093012.md
//!   implementation_plan_20250114_093012_1.md   # second plan in the same second
//! ```
//!
//! The store never parses a plan. It only writes new ones (never overwriting
//! an existing file) and reads back whatever the operator left on disk.

use chrono::{DateTime, Local};
use plancraft_error::{Error, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

pub const PLAN_PREFIX: &str = "implementation_plan_";
pub const PLAN_EXTENSION: &str = "md";

/// Timestamp format shared by plan and output file names
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// A plan file found on disk
#[derive(Debug, Clone)]
pub struct PlanEntry {
    pub path: PathBuf,
    pub modified: SystemTime,
    pub size: u64,
}

/// Directory of timestamped plan documents
#[derive(Debug, Clone)]
pub struct PlanStore {
    dir: PathBuf,
}

impl PlanStore {
    /// Open the store, creating the directory if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| Error::io("plan::new", &dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save a new plan stamped with the current local time.
    pub fn save(&self, plan: &str) -> Result<PathBuf> {
        self.save_at(plan, Local::now())
    }

    /// Save a new plan stamped with `now`; a `_<n>` suffix avoids clobbering.
    pub fn save_at(&self, plan: &str, now: DateTime<Local>) -> Result<PathBuf> {
        let stem = format!("{}{}", PLAN_PREFIX, now.format(TIMESTAMP_FORMAT));
        let mut contents = plan.trim_end().to_string();
        contents.push('\n');

        let path = create_unique(&self.dir, &stem, PLAN_EXTENSION, &contents, "plan::save")?;
        tracing::info!(path = %path.display(), bytes = contents.len(), "plan saved");
        Ok(path)
    }

    /// Read a plan for development. The path may live outside the store.
    pub fn load(path: &Path) -> Result<String> {
        if !path.is_file() {
            return Err(Error::file_not_found(path).with_operation("plan::load"));
        }
        let plan = std::fs::read_to_string(path).map_err(|e| Error::io("plan::load", path, e))?;
        if plan.trim().is_empty() {
            return Err(Error::invalid_argument("plan file is empty")
                .with_operation("plan::load")
                .with_context("path", path.display().to_string()));
        }
        Ok(plan)
    }

    /// All plans in the store, newest first.
    pub fn list(&self) -> Result<Vec<PlanEntry>> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| Error::io("plan::list", &self.dir, e))?;

        let mut plans = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let is_plan = path.file_name().and_then(|n| n.to_str()).is_some_and(|name| {
                name.starts_with(PLAN_PREFIX) && name.ends_with(&format!(".{}", PLAN_EXTENSION))
            });
            if !is_plan {
                continue;
            }
            let Ok(meta) = entry.metadata() else { continue };
            if !meta.is_file() {
                continue;
            }
            plans.push(PlanEntry {
                path,
                modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                size: meta.len(),
            });
        }

        plans.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| b.path.cmp(&a.path)));
        Ok(plans)
    }

    /// The most recently modified plan, if any.
    pub fn latest(&self) -> Result<Option<PathBuf>> {
        Ok(self.list()?.into_iter().next().map(|entry| entry.path))
    }
}

/// Write `contents` to `<dir>/<stem>.<extension>`, or `<stem>_<n>.<extension>`
/// with the first free `n`. Existing files are never touched.
pub(crate) fn create_unique(
    dir: &Path,
    stem: &str,
    extension: &str,
    contents: &str,
    operation: &'static str,
) -> Result<PathBuf> {
    let mut attempt = 0u32;
    loop {
        let name = if attempt == 0 {
            format!("{}.{}", stem, extension)
        } else {
            format!("{}_{}.{}", stem, attempt, extension)
        };
        let path = dir.join(name);

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                attempt += 1;
                continue;
            }
            Err(e) => return Err(Error::io(operation, &path, e)),
        };
        file.write_all(contents.as_bytes())
            .map_err(|e| Error::io(operation, &path, e))?;
        return Ok(path);
    }
}
