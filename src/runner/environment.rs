//! Execution environment provisioning
//!
//! Some counter builds need extra shared-library directories on the loader
//! search path (a MinGW runtime on Windows, a custom OpenMP on Linux). The
//! trial runner asks an [`EnvironmentProvisioner`] for the variables to set
//! on the child process before every launch; tests swap in a stub.

use std::env;
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

use tracing::debug;

/// Supplies environment variables for a counter process.
pub trait EnvironmentProvisioner {
    /// Variables to set on the child, on top of the inherited environment.
    fn environment(&self) -> Vec<(OsString, OsString)>;
}

/// Leaves the inherited environment untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct InheritEnvironment;

impl EnvironmentProvisioner for InheritEnvironment {
    fn environment(&self) -> Vec<(OsString, OsString)> {
        Vec::new()
    }
}

/// Fixed set of variables, mostly useful in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticEnvironment {
    vars: Vec<(OsString, OsString)>,
}

impl StaticEnvironment {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable.
    #[must_use]
    pub fn var(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.vars.push((key.into(), value.into()));
        self
    }
}

impl EnvironmentProvisioner for StaticEnvironment {
    fn environment(&self) -> Vec<(OsString, OsString)> {
        self.vars.clone()
    }
}

/// Name of the loader search-path variable on this platform.
#[must_use]
pub const fn library_path_var() -> &'static str {
    if cfg!(windows) {
        "PATH"
    } else if cfg!(target_os = "macos") {
        "DYLD_LIBRARY_PATH"
    } else {
        "LD_LIBRARY_PATH"
    }
}

/// Prepends configured directories to the loader search path.
///
/// Entries may start with `${VAR}`, expanded from the harness environment.
/// Entries whose variable is unset or whose directory does not exist are
/// skipped, so one configuration works across machines.
#[derive(Debug, Clone)]
pub struct LibrarySearchPath {
    entries: Vec<String>,
    variable: OsString,
}

impl LibrarySearchPath {
    /// Create a provisioner for the platform's search-path variable.
    #[must_use]
    pub fn new(entries: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::with_variable(entries, library_path_var())
    }

    /// Create a provisioner for an explicit variable.
    #[must_use]
    pub fn with_variable(
        entries: impl IntoIterator<Item = impl Into<String>>,
        variable: impl Into<OsString>,
    ) -> Self {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
            variable: variable.into(),
        }
    }

    /// Configured entries that resolve to existing directories, in order.
    #[must_use]
    pub fn resolved_dirs(&self) -> Vec<PathBuf> {
        self.entries
            .iter()
            .filter_map(|entry| {
                let resolved = expand_var_prefix(entry);
                if resolved.is_none() {
                    debug!(entry = %entry, "library path variable unset, skipping");
                }
                resolved
            })
            .filter(|dir| dir.is_dir())
            .collect()
    }
}

impl EnvironmentProvisioner for LibrarySearchPath {
    fn environment(&self) -> Vec<(OsString, OsString)> {
        let mut dirs = self.resolved_dirs();
        if dirs.is_empty() {
            return Vec::new();
        }
        if let Some(existing) = env::var_os(&self.variable) {
            dirs.extend(env::split_paths(&existing));
        }
        match env::join_paths(dirs) {
            Ok(joined) => vec![(self.variable.clone(), joined)],
            Err(e) => {
                debug!(error = %e, "cannot join library search path, leaving it unchanged");
                Vec::new()
            }
        }
    }
}

fn expand_var_prefix(entry: &str) -> Option<PathBuf> {
    let Some(rest) = entry.strip_prefix("${") else {
        return Some(PathBuf::from(entry));
    };
    let (name, tail) = rest.split_once('}')?;
    let base = env::var_os(name).filter(|v| !v.is_empty())?;
    let mut path = PathBuf::from(base);
    let tail = tail.trim_start_matches(['/', '\\']);
    if !tail.is_empty() {
        path.push(OsStr::new(tail));
    }
    Some(path)
}
