//! Image configuration - the record threaded through pipeline steps

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;

/// A base image reference in `repository:tag` form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Repository name (e.g. "python", "registry.example.com/python")
    pub repository: String,

    /// Version tag (e.g. "3.12-slim")
    pub tag: String,
}

fn image_ref_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<repo>[a-z0-9]+(?:[._/-][a-z0-9]+)*):(?P<tag>[A-Za-z0-9._-]+)$").unwrap()
    })
}

impl FromStr for ImageRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = image_ref_pattern()
            .captures(s)
            .ok_or_else(|| format!("Invalid image reference: '{}' (expected repository:tag)", s))?;

        Ok(ImageRef {
            repository: caps["repo"].to_string(),
            tag: caps["tag"].to_string(),
        })
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}

/// A declared project dependency, optionally pinned to an exact version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    /// Package name
    pub name: String,

    /// Exact version when pinned with `==`
    pub version: Option<String>,
}

fn requirement_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<name>[A-Za-z0-9][A-Za-z0-9._-]*)(?:==(?P<version>[A-Za-z0-9.]+))?$")
            .unwrap()
    })
}

impl FromStr for Requirement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = requirement_pattern()
            .captures(s.trim())
            .ok_or_else(|| format!("Invalid requirement: '{}' (expected name or name==version)", s))?;

        Ok(Requirement {
            name: caps["name"].to_string(),
            version: caps.name("version").map(|m| m.as_str().to_string()),
        })
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}=={}", self.name, version),
            None => write!(f, "{}", self.name),
        }
    }
}

/// The configuration record of the image under construction
///
/// Threaded through the pipeline as an explicit value: each step consumes
/// the record produced by its predecessor and returns an updated copy, so
/// the whole build is a left-fold over the step chain. Nothing here lives
/// in process-global state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageConfig {
    /// The base image this configuration was folded from
    pub base: Option<ImageRef>,

    /// Environment variables (ordered map for deterministic output)
    pub env: BTreeMap<String, String>,

    /// Directories prepended to the executable search path, most recent
    /// first. Duplicates are kept as-is.
    pub path_prepends: Vec<PathBuf>,

    /// Default working directory for later steps and the entrypoint process
    pub workdir: Option<PathBuf>,

    /// The argv vector a container runs when started without an override
    pub entrypoint: Option<Vec<String>>,
}

impl ImageConfig {
    /// Create an empty configuration record
    pub fn new() -> Self {
        Self {
            base: None,
            env: BTreeMap::new(),
            path_prepends: Vec::new(),
            workdir: None,
            entrypoint: None,
        }
    }

    /// Record the base image
    pub fn with_base(mut self, base: ImageRef) -> Self {
        self.base = Some(base);
        self
    }

    /// Set (or overwrite) an environment variable
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Prepend a directory to the executable search path
    ///
    /// Repeated entries are harmless and intentionally not deduplicated.
    pub fn with_path_entry(mut self, dir: impl Into<PathBuf>) -> Self {
        self.path_prepends.insert(0, dir.into());
        self
    }

    /// Set the default working directory
    pub fn with_workdir(mut self, path: impl Into<PathBuf>) -> Self {
        self.workdir = Some(path.into());
        self
    }

    /// Register the default entrypoint argv, stored verbatim
    pub fn with_entrypoint(mut self, argv: Vec<String>) -> Self {
        self.entrypoint = Some(argv);
        self
    }

    /// Render the search path the produced image exposes
    ///
    /// `inherited` is the PATH value of the base environment; prepends are
    /// joined in priority order in front of it.
    pub fn search_path(&self, inherited: &str) -> String {
        if self.path_prepends.is_empty() {
            return inherited.to_string();
        }

        let mut parts: Vec<String> = self
            .path_prepends
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        parts.push(inherited.to_string());
        parts.join(":")
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self::new()
    }
}
