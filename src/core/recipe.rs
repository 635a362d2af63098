//! Recipe configuration from YAML

use crate::core::image::{ImageRef, Requirement};
use crate::core::Pipeline;
use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Top-level recipe loaded from YAML
///
/// A recipe declares the inputs of each provisioning step; the step order
/// itself is fixed and not configurable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    /// Recipe name
    pub name: String,

    /// Base image reference (`repository:tag`)
    pub base: String,

    /// System-level packages installed via the OS package index.
    /// May be empty; the step is then recorded as skipped.
    #[serde(default)]
    pub system_packages: Vec<String>,

    /// Package-manager bootstrap configuration
    pub bootstrap: BootstrapConfig,

    /// Default working directory (absolute)
    pub workdir: PathBuf,

    /// Project dependency installation configuration
    pub dependencies: DependencyConfig,

    /// Default argv vector the produced image runs
    pub entrypoint: Vec<String>,
}

/// Bootstrap section: where the package-manager installer comes from and
/// where its executable lands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// Installer download URL
    pub url: String,

    /// Required SHA-256 digest of the installer, verified before execution
    pub sha256: String,

    /// Directory the installer places the executable under; also the
    /// search-path extension of the next step
    pub install_dir: PathBuf,

    /// Interpreter used to execute the downloaded installer
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// Name of the executable the installer produces
    pub binary: String,
}

fn default_interpreter() -> String {
    "python3".to_string()
}

/// Dependencies section: manifest and install-mode flags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyConfig {
    /// Manifest filename, resolved relative to the working directory after
    /// the context copy
    pub manifest: String,

    /// Install into an isolated runtime sandbox instead of the shared
    /// runtime. Off by default: dependencies are visible to the global
    /// runtime.
    #[serde(default)]
    pub isolated_sandbox: bool,

    /// Non-interactive, non-decorated output mode
    #[serde(default = "default_non_interactive")]
    pub non_interactive: bool,
}

fn default_non_interactive() -> bool {
    true
}

fn sha256_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9a-fA-F]{64}$").unwrap())
}

impl Recipe {
    /// Load a recipe from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse a recipe from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let recipe: Recipe = serde_yaml::from_str(yaml)?;
        recipe.validate()?;
        Ok(recipe)
    }

    /// Validate the recipe
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("Recipe name must not be empty");
        }

        if let Err(e) = self.base.parse::<ImageRef>() {
            anyhow::bail!("{}", e);
        }

        for package in &self.system_packages {
            if package.trim().is_empty() || package.contains(char::is_whitespace) {
                anyhow::bail!("Invalid system package name: '{}'", package);
            }
        }

        self.validate_bootstrap()?;

        if !self.workdir.is_absolute() {
            anyhow::bail!(
                "Working directory must be an absolute path, got '{}'",
                self.workdir.display()
            );
        }

        if self.dependencies.manifest.trim().is_empty() {
            anyhow::bail!("Dependency manifest filename must not be empty");
        }

        if self.entrypoint.is_empty() {
            anyhow::bail!("Entrypoint must have at least one argv element");
        }

        Ok(())
    }

    fn validate_bootstrap(&self) -> Result<()> {
        let bootstrap = &self.bootstrap;

        if !bootstrap.url.starts_with("https://") && !bootstrap.url.starts_with("http://") {
            anyhow::bail!("Bootstrap URL must be http(s), got '{}'", bootstrap.url);
        }

        if !sha256_pattern().is_match(&bootstrap.sha256) {
            anyhow::bail!(
                "Bootstrap sha256 must be a 64-character hex digest, got '{}'",
                bootstrap.sha256
            );
        }

        if !bootstrap.install_dir.is_absolute() {
            anyhow::bail!(
                "Bootstrap install_dir must be an absolute path, got '{}'",
                bootstrap.install_dir.display()
            );
        }

        if bootstrap.binary.trim().is_empty() {
            anyhow::bail!("Bootstrap binary name must not be empty");
        }

        if bootstrap.interpreter.trim().is_empty() {
            anyhow::bail!("Bootstrap interpreter must not be empty");
        }

        Ok(())
    }

    /// The parsed base image reference
    ///
    /// Only valid after `validate()`; callers going through `from_yaml`
    /// always see a parseable value.
    pub fn base_image(&self) -> ImageRef {
        self.base.parse().expect("validated image reference")
    }

    /// Parse a requirements-style manifest body into declared dependencies
    pub fn parse_manifest(content: &str) -> Result<Vec<Requirement>, String> {
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::parse)
            .collect()
    }

    /// Convert the recipe into a pipeline domain model
    pub fn to_pipeline(&self) -> Pipeline {
        Pipeline::from_recipe(self)
    }
}
