use std::path::{Path, PathBuf};

/// Settings consulted by gateways and relationship population.
///
/// Immutable once built; pass it to every population call instead of
/// caching it on models.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    /// Directory relative media locations are resolved against
    pub base_path: PathBuf,

    /// Program the process gateway runs
    pub vboxmanage: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("."),
            vboxmanage: PathBuf::from(Self::DEFAULT_VBOXMANAGE),
        }
    }
}

impl ModelConfig {
    const DEFAULT_VBOXMANAGE: &'static str = "VBoxManage";

    pub fn new() -> Self {
        Self::default()
    }

    /// Uses the directory holding the global configuration file as base path.
    ///
    /// `/foo/VirtualBox.xml` resolves relative locations against `/foo`.
    pub fn from_vboxconfig(path: impl AsRef<Path>) -> Self {
        let base_path = path
            .as_ref()
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::default().base_path(base_path)
    }

    /// Reads `VBOX_USER_HOME` and `VBOX_MANAGE`, keeping defaults for unset variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(home) = std::env::var_os("VBOX_USER_HOME") {
            config.base_path = PathBuf::from(home);
        }
        if let Some(program) = std::env::var_os("VBOX_MANAGE") {
            config.vboxmanage = PathBuf::from(program);
        }
        config
    }

    /// Set the base path
    pub fn base_path(mut self, base_path: impl Into<PathBuf>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// Set the command-line program
    pub fn vboxmanage(mut self, program: impl Into<PathBuf>) -> Self {
        self.vboxmanage = program.into();
        self
    }

    /// Joins a relative location onto the base path; absolute locations pass through.
    pub fn resolve(&self, location: &str) -> PathBuf {
        let path = Path::new(location);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        }
    }
}
