//! ---
//! brew_section: "01-core-functionality"
//! brew_subsection: "module"
//! brew_type: "source"
//! brew_scope: "code"
//! brew_description: "Shared configuration and tracing primitives."
//! brew_version: "v0.0.0-prealpha"
//! brew_owner: "tbd"
//! ---
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use tracing::debug;

use crate::logging::LogFormat;

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_api_enabled() -> bool {
    true
}

fn default_api_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8088))
}

fn default_elevated_role() -> String {
    "SuperAdmin".to_owned()
}

fn default_sign_in_path() -> String {
    "/login".to_owned()
}

fn default_resume_param() -> String {
    "redirect".to_owned()
}

fn default_organization() -> String {
    "BrewOps".to_owned()
}

fn default_backend_url() -> String {
    "http://127.0.0.1:3000/api".to_owned()
}

fn default_backend_timeout() -> Duration {
    Duration::from_secs(15)
}

/// Primary configuration object for BrewOps binaries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub access: AccessConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    /// Extra route requirements layered over the ones derived from the menu.
    #[serde(default)]
    pub routes: IndexMap<String, RouteRequirementConfig>,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "BREWOPS_CONFIG";
    pub const DEFAULT_PATH: &str = "configs/brewops.toml";

    /// Load configuration from disk, respecting the `BREWOPS_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.access.validate()?;
        self.backend.validate()?;
        for path in self.routes.keys() {
            if !path.starts_with('/') {
                return Err(anyhow!("route '{}' must be an absolute path", path));
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_enabled")]
    pub enabled: bool,
    #[serde(default = "default_api_listen")]
    pub listen: SocketAddr,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: default_api_enabled(),
            listen: default_api_listen(),
        }
    }
}

/// Settings consumed by the route guard and the navigation builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Role value that unlocks the role-management menu entry.
    #[serde(default = "default_elevated_role")]
    pub elevated_role: String,
    /// Entry point unauthenticated visitors are sent to.
    #[serde(default = "default_sign_in_path")]
    pub sign_in_path: String,
    /// Query parameter carrying the originally requested path.
    #[serde(default = "default_resume_param")]
    pub resume_param: String,
    /// Label shown in the organization block when the user has no company.
    #[serde(default = "default_organization")]
    pub default_organization: String,
    /// Optional TOML menu descriptor replacing the built-in menu.
    #[serde(default)]
    pub menu_file: Option<PathBuf>,
    /// Optional JSON file the session is restored from and saved to.
    #[serde(default)]
    pub session_file: Option<PathBuf>,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            elevated_role: default_elevated_role(),
            sign_in_path: default_sign_in_path(),
            resume_param: default_resume_param(),
            default_organization: default_organization(),
            menu_file: None,
            session_file: None,
        }
    }
}

impl AccessConfig {
    pub fn validate(&self) -> Result<()> {
        if self.elevated_role.trim().is_empty() {
            return Err(anyhow!("access.elevated_role cannot be empty"));
        }
        if !self.sign_in_path.starts_with('/') {
            return Err(anyhow!(
                "access.sign_in_path '{}' must be an absolute path",
                self.sign_in_path
            ));
        }
        if self.resume_param.trim().is_empty() {
            return Err(anyhow!("access.resume_param cannot be empty"));
        }
        Ok(())
    }
}

/// Location of the brewery REST backend the dashboard talks to.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_url")]
    pub base_url: String,
    #[serde(default = "default_backend_timeout")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            timeout: default_backend_timeout(),
        }
    }
}

impl BackendConfig {
    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.base_url)
            .with_context(|| format!("backend.base_url '{}' is not a valid url", self.base_url))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(anyhow!(
                "backend.base_url must use http or https, got '{}'",
                parsed.scheme()
            ));
        }
        Ok(())
    }
}

/// Requirements declared for a route in configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RouteRequirementConfig {
    #[serde(default)]
    pub required_permissions: Option<Vec<String>>,
    #[serde(default)]
    pub required_module: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_document_uses_defaults() {
        let config: AppConfig = "".parse().unwrap();
        assert_eq!(config.access.elevated_role, "SuperAdmin");
        assert_eq!(config.access.sign_in_path, "/login");
        assert_eq!(config.access.resume_param, "redirect");
        assert_eq!(config.backend.timeout, Duration::from_secs(15));
        assert!(config.routes.is_empty());
    }

    #[test]
    fn routes_section_preserves_declaration_order() {
        let config: AppConfig = r#"
            [routes."/reportes"]
            required_module = "Reportes"

            [routes."/comercial/facturas"]
            required_permissions = ["facturas:read", "facturas:write"]
        "#
        .parse()
        .unwrap();
        let keys: Vec<_> = config.routes.keys().cloned().collect();
        assert_eq!(keys, vec!["/reportes", "/comercial/facturas"]);
        assert_eq!(
            config.routes["/comercial/facturas"].required_permissions,
            Some(vec!["facturas:read".into(), "facturas:write".into()])
        );
    }

    #[test]
    fn relative_sign_in_path_is_rejected() {
        let err = r#"
            [access]
            sign_in_path = "login"
        "#
        .parse::<AppConfig>()
        .unwrap_err();
        assert!(err.to_string().contains("sign_in_path"));
    }

    #[test]
    fn backend_url_must_be_http() {
        let err = r#"
            [backend]
            base_url = "ftp://brewery.invalid"
        "#
        .parse::<AppConfig>()
        .unwrap_err();
        assert!(err.to_string().contains("http"));
    }

    #[test]
    fn load_with_source_reports_first_existing_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let present = dir.path().join("brewops.toml");
        let mut file = fs::File::create(&present).unwrap();
        writeln!(file, "[access]\nelevated_role = \"Owner\"").unwrap();

        let loaded = AppConfig::load_with_source(&[missing, present.clone()]).unwrap();
        assert_eq!(loaded.source, present);
        assert_eq!(loaded.config.access.elevated_role, "Owner");
    }
}
