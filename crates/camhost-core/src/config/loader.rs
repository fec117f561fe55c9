use super::CamhostConfig;
use crate::constants::{DEFAULT_CONFIG_PATH, ENV_CONFIG_PREFIX};
use crate::error::{CoreError, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

/// 配置加载器：默认值 -> TOML 文件 -> 环境变量
pub struct ConfigLoader {
    file: Option<PathBuf>,
    fail_on_missing_file: bool,
    env_prefix: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            file: None,
            fail_on_missing_file: false,
            env_prefix: Some(ENV_CONFIG_PREFIX.to_string()),
        }
    }

    /// 显式指定的文件必须存在
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self.fail_on_missing_file = true;
        self
    }

    pub fn without_env(mut self) -> Self {
        self.env_prefix = None;
        self
    }

    pub fn load(&self) -> Result<CamhostConfig> {
        let mut figment = Figment::from(Serialized::defaults(CamhostConfig::default()));

        let path = self
            .file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        if path.exists() {
            tracing::debug!(path = %path.display(), "loading config file");
            figment = figment.merge(Toml::file(&path));
        } else if self.fail_on_missing_file {
            return Err(CoreError::config_error(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        if let Some(prefix) = &self.env_prefix {
            figment = figment.merge(Env::prefixed(prefix).split("__"));
        }

        let cfg: CamhostConfig = figment.extract()?;
        cfg.validate()?;
        Ok(cfg)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl CamhostConfig {
    /// 从指定路径或默认位置加载配置
    pub fn load_config(path: Option<&Path>) -> Result<Self> {
        let loader = match path {
            Some(p) => ConfigLoader::new().with_file(p),
            None => ConfigLoader::new(),
        };
        loader.load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceIdentity;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn file_overrides_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("camhost.toml");
        fs::write(
            &path,
            r#"
[install]
install_dir = "/srv/cams"
packages = []

[service]
identity = "root"

[launcher.pins]
"setup.sh" = "0000000000000000000000000000000000000000000000000000000000000000"
"#,
        )
        .unwrap();

        let cfg = ConfigLoader::new().with_file(&path).without_env().load().unwrap();
        assert_eq!(cfg.install.install_dir, PathBuf::from("/srv/cams"));
        assert!(cfg.install.packages.is_empty());
        assert_eq!(cfg.service.identity, ServiceIdentity::Root);
        assert_eq!(cfg.service.name, "camhost");
        assert_eq!(cfg.launcher.pins.len(), 1);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let err = ConfigLoader::new()
            .with_file(dir.path().join("nope.toml"))
            .without_env()
            .load()
            .unwrap_err();
        assert!(matches!(err, CoreError::Config { .. }));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("camhost.toml");
        fs::write(&path, "[install]\ninstal_dir = \"/x\"\n").unwrap();
        assert!(ConfigLoader::new().with_file(&path).without_env().load().is_err());
    }

    #[test]
    fn invalid_values_fail_validation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("camhost.toml");
        fs::write(&path, "[install]\nmax_prompt_attempts = 0\n").unwrap();
        let err = ConfigLoader::new().with_file(&path).without_env().load().unwrap_err();
        assert!(err.to_string().contains("max_prompt_attempts"));
    }
}
