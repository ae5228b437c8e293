use crate::core::ConfigProvider;
use crate::core::notify::DEFAULT_DURATION_MS;
use crate::domain::model::{
    HexColor, LineStyle, DEFAULT_LINE_WEIGHT, MAX_LINE_WEIGHT, MIN_LINE_WEIGHT, SHADOW_OPACITY,
};
use crate::utils::error::{Result, ViewerError};
use crate::utils::validation::Validate;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_PROJECTS_ROOT: &str = "./Befahrungsprojekte";
pub const DEFAULT_USERS_ROOT: &str = "./User";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    pub server: Option<ServerConfig>,
    #[serde(default)]
    pub style: StyleConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub projects_root: String,
    pub users_root: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            projects_root: DEFAULT_PROJECTS_ROOT.to_string(),
            users_root: DEFAULT_USERS_ROOT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub base_url: String,
    pub projects_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StyleConfig {
    pub line_weight: Option<u32>,
    pub default_color: Option<String>,
    pub main_opacity: Option<f64>,
    pub shadow_opacity: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub duration_ms: Option<u64>,
}

impl ViewerConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| ViewerError::ConfigValidation {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${PROJECTS_ROOT})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        use std::sync::OnceLock;

        static VARS: OnceLock<Regex> = OnceLock::new();
        let re = VARS.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static regex"));

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        use crate::utils::validation::{validate_hex_color, validate_path, validate_range, validate_url};

        validate_path("storage.projects_root", &self.storage.projects_root)?;
        validate_path("storage.users_root", &self.storage.users_root)?;

        if let Some(server) = &self.server {
            validate_url("server.base_url", &server.base_url)?;
            if let Some(dir) = &server.projects_dir {
                validate_path("server.projects_dir", dir)?;
            }
        }

        if let Some(weight) = self.style.line_weight {
            validate_range("style.line_weight", weight, MIN_LINE_WEIGHT, MAX_LINE_WEIGHT)?;
        }
        if let Some(color) = &self.style.default_color {
            validate_hex_color("style.default_color", color)?;
        }
        if let Some(opacity) = self.style.main_opacity {
            validate_range("style.main_opacity", opacity, 0.0, 1.0)?;
        }
        if let Some(opacity) = self.style.shadow_opacity {
            validate_range("style.shadow_opacity", opacity, 0.0, 1.0)?;
        }

        if self.notifications.duration_ms == Some(0) {
            return Err(ViewerError::InvalidConfigValue {
                field: "notifications.duration_ms".to_string(),
                value: "0".to_string(),
                reason: "Notifications must stay visible for at least 1 ms".to_string(),
            });
        }

        Ok(())
    }

    pub fn server_projects_dir(&self) -> Option<&str> {
        self.server.as_ref().and_then(|s| s.projects_dir.as_deref())
    }
}

impl ConfigProvider for ViewerConfig {
    fn projects_root(&self) -> &str {
        &self.storage.projects_root
    }

    fn users_root(&self) -> &str {
        &self.storage.users_root
    }

    fn server_url(&self) -> Option<&str> {
        self.server.as_ref().map(|s| s.base_url.as_str())
    }

    fn line_style(&self) -> LineStyle {
        let default_color = self
            .style
            .default_color
            .as_deref()
            .and_then(|c| HexColor::parse(c).ok())
            .unwrap_or_default();

        LineStyle {
            base_weight: self.style.line_weight.unwrap_or(DEFAULT_LINE_WEIGHT),
            default_color,
            main_opacity: self.style.main_opacity.unwrap_or(1.0),
            shadow_opacity: self.style.shadow_opacity.unwrap_or(SHADOW_OPACITY),
        }
    }

    fn notification_duration_ms(&self) -> u64 {
        self.notifications.duration_ms.unwrap_or(DEFAULT_DURATION_MS)
    }
}

impl Validate for ViewerConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_config() {
        let toml_content = r##"
[storage]
projects_root = "/srv/viewer/Befahrungsprojekte"
users_root = "/srv/viewer/User"

[server]
base_url = "https://viewer.example.com/"

[style]
line_weight = 5
default_color = "#00FF00"
main_opacity = 0.8

[notifications]
duration_ms = 3000
"##;

        let config = ViewerConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_ok());

        assert_eq!(config.projects_root(), "/srv/viewer/Befahrungsprojekte");
        assert_eq!(config.server_url(), Some("https://viewer.example.com/"));
        assert_eq!(config.notification_duration_ms(), 3000);

        let style = config.line_style();
        assert_eq!(style.base_weight, 5);
        assert_eq!(style.default_color.as_str(), "#00ff00");
        assert_eq!(style.main_opacity, 0.8);
        assert_eq!(style.shadow_opacity, SHADOW_OPACITY);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ViewerConfig::from_toml_str("").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.projects_root(), DEFAULT_PROJECTS_ROOT);
        assert_eq!(config.server_url(), None);
        assert_eq!(config.line_style(), LineStyle::default());
        assert_eq!(config.notification_duration_ms(), DEFAULT_DURATION_MS);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("KML_MAPPER_TEST_ROOT", "/data/projects");

        let toml_content = r#"
[storage]
projects_root = "${KML_MAPPER_TEST_ROOT}"
users_root = "${KML_MAPPER_UNSET_VAR}"
"#;

        let config = ViewerConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.storage.projects_root, "/data/projects");
        assert_eq!(config.storage.users_root, "${KML_MAPPER_UNSET_VAR}");

        std::env::remove_var("KML_MAPPER_TEST_ROOT");
    }

    #[test]
    fn test_config_validation() {
        let bad_weight = ViewerConfig::from_toml_str("[style]\nline_weight = 11\n").unwrap();
        assert!(bad_weight.validate().is_err());

        let bad_color = ViewerConfig::from_toml_str("[style]\ndefault_color = \"red\"\n").unwrap();
        assert!(bad_color.validate().is_err());

        let bad_url = ViewerConfig::from_toml_str("[server]\nbase_url = \"ftp://host\"\n").unwrap();
        assert!(matches!(
            bad_url.validate(),
            Err(ViewerError::InvalidConfigValue { .. })
        ));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            ViewerConfig::from_toml_str("[style\n"),
            Err(ViewerError::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[storage]\nprojects_root = \"./p\"\nusers_root = \"./u\"\n")
            .unwrap();

        let config = ViewerConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.users_root(), "./u");
    }
}
