use crate::config::toml_config::{ServerConfig, ViewerConfig};
use crate::utils::error::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "kml-mapper")]
#[command(about = "Load survey KML routes into layered map overlays")]
pub struct CliConfig {
    #[arg(long, short, help = "TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, short, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[arg(long)]
    pub projects_root: Option<String>,

    #[arg(long)]
    pub users_root: Option<String>,

    #[arg(long, help = "Use the viewer server instead of local folders")]
    pub server: Option<String>,

    #[arg(long)]
    pub line_weight: Option<u32>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List project folders
    Projects,
    /// List user folders
    Users,
    /// Create a project folder from a free-form name
    CreateProject { name: String },
    /// Load a project and/or KML files and print the layer list
    View {
        #[arg(long)]
        project: Option<String>,

        #[arg(long, help = "Print rows as JSON")]
        json: bool,

        files: Vec<PathBuf>,
    },
    /// Store a user's settings from a JSON file
    SaveSettings { user: String, file: PathBuf },
}

impl CliConfig {
    /// 讀取設定檔（若有），再以命令列參數覆蓋
    pub fn load_config(&self) -> Result<ViewerConfig> {
        let mut config = match &self.config {
            Some(path) => {
                tracing::debug!("Loading configuration from {}", path.display());
                ViewerConfig::from_file(path)?
            }
            None => ViewerConfig::default(),
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut ViewerConfig) {
        if let Some(root) = &self.projects_root {
            config.storage.projects_root = root.clone();
        }
        if let Some(root) = &self.users_root {
            config.storage.users_root = root.clone();
        }
        if let Some(url) = &self.server {
            let projects_dir = config.server.take().and_then(|s| s.projects_dir);
            config.server = Some(ServerConfig {
                base_url: url.clone(),
                projects_dir,
            });
        }
        if let Some(weight) = self.line_weight {
            config.style.line_weight = Some(weight);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ConfigProvider;

    #[test]
    fn test_parse_view_command() {
        let cli = CliConfig::parse_from([
            "kml-mapper",
            "--projects-root",
            "/tmp/projects",
            "--line-weight",
            "4",
            "view",
            "--project",
            "Nord",
            "extra.kml",
        ]);

        match &cli.command {
            Command::View {
                project,
                json,
                files,
            } => {
                assert_eq!(project.as_deref(), Some("Nord"));
                assert!(!json);
                assert_eq!(files, &vec![PathBuf::from("extra.kml")]);
            }
            other => panic!("unexpected command {:?}", other),
        }

        let config = cli.load_config().unwrap();
        assert_eq!(config.projects_root(), "/tmp/projects");
        assert_eq!(config.line_style().base_weight, 4);
    }

    #[test]
    fn test_server_override_keeps_projects_dir() {
        let mut config =
            ViewerConfig::from_toml_str("[server]\nbase_url = \"http://a/\"\nprojects_dir = \"P\"\n")
                .unwrap();
        let cli = CliConfig::parse_from(["kml-mapper", "--server", "http://b/", "projects"]);

        cli.apply_overrides(&mut config);

        assert_eq!(config.server_url(), Some("http://b/"));
        assert_eq!(config.server_projects_dir(), Some("P"));
    }
}
