use crate::domain::ports::ProjectStore;
use crate::utils::error::{Result, ViewerError};
use crate::utils::sanitize::sanitize_project_name;
use crate::utils::validation::validate_folder_name;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub const KML_DIR: &str = "KML-Files";
pub const GENERAL_USER: &str = "general";

/// 本機資料夾結構：
/// `<projects_root>/<project>/KML-Files/*.kml` 與 `<users_root>/<user>/user_<user>.json`
#[derive(Debug, Clone)]
pub struct LocalProjectStore {
    projects_root: PathBuf,
    users_root: PathBuf,
}

impl LocalProjectStore {
    pub fn new(projects_root: impl Into<PathBuf>, users_root: impl Into<PathBuf>) -> Self {
        Self {
            projects_root: projects_root.into(),
            users_root: users_root.into(),
        }
    }

    pub fn projects_root(&self) -> &Path {
        &self.projects_root
    }

    pub fn users_root(&self) -> &Path {
        &self.users_root
    }

    fn kml_dir(&self, project: &str) -> PathBuf {
        self.projects_root.join(project).join(KML_DIR)
    }
}

/// Sorted names of the sub-directories of `root`; a missing root is empty.
async fn subdirectories(root: &Path) -> Result<Vec<String>> {
    let mut entries = match tokio::fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("{} does not exist yet", root.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

fn validate_kml_file_name(file_name: &str) -> Result<()> {
    if !file_name.ends_with(".kml") || file_name.contains(&['/', '\\'][..]) || file_name.starts_with('.')
    {
        return Err(ViewerError::validation(format!(
            "Invalid KML file name '{}'",
            file_name
        )));
    }
    Ok(())
}

/// `general` first, everyone else alphabetically.
pub fn order_users(mut users: Vec<String>) -> Vec<String> {
    users.sort_by(|a, b| {
        (a != GENERAL_USER)
            .cmp(&(b != GENERAL_USER))
            .then_with(|| a.cmp(b))
    });
    users
}

#[async_trait]
impl ProjectStore for LocalProjectStore {
    async fn list_projects(&self) -> Result<Vec<String>> {
        subdirectories(&self.projects_root).await
    }

    async fn create_project(&self, raw_name: &str) -> Result<String> {
        let name = sanitize_project_name(raw_name);
        validate_folder_name("project", &name)?;

        let project_dir = self.projects_root.join(&name);
        if tokio::fs::try_exists(&project_dir).await? {
            return Err(ViewerError::validation(format!(
                "Project '{}' already exists",
                name
            )));
        }

        tokio::fs::create_dir_all(project_dir.join(KML_DIR)).await?;
        tracing::info!("📁 Created project '{}' at {}", name, project_dir.display());
        Ok(name)
    }

    async fn list_users(&self) -> Result<Vec<String>> {
        Ok(order_users(subdirectories(&self.users_root).await?))
    }

    async fn list_kml_files(&self, project: &str) -> Result<Vec<String>> {
        validate_folder_name("project", project)?;

        let dir = self.kml_dir(project);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ViewerError::NotFound {
                    what: format!("KML directory of project '{}'", project),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if name.ends_with(".kml") {
                    files.push(name.to_string());
                }
            }
        }
        files.sort();
        tracing::debug!("Project '{}' has {} KML files", project, files.len());
        Ok(files)
    }

    async fn read_kml(&self, project: &str, file_name: &str) -> Result<String> {
        validate_folder_name("project", project)?;
        validate_kml_file_name(file_name)?;

        let path = self.kml_dir(project).join(file_name);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ViewerError::NotFound {
                what: format!("{}/{}", project, file_name),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn save_user_settings(&self, user: &str, settings: &serde_json::Value) -> Result<()> {
        validate_folder_name("user", user)?;
        if !(settings.is_object() || settings.is_array()) {
            return Err(ViewerError::validation(
                "Settings must be a JSON object or array",
            ));
        }

        let user_dir = self.users_root.join(user);
        if !tokio::fs::try_exists(&user_dir).await? {
            return Err(ViewerError::NotFound {
                what: format!("user directory '{}'", user),
            });
        }

        let path = user_dir.join(format!("user_{}.json", user));
        let json = serde_json::to_string_pretty(settings)?;
        tokio::fs::write(&path, json).await?;
        tracing::info!("💾 Saved settings for '{}' to {}", user, path.display());
        Ok(())
    }
}
