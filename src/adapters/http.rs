use crate::domain::ports::ProjectStore;
use crate::utils::error::{Result, ViewerError};
use crate::utils::sanitize::sanitize_project_name;
use crate::utils::validation::validate_folder_name;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

pub const DEFAULT_PROJECTS_DIR: &str = "Befahrungsprojekte";

/// 透過既有的 PHP 端點存取專案資料
#[derive(Debug, Clone)]
pub struct HttpProjectStore {
    client: Client,
    base_url: Url,
    projects_dir: String,
}

impl HttpProjectStore {
    pub fn new(base_url: &str) -> Result<Self> {
        // join() 只有在結尾是 '/' 時才會保留最後一段路徑
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&normalized).map_err(|e| ViewerError::InvalidConfigValue {
            field: "server.base_url".to_string(),
            value: base_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client: Client::new(),
            base_url,
            projects_dir: DEFAULT_PROJECTS_DIR.to_string(),
        })
    }

    pub fn with_projects_dir(mut self, projects_dir: impl Into<String>) -> Self {
        self.projects_dir = projects_dir.into();
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ViewerError::validation(format!("Invalid request path '{}': {}", path, e)))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        tracing::debug!("GET {}", url);
        let response = self.client.get(url.clone()).send().await?;
        let text = check_status(&url, response).await?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Turns a non-2xx response into an error, using the `error` field of a JSON
/// body when the server sent one.
async fn check_status(url: &Url, response: Response) -> Result<String> {
    let status = response.status();
    let text = response.text().await?;
    tracing::debug!("{} -> {}", url, status);

    let server_message = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|body| body.get("error").and_then(|e| e.as_str()).map(str::to_string));

    if status.is_success() {
        return match server_message {
            Some(message) => Err(ViewerError::validation(message)),
            None => Ok(text),
        };
    }

    match (status, server_message) {
        (StatusCode::NOT_FOUND, Some(message)) => Err(ViewerError::NotFound { what: message }),
        (StatusCode::BAD_REQUEST, Some(message)) => Err(ViewerError::validation(message)),
        _ => Err(ViewerError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        }),
    }
}

#[async_trait]
impl ProjectStore for HttpProjectStore {
    async fn list_projects(&self) -> Result<Vec<String>> {
        let mut projects: Vec<String> = self.get_json(self.endpoint("getProjects.php")?).await?;
        projects.sort();
        Ok(projects)
    }

    async fn create_project(&self, raw_name: &str) -> Result<String> {
        let name = sanitize_project_name(raw_name);
        validate_folder_name("project", &name)?;

        let url = self.endpoint("createFolder.php")?;
        tracing::debug!("POST {} folderName={}", url, name);
        let response = self
            .client
            .post(url.clone())
            .form(&[("folderName", name.as_str())])
            .send()
            .await?;
        let text = check_status(&url, response).await?;

        // 伺服器只回傳一段文字，成功訊息含 "erfolgreich"
        if text.contains("erfolgreich") {
            tracing::info!("📁 Created project '{}'", name);
            Ok(name)
        } else {
            Err(ViewerError::validation(text.trim().to_string()))
        }
    }

    async fn list_users(&self) -> Result<Vec<String>> {
        let users: Vec<String> = self.get_json(self.endpoint("getUsers.php")?).await?;
        Ok(crate::adapters::storage::order_users(users))
    }

    async fn list_kml_files(&self, project: &str) -> Result<Vec<String>> {
        validate_folder_name("project", project)?;

        let mut url = self.endpoint("getKMLFiles.php")?;
        url.query_pairs_mut().append_pair("project", project);
        let mut files: Vec<String> = self.get_json(url).await?;
        files.sort();
        Ok(files)
    }

    async fn read_kml(&self, project: &str, file_name: &str) -> Result<String> {
        validate_folder_name("project", project)?;

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ViewerError::validation("Server URL cannot carry a path"))?
            .pop_if_empty()
            .extend([self.projects_dir.as_str(), project, "KML-Files", file_name]);

        tracing::debug!("GET {}", url);
        let response = self.client.get(url.clone()).send().await?;
        check_status(&url, response).await
    }

    async fn save_user_settings(&self, user: &str, settings: &serde_json::Value) -> Result<()> {
        validate_folder_name("user", user)?;
        if !(settings.is_object() || settings.is_array()) {
            return Err(ViewerError::validation(
                "Settings must be a JSON object or array",
            ));
        }

        let url = self.endpoint("saveUserSettings.php")?;
        let data = serde_json::to_string(settings)?;
        let response = self
            .client
            .post(url.clone())
            .form(&[("user", user), ("data", data.as_str())])
            .send()
            .await?;
        check_status(&url, response).await?;
        tracing::info!("💾 Saved settings for '{}'", user);
        Ok(())
    }
}
