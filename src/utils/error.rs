use thiserror::Error;

#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("Not a KML file: {name}")]
    InvalidFileType { name: String },

    #[error("Layer '{name}' already exists")]
    DuplicateName { name: String },

    #[error("KML parse error: {message}")]
    Parse { message: String },

    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request to {url} failed with status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("Unknown layer: {name}")]
    UnknownLayer { name: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing configuration field: {field}")]
    MissingConfig { field: String },

    #[error("Configuration error in {field}: {message}")]
    ConfigValidation { field: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Parse,
    Network,
    Storage,
    State,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ViewerError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidFileType { .. } | Self::DuplicateName { .. } | Self::Validation { .. } => {
                ErrorCategory::Input
            }
            Self::Parse { .. } | Self::Serialization(_) => ErrorCategory::Parse,
            Self::Network(_) | Self::HttpStatus { .. } => ErrorCategory::Network,
            Self::Io(_) | Self::NotFound { .. } => ErrorCategory::Storage,
            Self::UnknownLayer { .. } => ErrorCategory::State,
            Self::InvalidConfigValue { .. }
            | Self::MissingConfig { .. }
            | Self::ConfigValidation { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 單一檔案的問題不影響其他圖層
            ErrorCategory::Input | ErrorCategory::State => ErrorSeverity::Low,
            ErrorCategory::Parse | ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Storage => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::InvalidFileType { name } => format!("'{}' is not a KML file", name),
            Self::DuplicateName { name } => format!("The file \"{}\" already exists", name),
            Self::Parse { .. } => "Failed to load file".to_string(),
            Self::Network(_) | Self::HttpStatus { .. } => {
                "Network error - please check your connection".to_string()
            }
            Self::NotFound { what } => format!("{} was not found", what),
            Self::Validation { message } => message.clone(),
            _ => self.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Input => "Check the file or folder name and try again",
            ErrorCategory::Parse => "Make sure the file is a well-formed KML document",
            ErrorCategory::Network => "Check that the server is reachable and retry",
            ErrorCategory::Storage => "Check that the project directory exists and is writable",
            ErrorCategory::State => "Reload the project to resynchronise the layer list",
            ErrorCategory::Configuration => "Fix the configuration file and restart",
        }
    }
}

pub type Result<T> = std::result::Result<T, ViewerError>;
