use crate::core::kml;
use crate::core::list::ListController;
use crate::core::messages;
use crate::core::notify::{present_ingest_summary, DEFAULT_DURATION_MS};
use crate::core::overlay::OverlayFactory;
use crate::domain::model::{FileSource, IncomingFile, IngestSummary, LayerEntry, ProjectContext};
use crate::domain::ports::{MapSurface, NotificationHandle, Notifier, ProjectStore};
use crate::utils::error::{ErrorCategory, Result, ViewerError};
use crate::utils::validation::validate_folder_name;
use geojson::FeatureCollection;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Result of one background read + parse.
#[derive(Debug)]
pub struct LoadCompletion {
    generation: u64,
    pub name: String,
    result: Result<FeatureCollection>,
}

#[derive(Debug)]
pub enum LoadOutcome {
    Loaded { name: String },
    Failed { name: String, error: ViewerError },
    /// Finished after a project switch and was dropped.
    Stale { name: String },
}

impl LoadOutcome {
    pub fn name(&self) -> &str {
        match self {
            Self::Loaded { name } | Self::Failed { name, .. } | Self::Stale { name } => name,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded { .. })
    }
}

/// 匯入流程：同步判斷每個檔案的去留，再在背景讀取與解析
///
/// `ingest` decides synchronously which files are added, ignored as
/// duplicates or rejected as invalid, and starts a background read for every
/// added file. Each read reports back as a [`LoadCompletion`]; `apply` turns it
/// into a layer. Overlays therefore do not exist yet when `ingest` returns.
pub struct Ingestor<N: Notifier> {
    store: Arc<dyn ProjectStore>,
    notifier: N,
    context: ProjectContext,
    generation: u64,
    pending: HashSet<String>,
    notification_ms: u64,
    tx: mpsc::UnboundedSender<LoadCompletion>,
    rx: mpsc::UnboundedReceiver<LoadCompletion>,
}

impl<N: Notifier> Ingestor<N> {
    pub fn new(store: Arc<dyn ProjectStore>, notifier: N) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            store,
            notifier,
            context: ProjectContext::default(),
            generation: 0,
            pending: HashSet::new(),
            notification_ms: DEFAULT_DURATION_MS,
            tx,
            rx,
        }
    }

    pub fn with_notification_duration(mut self, duration_ms: u64) -> Self {
        self.notification_ms = duration_ms;
        self
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut N {
        &mut self.notifier
    }

    pub fn context(&self) -> &ProjectContext {
        &self.context
    }

    pub fn set_user(&mut self, user: Option<String>) {
        self.context.user = user;
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, name: &str) -> bool {
        self.pending.contains(name)
    }

    pub fn notification_duration_ms(&self) -> u64 {
        self.notification_ms
    }

    pub fn ingest<M: MapSurface>(
        &mut self,
        list: &ListController<M>,
        files: Vec<IncomingFile>,
    ) -> IngestSummary {
        let mut summary = IngestSummary::default();

        for file in files {
            if !file.name.ends_with(".kml") {
                tracing::warn!("Skipping non-KML file '{}'", file.name);
                self.notifier.show(
                    messages::INVALID_FILE,
                    messages::WARNING_COLOR,
                    self.notification_ms,
                    0,
                );
                summary.invalid_names.push(file.name);
                continue;
            }

            // 已在清單中或正在載入中的同名檔案都算重複
            if list.registry().contains(&file.name) || self.pending.contains(&file.name) {
                tracing::debug!("Ignoring duplicate '{}'", file.name);
                summary.ignored_names.push(file.name);
                continue;
            }

            self.pending.insert(file.name.clone());
            summary.added_names.push(file.name.clone());
            self.spawn_load(file);
        }

        tracing::info!(
            "📥 Ingest: {} added, {} duplicates, {} invalid",
            summary.added_names.len(),
            summary.ignored_names.len(),
            summary.invalid_names.len()
        );
        summary
    }

    fn spawn_load(&self, file: IncomingFile) {
        let tx = self.tx.clone();
        let store = Arc::clone(&self.store);
        let project = self.context.project.clone();
        let generation = self.generation;

        tokio::spawn(async move {
            let IncomingFile { name, source } = file;
            let text = match source {
                FileSource::Inline(text) => Ok(text),
                FileSource::Path(path) => tokio::fs::read_to_string(&path)
                    .await
                    .map_err(ViewerError::from),
                FileSource::Project => match project {
                    Some(project) => store.read_kml(&project, &name).await,
                    None => Err(ViewerError::MissingConfig {
                        field: "project".to_string(),
                    }),
                },
            };
            let result = text.and_then(|text| kml::parse_document(&text));

            if tx
                .send(LoadCompletion {
                    generation,
                    name,
                    result,
                })
                .is_err()
            {
                tracing::debug!("Ingestor dropped before load finished");
            }
        });
    }

    /// Waits for the next finished load. `None` once nothing is in flight.
    pub async fn next_completion(&mut self) -> Option<LoadCompletion> {
        if self.pending.is_empty() {
            return None;
        }
        self.rx.recv().await
    }

    /// Turns a finished load into a layer, or reports why it failed.
    pub fn apply<M: MapSurface>(
        &mut self,
        list: &mut ListController<M>,
        completion: LoadCompletion,
    ) -> LoadOutcome {
        let LoadCompletion {
            generation,
            name,
            result,
        } = completion;

        if generation != self.generation {
            tracing::debug!("Discarding stale load of '{}'", name);
            return LoadOutcome::Stale { name };
        }
        self.pending.remove(&name);

        let inserted = result.and_then(|collection| {
            let style = list.style().clone();
            let color = style.default_color.clone();
            let overlays = OverlayFactory::new(style).build(&collection, &color);
            list.insert(LayerEntry::new(name.clone(), overlays, color))
        });

        match inserted {
            Ok(()) => {
                tracing::info!("✅ Loaded '{}'", name);
                LoadOutcome::Loaded { name }
            }
            Err(error) => {
                tracing::error!("❌ Failed to load '{}': {}", name, error);
                let message = match error.category() {
                    ErrorCategory::Network => messages::NETWORK_ERROR,
                    _ => messages::LOAD_FAILED,
                };
                self.notifier
                    .show(message, messages::ERROR_COLOR, self.notification_ms, 0);
                LoadOutcome::Failed { name, error }
            }
        }
    }

    /// Applies completions until nothing is in flight.
    pub async fn drain<M: MapSurface>(&mut self, list: &mut ListController<M>) -> Vec<LoadOutcome> {
        let mut outcomes = Vec::new();
        while let Some(completion) = self.next_completion().await {
            outcomes.push(self.apply(list, completion));
        }
        outcomes
    }

    /// Shows the duplicate and added-file messages for one batch.
    pub fn present_summary(&mut self, summary: &IngestSummary) -> Vec<NotificationHandle> {
        present_ingest_summary(&mut self.notifier, summary, self.notification_ms)
    }

    /// Replaces every layer with the KML files of `project`.
    ///
    /// The file listing happens first; if it fails the current layers stay as
    /// they are. Loads still running for the previous project are dropped when
    /// they finish.
    pub async fn switch_project<M: MapSurface>(
        &mut self,
        list: &mut ListController<M>,
        project: &str,
    ) -> Result<IngestSummary> {
        validate_folder_name("project", project)?;

        let files = match self.store.list_kml_files(project).await {
            Ok(files) => files,
            Err(error) => {
                tracing::error!("❌ Could not list KML files of '{}': {}", project, error);
                let message = match error.category() {
                    ErrorCategory::Network => messages::NETWORK_ERROR,
                    _ => messages::LOAD_FAILED,
                };
                self.notifier
                    .show(message, messages::ERROR_COLOR, self.notification_ms, 0);
                return Err(error);
            }
        };

        list.clear();
        self.pending.clear();
        self.generation += 1;
        self.context.project = Some(project.to_string());
        tracing::info!("📂 Switched to project '{}' ({} KML files)", project, files.len());

        let incoming = files.into_iter().map(IncomingFile::project).collect();
        Ok(self.ingest(list, incoming))
    }
}
