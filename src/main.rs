use clap::Parser;
use kml_mapper::core::{messages, ConfigProvider, IncomingFile, ProjectStore};
use kml_mapper::domain::ports::Notifier;
use kml_mapper::utils::error::{ErrorSeverity, ViewerError};
use kml_mapper::utils::{logger, validation::Validate};
use kml_mapper::{
    CliConfig, Command, HttpProjectStore, Ingestor, LayerRegistry, ListController,
    LocalProjectStore, NotificationCenter, SceneMap, ViewerConfig,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting kml-mapper CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 載入並驗證配置
    let config = match cli.load_config().and_then(|config| {
        config.validate()?;
        Ok(config)
    }) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(3);
        }
    };

    if let Err(e) = run(&cli.command, &config).await {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = match e.severity() {
            ErrorSeverity::Low => 4,      // 輸入錯誤
            ErrorSeverity::Medium => 2,   // 可重試
            ErrorSeverity::High => 1,     // 存取錯誤
            ErrorSeverity::Critical => 3, // 配置錯誤
        };
        std::process::exit(exit_code);
    }

    Ok(())
}

fn build_store(config: &ViewerConfig) -> Result<Arc<dyn ProjectStore>, ViewerError> {
    match config.server_url() {
        Some(url) => {
            let mut store = HttpProjectStore::new(url)?;
            if let Some(dir) = config.server_projects_dir() {
                store = store.with_projects_dir(dir);
            }
            tracing::info!("🌐 Using server {}", store.base_url());
            Ok(Arc::new(store))
        }
        None => {
            tracing::info!("📁 Using local folders under {}", config.projects_root());
            Ok(Arc::new(LocalProjectStore::new(
                config.projects_root(),
                config.users_root(),
            )))
        }
    }
}

async fn run(command: &Command, config: &ViewerConfig) -> Result<(), ViewerError> {
    let store = build_store(config)?;

    match command {
        Command::Projects => {
            for project in store.list_projects().await? {
                println!("{}", project);
            }
        }
        Command::Users => {
            for user in store.list_users().await? {
                println!("{}", user);
            }
        }
        Command::CreateProject { name } => {
            let created = store.create_project(name).await?;
            println!("✅ Created project '{}'", created);
        }
        Command::SaveSettings { user, file } => {
            let content = tokio::fs::read_to_string(file).await?;
            let settings: serde_json::Value = serde_json::from_str(&content)?;
            store.save_user_settings(user, &settings).await?;
            println!("✅ {}", messages::CHANGES_SAVED);
        }
        Command::View {
            project,
            json,
            files,
        } => view(store, config, project.as_deref(), files, *json).await?,
    }

    Ok(())
}

async fn view(
    store: Arc<dyn ProjectStore>,
    config: &ViewerConfig,
    project: Option<&str>,
    files: &[std::path::PathBuf],
    json: bool,
) -> Result<(), ViewerError> {
    let duration_ms = config.notification_duration_ms();
    let mut list = ListController::new(LayerRegistry::new(), SceneMap::new(), config.line_style());
    let mut ingestor =
        Ingestor::new(store, NotificationCenter::new()).with_notification_duration(duration_ms);

    if let Some(project) = project {
        ingestor.switch_project(&mut list, project).await?;
        let outcomes = ingestor.drain(&mut list).await;
        let loaded = outcomes.iter().filter(|o| o.is_loaded()).count();
        tracing::info!("Loaded {} of {} project files", loaded, outcomes.len());
        ingestor.notifier_mut().show(
            &messages::project_loaded(project),
            messages::SUCCESS_COLOR,
            duration_ms,
            0,
        );
    }

    if !files.is_empty() {
        let incoming = files
            .iter()
            .map(|path| IncomingFile::from_path(path.clone()))
            .collect();
        let summary = ingestor.ingest(&list, incoming);
        ingestor.drain(&mut list).await;
        ingestor.present_summary(&summary);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&list.rows())?);
    } else {
        for row in list.rows() {
            println!(
                "{} {:<4} {} {}",
                if row.visible { "👁" } else { "  " },
                row.key,
                row.color,
                row.name
            );
        }
    }

    ingestor.notifier_mut().sweep(chrono::Utc::now());
    for notification in ingestor.notifier().active() {
        eprintln!("[{}] {}", notification.color, notification.plain_text());
    }

    Ok(())
}
