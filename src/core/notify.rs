use crate::core::messages;
use crate::domain::model::IngestSummary;
use crate::domain::ports::{NotificationHandle, Notifier};
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use std::sync::OnceLock;

pub const DEFAULT_DURATION_MS: u64 = 5000;
pub const FADE_MS: i64 = 500;
pub const STACK_GAP_PX: u32 = 20;
const MAX_DURATION_MS: u64 = 24 * 60 * 60 * 1000;
const BASE_BOTTOM_PX: u32 = 20;
const PADDING_PX: u32 = 20;
const LINE_HEIGHT_PX: u32 = 17;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Visible,
    Fading,
    Gone,
}

#[derive(Debug, Clone)]
pub struct ActiveNotification {
    pub handle: NotificationHandle,
    pub message: String,
    pub color: String,
    pub shown_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ActiveNotification {
    pub fn phase(&self, now: DateTime<Utc>) -> Phase {
        if now < self.expires_at {
            Phase::Visible
        } else if now < self.expires_at + Duration::milliseconds(FADE_MS) {
            Phase::Fading
        } else {
            Phase::Gone
        }
    }

    /// Message without markup.
    pub fn plain_text(&self) -> String {
        strip_markup(&self.message)
    }
}

fn strip_markup(message: &str) -> String {
    static TAGS: OnceLock<Regex> = OnceLock::new();
    TAGS.get_or_init(|| Regex::new(r"<[^>]+>").expect("static regex"))
        .replace_all(message, "")
        .into_owned()
}

/// Rendered height: padding plus one line per `\n`-separated line.
pub fn rendered_height(message: &str) -> u32 {
    let lines = message.split('\n').count() as u32;
    PADDING_PX + LINE_HEIGHT_PX * lines
}

/// Bottom-centered, stackable, auto-dismissing messages.
#[derive(Debug, Default)]
pub struct NotificationCenter {
    next_id: u64,
    active: Vec<ActiveNotification>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show_at(
        &mut self,
        now: DateTime<Utc>,
        message: &str,
        color: &str,
        duration_ms: u64,
        offset_px: u32,
    ) -> NotificationHandle {
        self.sweep(now);
        self.next_id += 1;
        let handle = NotificationHandle {
            id: self.next_id,
            height_px: rendered_height(message),
            bottom_px: BASE_BOTTOM_PX + offset_px,
        };
        let duration = Duration::milliseconds(duration_ms.min(MAX_DURATION_MS) as i64);
        let notification = ActiveNotification {
            handle,
            message: message.to_string(),
            color: color.to_string(),
            shown_at: now,
            expires_at: now + duration,
        };

        let text = notification.plain_text().replace('\n', " | ");
        match color {
            messages::ERROR_COLOR => tracing::error!("🔔 {}", text),
            messages::WARNING_COLOR => tracing::warn!("🔔 {}", text),
            _ => tracing::info!("🔔 {}", text),
        }

        self.active.push(notification);
        handle
    }

    /// Drops every notification whose fade-out has finished.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.active.len();
        self.active.retain(|n| n.phase(now) != Phase::Gone);
        before - self.active.len()
    }

    pub fn active(&self) -> &[ActiveNotification] {
        &self.active
    }

    pub fn get(&self, id: u64) -> Option<&ActiveNotification> {
        self.active.iter().find(|n| n.handle.id == id)
    }
}

impl Notifier for NotificationCenter {
    fn show(
        &mut self,
        message: &str,
        color: &str,
        duration_ms: u64,
        offset_px: u32,
    ) -> NotificationHandle {
        self.show_at(Utc::now(), message, color, duration_ms, offset_px)
    }
}

/// Duplicates (orange) first, then the added files (green) stacked above them.
pub fn present_ingest_summary<N: Notifier>(
    notifier: &mut N,
    summary: &IngestSummary,
    duration_ms: u64,
) -> Vec<NotificationHandle> {
    let mut handles = Vec::new();
    let mut offset = 0;

    if !summary.ignored_names.is_empty() {
        let handle = notifier.show(
            &messages::ignored_duplicates(&summary.ignored_names),
            messages::WARNING_COLOR,
            duration_ms,
            0,
        );
        offset = handle.height_px + STACK_GAP_PX;
        handles.push(handle);
    }

    if !summary.added_names.is_empty() {
        handles.push(notifier.show(
            &messages::added_files(&summary.added_names),
            messages::SUCCESS_COLOR,
            duration_ms,
            offset,
        ));
    }

    handles
}
