//! Audit trail.
//!
//! Every evaluation, registration attempt and review transition produces one
//! [`AuditEntry`]. Entries go through an [`AuditSink`]; the [`AuditLogger`]
//! in front of it swallows failures so the audit trail can never fail or
//! roll back the operation being audited.

use async_trait::async_trait;
use campus_common::{AppError, AppResult, IdGenerator, get_metrics};
use campus_db::{
    entities::{
        access_control_log,
        access_control_log::{AuditAction, ReasonCode},
    },
    repositories::{AccessControlLogRepository, AuditLogFilter},
};
use chrono::{DateTime, Utc};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use validator::Validate;

/// Request metadata captured at the edge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMeta {
    /// Originating client address.
    pub origin: Option<String>,
    /// Client user agent.
    pub user_agent: Option<String>,
}

/// One audit record, before it is assigned an id.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub student_id: String,
    pub action: AuditAction,
    pub reason: ReasonCode,
    pub payment_approval_id: Option<String>,
    pub registration_id: Option<String>,
    pub actor_id: Option<String>,
    pub notes: Option<String>,
    pub details: Option<serde_json::Value>,
    pub meta: RequestMeta,
}

impl AuditEntry {
    #[must_use]
    pub fn new(student_id: impl Into<String>, action: AuditAction, reason: ReasonCode) -> Self {
        Self {
            student_id: student_id.into(),
            action,
            reason,
            payment_approval_id: None,
            registration_id: None,
            actor_id: None,
            notes: None,
            details: None,
            meta: RequestMeta::default(),
        }
    }

    #[must_use]
    pub fn actor(mut self, actor_id: Option<&str>) -> Self {
        self.actor_id = actor_id.map(String::from);
        self
    }

    #[must_use]
    pub fn payment_approval(mut self, id: Option<&str>) -> Self {
        self.payment_approval_id = id.map(String::from);
        self
    }

    #[must_use]
    pub fn registration(mut self, id: Option<&str>) -> Self {
        self.registration_id = id.map(String::from);
        self
    }

    #[must_use]
    pub fn notes(mut self, notes: Option<&str>) -> Self {
        self.notes = notes.map(String::from);
        self
    }

    #[must_use]
    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    #[must_use]
    pub fn meta(mut self, meta: &RequestMeta) -> Self {
        self.meta = meta.clone();
        self
    }

    fn into_active_model(self, id: String) -> access_control_log::ActiveModel {
        access_control_log::ActiveModel {
            id: Set(id),
            student_id: Set(self.student_id),
            action: Set(self.action),
            reason: Set(self.reason),
            payment_approval_id: Set(self.payment_approval_id),
            registration_id: Set(self.registration_id),
            actor_id: Set(self.actor_id),
            notes: Set(self.notes),
            details: Set(self.details),
            ip_address: Set(self.meta.origin),
            user_agent: Set(self.meta.user_agent),
            created_at: Set(Utc::now().into()),
        }
    }
}

/// Destination for audit entries.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Persist or forward one entry.
    async fn write(&self, entry: AuditEntry) -> AppResult<()>;
}

/// Shared sink handle.
pub type AuditSinkService = Arc<dyn AuditSink>;

/// Inserts entries directly into `access_control_log`.
#[derive(Clone)]
pub struct DatabaseAuditSink {
    repo: AccessControlLogRepository,
    id_gen: IdGenerator,
}

impl DatabaseAuditSink {
    #[must_use]
    pub const fn new(repo: AccessControlLogRepository) -> Self {
        Self {
            repo,
            id_gen: IdGenerator::new(),
        }
    }
}

#[async_trait]
impl AuditSink for DatabaseAuditSink {
    async fn write(&self, entry: AuditEntry) -> AppResult<()> {
        let model = entry.into_active_model(self.id_gen.generate());
        self.repo.append(model).await?;
        get_metrics().record_audit_write(true);
        Ok(())
    }
}

/// Hands entries to an [`AuditWriter`] over a bounded channel.
///
/// Never waits: a full channel is reported as an error and the entry is
/// dropped.
#[derive(Clone)]
pub struct ChannelAuditSink {
    sender: mpsc::Sender<AuditEntry>,
}

#[async_trait]
impl AuditSink for ChannelAuditSink {
    async fn write(&self, entry: AuditEntry) -> AppResult<()> {
        self.sender.try_send(entry).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                AppError::Internal("audit channel full".to_string())
            }
            mpsc::error::TrySendError::Closed(_) => {
                AppError::Internal("audit writer stopped".to_string())
            }
        })
    }
}

/// Background task draining a [`ChannelAuditSink`] into another sink.
pub struct AuditWriter {
    receiver: mpsc::Receiver<AuditEntry>,
    sink: AuditSinkService,
}

/// Create a channel-backed sink and the writer that drains it into `sink`.
#[must_use]
pub fn audit_channel(buffer_size: usize, sink: AuditSinkService) -> (ChannelAuditSink, AuditWriter) {
    let (sender, receiver) = mpsc::channel(buffer_size.max(1));
    (ChannelAuditSink { sender }, AuditWriter { receiver, sink })
}

impl AuditWriter {
    /// Drain the channel until every sender is dropped.
    pub async fn run(mut self) {
        info!("Audit writer started");
        while let Some(entry) = self.receiver.recv().await {
            let action = entry.action;
            let student_id = entry.student_id.clone();
            if let Err(e) = self.sink.write(entry).await {
                error!(
                    student_id = %student_id,
                    action = %action,
                    error = %e,
                    "Failed to write audit entry"
                );
                get_metrics().record_audit_write(false);
            }
        }
        info!("Audit writer stopped");
    }

    /// Run the writer on the tokio runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

/// Keeps entries in memory. Used by tests.
#[derive(Clone, Default)]
pub struct MemoryAuditSink {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
    failing: bool,
}

impl MemoryAuditSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that rejects every write.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Entries written so far, oldest first.
    pub async fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().await.clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn write(&self, entry: AuditEntry) -> AppResult<()> {
        if self.failing {
            return Err(AppError::Database("audit store unavailable".to_string()));
        }
        self.entries.lock().await.push(entry);
        Ok(())
    }
}

/// Best-effort front for an [`AuditSink`].
#[derive(Clone)]
pub struct AuditLogger {
    sink: AuditSinkService,
}

impl AuditLogger {
    #[must_use]
    pub fn new(sink: AuditSinkService) -> Self {
        Self { sink }
    }

    /// Record an entry. Failures are logged and counted, never returned.
    pub async fn record(&self, entry: AuditEntry) {
        let action = entry.action;
        let reason = entry.reason;
        let student_id = entry.student_id.clone();

        match self.sink.write(entry).await {
            Ok(()) => {
                debug!(student_id = %student_id, action = %action, reason = reason.as_str(), "Audit entry recorded");
            }
            Err(e) => {
                error!(
                    student_id = %student_id,
                    action = %action,
                    error = %e,
                    "Failed to record audit entry"
                );
                get_metrics().record_audit_write(false);
            }
        }
    }
}

const fn default_limit() -> u64 {
    20
}

/// Filter for listing audit entries.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AuditQuery {
    #[validate(length(min = 1, max = 64))]
    pub student_id: Option<String>,
    pub action: Option<AuditAction>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100))]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

impl Default for AuditQuery {
    fn default() -> Self {
        Self {
            student_id: None,
            action: None,
            since: None,
            until: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

/// Read access to the audit log.
#[derive(Clone)]
pub struct AuditService {
    repo: AccessControlLogRepository,
}

impl AuditService {
    #[must_use]
    pub const fn new(repo: AccessControlLogRepository) -> Self {
        Self { repo }
    }

    /// List entries matching `query`, newest first.
    pub async fn query(&self, query: AuditQuery) -> AppResult<Vec<access_control_log::Model>> {
        query.validate()?;

        if let (Some(since), Some(until)) = (query.since, query.until) {
            if since > until {
                return Err(AppError::Validation(
                    "since must not be after until".to_string(),
                ));
            }
        }

        let filter = AuditLogFilter {
            student_id: query.student_id,
            action: query.action,
            since: query.since,
            until: query.until,
            limit: query.limit,
            offset: query.offset,
        };

        self.repo.query(&filter).await
    }
}
