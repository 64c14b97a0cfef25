// src/session/registry.rs - In-memory registry of pending and streaming sessions
//
// A session is created when a prompt is submitted and activated when the
// browser opens its push channel. Terminal states are not stored: a finished
// session is simply removed. Whoever removes a record also releases its
// attachment, so the file is deleted exactly once.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::attachment::Attachment;
use crate::infra::errors::ChatError;
use crate::provider::Part;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Streaming,
}

struct SessionRecord {
    status: SessionStatus,
    input: Vec<Part>,
    attachment: Option<Attachment>,
    /// Installed on activation.
    cancel: Option<CancellationToken>,
    created_at: DateTime<Utc>,
}

/// What the relay needs to drive an activated session.
#[derive(Debug, Clone)]
pub struct ActiveSession {
    pub id: String,
    pub input: Vec<Part>,
    pub attachment: Option<Attachment>,
    pub cancel: CancellationToken,
}

/// Process-wide session map. Cloning shares the same map.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<String, SessionRecord>>>,
    pending_timeout: Duration,
}

impl SessionRegistry {
    pub fn new(pending_timeout: Duration) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            pending_timeout,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionRecord>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Store a pending session and schedule its expiry. Must be called from
    /// within a tokio runtime.
    pub fn create(&self, input: Vec<Part>, attachment: Option<Attachment>) -> String {
        let id = {
            let mut sessions = self.lock();
            let mut id = uuid::Uuid::new_v4().to_string();
            while sessions.contains_key(&id) {
                id = uuid::Uuid::new_v4().to_string();
            }
            sessions.insert(
                id.clone(),
                SessionRecord {
                    status: SessionStatus::Pending,
                    input,
                    attachment,
                    cancel: None,
                    created_at: Utc::now(),
                },
            );
            id
        };
        tracing::info!("[{id}] Pending stream created");

        let registry = self.clone();
        let expiring = id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(registry.pending_timeout).await;
            registry.expire(&expiring).await;
        });

        id
    }

    /// Move a pending session to streaming. Unknown, expired and already
    /// activated ids all yield `SessionNotFound`.
    pub fn activate(&self, id: &str) -> Result<ActiveSession, ChatError> {
        let mut sessions = self.lock();
        let record = sessions
            .get_mut(id)
            .filter(|r| r.status == SessionStatus::Pending)
            .ok_or_else(|| ChatError::SessionNotFound { id: id.to_string() })?;

        let cancel = CancellationToken::new();
        record.status = SessionStatus::Streaming;
        record.cancel = Some(cancel.clone());

        Ok(ActiveSession {
            id: id.to_string(),
            input: record.input.clone(),
            attachment: record.attachment.clone(),
            cancel,
        })
    }

    /// Signal cooperative cancellation. Only streaming sessions can be stopped;
    /// the record stays until the relay tears the stream down.
    pub fn request_stop(&self, id: &str) -> Result<(), ChatError> {
        let sessions = self.lock();
        let cancel = sessions
            .get(id)
            .filter(|r| r.status == SessionStatus::Streaming)
            .and_then(|r| r.cancel.as_ref())
            .ok_or_else(|| ChatError::SessionNotFound { id: id.to_string() })?;

        tracing::info!("[{id}] Stop signal received");
        cancel.cancel();
        Ok(())
    }

    /// Remove a session and release its attachment. Returns false if it was
    /// already gone.
    pub async fn delete(&self, id: &str) -> bool {
        let removed = self.lock().remove(id);
        match removed {
            Some(record) => {
                if let Some(attachment) = record.attachment {
                    attachment.release(id).await;
                }
                true
            }
            None => false,
        }
    }

    /// Timer callback: drop the session only if it is still pending now.
    async fn expire(&self, id: &str) {
        let removed = {
            let mut sessions = self.lock();
            let still_pending = sessions
                .get(id)
                .is_some_and(|r| r.status == SessionStatus::Pending);
            if still_pending {
                sessions.remove(id)
            } else {
                None
            }
        };

        if let Some(record) = removed {
            let age = Utc::now() - record.created_at;
            tracing::info!(
                "[{id}] Cleaning up timed-out pending stream ({}s old)",
                age.num_seconds()
            );
            if let Some(attachment) = record.attachment {
                attachment.release(id).await;
            }
        }
    }

    pub fn status(&self, id: &str) -> Option<SessionStatus> {
        self.lock().get(id).map(|r| r.status)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn registry() -> SessionRegistry {
        SessionRegistry::new(Duration::from_secs(60))
    }

    fn prompt(s: &str) -> Vec<Part> {
        vec![Part::Text(s.into())]
    }

    async fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
        for _ in 0..200 {
            if cond() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_create_returns_unique_pending_ids() {
        let reg = registry();
        let mut seen = HashSet::new();
        for _ in 0..50 {
            let id = reg.create(prompt("q"), None);
            assert_eq!(reg.status(&id), Some(SessionStatus::Pending));
            assert!(seen.insert(id));
        }
        assert_eq!(reg.len(), 50);
    }

    #[tokio::test]
    async fn test_ids_not_reused_after_delete() {
        let reg = registry();
        let first = reg.create(prompt("q"), None);
        assert!(reg.delete(&first).await);
        let second = reg.create(prompt("q"), None);
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_activate_once() {
        let reg = registry();
        let id = reg.create(prompt("hello"), None);

        let active = reg.activate(&id).unwrap();
        assert_eq!(active.id, id);
        assert_eq!(active.input, prompt("hello"));
        assert!(!active.cancel.is_cancelled());
        assert_eq!(reg.status(&id), Some(SessionStatus::Streaming));

        let again = reg.activate(&id).unwrap_err();
        assert!(again.is_not_found());
    }

    #[tokio::test]
    async fn test_activate_unknown() {
        let reg = registry();
        assert!(reg.activate("missing").unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_stop_requires_streaming() {
        let reg = registry();
        let id = reg.create(prompt("q"), None);

        // Pending sessions cannot be stopped.
        assert!(reg.request_stop(&id).unwrap_err().is_not_found());

        let active = reg.activate(&id).unwrap();
        reg.request_stop(&id).unwrap();
        assert!(active.cancel.is_cancelled());
        // Stop does not delete.
        assert_eq!(reg.status(&id), Some(SessionStatus::Streaming));

        assert!(reg.delete(&id).await);
        assert!(reg.request_stop(&id).unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent_and_releases_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload");
        std::fs::write(&path, b"png").unwrap();

        let reg = registry();
        let id = reg.create(prompt("q"), Some(Attachment::new(&path, "image/png")));
        assert!(reg.delete(&id).await);
        assert!(!path.exists());
        assert!(!reg.delete(&id).await);
        assert!(reg.is_empty());
    }

    #[tokio::test]
    async fn test_pending_session_expires_with_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload");
        std::fs::write(&path, b"png").unwrap();

        let reg = SessionRegistry::new(Duration::from_millis(50));
        let id = reg.create(vec![], Some(Attachment::new(&path, "image/png")));
        assert_eq!(reg.status(&id), Some(SessionStatus::Pending));

        assert!(wait_until(|| !path.exists() && reg.status(&id).is_none()).await);
        assert!(reg.activate(&id).unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_activated_session_survives_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload");
        std::fs::write(&path, b"png").unwrap();

        let reg = SessionRegistry::new(Duration::from_millis(30));
        let id = reg.create(prompt("q"), Some(Attachment::new(&path, "image/png")));
        reg.activate(&id).unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(reg.status(&id), Some(SessionStatus::Streaming));
        assert!(path.exists());
    }
}
