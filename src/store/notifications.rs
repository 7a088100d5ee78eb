//! Notifications Store

use chrono::Utc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::Store;
use crate::api::ApiClient;
use crate::error::{ClientError, ClientResult};
use crate::models::{Notification, NotificationCounts, NotificationId};

/// How often views refresh the unread counter
pub const NOTIFICATION_POLL_INTERVAL: Duration = Duration::from_secs(30);

pub const DEFAULT_LIMIT: u32 = 50;

#[derive(Debug, Clone, Default)]
pub struct NotificationState {
    pub notifications: Vec<Notification>,
    pub unread_count: u32,
    pub total_count: u32,
    pub loading: bool,
    pub error: Option<String>,
}

impl NotificationState {
    pub fn counts(&self) -> NotificationCounts {
        NotificationCounts {
            unread_count: self.unread_count,
            total_count: self.total_count,
        }
    }
}

/// Badge text: nothing at zero, capped at "99+"
pub fn badge_label(unread: u32) -> Option<String> {
    match unread {
        0 => None,
        1..=99 => Some(unread.to_string()),
        _ => Some("99+".to_string()),
    }
}

pub struct NotificationStore {
    api: ApiClient,
    store: Store<NotificationState>,
}

impl NotificationStore {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            store: Store::default(),
        }
    }

    pub fn store(&self) -> &Store<NotificationState> {
        &self.store
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.store.read(|s| s.notifications.clone())
    }

    pub fn unread_count(&self) -> u32 {
        self.store.read(|s| s.unread_count)
    }

    pub fn counts(&self) -> NotificationCounts {
        self.store.read(NotificationState::counts)
    }

    pub fn is_loading(&self) -> bool {
        self.store.read(|s| s.loading)
    }

    pub fn error(&self) -> Option<String> {
        self.store.read(|s| s.error.clone())
    }

    pub fn reset(&self) {
        self.store.replace(NotificationState::default());
    }

    /// Seed the counters from persisted state
    pub fn restore(&self, counts: NotificationCounts) {
        self.store.update(|s| {
            s.unread_count = counts.unread_count;
            s.total_count = counts.total_count;
        });
    }

    pub async fn fetch_notifications(
        &self,
        limit: u32,
        offset: u32,
        unread_only: bool,
        cancel: &CancellationToken,
    ) -> ClientResult<()> {
        self.store.update(|s| {
            s.loading = true;
            s.error = None;
        });

        match self
            .api
            .list_notifications(limit, offset, unread_only, cancel)
            .await
        {
            Ok(summary) => {
                self.store.update(|s| {
                    s.notifications = summary.notifications;
                    s.unread_count = summary.unread_count;
                    s.total_count = summary.total_count;
                    s.loading = false;
                });
                Ok(())
            }
            Err(e) => {
                self.fail(&e, "Failed to fetch notifications");
                Err(e)
            }
        }
    }

    pub async fn mark_as_read(&self, id: NotificationId, cancel: &CancellationToken) -> ClientResult<()> {
        if let Err(e) = self.api.mark_notification_read(id, cancel).await {
            self.fail(&e, "Failed to mark notification as read");
            return Err(e);
        }
        self.mark_read_locally(id);
        Ok(())
    }

    pub async fn mark_all_as_read(&self, cancel: &CancellationToken) -> ClientResult<()> {
        if let Err(e) = self.api.mark_all_notifications_read(cancel).await {
            self.fail(&e, "Failed to mark all notifications as read");
            return Err(e);
        }

        let now = Utc::now();
        self.store.update(|s| {
            for n in s.notifications.iter_mut().filter(|n| !n.is_read) {
                n.is_read = true;
                n.read_at = Some(now);
            }
            s.unread_count = 0;
        });
        Ok(())
    }

    /// Refresh the counters only. Failures are logged, not surfaced.
    pub async fn refresh_count(&self, cancel: &CancellationToken) -> ClientResult<NotificationCounts> {
        match self.api.notification_counts(cancel).await {
            Ok(counts) => {
                self.store.update(|s| {
                    s.unread_count = counts.unread_count;
                    s.total_count = counts.total_count;
                });
                Ok(counts)
            }
            Err(e) => {
                if !e.is_cancelled() {
                    tracing::warn!(error = %e, "Failed to refresh notification count");
                }
                Err(e)
            }
        }
    }

    /// Accept a group invitation. Returns the name of the joined group.
    pub async fn accept_invitation(
        &self,
        notification: &Notification,
        cancel: &CancellationToken,
    ) -> ClientResult<String> {
        let invitation_id = notification.invitation_id().ok_or_else(|| {
            ClientError::Validation("Notification is not a group invitation".into())
        })?;

        let accepted = match self.api.accept_invitation(invitation_id, cancel).await {
            Ok(accepted) => accepted,
            Err(e) => {
                self.fail(&e, "Failed to accept invitation");
                return Err(e);
            }
        };
        // The invitation stands even if the server misses the read flag
        if let Err(e) = self.api.mark_notification_read(notification.id, cancel).await {
            tracing::warn!(
                notification_id = notification.id,
                error = %e,
                "Invitation accepted but marking its notification read failed"
            );
        }
        self.mark_read_locally(notification.id);

        let name = if accepted.group_name.is_empty() {
            notification.group_name().unwrap_or_default().to_string()
        } else {
            accepted.group_name
        };
        tracing::info!(invitation_id, group = %name, "Invitation accepted");
        Ok(name)
    }

    /// The backend has no decline call; declining dismisses the notification
    pub async fn decline_invitation(
        &self,
        notification: &Notification,
        cancel: &CancellationToken,
    ) -> ClientResult<()> {
        self.mark_as_read(notification.id, cancel).await
    }

    fn mark_read_locally(&self, id: NotificationId) {
        let now = Utc::now();
        self.store.update(|s| {
            let Some(n) = s.notifications.iter_mut().find(|n| n.id == id) else {
                return;
            };
            if !n.is_read {
                n.is_read = true;
                n.read_at = Some(now);
                s.unread_count = s.unread_count.saturating_sub(1);
            }
        });
    }

    fn fail(&self, e: &ClientError, fallback: &str) {
        let message = (!e.is_cancelled()).then(|| e.user_message(fallback));
        self.store.update(|s| {
            s.loading = false;
            if message.is_some() {
                s.error = message;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification(id: NotificationId, is_read: bool) -> Notification {
        serde_json::from_value(serde_json::json!({
            "id": id, "type": "system", "title": "t", "message": "m",
            "is_read": is_read, "created_at": "2024-03-01T10:00:00Z"
        }))
        .unwrap()
    }

    fn store() -> NotificationStore {
        NotificationStore::new(ApiClient::new(&crate::config::ApiConfig::default()).unwrap())
    }

    #[test]
    fn test_badge_label() {
        assert_eq!(badge_label(0), None);
        assert_eq!(badge_label(7).as_deref(), Some("7"));
        assert_eq!(badge_label(99).as_deref(), Some("99"));
        assert_eq!(badge_label(100).as_deref(), Some("99+"));
    }

    #[test]
    fn test_mark_read_locally_decrements_once() {
        let notifications = store();
        notifications.store().update(|s| {
            s.notifications = vec![notification(1, false), notification(2, true)];
            s.unread_count = 1;
            s.total_count = 2;
        });

        notifications.mark_read_locally(1);
        notifications.mark_read_locally(1);
        notifications.mark_read_locally(2);

        assert_eq!(notifications.unread_count(), 0);
        let first = &notifications.notifications()[0];
        assert!(first.is_read && first.read_at.is_some());
    }

    #[tokio::test]
    async fn test_accept_requires_invitation() {
        let notifications = store();
        let err = notifications
            .accept_invitation(&notification(1, false), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }
}

#[cfg(test)]
mod backend_tests {
    use super::*;
    use crate::api::mock::{MockBackend, GOOD_TOKEN};

    async fn setup() -> (MockBackend, NotificationStore) {
        let backend = MockBackend::start().await;
        let api = ApiClient::new(&backend.config().api).unwrap();
        api.set_token(Some(GOOD_TOKEN.to_string()));
        (backend, NotificationStore::new(api))
    }

    #[tokio::test]
    async fn test_fetch_then_accept_invitation() {
        let (_backend, notifications) = setup().await;
        let cancel = CancellationToken::new();

        notifications
            .fetch_notifications(DEFAULT_LIMIT, 0, false, &cancel)
            .await
            .unwrap();
        assert_eq!(notifications.unread_count(), 1);
        assert_eq!(notifications.counts().total_count, 2);

        let invitation = notifications.notifications()[0].clone();
        let group = notifications
            .accept_invitation(&invitation, &cancel)
            .await
            .unwrap();

        assert_eq!(group, "Book Club");
        assert_eq!(notifications.unread_count(), 0);
        assert!(notifications.notifications()[0].is_read);
    }

    #[tokio::test]
    async fn test_accept_survives_mark_read_failure() {
        let (backend, notifications) = setup().await;
        let cancel = CancellationToken::new();
        notifications
            .fetch_notifications(DEFAULT_LIMIT, 0, false, &cancel)
            .await
            .unwrap();

        backend.state.fail_mark_read.store(true, std::sync::atomic::Ordering::SeqCst);
        let invitation = notifications.notifications()[0].clone();
        let group = notifications
            .accept_invitation(&invitation, &cancel)
            .await
            .unwrap();

        assert_eq!(group, "Book Club");
        assert!(notifications.notifications()[0].is_read);
        assert_eq!(notifications.unread_count(), 0);
        assert_eq!(notifications.error(), None);
    }

    #[tokio::test]
    async fn test_decline_marks_read() {
        let (_backend, notifications) = setup().await;
        let cancel = CancellationToken::new();
        notifications
            .fetch_notifications(DEFAULT_LIMIT, 0, false, &cancel)
            .await
            .unwrap();

        let invitation = notifications.notifications()[0].clone();
        notifications.decline_invitation(&invitation, &cancel).await.unwrap();
        assert_eq!(notifications.unread_count(), 0);
    }
}
