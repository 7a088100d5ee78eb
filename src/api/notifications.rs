//! Notification and invitation endpoints

use tokio_util::sync::CancellationToken;

use super::client::ApiClient;
use super::dto::InvitationAccepted;
use crate::error::ClientResult;
use crate::models::{NotificationCounts, NotificationId, NotificationSummary};

impl ApiClient {
    pub async fn list_notifications(
        &self,
        limit: u32,
        offset: u32,
        unread_only: bool,
        cancel: &CancellationToken,
    ) -> ClientResult<NotificationSummary> {
        let query = [
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
            ("unread_only", unread_only.to_string()),
        ];
        self.get("/notifications/", &query, cancel).await
    }

    pub async fn notification_counts(
        &self,
        cancel: &CancellationToken,
    ) -> ClientResult<NotificationCounts> {
        self.get("/notifications/count", &[], cancel).await
    }

    pub async fn mark_notification_read(
        &self,
        id: NotificationId,
        cancel: &CancellationToken,
    ) -> ClientResult<()> {
        let _: serde_json::Value = self
            .put(&format!("/notifications/{}/read", id), &serde_json::json!({}), cancel)
            .await?;
        Ok(())
    }

    pub async fn mark_all_notifications_read(&self, cancel: &CancellationToken) -> ClientResult<()> {
        let _: serde_json::Value = self
            .put("/notifications/read-all", &serde_json::json!({}), cancel)
            .await?;
        Ok(())
    }

    pub async fn accept_invitation(
        &self,
        invitation_id: i64,
        cancel: &CancellationToken,
    ) -> ClientResult<InvitationAccepted> {
        self.post(
            &format!("/invitations/{}/accept", invitation_id),
            &serde_json::json!({}),
            cancel,
        )
        .await
    }
}
