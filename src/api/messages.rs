//! Message endpoints

use tokio_util::sync::CancellationToken;

use super::client::ApiClient;
use super::dto::{MessageContent, MessagePage};
use crate::error::ClientResult;
use crate::models::{GroupId, Message, MessageId};

impl ApiClient {
    /// One page of a group's history, `page` starting at 1
    pub async fn list_messages(
        &self,
        group_id: GroupId,
        page: u32,
        limit: u32,
        cancel: &CancellationToken,
    ) -> ClientResult<MessagePage> {
        let query = [("page", page.to_string()), ("limit", limit.to_string())];
        self.get(&format!("/groups/{}/messages", group_id), &query, cancel)
            .await
    }

    pub async fn send_message(
        &self,
        group_id: GroupId,
        content: &str,
        cancel: &CancellationToken,
    ) -> ClientResult<Message> {
        let body = MessageContent {
            content: content.to_string(),
        };
        self.post(&format!("/groups/{}/messages", group_id), &body, cancel)
            .await
    }

    pub async fn edit_message(
        &self,
        id: MessageId,
        content: &str,
        cancel: &CancellationToken,
    ) -> ClientResult<Message> {
        let body = MessageContent {
            content: content.to_string(),
        };
        self.put(&format!("/messages/{}", id), &body, cancel).await
    }

    pub async fn delete_message(&self, id: MessageId, cancel: &CancellationToken) -> ClientResult<()> {
        let _: serde_json::Value = self.delete(&format!("/messages/{}", id), cancel).await?;
        Ok(())
    }
}
