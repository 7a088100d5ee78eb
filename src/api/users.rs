//! User profile and credit endpoints

use tokio_util::sync::CancellationToken;

use super::client::ApiClient;
use super::dto::{CreditsRequest, ProfileUpdate};
use crate::error::ClientResult;
use crate::models::{CreditBalance, User, UserId};

impl ApiClient {
    pub async fn list_users(&self, cancel: &CancellationToken) -> ClientResult<Vec<User>> {
        self.get("/users/", &[], cancel).await
    }

    pub async fn get_user(&self, id: UserId, cancel: &CancellationToken) -> ClientResult<User> {
        self.get(&format!("/users/{}", id), &[], cancel).await
    }

    pub async fn update_profile(
        &self,
        update: &ProfileUpdate,
        cancel: &CancellationToken,
    ) -> ClientResult<User> {
        self.put("/users/me", update, cancel).await
    }

    pub async fn credits(&self, cancel: &CancellationToken) -> ClientResult<CreditBalance> {
        self.get("/users/credits", &[], cancel).await
    }

    /// Top up the balance; the backend answers with the new balance
    pub async fn add_credits(
        &self,
        amount: f64,
        cancel: &CancellationToken,
    ) -> ClientResult<CreditBalance> {
        self.post("/users/credits", &CreditsRequest { amount }, cancel)
            .await
    }
}
