//! Signed-in guest's own view: submission counts and message thread.

use serde::Serialize;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::applications::CrmError;
use super::messages;
use crate::model::{ApplicationType, Message};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SubmissionCounts {
    pub buy: i64,
    pub sell: i64,
    pub work: i64,
}

impl SubmissionCounts {
    #[must_use]
    pub fn total(&self) -> i64 {
        self.buy + self.sell + self.work
    }

    fn set(&mut self, kind: ApplicationType, count: i64) {
        match kind {
            ApplicationType::Buy => self.buy = count,
            ApplicationType::Sell => self.sell = count,
            ApplicationType::Work => self.work = count,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GuestDashboard {
    pub counts: SubmissionCounts,
    pub total: i64,
    pub messages: Vec<Message>,
}

pub async fn submission_counts(pool: &PgPool, user_id: Uuid) -> Result<SubmissionCounts, CrmError> {
    let mut counts = SubmissionCounts::default();
    for kind in ApplicationType::ALL {
        let row = sqlx::query(&format!("SELECT COUNT(*) AS n FROM {} WHERE user_id = $1", kind.legacy_table()))
            .bind(user_id)
            .fetch_one(pool)
            .await?;
        counts.set(kind, row.try_get("n")?);
    }
    Ok(counts)
}

pub async fn load(pool: &PgPool, user_id: Uuid) -> Result<GuestDashboard, CrmError> {
    let counts = submission_counts(pool, user_id).await?;
    let messages = messages::thread(pool, user_id).await?;
    Ok(GuestDashboard { counts, total: counts.total(), messages })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_total_and_set() {
        let mut counts = SubmissionCounts::default();
        counts.set(ApplicationType::Buy, 2);
        counts.set(ApplicationType::Work, 1);
        assert_eq!(counts, SubmissionCounts { buy: 2, sell: 0, work: 1 });
        assert_eq!(counts.total(), 3);
    }

    #[cfg(feature = "live-db-tests")]
    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL/live Postgres"]
    async fn dashboard_counts_only_own_rows() {
        use crate::services::forms::{SellForm, record};

        let pool = crate::db::testing::integration_pool().await;
        let guest = crate::db::testing::seed_user(&pool, "guest@example.com", "guest").await;
        let sell = SellForm {
            full_name: "Ana Diaz".into(),
            phone_number: "5551234567".into(),
            email: "ana@example.com".into(),
            home_address: "12 Elm Street".into(),
        };
        let submission = sell.validate().unwrap();
        record(&pool, Some(guest), &submission).await.unwrap();
        record(&pool, None, &submission).await.unwrap();
        messages::send_to_admins(&pool, guest, "hello").await.unwrap();

        let dash = load(&pool, guest).await.unwrap();
        assert_eq!(dash.counts, SubmissionCounts { buy: 0, sell: 1, work: 0 });
        assert_eq!(dash.total, 1);
        assert_eq!(dash.messages.len(), 1);
    }
}
