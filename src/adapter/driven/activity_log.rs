use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::model::Activity;
use crate::domain::port::{ActivityRecorder, RepositoryError};

/// 活動履歴を構造化ログとして出力するレコーダー
pub struct TracingActivityRecorder;

impl TracingActivityRecorder {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TracingActivityRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActivityRecorder for TracingActivityRecorder {
    async fn record(&self, activity: &Activity) -> Result<(), RepositoryError> {
        tracing::info!(
            target: "activity",
            user_id = %activity.user_id,
            order_id = %activity.order_id,
            activity_type = %activity.activity_type,
            details = %activity.details,
            activity_date = %activity.activity_date.format("%Y-%m-%d %H:%M:%S"),
            "{}",
            activity.description
        );
        Ok(())
    }
}

/// 活動履歴をメモリに保持するレコーダー（テスト用）
#[derive(Default)]
pub struct InMemoryActivityLog {
    entries: Mutex<Vec<Activity>>,
}

impl InMemoryActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 記録順の活動履歴
    pub async fn entries(&self) -> Vec<Activity> {
        self.entries.lock().await.clone()
    }
}

#[async_trait]
impl ActivityRecorder for InMemoryActivityLog {
    async fn record(&self, activity: &Activity) -> Result<(), RepositoryError> {
        self.entries.lock().await.push(activity.clone());
        Ok(())
    }
}
