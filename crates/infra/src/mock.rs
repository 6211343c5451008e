//! # テスト用モック送信
//!
//! ユースケーステストで使用するインメモリの送信実装。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! formmail-infra = { workspace = true, features = ["test-utils"] }
//! ```

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use formmail_domain::{MailError, MailRequest};

use crate::delivery::MailDeliverer;

// ===== MockMailDeliverer =====

/// 送信リクエストを記録するモック
///
/// [`fail_at`](MockMailDeliverer::fail_at) で指定した回（0 始まり）の送信を失敗させられる。
/// 失敗した送信は記録しない。
#[derive(Clone, Default)]
pub struct MockMailDeliverer {
    delivered: Arc<Mutex<Vec<MailRequest>>>,
    attempts:  Arc<Mutex<usize>>,
    failure:   Arc<Mutex<Option<(usize, String)>>>,
}

impl MockMailDeliverer {
    pub fn new() -> Self {
        Self::default()
    }

    /// `index` 回目の送信で `message` のエラーを返すようにする
    pub fn fail_at(self, index: usize, message: impl Into<String>) -> Self {
        *self.failure.lock().unwrap() = Some((index, message.into()));
        self
    }

    /// 送信に成功したリクエスト
    pub fn delivered(&self) -> Vec<MailRequest> {
        self.delivered.lock().unwrap().clone()
    }

    /// 送信が試みられた回数（失敗を含む）
    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl MailDeliverer for MockMailDeliverer {
    async fn deliver(&self, request: &MailRequest) -> Result<(), MailError> {
        let index = {
            let mut attempts = self.attempts.lock().unwrap();
            let index = *attempts;
            *attempts += 1;
            index
        };

        if let Some((_, message)) = self
            .failure
            .lock()
            .unwrap()
            .as_ref()
            .filter(|(fail_index, _)| *fail_index == index)
        {
            return Err(MailError::DeliveryFailed(message.clone()));
        }

        self.delivered.lock().unwrap().push(request.clone());
        Ok(())
    }
}
