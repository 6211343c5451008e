//! Noop メール送信実装
//!
//! メールを実際に送信せず、ログ出力のみ行う。
//! 開発環境や送信無効化時に使用する。

use async_trait::async_trait;
use formmail_domain::{MailError, MailRequest};

use super::MailDeliverer;

/// Noop メール送信（ログ出力のみ）
#[derive(Debug, Clone)]
pub struct NoopMailDeliverer;

#[async_trait]
impl MailDeliverer for NoopMailDeliverer {
    async fn deliver(&self, request: &MailRequest) -> Result<(), MailError> {
        tracing::info!(
            recipients = request.recipients.len(),
            from = %request.from,
            subject = %request.subject,
            has_html = request.html_body.is_some(),
            "Noop: メール送信をスキップ"
        );
        Ok(())
    }
}
