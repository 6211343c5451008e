//! # メール送信
//!
//! 解決済みの送信リクエストを転送する。
//!
//! ## 設計方針
//!
//! - **trait による抽象化**: `MailDeliverer` trait で送信手段を抽象化
//! - **2 つの実装**: SMTP（lettre）、Noop（ログ出力のみ）
//! - **1 回限りの送信**: リトライは行わない。失敗は `MailError` として呼び出し元に返す

mod noop;
mod smtp;

use async_trait::async_trait;
use formmail_domain::{MailError, MailRequest};
pub use noop::NoopMailDeliverer;
pub use smtp::{SmtpCredentials, SmtpMailDeliverer};

/// メール送信トレイト
#[async_trait]
pub trait MailDeliverer: Send + Sync {
    /// メールを 1 通送信する
    async fn deliver(&self, request: &MailRequest) -> Result<(), MailError>;
}
