//! # FormMail インフラ層
//!
//! メール送信など外部システムとの接続を担当するインフラストラクチャ層。
//!
//! ## 設計方針
//!
//! ドメイン層で組み立てた [`MailRequest`](formmail_domain::MailRequest) を
//! 実際の転送手段に渡す。転送手段は [`delivery::MailDeliverer`] トレイトで
//! 抽象化し、上位層は具体実装を知らない。
//!
//! ## 依存関係
//!
//! ```text
//! service → infra → domain
//! ```
//!
//! ## モジュール構成
//!
//! - [`delivery`] - メール送信トレイトと SMTP / Noop 実装
//! - `mock` - テスト用の記録型送信（`test-utils` feature）

pub mod delivery;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use delivery::{MailDeliverer, NoopMailDeliverer, SmtpCredentials, SmtpMailDeliverer};
