//! # FormMail ドメイン層
//!
//! フォーム送信内容とメール設定から、送信すべきメールを導出・検証する
//! ドメインモデルを定義する。
//!
//! ## 設計方針
//!
//! - **パース時検証**: メール設定は生の JSON から一度だけ型付きの設定に変換し、
//!   不変条件（宛先・送信元の指定）を満たさない設定は構築できない
//! - **借用による読み取り**: [`FormMail`] は設定とフォームデータを借用し、
//!   自身が所有するのは検証結果のみ
//! - **外部依存なし**: テンプレート描画やメール送信は上位層のトレイトで抽象化する
//!
//! ## 依存関係の方向
//!
//! ```text
//! service → infra → domain
//! ```
//!
//! ## モジュール構成
//!
//! - [`mail_config`] - 宛先ごとのメール設定と構造検証
//! - [`form`] - 送信されたフォームデータ
//! - [`required`] - 必須フィールドルール
//! - [`email`] - メールアドレス形式の緩いチェック
//! - [`validation`] - 検証エラーの集約
//! - [`form_mail`] - 宛先・件名などの解決と検証
//! - [`message`] - 送信リクエストとメール送信エラー
//!
//! ## 使用例
//!
//! ```rust
//! use formmail_domain::{FormData, FormMail, MailConfig};
//! use serde_json::json;
//!
//! let config = MailConfig::parse(&json!({
//!     "contact": { "recipients": ["info@example.com"], "from_field": "email" }
//! }))
//! .unwrap();
//! let data = FormData::from_json(&json!({ "email": "visitor@example.net" })).unwrap();
//!
//! let mut mail = FormMail::new(&config, &data, "www.example.com");
//! assert!(mail.is_valid("contact"));
//! assert_eq!(mail.subject("contact"), "Form Mail from www.example.com");
//! ```

pub mod email;
pub mod form;
pub mod form_mail;
pub mod mail_config;
pub mod message;
pub mod required;
pub mod validation;

pub use form::{FormData, FormDataError};
pub use form_mail::FormMail;
pub use mail_config::{ConfigKey, MailConfig, MailConfigError, MailSettings, is_valid_config};
pub use message::{MailError, MailRequest};
pub use required::{RequiredField, RequiredFields, RequiredMessage};
pub use validation::{ErrorKey, ValidationErrors};

/// 値が「空白」かどうかを判定する
///
/// 空文字列、または空白文字のみで構成される文字列を空白とみなす。
pub(crate) fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// 空白でない値のみを `Some` として返す
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !is_blank(v))
}
