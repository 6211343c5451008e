//! # フォームメールユースケース
//!
//! 送信可否の検証、テンプレート描画、送信を統合する。
//!
//! ## モジュール構成
//!
//! - [`templates`] - tera テンプレートエンジンによる本文生成
//! - [`dispatcher`] - 検証 + 描画 + 送信の統合サービス

pub mod dispatcher;
pub mod templates;

pub use dispatcher::{DispatchError, FormMailDispatcher};
pub use templates::{MailTemplates, TeraMailTemplates};
