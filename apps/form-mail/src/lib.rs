//! # FormMail サービス
//!
//! フォーム送信データと送信設定からメールを組み立て、送信するユースケース層。
//! HTTP のリクエスト処理はホストアプリケーションが担い、このクレートはライブラリとして組み込まれる。
//!
//! ## モジュール構成
//!
//! - [`config`] - 環境変数からの設定読み込みと依存の組み立て
//! - [`usecase`] - テンプレート描画と送信を統合するディスパッチャ
//!
//! ホストアプリケーションは起動時に [`FormMailConfig::init_tracing`] でログを初期化し、
//! [`FormMailConfig::build_dispatcher`] でディスパッチャを作成する。

pub mod config;
pub mod usecase;

pub use config::{ConfigError, DeliveryBackend, DeliveryConfig, FormMailConfig};
pub use formmail_shared::observability::{LogFormat, TracingConfig};
pub use usecase::form_mail::{DispatchError, FormMailDispatcher, MailTemplates, TeraMailTemplates};
