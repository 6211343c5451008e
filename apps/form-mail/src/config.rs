//! # FormMail 設定
//!
//! 環境変数から送信バックエンド・テンプレート・ログの設定を読み込み、
//! [`FormMailDispatcher`] を組み立てる。

use std::{env, path::PathBuf, str::FromStr, sync::Arc};

use formmail_domain::MailError;
use formmail_infra::{MailDeliverer, NoopMailDeliverer, SmtpCredentials, SmtpMailDeliverer};
use formmail_shared::observability::{self, LogFormat, TracingConfig};
use strum::{Display, EnumString};
use thiserror::Error;

use crate::usecase::form_mail::{FormMailDispatcher, MailTemplates, TeraMailTemplates};

/// ログに出すサービス名
pub const SERVICE_NAME: &str = "form-mail";

/// 設定エラー
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 未対応の送信バックエンド
    #[error("MAIL_DELIVERY_BACKEND は smtp または noop である必要があります: {0}")]
    InvalidBackend(String),

    /// ポート番号が不正
    #[error("SMTP_PORT は有効なポート番号である必要があります: {0}")]
    InvalidPort(String),

    /// テンプレートの読み込みに失敗
    #[error("メールテンプレートの読み込みに失敗: {0}")]
    Templates(#[source] MailError),
}

/// 送信バックエンド
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum DeliveryBackend {
    /// SMTP サーバー経由で送信
    Smtp,
    /// 送信しない（ログ出力のみ）
    #[default]
    Noop,
}

/// FormMail の設定
#[derive(Debug, Clone)]
pub struct FormMailConfig {
    /// 送信設定
    pub delivery:     DeliveryConfig,
    /// テンプレートディレクトリ（未設定ならテンプレートなし）
    pub template_dir: Option<PathBuf>,
    /// ログ設定（`LOG_FORMAT`）
    pub tracing:      TracingConfig,
}

/// 送信機能の設定
///
/// `MAIL_DELIVERY_BACKEND` 環境変数で送信バックエンドを切り替える:
/// - `smtp`: Mailpit（開発）/ SMTP サーバー経由で送信
/// - `noop`: 送信しない（ログ出力のみ）
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    /// 送信バックエンド
    pub backend:       DeliveryBackend,
    /// SMTP ホスト（backend=smtp の場合に使用）
    pub smtp_host:     String,
    /// SMTP ポート（backend=smtp の場合に使用）
    pub smtp_port:     u16,
    /// SMTP ユーザー名
    pub smtp_username: Option<String>,
    /// SMTP パスワード
    pub smtp_password: Option<String>,
}

impl FormMailConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 任意の参照関数から設定を読み込む
    ///
    /// 空文字列は未設定として扱う。
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Ok(Self {
            delivery:     DeliveryConfig::from_lookup(&get)?,
            template_dir: get("MAIL_TEMPLATE_DIR").map(PathBuf::from),
            tracing:      TracingConfig::new(
                SERVICE_NAME,
                LogFormat::from_setting(get("LOG_FORMAT").as_deref()),
            ),
        })
    }

    /// ログ設定に従って tracing subscriber を登録する
    ///
    /// ホストアプリケーションの起動時に一度呼ぶ。登録済みなら `false`。
    pub fn init_tracing(&self) -> bool {
        observability::init_tracing(&self.tracing)
    }

    /// 設定に従って送信アダプタを作成する
    pub fn build_deliverer(&self) -> Arc<dyn MailDeliverer> {
        let delivery = &self.delivery;

        match delivery.backend {
            DeliveryBackend::Smtp => {
                tracing::info!(
                    host = %delivery.smtp_host,
                    port = delivery.smtp_port,
                    authenticated = delivery.credentials().is_some(),
                    "SMTP 送信を使用"
                );
                Arc::new(SmtpMailDeliverer::new(
                    &delivery.smtp_host,
                    delivery.smtp_port,
                    delivery.credentials(),
                ))
            }
            DeliveryBackend::Noop => {
                tracing::info!("Noop 送信を使用（メールは送信されません）");
                Arc::new(NoopMailDeliverer)
            }
        }
    }

    /// 設定に従ってテンプレートを読み込む
    pub fn build_templates(&self) -> Result<Arc<dyn MailTemplates>, ConfigError> {
        let templates = match &self.template_dir {
            Some(dir) => TeraMailTemplates::from_dir(dir).map_err(ConfigError::Templates)?,
            None => TeraMailTemplates::empty(),
        };

        Ok(Arc::new(templates))
    }

    /// 送信アダプタとテンプレートを組み立ててディスパッチャを作成する
    pub fn build_dispatcher(&self) -> Result<FormMailDispatcher, ConfigError> {
        let dispatcher = FormMailDispatcher::new(self.build_deliverer(), self.build_templates()?);

        tracing::info!(
            service = %self.tracing.service_name,
            backend = %self.delivery.backend,
            template_dir = ?self.template_dir,
            "FormMail ディスパッチャを初期化"
        );
        Ok(dispatcher)
    }
}

impl DeliveryConfig {
    fn from_lookup(get: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let backend = match get("MAIL_DELIVERY_BACKEND") {
            Some(value) => DeliveryBackend::from_str(value.trim())
                .map_err(|_| ConfigError::InvalidBackend(value))?,
            None => DeliveryBackend::default(),
        };

        let smtp_port = match get("SMTP_PORT") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(value))?,
            None => 1025,
        };

        Ok(Self {
            backend,
            smtp_host: get("SMTP_HOST").unwrap_or_else(|| "localhost".to_string()),
            smtp_port,
            smtp_username: get("SMTP_USERNAME"),
            smtp_password: get("SMTP_PASSWORD"),
        })
    }

    /// SMTP 認証情報
    ///
    /// ユーザー名とパスワードの両方が設定されている場合のみ返す。
    pub fn credentials(&self) -> Option<SmtpCredentials> {
        match (&self.smtp_username, &self.smtp_password) {
            (Some(username), Some(password)) => Some(SmtpCredentials {
                username: username.clone(),
                password: password.clone(),
            }),
            (Some(_), None) | (None, Some(_)) => {
                tracing::warn!("SMTP_USERNAME と SMTP_PASSWORD の一方のみ設定されているため認証しません");
                None
            }
            (None, None) => None,
        }
    }
}
