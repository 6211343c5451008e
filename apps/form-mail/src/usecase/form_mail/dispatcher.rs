//! # フォームメールディスパッチャ
//!
//! 送信可否の検証 → 本文の描画 → メール送信 → ログ出力を統合する。
//!
//! ## 設計方針
//!
//! - **全件検証してから送信**: 設定キーが 1 つでも不正なら、どのメールも送信しない
//! - **最初の失敗で打ち切り**: 描画・送信の失敗以降のキーは処理しない。送信済みのメールは取り消さない
//! - **依存性注入**: `MailDeliverer` と `MailTemplates` は trait で抽象化

use std::sync::Arc;

use formmail_domain::{ConfigKey, FormMail, MailError, MailRequest};
use formmail_infra::MailDeliverer;
use formmail_shared::{event_log::event, log_business_event};
use thiserror::Error;

use super::MailTemplates;

/// キー固有のテンプレートがない場合に使う共通プレーンテキストテンプレート
pub const PLAIN_FALLBACK_TEMPLATE: &str = "email_plain";

/// 本文テンプレートがない場合のフォールバック本文の見出し
pub const FALLBACK_BODY_HEADING: &str = "The following information was posted:\n";

/// プレーンテキスト本文のテンプレート名
pub fn plain_template_name(config_key: &ConfigKey) -> String {
    format!("email_{config_key}")
}

/// HTML 本文のテンプレート名
pub fn html_template_name(config_key: &ConfigKey) -> String {
    format!("email_{config_key}_html")
}

/// ディスパッチエラー
#[derive(Debug, Error)]
pub enum DispatchError {
    /// 送信できない設定キーがある（詳細は `FormMail::errors` に記録済み）
    #[error("送信設定 {config_key} の検証に失敗しました")]
    Invalid { config_key: ConfigKey },

    /// 本文の描画に失敗
    #[error("{config_key}: {source}")]
    Render {
        config_key: ConfigKey,
        #[source]
        source:     MailError,
    },

    /// 送信に失敗
    #[error("{config_key}: {source}")]
    Delivery {
        config_key: ConfigKey,
        #[source]
        source:     MailError,
    },
}

/// フォームメールディスパッチャ
///
/// 設定キーごとに 1 通のメールを組み立て、設定順に 1 通ずつ送信する。
pub struct FormMailDispatcher {
    deliverer: Arc<dyn MailDeliverer>,
    templates: Arc<dyn MailTemplates>,
}

impl FormMailDispatcher {
    pub fn new(deliverer: Arc<dyn MailDeliverer>, templates: Arc<dyn MailTemplates>) -> Self {
        Self {
            deliverer,
            templates,
        }
    }

    /// すべての設定キーのメールを送信する
    ///
    /// 検証エラーの場合は `false` を返す（エラーは検証時に記録済み）。
    /// 描画・送信の失敗はメッセージを `base` エラーとして記録し、`false` を返す。
    pub async fn send(&self, mail: &mut FormMail<'_>) -> bool {
        match self.try_send(mail).await {
            Ok(_) => true,
            Err(DispatchError::Invalid { .. }) => false,
            Err(e) => {
                mail.record_send_failure(e.to_string());
                false
            }
        }
    }

    /// すべての設定キーのメールを送信し、送信した通数を返す
    ///
    /// 失敗は `FormMail` に記録せずにそのまま返す。
    pub async fn try_send(&self, mail: &mut FormMail<'_>) -> Result<usize, DispatchError> {
        if let Some(config_key) = mail.first_invalid_key() {
            log_business_event!(
                event.category = event::category::FORM_MAIL,
                event.action = event::action::MAIL_VALIDATION_FAILED,
                event.result = event::result::FAILURE,
                mail.config_key = %config_key,
                mail.error_count = mail.errors().len(),
                "フォームメールの検証に失敗"
            );
            return Err(DispatchError::Invalid {
                config_key: config_key.clone(),
            });
        }

        let config = mail.config();
        let mut delivered = 0;

        for config_key in config.keys() {
            match self.dispatch_one(mail, config_key).await {
                Ok(request) => {
                    log_business_event!(
                        event.category = event::category::FORM_MAIL,
                        event.action = event::action::MAIL_SENT,
                        event.result = event::result::SUCCESS,
                        mail.config_key = %config_key,
                        mail.recipient_count = request.recipients.len(),
                        mail.has_html = request.html_body.is_some(),
                        "フォームメール送信成功"
                    );
                    mail.mark_sent();
                    delivered += 1;
                }
                Err(e) => {
                    log_business_event!(
                        event.category = event::category::FORM_MAIL,
                        event.action = event::action::MAIL_FAILED,
                        event.result = event::result::FAILURE,
                        mail.config_key = %config_key,
                        mail.recipient_count = mail.recipients(config_key.as_str()).len(),
                        error = %e,
                        "フォームメール送信失敗"
                    );
                    return Err(e);
                }
            }
        }

        Ok(delivered)
    }

    /// 設定キー 1 つ分のメールを組み立てて送信する
    async fn dispatch_one(
        &self,
        mail: &FormMail<'_>,
        config_key: &ConfigKey,
    ) -> Result<MailRequest, DispatchError> {
        let request = self.build_request(mail, config_key)?;

        self.deliverer
            .deliver(&request)
            .await
            .map_err(|source| DispatchError::Delivery {
                config_key: config_key.clone(),
                source,
            })?;

        Ok(request)
    }

    /// 設定キー 1 つ分の送信リクエストを組み立てる
    fn build_request(
        &self,
        mail: &FormMail<'_>,
        config_key: &ConfigKey,
    ) -> Result<MailRequest, DispatchError> {
        let data = mail.data();
        let render = |name: &str| {
            self.templates
                .render(name, data, config_key)
                .map_err(|source| DispatchError::Render {
                    config_key: config_key.clone(),
                    source,
                })
        };

        let plain_name = plain_template_name(config_key);
        let plain_body = if self.templates.has_template(&plain_name) {
            render(&plain_name)?
        } else if self.templates.has_template(PLAIN_FALLBACK_TEMPLATE) {
            render(PLAIN_FALLBACK_TEMPLATE)?
        } else {
            String::new()
        };

        let html_name = html_template_name(config_key);
        let html_body = if self.templates.has_template(&html_name) {
            Some(render(&html_name)?).filter(|body| !body.trim().is_empty())
        } else {
            None
        };

        let plain_body = if plain_body.trim().is_empty() && html_body.is_none() {
            format!("{FALLBACK_BODY_HEADING}{}", data.to_text_dump())
        } else {
            plain_body
        };

        let key = config_key.as_str();
        Ok(MailRequest {
            recipients: mail.recipients(key),
            from: mail.from(key).to_string(),
            subject: mail.subject(key),
            plain_body,
            html_body,
            cc: mail.cc(key).to_string(),
            headers: mail.headers(key),
        })
    }
}
