//! # メール設定
//!
//! フォーム 1 件から送る各メール（宛先ごと）の設定を表現する。
//!
//! ## 設計方針
//!
//! - **設定キー単位**: 1 つの設定キーが 1 通のメールに対応する（例: 管理者宛と自動返信）
//! - **リテラルかフィールド参照か**: 宛先・送信元・返信先・CC は、設定に直接書くか
//!   （`recipients` / `from` …）、フォームのフィールド名を指す（`*_field`）かを選べる
//! - **パース時検証**: 各キーに宛先の指定（`recipients` / `recipients_field`）と
//!   送信元の指定（`from` / `from_field`）がなければ [`MailConfig`] は構築できない
//! - **入力順の保持**: 設定キーは入力 JSON に現れた順に送信される
//!
//! ## 入力形式
//!
//! ```json
//! {
//!   "admin": {
//!     "recipients": ["info@example.com"],
//!     "from_field": "email",
//!     "sender": "bounce@example.com"
//!   },
//!   "auto_reply": {
//!     "recipients_field": "email",
//!     "from": "noreply@example.com",
//!     "subject": "Thanks for your message"
//!   }
//! }
//! ```

use std::borrow::Borrow;

use derive_more::Display;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::{is_blank, non_blank};

/// メール設定の構造エラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MailConfigError {
    /// 設定が存在しない、または空
    #[error("メール設定が空です")]
    Empty,

    /// 設定文字列が JSON として読めない
    #[error("メール設定が JSON として不正です: {reason}")]
    InvalidJson {
        /// 構文エラーの内容
        reason: String,
    },

    /// 設定が JSON オブジェクトでない
    #[error("メール設定は設定キーからの設定へのオブジェクトである必要があります")]
    NotAnObject,

    /// 宛先の指定がない
    #[error("設定 {key} に recipients または recipients_field がありません")]
    MissingRecipients {
        /// 設定キー
        key: String,
    },

    /// 送信元の指定がない
    #[error("設定 {key} に from または from_field がありません")]
    MissingFrom {
        /// 設定キー
        key: String,
    },

    /// 設定値の型が不正
    #[error("設定 {key} が不正です: {reason}")]
    InvalidSettings {
        /// 設定キー
        key:    String,
        /// デシリアライズ失敗の理由
        reason: String,
    },
}

/// 設定キー
///
/// 1 通のメール定義を識別する。本文テンプレート名の導出にも使う。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
pub struct ConfigKey(String);

impl ConfigKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ConfigKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// 設定キー 1 件分のメール設定
///
/// すべて任意項目。ただし [`MailConfig`] 経由で構築された設定は、
/// 宛先と送信元の指定を必ず持つ。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailSettings {
    /// 宛先（リテラル）
    pub recipients:       Option<Vec<String>>,
    /// 宛先を読むフォームフィールド名（カンマ区切り）
    pub recipients_field: Option<String>,
    /// 送信元（リテラル）
    pub from:             Option<String>,
    /// 送信元を読むフォームフィールド名
    pub from_field:       Option<String>,
    /// 返信先（リテラル）
    pub reply_to:         Option<String>,
    /// 返信先を読むフォームフィールド名
    pub reply_to_field:   Option<String>,
    /// `Sender` / `Return-Path` ヘッダに使うアドレス
    pub sender:           Option<String>,
    /// 件名
    pub subject:          Option<String>,
    /// CC（リテラル）
    pub cc:               Option<String>,
    /// CC を読むフォームフィールド名
    pub cc_field:         Option<String>,
}

impl MailSettings {
    /// 宛先の指定があるか
    pub fn has_recipients_source(&self) -> bool {
        self.recipients.as_ref().is_some_and(|list| !list.is_empty())
            || non_blank(self.recipients_field.as_deref()).is_some()
    }

    /// 送信元の指定があるか
    pub fn has_from_source(&self) -> bool {
        non_blank(self.from.as_deref()).is_some()
            || non_blank(self.from_field.as_deref()).is_some()
    }
}

/// 宛先はリスト・カンマ区切り文字列のどちらでも書ける
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawRecipients {
    List(Vec<String>),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct RawMailSettings {
    recipients:       Option<RawRecipients>,
    recipients_field: Option<String>,
    from:             Option<String>,
    from_field:       Option<String>,
    reply_to:         Option<String>,
    reply_to_field:   Option<String>,
    sender:           Option<String>,
    subject:          Option<String>,
    cc:               Option<String>,
    cc_field:         Option<String>,
}

impl From<RawMailSettings> for MailSettings {
    fn from(raw: RawMailSettings) -> Self {
        let recipients = raw.recipients.map(|r| match r {
            RawRecipients::List(list) => list,
            RawRecipients::Text(text) => split_addresses(&text),
        });

        Self {
            recipients,
            recipients_field: raw.recipients_field,
            from: raw.from,
            from_field: raw.from_field,
            reply_to: raw.reply_to,
            reply_to_field: raw.reply_to_field,
            sender: raw.sender,
            subject: raw.subject,
            cc: raw.cc,
            cc_field: raw.cc_field,
        }
    }
}

/// カンマ区切りのアドレス列を分割し、前後の空白を取り除く
///
/// 順序は保持し、重複も除かない。分割で生じた空要素のみ除く。
pub fn split_addresses(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|piece| !is_blank(piece))
        .map(ToString::to_string)
        .collect()
}

/// フォーム 1 件分のメール設定
///
/// 設定キーの入力順を保持する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailConfig {
    entries: Vec<(ConfigKey, MailSettings)>,
}

impl MailConfig {
    /// 生の JSON 値から設定を構築する
    ///
    /// # エラー
    ///
    /// - `null` または空オブジェクト: [`MailConfigError::Empty`]
    /// - オブジェクト以外: [`MailConfigError::NotAnObject`]
    /// - 宛先・送信元の指定がないキー: [`MailConfigError::MissingRecipients`] /
    ///   [`MailConfigError::MissingFrom`]
    pub fn parse(value: &Value) -> Result<Self, MailConfigError> {
        let object = match value {
            Value::Null => return Err(MailConfigError::Empty),
            Value::Object(object) => object,
            _ => return Err(MailConfigError::NotAnObject),
        };
        if object.is_empty() {
            return Err(MailConfigError::Empty);
        }

        let mut entries = Vec::with_capacity(object.len());
        for (key, raw) in object {
            let raw: RawMailSettings = serde_json::from_value(raw.clone()).map_err(|e| {
                MailConfigError::InvalidSettings {
                    key:    key.clone(),
                    reason: e.to_string(),
                }
            })?;
            let settings = MailSettings::from(raw);

            if !settings.has_recipients_source() {
                return Err(MailConfigError::MissingRecipients { key: key.clone() });
            }
            if !settings.has_from_source() {
                return Err(MailConfigError::MissingFrom { key: key.clone() });
            }

            entries.push((ConfigKey::new(key.as_str()), settings));
        }

        Ok(Self { entries })
    }

    /// JSON 文字列から設定を構築する
    ///
    /// 構文エラーは [`MailConfigError::InvalidJson`]、以降は [`parse`](Self::parse) と同じ。
    pub fn from_json_str(source: &str) -> Result<Self, MailConfigError> {
        let value: Value =
            serde_json::from_str(source).map_err(|e| MailConfigError::InvalidJson {
                reason: e.to_string(),
            })?;
        Self::parse(&value)
    }

    /// 設定キーを入力順に列挙する
    pub fn keys(&self) -> impl Iterator<Item = &ConfigKey> {
        self.entries.iter().map(|(key, _)| key)
    }

    /// 設定キーと設定の組を入力順に列挙する
    pub fn iter(&self) -> impl Iterator<Item = (&ConfigKey, &MailSettings)> {
        self.entries.iter().map(|(key, settings)| (key, settings))
    }

    /// 設定キーに対応する設定を取得する
    pub fn get(&self, key: &str) -> Option<&MailSettings> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_str() == key)
            .map(|(_, settings)| settings)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// メール設定が構造的に正しいかを返す
///
/// [`FormMail`](crate::FormMail) を構築する前の事前チェックに使う。
/// 空・未指定の設定は不正とみなす。
pub fn is_valid_config(value: &Value) -> bool {
    MailConfig::parse(value).is_ok()
}
