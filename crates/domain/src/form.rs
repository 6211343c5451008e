//! # フォームデータ
//!
//! 送信されたフォームのフィールド（名前 → 文字列値）を表現する。
//!
//! ## 設計方針
//!
//! - **`required` ブロックの抽出**: 送信データに含まれる `required` オブジェクトは
//!   構築時に一度だけ [`RequiredFields`] として取り出し、フィールドからは除く
//! - **文字列への正規化**: 数値・真偽値は文字列化、スカラーの配列は `", "` で連結、
//!   `null` は空文字列
//! - **ネストした値の展開**: オブジェクトや入れ子の配列は `address[city]` / `items[0]` の
//!   ようなフォームのパラメータ名に展開する
//! - **入力順の保持**: フィールドは送信された順に並ぶ

use serde_json::Value;
use thiserror::Error;

use crate::{
    non_blank,
    required::{RequiredField, RequiredFields, RequiredMessage},
};

/// `required` ブロックのキー
const REQUIRED_KEY: &str = "required";

/// 件名を上書きするフィールド名
const SUBJECT_FIELD: &str = "subject";

/// フォームデータの構築エラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormDataError {
    /// 送信データが JSON オブジェクトでない
    #[error("フォームデータはオブジェクトである必要があります")]
    NotAnObject,

    /// `required` がオブジェクトでない
    #[error("required はフィールド名からメッセージへのオブジェクトである必要があります")]
    InvalidRequired,
}

/// 送信されたフォームデータ
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    fields:   Vec<(String, String)>,
    required: RequiredFields,
}

impl FormData {
    /// フィールドと必須ルールから構築する
    pub fn new<K, V>(fields: impl IntoIterator<Item = (K, V)>, required: RequiredFields) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            required,
        }
    }

    /// JSON オブジェクトから構築する
    ///
    /// `required` メンバーは必須ルールとして取り出され、フィールドには残らない。
    pub fn from_json(value: &Value) -> Result<Self, FormDataError> {
        let Value::Object(object) = value else {
            return Err(FormDataError::NotAnObject);
        };

        let mut data = Self::default();
        for (name, value) in object {
            if name == REQUIRED_KEY {
                data.required = parse_required(value)?;
                continue;
            }
            push_field(&mut data.fields, name.clone(), value);
        }
        Ok(data)
    }

    /// フィールド値を取得する
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    /// 空白でないフィールド値を取得する
    pub fn get_non_blank(&self, name: &str) -> Option<&str> {
        non_blank(self.get(name))
    }

    /// 送信者が指定した件名
    pub fn subject(&self) -> Option<&str> {
        self.get_non_blank(SUBJECT_FIELD)
    }

    /// 必須フィールドルール
    pub fn required(&self) -> &RequiredFields {
        &self.required
    }

    /// フィールドを送信順に列挙する
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// 全フィールドを `name: value` 形式の行に書き出す
    ///
    /// 本文テンプレートが無い場合の代替本文に使う。
    pub fn to_text_dump(&self) -> String {
        self.fields
            .iter()
            .map(|(name, value)| format!("{name}: {value}\n"))
            .collect()
    }
}

fn parse_required(value: &Value) -> Result<RequiredFields, FormDataError> {
    let Value::Object(rules) = value else {
        return Err(FormDataError::InvalidRequired);
    };

    let mut required = RequiredFields::default();
    for (name, message) in rules {
        required.push(RequiredField {
            name:    name.clone(),
            message: RequiredMessage::from_json(message),
        });
    }
    Ok(required)
}

/// フィールド値を文字列に正規化して追加する
///
/// ネストした値は `name[key]` / `name[index]` に展開する。
fn push_field(fields: &mut Vec<(String, String)>, name: String, value: &Value) {
    match value {
        Value::Array(items) if items.iter().all(is_scalar) => {
            let text = items.iter().map(scalar_text).collect::<Vec<_>>().join(", ");
            fields.push((name, text));
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                push_field(fields, format!("{name}[{index}]"), item);
            }
        }
        Value::Object(members) => {
            for (key, member) in members {
                push_field(fields, format!("{name}[{key}]"), member);
            }
        }
        scalar => {
            let text = scalar_text(scalar);
            fields.push((name, text));
        }
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
