//! # 必須フィールドルール
//!
//! フォーム送信時に同梱される `required` ブロック（フィールド名 → エラーメッセージ）を
//! 表現する。メール設定とは独立に、任意のフィールドの入力を強制する。
//!
//! メッセージが空白、または `"1"` / `"true"` / `"required"` のいずれかの場合は
//! 既定メッセージ `"is required."` を使う。

use serde_json::Value;

use crate::is_blank;

/// 既定のエラーメッセージ
pub const DEFAULT_REQUIRED_MESSAGE: &str = "is required.";

/// 「既定メッセージを使う」を意味するセンチネル値
const DEFAULT_SENTINELS: [&str; 3] = ["1", "true", "required"];

/// 必須エラー時のメッセージ
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequiredMessage {
    /// 既定メッセージ（`"is required."`）
    Default,
    /// 設定されたメッセージをそのまま使う
    Custom(String),
}

impl RequiredMessage {
    /// 生の設定値からメッセージを決定する
    pub fn parse(raw: &str) -> Self {
        if is_blank(raw) || DEFAULT_SENTINELS.contains(&raw) {
            Self::Default
        } else {
            Self::Custom(raw.to_string())
        }
    }

    /// JSON 値からメッセージを決定する
    ///
    /// `true` や `1` といった非文字列のフラグも既定メッセージとして扱う。
    pub(crate) fn from_json(value: &Value) -> Self {
        match value {
            Value::String(s) => Self::parse(s),
            Value::Null | Value::Bool(_) => Self::Default,
            other => Self::parse(&other.to_string()),
        }
    }

    /// エラーマップに記録する文言
    pub fn text(&self) -> &str {
        match self {
            Self::Default => DEFAULT_REQUIRED_MESSAGE,
            Self::Custom(message) => message,
        }
    }
}

/// 必須フィールドルール 1 件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredField {
    /// 対象フィールド名
    pub name:    String,
    /// 未入力時のメッセージ
    pub message: RequiredMessage,
}

/// 必須フィールドルールの集合
///
/// 入力順を保持する。構築後は変更しない。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequiredFields(Vec<RequiredField>);

impl RequiredFields {
    /// `(フィールド名, 生メッセージ)` の列からルールを構築する
    pub fn new<N, M>(rules: impl IntoIterator<Item = (N, M)>) -> Self
    where
        N: Into<String>,
        M: AsRef<str>,
    {
        Self(
            rules
                .into_iter()
                .map(|(name, message)| RequiredField {
                    name:    name.into(),
                    message: RequiredMessage::parse(message.as_ref()),
                })
                .collect(),
        )
    }

    /// 指定したフィールド名のルールが存在するか
    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|rule| rule.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RequiredField> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub(crate) fn push(&mut self, rule: RequiredField) {
        self.0.push(rule);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    #[case("")]
    #[case("  ")]
    #[case("1")]
    #[case("true")]
    #[case("required")]
    fn test_空白やセンチネル値は既定メッセージになる(#[case] raw: &str) {
        let message = RequiredMessage::parse(raw);

        assert_eq!(message, RequiredMessage::Default);
        assert_eq!(message.text(), "is required.");
    }

    #[test]
    fn test_任意の文言はそのままメッセージになる() {
        let message = RequiredMessage::parse("Phone number needed");

        assert_eq!(message.text(), "Phone number needed");
    }

    #[rstest]
    #[case(json!(true))]
    #[case(json!(1))]
    #[case(json!(null))]
    fn test_json_のフラグ値は既定メッセージになる(#[case] value: Value) {
        assert_eq!(RequiredMessage::from_json(&value), RequiredMessage::Default);
    }

    #[test]
    fn test_ルールは入力順を保持する() {
        let rules = RequiredFields::new([("phone", ""), ("name", "Name please")]);

        let names: Vec<&str> = rules.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["phone", "name"]);
        assert!(rules.contains("name"));
        assert!(!rules.contains("email"));
    }
}
