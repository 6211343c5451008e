//! # 検証エラー
//!
//! 検証・送信で検出したエラーメッセージを集約する。
//!
//! エラーはキー付きのリストとして記録する。同じキーに複数のメッセージが
//! 記録された場合、[`ValidationErrors::get`] は最後に記録されたものを返す
//! （フォーム再表示でキーごとに 1 メッセージを出す用途）。
//! すべてのメッセージは [`ValidationErrors::messages`] で取得できる。

use std::fmt;

/// フォーム全体に関するエラー（宛先・送信元の不備）のキー
pub const FORM_ERROR_KEY: &str = "form";

/// 送信処理の失敗のキー
pub const BASE_ERROR_KEY: &str = "base";

/// エラーの記録先キー
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKey {
    /// フォーム全体（`"form"`）
    Form,
    /// 送信処理（`"base"`）
    Base,
    /// 個別フィールド
    Field(String),
}

impl ErrorKey {
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    /// 文字列表現（エラーマップのキー）
    pub fn as_str(&self) -> &str {
        match self {
            Self::Form => FORM_ERROR_KEY,
            Self::Base => BASE_ERROR_KEY,
            Self::Field(name) => name,
        }
    }
}

impl fmt::Display for ErrorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 検証エラーの集合
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    entries: Vec<(ErrorKey, String)>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// エラーを記録する
    ///
    /// 同じキー・同じメッセージの組はすでに記録済みなら重ねて記録しない。
    pub fn add(&mut self, key: ErrorKey, message: impl Into<String>) {
        let message = message.into();
        // 同じ組は末尾に移し、最新のメッセージとして扱う
        self.entries.retain(|(k, m)| !(*k == key && *m == message));
        self.entries.push((key, message));
    }

    /// キーに対する最新のメッセージ
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k.as_str() == key)
            .map(|(_, message)| message.as_str())
    }

    /// キーに対するすべてのメッセージ（記録順）
    pub fn messages(&self, key: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(k, _)| k.as_str() == key)
            .map(|(_, message)| message.as_str())
            .collect()
    }

    /// エラーのあるキー（初出順、重複なし）
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for (key, _) in &self.entries {
            if !keys.contains(&key.as_str()) {
                keys.push(key.as_str());
            }
        }
        keys
    }

    /// 記録されたすべてのエラー（記録順）
    pub fn iter(&self) -> impl Iterator<Item = (&ErrorKey, &str)> {
        self.entries.iter().map(|(k, m)| (k, m.as_str()))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
