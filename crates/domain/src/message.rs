//! # 送信リクエスト
//!
//! 検証済みの設定とフォームデータから組み立てた、送信 1 通分のメッセージ。
//! 送信アダプタ（`MailDeliverer`）に渡される。

use std::collections::BTreeMap;

use thiserror::Error;

/// `Reply-To` ヘッダ名
pub const REPLY_TO_HEADER: &str = "Reply-To";
/// `Return-Path` ヘッダ名
pub const RETURN_PATH_HEADER: &str = "Return-Path";
/// `Sender` ヘッダ名
pub const SENDER_HEADER: &str = "Sender";

/// メール送信エラー
///
/// テンプレート描画と送信アダプタが返す。
#[derive(Debug, Error)]
pub enum MailError {
    /// メール送信に失敗
    #[error("メール送信に失敗: {0}")]
    DeliveryFailed(String),

    /// テンプレートレンダリングに失敗
    #[error("テンプレートレンダリングに失敗: {0}")]
    TemplateFailed(String),
}

/// 送信リクエスト
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailRequest {
    /// 宛先（順序保持）
    pub recipients: Vec<String>,
    /// 送信元
    pub from:       String,
    /// 件名
    pub subject:    String,
    /// プレーンテキスト本文
    pub plain_body: String,
    /// HTML 本文（テンプレートがない場合は `None`）
    pub html_body:  Option<String>,
    /// CC（カンマ区切り、未指定なら空文字列）
    pub cc:         String,
    /// 追加ヘッダ（`Reply-To` / `Return-Path` / `Sender`）
    pub headers:    BTreeMap<String, String>,
}

impl MailRequest {
    /// ヘッダ値を取得する
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}
