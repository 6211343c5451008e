//! # メールアドレス形式チェック
//!
//! フォームから受け取ったアドレスが「メールアドレスらしい」かを判定する。
//!
//! RFC 5322 の検証器ではない。`x@y.z` のように `@` と `.` を含む最低限の形を
//! 満たせば通す。空白の値は検証対象外として常に通す（必須チェックは別で行う）。

use std::sync::LazyLock;

use regex::Regex;

use crate::is_blank;

/// 1 文字以上、`@`、1 文字以上、`.`、1 文字以上（部分一致）
static EMAIL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r".@.+\..").expect("メール形式の正規表現が不正です"));

/// メールアドレスらしい形をしているかを返す
///
/// # 使用例
///
/// ```rust
/// use formmail_domain::email::looks_like_email;
///
/// assert!(looks_like_email("a@b.co"));
/// assert!(looks_like_email(""));
/// assert!(!looks_like_email("no-at-sign"));
/// ```
pub fn looks_like_email(value: &str) -> bool {
    is_blank(value) || EMAIL_SHAPE.is_match(value)
}
