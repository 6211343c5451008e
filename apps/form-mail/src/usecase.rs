//! # ユースケース層
//!
//! ビジネスロジックを実装する。

pub mod form_mail;
