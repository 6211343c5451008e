//! # メールテンプレート
//!
//! tera テンプレートエンジンで設定キーごとの本文を生成する。
//!
//! ## テンプレート名
//!
//! - `email_<key>`: プレーンテキスト本文
//! - `email_plain`: キー固有のテンプレートがない場合の共通プレーンテキスト本文
//! - `email_<key>_html`: HTML 本文
//!
//! 名前が `_html` で終わるテンプレートでは変数を HTML エスケープする。
//!
//! ## 未送信のフィールド
//!
//! 必須ルールに挙がっているフィールドと値が `null` のフィールドは、未送信でも空文字列として
//! 参照できる。それ以外の任意フィールドは `{{ phone | default(value="") }}` のように
//! `default` フィルタで参照する。

use std::{error::Error as _, fs, io, path::Path};

use formmail_domain::{ConfigKey, FormData, MailError};
use serde_json::{Map, Value};
use tera::{Context, Tera};

/// HTML エスケープを有効にするテンプレート名の接尾辞
const HTML_SUFFIX: &str = "_html";

/// 本文テンプレートの描画
///
/// ディスパッチャはこのトレイト越しにテンプレートを参照する。
pub trait MailTemplates: Send + Sync {
    /// 指定した名前のテンプレートが登録されているか
    fn has_template(&self, name: &str) -> bool;

    /// テンプレートを描画する
    fn render(&self, name: &str, data: &FormData, config_key: &ConfigKey)
    -> Result<String, MailError>;
}

/// tera によるテンプレート実装
pub struct TeraMailTemplates {
    engine: Tera,
}

impl TeraMailTemplates {
    /// テンプレートを 1 つも持たないインスタンス
    ///
    /// すべての本文がフォールバック（送信内容の一覧）になる。
    pub fn empty() -> Self {
        Self {
            engine: Self::engine(),
        }
    }

    /// `(名前, ソース)` の組からテンプレートを登録する
    pub fn from_raw<N, S>(templates: impl IntoIterator<Item = (N, S)>) -> Result<Self, MailError>
    where
        N: AsRef<str>,
        S: AsRef<str>,
    {
        let mut engine = Self::engine();
        engine
            .add_raw_templates(templates)
            .map_err(|e| MailError::TemplateFailed(describe(&e)))?;

        Ok(Self { engine })
    }

    /// ディレクトリ内のファイルをテンプレートとして登録する
    ///
    /// 各ファイルは拡張子を除いたファイル名（`email_contact.txt` → `email_contact`）で登録される。
    /// 同じ名前になるファイルが複数ある場合は、パス順で後のものが優先される。
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, MailError> {
        let dir = dir.as_ref();
        let read_error = |e: io::Error| {
            MailError::TemplateFailed(format!(
                "テンプレートの読み込みに失敗 ({}): {e}",
                dir.display()
            ))
        };

        let mut paths = fs::read_dir(dir)
            .map_err(read_error)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(read_error)?;
        paths.retain(|path| path.is_file());
        paths.sort();

        let mut templates = Vec::with_capacity(paths.len());
        for path in paths {
            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            let source = fs::read_to_string(&path).map_err(read_error)?;
            templates.push((name.to_string(), source));
        }

        tracing::debug!(
            dir = %dir.display(),
            count = templates.len(),
            "メールテンプレートを読み込み"
        );

        Self::from_raw(templates)
    }

    fn engine() -> Tera {
        let mut engine = Tera::default();
        engine.autoescape_on(vec![HTML_SUFFIX]);
        engine
    }
}

impl MailTemplates for TeraMailTemplates {
    fn has_template(&self, name: &str) -> bool {
        self.engine.get_template_names().any(|registered| registered == name)
    }

    fn render(
        &self,
        name: &str,
        data: &FormData,
        config_key: &ConfigKey,
    ) -> Result<String, MailError> {
        self.engine
            .render(name, &build_context(data, config_key))
            .map_err(|e| MailError::TemplateFailed(describe(&e)))
    }
}

/// 描画コンテキストを構築する
///
/// 送信された各フィールドを名前で参照できるほか、`fields`（全フィールドのマップ）と
/// `config_key` を渡す。同名のフィールドよりもこの 2 つが優先される。
/// 未送信の必須フィールドは空文字列として渡す。
fn build_context(data: &FormData, config_key: &ConfigKey) -> Context {
    let mut context = Context::new();
    let mut fields = Map::new();

    for rule in data.required().iter() {
        context.insert(rule.name.as_str(), "");
    }
    for (name, value) in data.fields() {
        context.insert(name, value);
        fields.insert(name.to_string(), Value::String(value.to_string()));
    }

    context.insert("fields", &fields);
    context.insert("config_key", config_key.as_str());
    context
}

/// tera のエラーを原因の連鎖ごと文字列にする
///
/// tera のトップレベルのメッセージは「Failed to render 'x'」だけで、
/// 未定義の変数名などは `source()` 側にある。
fn describe(error: &tera::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
