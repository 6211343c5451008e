//! # フォームメール
//!
//! メール設定とフォームデータから、設定キーごとに宛先・送信元・件名などを解決し、
//! 送信可否を検証する。
//!
//! ## 解決ルール
//!
//! | 項目 | 優先順 |
//! |------|--------|
//! | 送信元 | `from` → `from_field` が指すフィールド |
//! | 宛先 | `recipients` → `recipients_field` が指すフィールド（カンマ区切り） |
//! | 返信先 | `reply_to` → `reply_to_field` が指すフィールド |
//! | CC | `cc_field` が指すフィールド → `cc` → 空文字列 |
//! | 件名 | フォームの `subject` → 設定の `subject` → `Form Mail from <host>` |
//!
//! いずれも空白の値は「指定なし」として次の候補に進む。
//!
//! ## 検証
//!
//! すべてのチェックを実行し、エラーはキー付きで記録する。`form` キーへの
//! メッセージは後のチェックほど新しいものとして扱われる。
//! 結果は設定キーごとにメモ化し、同じキーの再検証ではエラーを重ねて記録しない。

use std::collections::{BTreeMap, HashMap};

use crate::{
    email::looks_like_email,
    form::FormData,
    is_blank,
    mail_config::{ConfigKey, MailConfig, MailSettings, split_addresses},
    message::{REPLY_TO_HEADER, RETURN_PATH_HEADER, SENDER_HEADER},
    non_blank,
    validation::{ErrorKey, ValidationErrors},
};

pub const RECIPIENTS_REQUIRED: &str = "Recipients are required.";
pub const RECIPIENTS_INVALID: &str = "Recipients are invalid.";
pub const FROM_REQUIRED: &str = "From is required.";
pub const FROM_INVALID: &str = "From is invalid.";

/// 1 回のフォーム送信に対する検証・解決の状態
///
/// 設定とフォームデータは呼び出し元から借用する。
/// 自身が所有するのは検証結果（エラーとキーごとの判定）と送信済みフラグのみ。
#[derive(Debug)]
pub struct FormMail<'a> {
    config:       &'a MailConfig,
    data:         &'a FormData,
    request_host: String,
    errors:       ValidationErrors,
    validity:     HashMap<ConfigKey, bool>,
    sent:         bool,
}

impl<'a> FormMail<'a> {
    /// 新しいインスタンスを作成する
    ///
    /// `request_host` は既定の件名（`Form Mail from <host>`）に使う。
    pub fn new(config: &'a MailConfig, data: &'a FormData, request_host: impl Into<String>) -> Self {
        Self {
            config,
            data,
            request_host: request_host.into(),
            errors: ValidationErrors::new(),
            validity: HashMap::new(),
            sent: false,
        }
    }

    pub fn config(&self) -> &'a MailConfig {
        self.config
    }

    pub fn data(&self) -> &'a FormData {
        self.data
    }

    /// 記録されたエラー
    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// 直近の送信がすべて完了したか
    pub fn is_sent(&self) -> bool {
        self.sent
    }

    /// 送信完了を記録する
    pub fn mark_sent(&mut self) {
        self.sent = true;
    }

    /// 送信失敗を `base` エラーとして記録する
    pub fn record_send_failure(&mut self, message: impl Into<String>) {
        self.errors.add(ErrorKey::Base, message);
        self.sent = false;
    }

    // ===== 検証 =====

    /// 設定キーのメールが送信可能かを検証する
    ///
    /// 結果はキーごとにメモ化される。
    pub fn is_valid(&mut self, config_key: &str) -> bool {
        if let Some(valid) = self.validity.get(config_key) {
            return *valid;
        }

        let valid = self.evaluate(config_key);
        self.validity.insert(ConfigKey::new(config_key), valid);
        valid
    }

    /// すべての設定キーを設定順に検証し、最初に不正と判定されたキーを返す
    ///
    /// 不正なキーが見つかった時点で打ち切り、以降のキーは検証しない。
    pub fn first_invalid_key(&mut self) -> Option<&'a ConfigKey> {
        let config = self.config;
        config.keys().find(|key| !self.is_valid(key.as_str()))
    }

    /// すべての設定キーが送信可能か
    pub fn validate_all(&mut self) -> bool {
        self.first_invalid_key().is_none()
    }

    fn evaluate(&mut self, config_key: &str) -> bool {
        let Some(settings) = self.settings(config_key) else {
            self.errors.add(
                ErrorKey::Form,
                format!("Unknown mail configuration: {config_key}"),
            );
            return false;
        };

        let mut valid = true;

        let recipients = self.recipients(config_key);
        if recipients.is_empty() && !self.is_required_field(settings.recipients_field.as_deref())
        {
            self.errors.add(ErrorKey::Form, RECIPIENTS_REQUIRED);
            valid = false;
        }
        if recipients.iter().any(|r| !looks_like_email(r)) {
            self.errors.add(ErrorKey::Form, RECIPIENTS_INVALID);
            valid = false;
        }

        let from = self.from(config_key);
        if is_blank(from) && !self.is_required_field(settings.from_field.as_deref()) {
            self.errors.add(ErrorKey::Form, FROM_REQUIRED);
            valid = false;
        }
        if !looks_like_email(from) {
            self.errors.add(ErrorKey::Form, FROM_INVALID);
            valid = false;
        }

        let data = self.data;
        for rule in data.required().iter() {
            if data.get_non_blank(&rule.name).is_none() {
                self.errors
                    .add(ErrorKey::field(rule.name.as_str()), rule.message.text());
                valid = false;
            }
        }

        valid
    }

    /// フィールド名が必須ルールで検証済みか
    ///
    /// 宛先・送信元の読み取り元フィールドが必須ルールに含まれる場合、
    /// 「Recipients/From are required.」ではなく必須ルール側のメッセージで報告する。
    fn is_required_field(&self, field_name: Option<&str>) -> bool {
        field_name.is_some_and(|name| self.data.required().contains(name))
    }

    fn settings(&self, config_key: &str) -> Option<&'a MailSettings> {
        self.config.get(config_key)
    }

    fn field_value(&self, field_name: Option<&str>) -> Option<&'a str> {
        let data = self.data;
        non_blank(field_name).and_then(|name| data.get_non_blank(name))
    }

    // ===== 解決 =====

    /// 送信元アドレス（未解決なら空文字列）
    pub fn from(&self, config_key: &str) -> &'a str {
        let Some(settings) = self.settings(config_key) else {
            return "";
        };
        non_blank(settings.from.as_deref())
            .or_else(|| self.field_value(settings.from_field.as_deref()))
            .unwrap_or("")
    }

    /// 宛先アドレス（入力順、重複除去なし）
    pub fn recipients(&self, config_key: &str) -> Vec<String> {
        let Some(settings) = self.settings(config_key) else {
            return Vec::new();
        };
        match &settings.recipients {
            Some(list) => list.clone(),
            None => self
                .field_value(settings.recipients_field.as_deref())
                .map(split_addresses)
                .unwrap_or_default(),
        }
    }

    /// 返信先アドレス
    pub fn reply_to(&self, config_key: &str) -> Option<&'a str> {
        let settings = self.settings(config_key)?;
        non_blank(settings.reply_to.as_deref())
            .or_else(|| self.field_value(settings.reply_to_field.as_deref()))
    }

    /// `Sender` / `Return-Path` に使うアドレス
    pub fn sender(&self, config_key: &str) -> Option<&'a str> {
        non_blank(self.settings(config_key)?.sender.as_deref())
    }

    /// CC（フォームのフィールドが設定より優先、未指定なら空文字列）
    pub fn cc(&self, config_key: &str) -> &'a str {
        let Some(settings) = self.settings(config_key) else {
            return "";
        };
        self.field_value(settings.cc_field.as_deref())
            .or_else(|| non_blank(settings.cc.as_deref()))
            .unwrap_or("")
    }

    /// 件名
    pub fn subject(&self, config_key: &str) -> String {
        self.data
            .subject()
            .or_else(|| non_blank(self.settings(config_key)?.subject.as_deref()))
            .map_or_else(
                || format!("Form Mail from {}", self.request_host),
                str::to_string,
            )
    }

    /// 追加ヘッダ
    ///
    /// `Reply-To` は返信先、なければ送信元。`sender` が設定されていれば
    /// `Return-Path` と `Sender` にも設定する。
    pub fn headers(&self, config_key: &str) -> BTreeMap<String, String> {
        let mut headers = BTreeMap::new();
        let reply_to = self
            .reply_to(config_key)
            .unwrap_or_else(|| self.from(config_key));
        headers.insert(REPLY_TO_HEADER.to_string(), reply_to.to_string());

        if let Some(sender) = self.sender(config_key) {
            headers.insert(RETURN_PATH_HEADER.to_string(), sender.to_string());
            headers.insert(SENDER_HEADER.to_string(), sender.to_string());
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};
    use serde_json::{Value, json};

    use super::*;
    use crate::RequiredFields;

    const HOST: &str = "www.example.com";

    fn config(value: Value) -> MailConfig {
        MailConfig::parse(&value).unwrap()
    }

    fn data(value: Value) -> FormData {
        FormData::from_json(&value).unwrap()
    }

    /// 宛先・送信元をフォームから読む設定
    #[fixture]
    fn field_config() -> MailConfig {
        config(json!({
            "contact": {
                "recipients_field": "to",
                "from_field": "email",
                "reply_to_field": "reply",
                "cc_field": "copy"
            }
        }))
    }

    // ===== 解決 =====

    #[test]
    fn test_recipients_フィールドのカンマ区切りを分割して前後の空白を除く() {
        let config = config(json!({
            "contact": { "recipients_field": "recipients_field_value", "from": "a@b.com" }
        }));
        let data = data(json!({ "recipients_field_value": "a@b.com, c@d.com" }));
        let mail = FormMail::new(&config, &data, HOST);

        assert_eq!(mail.recipients("contact"), vec!["a@b.com", "c@d.com"]);
    }

    #[test]
    fn test_recipients_リテラル指定がフィールドより優先される() {
        let config = config(json!({
            "contact": {
                "recipients": ["info@example.com"],
                "recipients_field": "to",
                "from": "a@b.com"
            }
        }));
        let data = data(json!({ "to": "other@example.com" }));
        let mail = FormMail::new(&config, &data, HOST);

        assert_eq!(mail.recipients("contact"), vec!["info@example.com"]);
    }

    #[rstest]
    #[case(json!([]))]
    #[case(json!(""))]
    fn test_recipients_空のリテラル指定はフィールドにフォールバックしない(
        #[case] recipients: Value,
    ) {
        let config = config(json!({
            "contact": { "recipients": recipients, "recipients_field": "to", "from": "a@b.com" }
        }));
        let data = data(json!({ "to": "other@example.com" }));
        let mut mail = FormMail::new(&config, &data, HOST);

        assert!(mail.recipients("contact").is_empty());
        assert!(!mail.is_valid("contact"));
        assert_eq!(mail.errors().get("form"), Some(RECIPIENTS_REQUIRED));
    }

    #[rstest]
    fn test_recipients_フィールドがなければ空(field_config: MailConfig) {
        let data = data(json!({}));
        let mail = FormMail::new(&field_config, &data, HOST);

        assert!(mail.recipients("contact").is_empty());
    }

    #[test]
    fn test_from_空白のリテラルはフィールドにフォールバックする() {
        let config = config(json!({
            "contact": { "recipients": ["a@b.com"], "from": " ", "from_field": "email" }
        }));
        let data = data(json!({ "email": "visitor@example.net" }));
        let mail = FormMail::new(&config, &data, HOST);

        assert_eq!(mail.from("contact"), "visitor@example.net");
    }

    #[rstest]
    fn test_cc_フィールドが設定より優先される() {
        let config = config(json!({
            "contact": {
                "recipients": ["a@b.com"],
                "from": "a@b.com",
                "cc": "team@example.com",
                "cc_field": "copy"
            }
        }));
        let with_field = data(json!({ "copy": "me@example.net" }));
        let without_field = data(json!({}));

        assert_eq!(
            FormMail::new(&config, &with_field, HOST).cc("contact"),
            "me@example.net"
        );
        assert_eq!(
            FormMail::new(&config, &without_field, HOST).cc("contact"),
            "team@example.com"
        );
    }

    #[rstest]
    fn test_cc_指定がなければ空文字列(field_config: MailConfig) {
        let data = data(json!({}));

        assert_eq!(FormMail::new(&field_config, &data, HOST).cc("contact"), "");
    }

    #[test]
    fn test_subject_フォーム_設定_既定の順に解決する() {
        let config = config(json!({
            "with_subject": { "recipients": ["a@b.com"], "from": "a@b.com", "subject": "Inquiry" },
            "without_subject": { "recipients": ["a@b.com"], "from": "a@b.com" }
        }));
        let submitted = data(json!({ "subject": "Hello" }));
        let empty = data(json!({}));

        assert_eq!(
            FormMail::new(&config, &submitted, HOST).subject("with_subject"),
            "Hello"
        );
        assert_eq!(
            FormMail::new(&config, &empty, HOST).subject("with_subject"),
            "Inquiry"
        );
        assert_eq!(
            FormMail::new(&config, &empty, HOST).subject("without_subject"),
            "Form Mail from www.example.com"
        );
    }

    #[rstest]
    fn test_headers_返信先がなければ送信元を使う(field_config: MailConfig) {
        let data = data(json!({ "to": "a@b.com", "email": "visitor@example.net" }));
        let mail = FormMail::new(&field_config, &data, HOST);

        let headers = mail.headers("contact");

        assert_eq!(
            headers,
            BTreeMap::from([("Reply-To".to_string(), "visitor@example.net".to_string())])
        );
    }

    #[test]
    fn test_headers_senderがあればreturn_pathとsenderを設定する() {
        let config = config(json!({
            "contact": {
                "recipients": ["a@b.com"],
                "from": "noreply@example.com",
                "reply_to": "support@example.com",
                "sender": "bounce@example.com"
            }
        }));
        let data = data(json!({}));
        let mail = FormMail::new(&config, &data, HOST);

        let headers = mail.headers("contact");

        assert_eq!(headers.get("Reply-To").unwrap(), "support@example.com");
        assert_eq!(headers.get("Return-Path").unwrap(), "bounce@example.com");
        assert_eq!(headers.get("Sender").unwrap(), "bounce@example.com");
    }

    // ===== 検証 =====

    #[rstest]
    fn test_is_valid_宛先と送信元が揃っていれば正しい(field_config: MailConfig) {
        let data = data(json!({ "to": "a@b.com, c@d.com", "email": "visitor@example.net" }));
        let mut mail = FormMail::new(&field_config, &data, HOST);

        assert!(mail.is_valid("contact"));
        assert!(mail.errors().is_empty());
    }

    #[rstest]
    fn test_is_valid_宛先がなければformエラー(field_config: MailConfig) {
        let data = data(json!({ "email": "visitor@example.net" }));
        let mut mail = FormMail::new(&field_config, &data, HOST);

        assert!(!mail.is_valid("contact"));
        assert_eq!(mail.errors().get("form"), Some(RECIPIENTS_REQUIRED));
    }

    #[rstest]
    fn test_is_valid_不正な宛先はformエラー(field_config: MailConfig) {
        let data = data(json!({ "to": "a@b.com, nobody", "email": "visitor@example.net" }));
        let mut mail = FormMail::new(&field_config, &data, HOST);

        assert!(!mail.is_valid("contact"));
        assert_eq!(mail.errors().get("form"), Some(RECIPIENTS_INVALID));
    }

    #[rstest]
    fn test_is_valid_空の送信元は必須エラーのみで形式エラーにならない(
        field_config: MailConfig,
    ) {
        let data = data(json!({ "to": "a@b.com" }));
        let mut mail = FormMail::new(&field_config, &data, HOST);

        assert!(!mail.is_valid("contact"));
        assert_eq!(mail.errors().messages("form"), vec![FROM_REQUIRED]);
    }

    #[rstest]
    fn test_is_valid_不正な送信元はformエラー(field_config: MailConfig) {
        let data = data(json!({ "to": "a@b.com", "email": "not-an-address" }));
        let mut mail = FormMail::new(&field_config, &data, HOST);

        assert!(!mail.is_valid("contact"));
        assert_eq!(mail.errors().get("form"), Some(FROM_INVALID));
    }

    #[rstest]
    fn test_is_valid_後のチェックのメッセージが最新になる(field_config: MailConfig) {
        let data = data(json!({}));
        let mut mail = FormMail::new(&field_config, &data, HOST);

        assert!(!mail.is_valid("contact"));
        assert_eq!(mail.errors().get("form"), Some(FROM_REQUIRED));
        assert_eq!(
            mail.errors().messages("form"),
            vec![RECIPIENTS_REQUIRED, FROM_REQUIRED]
        );
    }

    #[rstest]
    fn test_is_valid_読み取り元フィールドが必須ルールにあれば必須ルール側で報告する(
        field_config: MailConfig,
    ) {
        let data = data(json!({
            "required": { "to": "Please enter a recipient", "email": "" }
        }));
        let mut mail = FormMail::new(&field_config, &data, HOST);

        assert!(!mail.is_valid("contact"));
        assert_eq!(mail.errors().get("form"), None);
        assert_eq!(mail.errors().get("to"), Some("Please enter a recipient"));
        assert_eq!(mail.errors().get("email"), Some("is required."));
    }

    #[rstest]
    #[case(json!({ "phone": "" }), "is required.")]
    #[case(json!({ "phone": "true" }), "is required.")]
    #[case(json!({ "phone": "Phone number needed" }), "Phone number needed")]
    fn test_is_valid_必須フィールドが未入力ならフィールドエラー(
        field_config: MailConfig,
        #[case] required: Value,
        #[case] expected: &str,
    ) {
        let data = data(json!({
            "to": "a@b.com",
            "email": "visitor@example.net",
            "phone": "  ",
            "required": required
        }));
        let mut mail = FormMail::new(&field_config, &data, HOST);

        assert!(!mail.is_valid("contact"));
        assert_eq!(mail.errors().get("phone"), Some(expected));
    }

    #[rstest]
    fn test_is_valid_同じキーの再検証ではエラーを重ねない(field_config: MailConfig) {
        let data = data(json!({ "required": { "phone": "" } }));
        let mut mail = FormMail::new(&field_config, &data, HOST);

        assert!(!mail.is_valid("contact"));
        let recorded = mail.errors().len();
        assert!(!mail.is_valid("contact"));

        assert_eq!(mail.errors().len(), recorded);
    }

    #[test]
    fn test_is_valid_キーごとに判定する() {
        let config = config(json!({
            "admin": { "recipients": ["info@example.com"], "from": "noreply@example.com" },
            "auto_reply": { "recipients_field": "email", "from": "noreply@example.com" }
        }));
        let data = data(json!({}));
        let mut mail = FormMail::new(&config, &data, HOST);

        assert!(mail.is_valid("admin"));
        assert!(!mail.is_valid("auto_reply"));
    }

    #[test]
    fn test_is_valid_未知の設定キーは不正() {
        let config = config(json!({
            "admin": { "recipients": ["info@example.com"], "from": "noreply@example.com" }
        }));
        let data = FormData::new([("name", "Taro")], RequiredFields::default());
        let mut mail = FormMail::new(&config, &data, HOST);

        assert!(!mail.is_valid("missing"));
        assert_eq!(
            mail.errors().get("form"),
            Some("Unknown mail configuration: missing")
        );
    }

    #[test]
    fn test_validate_all_最初の不正なキーで打ち切る() {
        let config = config(json!({
            "first": { "recipients_field": "to", "from": "noreply@example.com" },
            "second": { "recipients": ["info@example.com"], "from_field": "email" }
        }));
        let data = data(json!({}));
        let mut mail = FormMail::new(&config, &data, HOST);

        assert!(!mail.validate_all());
        assert_eq!(mail.errors().messages("form"), vec![RECIPIENTS_REQUIRED]);
    }

    #[test]
    fn test_first_invalid_key_最初に不正となったキーを返す() {
        let config = config(json!({
            "admin": { "recipients": ["info@example.com"], "from": "noreply@example.com" },
            "auto_reply": { "recipients_field": "email", "from": "noreply@example.com" }
        }));
        let data = data(json!({}));
        let mut mail = FormMail::new(&config, &data, HOST);

        assert_eq!(
            mail.first_invalid_key().map(ConfigKey::as_str),
            Some("auto_reply")
        );
    }

    // ===== 送信状態 =====

    #[rstest]
    fn test_record_send_failure_baseエラーを記録し未送信にする(
        field_config: MailConfig,
    ) {
        let data = data(json!({}));
        let mut mail = FormMail::new(&field_config, &data, HOST);
        mail.mark_sent();

        mail.record_send_failure("connection refused");

        assert!(!mail.is_sent());
        assert_eq!(mail.errors().get("base"), Some("connection refused"));
    }
}
