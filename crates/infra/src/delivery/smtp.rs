//! SMTP メール送信実装
//!
//! lettre の `AsyncSmtpTransport` を使用してメールを送信する。
//! 開発環境では Mailpit（ローカル SMTP サーバー）に接続する。

use async_trait::async_trait;
use formmail_domain::{
    MailError,
    MailRequest,
    message::{REPLY_TO_HEADER, RETURN_PATH_HEADER, SENDER_HEADER},
};
use lettre::{
    Address,
    AsyncSmtpTransport,
    AsyncTransport,
    Tokio1Executor,
    address::Envelope,
    message::{Mailbox, Message, MultiPart, header::ContentType},
    transport::smtp::authentication::Credentials,
};

use super::MailDeliverer;

/// SMTP 認証情報
#[derive(Debug, Clone)]
pub struct SmtpCredentials {
    pub username: String,
    pub password: String,
}

/// SMTP メール送信
///
/// `lettre::AsyncSmtpTransport<Tokio1Executor>` をラップする。
pub struct SmtpMailDeliverer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailDeliverer {
    /// 新しい SMTP 送信インスタンスを作成
    ///
    /// # 引数
    ///
    /// - `host`: SMTP サーバーのホスト名（例: "localhost"）
    /// - `port`: SMTP サーバーのポート番号（例: 1025 for Mailpit）
    /// - `credentials`: SMTP 認証情報（認証不要なサーバーでは `None`）
    pub fn new(host: &str, port: u16, credentials: Option<SmtpCredentials>) -> Self {
        // builder_dangerous: TLS なしで接続（Mailpit 等のローカル SMTP 向け）
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host).port(port);

        if let Some(SmtpCredentials { username, password }) = credentials {
            builder = builder.credentials(Credentials::new(username, password));
        }

        Self {
            transport: builder.build(),
        }
    }
}

#[async_trait]
impl MailDeliverer for SmtpMailDeliverer {
    async fn deliver(&self, request: &MailRequest) -> Result<(), MailError> {
        let message = build_message(request)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::DeliveryFailed(format!("SMTP 送信失敗: {e}")))?;

        Ok(())
    }
}

fn parse_mailbox(value: &str, label: &str) -> Result<Mailbox, MailError> {
    value
        .trim()
        .parse()
        .map_err(|e| MailError::DeliveryFailed(format!("{label}アドレス不正 ({value}): {e}")))
}

/// 送信リクエストを lettre のメッセージに変換する
///
/// - `Reply-To` / `Sender` はそれぞれ対応するヘッダに設定する
/// - `Return-Path` は SMTP エンベロープの送信者として使う
/// - HTML 本文があれば multipart/alternative、なければ text/plain
fn build_message(request: &MailRequest) -> Result<Message, MailError> {
    let mut builder = Message::builder()
        .from(parse_mailbox(&request.from, "送信元")?)
        .subject(&request.subject);

    let mut envelope_to: Vec<Address> = Vec::new();
    for recipient in &request.recipients {
        let mailbox = parse_mailbox(recipient, "宛先")?;
        envelope_to.push(mailbox.email.clone());
        builder = builder.to(mailbox);
    }

    for cc in request.cc.split(',').filter(|cc| !cc.trim().is_empty()) {
        let mailbox = parse_mailbox(cc, "CC ")?;
        envelope_to.push(mailbox.email.clone());
        builder = builder.cc(mailbox);
    }

    if let Some(reply_to) = request.header(REPLY_TO_HEADER).filter(|v| !v.trim().is_empty()) {
        builder = builder.reply_to(parse_mailbox(reply_to, "返信先")?);
    }

    if let Some(sender) = request.header(SENDER_HEADER) {
        builder = builder.sender(parse_mailbox(sender, "Sender ")?);
    }

    if let Some(return_path) = request.header(RETURN_PATH_HEADER) {
        let address = parse_mailbox(return_path, "Return-Path ")?.email;
        let envelope = Envelope::new(Some(address), envelope_to)
            .map_err(|e| MailError::DeliveryFailed(format!("エンベロープ構築失敗: {e}")))?;
        builder = builder.envelope(envelope);
    }

    for name in request.headers.keys().filter(|name| {
        ![REPLY_TO_HEADER, SENDER_HEADER, RETURN_PATH_HEADER].contains(&name.as_str())
    }) {
        tracing::warn!(header = %name, "SMTP: 未対応のヘッダを無視");
    }

    let message = match &request.html_body {
        Some(html_body) => builder.multipart(MultiPart::alternative_plain_html(
            request.plain_body.clone(),
            html_body.clone(),
        )),
        None => builder
            .header(ContentType::TEXT_PLAIN)
            .body(request.plain_body.clone()),
    };

    message.map_err(|e| MailError::DeliveryFailed(format!("メッセージ構築失敗: {e}")))
}
