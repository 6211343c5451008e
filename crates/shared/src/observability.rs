//! # ログ初期化
//!
//! FormMail を組み込むホストアプリケーション向けの tracing subscriber 設定。
//! 設定値の読み込みは呼び出し側（`formmail-service` の `FormMailConfig`）が行い、
//! ここでは読み込んだ値の解釈と subscriber の登録のみを扱う。

/// `RUST_LOG` が未設定の場合のフィルタ
pub const DEFAULT_FILTER: &str = "info,formmail=debug";

/// ログ出力形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// 1 行 1 イベントの JSON（`event.kind` などのドット記法フィールドがフラットなキーになる）
    Json,
    /// 人間が読みやすい形式
    #[default]
    Pretty,
}

impl LogFormat {
    /// 設定値を解釈する
    ///
    /// 未設定なら [`Pretty`](LogFormat::Pretty)。不明な値も `Pretty` にフォールバックし、
    /// subscriber 登録前なので stderr に警告を出す。
    pub fn from_setting(value: Option<&str>) -> Self {
        let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return Self::default();
        };

        match value.to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            "pretty" => Self::Pretty,
            _ => {
                eprintln!("WARNING: unknown LOG_FORMAT={value:?}, falling back to pretty");
                Self::Pretty
            }
        }
    }
}

/// subscriber の設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// 初期化イベントの `service` フィールドに出すサービス名
    pub service_name: String,
    /// ログ出力形式
    pub log_format:   LogFormat,
}

impl TracingConfig {
    pub fn new(service_name: impl Into<String>, log_format: LogFormat) -> Self {
        Self {
            service_name: service_name.into(),
            log_format,
        }
    }
}

/// グローバル subscriber を登録する
///
/// `RUST_LOG` があればそれを、なければ [`DEFAULT_FILTER`] を使う。
/// 登録できた場合は `service` と `log_format` を載せた初期化イベントを出し、`true` を返す。
/// すでに別の subscriber が登録済みなら何もせず `false` を返す。
#[cfg(feature = "observability")]
pub fn init_tracing(config: &TracingConfig) -> bool {
    use tracing_subscriber::{Layer as _, layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_FILTER.into());

    let fmt_layer = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().boxed(),
    };

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(
            service = %config.service_name,
            log_format = ?config.log_format,
            "トレーシングを初期化"
        );
    }
    installed
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Some("json"), LogFormat::Json)]
    #[case(Some(" JSON "), LogFormat::Json)]
    #[case(Some("pretty"), LogFormat::Pretty)]
    #[case(Some("yaml"), LogFormat::Pretty)]
    #[case(Some(""), LogFormat::Pretty)]
    #[case(None, LogFormat::Pretty)]
    fn test_from_setting_設定値からログ形式を決める(
        #[case] value: Option<&str>,
        #[case] expected: LogFormat,
    ) {
        assert_eq!(LogFormat::from_setting(value), expected);
    }

    #[test]
    fn test_newでフィールドが設定される() {
        let config = TracingConfig::new("form-mail", LogFormat::Json);

        assert_eq!(config.service_name, "form-mail");
        assert_eq!(config.log_format, LogFormat::Json);
    }
}
