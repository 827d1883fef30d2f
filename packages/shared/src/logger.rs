//! Logging setup utilities for the DentalChat client.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Crates whose events are enabled at the default level.
const LOGGED_CRATES: [&str; 2] = ["dentalchat_client", "dentalchat_shared"];

/// Build the default filter directive for the given binary and level.
///
/// The binary name is normalized the same way Cargo normalizes crate names
/// (`-` becomes `_`), so `dentalchat-client` and `dentalchat_client` match.
pub fn default_directive(binary_name: &str, default_log_level: &str) -> String {
    let mut directives: Vec<String> = LOGGED_CRATES
        .iter()
        .map(|krate| format!("{}={}", krate, default_log_level))
        .collect();

    let binary = binary_name.replace('-', "_");
    if !LOGGED_CRATES.contains(&binary.as_str()) {
        directives.push(format!("{}={}", binary, default_log_level));
    }

    directives.join(",")
}

/// Initialize the tracing subscriber with the specified default log level.
///
/// The log level can be overridden using the `RUST_LOG` environment variable.
///
/// # Arguments
///
/// * `binary_name` - The name of the binary (e.g., "dentalchat-client")
/// * `default_log_level` - The default log level (e.g., "debug", "info", "warn", "error")
///
/// # Examples
///
/// ```no_run
/// use dentalchat_shared::logger::setup_logger;
///
/// setup_logger("dentalchat-client", "info");
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive(binary_name, default_log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive_includes_library_crates() {
        // テスト項目: ライブラリクレートにデフォルトのログレベルが設定される
        // given (前提条件):
        let binary_name = "chat-tool";

        // when (操作):
        let directive = default_directive(binary_name, "debug");

        // then (期待する結果):
        assert_eq!(
            directive,
            "dentalchat_client=debug,dentalchat_shared=debug,chat_tool=debug"
        );
    }

    #[test]
    fn test_default_directive_does_not_duplicate_client_crate() {
        // テスト項目: バイナリ名がクライアントクレートと同じ場合、重複しない
        // given (前提条件):
        let binary_name = "dentalchat-client";

        // when (操作):
        let directive = default_directive(binary_name, "info");

        // then (期待する結果):
        assert_eq!(directive, "dentalchat_client=info,dentalchat_shared=info");
    }
}
