//! Domain logic for client-side operations.
//!
//! This module contains pure functions that implement business logic
//! without side effects, making them easy to test.

use std::time::Duration;

use crate::error::ValidationError;

/// Minimum number of characters in a username
pub const MIN_USERNAME_LEN: usize = 2;

/// Longest message body the server accepts
pub const MAX_CONTENT_LENGTH: usize = 1000;

/// Validate the setup form before joining a room.
///
/// Both fields are trimmed first. Length is counted in characters, so a
/// two-syllable Hangul name is accepted.
///
/// # Errors
///
/// * `ValidationError::MissingField` - either field is empty
/// * `ValidationError::UsernameTooShort` - username has fewer than 2 characters
pub fn validate(username: &str, room_id: &str) -> Result<(), ValidationError> {
    let username = username.trim();
    let room_id = room_id.trim();

    if username.is_empty() || room_id.is_empty() {
        return Err(ValidationError::MissingField);
    }

    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(ValidationError::UsernameTooShort {
            min: MIN_USERNAME_LEN,
        });
    }

    Ok(())
}

/// Boolean form of [`validate`]
pub fn is_valid(username: &str, room_id: &str) -> bool {
    validate(username, room_id).is_ok()
}

/// Reconnection policy.
///
/// The default reproduces the fixed 5 second interval with no cap and no
/// backoff. Set `max_attempts` to bound it.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Delay before the first retry
    pub interval: Duration,
    /// Give up after this many consecutive failures (`None` = never)
    pub max_attempts: Option<u32>,
    /// Factor applied to the delay after each failure (1.0 = fixed interval)
    pub backoff_multiplier: f64,
    /// Upper bound for the delay once backoff kicks in
    pub max_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: None,
            backoff_multiplier: 1.0,
            max_interval: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Check if the client should attempt to reconnect.
    ///
    /// # Arguments
    ///
    /// * `failures` - Number of consecutive failed attempts so far (1 after the first failure)
    pub fn should_attempt_reconnect(&self, failures: u32) -> bool {
        match self.max_attempts {
            Some(max) => failures < max,
            None => true,
        }
    }

    /// Delay to wait after `failures` consecutive failures, or `None` to give up.
    pub fn delay_for(&self, failures: u32) -> Option<Duration> {
        if !self.should_attempt_reconnect(failures) {
            return None;
        }

        let multiplier = self.backoff_multiplier.max(1.0);
        if multiplier == 1.0 {
            return Some(self.interval);
        }

        let exponent = i32::try_from(failures.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.interval.as_secs_f64() * multiplier.powi(exponent);
        let capped = secs.min(self.max_interval.as_secs_f64());
        Some(Duration::from_secs_f64(capped.max(self.interval.as_secs_f64())))
    }

    /// `true` when retries continue forever
    pub fn is_unbounded(&self) -> bool {
        self.max_attempts.is_none()
    }
}

/// Failure count after one more failed attempt. Saturates, since an
/// uncapped policy with no delay can fail indefinitely.
pub fn count_failure(failures: u32) -> u32 {
    failures.saturating_add(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_valid_input() {
        // テスト項目: 2 文字以上の名前とルーム ID は有効と判定される
        // given (前提条件):
        let username = "Alice";
        let room_id = "room1";

        // when (操作):
        let result = validate(username, room_id);

        // then (期待する結果):
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn test_validate_rejects_empty_username() {
        // テスト項目: 空の名前は入力不足として拒否される
        // given (前提条件):
        let username = "";

        // when (操作):
        let result = validate(username, "room1");

        // then (期待する結果):
        assert_eq!(result, Err(ValidationError::MissingField));
    }

    #[test]
    fn test_validate_rejects_whitespace_room_id() {
        // テスト項目: 空白のみのルーム ID は入力不足として拒否される
        // given (前提条件):
        let room_id = "   ";

        // when (操作):
        let result = validate("Alice", room_id);

        // then (期待する結果):
        assert_eq!(result, Err(ValidationError::MissingField));
    }

    #[test]
    fn test_validate_rejects_single_character_username() {
        // テスト項目: 1 文字の名前は短すぎるとして拒否される
        // given (前提条件):
        let username = " A ";

        // when (操作):
        let result = validate(username, "room1");

        // then (期待する結果):
        assert_eq!(
            result,
            Err(ValidationError::UsernameTooShort {
                min: MIN_USERNAME_LEN
            })
        );
    }

    #[test]
    fn test_validate_counts_characters_not_bytes() {
        // テスト項目: マルチバイト文字の名前も文字数で判定される
        // given (前提条件):
        let username = "김민";

        // when (操作):
        let result = is_valid(username, "room1");

        // then (期待する結果):
        assert!(result);
    }

    #[test]
    fn test_is_valid_false_for_all_short_usernames() {
        // テスト項目: 2 文字未満の名前はすべて無効と判定される
        // given (前提条件):
        let usernames = ["", " ", "a", "가", "\t"];

        // when (操作) / then (期待する結果):
        for username in usernames {
            assert!(!is_valid(username, "room1"), "{:?} should be invalid", username);
            assert!(!is_valid(username, ""), "{:?} should be invalid", username);
        }
    }

    #[test]
    fn test_default_policy_retries_forever_at_fixed_interval() {
        // テスト項目: デフォルトのポリシーは 5 秒間隔で無制限に再接続する
        // given (前提条件):
        let policy = RetryPolicy::default();

        // when (操作):
        let first = policy.delay_for(1);
        let much_later = policy.delay_for(10_000);

        // then (期待する結果):
        assert!(policy.is_unbounded());
        assert_eq!(first, Some(Duration::from_secs(5)));
        assert_eq!(much_later, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_capped_policy_gives_up_at_limit() {
        // テスト項目: 上限に達した場合、再接続すべきではないと判定される
        // given (前提条件):
        let policy = RetryPolicy {
            max_attempts: Some(3),
            ..RetryPolicy::default()
        };

        // when (操作):
        let before_limit = policy.delay_for(2);
        let at_limit = policy.delay_for(3);

        // then (期待する結果):
        assert_eq!(before_limit, Some(Duration::from_secs(5)));
        assert_eq!(at_limit, None);
    }

    #[test]
    fn test_backoff_grows_and_is_capped() {
        // テスト項目: バックオフ係数に従って遅延が伸び、上限で頭打ちになる
        // given (前提条件):
        let policy = RetryPolicy {
            interval: Duration::from_secs(1),
            max_attempts: None,
            backoff_multiplier: 2.0,
            max_interval: Duration::from_secs(5),
        };

        // when (操作):
        let delays: Vec<_> = (1..=5).filter_map(|n| policy.delay_for(n)).collect();

        // then (期待する結果):
        assert_eq!(
            delays,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(5),
                Duration::from_secs(5),
            ]
        );
    }

    #[test]
    fn test_count_failure_saturates() {
        // テスト項目: 失敗回数は上限で飽和し、オーバーフローしない
        // given (前提条件):
        let failures = u32::MAX;

        // when (操作):
        let next = count_failure(failures);

        // then (期待する結果):
        assert_eq!(next, u32::MAX);
        assert_eq!(count_failure(0), 1);
    }
}
