use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Short-lived bearer credential.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub value: String,
    /// `None` when the server did not announce an expiry
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(value: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    /// Whether the token can still be sent at `now`, keeping `skew` of margin.
    pub fn is_valid_at(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        if self.value.is_empty() {
            return false;
        }
        match self.expires_at {
            Some(expires_at) => now + skew < expires_at,
            None => true,
        }
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Access token plus the refresh token that renews it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenPair {
    pub access: AccessToken,
    pub refresh_token: Option<String>,
}

/// Body of `POST /auth/refresh`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Response of `POST /auth/refresh`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
    /// Present when the server rotates refresh tokens
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds
    #[serde(default)]
    pub expires_in: Option<i64>,
}

impl RefreshResponse {
    /// Lifetimes too large to represent mean no expiry; too negative ones expire at `now`.
    pub fn into_token_pair(self, now: DateTime<Utc>) -> TokenPair {
        let expires_at = self.expires_in.and_then(|secs| {
            match Duration::try_seconds(secs).and_then(|d| now.checked_add_signed(d)) {
                Some(expires_at) => Some(expires_at),
                None if secs > 0 => None,
                None => Some(now),
            }
        });
        TokenPair {
            access: AccessToken::new(self.access_token, expires_at),
            refresh_token: self.refresh_token,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_token_validity() {
        let now = Utc::now();
        let skew = Duration::seconds(30);

        let fresh = AccessToken::new("abc", Some(now + Duration::minutes(10)));
        assert!(fresh.is_valid_at(now, skew));

        let about_to_expire = AccessToken::new("abc", Some(now + Duration::seconds(10)));
        assert!(!about_to_expire.is_valid_at(now, skew));

        let expired = AccessToken::new("abc", Some(now - Duration::seconds(1)));
        assert!(!expired.is_valid_at(now, Duration::zero()));

        let no_expiry = AccessToken::new("abc", None);
        assert!(no_expiry.is_valid_at(now, skew));

        let empty = AccessToken::new("", None);
        assert!(!empty.is_valid_at(now, skew));
    }

    #[test]
    fn test_refresh_response_into_pair() {
        let now = Utc::now();
        let response: RefreshResponse = serde_json::from_str(
            r#"{"access_token":"new-access","refresh_token":"rotated","expires_in":3600}"#,
        )
        .unwrap();
        let pair = response.into_token_pair(now);
        assert_eq!(pair.access.value, "new-access");
        assert_eq!(pair.access.expires_at, Some(now + Duration::seconds(3600)));
        assert_eq!(pair.refresh_token.as_deref(), Some("rotated"));
    }

    #[test]
    fn test_out_of_range_lifetime_does_not_overflow() {
        let now = Utc::now();
        let response: RefreshResponse = serde_json::from_str(&format!(
            r#"{{"access_token":"a","expires_in":{}}}"#,
            i64::MAX
        ))
        .unwrap();
        let pair = response.into_token_pair(now);
        assert_eq!(pair.access.expires_at, None);
        assert!(pair.access.is_valid_at(now, Duration::seconds(30)));

        let response: RefreshResponse = serde_json::from_str(&format!(
            r#"{{"access_token":"a","expires_in":{}}}"#,
            i64::MIN
        ))
        .unwrap();
        let pair = response.into_token_pair(now);
        assert_eq!(pair.access.expires_at, Some(now));
        assert!(!pair.access.is_valid_at(now, Duration::zero()));
    }

    #[test]
    fn test_debug_redacts_token() {
        let token = AccessToken::new("secret-value", None);
        assert!(!format!("{:?}", token).contains("secret-value"));
    }
}
