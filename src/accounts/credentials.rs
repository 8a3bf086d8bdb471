//! Legacy `Basic` credential string handed out at login.
//!
//! The token is `"Basic " + base64("<email>:<password>")` and therefore carries the
//! plaintext password. Clients that can should use the signed `access_token` instead.

use base64ct::{Base64, Encoding};

pub const BASIC_PREFIX: &str = "Basic ";

pub fn basic_token(email: &str, password: &str) -> String {
    let raw = format!("{email}:{password}");
    format!("{BASIC_PREFIX}{}", Base64::encode_string(raw.as_bytes()))
}

/// Splits a `Basic` header value into `(email, password)` at the first colon.
pub fn parse_basic(header: &str) -> Option<(String, String)> {
    let encoded = header
        .strip_prefix(BASIC_PREFIX)
        .or_else(|| header.strip_prefix("basic "))?;
    let decoded = Base64::decode_vec(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (email, password) = decoded.split_once(':')?;
    Some((email.to_string(), password.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_matches_known_encoding() {
        // base64("a@x.com:pw1")
        assert_eq!(basic_token("a@x.com", "pw1"), "Basic YUB4LmNvbTpwdzE=");
    }

    #[test]
    fn token_is_padded() {
        // 10 input bytes -> two padding characters
        assert_eq!(basic_token("ab", "cdefghi"), "Basic YWI6Y2RlZmdoaQ==");
    }

    #[test]
    fn parse_recovers_email_and_password() {
        let token = basic_token("a@x.com", "p:w");
        assert_eq!(
            parse_basic(&token),
            Some(("a@x.com".to_string(), "p:w".to_string()))
        );
    }

    #[test]
    fn parse_rejects_other_schemes_and_garbage() {
        assert_eq!(parse_basic("Bearer abc"), None);
        assert_eq!(parse_basic("Basic !!!"), None);
        // base64("nocolon")
        assert_eq!(parse_basic("Basic bm9jb2xvbg=="), None);
    }
}
