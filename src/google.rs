//! Google sign-in popup flow
//!
//! The login page opens [`authorization_url`] in a popup. Google redirects
//! the popup to the callback route, which turns the redirect into a
//! [`GoogleAuthMessage`] and posts it back to the opener.

use serde::{Deserialize, Serialize};

pub const AUTHORIZATION_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const CALLBACK_PATH: &str = "/auth/google/callback";
pub const SCOPE: &str = "openid profile email";

/// Popup-to-opener message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GoogleAuthMessage {
    #[serde(rename = "GOOGLE_AUTH_SUCCESS")]
    Success { token: String },
    #[serde(rename = "GOOGLE_AUTH_ERROR")]
    Error { error: String },
}

/// URL that asks Google for an ID token delivered in the redirect fragment
pub fn authorization_url(client_id: &str, origin: &str, nonce: &str) -> String {
    let redirect_uri = format!("{}{}", origin.trim_end_matches('/'), CALLBACK_PATH);
    format!(
        "{}?client_id={}&redirect_uri={}&scope={}&response_type=id_token&nonce={}&prompt=select_account",
        AUTHORIZATION_ENDPOINT,
        urlencoding::encode(client_id),
        urlencoding::encode(&redirect_uri),
        urlencoding::encode(SCOPE),
        urlencoding::encode(nonce),
    )
}

/// Interpret the callback URL's fragment and query string.
///
/// Returns `None` when the redirect carries neither a token nor an error.
pub fn parse_callback(fragment: &str, query: &str) -> Option<GoogleAuthMessage> {
    let fragment = params(fragment);
    let query = params(query);
    let lookup = |name: &str| {
        fragment
            .iter()
            .chain(query.iter())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    };

    if let Some(error) = lookup("error") {
        return Some(GoogleAuthMessage::Error { error });
    }
    lookup("id_token")
        .or_else(|| lookup("code"))
        .filter(|token| !token.is_empty())
        .map(|token| GoogleAuthMessage::Success { token })
}

fn params(raw: &str) -> Vec<(String, String)> {
    raw.trim_start_matches(['#', '?'])
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = urlencoding::decode(&value.replace('+', " ")).ok()?.into_owned();
            Some((key.to_string(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_url() {
        let url = authorization_url("abc.apps.googleusercontent.com", "http://localhost:3000/", "n1");
        assert!(url.starts_with(AUTHORIZATION_ENDPOINT));
        assert!(url.contains("response_type=id_token"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fauth%2Fgoogle%2Fcallback"));
        assert!(url.contains("scope=openid%20profile%20email"));
    }

    #[test]
    fn test_parse_fragment_token() {
        let message = parse_callback("#state=x&id_token=eyJ.abc.def", "");
        assert_eq!(
            message,
            Some(GoogleAuthMessage::Success {
                token: "eyJ.abc.def".into()
            })
        );
    }

    #[test]
    fn test_parse_error_wins() {
        let message = parse_callback("", "?error=access_denied&code=zzz");
        assert_eq!(
            message,
            Some(GoogleAuthMessage::Error {
                error: "access_denied".into()
            })
        );
        assert_eq!(parse_callback("", ""), None);
    }

    #[test]
    fn test_message_wire_shape() {
        let json = serde_json::to_value(GoogleAuthMessage::Success { token: "t".into() }).unwrap();
        assert_eq!(json["type"], "GOOGLE_AUTH_SUCCESS");
        assert_eq!(json["token"], "t");
    }
}
