//! Redaction of URLs before they reach logs or error messages.
//!
//! Box accepts `access_token` as a query parameter on download endpoints and the OAuth
//! endpoints carry client secrets, so credential values are masked while the rest of the
//! query stays readable.

use url::Url;

const MASK: &str = "***";

/// Query parameters whose values are credentials.
const SECRET_PARAMS: &[&str] = &[
    "access_token",
    "refresh_token",
    "client_secret",
    "code",
    "subject_token",
    "actor_token",
    "token",
];

fn is_secret(name: &str) -> bool {
    SECRET_PARAMS.iter().any(|s| name.eq_ignore_ascii_case(s))
}

/// Strips userinfo and fragment and masks credential query values.
#[must_use]
pub fn redact_url(url: &Url) -> String {
    let mut u = url.clone();
    let _ = u.set_username("");
    let _ = u.set_password(None);
    u.set_fragment(None);

    if u.query().is_some() {
        let pairs: Vec<(String, String)> = u
            .query_pairs()
            .map(|(k, v)| {
                let value = if is_secret(&k) { MASK.to_string() } else { v.into_owned() };
                (k.into_owned(), value)
            })
            .collect();
        if pairs.is_empty() {
            u.set_query(None);
        } else {
            u.query_pairs_mut().clear().extend_pairs(pairs);
        }
    }
    u.to_string()
}

/// reqwest embeds the request URL in its error text.
#[must_use]
pub fn sanitize_reqwest_error(e: &reqwest::Error) -> String {
    let msg = e.to_string();
    match e.url() {
        Some(u) => msg.replace(u.as_str(), &redact_url(u)),
        None => msg,
    }
}
