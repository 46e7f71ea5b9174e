//! Tool annotations derived from HTTP method semantics.
//!
//! Every Box operation talks to an external system, so `openWorldHint` is always set. The other
//! hints follow RFC 9110: safe methods are read-only, `PUT`/`DELETE` are idempotent but
//! destructive, `POST` is neither.

use reqwest::Method;
use rmcp::model::ToolAnnotations;

#[must_use]
pub fn annotations_for(operation_id: &str, method: &Method) -> ToolAnnotations {
    let (read_only, destructive, idempotent) = match *method {
        Method::GET | Method::HEAD | Method::OPTIONS => (Some(true), Some(false), Some(true)),
        Method::POST => (Some(false), Some(false), Some(false)),
        Method::PUT | Method::DELETE => (Some(false), Some(true), Some(true)),
        // PATCH may or may not be idempotent; do not guess.
        Method::PATCH => (Some(false), Some(true), None),
        _ => (None, None, None),
    };

    ToolAnnotations {
        title: Some(title_for(operation_id)),
        read_only_hint: read_only,
        destructive_hint: destructive,
        idempotent_hint: idempotent,
        open_world_hint: Some(true),
    }
}

/// `get_files_id_versions` -> `Get files id versions`.
fn title_for(operation_id: &str) -> String {
    let words: Vec<&str> = operation_id.split('_').filter(|w| !w.is_empty()).collect();
    let mut title = words.join(" ");
    if let Some(first) = title.get(..1).map(str::to_ascii_uppercase) {
        title.replace_range(..1, &first);
    }
    title
}

#[cfg(test)]
mod tests {
    use super::{annotations_for, title_for};
    use reqwest::Method;

    #[test]
    fn every_method_is_open_world() {
        for m in [
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ] {
            assert_eq!(annotations_for("op", &m).open_world_hint, Some(true));
        }
    }

    #[test]
    fn options_preflight_is_read_only() {
        let a = annotations_for("options_files_content", &Method::OPTIONS);
        assert_eq!(a.read_only_hint, Some(true));
        assert_eq!(a.idempotent_hint, Some(true));
    }

    #[test]
    fn delete_is_destructive_and_idempotent() {
        let a = annotations_for("delete_webhooks_id", &Method::DELETE);
        assert_eq!(a.read_only_hint, Some(false));
        assert_eq!(a.destructive_hint, Some(true));
        assert_eq!(a.idempotent_hint, Some(true));
    }

    #[test]
    fn post_is_not_idempotent() {
        let a = annotations_for("post_folders", &Method::POST);
        assert_eq!(a.idempotent_hint, Some(false));
        assert_eq!(a.destructive_hint, Some(false));
    }

    #[test]
    fn title_is_humanized_operation_id() {
        assert_eq!(title_for("get_files_id_versions"), "Get files id versions");
        assert_eq!(title_for(""), "");
    }
}
