//! Inspection of image-generation provider responses.
//!
//! Providers wrap their answers differently (`{output: ...}`, `{data: {...}}`,
//! bare arrays of URLs). These helpers search a fixed list of known shapes in
//! priority order, recursing into `data` when the top level has no match.

use serde_json::Value;

/// Field names tried, in order, when looking for a task identifier.
pub const TASK_ID_FIELDS: &[&str] = &["id", "task_id", "request_id", "job_id"];

/// Field paths tried, in order, when looking for an explicit poll URL.
const POLL_URL_PATHS: &[&[&str]] = &[&["urls", "get"], &["polling_url"], &["status_url"]];

/// Maximum depth followed through nested `data` wrappers.
const MAX_DATA_DEPTH: usize = 4;

/// Outcome carried by one status response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    /// The provider reports success.
    Completed,
    /// The provider reports failure or cancellation; carries its message.
    Failed(Option<String>),
    /// Anything else: keep polling.
    Pending(Option<String>),
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn at_path<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(key))
}

fn first(value: Option<&Value>) -> Option<&Value> {
    value.and_then(Value::as_array).and_then(|items| items.first())
}

/// Find the result URL in a provider response.
///
/// Priority: `outputs[0]`, `output[0]`, `output.url`, `output` (string),
/// `images[0]`, `images[0].url`, `url`; then the same search inside `data`.
pub fn extract_result_url(response: &Value) -> Option<String> {
    extract_result_url_at(response, 0)
}

fn extract_result_url_at(response: &Value, depth: usize) -> Option<String> {
    let found = non_empty_str(first(response.get("outputs")))
        .or_else(|| non_empty_str(first(response.get("output"))))
        .or_else(|| non_empty_str(response.get("output").and_then(|o| o.get("url"))))
        .or_else(|| non_empty_str(response.get("output")))
        .or_else(|| non_empty_str(first(response.get("images"))))
        .or_else(|| non_empty_str(first(response.get("images")).and_then(|i| i.get("url"))))
        .or_else(|| non_empty_str(response.get("url")));

    if found.is_some() || depth >= MAX_DATA_DEPTH {
        return found;
    }
    response
        .get("data")
        .filter(|d| d.is_object())
        .and_then(|data| extract_result_url_at(data, depth + 1))
}

/// Find an explicit poll URL (`urls.get`, `polling_url`, `status_url`),
/// also inside `data`.
pub fn extract_poll_url(response: &Value) -> Option<String> {
    let direct = POLL_URL_PATHS
        .iter()
        .find_map(|path| non_empty_str(at_path(response, path)));
    direct.or_else(|| {
        let data = response.get("data")?;
        POLL_URL_PATHS
            .iter()
            .find_map(|path| non_empty_str(at_path(data, path)))
    })
}

/// Find the task identifier under `id`, `task_id`, `request_id`, `job_id`,
/// then `data.id`. Numeric identifiers are rendered as strings.
pub fn extract_task_id(response: &Value) -> Option<String> {
    let as_id = |value: Option<&Value>| match value {
        Some(Value::Number(n)) => Some(n.to_string()),
        other => non_empty_str(other),
    };
    TASK_ID_FIELDS
        .iter()
        .find_map(|field| as_id(response.get(*field)))
        .or_else(|| as_id(response.get("data").and_then(|d| d.get("id"))))
}

fn status_of(response: &Value) -> Option<String> {
    non_empty_str(response.get("status"))
        .or_else(|| non_empty_str(response.get("data").and_then(|d| d.get("status"))))
}

/// Provider-reported error text, if any.
///
/// A bare `message` only counts when the envelope `code` is not 2xx; a
/// successful envelope carries `message: "success"`.
pub fn extract_error_message(response: &Value) -> Option<String> {
    let envelope_ok = is_success_code(response);
    let pick = |v: &Value| {
        non_empty_str(v.get("error"))
            .or_else(|| non_empty_str(v.get("error").and_then(|e| e.get("message"))))
            .or_else(|| {
                (!envelope_ok && !is_success_code(v))
                    .then(|| non_empty_str(v.get("message")))
                    .flatten()
            })
    };
    pick(response).or_else(|| response.get("data").and_then(pick))
}

fn is_success_code(v: &Value) -> bool {
    v.get("code")
        .and_then(Value::as_u64)
        .is_some_and(|code| (200..300).contains(&code))
}

/// Map a status response onto a [`TaskState`].
///
/// `succeeded`, `completed` and `SUCCESS` mean done; `failed`, `canceled`
/// and `FAILURE` mean failed. Comparison ignores case.
pub fn classify(response: &Value) -> TaskState {
    let status = status_of(response);
    match status.as_deref().map(str::to_ascii_lowercase).as_deref() {
        Some("succeeded" | "completed" | "success") => TaskState::Completed,
        Some("failed" | "canceled" | "failure") => {
            TaskState::Failed(extract_error_message(response))
        }
        _ => TaskState::Pending(status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // -- result urls --

    #[test]
    fn output_url_object_resolves() {
        assert_eq!(extract_result_url(&json!({ "output": { "url": "X" } })).as_deref(), Some("X"));
    }

    #[test]
    fn images_url_object_resolves() {
        assert_eq!(extract_result_url(&json!({ "images": [{ "url": "X" }] })).as_deref(), Some("X"));
    }

    #[test]
    fn priority_prefers_outputs_over_url() {
        let response = json!({ "url": "late", "outputs": ["early"], "output": "middle" });
        assert_eq!(extract_result_url(&response).as_deref(), Some("early"));
    }

    #[test]
    fn output_string_and_array_forms() {
        assert_eq!(extract_result_url(&json!({ "output": ["A", "B"] })).as_deref(), Some("A"));
        assert_eq!(extract_result_url(&json!({ "output": "S" })).as_deref(), Some("S"));
        assert_eq!(extract_result_url(&json!({ "images": ["I"] })).as_deref(), Some("I"));
    }

    #[test]
    fn recurses_into_data() {
        let response = json!({ "code": 200, "data": { "id": "t1", "outputs": ["https://cdn/x.png"] } });
        assert_eq!(extract_result_url(&response).as_deref(), Some("https://cdn/x.png"));
    }

    #[test]
    fn no_result_in_pending_response() {
        let response = json!({ "data": { "id": "t1", "status": "created", "outputs": [] } });
        assert_eq!(extract_result_url(&response), None);
    }

    // -- poll targets --

    #[test]
    fn poll_url_from_data_urls_get() {
        let response = json!({ "data": { "id": "t1", "urls": { "get": "https://api/p/t1/result" } } });
        assert_eq!(extract_poll_url(&response).as_deref(), Some("https://api/p/t1/result"));
    }

    #[test]
    fn task_id_field_order() {
        assert_eq!(extract_task_id(&json!({ "task_id": "b", "job_id": "c" })).as_deref(), Some("b"));
        assert_eq!(extract_task_id(&json!({ "request_id": 42 })).as_deref(), Some("42"));
        assert_eq!(extract_task_id(&json!({ "data": { "id": "d" } })).as_deref(), Some("d"));
        assert_eq!(extract_task_id(&json!({ "id": "", "job_id": "j" })).as_deref(), Some("j"));
        assert_eq!(extract_task_id(&json!({})), None);
    }

    // -- status mapping --

    #[test]
    fn classify_success_variants() {
        assert_eq!(classify(&json!({ "status": "succeeded" })), TaskState::Completed);
        assert_eq!(classify(&json!({ "status": "SUCCESS" })), TaskState::Completed);
        assert_eq!(classify(&json!({ "data": { "status": "completed" } })), TaskState::Completed);
    }

    #[test]
    fn classify_failure_carries_message() {
        assert_eq!(
            classify(&json!({ "data": { "status": "failed", "error": "nsfw" } })),
            TaskState::Failed(Some("nsfw".into()))
        );
        assert_eq!(classify(&json!({ "status": "FAILURE" })), TaskState::Failed(None));
        assert_eq!(classify(&json!({ "status": "canceled" })), TaskState::Failed(None));
    }

    #[test]
    fn success_envelope_message_is_not_an_error() {
        let response = json!({ "code": 200, "message": "success", "data": { "status": "created" } });
        assert_eq!(extract_error_message(&response), None);
    }

    #[test]
    fn failed_envelope_message_is_reported() {
        let response = json!({ "code": 400, "message": "invalid prompt" });
        assert_eq!(extract_error_message(&response).as_deref(), Some("invalid prompt"));
        let nested = json!({ "code": 200, "data": { "error": "quota exceeded" } });
        assert_eq!(extract_error_message(&nested).as_deref(), Some("quota exceeded"));
    }

    #[test]
    fn classify_other_statuses_pending() {
        assert_eq!(
            classify(&json!({ "status": "processing" })),
            TaskState::Pending(Some("processing".into()))
        );
        assert_eq!(classify(&json!({})), TaskState::Pending(None));
    }
}
