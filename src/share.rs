//! Share payload codec.
//!
//! A payload is the task list as a JSON array, Base64-encoded with the
//! URL-safe alphabet and no padding, so it can sit in a query string as is.
//! The empty list is the empty payload.
//!
//! Decoding is lenient about the outer encoding (standard alphabet, padding)
//! and about the legacy body produced by older pages: the task objects
//! joined by commas without enclosing brackets.

use std::collections::HashSet;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use tracing::debug;

use crate::error::{Error, Result};
use crate::task::Task;

/// Encode a task list into a share payload.
pub fn encode(tasks: &[Task]) -> Result<String> {
    if tasks.is_empty() {
        return Ok(String::new());
    }
    let json = serde_json::to_string(tasks)?;
    Ok(URL_SAFE_NO_PAD.encode(json.as_bytes()))
}

/// Decode a share payload, preserving element order.
pub fn decode(payload: &str) -> Result<Vec<Task>> {
    let payload = payload.trim();
    if payload.is_empty() {
        return Ok(Vec::new());
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(normalize_alphabet(payload))
        .map_err(|err| Error::MalformedShareData(format!("not base64: {err}")))?;
    let text = String::from_utf8(bytes)
        .map_err(|_| Error::MalformedShareData("payload is not UTF-8 text".to_string()))?;

    let body = text.trim();
    let tasks: Vec<Task> = if body.starts_with('[') {
        serde_json::from_str(body)
    } else {
        serde_json::from_str(&format!("[{body}]"))
    }
    .map_err(|err| Error::MalformedShareData(format!("not a task list: {err}")))?;

    validate(&tasks)?;
    debug!(count = tasks.len(), "share payload decoded");
    Ok(tasks)
}

// Accept the standard alphabet and optional padding alongside URL-safe.
fn normalize_alphabet(payload: &str) -> String {
    payload
        .trim_end_matches('=')
        .chars()
        .map(|ch| match ch {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect()
}

fn validate(tasks: &[Task]) -> Result<()> {
    let mut seen = HashSet::with_capacity(tasks.len());
    for task in tasks {
        if task.id.trim().is_empty() {
            return Err(Error::MalformedShareData(
                "task with an empty id".to_string(),
            ));
        }
        if !task.has_valid_date() {
            return Err(Error::MalformedShareData(format!(
                "task '{}' has an out of range date {}",
                task.id, task.date
            )));
        }
        if !seen.insert(task.id.as_str()) {
            return Err(Error::MalformedShareData(format!(
                "duplicate task id '{}'",
                task.id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;

    fn sample() -> Vec<Task> {
        let mut checked = Task::new("b2", "Walk the dog", 1_676_200_000_500);
        checked.is_checked = true;
        vec![
            Task::new("a1", "Buy milk", 1_676_200_000_000),
            checked,
            Task::new("c3", "Ünïcödé & \"quotes\" / slashes?", 1_676_200_001_000),
        ]
    }

    #[test]
    fn round_trip_preserves_order_and_fields() {
        let tasks = sample();
        let payload = encode(&tasks).unwrap();
        assert_eq!(decode(&payload).unwrap(), tasks);

        let mut reversed = tasks.clone();
        reversed.reverse();
        assert_eq!(decode(&encode(&reversed).unwrap()).unwrap(), reversed);
    }

    #[test]
    fn payload_is_url_safe() {
        let payload = encode(&sample()).unwrap();
        assert!(payload
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'));
    }

    #[test]
    fn empty_list_is_empty_payload() {
        assert_eq!(encode(&[]).unwrap(), "");
        assert!(decode("").unwrap().is_empty());
        assert!(decode("  ").unwrap().is_empty());
        assert!(decode(&URL_SAFE_NO_PAD.encode("[]")).unwrap().is_empty());
    }

    #[test]
    fn legacy_payload_decodes() {
        let body = r#"{"id":"ldz1","text":"One","isChecked":false,"date":1},{"id":"ldz2","text":"Two","isChecked":true,"date":2}"#;
        let payload = STANDARD.encode(body);
        let tasks = decode(&payload).unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[1].id, "ldz2");
        assert!(tasks[1].is_checked);
    }

    #[test]
    fn standard_alphabet_with_padding_decodes() {
        let tasks = sample();
        let json = serde_json::to_string(&tasks).unwrap();
        let payload = STANDARD.encode(json);
        assert_eq!(decode(&payload).unwrap(), tasks);
    }

    #[test]
    fn invalid_base64_is_malformed() {
        assert!(matches!(
            decode("not-valid-base64!!"),
            Err(Error::MalformedShareData(_))
        ));
    }

    #[test]
    fn non_array_json_is_malformed() {
        for body in ["{\"id\":\"x\"}x", "42", "[1,2]", "\"text\"", "[{]"] {
            let payload = URL_SAFE_NO_PAD.encode(body);
            assert!(
                matches!(decode(&payload), Err(Error::MalformedShareData(_))),
                "body {body} should be rejected"
            );
        }
    }

    #[test]
    fn missing_field_is_malformed() {
        let payload = URL_SAFE_NO_PAD.encode(r#"[{"id":"a","text":"A","date":1}]"#);
        assert!(matches!(decode(&payload), Err(Error::MalformedShareData(_))));
    }

    #[test]
    fn duplicate_or_empty_ids_are_malformed() {
        let dup = URL_SAFE_NO_PAD.encode(
            r#"[{"id":"a","text":"A","isChecked":false,"date":1},{"id":"a","text":"B","isChecked":false,"date":2}]"#,
        );
        assert!(matches!(decode(&dup), Err(Error::MalformedShareData(_))));

        let empty = URL_SAFE_NO_PAD.encode(r#"[{"id":"","text":"A","isChecked":false,"date":1}]"#);
        assert!(matches!(decode(&empty), Err(Error::MalformedShareData(_))));
    }

    #[test]
    fn out_of_range_date_is_malformed() {
        let payload = encode(&[Task::new("far", "Far", i64::MAX)]).unwrap();
        assert!(matches!(decode(&payload), Err(Error::MalformedShareData(_))));
    }

    #[test]
    fn non_utf8_is_malformed() {
        let payload = URL_SAFE_NO_PAD.encode([0xff, 0xfe, 0xfd]);
        assert!(matches!(decode(&payload), Err(Error::MalformedShareData(_))));
    }
}
