//! Tests for the protocol module
//!
//! These verify frame construction, outcome mapping and call id generation.

#[cfg(test)]
mod tests {
    use super::super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_open_frame_carries_pattern_and_timeout() {
        let frame = Frame::open("greet.greet_with_deadline", Pattern::Unary, Some(5000));
        match frame {
            Frame::Open { method, pattern, timeout_ms, .. } => {
                assert_eq!(method, "greet.greet_with_deadline");
                assert_eq!(pattern, Pattern::Unary);
                assert_eq!(timeout_ms, Some(5000));
            }
            other => panic!("expected open frame, got {:?}", other),
        }
    }

    #[test]
    fn test_ok_outcome_survives_status_frame() {
        let outcome: Outcome = Ok(json!({"sum": 50}));
        let frame = Frame::from_outcome(&outcome);
        assert_eq!(frame.into_outcome(), Some(outcome));
    }

    #[test]
    fn test_error_outcome_keeps_code() {
        let outcome: Outcome = Err(Status::invalid_argument("received a negative number: -25"));
        let frame = Frame::from_outcome(&outcome);
        let back = frame.into_outcome().unwrap();
        let status = back.unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
        assert_eq!(status.message(), "received a negative number: -25");
    }

    #[test]
    fn test_status_frame_without_value_is_null() {
        let frame = Frame::Status { code: 0, message: String::new(), value: None };
        assert_eq!(frame.into_outcome(), Some(Ok(serde_json::Value::Null)));
    }

    #[test]
    fn test_non_status_frame_has_no_outcome() {
        assert_eq!(Frame::CloseSend.into_outcome(), None);
        assert_eq!(Frame::message(json!(1)).into_outcome(), None);
    }

    #[test]
    fn test_frame_json_is_tagged() {
        let value = serde_json::to_value(Frame::CloseSend).unwrap();
        assert_eq!(value, json!({"type": "close_send"}));

        let value = serde_json::to_value(Frame::message(json!({"number": 3}))).unwrap();
        assert_eq!(value, json!({"type": "message", "payload": {"number": 3}}));
    }

    #[test]
    fn test_call_id_uniqueness_under_stress() {
        use std::sync::{Arc, Mutex};
        use std::thread;

        let ids = Arc::new(Mutex::new(HashSet::new()));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ids = Arc::clone(&ids);
                thread::spawn(move || {
                    for _ in 0..500 {
                        let id = frame::generate_call_id();
                        assert!(ids.lock().unwrap().insert(id), "duplicate call id {}", id);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(ids.lock().unwrap().len(), 4000);
    }
}
