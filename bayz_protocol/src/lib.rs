// bayz_protocol: wire types for the bayz commit/fetch channel.
//
// This crate defines the JSON payloads exchanged between a live-coding
// session (`bayz_server`) and the browser playback client that polls it. It
// has no dependency on the model crate: a payload is plain note numbers and
// rhythms by the time it gets here.
//
// Module overview:
// - `message.rs`:  `Deployment`, `SoundLine`, and the `FetchResponse` a
//                  poller receives (`{}` when nothing is pending).
//
// Design decisions:
// - **JSON over HTTP.** The client is a browser polling with plain GETs, so
//   the body is a bare JSON object, no framing.
// - **No versioning on the wire.** The client tolerates unknown fields; the
//   payload shape is fixed by the playback side.

pub mod message;

pub use message::{DEFAULT_CYCLE_LENGTH, DEFAULT_INSTRUMENT, Deployment, FetchResponse, SoundLine};

/// Port the playback client polls by default.
pub const DEFAULT_PORT: u16 = 42700;

/// Body sent when nothing is pending.
pub const EMPTY_BODY: &str = "{}";

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn sample_deployment() -> Deployment {
        Deployment::new(
            4.0,
            vec![
                SoundLine::new("sine", vec![60, 64, 67], vec![1]),
                SoundLine::new("square", vec![48], vec![2, 1, 1]),
            ],
        )
    }

    #[test]
    fn deployment_uses_client_field_names() {
        let value = serde_json::to_value(sample_deployment()).unwrap();
        assert_eq!(
            value,
            json!({
                "deploy": true,
                "cycleLength": 4.0,
                "sound": [
                    { "name": "sine", "notes": [60, 64, 67], "rhythm": [1] },
                    { "name": "square", "notes": [48], "rhythm": [2, 1, 1] },
                ],
            })
        );
    }

    #[test]
    fn empty_fetch_is_empty_object() {
        let body = serde_json::to_string(&FetchResponse::Empty {}).unwrap();
        assert_eq!(body, EMPTY_BODY);
    }

    #[test]
    fn pending_fetch_is_bare_deployment() {
        let deployment = sample_deployment();
        let fetched = serde_json::to_value(FetchResponse::from(Some(deployment.clone()))).unwrap();
        assert_eq!(fetched, serde_json::to_value(&deployment).unwrap());
    }

    #[test]
    fn fetch_response_parses_both_shapes() {
        let empty: FetchResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.is_empty());

        let json = serde_json::to_string(&sample_deployment()).unwrap();
        let pending: FetchResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(pending.into_deployment(), Some(sample_deployment()));
    }

    #[test]
    fn deployment_accepts_integer_cycle_length() {
        let parsed: Deployment =
            serde_json::from_value(json!({ "deploy": false, "cycleLength": 2, "sound": [] }))
                .unwrap();
        assert!(!parsed.deploy);
        assert_eq!(parsed.cycle_length, 2.0);
        assert_eq!(serde_json::to_value(&parsed).unwrap()["sound"], Value::Array(vec![]));
    }
}
