//! Request id generation.

use rand::rngs::OsRng;
use rand::RngCore;
use std::time::{SystemTime, UNIX_EPOCH};

/// Correlation id for one logical outbound call.
///
/// A random UUID from the OS entropy source when available; otherwise
/// wall-clock millis plus a random suffix.
pub fn generate_request_id() -> String {
    let mut bytes = [0u8; 16];
    match OsRng.try_fill_bytes(&mut bytes) {
        Ok(()) => uuid::Builder::from_random_bytes(bytes)
            .into_uuid()
            .to_string(),
        Err(e) => {
            tracing::debug!(error = %e, "OS entropy unavailable, using fallback request id");
            fallback_request_id()
        }
    }
}

fn fallback_request_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let suffix: String = std::iter::repeat_with(fastrand::alphanumeric)
        .take(9)
        .collect();
    format!("{}-{}", millis, suffix.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_are_uuids_and_unique() {
        let ids: HashSet<String> = (0..100).map(|_| generate_request_id()).collect();
        assert_eq!(ids.len(), 100);
        for id in ids {
            let parsed = uuid::Uuid::parse_str(&id).unwrap();
            assert_eq!(parsed.get_version_num(), 4);
        }
    }

    #[test]
    fn test_fallback_shape() {
        let id = fallback_request_id();
        let (millis, suffix) = id.split_once('-').unwrap();
        assert!(millis.parse::<u128>().is_ok());
        assert_eq!(suffix.len(), 9);
    }
}
