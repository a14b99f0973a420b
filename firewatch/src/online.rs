/// Liveness from the age of the latest timestamp: online iff a reading
/// exists and is at most `window_secs` old. The boundary is inclusive.
/// Evaluated with the wall-clock time of the read, never cached.
pub fn is_online(latest: Option<i64>, now: i64, window_secs: i64) -> bool {
    match latest {
        Some(ts) => now - ts <= window_secs,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_reading_means_offline() {
        assert!(!is_online(None, 1_000, 20));
    }

    #[test]
    fn fresh_reading_is_online() {
        assert!(is_online(Some(995), 1_000, 20));
    }

    #[test]
    fn boundary_is_inclusive() {
        assert!(is_online(Some(980), 1_000, 20));
        assert!(!is_online(Some(979), 1_000, 20));
    }

    #[test]
    fn stale_reading_is_offline() {
        assert!(!is_online(Some(0), 1_000, 20));
    }
}
