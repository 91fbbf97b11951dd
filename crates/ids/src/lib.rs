//! Accession identifier minting.
//!
//! Accession identifiers are opaque, 26-character, lexicographically
//! sortable tokens: a millisecond timestamp prefix followed by random
//! bits, encoded in Crockford base32. Clients must never parse them.
//!
//! Collision checking happens against the owning table (`objects` or
//! `submissions`), so the retry-once-on-collision policy lives with each
//! caller in `crates/metadata-core` rather than here.

use shared::Clock;
use std::sync::Arc;
use ulid::Ulid;

pub struct IdentifierService {
    clock: Arc<dyn Clock>,
}

impl IdentifierService {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        IdentifierService { clock }
    }

    /// Mints a fresh, unchecked accession id. Collision checking against a
    /// particular table is the caller's responsibility.
    pub fn new_accession(&self) -> String {
        let millis = self.clock.now().timestamp_millis().max(0) as u64;
        Ulid::from_parts(millis, rand::random()).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shared::clock::FixedClock;

    #[test]
    fn accession_is_26_characters() {
        let svc = IdentifierService::new(Arc::new(FixedClock(chrono::Utc::now())));
        let id = svc.new_accession();
        assert_eq!(id.len(), 26);
    }

    #[test]
    fn later_timestamps_sort_after_earlier_ones() {
        let early = Arc::new(FixedClock(
            chrono::DateTime::from_timestamp(1_000_000, 0).unwrap(),
        ));
        let late = Arc::new(FixedClock(
            chrono::DateTime::from_timestamp(2_000_000, 0).unwrap(),
        ));
        let a = IdentifierService::new(early).new_accession();
        let b = IdentifierService::new(late).new_accession();
        assert!(a < b);
    }
}
