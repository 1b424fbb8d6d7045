use crate::domain::model::{EnrichedSubject, PaidAccessInfo, SubjectSeed, VoteCounts};

/// Cheap paid-access signals, in trust order: the seed's boolean if present,
/// else inferred from a known price being greater than zero. `None` means
/// the expensive lookup is still needed.
pub fn cheap_paid_access(seed: &SubjectSeed) -> Option<bool> {
    seed.is_paid_access.or_else(|| seed.price.map(|p| p > 0))
}

/// Whether the secondary lookup is required for this subject. The cascade
/// short-circuits: subjects resolved by cheap signals never reach the
/// expensive source.
pub fn needs_paid_lookup(seed: &SubjectSeed) -> bool {
    cheap_paid_access(seed).is_none()
}

/// Combines the per-signal values for one subject into the final record.
/// Fields no source could determine stay `None`; they are never defaulted
/// to zero/false.
pub fn merge_subject(
    seed: &SubjectSeed,
    votes: Option<VoteCounts>,
    favorites: Option<u64>,
    favorites_degraded: bool,
    secondary: Option<PaidAccessInfo>,
) -> EnrichedSubject {
    let is_paid_access = cheap_paid_access(seed).or_else(|| {
        secondary.and_then(|info| info.is_paid_access.or_else(|| info.price.map(|p| p > 0)))
    });
    let price = seed.price.or_else(|| secondary.and_then(|info| info.price));

    EnrichedSubject {
        id: seed.id,
        up_votes: votes.map(|v| v.up_votes),
        down_votes: votes.map(|v| v.down_votes),
        favorites,
        favorites_degraded,
        is_paid_access,
        price,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(id: u64, is_paid: Option<bool>, price: Option<i64>) -> SubjectSeed {
        SubjectSeed {
            id,
            is_paid_access: is_paid,
            price,
        }
    }

    #[test]
    fn test_trusted_boolean_wins() {
        // An explicit false is trusted even with a positive price present.
        let s = seed(1, Some(false), Some(99));
        assert_eq!(cheap_paid_access(&s), Some(false));
        assert!(!needs_paid_lookup(&s));
    }

    #[test]
    fn test_price_inference() {
        assert_eq!(cheap_paid_access(&seed(1, None, Some(25))), Some(true));
        assert_eq!(cheap_paid_access(&seed(1, None, Some(0))), Some(false));
    }

    #[test]
    fn test_unknown_requires_lookup() {
        let s = seed(1, None, None);
        assert_eq!(cheap_paid_access(&s), None);
        assert!(needs_paid_lookup(&s));
    }

    #[test]
    fn test_merge_uses_secondary_only_when_cheap_unknown() {
        let secondary = PaidAccessInfo {
            is_paid_access: Some(true),
            price: Some(50),
        };

        // Cheap signal resolved: secondary boolean is ignored.
        let resolved = merge_subject(&seed(1, Some(false), None), None, None, false, Some(secondary));
        assert_eq!(resolved.is_paid_access, Some(false));

        // Cheap signal unknown: secondary fills it in.
        let filled = merge_subject(&seed(2, None, None), None, None, false, Some(secondary));
        assert_eq!(filled.is_paid_access, Some(true));
        assert_eq!(filled.price, Some(50));
    }

    #[test]
    fn test_merge_keeps_unknowns_as_none() {
        let record = merge_subject(&seed(3, None, None), None, None, false, None);
        assert_eq!(record.up_votes, None);
        assert_eq!(record.favorites, None);
        assert_eq!(record.is_paid_access, None);
        assert_eq!(record.price, None);
        assert!(!record.favorites_degraded);
    }

    #[test]
    fn test_merge_carries_votes_and_favorites() {
        let record = merge_subject(
            &seed(4, None, Some(10)),
            Some(VoteCounts {
                up_votes: 100,
                down_votes: 7,
            }),
            Some(42),
            true,
            None,
        );
        assert_eq!(record.up_votes, Some(100));
        assert_eq!(record.down_votes, Some(7));
        assert_eq!(record.favorites, Some(42));
        assert!(record.favorites_degraded);
        assert_eq!(record.is_paid_access, Some(true));
    }
}
