// Concrete batch-fetch instantiations against the games API. Each signal
// owns its endpoint shape, cache file name, and failure policy.

pub mod favorites;
pub mod paid_access;
pub mod votes;

use crate::domain::model::SubjectId;

/// Multi-ID endpoints take a comma-joined id list as a query parameter.
pub fn join_ids(ids: &[SubjectId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_ids() {
        assert_eq!(join_ids(&[10, 20, 30]), "10,20,30");
        assert_eq!(join_ids(&[7]), "7");
        assert_eq!(join_ids(&[]), "");
    }
}
