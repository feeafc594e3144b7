use serde::{Deserialize, Serialize};

/// Post-merge fork schedule. Ordering is chronological, so activation checks
/// are plain comparisons.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Fork {
    Merge,
    #[default]
    Shanghai,
    Cancun,
    Prague,
}

impl Fork {
    /// PUSH0, withdrawals, EIP-3860 init-code limit.
    pub fn is_shanghai_activated(&self) -> bool {
        *self >= Fork::Shanghai
    }

    /// MCOPY, TLOAD/TSTORE, BLOBHASH/BLOBBASEFEE, blob transactions, EIP-6780.
    pub fn is_cancun_activated(&self) -> bool {
        *self >= Fork::Cancun
    }

    /// EIP-7702 set-code transactions.
    pub fn is_prague_activated(&self) -> bool {
        *self >= Fork::Prague
    }
}

impl std::str::FromStr for Fork {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "merge" | "paris" => Ok(Fork::Merge),
            "shanghai" => Ok(Fork::Shanghai),
            "cancun" => Ok(Fork::Cancun),
            "prague" => Ok(Fork::Prague),
            other => Err(format!("unknown fork: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activation_is_ordered() {
        assert!(Fork::Cancun.is_shanghai_activated());
        assert!(!Fork::Shanghai.is_cancun_activated());
        assert!(Fork::Prague.is_cancun_activated());
    }

    #[test]
    fn default_fork_is_shanghai() {
        assert_eq!(Fork::default(), Fork::Shanghai);
    }
}
