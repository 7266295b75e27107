use concordium_cis2::{TokenAmountU64, TokenIdUnit};
use concordium_std::*;

pub type ContractTokenId = TokenIdUnit;
pub type ContractTokenAmount = TokenAmountU64;
/// Payment amounts are native currency micro units.
pub type MicroPayment = u64;
pub type Percentage = u8;

/// Deterministic identity of a vesting schedule:
/// sha2-256 over the serialized `(beneficiary, index)` pair.
pub type ScheduleId = HashSha2256;

#[derive(Debug, Serialize, SchemaType, Clone, PartialEq, Eq)]
pub enum SaleStatus {
    Pending,
    Active,
    Finalized,
    Cancelled,
}

/// Whitelist bracket defining a default per-wallet allocation cap.
/// The cap counts cumulative payment units invested, not tokens.
#[derive(Debug, Serialize, SchemaType, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub enum AllocationTier {
    None = 0,
    Bronze,
    Silver,
    Gold,
    Platinum,
    Guaranteed,
}

impl AllocationTier {
    pub fn default_cap(&self) -> Amount {
        let micro = match self {
            AllocationTier::None => 0,
            AllocationTier::Bronze => crate::TIER_CAP_BRONZE,
            AllocationTier::Silver => crate::TIER_CAP_SILVER,
            AllocationTier::Gold => crate::TIER_CAP_GOLD,
            AllocationTier::Platinum => crate::TIER_CAP_PLATINUM,
            AllocationTier::Guaranteed => crate::TIER_CAP_GUARANTEED,
        };
        Amount::from_micro_ccd(micro)
    }
}

impl From<u8> for AllocationTier {
    fn from(n: u8) -> Self {
        match n {
            n if n == AllocationTier::Bronze as u8 => AllocationTier::Bronze,
            n if n == AllocationTier::Silver as u8 => AllocationTier::Silver,
            n if n == AllocationTier::Gold as u8 => AllocationTier::Gold,
            n if n == AllocationTier::Platinum as u8 => AllocationTier::Platinum,
            n if n == AllocationTier::Guaranteed as u8 => AllocationTier::Guaranteed,
            _ => AllocationTier::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_caps_are_ordered() {
        let tiers = [
            AllocationTier::None,
            AllocationTier::Bronze,
            AllocationTier::Silver,
            AllocationTier::Gold,
            AllocationTier::Platinum,
            AllocationTier::Guaranteed,
        ];
        for pair in tiers.windows(2) {
            assert!(pair[0].default_cap() < pair[1].default_cap());
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn tier_from_u8_roundtrip() {
        for n in 0u8..=5 {
            let tier = AllocationTier::from(n);
            assert_eq!(tier as u8, n);
        }
        assert_eq!(AllocationTier::from(42), AllocationTier::None);
    }
}
