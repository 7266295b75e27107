//! Whitelist with tier-based allocation caps.
//!
//! Each listed investor carries a tier whose default cap bounds their
//! cumulative investment. A custom cap, when set, replaces the tier
//! default entirely. Unlisted investors (and listed ones at tier `None`)
//! may not invest at all.

use concordium_std::*;
use launch_utils::{
    error::{ContractError, ContractResult, CustomContractError},
    types::AllocationTier,
};

#[derive(Debug, Serialize, SchemaType, Clone)]
pub struct WhitelistEntry {
    pub tier: AllocationTier,
    /// Overrides the tier default when present.
    pub custom_allocation: Option<Amount>,
}

#[derive(Serial, DeserialWithState, StateClone, Debug)]
#[concordium(state_parameter = "S")]
pub struct AllocationPolicy<S: HasStateApi> {
    entries: StateMap<AccountAddress, WhitelistEntry, S>,
}

impl<S: HasStateApi> AllocationPolicy<S> {
    pub fn new(state_builder: &mut StateBuilder<S>) -> Self {
        AllocationPolicy {
            entries: state_builder.new_map(),
        }
    }

    /// Register or re-tier an investor. A custom allocation set earlier
    /// survives re-tiering.
    pub fn add(&mut self, investor: &AccountAddress, tier: AllocationTier) {
        let mut entry = self.entries.entry(*investor).or_insert_with(|| WhitelistEntry {
            tier,
            custom_allocation: None,
        });
        entry.tier = tier;
    }

    pub fn set_custom_allocation(
        &mut self,
        investor: &AccountAddress,
        cap: Amount,
    ) -> ContractResult<()> {
        let mut entry = self
            .entries
            .get_mut(investor)
            .ok_or_else(|| ContractError::from(CustomContractError::NotWhitelisted))?;
        entry.custom_allocation = Some(cap);
        Ok(())
    }

    pub fn is_whitelisted(&self, investor: &AccountAddress) -> bool {
        self.entries
            .get(investor)
            .map(|entry| entry.tier != AllocationTier::None)
            .unwrap_or(false)
    }

    pub fn tier_of(&self, investor: &AccountAddress) -> AllocationTier {
        self.entries
            .get(investor)
            .map(|entry| entry.tier)
            .unwrap_or(AllocationTier::None)
    }

    /// Cumulative payment cap for this investor.
    pub fn allocation_cap(&self, investor: &AccountAddress) -> Amount {
        match self.entries.get(investor) {
            Some(entry) => entry
                .custom_allocation
                .unwrap_or_else(|| entry.tier.default_cap()),
            None => Amount::zero(),
        }
    }

    pub fn entry_of(&self, investor: &AccountAddress) -> Option<WhitelistEntry> {
        self.entries.get(investor).map(|entry| entry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concordium_std::test_infrastructure::*;

    const ALICE: AccountAddress = AccountAddress([1u8; 32]);
    const BOB: AccountAddress = AccountAddress([2u8; 32]);

    fn policy() -> AllocationPolicy<TestStateApi> {
        let mut state_builder = TestStateBuilder::new();
        AllocationPolicy::new(&mut state_builder)
    }

    #[test]
    fn unlisted_investors_have_no_cap() {
        let policy = policy();
        assert!(!policy.is_whitelisted(&ALICE));
        assert_eq!(policy.allocation_cap(&ALICE), Amount::zero());
        assert_eq!(policy.tier_of(&ALICE), AllocationTier::None);
    }

    #[test]
    fn tier_assignment_and_retiering() {
        let mut policy = policy();
        policy.add(&ALICE, AllocationTier::Bronze);
        assert!(policy.is_whitelisted(&ALICE));
        assert_eq!(
            policy.allocation_cap(&ALICE),
            AllocationTier::Bronze.default_cap()
        );

        policy.add(&ALICE, AllocationTier::Gold);
        assert_eq!(
            policy.allocation_cap(&ALICE),
            AllocationTier::Gold.default_cap()
        );

        // Tier None delists without removing the entry.
        policy.add(&ALICE, AllocationTier::None);
        assert!(!policy.is_whitelisted(&ALICE));
    }

    #[test]
    fn custom_allocation_replaces_tier_default() {
        let mut policy = policy();
        policy.add(&ALICE, AllocationTier::Bronze);
        policy
            .set_custom_allocation(&ALICE, Amount::from_micro_ccd(42))
            .unwrap();
        assert_eq!(policy.allocation_cap(&ALICE), Amount::from_micro_ccd(42));

        // Re-tiering keeps the custom cap.
        policy.add(&ALICE, AllocationTier::Platinum);
        assert_eq!(policy.allocation_cap(&ALICE), Amount::from_micro_ccd(42));
    }

    #[test]
    fn custom_allocation_requires_listing() {
        let mut policy = policy();
        let result = policy.set_custom_allocation(&BOB, Amount::from_micro_ccd(1));
        assert_eq!(
            result.expect_err_report("unlisted investor"),
            CustomContractError::NotWhitelisted.into()
        );
    }
}
