use crate::policy::AllocationPolicy;
use concordium_cis2::TokenAmountU64;
use concordium_std::*;
use launch_utils::{
    error::{ContractError, ContractResult, CustomContractError},
    types::{ContractTokenAmount, Percentage, SaleStatus},
    vesting::VestingLedger,
};

/// Immutable sale parameters, fixed at init.
#[derive(Debug, Serialize, SchemaType, Clone)]
pub struct SaleConfig {
    /// Price of one whole sale token in micro payment units.
    pub token_price: u64,
    /// Sale stops accepting funds at this total.
    pub hard_cap: Amount,
    /// Below this total the sale fails and investors are refunded.
    pub soft_cap: Amount,
    pub min_investment: Amount,
    pub max_investment: Amount,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    /// Percentage of each allocation unlocked at finalization.
    pub tge_percent: Percentage,
    pub cliff_duration: Duration,
    pub vesting_duration: Duration,
    /// Allow finalizing before `end_time` once the hard cap is reached.
    pub early_finalize_on_hardcap: bool,
    /// How long after `end_time` funds stay locked for a failed sale
    /// before the owner may sweep what was never refunded.
    pub emergency_grace: Duration,
}

impl SaleConfig {
    pub fn validate(&self) -> Result<(), CustomContractError> {
        ensure!(self.token_price > 0, CustomContractError::InvalidInput);
        ensure!(
            Amount::zero() < self.soft_cap && self.soft_cap <= self.hard_cap,
            CustomContractError::InvalidInput
        );
        ensure!(
            self.min_investment <= self.max_investment,
            CustomContractError::InvalidInput
        );
        ensure!(
            self.start_time < self.end_time,
            CustomContractError::InvalidSchedule
        );
        ensure!(
            self.tge_percent > 0 && self.tge_percent <= 100,
            CustomContractError::InvalidPercentage
        );
        Ok(())
    }

    /// Whole sale tokens bought by `invested` payment, floored.
    pub fn token_allocation(&self, invested: Amount) -> ContractTokenAmount {
        TokenAmountU64(invested.micro_ccd / self.token_price)
    }
}

/// Per-investor accounting. `invested` only grows while the sale is
/// active; exactly one of claiming or refunding ever applies to it.
#[derive(Debug, Serialize, SchemaType, Clone)]
pub struct InvestorRecord {
    pub invested: Amount,
    /// Tokens bought, fixed at finalization.
    pub token_allocation: ContractTokenAmount,
    /// Tokens already handed out through claims and releases.
    pub claimed: ContractTokenAmount,
    pub refunded: bool,
}

impl InvestorRecord {
    fn new(invested: Amount) -> Self {
        InvestorRecord {
            invested,
            token_allocation: TokenAmountU64(0),
            claimed: TokenAmountU64(0),
            refunded: false,
        }
    }
}

#[derive(Serial, DeserialWithState, StateClone, Debug)]
#[concordium(state_parameter = "S")]
pub struct State<S: HasStateApi> {
    pub status: SaleStatus,
    pub paused: bool,
    /// CIS-2 contract distributing the sale token. Must be set before
    /// anyone can claim.
    pub sale_token: Option<ContractAddress>,
    pub config: SaleConfig,
    pub total_raised: Amount,
    pub investors: StateMap<AccountAddress, InvestorRecord, S>,
    pub policy: AllocationPolicy<S>,
    pub vesting: VestingLedger<S>,
}

impl<S: HasStateApi> State<S> {
    pub fn new(state_builder: &mut StateBuilder<S>, config: SaleConfig) -> Self {
        State {
            status: SaleStatus::Pending,
            paused: false,
            sale_token: None,
            config,
            total_raised: Amount::zero(),
            investors: state_builder.new_map(),
            policy: AllocationPolicy::new(state_builder),
            vesting: VestingLedger::new(state_builder),
        }
    }

    /// A finalized sale that reached its soft cap. Only then do claims
    /// open; otherwise investors refund instead.
    pub fn is_successful(&self) -> bool {
        self.status == SaleStatus::Finalized && self.total_raised >= self.config.soft_cap
    }

    /// Add `amount` to the investor's running total, creating the record
    /// on first investment. Cap checks happen before this is called.
    pub fn record_investment(
        &mut self,
        investor: &AccountAddress,
        amount: Amount,
    ) -> ContractResult<()> {
        let mut record = self
            .investors
            .entry(*investor)
            .or_insert_with(|| InvestorRecord::new(Amount::zero()));
        record.invested = record
            .invested
            .micro_ccd
            .checked_add(amount.micro_ccd)
            .map(Amount::from_micro_ccd)
            .ok_or_else(|| ContractError::from(CustomContractError::OverflowError))?;
        drop(record);

        self.total_raised = self
            .total_raised
            .micro_ccd
            .checked_add(amount.micro_ccd)
            .map(Amount::from_micro_ccd)
            .ok_or_else(|| ContractError::from(CustomContractError::OverflowError))?;
        Ok(())
    }

    /// Cumulative total this investor would reach with `amount` more.
    pub fn cumulative_investment(&self, investor: &AccountAddress, amount: Amount) -> u128 {
        let current = self
            .investors
            .get(investor)
            .map(|record| record.invested.micro_ccd)
            .unwrap_or(0);
        current as u128 + amount.micro_ccd as u128
    }

    /// Payment total the pool would hold with `amount` more.
    pub fn prospective_total(&self, amount: Amount) -> u128 {
        self.total_raised.micro_ccd as u128 + amount.micro_ccd as u128
    }

    /// Token amounts for every investor, floored at the configured price.
    /// Investors whose stake rounds down to zero tokens get no schedule
    /// and keep nothing to claim.
    pub fn allocations(&self) -> Vec<(AccountAddress, ContractTokenAmount)> {
        let mut allocations = Vec::new();
        for (investor, record) in self.investors.iter() {
            let allocation = self.config.token_allocation(record.invested);
            if allocation.0 > 0 {
                allocations.push((*investor, allocation));
            }
        }
        allocations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(price: u64) -> SaleConfig {
        SaleConfig {
            token_price: price,
            hard_cap: Amount::from_micro_ccd(1_000_000),
            soft_cap: Amount::from_micro_ccd(100_000),
            min_investment: Amount::from_micro_ccd(10),
            max_investment: Amount::from_micro_ccd(500_000),
            start_time: Timestamp::from_timestamp_millis(0),
            end_time: Timestamp::from_timestamp_millis(1_000),
            tge_percent: 20,
            cliff_duration: Duration::from_days(30),
            vesting_duration: Duration::from_days(180),
            early_finalize_on_hardcap: false,
            emergency_grace: Duration::from_days(7),
        }
    }

    #[test]
    fn allocation_floors_at_price() {
        let config = config(3);
        assert_eq!(config.token_allocation(Amount::from_micro_ccd(9)).0, 3);
        assert_eq!(config.token_allocation(Amount::from_micro_ccd(10)).0, 3);
        assert_eq!(config.token_allocation(Amount::from_micro_ccd(2)).0, 0);
    }

    #[test]
    fn config_validation() {
        let ok = config(3);
        assert!(ok.validate().is_ok());

        let mut zero_price = config(3);
        zero_price.token_price = 0;
        assert!(zero_price.validate().is_err());

        let mut caps_flipped = config(3);
        caps_flipped.soft_cap = Amount::from_micro_ccd(2_000_000);
        assert!(caps_flipped.validate().is_err());

        let mut window_flipped = config(3);
        window_flipped.end_time = Timestamp::from_timestamp_millis(0);
        assert!(window_flipped.validate().is_err());

        let mut bad_tge = config(3);
        bad_tge.tge_percent = 0;
        assert!(bad_tge.validate().is_err());
    }
}
