//! Capped public token sale with vested distribution.
//!
//! Lifecycle: `Pending` (whitelisting) -> `Active` (investments) ->
//! `Finalized` or `Cancelled`. A finalized sale that reached its soft cap
//! seeds one vesting schedule per investor and opens claims; a finalized
//! sale below its soft cap refunds investors instead. A cancelled sale is
//! wound down by the owner through `emergencyWithdraw`.
#[cfg(any(feature = "wasm-test", test))]
mod sctest;

pub mod policy;
pub mod state;
mod view;

use concordium_cis2::TokenAmountU64;
use concordium_std::*;
use launch_utils::{
    error::{ContractError, ContractResult, CustomContractError},
    transfer,
    types::{AllocationTier, SaleStatus, ScheduleId},
    InvestmentEvent, LaunchEvent, RefundedEvent, SaleFinalizedEvent, TokensClaimedEvent,
    TokensReleasedEvent, VestingScheduleCreatedEvent, VestingScheduleRevokedEvent,
};
use state::{SaleConfig, State};

#[cfg(feature = "beneficiary-transfer")]
use launch_utils::BeneficiaryTransferredEvent;

/// The parameter schema for `init` function.
#[derive(Debug, Serialize, SchemaType)]
pub struct InitParams {
    pub config: SaleConfig,
}

/// # Init Function
/// Deploys a sale in `Pending` status. The sale token contract is
/// registered later via `setSaleToken`, before claims open.
#[init(contract = "sale_pool", parameter = "InitParams")]
fn contract_init<S: HasStateApi>(
    ctx: &impl HasInitContext,
    state_builder: &mut StateBuilder<S>,
) -> InitResult<State<S>> {
    let params: InitParams = ctx.parameter_cursor().get()?;
    params.config.validate()?;
    Ok(State::new(state_builder, params.config))
}

// ==============================================
// Administration
// ==========================================

/// Transferable functions (invest, refund, claim, release) cannot be
/// executed while the contract is paused.
///
/// Caller: contract instance owner only
/// Reject if:
/// - The sender is not the contract owner.
#[receive(
    contract = "sale_pool",
    name = "setPaused",
    error = "ContractError",
    mutable
)]
fn contract_set_paused<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
) -> ContractResult<()> {
    ensure!(
        ctx.sender().matches_account(&ctx.owner()),
        ContractError::Unauthorized
    );
    host.state_mut().paused = true;
    Ok(())
}

/// The contract is unpaused.
///
/// Caller: contract instance owner only
/// Reject if:
/// - The sender is not the contract owner.
#[receive(
    contract = "sale_pool",
    name = "setUnpaused",
    error = "ContractError",
    mutable
)]
fn contract_set_unpaused<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
) -> ContractResult<()> {
    ensure!(
        ctx.sender().matches_account(&ctx.owner()),
        ContractError::Unauthorized
    );
    host.state_mut().paused = false;
    Ok(())
}

/// Register the CIS-2 contract that distributes the sale token.
/// Can only be set once.
///
/// Caller: contract instance owner only
/// Reject if:
/// - The sender is not the contract owner.
/// - The sale token was already registered.
/// - Fails to parse parameter.
#[receive(
    contract = "sale_pool",
    name = "setSaleToken",
    parameter = "ContractAddress",
    error = "ContractError",
    mutable
)]
fn contract_set_sale_token<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
) -> ContractResult<()> {
    ensure!(
        ctx.sender().matches_account(&ctx.owner()),
        ContractError::Unauthorized
    );
    let token: ContractAddress = ctx.parameter_cursor().get()?;
    let state = host.state_mut();
    ensure!(
        state.sale_token.is_none(),
        CustomContractError::Inappropriate.into()
    );
    state.sale_token = Some(token);
    Ok(())
}

/// Parameter type for the contract function `whitelisting`.
#[derive(Debug, Serialize, SchemaType)]
pub struct WhitelistingParams {
    pub entries: Vec<AllowedInvestorParams>,
}

#[derive(Debug, Serialize, SchemaType)]
pub struct AllowedInvestorParams {
    pub investor: AccountAddress,
    /// Tier defining the default cumulative investment cap.
    pub tier: AllocationTier,
}

/// Whitelist investors who can participate in the sale. Re-listing an
/// investor updates their tier.
///
/// Caller: contract instance owner only
/// Reject if:
/// - Fails to parse parameter.
/// - The sender is not the contract owner.
/// - Status is not Pending.
#[receive(
    contract = "sale_pool",
    name = "whitelisting",
    parameter = "WhitelistingParams",
    error = "ContractError",
    mutable
)]
fn contract_whitelisting<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
) -> ContractResult<()> {
    ensure!(
        ctx.sender().matches_account(&ctx.owner()),
        ContractError::Unauthorized
    );

    let mut state = host.state_mut();
    ensure_eq!(
        state.status,
        SaleStatus::Pending,
        CustomContractError::SaleNotPending.into()
    );

    let params: WhitelistingParams = ctx.parameter_cursor().get()?;
    for AllowedInvestorParams { investor, tier } in params.entries {
        state.policy.add(&investor, tier);
    }
    Ok(())
}

/// Parameter type for the contract function `setCustomAllocation`.
#[derive(Debug, Serialize, SchemaType)]
pub struct CustomAllocationParams {
    pub investor: AccountAddress,
    /// Replaces the investor's tier default cap.
    pub cap: Amount,
}

/// Give one whitelisted investor an individual cap, overriding their
/// tier default. Allowed until the sale settles.
///
/// Caller: contract instance owner only
/// Reject if:
/// - Fails to parse parameter.
/// - The sender is not the contract owner.
/// - The sale is already finalized or cancelled.
/// - The investor is not whitelisted.
#[receive(
    contract = "sale_pool",
    name = "setCustomAllocation",
    parameter = "CustomAllocationParams",
    error = "ContractError",
    mutable
)]
fn contract_set_custom_allocation<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
) -> ContractResult<()> {
    ensure!(
        ctx.sender().matches_account(&ctx.owner()),
        ContractError::Unauthorized
    );
    let params: CustomAllocationParams = ctx.parameter_cursor().get()?;

    let mut state = host.state_mut();
    ensure!(
        matches!(state.status, SaleStatus::Pending | SaleStatus::Active),
        CustomContractError::Inappropriate.into()
    );
    state.policy.set_custom_allocation(&params.investor, params.cap)
}

// ==============================================
// Lifecycle
// ==========================================

/// Open the sale for investments.
///
/// Caller: contract instance owner only
/// Reject if:
/// - The sender is not the contract owner.
/// - Status is not Pending.
#[receive(
    contract = "sale_pool",
    name = "activateSale",
    error = "ContractError",
    mutable
)]
fn contract_activate_sale<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
) -> ContractResult<()> {
    ensure!(
        ctx.sender().matches_account(&ctx.owner()),
        ContractError::Unauthorized
    );
    let state = host.state_mut();
    ensure_eq!(
        state.status,
        SaleStatus::Pending,
        CustomContractError::SaleNotPending.into()
    );
    state.status = SaleStatus::Active;
    Ok(())
}

/// Settle the sale. On success (soft cap reached) every investor gets a
/// non-revocable vesting schedule starting now; otherwise refunds open.
///
/// Caller: contract instance owner only
/// Reject if:
/// - The sender is not the contract owner.
/// - Status is not Active.
/// - The sale window has not closed, unless early finalization on a full
///   hard cap is configured and the hard cap was reached.
#[receive(
    contract = "sale_pool",
    name = "finalize",
    error = "ContractError",
    mutable,
    enable_logger,
    crypto_primitives
)]
fn contract_finalize<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
    logger: &mut impl HasLogger,
    crypto_primitives: &impl HasCryptoPrimitives,
) -> ContractResult<()> {
    ensure!(
        ctx.sender().matches_account(&ctx.owner()),
        ContractError::Unauthorized
    );
    let now = ctx.metadata().slot_time();
    let state = host.state_mut();

    match state.status {
        SaleStatus::Active => (),
        SaleStatus::Pending => bail!(CustomContractError::SaleNotActive.into()),
        _ => bail!(CustomContractError::AlreadyFinalized.into()),
    }

    let hard_cap_reached = state.total_raised >= state.config.hard_cap;
    ensure!(
        now > state.config.end_time
            || (state.config.early_finalize_on_hardcap && hard_cap_reached),
        CustomContractError::SaleNotEnded.into()
    );

    state.status = SaleStatus::Finalized;
    let success = state.total_raised >= state.config.soft_cap;

    if success {
        let config = state.config.clone();
        for (investor, allocation) in state.allocations() {
            let schedule_id = state.vesting.create_schedule(
                crypto_primitives,
                investor,
                allocation,
                config.tge_percent,
                now,
                config.cliff_duration,
                config.vesting_duration,
                false,
            )?;
            let mut record = state
                .investors
                .get_mut(&investor)
                .ok_or_else(|| ContractError::from(CustomContractError::NoInvestment))?;
            record.token_allocation = allocation;
            drop(record);

            logger.log(&LaunchEvent::ScheduleCreated(VestingScheduleCreatedEvent {
                schedule_id,
                beneficiary: investor,
                total_amount: allocation,
            }))?;
        }
    }

    logger.log(&LaunchEvent::SaleFinalized(SaleFinalizedEvent {
        total_raised: state.total_raised,
        success,
    }))?;
    Ok(())
}

/// Abort a sale that has not settled yet. The collected balance is
/// recovered through `emergencyWithdraw`.
///
/// Caller: contract instance owner only
/// Reject if:
/// - The sender is not the contract owner.
/// - The sale is already finalized or cancelled.
#[receive(
    contract = "sale_pool",
    name = "cancelSale",
    error = "ContractError",
    mutable
)]
fn contract_cancel_sale<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
) -> ContractResult<()> {
    ensure!(
        ctx.sender().matches_account(&ctx.owner()),
        ContractError::Unauthorized
    );
    let state = host.state_mut();
    ensure!(
        matches!(state.status, SaleStatus::Pending | SaleStatus::Active),
        CustomContractError::AlreadyFinalized.into()
    );
    state.status = SaleStatus::Cancelled;
    Ok(())
}

// ==============================================
// For investors
// ==========================================

/// Invest the attached payment into the sale.
///
/// Caller: whitelisted accounts only
/// Reject if:
/// - The sender is a contract.
/// - The contract is paused.
/// - Status is not Active or the sale window is not open.
/// - The amount is outside the per-transaction min/max bounds.
/// - The investor's cumulative total would exceed their allocation cap.
/// - The pool total would exceed the hard cap.
#[receive(
    contract = "sale_pool",
    name = "invest",
    error = "ContractError",
    payable,
    mutable,
    enable_logger
)]
fn contract_invest<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
    amount: Amount,
    logger: &mut impl HasLogger,
) -> ContractResult<()> {
    let investor = match ctx.sender() {
        Address::Account(account) => account,
        Address::Contract(_) => bail!(CustomContractError::AccountOnly.into()),
    };
    let now = ctx.metadata().slot_time();
    let state = host.state_mut();

    ensure!(!state.paused, CustomContractError::ContractPaused.into());
    ensure_eq!(
        state.status,
        SaleStatus::Active,
        CustomContractError::SaleNotActive.into()
    );
    ensure!(
        state.config.start_time <= now && now <= state.config.end_time,
        CustomContractError::SaleNotActive.into()
    );
    ensure!(
        amount >= state.config.min_investment,
        CustomContractError::BelowMinInvestment.into()
    );
    ensure!(
        amount <= state.config.max_investment,
        CustomContractError::AboveMaxInvestment.into()
    );
    ensure!(
        state.policy.is_whitelisted(&investor),
        CustomContractError::NotWhitelisted.into()
    );

    let cap = state.policy.allocation_cap(&investor);
    ensure!(
        state.cumulative_investment(&investor, amount) <= cap.micro_ccd as u128,
        CustomContractError::AllocationExceeded.into()
    );
    ensure!(
        state.prospective_total(amount) <= state.config.hard_cap.micro_ccd as u128,
        CustomContractError::HardCapReached.into()
    );

    state.record_investment(&investor, amount)?;

    logger.log(&LaunchEvent::Investment(InvestmentEvent { investor, amount }))?;
    Ok(())
}

/// Return a failed sale's payment to the sender, exactly once and in
/// full. Only a finalized sale below its soft cap is refundable.
///
/// Caller: investors of this sale
/// Reject if:
/// - The sender is a contract.
/// - The contract is paused.
/// - The sale is not finalized, or reached its soft cap.
/// - The sender never invested or was already refunded.
#[receive(
    contract = "sale_pool",
    name = "refund",
    error = "ContractError",
    mutable,
    enable_logger
)]
fn contract_refund<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
    logger: &mut impl HasLogger,
) -> ContractResult<()> {
    let investor = match ctx.sender() {
        Address::Account(account) => account,
        Address::Contract(_) => bail!(CustomContractError::AccountOnly.into()),
    };

    // Debit the ledger before any outward transfer.
    let amount = {
        let state = host.state_mut();
        ensure!(!state.paused, CustomContractError::ContractPaused.into());
        ensure_eq!(
            state.status,
            SaleStatus::Finalized,
            CustomContractError::SaleNotFinalized.into()
        );
        ensure!(
            state.total_raised < state.config.soft_cap,
            CustomContractError::SoftCapMet.into()
        );

        let mut record = state
            .investors
            .get_mut(&investor)
            .ok_or_else(|| ContractError::from(CustomContractError::NoInvestment))?;
        ensure!(!record.refunded, CustomContractError::AlreadyRefunded.into());
        record.refunded = true;
        record.invested
    };

    transfer::transfer_payment(host, &investor, amount)?;
    logger.log(&LaunchEvent::Refunded(RefundedEvent { investor, amount }))?;
    Ok(())
}

/// Release everything currently claimable across the sender's vesting
/// schedules and transfer the sale tokens out.
///
/// Caller: investors of a successful sale
/// Reject if:
/// - The sender is a contract.
/// - The contract is paused.
/// - The sale is not finalized, or missed its soft cap.
/// - The sale token was not registered.
/// - The sender holds no schedules, or nothing is claimable yet.
#[receive(
    contract = "sale_pool",
    name = "claim",
    error = "ContractError",
    mutable,
    enable_logger
)]
fn contract_claim<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
    logger: &mut impl HasLogger,
) -> ContractResult<()> {
    let investor = match ctx.sender() {
        Address::Account(account) => account,
        Address::Contract(_) => bail!(CustomContractError::AccountOnly.into()),
    };
    let now = ctx.metadata().slot_time();

    let (token, released, total) = {
        let state = host.state_mut();
        ensure!(!state.paused, CustomContractError::ContractPaused.into());
        ensure_eq!(
            state.status,
            SaleStatus::Finalized,
            CustomContractError::SaleNotFinalized.into()
        );
        ensure!(
            state.is_successful(),
            CustomContractError::SoftCapNotMet.into()
        );
        let token = state
            .sale_token
            .ok_or_else(|| ContractError::from(CustomContractError::SaleTokenNotSet))?;

        let schedule_ids = state.vesting.schedules_of(&investor);
        ensure!(
            !schedule_ids.is_empty(),
            CustomContractError::NoTokensToClaim.into()
        );

        let released = state.vesting.release_all(&investor, now)?;
        let total: u64 = released.iter().map(|(_, amount)| amount.0).sum();
        ensure!(total > 0, CustomContractError::NothingToRelease.into());

        let mut record = state
            .investors
            .get_mut(&investor)
            .ok_or_else(|| ContractError::from(CustomContractError::NoInvestment))?;
        record.claimed = TokenAmountU64(record.claimed.0 + total);

        (token, released, TokenAmountU64(total))
    };

    for (_, amount) in released {
        logger.log(&LaunchEvent::TokensReleased(TokensReleasedEvent {
            beneficiary: investor,
            amount,
        }))?;
    }
    logger.log(&LaunchEvent::TokensClaimed(TokensClaimedEvent {
        investor,
        amount: total,
    }))?;

    transfer::transfer_token(host, &token, ctx.self_address(), investor, total)
}

/// Release the claimable amount of a single schedule to its beneficiary.
/// Anyone may trigger this; the tokens always go to the beneficiary.
///
/// Reject if:
/// - The contract is paused.
/// - The sale is not finalized, or missed its soft cap.
/// - The sale token was not registered.
/// - The schedule does not exist or nothing is claimable yet.
#[receive(
    contract = "sale_pool",
    name = "release",
    parameter = "ScheduleId",
    error = "ContractError",
    mutable,
    enable_logger
)]
fn contract_release<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
    logger: &mut impl HasLogger,
) -> ContractResult<()> {
    let schedule_id: ScheduleId = ctx.parameter_cursor().get()?;
    let now = ctx.metadata().slot_time();

    let (token, beneficiary, amount) = {
        let state = host.state_mut();
        ensure!(!state.paused, CustomContractError::ContractPaused.into());
        ensure_eq!(
            state.status,
            SaleStatus::Finalized,
            CustomContractError::SaleNotFinalized.into()
        );
        ensure!(
            state.is_successful(),
            CustomContractError::SoftCapNotMet.into()
        );
        let token = state
            .sale_token
            .ok_or_else(|| ContractError::from(CustomContractError::SaleTokenNotSet))?;

        let (beneficiary, amount) = state.vesting.release(&schedule_id, now)?;
        if let Some(mut record) = state.investors.get_mut(&beneficiary) {
            record.claimed = TokenAmountU64(record.claimed.0 + amount.0);
        }
        (token, beneficiary, amount)
    };

    logger.log(&LaunchEvent::TokensReleased(TokensReleasedEvent {
        beneficiary,
        amount,
    }))?;
    transfer::transfer_token(host, &token, ctx.self_address(), beneficiary, amount)
}

/// Revoke a revocable vesting schedule, freezing its claimable amount.
/// Schedules seeded by finalization are non-revocable, so this only
/// applies to schedules marked revocable at creation.
///
/// Caller: contract instance owner only
/// Reject if:
/// - The sender is not the contract owner.
/// - The schedule does not exist, is not revocable, or was revoked before.
#[receive(
    contract = "sale_pool",
    name = "revoke",
    parameter = "ScheduleId",
    error = "ContractError",
    mutable,
    enable_logger
)]
fn contract_revoke<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
    logger: &mut impl HasLogger,
) -> ContractResult<()> {
    ensure!(
        ctx.sender().matches_account(&ctx.owner()),
        ContractError::Unauthorized
    );
    let schedule_id: ScheduleId = ctx.parameter_cursor().get()?;
    let now = ctx.metadata().slot_time();

    host.state_mut().vesting.revoke(&schedule_id, now)?;
    logger.log(&LaunchEvent::ScheduleRevoked(VestingScheduleRevokedEvent {
        schedule_id,
    }))?;
    Ok(())
}

/// Sweep the remaining payment balance out of a dead sale.
/// For a failed (finalized below soft cap) sale this only works after
/// the refund grace period so investors come first.
///
/// Caller: contract instance owner only
/// Reject if:
/// - The sender is not the contract owner.
/// - The sale is still live, or succeeded.
/// - The grace period after a failed sale has not passed.
/// - There is nothing to withdraw.
#[receive(
    contract = "sale_pool",
    name = "emergencyWithdraw",
    parameter = "AccountAddress",
    error = "ContractError",
    mutable
)]
fn contract_emergency_withdraw<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
) -> ContractResult<()> {
    ensure!(
        ctx.sender().matches_account(&ctx.owner()),
        ContractError::Unauthorized
    );
    let to: AccountAddress = ctx.parameter_cursor().get()?;
    let now = ctx.metadata().slot_time();

    let state = host.state();
    match state.status {
        SaleStatus::Cancelled => (),
        SaleStatus::Finalized if !state.is_successful() => {
            let unlock = state
                .config
                .end_time
                .checked_add(state.config.emergency_grace)
                .ok_or_else(|| ContractError::from(CustomContractError::InvalidSchedule))?;
            ensure!(now > unlock, CustomContractError::ColdPeriod.into());
        }
        _ => bail!(CustomContractError::Inappropriate.into()),
    }

    let balance = host.self_balance();
    ensure!(
        balance > Amount::zero(),
        CustomContractError::InsufficientFunds.into()
    );
    transfer::transfer_payment(host, &to, balance)
}

/// Parameter type for the contract function `transferBeneficiary`.
#[cfg(feature = "beneficiary-transfer")]
#[derive(Debug, Serialize, SchemaType)]
pub struct TransferBeneficiaryParams {
    pub schedule_id: ScheduleId,
    pub new_beneficiary: AccountAddress,
}

/// Hand one of the sender's vesting schedules to another account.
///
/// Caller: the schedule's current beneficiary
/// Reject if:
/// - The sender is a contract, or not the schedule's beneficiary.
/// - The schedule does not exist.
#[cfg(feature = "beneficiary-transfer")]
#[receive(
    contract = "sale_pool",
    name = "transferBeneficiary",
    parameter = "TransferBeneficiaryParams",
    error = "ContractError",
    mutable,
    enable_logger
)]
fn contract_transfer_beneficiary<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
    logger: &mut impl HasLogger,
) -> ContractResult<()> {
    let caller = match ctx.sender() {
        Address::Account(account) => account,
        Address::Contract(_) => bail!(CustomContractError::AccountOnly.into()),
    };
    let params: TransferBeneficiaryParams = ctx.parameter_cursor().get()?;

    let old_beneficiary = host.state_mut().vesting.transfer_beneficiary(
        &params.schedule_id,
        caller,
        params.new_beneficiary,
    )?;

    logger.log(&LaunchEvent::BeneficiaryTransferred(
        BeneficiaryTransferredEvent {
            schedule_id: params.schedule_id,
            old_beneficiary,
            new_beneficiary: params.new_beneficiary,
        },
    ))?;
    Ok(())
}
