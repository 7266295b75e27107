//! Vault for token grants (team, advisors, ecosystem funds) paid out on
//! TGE + cliff + linear vesting schedules.
//!
//! The owner deposits CIS-2 tokens into the vault up front and registers
//! schedules against that balance; a schedule is only accepted while the
//! vault holds enough tokens to cover everything it already owes plus
//! the new grant.
#[cfg(any(feature = "wasm-test", test))]
mod sctest;

use concordium_cis2::TokenAmountU64;
use concordium_std::*;
use launch_utils::{
    error::{ContractError, ContractResult, CustomContractError},
    transfer,
    types::{ContractTokenAmount, Percentage, ScheduleId},
    vesting::{VestingLedger, VestingSchedule},
    LaunchEvent, TokensReleasedEvent, VestingScheduleCreatedEvent, VestingScheduleRevokedEvent,
};

#[cfg(feature = "beneficiary-transfer")]
use launch_utils::BeneficiaryTransferredEvent;

#[derive(Serial, DeserialWithState, StateClone, Debug)]
#[concordium(state_parameter = "S")]
pub struct State<S: HasStateApi> {
    /// CIS-2 contract the grants are denominated in.
    pub token: ContractAddress,
    pub ledger: VestingLedger<S>,
}

/// The parameter schema for `init` function.
#[derive(Debug, Serialize, SchemaType)]
pub struct InitParams {
    pub token: ContractAddress,
}

#[init(contract = "vesting_vault", parameter = "InitParams")]
fn contract_init<S: HasStateApi>(
    ctx: &impl HasInitContext,
    state_builder: &mut StateBuilder<S>,
) -> InitResult<State<S>> {
    let params: InitParams = ctx.parameter_cursor().get()?;
    Ok(State {
        token: params.token,
        ledger: VestingLedger::new(state_builder),
    })
}

/// Parameter type for the contract function `createSchedule`.
#[derive(Debug, Serialize, SchemaType)]
pub struct CreateScheduleParams {
    pub beneficiary: AccountAddress,
    pub total_amount: ContractTokenAmount,
    pub tge_percent: Percentage,
    pub start_time: Timestamp,
    pub cliff_duration: Duration,
    pub vesting_duration: Duration,
    pub revocable: bool,
}

/// Register a grant against the vault's token balance.
///
/// Caller: contract instance owner only
/// Reject if:
/// - Fails to parse parameter.
/// - The sender is not the contract owner.
/// - The schedule parameters are invalid.
/// - The vault balance does not cover the outstanding grants plus this one.
#[receive(
    contract = "vesting_vault",
    name = "createSchedule",
    parameter = "CreateScheduleParams",
    error = "ContractError",
    mutable,
    enable_logger,
    crypto_primitives
)]
fn contract_create_schedule<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
    logger: &mut impl HasLogger,
    crypto_primitives: &impl HasCryptoPrimitives,
) -> ContractResult<()> {
    ensure!(
        ctx.sender().matches_account(&ctx.owner()),
        ContractError::Unauthorized
    );
    let params: CreateScheduleParams = ctx.parameter_cursor().get()?;

    let token = host.state().token;
    let balance = transfer::token_balance_of(
        host,
        &token,
        Address::Contract(ctx.self_address()),
    )?;
    let needed = (host.state().ledger.reserved().0 as u128) + params.total_amount.0 as u128;
    ensure!(
        balance.0 as u128 >= needed,
        CustomContractError::InsufficientFunds.into()
    );

    let schedule_id = host.state_mut().ledger.create_schedule(
        crypto_primitives,
        params.beneficiary,
        params.total_amount,
        params.tge_percent,
        params.start_time,
        params.cliff_duration,
        params.vesting_duration,
        params.revocable,
    )?;

    logger.log(&LaunchEvent::ScheduleCreated(VestingScheduleCreatedEvent {
        schedule_id,
        beneficiary: params.beneficiary,
        total_amount: params.total_amount,
    }))?;
    Ok(())
}

/// Pay out the claimable amount of one schedule to its beneficiary.
/// Anyone may trigger this.
///
/// Reject if:
/// - Fails to parse parameter.
/// - The schedule does not exist or nothing is claimable yet.
#[receive(
    contract = "vesting_vault",
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

    let (beneficiary, amount) = host.state_mut().ledger.release(&schedule_id, now)?;
    let token = host.state().token;

    logger.log(&LaunchEvent::TokensReleased(TokensReleasedEvent {
        beneficiary,
        amount,
    }))?;
    transfer::transfer_token(host, &token, ctx.self_address(), beneficiary, amount)
}

/// Pay out everything currently claimable across the sender's schedules.
///
/// Caller: accounts holding at least one schedule
/// Reject if:
/// - The sender is a contract.
/// - The sender holds no schedules, or nothing is claimable yet.
#[receive(
    contract = "vesting_vault",
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
    let beneficiary = match ctx.sender() {
        Address::Account(account) => account,
        Address::Contract(_) => bail!(CustomContractError::AccountOnly.into()),
    };
    let now = ctx.metadata().slot_time();

    let state = host.state_mut();
    ensure!(
        !state.ledger.schedules_of(&beneficiary).is_empty(),
        CustomContractError::NoTokensToClaim.into()
    );
    let released = state.ledger.release_all(&beneficiary, now)?;
    let total: u64 = released.iter().map(|(_, amount)| amount.0).sum();
    ensure!(total > 0, CustomContractError::NothingToRelease.into());
    let token = state.token;

    for (_, amount) in released {
        logger.log(&LaunchEvent::TokensReleased(TokensReleasedEvent {
            beneficiary,
            amount,
        }))?;
    }
    transfer::transfer_token(
        host,
        &token,
        ctx.self_address(),
        beneficiary,
        TokenAmountU64(total),
    )
}

/// Freeze a revocable grant at what has vested so far. The forfeited
/// remainder becomes surplus the owner can withdraw.
///
/// Caller: contract instance owner only
/// Reject if:
/// - Fails to parse parameter.
/// - The sender is not the contract owner.
/// - The schedule does not exist, is not revocable, or was revoked before.
#[receive(
    contract = "vesting_vault",
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

    host.state_mut().ledger.revoke(&schedule_id, now)?;
    logger.log(&LaunchEvent::ScheduleRevoked(VestingScheduleRevokedEvent {
        schedule_id,
    }))?;
    Ok(())
}

/// Move tokens the vault holds beyond its outstanding grants. Covers
/// over-funding and amounts forfeited by revocations.
///
/// Caller: contract instance owner only
/// Reject if:
/// - Fails to parse parameter.
/// - The sender is not the contract owner.
/// - There is no surplus.
#[receive(
    contract = "vesting_vault",
    name = "withdrawSurplus",
    parameter = "AccountAddress",
    error = "ContractError",
    mutable
)]
fn contract_withdraw_surplus<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
) -> ContractResult<()> {
    ensure!(
        ctx.sender().matches_account(&ctx.owner()),
        ContractError::Unauthorized
    );
    let to: AccountAddress = ctx.parameter_cursor().get()?;

    let token = host.state().token;
    let balance = transfer::token_balance_of(
        host,
        &token,
        Address::Contract(ctx.self_address()),
    )?;
    let surplus = balance
        .0
        .checked_sub(host.state().ledger.reserved().0)
        .ok_or_else(|| ContractError::from(CustomContractError::InsufficientFunds))?;
    ensure!(surplus > 0, CustomContractError::InsufficientFunds.into());

    transfer::transfer_token(
        host,
        &token,
        ctx.self_address(),
        to,
        TokenAmountU64(surplus),
    )
}

/// Parameter type for the contract function `transferBeneficiary`.
#[cfg(feature = "beneficiary-transfer")]
#[derive(Debug, Serialize, SchemaType)]
pub struct TransferBeneficiaryParams {
    pub schedule_id: ScheduleId,
    pub new_beneficiary: AccountAddress,
}

/// Hand one of the sender's grants to another account.
///
/// Caller: the schedule's current beneficiary
/// Reject if:
/// - The sender is a contract, or not the schedule's beneficiary.
/// - The schedule does not exist.
#[cfg(feature = "beneficiary-transfer")]
#[receive(
    contract = "vesting_vault",
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

    let old_beneficiary = host.state_mut().ledger.transfer_beneficiary(
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

// ==============================================
// Views
// ==========================================

#[derive(Debug, Serialize, SchemaType)]
struct ViewResponse {
    token: ContractAddress,
    /// Tokens still owed across all grants.
    reserved: ContractTokenAmount,
}

#[receive(contract = "vesting_vault", name = "view", return_value = "ViewResponse")]
fn contract_view<S: HasStateApi>(
    _ctx: &impl HasReceiveContext,
    host: &impl HasHost<State<S>, StateApiType = S>,
) -> ReceiveResult<ViewResponse> {
    let state = host.state();
    Ok(ViewResponse {
        token: state.token,
        reserved: state.ledger.reserved(),
    })
}

#[receive(
    contract = "vesting_vault",
    name = "viewSchedule",
    parameter = "ScheduleId",
    return_value = "VestingSchedule"
)]
fn contract_view_schedule<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &impl HasHost<State<S>, StateApiType = S>,
) -> ReceiveResult<VestingSchedule> {
    let schedule_id: ScheduleId = ctx.parameter_cursor().get()?;
    Ok(host.state().ledger.schedule(&schedule_id)?)
}

#[receive(
    contract = "vesting_vault",
    name = "schedulesOf",
    parameter = "AccountAddress",
    return_value = "Vec<ScheduleId>"
)]
fn contract_schedules_of<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &impl HasHost<State<S>, StateApiType = S>,
) -> ReceiveResult<Vec<ScheduleId>> {
    let beneficiary: AccountAddress = ctx.parameter_cursor().get()?;
    Ok(host.state().ledger.schedules_of(&beneficiary))
}

/// What the schedule's beneficiary could claim right now.
#[receive(
    contract = "vesting_vault",
    name = "releasableAmount",
    parameter = "ScheduleId",
    return_value = "ContractTokenAmount"
)]
fn contract_releasable_amount<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &impl HasHost<State<S>, StateApiType = S>,
) -> ReceiveResult<ContractTokenAmount> {
    let schedule_id: ScheduleId = ctx.parameter_cursor().get()?;
    let now = ctx.metadata().slot_time();
    Ok(host.state().ledger.releasable_amount(&schedule_id, now)?)
}
