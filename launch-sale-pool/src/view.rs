use crate::policy::WhitelistEntry;
use crate::state::{InvestorRecord, SaleConfig, State};
use concordium_std::*;
use launch_utils::{
    error::{ContractError, CustomContractError},
    types::{ContractTokenAmount, SaleStatus, ScheduleId},
    vesting::VestingSchedule,
};

#[derive(Debug, Serialize, SchemaType)]
struct ViewResponse {
    status: SaleStatus,
    paused: bool,
    sale_token: Option<ContractAddress>,
    config: SaleConfig,
    total_raised: Amount,
    /// Whether claims (true) or refunds (false) apply once finalized.
    successful: bool,
    /// Sale tokens still owed across all vesting schedules.
    tokens_reserved: ContractTokenAmount,
}

#[receive(contract = "sale_pool", name = "view", return_value = "ViewResponse")]
fn contract_view<S: HasStateApi>(
    _ctx: &impl HasReceiveContext,
    host: &impl HasHost<State<S>, StateApiType = S>,
) -> ReceiveResult<ViewResponse> {
    let state = host.state();

    Ok(ViewResponse {
        status: state.status.clone(),
        paused: state.paused,
        sale_token: state.sale_token,
        config: state.config.clone(),
        total_raised: state.total_raised,
        successful: state.is_successful(),
        tokens_reserved: state.vesting.reserved(),
    })
}

// ------------------------------------------

#[derive(Debug, Serialize, SchemaType)]
struct ViewInvestorResponse {
    record: InvestorRecord,
    whitelist: Option<WhitelistEntry>,
    /// Effective cumulative cap, custom or tier default.
    allocation_cap: Amount,
    schedule_ids: Vec<ScheduleId>,
}

#[receive(
    contract = "sale_pool",
    name = "viewInvestor",
    parameter = "AccountAddress",
    return_value = "ViewInvestorResponse"
)]
fn contract_view_investor<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &impl HasHost<State<S>, StateApiType = S>,
) -> ReceiveResult<ViewInvestorResponse> {
    let investor: AccountAddress = ctx.parameter_cursor().get()?;
    let state = host.state();

    let record = state
        .investors
        .get(&investor)
        .map(|record| record.clone())
        .ok_or_else(|| ContractError::from(CustomContractError::NoInvestment))?;

    Ok(ViewInvestorResponse {
        record,
        whitelist: state.policy.entry_of(&investor),
        allocation_cap: state.policy.allocation_cap(&investor),
        schedule_ids: state.vesting.schedules_of(&investor),
    })
}

// ------------------------------------------

type ViewInvestorsResponse = Vec<(AccountAddress, InvestorRecord)>;

#[receive(
    contract = "sale_pool",
    name = "viewInvestors",
    return_value = "ViewInvestorsResponse"
)]
fn contract_view_investors<S: HasStateApi>(
    _ctx: &impl HasReceiveContext,
    host: &impl HasHost<State<S>, StateApiType = S>,
) -> ReceiveResult<ViewInvestorsResponse> {
    let state = host.state();

    let mut ret: ViewInvestorsResponse = Vec::new();
    for (investor, record) in state.investors.iter() {
        ret.push((*investor, record.clone()));
    }

    Ok(ret)
}

// ------------------------------------------

#[receive(
    contract = "sale_pool",
    name = "viewSchedule",
    parameter = "ScheduleId",
    return_value = "VestingSchedule"
)]
fn contract_view_schedule<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &impl HasHost<State<S>, StateApiType = S>,
) -> ReceiveResult<VestingSchedule> {
    let schedule_id: ScheduleId = ctx.parameter_cursor().get()?;
    Ok(host.state().vesting.schedule(&schedule_id)?)
}

// ------------------------------------------

/// What the schedule's beneficiary could claim right now.
#[receive(
    contract = "sale_pool",
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
    Ok(host
        .state()
        .vesting
        .releasable_amount(&schedule_id, now)?)
}
