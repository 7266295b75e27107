use crate::state::*;
use crate::*;
use concordium_std::test_infrastructure::*;

mod investor;
mod owner;

pub(crate) const OWNER_ACC: AccountAddress = AccountAddress([0u8; 32]);
pub(crate) const ALICE: AccountAddress = AccountAddress([10u8; 32]);
pub(crate) const BOB: AccountAddress = AccountAddress([11u8; 32]);
pub(crate) const CAROL: AccountAddress = AccountAddress([12u8; 32]);

pub(crate) const SELF_ADDRESS: ContractAddress = ContractAddress {
    index: 1,
    subindex: 0,
};
pub(crate) const TOKEN_ADDRESS: ContractAddress = ContractAddress {
    index: 1000,
    subindex: 0,
};

/// Sale window in milliseconds.
pub(crate) const SALE_START: u64 = 10_000;
pub(crate) const SALE_END: u64 = 1_000_000;
pub(crate) const DAY: u64 = 24 * 60 * 60 * 1000;

/// 5 micro payment units per whole token; 50_000 micro invested buys
/// 10_000 tokens.
pub(crate) fn default_config() -> SaleConfig {
    SaleConfig {
        token_price: 5,
        hard_cap: Amount::from_micro_ccd(100_000),
        soft_cap: Amount::from_micro_ccd(50_000),
        min_investment: Amount::from_micro_ccd(100),
        max_investment: Amount::from_micro_ccd(50_000),
        start_time: Timestamp::from_timestamp_millis(SALE_START),
        end_time: Timestamp::from_timestamp_millis(SALE_END),
        tge_percent: 20,
        cliff_duration: Duration::from_days(30),
        vesting_duration: Duration::from_days(180),
        early_finalize_on_hardcap: false,
        emergency_grace: Duration::from_days(7),
    }
}

pub(crate) fn host_with_status(
    config: SaleConfig,
    status: SaleStatus,
) -> TestHost<State<TestStateApi>> {
    let mut state_builder = TestStateBuilder::new();
    let mut state = State::new(&mut state_builder, config);
    state.status = status;
    TestHost::new(state, state_builder)
}

pub(crate) fn receive_ctx<'a>(
    sender: AccountAddress,
    slot_time: u64,
) -> TestReceiveContext<'a> {
    let mut ctx = TestReceiveContext::empty();
    ctx.set_owner(OWNER_ACC);
    ctx.set_sender(Address::Account(sender));
    ctx.set_self_address(SELF_ADDRESS);
    ctx.set_metadata_slot_time(Timestamp::from_timestamp_millis(slot_time));
    ctx
}

pub(crate) fn whitelist(
    host: &mut TestHost<State<TestStateApi>>,
    investor: AccountAddress,
    tier: AllocationTier,
) {
    host.state_mut().policy.add(&investor, tier);
}

/// Run `invest` as `investor` at `slot_time`, discarding the log.
pub(crate) fn invest(
    host: &mut TestHost<State<TestStateApi>>,
    investor: AccountAddress,
    micro: u64,
    slot_time: u64,
) -> ContractResult<()> {
    let ctx = receive_ctx(investor, slot_time);
    let mut logger = TestLogger::init();
    contract_invest(&ctx, host, Amount::from_micro_ccd(micro), &mut logger)
}

/// Whitelisted investments reaching the soft cap, finalized after the
/// sale window, token registered and its `transfer` mocked. Leaves the
/// pool ready for claims.
pub(crate) fn successful_sale(
    investments: &[(AccountAddress, u64)],
) -> TestHost<State<TestStateApi>> {
    let mut host = host_with_status(default_config(), SaleStatus::Active);
    for (investor, micro) in investments {
        whitelist(&mut host, *investor, AllocationTier::Guaranteed);
        invest(&mut host, *investor, *micro, SALE_START).unwrap_abort();
    }

    let ctx = receive_ctx(OWNER_ACC, SALE_END + 1);
    let mut logger = TestLogger::init();
    let crypto_primitives = TestCryptoPrimitives::new();
    contract_finalize(&ctx, &mut host, &mut logger, &crypto_primitives).unwrap_abort();

    host.state_mut().sale_token = Some(TOKEN_ADDRESS);
    host.setup_mock_entrypoint(
        TOKEN_ADDRESS,
        OwnedEntrypointName::new_unchecked("transfer".into()),
        MockFn::returning_ok(()),
    );
    host
}
