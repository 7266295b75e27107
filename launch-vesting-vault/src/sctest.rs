use concordium_std::concordium_cfg_test;

#[concordium_cfg_test]
mod tests {
    use crate::*;
    use concordium_cis2::BalanceOfQueryResponse;
    use concordium_std::test_infrastructure::*;

    const OWNER_ACC: AccountAddress = AccountAddress([0u8; 32]);
    const ALICE: AccountAddress = AccountAddress([10u8; 32]);
    const BOB: AccountAddress = AccountAddress([11u8; 32]);

    const SELF_ADDRESS: ContractAddress = ContractAddress {
        index: 1,
        subindex: 0,
    };
    const TOKEN_ADDRESS: ContractAddress = ContractAddress {
        index: 1000,
        subindex: 0,
    };

    const DAY: u64 = 24 * 60 * 60 * 1000;

    /// Vault whose token contract reports a fixed balance and accepts
    /// every transfer.
    fn vault_host(balance: u64) -> TestHost<State<TestStateApi>> {
        let mut state_builder = TestStateBuilder::new();
        let state = State {
            token: TOKEN_ADDRESS,
            ledger: VestingLedger::new(&mut state_builder),
        };
        let mut host = TestHost::new(state, state_builder);
        host.setup_mock_entrypoint(
            TOKEN_ADDRESS,
            OwnedEntrypointName::new_unchecked("balanceOf".into()),
            MockFn::new(move |_parameter, _amount, _balance, _state| {
                Ok((
                    false,
                    Some(BalanceOfQueryResponse::from(vec![TokenAmountU64(balance)])),
                ))
            }),
        );
        host.setup_mock_entrypoint(
            TOKEN_ADDRESS,
            OwnedEntrypointName::new_unchecked("transfer".into()),
            MockFn::returning_ok(()),
        );
        host
    }

    fn receive_ctx<'a>(sender: AccountAddress, slot_time: u64) -> TestReceiveContext<'a> {
        let mut ctx = TestReceiveContext::empty();
        ctx.set_owner(OWNER_ACC);
        ctx.set_sender(Address::Account(sender));
        ctx.set_self_address(SELF_ADDRESS);
        ctx.set_metadata_slot_time(Timestamp::from_timestamp_millis(slot_time));
        ctx
    }

    fn grant_params(beneficiary: AccountAddress, total: u64, revocable: bool) -> CreateScheduleParams {
        CreateScheduleParams {
            beneficiary,
            total_amount: TokenAmountU64(total),
            tge_percent: 20,
            start_time: Timestamp::from_timestamp_millis(0),
            cliff_duration: Duration::from_days(30),
            vesting_duration: Duration::from_days(180),
            revocable,
        }
    }

    fn create_grant(
        host: &mut TestHost<State<TestStateApi>>,
        params: &CreateScheduleParams,
    ) -> ContractResult<()> {
        let parameter_bytes = to_bytes(params);
        let mut ctx = receive_ctx(OWNER_ACC, 0);
        ctx.set_parameter(&parameter_bytes);
        let mut logger = TestLogger::init();
        let crypto_primitives = TestCryptoPrimitives::new();
        contract_create_schedule(&ctx, host, &mut logger, &crypto_primitives)
    }

    #[concordium_test]
    fn test_create_schedule_requires_owner() {
        let mut host = vault_host(10_000);
        let params = grant_params(ALICE, 5_000, false);
        let parameter_bytes = to_bytes(&params);
        let mut ctx = receive_ctx(BOB, 0);
        ctx.set_parameter(&parameter_bytes);
        let mut logger = TestLogger::init();
        let crypto_primitives = TestCryptoPrimitives::new();
        claim_eq!(
            contract_create_schedule(&ctx, &mut host, &mut logger, &crypto_primitives)
                .expect_err_report("not the owner"),
            ContractError::Unauthorized
        );
    }

    #[concordium_test]
    /// Grants are only accepted while the vault balance covers every
    /// outstanding grant plus the new one.
    fn test_create_schedule_checks_funding() {
        let mut host = vault_host(10_000);

        claim!(create_grant(&mut host, &grant_params(ALICE, 8_000, false)).is_ok());
        claim_eq!(host.state().ledger.reserved().0, 8_000);

        claim_eq!(
            create_grant(&mut host, &grant_params(BOB, 3_000, false))
                .expect_err_report("would overdraw the vault"),
            CustomContractError::InsufficientFunds.into()
        );

        claim!(create_grant(&mut host, &grant_params(BOB, 2_000, false)).is_ok());
        claim_eq!(host.state().ledger.reserved().0, 10_000);
    }

    #[concordium_test]
    /// 10_000 granted at 20% TGE: 2_000 claimable at start, 6_000 in
    /// total half way through vesting, everything after the end.
    fn test_release_follows_vesting_curve() {
        let mut host = vault_host(10_000);
        create_grant(&mut host, &grant_params(ALICE, 10_000, false)).unwrap_abort();
        let schedule_id = host.state().ledger.schedules_of(&ALICE)[0];

        let parameter_bytes = to_bytes(&schedule_id);
        let mut ctx = receive_ctx(BOB, 0);
        ctx.set_parameter(&parameter_bytes);
        let mut logger = TestLogger::init();
        claim!(contract_release(&ctx, &mut host, &mut logger).is_ok());
        let schedule = host.state().ledger.schedule(&schedule_id).unwrap_abort();
        claim_eq!(schedule.released_amount.0, 2_000);
        claim_eq!(
            logger.logs[0],
            to_bytes(&LaunchEvent::TokensReleased(TokensReleasedEvent {
                beneficiary: ALICE,
                amount: TokenAmountU64(2_000),
            }))
        );

        // Nothing more without time passing.
        let mut logger = TestLogger::init();
        claim_eq!(
            contract_release(&ctx, &mut host, &mut logger).expect_err_report("nothing accrued"),
            CustomContractError::NothingToRelease.into()
        );

        let halfway = 30 * DAY + 90 * DAY;
        let mut ctx = receive_ctx(BOB, halfway);
        ctx.set_parameter(&parameter_bytes);
        let mut logger = TestLogger::init();
        claim!(contract_release(&ctx, &mut host, &mut logger).is_ok());
        claim_eq!(
            host.state()
                .ledger
                .schedule(&schedule_id)
                .unwrap_abort()
                .released_amount
                .0,
            6_000
        );

        let past_end = 30 * DAY + 180 * DAY + 1_000;
        let mut ctx = receive_ctx(BOB, past_end);
        ctx.set_parameter(&parameter_bytes);
        let mut logger = TestLogger::init();
        claim!(contract_release(&ctx, &mut host, &mut logger).is_ok());
        claim_eq!(host.state().ledger.reserved().0, 0);
    }

    #[concordium_test]
    /// `claim` drains every schedule the sender holds in one call.
    fn test_claim_releases_all_schedules() {
        let mut host = vault_host(10_000);
        create_grant(&mut host, &grant_params(ALICE, 4_000, false)).unwrap_abort();
        create_grant(&mut host, &grant_params(ALICE, 6_000, false)).unwrap_abort();

        let past_end = 30 * DAY + 180 * DAY + 1_000;
        let ctx = receive_ctx(ALICE, past_end);
        let mut logger = TestLogger::init();
        claim!(contract_claim(&ctx, &mut host, &mut logger).is_ok());
        claim_eq!(logger.logs.len(), 2);
        claim_eq!(host.state().ledger.reserved().0, 0);

        let mut logger = TestLogger::init();
        claim_eq!(
            contract_claim(&ctx, &mut host, &mut logger).expect_err_report("already drained"),
            CustomContractError::NothingToRelease.into()
        );

        let ctx = receive_ctx(BOB, past_end);
        let mut logger = TestLogger::init();
        claim_eq!(
            contract_claim(&ctx, &mut host, &mut logger).expect_err_report("no schedules"),
            CustomContractError::NoTokensToClaim.into()
        );
    }

    #[concordium_test]
    /// Revoking frees the unvested remainder as withdrawable surplus.
    fn test_revoke_and_withdraw_surplus() {
        let mut host = vault_host(10_000);
        create_grant(&mut host, &grant_params(ALICE, 10_000, true)).unwrap_abort();

        // Nothing to withdraw while fully reserved.
        let to_bytes_owner = to_bytes(&OWNER_ACC);
        let mut ctx = receive_ctx(OWNER_ACC, 0);
        ctx.set_parameter(&to_bytes_owner);
        claim_eq!(
            contract_withdraw_surplus(&ctx, &mut host).expect_err_report("fully reserved"),
            CustomContractError::InsufficientFunds.into()
        );

        // Revoke half way: 6_000 vested, 4_000 forfeited.
        let halfway = 30 * DAY + 90 * DAY;
        let schedule_id = host.state().ledger.schedules_of(&ALICE)[0];
        let parameter_bytes = to_bytes(&schedule_id);
        let mut ctx = receive_ctx(OWNER_ACC, halfway);
        ctx.set_parameter(&parameter_bytes);
        let mut logger = TestLogger::init();
        claim!(contract_revoke(&ctx, &mut host, &mut logger).is_ok());
        claim_eq!(host.state().ledger.reserved().0, 6_000);
        claim_eq!(
            logger.logs[0],
            to_bytes(&LaunchEvent::ScheduleRevoked(VestingScheduleRevokedEvent {
                schedule_id,
            }))
        );

        let mut ctx = receive_ctx(OWNER_ACC, halfway);
        ctx.set_parameter(&to_bytes_owner);
        claim!(contract_withdraw_surplus(&ctx, &mut host).is_ok());

        // Non-owner may neither revoke nor withdraw.
        let mut ctx = receive_ctx(ALICE, halfway);
        ctx.set_parameter(&parameter_bytes);
        let mut logger = TestLogger::init();
        claim_eq!(
            contract_revoke(&ctx, &mut host, &mut logger).expect_err_report("not the owner"),
            ContractError::Unauthorized
        );
        claim_eq!(
            contract_withdraw_surplus(&ctx, &mut host).expect_err_report("not the owner"),
            ContractError::Unauthorized
        );
    }

    #[concordium_test]
    /// The frozen amount of a revoked grant stays claimable, once.
    fn test_revoked_grant_keeps_frozen_amount() {
        let mut host = vault_host(10_000);
        create_grant(&mut host, &grant_params(ALICE, 10_000, true)).unwrap_abort();
        let schedule_id = host.state().ledger.schedules_of(&ALICE)[0];

        let halfway = 30 * DAY + 90 * DAY;
        let parameter_bytes = to_bytes(&schedule_id);
        let mut ctx = receive_ctx(OWNER_ACC, halfway);
        ctx.set_parameter(&parameter_bytes);
        let mut logger = TestLogger::init();
        contract_revoke(&ctx, &mut host, &mut logger).unwrap_abort();

        // Long after the original vesting end, only the frozen amount
        // comes out.
        let far_future = 1_000 * DAY;
        let ctx = receive_ctx(ALICE, far_future);
        let mut logger = TestLogger::init();
        claim!(contract_claim(&ctx, &mut host, &mut logger).is_ok());
        claim_eq!(
            host.state()
                .ledger
                .schedule(&schedule_id)
                .unwrap_abort()
                .released_amount
                .0,
            6_000
        );
        claim_eq!(host.state().ledger.reserved().0, 0);
    }
}
