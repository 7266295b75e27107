use concordium_std::concordium_cfg_test;

#[concordium_cfg_test]
mod tests {
    use crate::sctest::*;
    use crate::state::*;
    use crate::*;
    use concordium_std::test_infrastructure::*;
    use launch_utils::{LaunchEvent, SaleFinalizedEvent};

    #[concordium_test]
    fn test_admin_entrypoints_require_owner() {
        let mut host = host_with_status(default_config(), SaleStatus::Pending);
        let ctx = receive_ctx(BOB, SALE_START);

        claim_eq!(
            contract_activate_sale(&ctx, &mut host).expect_err_report("activate"),
            ContractError::Unauthorized
        );
        claim_eq!(
            contract_cancel_sale(&ctx, &mut host).expect_err_report("cancel"),
            ContractError::Unauthorized
        );
        claim_eq!(
            contract_set_paused(&ctx, &mut host).expect_err_report("pause"),
            ContractError::Unauthorized
        );
        claim_eq!(
            contract_set_unpaused(&ctx, &mut host).expect_err_report("unpause"),
            ContractError::Unauthorized
        );
        claim_eq!(
            contract_set_sale_token(&ctx, &mut host).expect_err_report("set token"),
            ContractError::Unauthorized
        );
        claim_eq!(
            contract_whitelisting(&ctx, &mut host).expect_err_report("whitelisting"),
            ContractError::Unauthorized
        );
        claim_eq!(
            contract_emergency_withdraw(&ctx, &mut host).expect_err_report("withdraw"),
            ContractError::Unauthorized
        );

        let mut logger = TestLogger::init();
        let crypto_primitives = TestCryptoPrimitives::new();
        claim_eq!(
            contract_finalize(&ctx, &mut host, &mut logger, &crypto_primitives)
                .expect_err_report("finalize"),
            ContractError::Unauthorized
        );
        claim_eq!(
            contract_revoke(&ctx, &mut host, &mut logger).expect_err_report("revoke"),
            ContractError::Unauthorized
        );
    }

    #[concordium_test]
    fn test_activate_only_from_pending() {
        let mut host = host_with_status(default_config(), SaleStatus::Pending);
        let ctx = receive_ctx(OWNER_ACC, SALE_START);

        claim!(contract_activate_sale(&ctx, &mut host).is_ok());
        claim_eq!(host.state().status, SaleStatus::Active);

        claim_eq!(
            contract_activate_sale(&ctx, &mut host).expect_err_report("already active"),
            CustomContractError::SaleNotPending.into()
        );
    }

    #[concordium_test]
    fn test_whitelisting_only_while_pending() {
        let mut host = host_with_status(default_config(), SaleStatus::Pending);

        let params = WhitelistingParams {
            entries: vec![
                AllowedInvestorParams {
                    investor: ALICE,
                    tier: AllocationTier::Gold,
                },
                AllowedInvestorParams {
                    investor: BOB,
                    tier: AllocationTier::Bronze,
                },
            ],
        };
        let parameter_bytes = to_bytes(&params);
        let mut ctx = receive_ctx(OWNER_ACC, SALE_START);
        ctx.set_parameter(&parameter_bytes);

        claim!(contract_whitelisting(&ctx, &mut host).is_ok());
        claim!(host.state().policy.is_whitelisted(&ALICE));
        claim_eq!(host.state().policy.tier_of(&BOB), AllocationTier::Bronze);

        host.state_mut().status = SaleStatus::Active;
        claim_eq!(
            contract_whitelisting(&ctx, &mut host).expect_err_report("sale already open"),
            CustomContractError::SaleNotPending.into()
        );
    }

    #[concordium_test]
    fn test_set_sale_token_only_once() {
        let mut host = host_with_status(default_config(), SaleStatus::Pending);
        let parameter_bytes = to_bytes(&TOKEN_ADDRESS);
        let mut ctx = receive_ctx(OWNER_ACC, SALE_START);
        ctx.set_parameter(&parameter_bytes);

        claim!(contract_set_sale_token(&ctx, &mut host).is_ok());
        claim_eq!(host.state().sale_token, Some(TOKEN_ADDRESS));

        claim_eq!(
            contract_set_sale_token(&ctx, &mut host).expect_err_report("already set"),
            CustomContractError::Inappropriate.into()
        );
    }

    #[concordium_test]
    fn test_custom_allocation_requires_listing_and_live_sale() {
        let mut host = host_with_status(default_config(), SaleStatus::Active);
        let params = CustomAllocationParams {
            investor: ALICE,
            cap: Amount::from_micro_ccd(1_000),
        };
        let parameter_bytes = to_bytes(&params);
        let mut ctx = receive_ctx(OWNER_ACC, SALE_START);
        ctx.set_parameter(&parameter_bytes);

        claim_eq!(
            contract_set_custom_allocation(&ctx, &mut host).expect_err_report("unlisted"),
            CustomContractError::NotWhitelisted.into()
        );

        whitelist(&mut host, ALICE, AllocationTier::Platinum);
        claim!(contract_set_custom_allocation(&ctx, &mut host).is_ok());
        claim_eq!(
            host.state().policy.allocation_cap(&ALICE),
            Amount::from_micro_ccd(1_000)
        );

        host.state_mut().status = SaleStatus::Finalized;
        claim_eq!(
            contract_set_custom_allocation(&ctx, &mut host).expect_err_report("sale settled"),
            CustomContractError::Inappropriate.into()
        );
    }

    #[concordium_test]
    fn test_finalize_waits_for_the_window() {
        let mut host = host_with_status(default_config(), SaleStatus::Active);
        whitelist(&mut host, ALICE, AllocationTier::Guaranteed);
        invest(&mut host, ALICE, 50_000, SALE_START).unwrap_abort();

        let ctx = receive_ctx(OWNER_ACC, SALE_END - 1);
        let mut logger = TestLogger::init();
        let crypto_primitives = TestCryptoPrimitives::new();
        claim_eq!(
            contract_finalize(&ctx, &mut host, &mut logger, &crypto_primitives)
                .expect_err_report("window still open"),
            CustomContractError::SaleNotEnded.into()
        );

        host.state_mut().status = SaleStatus::Pending;
        claim_eq!(
            contract_finalize(&ctx, &mut host, &mut logger, &crypto_primitives)
                .expect_err_report("never activated"),
            CustomContractError::SaleNotActive.into()
        );
    }

    #[concordium_test]
    /// With the early-finalize flag a full hard cap settles the sale
    /// before the window closes.
    fn test_finalize_early_on_hard_cap() {
        let mut config = default_config();
        config.early_finalize_on_hardcap = true;
        let mut host = host_with_status(config, SaleStatus::Active);
        whitelist(&mut host, ALICE, AllocationTier::Guaranteed);
        whitelist(&mut host, BOB, AllocationTier::Guaranteed);
        invest(&mut host, ALICE, 50_000, SALE_START).unwrap_abort();
        invest(&mut host, BOB, 50_000, SALE_START).unwrap_abort();

        let ctx = receive_ctx(OWNER_ACC, SALE_START + 100);
        let mut logger = TestLogger::init();
        let crypto_primitives = TestCryptoPrimitives::new();
        claim!(contract_finalize(&ctx, &mut host, &mut logger, &crypto_primitives).is_ok());
        claim!(host.state().is_successful());

        // Without the flag the same setup has to wait.
        let mut host = host_with_status(default_config(), SaleStatus::Active);
        whitelist(&mut host, ALICE, AllocationTier::Guaranteed);
        whitelist(&mut host, BOB, AllocationTier::Guaranteed);
        invest(&mut host, ALICE, 50_000, SALE_START).unwrap_abort();
        invest(&mut host, BOB, 50_000, SALE_START).unwrap_abort();
        let mut logger = TestLogger::init();
        claim_eq!(
            contract_finalize(&ctx, &mut host, &mut logger, &crypto_primitives)
                .expect_err_report("flag disabled"),
            CustomContractError::SaleNotEnded.into()
        );
    }

    #[concordium_test]
    /// A successful finalization fixes token allocations at the floor of
    /// invested over price and seeds one non-revocable schedule each.
    fn test_finalize_success_seeds_schedules() {
        let mut host = host_with_status(default_config(), SaleStatus::Active);
        whitelist(&mut host, ALICE, AllocationTier::Guaranteed);
        whitelist(&mut host, BOB, AllocationTier::Guaranteed);
        invest(&mut host, ALICE, 50_000, SALE_START).unwrap_abort();
        // 333 / 5 floors to 66 tokens.
        invest(&mut host, BOB, 333, SALE_START).unwrap_abort();

        let finalized_at = SALE_END + 1;
        let ctx = receive_ctx(OWNER_ACC, finalized_at);
        let mut logger = TestLogger::init();
        let crypto_primitives = TestCryptoPrimitives::new();
        claim!(contract_finalize(&ctx, &mut host, &mut logger, &crypto_primitives).is_ok());

        let state = host.state();
        claim_eq!(state.status, SaleStatus::Finalized);
        claim!(state.is_successful());
        claim_eq!(state.investors.get(&ALICE).unwrap_abort().token_allocation.0, 10_000);
        claim_eq!(state.investors.get(&BOB).unwrap_abort().token_allocation.0, 66);
        claim_eq!(state.vesting.reserved().0, 10_066);

        let alice_ids = state.vesting.schedules_of(&ALICE);
        claim_eq!(alice_ids.len(), 1);
        let schedule = state.vesting.schedule(&alice_ids[0]).unwrap_abort();
        claim_eq!(schedule.total_amount.0, 10_000);
        claim_eq!(schedule.tge_amount.0, 2_000);
        claim_eq!(
            schedule.start_time,
            Timestamp::from_timestamp_millis(finalized_at)
        );
        claim!(!schedule.revocable);

        // Two schedule events plus the closing summary.
        claim_eq!(logger.logs.len(), 3);
        claim_eq!(
            logger.logs[2],
            to_bytes(&LaunchEvent::SaleFinalized(SaleFinalizedEvent {
                total_raised: Amount::from_micro_ccd(50_333),
                success: true,
            }))
        );

        claim_eq!(
            contract_finalize(&ctx, &mut host, &mut logger, &crypto_primitives)
                .expect_err_report("already settled"),
            CustomContractError::AlreadyFinalized.into()
        );
    }

    #[concordium_test]
    /// A stake worth less than one whole token gets no schedule.
    fn test_finalize_skips_dust_allocations() {
        let mut config = default_config();
        config.token_price = 200_000;
        config.soft_cap = Amount::from_micro_ccd(100);
        let mut host = host_with_status(config, SaleStatus::Active);
        whitelist(&mut host, ALICE, AllocationTier::Guaranteed);
        invest(&mut host, ALICE, 100, SALE_START).unwrap_abort();

        let ctx = receive_ctx(OWNER_ACC, SALE_END + 1);
        let mut logger = TestLogger::init();
        let crypto_primitives = TestCryptoPrimitives::new();
        claim!(contract_finalize(&ctx, &mut host, &mut logger, &crypto_primitives).is_ok());

        claim!(host.state().is_successful());
        claim!(host.state().vesting.schedules_of(&ALICE).is_empty());
        claim_eq!(host.state().vesting.reserved().0, 0);
    }

    #[concordium_test]
    fn test_finalize_below_soft_cap_creates_nothing() {
        let mut host = host_with_status(default_config(), SaleStatus::Active);
        whitelist(&mut host, ALICE, AllocationTier::Guaranteed);
        invest(&mut host, ALICE, 10_000, SALE_START).unwrap_abort();

        let ctx = receive_ctx(OWNER_ACC, SALE_END + 1);
        let mut logger = TestLogger::init();
        let crypto_primitives = TestCryptoPrimitives::new();
        claim!(contract_finalize(&ctx, &mut host, &mut logger, &crypto_primitives).is_ok());

        claim!(!host.state().is_successful());
        claim!(host.state().vesting.schedules_of(&ALICE).is_empty());
        claim_eq!(logger.logs.len(), 1);
        claim_eq!(
            logger.logs[0],
            to_bytes(&LaunchEvent::SaleFinalized(SaleFinalizedEvent {
                total_raised: Amount::from_micro_ccd(10_000),
                success: false,
            }))
        );
    }

    #[concordium_test]
    fn test_cancel_only_before_settlement() {
        let mut host = host_with_status(default_config(), SaleStatus::Pending);
        let ctx = receive_ctx(OWNER_ACC, SALE_START);
        claim!(contract_cancel_sale(&ctx, &mut host).is_ok());
        claim_eq!(host.state().status, SaleStatus::Cancelled);

        let mut host = host_with_status(default_config(), SaleStatus::Finalized);
        claim_eq!(
            contract_cancel_sale(&ctx, &mut host).expect_err_report("already settled"),
            CustomContractError::AlreadyFinalized.into()
        );
    }

    #[concordium_test]
    fn test_emergency_withdraw_paths() {
        // Cancelled sale: sweep immediately.
        let mut host = host_with_status(default_config(), SaleStatus::Cancelled);
        host.set_self_balance(Amount::from_micro_ccd(5_000));
        let parameter_bytes = to_bytes(&BOB);
        let mut ctx = receive_ctx(OWNER_ACC, SALE_END + 1);
        ctx.set_parameter(&parameter_bytes);
        claim!(contract_emergency_withdraw(&ctx, &mut host).is_ok());
        claim_eq!(host.get_transfers(), [(BOB, Amount::from_micro_ccd(5_000))]);

        // Failed sale: only after the grace period.
        let mut host = host_with_status(default_config(), SaleStatus::Active);
        whitelist(&mut host, ALICE, AllocationTier::Guaranteed);
        invest(&mut host, ALICE, 10_000, SALE_START).unwrap_abort();
        let finalize_ctx = receive_ctx(OWNER_ACC, SALE_END + 1);
        let mut logger = TestLogger::init();
        let crypto_primitives = TestCryptoPrimitives::new();
        contract_finalize(&finalize_ctx, &mut host, &mut logger, &crypto_primitives)
            .unwrap_abort();
        host.set_self_balance(Amount::from_micro_ccd(10_000));

        let mut early_ctx = receive_ctx(OWNER_ACC, SALE_END + 2);
        early_ctx.set_parameter(&parameter_bytes);
        claim_eq!(
            contract_emergency_withdraw(&early_ctx, &mut host)
                .expect_err_report("inside the grace period"),
            CustomContractError::ColdPeriod.into()
        );

        let mut late_ctx = receive_ctx(OWNER_ACC, SALE_END + 7 * DAY + 2);
        late_ctx.set_parameter(&parameter_bytes);
        claim!(contract_emergency_withdraw(&late_ctx, &mut host).is_ok());

        // Successful sale: never.
        let mut host = successful_sale(&[(ALICE, 50_000)]);
        host.set_self_balance(Amount::from_micro_ccd(50_000));
        let mut ctx = receive_ctx(OWNER_ACC, SALE_END + 100 * DAY);
        ctx.set_parameter(&parameter_bytes);
        claim_eq!(
            contract_emergency_withdraw(&ctx, &mut host).expect_err_report("sale succeeded"),
            CustomContractError::Inappropriate.into()
        );
    }

    #[concordium_test]
    /// Schedules seeded by finalization cannot be revoked.
    fn test_revoke_rejects_sale_schedules() {
        let mut host = successful_sale(&[(ALICE, 50_000)]);
        let schedule_id = host.state().vesting.schedules_of(&ALICE)[0];

        let parameter_bytes = to_bytes(&schedule_id);
        let mut ctx = receive_ctx(OWNER_ACC, SALE_END + 2);
        ctx.set_parameter(&parameter_bytes);
        let mut logger = TestLogger::init();
        claim_eq!(
            contract_revoke(&ctx, &mut host, &mut logger).expect_err_report("not revocable"),
            CustomContractError::NotRevocable.into()
        );
    }

    #[concordium_test]
    fn test_pause_toggles() {
        let mut host = host_with_status(default_config(), SaleStatus::Active);
        let ctx = receive_ctx(OWNER_ACC, SALE_START);
        claim!(contract_set_paused(&ctx, &mut host).is_ok());
        claim!(host.state().paused);
        claim!(contract_set_unpaused(&ctx, &mut host).is_ok());
        claim!(!host.state().paused);
    }
}
