use concordium_std::concordium_cfg_test;

#[concordium_cfg_test]
mod tests {
    use crate::sctest::*;
    use crate::state::*;
    use crate::*;
    use concordium_std::test_infrastructure::*;
    use launch_utils::{InvestmentEvent, LaunchEvent};

    #[concordium_test]
    /// Investments accumulate on the record and the pool total together.
    fn test_invest_updates_ledger() {
        let mut host = host_with_status(default_config(), SaleStatus::Active);
        whitelist(&mut host, ALICE, AllocationTier::Gold);

        let ctx = receive_ctx(ALICE, SALE_START + 5);
        let mut logger = TestLogger::init();
        let result = contract_invest(&ctx, &mut host, Amount::from_micro_ccd(10_000), &mut logger);
        claim!(result.is_ok());

        let state = host.state();
        claim_eq!(state.total_raised, Amount::from_micro_ccd(10_000));
        let record = state.investors.get(&ALICE).unwrap_abort();
        claim_eq!(record.invested, Amount::from_micro_ccd(10_000));
        claim_eq!(record.claimed.0, 0);
        claim!(!record.refunded);

        claim_eq!(logger.logs.len(), 1);
        claim_eq!(
            logger.logs[0],
            to_bytes(&LaunchEvent::Investment(InvestmentEvent {
                investor: ALICE,
                amount: Amount::from_micro_ccd(10_000),
            }))
        );

        invest(&mut host, ALICE, 2_000, SALE_START + 6).unwrap_abort();
        claim_eq!(host.state().total_raised, Amount::from_micro_ccd(12_000));
        claim_eq!(
            host.state().investors.get(&ALICE).unwrap_abort().invested,
            Amount::from_micro_ccd(12_000)
        );
    }

    #[concordium_test]
    fn test_invest_gatekeeping() {
        let mut host = host_with_status(default_config(), SaleStatus::Active);

        let unlisted = invest(&mut host, ALICE, 10_000, SALE_START);
        claim_eq!(
            unlisted.expect_err_report("unlisted investor"),
            CustomContractError::NotWhitelisted.into()
        );

        whitelist(&mut host, ALICE, AllocationTier::Gold);
        claim_eq!(
            invest(&mut host, ALICE, 99, SALE_START).expect_err_report("below minimum"),
            CustomContractError::BelowMinInvestment.into()
        );
        claim_eq!(
            invest(&mut host, ALICE, 50_001, SALE_START).expect_err_report("above maximum"),
            CustomContractError::AboveMaxInvestment.into()
        );
        claim_eq!(
            invest(&mut host, ALICE, 10_000, SALE_START - 1).expect_err_report("before opening"),
            CustomContractError::SaleNotActive.into()
        );
        claim_eq!(
            invest(&mut host, ALICE, 10_000, SALE_END + 1).expect_err_report("after closing"),
            CustomContractError::SaleNotActive.into()
        );

        host.state_mut().paused = true;
        claim_eq!(
            invest(&mut host, ALICE, 10_000, SALE_START).expect_err_report("paused"),
            CustomContractError::ContractPaused.into()
        );
        host.state_mut().paused = false;

        host.state_mut().status = SaleStatus::Pending;
        claim_eq!(
            invest(&mut host, ALICE, 10_000, SALE_START).expect_err_report("not active"),
            CustomContractError::SaleNotActive.into()
        );

        // A contract cannot invest.
        host.state_mut().status = SaleStatus::Active;
        let mut ctx = receive_ctx(ALICE, SALE_START);
        ctx.set_sender(Address::Contract(TOKEN_ADDRESS));
        let mut logger = TestLogger::init();
        let result = contract_invest(&ctx, &mut host, Amount::from_micro_ccd(10_000), &mut logger);
        claim_eq!(
            result.expect_err_report("contract sender"),
            CustomContractError::AccountOnly.into()
        );

        claim_eq!(host.state().total_raised, Amount::zero());
    }

    #[concordium_test]
    /// A custom allocation overrides the tier default and bounds the
    /// cumulative, not the per-transaction, amount.
    fn test_allocation_cap_is_cumulative() {
        let mut host = host_with_status(default_config(), SaleStatus::Active);
        whitelist(&mut host, BOB, AllocationTier::Bronze);
        host.state_mut()
            .policy
            .set_custom_allocation(&BOB, Amount::from_micro_ccd(20_000))
            .unwrap_abort();

        invest(&mut host, BOB, 15_000, SALE_START).unwrap_abort();
        // Landing exactly on the cap is allowed.
        invest(&mut host, BOB, 5_000, SALE_START).unwrap_abort();
        claim_eq!(
            invest(&mut host, BOB, 100, SALE_START).expect_err_report("over the cap"),
            CustomContractError::AllocationExceeded.into()
        );
        claim_eq!(host.state().total_raised, Amount::from_micro_ccd(20_000));
    }

    #[concordium_test]
    /// Filling the hard cap exactly succeeds, one unit more is rejected.
    fn test_hard_cap_boundary() {
        let mut host = host_with_status(default_config(), SaleStatus::Active);
        for investor in [ALICE, BOB, CAROL] {
            whitelist(&mut host, investor, AllocationTier::Guaranteed);
        }

        invest(&mut host, ALICE, 50_000, SALE_START).unwrap_abort();
        invest(&mut host, BOB, 49_900, SALE_START).unwrap_abort();
        invest(&mut host, CAROL, 100, SALE_START).unwrap_abort();
        claim_eq!(host.state().total_raised, default_config().hard_cap);

        claim_eq!(
            invest(&mut host, CAROL, 100, SALE_START).expect_err_report("hard cap is full"),
            CustomContractError::HardCapReached.into()
        );
        claim_eq!(host.state().total_raised, default_config().hard_cap);
    }

    #[concordium_test]
    /// A failed sale refunds each investor exactly what they put in,
    /// exactly once.
    fn test_refund_failed_sale() {
        let mut host = host_with_status(default_config(), SaleStatus::Active);
        whitelist(&mut host, ALICE, AllocationTier::Guaranteed);
        invest(&mut host, ALICE, 10_000, SALE_START).unwrap_abort();

        let ctx = receive_ctx(OWNER_ACC, SALE_END + 1);
        let mut logger = TestLogger::init();
        let crypto_primitives = TestCryptoPrimitives::new();
        contract_finalize(&ctx, &mut host, &mut logger, &crypto_primitives).unwrap_abort();
        claim!(!host.state().is_successful());

        host.set_self_balance(Amount::from_micro_ccd(10_000));
        let ctx = receive_ctx(ALICE, SALE_END + 2);
        let mut logger = TestLogger::init();
        claim!(contract_refund(&ctx, &mut host, &mut logger).is_ok());
        claim_eq!(
            host.get_transfers(),
            [(ALICE, Amount::from_micro_ccd(10_000))]
        );
        claim!(host.state().investors.get(&ALICE).unwrap_abort().refunded);

        let mut logger = TestLogger::init();
        claim_eq!(
            contract_refund(&ctx, &mut host, &mut logger).expect_err_report("second refund"),
            CustomContractError::AlreadyRefunded.into()
        );

        let ctx = receive_ctx(BOB, SALE_END + 2);
        let mut logger = TestLogger::init();
        claim_eq!(
            contract_refund(&ctx, &mut host, &mut logger).expect_err_report("never invested"),
            CustomContractError::NoInvestment.into()
        );
    }

    #[concordium_test]
    fn test_refund_rejected_after_success() {
        let mut host = successful_sale(&[(ALICE, 50_000)]);
        let ctx = receive_ctx(ALICE, SALE_END + 2);
        let mut logger = TestLogger::init();
        claim_eq!(
            contract_refund(&ctx, &mut host, &mut logger).expect_err_report("sale succeeded"),
            CustomContractError::SoftCapMet.into()
        );
    }

    #[concordium_test]
    /// Refunds are gated on a finalized sale below its soft cap; a
    /// cancelled sale is not refundable, its balance leaves through
    /// `emergencyWithdraw` only.
    fn test_refund_rejected_after_cancellation() {
        let mut host = host_with_status(default_config(), SaleStatus::Active);
        whitelist(&mut host, ALICE, AllocationTier::Gold);
        invest(&mut host, ALICE, 30_000, SALE_START).unwrap_abort();

        let ctx = receive_ctx(OWNER_ACC, SALE_START + 10);
        contract_cancel_sale(&ctx, &mut host).unwrap_abort();

        host.set_self_balance(Amount::from_micro_ccd(30_000));
        let ctx = receive_ctx(ALICE, SALE_START + 11);
        let mut logger = TestLogger::init();
        claim_eq!(
            contract_refund(&ctx, &mut host, &mut logger)
                .expect_err_report("cancelled, not finalized"),
            CustomContractError::SaleNotFinalized.into()
        );
        claim!(host.get_transfers().is_empty());
        claim!(!host.state().investors.get(&ALICE).unwrap_abort().refunded);
    }

    #[concordium_test]
    /// The pause switch blocks refund and claim, not just invest.
    fn test_pause_blocks_refund_and_claim() {
        let mut host = host_with_status(default_config(), SaleStatus::Active);
        whitelist(&mut host, ALICE, AllocationTier::Guaranteed);
        invest(&mut host, ALICE, 10_000, SALE_START).unwrap_abort();
        let ctx = receive_ctx(OWNER_ACC, SALE_END + 1);
        let mut logger = TestLogger::init();
        let crypto_primitives = TestCryptoPrimitives::new();
        contract_finalize(&ctx, &mut host, &mut logger, &crypto_primitives).unwrap_abort();
        host.set_self_balance(Amount::from_micro_ccd(10_000));

        host.state_mut().paused = true;
        let ctx = receive_ctx(ALICE, SALE_END + 2);
        let mut logger = TestLogger::init();
        claim_eq!(
            contract_refund(&ctx, &mut host, &mut logger).expect_err_report("paused"),
            CustomContractError::ContractPaused.into()
        );
        claim!(host.get_transfers().is_empty());

        let mut host = successful_sale(&[(ALICE, 50_000)]);
        host.state_mut().paused = true;
        let ctx = receive_ctx(ALICE, SALE_END + 2);
        let mut logger = TestLogger::init();
        claim_eq!(
            contract_claim(&ctx, &mut host, &mut logger).expect_err_report("paused"),
            CustomContractError::ContractPaused.into()
        );

        // Unpausing restores the flow.
        host.state_mut().paused = false;
        let mut logger = TestLogger::init();
        claim!(contract_claim(&ctx, &mut host, &mut logger).is_ok());
        claim_eq!(
            host.state().investors.get(&ALICE).unwrap_abort().claimed.0,
            2_000
        );
    }

    #[concordium_test]
    /// 50_000 micro at price 5 buys 10_000 tokens: 2_000 at TGE, 6_000
    /// half way through vesting, all of it after the vesting end.
    fn test_claim_follows_vesting_curve() {
        let mut host = successful_sale(&[(ALICE, 50_000)]);
        let finalized_at = SALE_END + 1;

        let claimed = |host: &TestHost<State<TestStateApi>>| {
            host.state().investors.get(&ALICE).unwrap_abort().claimed.0
        };

        let ctx = receive_ctx(ALICE, finalized_at + 1);
        let mut logger = TestLogger::init();
        claim!(contract_claim(&ctx, &mut host, &mut logger).is_ok());
        claim_eq!(claimed(&host), 2_000);

        // Nothing more accrues without time passing.
        let mut logger = TestLogger::init();
        claim_eq!(
            contract_claim(&ctx, &mut host, &mut logger).expect_err_report("nothing accrued"),
            CustomContractError::NothingToRelease.into()
        );
        claim_eq!(claimed(&host), 2_000);

        let halfway = finalized_at + 30 * DAY + 90 * DAY;
        let ctx = receive_ctx(ALICE, halfway);
        let mut logger = TestLogger::init();
        claim!(contract_claim(&ctx, &mut host, &mut logger).is_ok());
        claim_eq!(claimed(&host), 6_000);

        let past_end = finalized_at + 30 * DAY + 180 * DAY + 1_000;
        let ctx = receive_ctx(ALICE, past_end);
        let mut logger = TestLogger::init();
        claim!(contract_claim(&ctx, &mut host, &mut logger).is_ok());
        claim_eq!(claimed(&host), 10_000);
        claim_eq!(host.state().vesting.reserved().0, 0);
    }

    #[concordium_test]
    fn test_claim_requires_schedules() {
        let mut host = successful_sale(&[(ALICE, 50_000)]);
        let ctx = receive_ctx(BOB, SALE_END + 2);
        let mut logger = TestLogger::init();
        claim_eq!(
            contract_claim(&ctx, &mut host, &mut logger).expect_err_report("no schedules"),
            CustomContractError::NoTokensToClaim.into()
        );
    }

    #[concordium_test]
    fn test_claim_requires_sale_token() {
        let mut host = successful_sale(&[(ALICE, 50_000)]);
        host.state_mut().sale_token = None;
        let ctx = receive_ctx(ALICE, SALE_END + 2);
        let mut logger = TestLogger::init();
        claim_eq!(
            contract_claim(&ctx, &mut host, &mut logger).expect_err_report("token not set"),
            CustomContractError::SaleTokenNotSet.into()
        );
    }

    #[concordium_test]
    /// Random investment sequences never break the cap invariant or the
    /// ledger consistency (sum of records equals the pool total).
    fn test_random_investments_keep_ledger_consistent() {
        let mut host = host_with_status(default_config(), SaleStatus::Active);
        let investors = [ALICE, BOB, CAROL];
        for investor in investors {
            whitelist(&mut host, investor, AllocationTier::Guaranteed);
        }

        let mut rng: u64 = 0x00c0_ffee_0bad_f00d;
        let mut next = move || {
            rng = rng
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            rng >> 33
        };

        let mut expected: [u64; 3] = [0; 3];
        for _ in 0..60 {
            let pick = (next() % 3) as usize;
            let micro = 100 + next() % 1_900;
            match invest(&mut host, investors[pick], micro, SALE_START + 1) {
                Ok(()) => expected[pick] += micro,
                Err(rejection) => {
                    claim_eq!(rejection, CustomContractError::HardCapReached.into());
                }
            }

            let state = host.state();
            claim!(state.total_raised <= state.config.hard_cap);
            let mut sum = 0u64;
            for (_, record) in state.investors.iter() {
                sum += record.invested.micro_ccd;
            }
            claim_eq!(sum, state.total_raised.micro_ccd);
        }

        for (pick, investor) in investors.iter().enumerate() {
            let invested = host
                .state()
                .investors
                .get(investor)
                .map(|record| record.invested.micro_ccd)
                .unwrap_or(0);
            claim_eq!(invested, expected[pick]);
        }
    }
}
