//! Vesting ledger: TGE + cliff + linear release accounting.
//!
//! Schedules are addressed by a deterministic id, the sha2-256 hash of the
//! serialized `(beneficiary, index)` pair, where `index` is a per-beneficiary
//! counter that only ever increments. Ids are generated once at creation and
//! never reused. Release history is append-only via `released_amount`.

use crate::error::{ContractError, ContractResult, CustomContractError};
use crate::math;
use crate::types::{ContractTokenAmount, Percentage, ScheduleId};
use concordium_cis2::TokenAmountU64;
use concordium_std::*;

#[derive(Debug, Serialize, SchemaType, Clone, PartialEq, Eq)]
pub struct VestingSchedule {
    pub beneficiary: AccountAddress,
    pub total_amount: ContractTokenAmount,
    pub released_amount: ContractTokenAmount,
    /// Portion releasable immediately at `start_time`.
    pub tge_amount: ContractTokenAmount,
    pub start_time: Timestamp,
    /// No tokens beyond `tge_amount` vest before `start_time + cliff_duration`.
    pub cliff_duration: Duration,
    /// Length of the linear release after the cliff ends.
    pub vesting_duration: Duration,
    pub revocable: bool,
    pub revoked: bool,
    /// Meaningful only once `revoked` is set.
    pub vested_at_revocation: ContractTokenAmount,
}

impl VestingSchedule {
    /// Amount vested at `now`, capped at `vested_at_revocation` once revoked.
    pub fn vested_amount(&self, now: Timestamp) -> ContractResult<ContractTokenAmount> {
        let cliff_end = self
            .start_time
            .checked_add(self.cliff_duration)
            .ok_or_else(|| ContractError::from(CustomContractError::InvalidSchedule))?;

        let raw = if self.vesting_duration.millis() == 0 {
            // No linear phase: everything unlocks at start.
            if now >= self.start_time {
                self.total_amount.0
            } else {
                self.tge_amount.0
            }
        } else if now < cliff_end {
            self.tge_amount.0
        } else {
            let elapsed = cmp::min(
                now.timestamp_millis()
                    .saturating_sub(cliff_end.timestamp_millis()),
                self.vesting_duration.millis(),
            );
            let pool = self.total_amount.0 - self.tge_amount.0;
            let linear = math::mul_div_floor(pool, elapsed, self.vesting_duration.millis())
                .ok_or_else(|| ContractError::from(CustomContractError::OverflowError))?;
            self.tge_amount.0 + linear
        };

        let vested = if self.revoked {
            cmp::min(raw, self.vested_at_revocation.0)
        } else {
            raw
        };
        Ok(TokenAmountU64(vested))
    }

    /// Vested minus already released. `released_amount` can never exceed the
    /// vested amount, so the subtraction cannot underflow.
    pub fn releasable_amount(&self, now: Timestamp) -> ContractResult<ContractTokenAmount> {
        let vested = self.vested_amount(now)?;
        let releasable = vested
            .0
            .checked_sub(self.released_amount.0)
            .ok_or_else(|| ContractError::from(CustomContractError::OverflowError))?;
        Ok(TokenAmountU64(releasable))
    }
}

/// State component holding all vesting schedules of one contract instance.
#[derive(Serial, DeserialWithState, StateClone, Debug)]
#[concordium(state_parameter = "S")]
pub struct VestingLedger<S: HasStateApi> {
    pub schedules: StateMap<ScheduleId, VestingSchedule, S>,
    /// Ids of every schedule a beneficiary currently holds.
    holder_ids: StateMap<AccountAddress, Vec<ScheduleId>, S>,
    /// Next schedule index per beneficiary. Only ever increments.
    next_index: StateMap<AccountAddress, u32, S>,
    /// Tokens still owed across all schedules (total minus released,
    /// minus anything forfeited by revocation).
    reserved: ContractTokenAmount,
}

impl<S: HasStateApi> VestingLedger<S> {
    pub fn new(state_builder: &mut StateBuilder<S>) -> Self {
        VestingLedger {
            schedules: state_builder.new_map(),
            holder_ids: state_builder.new_map(),
            next_index: state_builder.new_map(),
            reserved: TokenAmountU64(0),
        }
    }

    /// Tokens the ledger still owes to beneficiaries.
    pub fn reserved(&self) -> ContractTokenAmount {
        self.reserved
    }

    pub fn schedule(&self, schedule_id: &ScheduleId) -> ContractResult<VestingSchedule> {
        let schedule = self
            .schedules
            .get(schedule_id)
            .ok_or_else(|| ContractError::from(CustomContractError::ScheduleNotFound))?;
        Ok(schedule.clone())
    }

    pub fn schedules_of(&self, beneficiary: &AccountAddress) -> Vec<ScheduleId> {
        self.holder_ids
            .get(beneficiary)
            .map(|ids| ids.clone())
            .unwrap_or_default()
    }

    pub fn releasable_amount(
        &self,
        schedule_id: &ScheduleId,
        now: Timestamp,
    ) -> ContractResult<ContractTokenAmount> {
        self.schedule(schedule_id)?.releasable_amount(now)
    }

    /// Register a new schedule and return its deterministic id.
    /// `tge_percent == 100` is a valid all-at-TGE configuration; cliff and
    /// vesting durations may be zero in that case.
    #[allow(clippy::too_many_arguments)]
    pub fn create_schedule(
        &mut self,
        crypto_primitives: &impl HasCryptoPrimitives,
        beneficiary: AccountAddress,
        total_amount: ContractTokenAmount,
        tge_percent: Percentage,
        start_time: Timestamp,
        cliff_duration: Duration,
        vesting_duration: Duration,
        revocable: bool,
    ) -> ContractResult<ScheduleId> {
        ensure!(total_amount.0 > 0, CustomContractError::ZeroAmount.into());
        ensure!(
            tge_percent > 0 && tge_percent <= 100,
            CustomContractError::InvalidPercentage.into()
        );
        ensure!(
            start_time.checked_add(cliff_duration).is_some(),
            CustomContractError::InvalidSchedule.into()
        );

        let tge_amount = math::mul_pct_floor(total_amount.0, tge_percent)
            .ok_or_else(|| ContractError::from(CustomContractError::OverflowError))?;
        let reserved = self
            .reserved
            .0
            .checked_add(total_amount.0)
            .ok_or_else(|| ContractError::from(CustomContractError::OverflowError))?;

        let index = {
            let mut next = self.next_index.entry(beneficiary).or_insert_with(|| 0u32);
            let index = *next;
            *next += 1;
            index
        };
        let schedule_id = crypto_primitives.hash_sha2_256(&to_bytes(&(beneficiary, index)));

        let previous = self.schedules.insert(
            schedule_id,
            VestingSchedule {
                beneficiary,
                total_amount,
                released_amount: TokenAmountU64(0),
                tge_amount: TokenAmountU64(tge_amount),
                start_time,
                cliff_duration,
                vesting_duration,
                revocable,
                revoked: false,
                vested_at_revocation: TokenAmountU64(0),
            },
        );
        ensure!(previous.is_none(), CustomContractError::InvalidInput.into());

        let mut ids = self.holder_ids.entry(beneficiary).or_insert_with(Vec::new);
        ids.push(schedule_id);
        drop(ids);

        self.reserved = TokenAmountU64(reserved);
        Ok(schedule_id)
    }

    /// Debit the releasable amount from a schedule. The caller performs the
    /// actual transfer to the returned beneficiary *after* this returns.
    pub fn release(
        &mut self,
        schedule_id: &ScheduleId,
        now: Timestamp,
    ) -> ContractResult<(AccountAddress, ContractTokenAmount)> {
        let (beneficiary, releasable) = {
            let mut schedule = self
                .schedules
                .get_mut(schedule_id)
                .ok_or_else(|| ContractError::from(CustomContractError::ScheduleNotFound))?;
            let releasable = schedule.releasable_amount(now)?;
            ensure!(
                releasable.0 > 0,
                CustomContractError::NothingToRelease.into()
            );
            schedule.released_amount = TokenAmountU64(schedule.released_amount.0 + releasable.0);
            (schedule.beneficiary, releasable)
        };
        self.reserved = TokenAmountU64(self.reserved.0 - releasable.0);
        Ok((beneficiary, releasable))
    }

    /// Debit every schedule of `beneficiary` that has something releasable.
    /// Schedules with nothing to release right now are skipped, so the
    /// returned list may be empty.
    pub fn release_all(
        &mut self,
        beneficiary: &AccountAddress,
        now: Timestamp,
    ) -> ContractResult<Vec<(ScheduleId, ContractTokenAmount)>> {
        let ids = self.schedules_of(beneficiary);
        let mut released = Vec::new();
        for schedule_id in ids {
            let amount = {
                let mut schedule = self
                    .schedules
                    .get_mut(&schedule_id)
                    .ok_or_else(|| ContractError::from(CustomContractError::ScheduleNotFound))?;
                let releasable = schedule.releasable_amount(now)?;
                if releasable.0 == 0 {
                    continue;
                }
                schedule.released_amount =
                    TokenAmountU64(schedule.released_amount.0 + releasable.0);
                releasable
            };
            self.reserved = TokenAmountU64(self.reserved.0 - amount.0);
            released.push((schedule_id, amount));
        }
        Ok(released)
    }

    /// Freeze the vested amount of a revocable schedule at `now`. The
    /// releasable amount can never increase again afterwards.
    pub fn revoke(&mut self, schedule_id: &ScheduleId, now: Timestamp) -> ContractResult<()> {
        let forfeited = {
            let mut schedule = self
                .schedules
                .get_mut(schedule_id)
                .ok_or_else(|| ContractError::from(CustomContractError::ScheduleNotFound))?;
            ensure!(schedule.revocable, CustomContractError::NotRevocable.into());
            ensure!(!schedule.revoked, CustomContractError::AlreadyRevoked.into());
            let vested = schedule.vested_amount(now)?;
            schedule.revoked = true;
            schedule.vested_at_revocation = vested;
            schedule.total_amount.0 - vested.0
        };
        self.reserved = TokenAmountU64(self.reserved.0 - forfeited);
        Ok(())
    }

    /// Hand a schedule over to a new beneficiary. `caller` must be the
    /// current beneficiary.
    #[cfg(feature = "beneficiary-transfer")]
    pub fn transfer_beneficiary(
        &mut self,
        schedule_id: &ScheduleId,
        caller: AccountAddress,
        new_beneficiary: AccountAddress,
    ) -> ContractResult<AccountAddress> {
        let old_beneficiary = {
            let mut schedule = self
                .schedules
                .get_mut(schedule_id)
                .ok_or_else(|| ContractError::from(CustomContractError::ScheduleNotFound))?;
            ensure!(schedule.beneficiary == caller, ContractError::Unauthorized);
            let old = schedule.beneficiary;
            schedule.beneficiary = new_beneficiary;
            old
        };
        if let Some(mut ids) = self.holder_ids.get_mut(&old_beneficiary) {
            ids.retain(|id| id != schedule_id);
        }
        let mut ids = self
            .holder_ids
            .entry(new_beneficiary)
            .or_insert_with(Vec::new);
        ids.push(*schedule_id);
        Ok(old_beneficiary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concordium_std::test_infrastructure::*;

    const ALICE: AccountAddress = AccountAddress([10u8; 32]);
    const BOB: AccountAddress = AccountAddress([11u8; 32]);

    const DAY: u64 = 24 * 60 * 60 * 1000;

    fn ledger() -> (VestingLedger<TestStateApi>, TestCryptoPrimitives) {
        let mut state_builder = TestStateBuilder::new();
        (
            VestingLedger::new(&mut state_builder),
            TestCryptoPrimitives::new(),
        )
    }

    /// 10000 total, 20% TGE, 30 day cliff, 180 day linear vesting.
    fn reference_schedule(
        ledger: &mut VestingLedger<TestStateApi>,
        crypto: &TestCryptoPrimitives,
        revocable: bool,
    ) -> ScheduleId {
        ledger
            .create_schedule(
                crypto,
                ALICE,
                TokenAmountU64(10_000),
                20,
                Timestamp::from_timestamp_millis(0),
                Duration::from_days(30),
                Duration::from_days(180),
                revocable,
            )
            .unwrap()
    }

    #[test]
    fn reference_curve() {
        let (mut ledger, crypto) = ledger();
        let id = reference_schedule(&mut ledger, &crypto, false);

        let releasable = |millis: u64| {
            ledger
                .releasable_amount(&id, Timestamp::from_timestamp_millis(millis))
                .unwrap()
                .0
        };

        // TGE portion only, anywhere before the cliff ends.
        assert_eq!(releasable(0), 2_000);
        assert_eq!(releasable(29 * DAY), 2_000);
        assert_eq!(releasable(30 * DAY - 1), 2_000);
        // Half of the linear pool at cliff + 90d.
        assert_eq!(releasable(30 * DAY + 90 * DAY), 6_000);
        // Everything once the vesting period is over.
        assert_eq!(releasable(30 * DAY + 180 * DAY + 1_000), 10_000);
    }

    #[test]
    fn vested_is_monotone_and_bounded() {
        let (mut ledger, crypto) = ledger();
        let id = reference_schedule(&mut ledger, &crypto, false);
        let schedule = ledger.schedule(&id).unwrap();

        let mut previous = 0u64;
        for step in 0..500u64 {
            let now = Timestamp::from_timestamp_millis(step * DAY / 2);
            let vested = schedule.vested_amount(now).unwrap().0;
            assert!(vested >= previous, "vested must never decrease");
            assert!(vested <= schedule.total_amount.0);
            previous = vested;
        }
        assert_eq!(previous, 10_000);
    }

    #[test]
    fn release_is_idempotent_without_time_passing() {
        let (mut ledger, crypto) = ledger();
        let id = reference_schedule(&mut ledger, &crypto, false);
        let now = Timestamp::from_timestamp_millis(30 * DAY + 90 * DAY);

        let (beneficiary, amount) = ledger.release(&id, now).unwrap();
        assert_eq!(beneficiary, ALICE);
        assert_eq!(amount.0, 6_000);
        assert_eq!(ledger.releasable_amount(&id, now).unwrap().0, 0);

        let second = ledger.release(&id, now);
        assert_eq!(
            second.expect_err_report("second release must fail"),
            CustomContractError::NothingToRelease.into()
        );
        // Nothing was debited by the failed call.
        assert_eq!(ledger.schedule(&id).unwrap().released_amount.0, 6_000);
    }

    #[test]
    fn revocation_freezes_releasable() {
        let (mut ledger, crypto) = ledger();
        let id = reference_schedule(&mut ledger, &crypto, true);
        let revoke_at = Timestamp::from_timestamp_millis(30 * DAY + 90 * DAY);

        ledger.revoke(&id, revoke_at).unwrap();
        let frozen = ledger.releasable_amount(&id, revoke_at).unwrap().0;
        assert_eq!(frozen, 6_000);

        for extra_days in [1u64, 90, 400] {
            let later =
                Timestamp::from_timestamp_millis(30 * DAY + (90 + extra_days) * DAY);
            assert_eq!(ledger.releasable_amount(&id, later).unwrap().0, frozen);
        }

        // The frozen amount can still be released, once.
        let far_future = Timestamp::from_timestamp_millis(1_000 * DAY);
        let (_, amount) = ledger.release(&id, far_future).unwrap();
        assert_eq!(amount.0, frozen);
        assert_eq!(
            ledger
                .release(&id, far_future)
                .expect_err_report("nothing left after the frozen amount"),
            CustomContractError::NothingToRelease.into()
        );
    }

    #[test]
    fn revoke_rejections() {
        let (mut ledger, crypto) = ledger();
        let not_revocable = reference_schedule(&mut ledger, &crypto, false);
        let revocable = reference_schedule(&mut ledger, &crypto, true);
        let now = Timestamp::from_timestamp_millis(10 * DAY);

        assert_eq!(
            ledger
                .revoke(&not_revocable, now)
                .expect_err_report("non-revocable schedule"),
            CustomContractError::NotRevocable.into()
        );

        ledger.revoke(&revocable, now).unwrap();
        assert_eq!(
            ledger
                .revoke(&revocable, now)
                .expect_err_report("double revoke"),
            CustomContractError::AlreadyRevoked.into()
        );
    }

    #[test]
    fn create_schedule_validation() {
        let (mut ledger, crypto) = ledger();
        let start = Timestamp::from_timestamp_millis(0);
        let day = Duration::from_days(1);

        let zero_amount = ledger.create_schedule(
            &crypto,
            ALICE,
            TokenAmountU64(0),
            20,
            start,
            day,
            day,
            false,
        );
        assert_eq!(
            zero_amount.expect_err_report("zero amount"),
            CustomContractError::ZeroAmount.into()
        );

        for bad_pct in [0u8, 101] {
            let result = ledger.create_schedule(
                &crypto,
                ALICE,
                TokenAmountU64(100),
                bad_pct,
                start,
                day,
                day,
                false,
            );
            assert_eq!(
                result.expect_err_report("bad percentage"),
                CustomContractError::InvalidPercentage.into()
            );
        }

        // 100% at TGE with no cliff and no vesting is a valid configuration.
        let id = ledger
            .create_schedule(
                &crypto,
                ALICE,
                TokenAmountU64(100),
                100,
                start,
                Duration::from_millis(0),
                Duration::from_millis(0),
                false,
            )
            .unwrap();
        assert_eq!(ledger.releasable_amount(&id, start).unwrap().0, 100);
    }

    #[test]
    fn schedule_ids_are_deterministic_and_unique() {
        let (mut ledger, crypto) = ledger();
        let first = reference_schedule(&mut ledger, &crypto, false);
        let second = reference_schedule(&mut ledger, &crypto, false);
        assert_ne!(first, second, "same beneficiary, distinct index");

        assert_eq!(first, crypto.hash_sha2_256(&to_bytes(&(ALICE, 0u32))));
        assert_eq!(second, crypto.hash_sha2_256(&to_bytes(&(ALICE, 1u32))));
        assert_eq!(ledger.schedules_of(&ALICE), vec![first, second]);
        assert!(ledger.schedules_of(&BOB).is_empty());
    }

    /// Adversarial sweep: random schedules, random release/revoke order,
    /// the reserve and per-schedule bounds must hold throughout.
    #[test]
    fn random_schedules_keep_invariants() {
        let (mut ledger, crypto) = ledger();
        let mut rng: u64 = 0x5eed_1234_dead_beef;
        let mut next = move || {
            rng = rng.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            rng >> 33
        };

        let mut ids = Vec::new();
        let mut expected_reserved: u64 = 0;
        for i in 0..40u64 {
            let total = next() % 1_000_000 + 1;
            let pct = (next() % 100 + 1) as u8;
            let beneficiary = AccountAddress([(i % 7) as u8 + 50; 32]);
            let id = ledger
                .create_schedule(
                    &crypto,
                    beneficiary,
                    TokenAmountU64(total),
                    pct,
                    Timestamp::from_timestamp_millis(next() % (100 * DAY)),
                    Duration::from_millis(next() % (60 * DAY)),
                    Duration::from_millis(next() % (360 * DAY)),
                    next() % 2 == 0,
                )
                .unwrap();
            expected_reserved += total;
            ids.push(id);
        }
        assert_eq!(ledger.reserved().0, expected_reserved);

        for round in 0..200u64 {
            let now = Timestamp::from_timestamp_millis(round * 3 * DAY + next() % DAY);
            let id = ids[(next() % ids.len() as u64) as usize];
            let schedule = ledger.schedule(&id).unwrap();
            let releasable = schedule.releasable_amount(now).unwrap().0;
            assert!(releasable <= schedule.total_amount.0);

            match next() % 3 {
                0 => {
                    if releasable > 0 {
                        let (_, amount) = ledger.release(&id, now).unwrap();
                        assert_eq!(amount.0, releasable);
                        expected_reserved -= amount.0;
                    }
                }
                1 => {
                    if schedule.revocable && !schedule.revoked {
                        let vested = schedule.vested_amount(now).unwrap().0;
                        ledger.revoke(&id, now).unwrap();
                        expected_reserved -= schedule.total_amount.0 - vested;
                    }
                }
                _ => {}
            }
            assert_eq!(ledger.reserved().0, expected_reserved);

            let after = ledger.schedule(&id).unwrap();
            assert!(after.released_amount.0 >= schedule.released_amount.0);
            assert!(after.released_amount.0 <= after.total_amount.0);
        }
    }

    #[cfg(feature = "beneficiary-transfer")]
    #[test]
    fn beneficiary_transfer_moves_the_schedule() {
        let (mut ledger, crypto) = ledger();
        let id = reference_schedule(&mut ledger, &crypto, false);

        assert_eq!(
            ledger
                .transfer_beneficiary(&id, BOB, BOB)
                .expect_err_report("only the current beneficiary may transfer"),
            ContractError::Unauthorized
        );

        let old = ledger.transfer_beneficiary(&id, ALICE, BOB).unwrap();
        assert_eq!(old, ALICE);
        assert!(ledger.schedules_of(&ALICE).is_empty());
        assert_eq!(ledger.schedules_of(&BOB), vec![id]);

        // Releases now go to the new beneficiary.
        let (beneficiary, _) =
            ledger.release(&id, Timestamp::from_timestamp_millis(0)).unwrap();
        assert_eq!(beneficiary, BOB);
    }
}
