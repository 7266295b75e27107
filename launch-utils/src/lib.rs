use concordium_std::{
    collections::BTreeMap, fmt::Debug, schema, AccountAddress, Amount, SchemaType, Serial, Write,
};

pub mod error;
pub mod math;
pub mod transfer;
pub mod types;
pub mod vesting;

use types::{ContractTokenAmount, ScheduleId};

/// Default per-wallet allocation caps in micro payment units, by tier.
pub const TIER_CAP_BRONZE: u64 = 1_000_000_000; // 1_000
pub const TIER_CAP_SILVER: u64 = 5_000_000_000; // 5_000
pub const TIER_CAP_GOLD: u64 = 10_000_000_000; // 10_000
pub const TIER_CAP_PLATINUM: u64 = 25_000_000_000; // 25_000
/// Guaranteed tier is only bounded by the sale's own caps.
pub const TIER_CAP_GUARANTEED: u64 = u64::MAX;

// ---------------------------------------
// Event tags. Field order and naming are consumed by an external
// indexer and must stay stable.

pub const INVESTMENT_EVENT_TAG: u8 = 1u8;
pub const SALE_FINALIZED_EVENT_TAG: u8 = 2u8;
pub const REFUNDED_EVENT_TAG: u8 = 3u8;
pub const TOKENS_CLAIMED_EVENT_TAG: u8 = 4u8;
pub const SCHEDULE_CREATED_EVENT_TAG: u8 = 5u8;
pub const TOKENS_RELEASED_EVENT_TAG: u8 = 6u8;
pub const SCHEDULE_REVOKED_EVENT_TAG: u8 = 7u8;
#[cfg(feature = "beneficiary-transfer")]
pub const BENEFICIARY_TRANSFERRED_EVENT_TAG: u8 = 8u8;

/// A new investment was recorded by the sale pool.
#[derive(Debug, Serial, SchemaType)]
pub struct InvestmentEvent {
    pub investor: AccountAddress,
    pub amount: Amount,
}

/// The sale was finalized, successfully or not.
#[derive(Debug, Serial, SchemaType)]
pub struct SaleFinalizedEvent {
    pub total_raised: Amount,
    pub success: bool,
}

/// An investor of a failed sale got their payment back.
#[derive(Debug, Serial, SchemaType)]
pub struct RefundedEvent {
    pub investor: AccountAddress,
    pub amount: Amount,
}

/// Total sale tokens handed to an investor in one claim call.
#[derive(Debug, Serial, SchemaType)]
pub struct TokensClaimedEvent {
    pub investor: AccountAddress,
    pub amount: ContractTokenAmount,
}

#[derive(Debug, Serial, SchemaType)]
pub struct VestingScheduleCreatedEvent {
    pub schedule_id: ScheduleId,
    pub beneficiary: AccountAddress,
    pub total_amount: ContractTokenAmount,
}

/// Tokens released from a single vesting schedule.
#[derive(Debug, Serial, SchemaType)]
pub struct TokensReleasedEvent {
    pub beneficiary: AccountAddress,
    pub amount: ContractTokenAmount,
}

#[derive(Debug, Serial, SchemaType)]
pub struct VestingScheduleRevokedEvent {
    pub schedule_id: ScheduleId,
}

#[cfg(feature = "beneficiary-transfer")]
#[derive(Debug, Serial, SchemaType)]
pub struct BeneficiaryTransferredEvent {
    pub schedule_id: ScheduleId,
    pub old_beneficiary: AccountAddress,
    pub new_beneficiary: AccountAddress,
}

/// Tagged events to be serialized for the event log.
#[derive(Debug)]
pub enum LaunchEvent {
    Investment(InvestmentEvent),
    SaleFinalized(SaleFinalizedEvent),
    Refunded(RefundedEvent),
    TokensClaimed(TokensClaimedEvent),
    ScheduleCreated(VestingScheduleCreatedEvent),
    TokensReleased(TokensReleasedEvent),
    ScheduleRevoked(VestingScheduleRevokedEvent),
    #[cfg(feature = "beneficiary-transfer")]
    BeneficiaryTransferred(BeneficiaryTransferredEvent),
}

impl Serial for LaunchEvent {
    fn serial<W: Write>(&self, out: &mut W) -> Result<(), W::Err> {
        match self {
            LaunchEvent::Investment(event) => {
                out.write_u8(INVESTMENT_EVENT_TAG)?;
                event.serial(out)
            }
            LaunchEvent::SaleFinalized(event) => {
                out.write_u8(SALE_FINALIZED_EVENT_TAG)?;
                event.serial(out)
            }
            LaunchEvent::Refunded(event) => {
                out.write_u8(REFUNDED_EVENT_TAG)?;
                event.serial(out)
            }
            LaunchEvent::TokensClaimed(event) => {
                out.write_u8(TOKENS_CLAIMED_EVENT_TAG)?;
                event.serial(out)
            }
            LaunchEvent::ScheduleCreated(event) => {
                out.write_u8(SCHEDULE_CREATED_EVENT_TAG)?;
                event.serial(out)
            }
            LaunchEvent::TokensReleased(event) => {
                out.write_u8(TOKENS_RELEASED_EVENT_TAG)?;
                event.serial(out)
            }
            LaunchEvent::ScheduleRevoked(event) => {
                out.write_u8(SCHEDULE_REVOKED_EVENT_TAG)?;
                event.serial(out)
            }
            #[cfg(feature = "beneficiary-transfer")]
            LaunchEvent::BeneficiaryTransferred(event) => {
                out.write_u8(BENEFICIARY_TRANSFERRED_EVENT_TAG)?;
                event.serial(out)
            }
        }
    }
}

impl schema::SchemaType for LaunchEvent {
    fn get_type() -> schema::Type {
        let mut event_map = BTreeMap::new();
        event_map.insert(
            INVESTMENT_EVENT_TAG,
            (
                "Investment".to_string(),
                schema::Fields::Named(vec![
                    (String::from("investor"), AccountAddress::get_type()),
                    (String::from("amount"), Amount::get_type()),
                ]),
            ),
        );
        event_map.insert(
            SALE_FINALIZED_EVENT_TAG,
            (
                "SaleFinalized".to_string(),
                schema::Fields::Named(vec![
                    (String::from("total_raised"), Amount::get_type()),
                    (String::from("success"), bool::get_type()),
                ]),
            ),
        );
        event_map.insert(
            REFUNDED_EVENT_TAG,
            (
                "Refunded".to_string(),
                schema::Fields::Named(vec![
                    (String::from("investor"), AccountAddress::get_type()),
                    (String::from("amount"), Amount::get_type()),
                ]),
            ),
        );
        event_map.insert(
            TOKENS_CLAIMED_EVENT_TAG,
            (
                "TokensClaimed".to_string(),
                schema::Fields::Named(vec![
                    (String::from("investor"), AccountAddress::get_type()),
                    (String::from("amount"), ContractTokenAmount::get_type()),
                ]),
            ),
        );
        event_map.insert(
            SCHEDULE_CREATED_EVENT_TAG,
            (
                "VestingScheduleCreated".to_string(),
                schema::Fields::Named(vec![
                    (String::from("schedule_id"), ScheduleId::get_type()),
                    (String::from("beneficiary"), AccountAddress::get_type()),
                    (String::from("total_amount"), ContractTokenAmount::get_type()),
                ]),
            ),
        );
        event_map.insert(
            TOKENS_RELEASED_EVENT_TAG,
            (
                "TokensReleased".to_string(),
                schema::Fields::Named(vec![
                    (String::from("beneficiary"), AccountAddress::get_type()),
                    (String::from("amount"), ContractTokenAmount::get_type()),
                ]),
            ),
        );
        event_map.insert(
            SCHEDULE_REVOKED_EVENT_TAG,
            (
                "VestingScheduleRevoked".to_string(),
                schema::Fields::Named(vec![(
                    String::from("schedule_id"),
                    ScheduleId::get_type(),
                )]),
            ),
        );
        #[cfg(feature = "beneficiary-transfer")]
        event_map.insert(
            BENEFICIARY_TRANSFERRED_EVENT_TAG,
            (
                "BeneficiaryTransferred".to_string(),
                schema::Fields::Named(vec![
                    (String::from("schedule_id"), ScheduleId::get_type()),
                    (String::from("old_beneficiary"), AccountAddress::get_type()),
                    (String::from("new_beneficiary"), AccountAddress::get_type()),
                ]),
            ),
        );
        schema::Type::TaggedEnum(event_map)
    }
}
