use concordium_cis2::Cis2Error;
use concordium_std::{
    num, CallContractError, LogError, ParseError, Reject, SchemaType, Serialize, TransferError,
    UnwrapAbort,
};
use core::num::TryFromIntError;

pub type ContractResult<A> = Result<A, ContractError>;

/// Authorization failures are reported as `Cis2Error::Unauthorized`,
/// everything else goes through the custom variants below.
pub type ContractError = Cis2Error<CustomContractError>;

/// The different errors the contracts can produce.
#[derive(Serialize, Debug, PartialEq, Eq, Reject, SchemaType)]
pub enum CustomContractError {
    #[from(ParseError)]
    ParseParams, //1
    OverflowError,       //
    InvokeContractError, //
    AmountTooLarge,      //
    MissingAccount,      //5
    MissingContract,     //
    MissingEntrypoint,   //
    MessageFailed,       //
    Trap,                //
    TransferError,       //10
    LogFull,             //
    LogMalformed,        //
    ContractPaused,      //
    AccountOnly,         //
    // validation
    InvalidInput,      //15
    InvalidSchedule,   //
    ZeroAmount,        //
    InvalidPercentage, //
    // sale / schedule state
    SaleNotPending,   //
    SaleNotActive,    //20
    SaleNotEnded,     //
    SaleNotFinalized, //
    AlreadyFinalized, //
    SoftCapMet,       //
    SoftCapNotMet,    //25
    NotRevocable,     //
    AlreadyRevoked,   //
    ColdPeriod,       //
    SaleTokenNotSet,  //
    Inappropriate,    //30
    // capacity
    HardCapReached,     //
    AllocationExceeded, //
    AboveMaxInvestment, //
    BelowMinInvestment, //
    NotWhitelisted,     //35
    InsufficientFunds,  //
    // nothing to do
    NothingToRelease, //
    NoTokensToClaim,  //
    NoInvestment,     //
    AlreadyRefunded,  //40
    ScheduleNotFound, //
}

impl From<CustomContractError> for ContractError {
    fn from(c: CustomContractError) -> Self {
        Cis2Error::Custom(c)
    }
}

impl<T> From<CallContractError<T>> for CustomContractError {
    fn from(cce: CallContractError<T>) -> Self {
        match cce {
            CallContractError::AmountTooLarge => Self::AmountTooLarge,
            CallContractError::MissingAccount => Self::MissingAccount,
            CallContractError::MissingContract => Self::MissingContract,
            CallContractError::MissingEntrypoint => Self::MissingEntrypoint,
            CallContractError::MessageFailed => Self::MessageFailed,
            CallContractError::Trap => Self::Trap,
            CallContractError::LogicReject {
                reason: _,
                return_value: _,
            } => Self::InvokeContractError,
        }
    }
}

impl From<TransferError> for CustomContractError {
    #[inline(always)]
    fn from(te: TransferError) -> Self {
        match te {
            TransferError::AmountTooLarge => Self::AmountTooLarge,
            TransferError::MissingAccount => Self::MissingAccount,
        }
    }
}

impl From<LogError> for CustomContractError {
    #[inline(always)]
    fn from(le: LogError) -> Self {
        match le {
            LogError::Full => Self::LogFull,
            LogError::Malformed => Self::LogMalformed,
        }
    }
}

impl From<TryFromIntError> for CustomContractError {
    #[inline(always)]
    fn from(_: TryFromIntError) -> Self {
        Self::OverflowError
    }
}
