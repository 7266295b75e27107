//! Value-transfer boundary shared by the sale contracts.
//!
//! Callers must debit their own ledger state *before* invoking anything
//! here; the hosting environment may permit callbacks during a transfer.

use crate::error::{ContractError, ContractResult, CustomContractError};
use crate::types::{ContractTokenAmount, ContractTokenId};
use concordium_cis2::{
    AdditionalData, BalanceOfQuery, BalanceOfQueryParams, BalanceOfQueryResponse, Receiver,
    TokenIdUnit, Transfer, TransferParams,
};
use concordium_std::*;

/// Transfer native payment currency to an account.
pub fn transfer_payment<State, S: HasStateApi>(
    host: &impl HasHost<State, StateApiType = S>,
    to: &AccountAddress,
    amount: Amount,
) -> ContractResult<()> {
    host.invoke_transfer(to, amount)
        .map_err(|_| CustomContractError::TransferError.into())
}

/// Transfer `amount` of the sale token from this contract to `to`.
pub fn transfer_token<State, S: HasStateApi>(
    host: &mut impl HasHost<State, StateApiType = S>,
    token: &ContractAddress,
    own_address: ContractAddress,
    to: AccountAddress,
    amount: ContractTokenAmount,
) -> ContractResult<()> {
    let transfer = Transfer {
        from: Address::from(own_address),
        to: Receiver::from_account(to),
        token_id: TokenIdUnit(),
        amount,
        data: AdditionalData::empty(),
    };
    let _ = host.invoke_contract(
        token,
        &TransferParams::from(vec![transfer]),
        EntrypointName::new_unchecked("transfer"),
        Amount::zero(),
    )?;
    Ok(())
}

/// Query the sale-token balance of `holder`.
pub fn token_balance_of<State, S: HasStateApi>(
    host: &impl HasHost<State, StateApiType = S>,
    token: &ContractAddress,
    holder: Address,
) -> ContractResult<ContractTokenAmount> {
    let params: BalanceOfQueryParams<ContractTokenId> = BalanceOfQueryParams {
        queries: vec![BalanceOfQuery {
            token_id: TokenIdUnit(),
            address: holder,
        }],
    };
    let return_value = host.invoke_contract_read_only(
        token,
        &params,
        EntrypointName::new_unchecked("balanceOf"),
        Amount::zero(),
    )?;
    let mut cursor = return_value.ok_or_else(|| {
        ContractError::from(CustomContractError::InvokeContractError)
    })?;
    let response: BalanceOfQueryResponse<ContractTokenAmount> = cursor
        .get()
        .map_err(|_| ContractError::from(CustomContractError::InvokeContractError))?;
    response
        .0
        .first()
        .copied()
        .ok_or_else(|| CustomContractError::InvokeContractError.into())
}
