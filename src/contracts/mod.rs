//! Contract bindings for the warp route
//!
//! Alloy-generated bindings with thin wrappers that log every call:
//!
//! - [`Erc20Contract`](erc20::Erc20Contract): USDC balance and router approval
//! - [`CctpAdapterContract`](cctp_adapter::CctpAdapterContract): `transferRemote` and the domain table
//! - [`MailboxContract`](mailbox::MailboxContract): delivery status and `Dispatch` decoding
//! - [`InterchainGasPaymasterContract`](igp::InterchainGasPaymasterContract): gas quotes

pub mod cctp_adapter;
pub mod erc20;
pub mod igp;
pub mod mailbox;
