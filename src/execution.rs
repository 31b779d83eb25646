// Copyright 2024 The ethcore-chain Authors.
// This file is part of ethcore-chain.

// ethcore-chain is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// ethcore-chain is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with ethcore-chain.  If not, see <http://www.gnu.org/licenses/>.

//! The execution-layer contract this crate consumes (`spec.md` §6).
//!
//! Transaction application, receipt construction, the state trie and
//! difficulty/gas-limit formulas all live outside this crate. `ExecutionBackend`
//! is the seam: an embedder supplies a concrete implementation (a real EVM,
//! or -- in tests -- a small deterministic stand-in).

use ethereum_types::{Bloom, H256, U256};

use crate::types::{Block, Header, StateSnapshot, Transaction};

/// The five taxonomized ways a single transaction can fail to apply,
/// per `spec.md` §4.H step 4. Any of these causes the candidate builder to
/// skip the transaction rather than abort the block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxError {
	InsufficientBalance,
	BlockGasLimitReached,
	InsufficientStartGas,
	InvalidNonce,
	UnsignedTransactionError,
}

/// Failure raised by the execution layer while applying a whole block.
/// Surfaced to `add_block` as `Ok(false)`, never propagated as a crate error
/// (`spec.md` §7.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionError(pub String);

impl std::fmt::Display for ExecutionError {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// A single transaction's observable effect, used to build its receipt.
#[derive(Debug, Clone, Default)]
pub struct LogEntry {
	pub address: ethereum_types::Address,
	pub topics: Vec<H256>,
	pub data: Vec<u8>,
}

/// A per-transaction receipt. The core only ever reads `bloom` and
/// `gas_used` directly (`spec.md` §6); everything else is opaque.
#[derive(Debug, Clone)]
pub struct Receipt {
	pub gas_used: U256,
	pub bloom: Bloom,
	pub logs: Vec<LogEntry>,
}

/// World-state, owned by the embedder. The chain manager only ever holds
/// one live instance (`spec.md` invariant 6) and clones/rebuilds it on
/// forks and candidate assembly.
pub trait StateBackend: Clone {
	/// Build state from a genesis or ancestor snapshot (`spec.md` §4.D.1/§4.D.4).
	fn from_snapshot(snapshot: &StateSnapshot) -> Self;

	/// Serialize enough of this state to rebuild it later.
	fn to_snapshot(&self) -> StateSnapshot;

	/// Current trie root.
	fn root(&self) -> H256;

	/// Overwrite the trie root without touching anything else -- used when
	/// seeding a fresh state from a known ancestor's `state_root`
	/// (`spec.md` §4.D.2).
	fn set_root(&mut self, root: H256);
}

/// The execution layer's contract, consumed verbatim per `spec.md` §6.
pub trait ExecutionBackend {
	type State: StateBackend;

	/// Pre-hook run once per block before any transaction is applied.
	fn initialize(&self, state: &mut Self::State, block: &Block);

	/// Post-hook: miner/uncle rewards and any other end-of-block bookkeeping.
	fn finalize(&self, state: &mut Self::State, block: &Block);

	/// Execute every transaction in `block` and finalize. Fails atomically
	/// on any invalidity -- the caller must not treat `state` as valid on `Err`.
	fn apply_block(&self, state: &mut Self::State, block: &Block) -> Result<(), ExecutionError>;

	/// Execute a single transaction against `state`.
	fn apply_transaction(&self, state: &mut Self::State, tx: &Transaction) -> Result<Receipt, TxError>;

	fn mk_receipt_sha(&self, receipts: &[Receipt]) -> H256;
	fn mk_transaction_sha(&self, txs: &[Transaction]) -> H256;

	fn calc_difficulty(&self, prev_header: &Header, now: u64) -> U256;
	fn calc_gaslimit(&self, prev_header: &Header) -> U256;
}
