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

//! A persistent, content-addressed block store with fork-choice, reorg,
//! arrival queues, a pending-transaction pool and candidate block assembly
//! for a proof-of-work chain.
//!
//! `ChainManager<E>` is the single entry point; `E: execution::ExecutionBackend`
//! is the seam an embedder fills in with an actual EVM and state trie. Wire
//! codecs, signature verification, networking and consensus-rule
//! enforcement beyond fork-choice-by-score all live outside this crate.

#[macro_use]
extern crate error_chain;

pub mod candidate;
mod chain;
pub mod config;
pub mod error;
pub mod execution;
pub mod genesis;
mod keys;
mod kv;
mod pool;
mod poststate;
mod queue;
mod score;
pub mod types;

pub use candidate::Candidate;
pub use chain::{AddOutcome, ChainManager};
pub use config::ChainConfig;
pub use error::{Error, ErrorKind, Result};
pub use execution::{ExecutionBackend, ExecutionError, LogEntry, Receipt, StateBackend, TxError};
pub use genesis::{GenesisHeaderFields, GenesisInput, ResolvedGenesis};
pub use kv::PersistentIndex;
pub use types::{Block, BlockNumber, Bytes, Header, PrevHeader, StateSnapshot, Transaction, TxLocation};

#[cfg(test)]
mod tests {
	use std::collections::BTreeMap;

	use ethereum_types::{Address, Bloom, H256, U256};

	use crate::config::ChainConfig;
	use crate::execution::{ExecutionBackend, ExecutionError, Receipt, StateBackend, TxError};
	use crate::genesis::{GenesisHeaderFields, GenesisInput};
	use crate::kv::PersistentIndex;
	use crate::types::{Block, Header, StateSnapshot, Transaction};
	use crate::ChainManager;

	/// A deterministic execution layer stand-in: "balances" live entirely
	/// in the state root as a counter, gas accounting is a flat per-tx cost,
	/// and blocks never fail to apply unless a transaction's `startgas` is
	/// below that flat cost. Enough to exercise ingestion, fork choice and
	/// candidate assembly without a real EVM.
	#[derive(Clone, Default)]
	pub(crate) struct ToyState {
		pub counter: u64,
		pub block_number: u64,
		pub gas_used: U256,
		pub prev_headers: Vec<crate::types::PrevHeader>,
		pub recent_uncles: BTreeMap<u64, Vec<H256>>,
	}

	impl StateBackend for ToyState {
		fn from_snapshot(snapshot: &StateSnapshot) -> Self {
			ToyState {
				counter: snapshot.state_root.to_low_u64_be(),
				block_number: snapshot.block_number,
				gas_used: snapshot.gas_used,
				prev_headers: snapshot.prev_headers.clone(),
				recent_uncles: snapshot.recent_uncles.clone(),
			}
		}

		fn to_snapshot(&self) -> StateSnapshot {
			StateSnapshot {
				state_root: self.root(),
				block_number: self.block_number,
				gas_used: self.gas_used,
				prev_headers: self.prev_headers.clone(),
				recent_uncles: self.recent_uncles.clone(),
			}
		}

		fn root(&self) -> H256 {
			H256::from_low_u64_be(self.counter)
		}

		fn set_root(&mut self, root: H256) {
			self.counter = root.to_low_u64_be();
		}
	}

	pub(crate) struct ToyExecution;

	const FLAT_GAS_COST: u64 = 21_000;

	impl ExecutionBackend for ToyExecution {
		type State = ToyState;

		fn initialize(&self, _state: &mut ToyState, _block: &Block) {}

		fn finalize(&self, state: &mut ToyState, block: &Block) {
			state.block_number = block.header.number;
		}

		fn apply_block(&self, state: &mut ToyState, block: &Block) -> Result<(), ExecutionError> {
			for tx in &block.transactions {
				self.apply_transaction(state, tx).map_err(|e| ExecutionError(format!("{:?}", e)))?;
			}
			state.block_number = block.header.number;
			Ok(())
		}

		fn apply_transaction(&self, state: &mut ToyState, tx: &Transaction) -> Result<Receipt, TxError> {
			if tx.startgas < U256::from(FLAT_GAS_COST) {
				return Err(TxError::InsufficientStartGas);
			}
			state.counter = state.counter.wrapping_add(1);
			state.gas_used += U256::from(FLAT_GAS_COST);
			Ok(Receipt { gas_used: U256::from(FLAT_GAS_COST), bloom: Bloom::zero(), logs: Vec::new() })
		}

		fn mk_receipt_sha(&self, receipts: &[Receipt]) -> H256 {
			H256::from_low_u64_be(receipts.len() as u64)
		}

		fn mk_transaction_sha(&self, txs: &[Transaction]) -> H256 {
			H256::from_low_u64_be(txs.len() as u64)
		}

		fn calc_difficulty(&self, prev_header: &Header, _now: u64) -> U256 {
			prev_header.difficulty
		}

		fn calc_gaslimit(&self, prev_header: &Header) -> U256 {
			prev_header.gas_limit
		}
	}

	fn toy_chain() -> ChainManager<ToyExecution> {
		let index = PersistentIndex::in_memory();
		let genesis = GenesisInput::Declaration(GenesisHeaderFields::default());
		ChainManager::new(index, ToyExecution, ChainConfig::default(), genesis).expect("genesis resolves")
	}

	fn child_of(parent: &Header, timestamp: u64, txs: Vec<Transaction>) -> Block {
		Block {
			header: Header {
				parent_hash: parent.hash(),
				number: parent.number + 1,
				timestamp,
				difficulty: parent.difficulty,
				gas_limit: parent.gas_limit,
				gas_used: U256::zero(),
				coinbase: Address::zero(),
				extra_data: Vec::new(),
				state_root: H256::zero(),
				receipts_root: H256::zero(),
				tx_list_root: H256::zero(),
				uncles_hash: H256::zero(),
				bloom: Bloom::zero(),
			},
			transactions: txs,
			uncles: Vec::new(),
		}
	}

	#[test]
	fn genesis_resume_round_trips() {
		let chain = toy_chain();
		let genesis_hash = chain.head_hash();
		assert_eq!(chain.head_block().header.number, 0);
		assert!(chain.get_block(&genesis_hash).is_some());
	}

	#[test]
	fn linear_growth_extends_head() {
		let chain = toy_chain();
		let genesis = chain.head_block().header;
		let b1 = child_of(&genesis, 1, Vec::new());
		let outcome = chain.add_block(b1.clone(), 10).unwrap();
		assert_eq!(outcome, crate::AddOutcome::Applied);
		assert_eq!(chain.head_hash(), b1.hash());
		assert_eq!(chain.get_blockhash_by_number(1), Some(b1.hash()));
	}

	#[test]
	fn future_block_is_deferred_then_released() {
		let chain = toy_chain();
		let genesis = chain.head_block().header;
		let b1 = child_of(&genesis, 100, Vec::new());
		let outcome = chain.add_block(b1.clone(), 10).unwrap();
		assert_eq!(outcome, crate::AddOutcome::Deferred);
		assert_eq!(chain.head_hash(), genesis.hash());
		assert!(chain.get_block(&b1.hash()).is_none());

		// Queued, not auto-drained: only an explicit `process_time_queue`
		// call (once `now` has caught up) releases it.
		chain.process_time_queue(10).unwrap();
		assert!(chain.get_block(&b1.hash()).is_none());

		chain.process_time_queue(200).unwrap();
		assert!(chain.get_block(&b1.hash()).is_some());
		assert_eq!(chain.head_hash(), b1.hash());
	}

	#[test]
	fn orphan_block_queues_until_parent_arrives() {
		let chain = toy_chain();
		let genesis = chain.head_block().header;
		let b1 = child_of(&genesis, 1, Vec::new());
		let b2 = child_of(&b1.header, 2, Vec::new());

		let outcome = chain.add_block(b2.clone(), 10).unwrap();
		assert_eq!(outcome, crate::AddOutcome::Queued);
		assert_eq!(chain.head_hash(), genesis.hash());

		chain.add_block(b1.clone(), 10).unwrap();
		assert_eq!(chain.head_hash(), b1.hash());

		chain.process_parent_queue(10).unwrap();
		assert_eq!(chain.head_hash(), b2.hash());
	}

	#[test]
	fn heavier_side_branch_triggers_reorg() {
		let chain = toy_chain();
		let genesis = chain.head_block().header;

		let a1 = child_of(&genesis, 1, Vec::new());
		chain.add_block(a1.clone(), 10).unwrap();

		let mut b1 = child_of(&genesis, 1, Vec::new());
		b1.header.extra_data = vec![1];
		b1.header.difficulty = genesis.difficulty * 2;
		let outcome = chain.add_block(b1.clone(), 10).unwrap();

		assert_eq!(outcome, crate::AddOutcome::Applied);
		assert_eq!(chain.head_hash(), b1.hash());
		assert_eq!(chain.get_blockhash_by_number(1), Some(b1.hash()));
	}

	#[test]
	fn candidate_packs_pending_transactions_by_gasprice() {
		let chain = toy_chain();

		let cheap = Transaction {
			nonce: U256::zero(),
			gasprice: U256::from(1),
			startgas: U256::from(FLAT_GAS_COST),
			to: None,
			value: U256::zero(),
			data: Vec::new(),
			v: 0,
			r: U256::zero(),
			s: U256::zero(),
		};
		let mut pricey = cheap.clone();
		pricey.nonce = U256::from(1);
		pricey.gasprice = U256::from(100);

		assert!(chain.submit_transaction(cheap.clone()));
		assert!(chain.submit_transaction(pricey.clone()));

		let candidate = chain.make_head_candidate(1, Address::zero(), Vec::new());
		assert_eq!(candidate.block.transactions.len(), 2);
		assert_eq!(candidate.block.transactions[0].hash(), pricey.hash());
		assert_eq!(candidate.receipts.len(), 2);
	}

	#[test]
	fn pool_rejects_transactions_below_gas_floor() {
		let index = PersistentIndex::in_memory();
		let genesis = GenesisInput::Declaration(GenesisHeaderFields::default());
		let mut config = ChainConfig::default();
		config.min_gasprice = U256::from(50);
		let chain = ChainManager::new(index, ToyExecution, config, genesis).unwrap();

		let tx = Transaction {
			nonce: U256::zero(),
			gasprice: U256::from(1),
			startgas: U256::from(FLAT_GAS_COST),
			to: None,
			value: U256::zero(),
			data: Vec::new(),
			v: 0,
			r: U256::zero(),
			s: U256::zero(),
		};
		assert!(!chain.submit_transaction(tx));
		assert_eq!(chain.pool_len(), 0);
	}
}
