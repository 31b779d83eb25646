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

//! End-to-end scenarios exercised against the public API only, with a small
//! deterministic execution backend standing in for a real EVM -- the same
//! shape as the in-crate unit tests, kept separate here so they run as an
//! outside consumer of `ethcore_chain` would use it.

use std::collections::BTreeMap;

use ethereum_types::{Address, Bloom, H256, U256};

use ethcore_chain::{
	Block, ChainConfig, ChainManager, ExecutionBackend, ExecutionError, GenesisHeaderFields, GenesisInput, Header,
	PersistentIndex, PrevHeader, Receipt, StateBackend, StateSnapshot, Transaction, TxError,
};

#[derive(Clone, Default)]
struct FixtureState {
	counter: u64,
	block_number: u64,
	gas_used: U256,
	prev_headers: Vec<PrevHeader>,
	recent_uncles: BTreeMap<u64, Vec<H256>>,
}

impl StateBackend for FixtureState {
	fn from_snapshot(snapshot: &StateSnapshot) -> Self {
		FixtureState {
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

struct FixtureExecution;

const FLAT_GAS_COST: u64 = 21_000;

impl ExecutionBackend for FixtureExecution {
	type State = FixtureState;

	fn initialize(&self, _state: &mut FixtureState, _block: &Block) {}

	fn finalize(&self, state: &mut FixtureState, block: &Block) {
		state.block_number = block.header.number;
	}

	fn apply_block(&self, state: &mut FixtureState, block: &Block) -> Result<(), ExecutionError> {
		for tx in &block.transactions {
			self.apply_transaction(state, tx).map_err(|e| ExecutionError(format!("{:?}", e)))?;
		}
		state.block_number = block.header.number;
		Ok(())
	}

	fn apply_transaction(&self, state: &mut FixtureState, tx: &Transaction) -> Result<Receipt, TxError> {
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

fn fresh_chain() -> ChainManager<FixtureExecution> {
	let index = PersistentIndex::in_memory();
	let genesis = GenesisInput::Declaration(GenesisHeaderFields::default());
	ChainManager::new(index, FixtureExecution, ChainConfig::default(), genesis).expect("genesis resolves")
}

fn child_of(parent: &Header, timestamp: u64, extra_data: Vec<u8>) -> Block {
	Block {
		header: Header {
			parent_hash: parent.hash(),
			number: parent.number + 1,
			timestamp,
			difficulty: parent.difficulty,
			gas_limit: parent.gas_limit,
			gas_used: U256::zero(),
			coinbase: Address::zero(),
			extra_data,
			state_root: H256::zero(),
			receipts_root: H256::zero(),
			tx_list_root: H256::zero(),
			uncles_hash: H256::zero(),
			bloom: Bloom::zero(),
		},
		transactions: Vec::new(),
		uncles: Vec::new(),
	}
}

/// Scenario 1: three blocks added in order extend the head each time.
#[test]
fn linear_chain_growth() {
	let chain = fresh_chain();
	let mut parent = chain.head_block().header;

	for i in 1..=3u64 {
		let block = child_of(&parent, i, Vec::new());
		let hash = block.hash();
		chain.add_block(block.clone(), 100).unwrap();
		assert_eq!(chain.head_hash(), hash);
		assert_eq!(chain.get_blockhash_by_number(i), Some(hash));
		parent = block.header;
	}
	assert_eq!(chain.head_block().header.number, 3);
	assert!(chain.has_block(&chain.head_hash()));
	assert!(!chain.has_block(&H256::zero()));
	assert_eq!(chain.get_chain(0, 4).len(), 4);
	assert_eq!(chain.get_chain(1, 3).iter().map(|b| b.header.number).collect::<Vec<_>>(), vec![1, 2]);
}

/// Scenario 2: a future-timestamped block is held back and only lands once
/// time catches up to it.
#[test]
fn future_block_deferred_until_due() {
	let chain = fresh_chain();
	let genesis = chain.head_block().header;
	let future_block = child_of(&genesis, 1_000, Vec::new());

	chain.add_block(future_block.clone(), 1).unwrap();
	assert_eq!(chain.head_hash(), genesis.hash());
	assert!(chain.get_block(&future_block.hash()).is_none());

	chain.process_time_queue(1_000).unwrap();
	assert!(chain.get_block(&future_block.hash()).is_some());
	assert_eq!(chain.head_hash(), future_block.hash());
}

/// Scenario 3: a block whose parent hasn't arrived yet is queued, and
/// delivering the parent releases it.
#[test]
fn orphan_delivered_after_parent() {
	let chain = fresh_chain();
	let genesis = chain.head_block().header;
	let parent = child_of(&genesis, 1, Vec::new());
	let child = child_of(&parent.header, 2, Vec::new());

	chain.add_block(child.clone(), 100).unwrap();
	assert_eq!(chain.head_hash(), genesis.hash());

	chain.add_block(parent.clone(), 100).unwrap();
	assert_eq!(chain.head_hash(), parent.hash());
	assert!(chain.get_block(&child.hash()).is_none());

	chain.process_parent_queue(100).unwrap();
	assert_eq!(chain.head_hash(), child.hash());
}

/// Scenario 4: a heavier side chain triggers a reorg onto it.
#[test]
fn reorg_onto_heavier_side_chain() {
	let chain = fresh_chain();
	let genesis = chain.head_block().header;

	let light = child_of(&genesis, 1, vec![0]);
	chain.add_block(light.clone(), 10).unwrap();
	assert_eq!(chain.head_hash(), light.hash());

	let mut heavy = child_of(&genesis, 1, vec![1]);
	heavy.header.difficulty = genesis.difficulty * 4;

	chain.add_block(heavy.clone(), 10).unwrap();
	assert_eq!(chain.head_hash(), heavy.hash());
	assert_eq!(chain.get_blockhash_by_number(1), Some(heavy.hash()));
}

/// A heavier but *shorter* side chain must still clear every height the
/// retired chain reached above it -- cumulative difficulty, not length,
/// drives fork choice, so one heavy block can outscore several light ones.
#[test]
fn reorg_onto_shorter_heavier_chain_clears_stale_heights() {
	let chain = fresh_chain();
	let genesis = chain.head_block().header;

	let mut parent = genesis.clone();
	let mut tall_chain = Vec::new();
	for i in 1..=3u64 {
		let block = child_of(&parent, i, vec![0]);
		chain.add_block(block.clone(), 10).unwrap();
		parent = block.header.clone();
		tall_chain.push(block);
	}
	assert_eq!(chain.head_hash(), tall_chain[2].hash());
	assert_eq!(chain.get_blockhash_by_number(3), Some(tall_chain[2].hash()));

	let mut short_heavy = child_of(&genesis, 1, vec![1]);
	short_heavy.header.difficulty = genesis.difficulty * 16;
	chain.add_block(short_heavy.clone(), 10).unwrap();

	assert_eq!(chain.head_hash(), short_heavy.hash());
	assert_eq!(chain.get_blockhash_by_number(1), Some(short_heavy.hash()));
	assert_eq!(chain.get_block_by_number(2), None);
	assert_eq!(chain.get_block_by_number(3), None);
	assert_eq!(chain.get_chain(0, 4).len(), 2);
}

/// A transaction replayed at the same height in both the retired and the
/// newly-canonical block must stay indexed after the reorg, not be dropped
/// as a side effect of evicting the retired block's txindex entries.
#[test]
fn reorg_keeps_shared_transaction_indexed() {
	let chain = fresh_chain();
	let genesis = chain.head_block().header;

	let shared_tx = Transaction {
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

	let mut light = child_of(&genesis, 1, vec![0]);
	light.transactions = vec![shared_tx.clone()];
	chain.add_block(light.clone(), 10).unwrap();
	assert_eq!(chain.head_hash(), light.hash());
	assert!(chain.get_transaction(&shared_tx.hash()).is_some());

	let mut heavy = child_of(&genesis, 1, vec![1]);
	heavy.header.difficulty = genesis.difficulty * 4;
	heavy.transactions = vec![shared_tx.clone()];
	chain.add_block(heavy.clone(), 10).unwrap();

	assert_eq!(chain.head_hash(), heavy.hash());
	assert!(chain.get_transaction(&shared_tx.hash()).is_some());
}

/// Scenario 5: a candidate assembled over a non-empty pool packs every
/// admissible transaction and reports matching receipts.
#[test]
fn candidate_assembly_packs_pool() {
	let chain = fresh_chain();

	let tx = Transaction {
		nonce: U256::zero(),
		gasprice: U256::from(5),
		startgas: U256::from(FLAT_GAS_COST),
		to: None,
		value: U256::zero(),
		data: Vec::new(),
		v: 0,
		r: U256::zero(),
		s: U256::zero(),
	};
	assert!(chain.submit_transaction(tx.clone()));

	let candidate = chain.make_head_candidate(1, Address::zero(), Vec::new());
	assert_eq!(candidate.block.header.number, 1);
	assert_eq!(candidate.block.transactions.len(), 1);
	assert_eq!(candidate.receipts.len(), 1);
}

/// Scenario 6: a candidate built after a sibling block was recorded picks it
/// up as an eligible uncle.
#[test]
fn candidate_includes_eligible_uncle() {
	let chain = fresh_chain();
	let genesis = chain.head_block().header;

	let canonical = child_of(&genesis, 1, vec![0]);
	chain.add_block(canonical.clone(), 10).unwrap();

	let sibling = child_of(&genesis, 1, vec![1]);
	chain.add_block(sibling.clone(), 10).unwrap();

	// Fork-choice jitter means either block may have ended up canonical;
	// whichever didn't is the one eligible to be picked up as an uncle.
	let head = chain.head_hash();
	let expected_uncle = if head == canonical.hash() { sibling.hash() } else { canonical.hash() };

	let candidate = chain.make_head_candidate(20, Address::zero(), Vec::new());
	let uncle_hashes: Vec<H256> = candidate.block.uncles.iter().map(Header::hash).collect();
	assert!(uncle_hashes.contains(&expected_uncle));
}
