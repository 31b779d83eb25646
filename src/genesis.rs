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

//! Genesis input, generalized from `src/spec.rs`'s `Spec::genesis_header`/
//! `genesis_block`/`overwrite_genesis`/`set_genesis_state` to the five forms
//! `spec.md` §6 "Genesis input" lists. Parsing an on-disk chainspec document
//! into these shapes is the genesis *parser*'s job and stays out of scope
//! (`spec.md` §1); this crate only turns an already-resolved input into a
//! genesis header plus a seeded `State`.

use ethereum_types::{Address, Bloom, H256, U256};
use keccak_hash::keccak;

use crate::config;
use crate::execution::StateBackend;
use crate::types::{Bytes, Header, StateSnapshot};

/// Scalar header fields for a genesis block, with the sensible defaults
/// `spec.md` §6(e) calls for (gas_limit 4,712,388, difficulty 2^25, a fixed
/// epoch timestamp).
#[derive(Debug, Clone)]
pub struct GenesisHeaderFields {
	pub gas_limit: U256,
	pub gas_used: U256,
	pub timestamp: u64,
	pub difficulty: U256,
	pub prevhash: H256,
	pub uncles_hash: H256,
	pub extra_data: Bytes,
	pub coinbase: Address,
}

/// Keccak of the RLP encoding of an empty byte string -- the conventional
/// "nothing here" root for an empty transaction/receipt trie.
fn empty_data_root() -> H256 {
	keccak(rlp::encode(&Vec::<u8>::new()))
}

/// Keccak of the RLP encoding of an empty list -- used for a genesis block's
/// uncles hash (genesis never has uncles).
fn empty_list_root() -> H256 {
	keccak(rlp::RlpStream::new_list(0).out())
}

impl Default for GenesisHeaderFields {
	fn default() -> Self {
		GenesisHeaderFields {
			gas_limit: U256::from(config::DEFAULT_GENESIS_GAS_LIMIT),
			gas_used: U256::zero(),
			timestamp: config::DEFAULT_GENESIS_TIMESTAMP,
			difficulty: config::default_genesis_difficulty(),
			prevhash: H256::zero(),
			uncles_hash: empty_list_root(),
			extra_data: Vec::new(),
			coinbase: Address::zero(),
		}
	}
}

impl GenesisHeaderFields {
	fn into_header(self, number: u64, state_root: H256) -> Header {
		Header {
			parent_hash: self.prevhash,
			number,
			timestamp: self.timestamp,
			difficulty: self.difficulty,
			gas_limit: self.gas_limit,
			gas_used: self.gas_used,
			coinbase: self.coinbase,
			extra_data: self.extra_data,
			state_root,
			receipts_root: empty_data_root(),
			tx_list_root: empty_data_root(),
			uncles_hash: self.uncles_hash,
			bloom: Bloom::zero(),
		}
	}
}

/// The five ways a chain manager can be handed a genesis, per `spec.md` §6.
pub enum GenesisInput<S: StateBackend> {
	/// (a) Resume from a `head_hash` already present in the store.
	Resume,
	/// (b) An already-constructed in-memory state object.
	State { state: S, fields: GenesisHeaderFields },
	/// (c) A genesis declaration document, reduced to its header fields;
	/// the genesis state is empty (no endowed accounts).
	Declaration(GenesisHeaderFields),
	/// (d) A full state snapshot (already carries `prev_headers`).
	Snapshot(StateSnapshot),
	/// (e) Header fields plus a state in which the allocation dictionary
	/// has already been applied by the caller.
	Allocation { fields: GenesisHeaderFields, state: S },
}

/// The resolved genesis: header ready to hash, and the seeded state.
pub struct ResolvedGenesis<S: StateBackend> {
	pub header: Header,
	pub state: S,
}

impl<S: StateBackend> GenesisInput<S> {
	/// Resolve everything but the `Resume` case, which the caller handles
	/// by reading `head_hash` back out of the persistent index instead.
	pub fn resolve(self) -> Option<ResolvedGenesis<S>> {
		match self {
			GenesisInput::Resume => None,
			GenesisInput::State { state, fields } => {
				let header = fields.into_header(0, state.root());
				Some(ResolvedGenesis { header, state })
			}
			GenesisInput::Declaration(fields) => {
				let empty = StateSnapshot::empty_at(H256::zero(), 0, U256::zero());
				let state = S::from_snapshot(&empty);
				let header = fields.into_header(0, state.root());
				Some(ResolvedGenesis { header, state })
			}
			GenesisInput::Snapshot(snapshot) => {
				// A snapshot genesis may continue a prior chain's history
				// rather than start one: its height is whatever the
				// snapshot itself recorded, not necessarily zero
				// (`spec.md` §6(d), §9).
				let fields = GenesisHeaderFields { prevhash: H256::zero(), ..GenesisHeaderFields::default() };
				let number = snapshot.block_number;
				let header_state_root = snapshot.state_root;
				let state = S::from_snapshot(&snapshot);
				Some(ResolvedGenesis { header: fields.into_header(number, header_state_root), state })
			}
			GenesisInput::Allocation { fields, state } => {
				let header = fields.into_header(0, state.root());
				Some(ResolvedGenesis { header, state })
			}
		}
	}
}
