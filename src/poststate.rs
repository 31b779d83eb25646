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

//! Poststate reconstruction (`spec.md` §4.D).
//!
//! A block's header already commits to its trie root; what's missing to
//! actually *use* that state -- the ancestor headers the BLOCKHASH-style
//! lookups need, and the recent uncle hashes reward/eligibility checks need
//! -- is rebuilt here by walking back from the block itself. This is a free
//! function rather than a `ChainManager` method so the constructor can call
//! it before a `ChainManager` exists yet (resuming from a stored `head_hash`).
//!
//! Generalized from `HeaderChain`'s ancestor walk in
//! `ethcore/light/src/client/header_chain.rs`, extended with the uncle
//! window `spec.md` §4.D step 3 calls for.

use std::collections::BTreeMap;

use ethereum_types::H256;

use crate::config;
use crate::error::{ErrorKind, Result};
use crate::execution::{ExecutionBackend, StateBackend};
use crate::keys;
use crate::kv::PersistentIndex;
use crate::types::{Block, BlockNumber, Header, PrevHeader, StateSnapshot};

fn load_block(index: &PersistentIndex, hash: &H256) -> Option<Block> {
	index.get(&keys::block_key(hash)).map(|raw| rlp::decode(&raw).expect("corrupt block store"))
}

fn genesis_number(index: &PersistentIndex) -> BlockNumber {
	index
		.get(keys::GENESIS_NUMBER)
		.map(|raw| {
			let mut buf = [0u8; 8];
			buf.copy_from_slice(&raw);
			BlockNumber::from_be_bytes(buf)
		})
		.unwrap_or(0)
}

/// Rebuild the poststate of `hash`: a `State` whose snapshot carries the
/// last `PREV_HEADERS` ancestor headers and the uncle hashes recorded over
/// the last `RECENT_UNCLE_DEPTH` of them, seeded with the block's own
/// `state_root` (`spec.md` §4.D steps 2-4).
///
/// When the walk reaches genesis before collecting `PREV_HEADERS` ancestors,
/// the remainder is topped up from whatever `GENESIS_STATE` itself carries
/// (`spec.md` §4.D step 3) -- relevant when genesis was supplied as a
/// `Snapshot` continuing a prior chain's history. A non-genesis ancestor
/// missing from the store is a corrupt-store condition, not a normal outcome
/// (`spec.md` §7.2).
pub(crate) fn reconstruct<E: ExecutionBackend>(index: &PersistentIndex, hash: H256) -> Result<E::State> {
	let block = load_block(index, &hash).ok_or_else(|| ErrorKind::CorruptStore(hash))?;

	let mut prev_headers = Vec::with_capacity(config::PREV_HEADERS);
	let mut recent_uncles: BTreeMap<BlockNumber, Vec<H256>> = BTreeMap::new();

	prev_headers.push(PrevHeader::from(&block.header));
	recent_uncles.insert(block.header.number, block.uncles.iter().map(Header::hash).collect());

	let genesis_height = genesis_number(index);
	let mut cursor = block.header.clone();
	let mut hit_genesis = cursor.number == genesis_height;

	while prev_headers.len() < config::PREV_HEADERS && !hit_genesis {
		let parent_hash = cursor.parent_hash;
		let parent = load_block(index, &parent_hash).ok_or_else(|| ErrorKind::CorruptStore(parent_hash))?;

		prev_headers.push(PrevHeader::from(&parent.header));
		if recent_uncles.len() < config::RECENT_UNCLE_DEPTH {
			recent_uncles.insert(parent.header.number, parent.uncles.iter().map(Header::hash).collect());
		}

		hit_genesis = parent.header.number == genesis_height;
		cursor = parent.header;
	}

	if hit_genesis && prev_headers.len() < config::PREV_HEADERS {
		if let Some(raw) = index.get(keys::GENESIS_STATE) {
			let genesis_snapshot: StateSnapshot =
				serde_json::from_slice(&raw).expect("GENESIS_STATE is always valid json");
			for gh in genesis_snapshot.prev_headers {
				if prev_headers.len() >= config::PREV_HEADERS {
					break;
				}
				prev_headers.push(gh);
			}
			for (number, uncles) in genesis_snapshot.recent_uncles {
				if recent_uncles.len() >= config::RECENT_UNCLE_DEPTH {
					break;
				}
				recent_uncles.entry(number).or_insert(uncles);
			}
		}
	}

	let snapshot = StateSnapshot {
		state_root: block.header.state_root,
		block_number: block.header.number,
		gas_used: block.header.gas_used,
		prev_headers,
		recent_uncles,
	};
	Ok(E::State::from_snapshot(&snapshot))
}
