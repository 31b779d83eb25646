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

//! Arrival queues (`spec.md` §4.F): blocks held back because their parent
//! hasn't arrived yet, or because their timestamp is still in the future.
//!
//! Generalized from `ethcore/src/verification/queue/mod.rs`'s
//! `VerificationQueue` down to the single-threaded, non-suspending model
//! `spec.md` §5 mandates -- no verifier thread pool, no condvars, both
//! queues rebuilt empty on restart since they are RAM-only (`spec.md` §4.F).

use std::collections::{BTreeMap, HashMap};

use ethereum_types::H256;

use crate::types::Block;

/// Future-dated blocks, ordered ascending by timestamp (`spec.md` §4.E step 1).
#[derive(Default)]
pub struct TimeQueue {
	entries: BTreeMap<(u64, H256), Block>,
}

impl TimeQueue {
	pub fn new() -> Self {
		TimeQueue::default()
	}

	pub fn insert(&mut self, block: Block) {
		let key = (block.header.timestamp, block.hash());
		self.entries.insert(key, block);
	}

	/// Pop every entry with `timestamp <= now`, in ascending timestamp order.
	pub fn drain_ready(&mut self, now: u64) -> Vec<Block> {
		let ready_keys: Vec<(u64, H256)> = self
			.entries
			.range(..=(now, H256::repeat_byte(0xff)))
			.map(|(k, _)| *k)
			.collect();
		ready_keys.into_iter().filter_map(|k| self.entries.remove(&k)).collect()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

/// Blocks whose parent hasn't been seen yet, keyed by the missing parent
/// hash (`spec.md` §4.E step 4).
#[derive(Default)]
pub struct ParentQueue {
	waiting: HashMap<H256, Vec<Block>>,
}

impl ParentQueue {
	pub fn new() -> Self {
		ParentQueue::default()
	}

	pub fn insert(&mut self, parent_hash: H256, block: Block) {
		self.waiting.entry(parent_hash).or_insert_with(Vec::new).push(block);
	}

	/// Hashes of parents that currently have at least one child waiting.
	pub fn pending_parents(&self) -> Vec<H256> {
		self.waiting.keys().copied().collect()
	}

	/// Remove and return every block waiting on `parent_hash`, if any.
	pub fn take(&mut self, parent_hash: &H256) -> Option<Vec<Block>> {
		self.waiting.remove(parent_hash)
	}

	pub fn len(&self) -> usize {
		self.waiting.values().map(Vec::len).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.waiting.is_empty()
	}
}
