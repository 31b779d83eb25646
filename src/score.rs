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

//! Cumulative-difficulty score registry (`spec.md` §4.C).
//!
//! Generalizes `HeaderChain::insert`'s `total_difficulty = parent_td + view.difficulty()`
//! accumulation (`ethcore/light/src/client/header_chain.rs`) from "header
//! candidates kept in RAM" to "scores memoized per-hash in the persistent
//! index", and adds the tie-breaking jitter `spec.md` §4.C calls for.

use ethereum_types::U256;
use rand::Rng;

use crate::chain::ChainManager;
use crate::execution::ExecutionBackend;
use crate::keys;
use crate::types::Block;

pub(crate) fn u256_to_ascii(v: U256) -> Vec<u8> {
	v.to_string().into_bytes()
}

pub(crate) fn ascii_to_u256(bytes: &[u8]) -> U256 {
	let s = std::str::from_utf8(bytes).expect("score bytes are ascii");
	U256::from_dec_str(s).expect("score bytes are a decimal integer")
}

impl<E: ExecutionBackend> ChainManager<E> {
	/// Cumulative difficulty anchored at genesis (score 0), per `spec.md` §4.C.
	///
	/// `score(b) = score(parent(b)) + b.difficulty + J(b)`, where `J(b)` is a
	/// once-per-hash jitter in `[0, b.difficulty / 10^6]`. Memoized both in an
	/// in-process cache (so repeated calls within one `add_block` are stable
	/// even before `commit`) and under `score:<hash>` once committed.
	pub fn get_score(&self, block: &Block) -> U256 {
		let hash = block.hash();

		if let Some(score) = self.score_cache.read().get(&hash).copied() {
			return score;
		}
		if let Some(raw) = self.index.get(&keys::score_key(&hash)) {
			let score = ascii_to_u256(&raw);
			self.score_cache.write().insert(hash, score);
			return score;
		}

		let score = match self.get_parent(block) {
			Some(parent) => {
				let parent_score = self.get_score(&parent);
				parent_score + block.header.difficulty + self.jitter(block)
			}
			None if self.is_genesis_number(block.header.number) => U256::zero(),
			None => self
				.score_cache
				.read()
				.get(&block.header.parent_hash)
				.copied()
				.or_else(|| self.index.get(&keys::score_key(&block.header.parent_hash)).map(|raw| ascii_to_u256(&raw)))
				.unwrap_or_else(U256::zero),
		};

		self.score_cache.write().insert(hash, score);
		self.index.put(&keys::score_key(&hash), &u256_to_ascii(score));
		score
	}

	/// `J(b)`: uniform over `[0, b.difficulty / 10^6]`, sampled once per hash.
	fn jitter(&self, block: &Block) -> U256 {
		let max = block.header.difficulty / U256::from(1_000_000u64);
		if max.is_zero() {
			return U256::zero();
		}
		// U256 doesn't fit rand's Uniform sampling; max is always small in
		// practice (difficulty / 10^6), so sampling into u64 and widening back
		// is exact as long as the quotient itself fits in u64.
		let bound = max.low_u64().saturating_add(1);
		U256::from(rand::thread_rng().gen_range(0, bound))
	}
}
