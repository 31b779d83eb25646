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

//! Tunables, named the way `ethcore/src/client/client.rs`'s `HISTORY` and
//! `ethcore/src/verification/queue/mod.rs`'s `Config` name theirs.

use ethereum_types::U256;

/// How many ancestor headers `mk_poststate_of_blockhash` walks back
/// (`spec.md` §4.D step 3): 256 for the block-hash opcode window, plus the
/// block's own header.
pub const PREV_HEADERS: usize = 257;

/// How many of those ancestors (by walk index, not height) get their uncle
/// hashes recorded into `recent_uncles` (`spec.md` §4.D step 3).
pub const RECENT_UNCLE_DEPTH: usize = 6;

/// Maximum uncles a candidate block may include (`spec.md` §4.H step 5).
pub const MAX_UNCLES_PER_BLOCK: usize = 2;

/// Depth searched for uncle candidates among ancestor children
/// (`spec.md` §4.H step 5: "depth 1..5, excluding the direct parent line").
pub const UNCLE_SEARCH_DEPTH: u64 = 5;

/// Default genesis gas limit (`spec.md` §6 "allocation dictionary" variant).
pub const DEFAULT_GENESIS_GAS_LIMIT: u64 = 4_712_388;

/// Default genesis difficulty, 2^25 (`spec.md` §6, §8 scenario 1).
pub fn default_genesis_difficulty() -> U256 {
	U256::from(1u64) << 25
}

/// Default genesis timestamp: a fixed epoch, as `spec.md` §6 calls for.
pub const DEFAULT_GENESIS_TIMESTAMP: u64 = 0;

/// Runtime configuration for a `ChainManager`.
#[derive(Debug, Clone)]
pub struct ChainConfig {
	/// Transactions below this gasprice are rejected by the pool (`spec.md` §4.G).
	pub min_gasprice: U256,
	/// Soft cap on the number of pending transactions retained.
	pub max_pool_size: usize,
}

impl Default for ChainConfig {
	fn default() -> Self {
		ChainConfig { min_gasprice: U256::zero(), max_pool_size: 1024 }
	}
}
