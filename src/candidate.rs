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

//! Candidate block assembly (`spec.md` §4.H).
//!
//! Generalized from `src/block.rs`'s `OpenBlock` -> apply transactions ->
//! `ClosedBlock` pipeline and `Client::prepare_open_block`'s uncle
//! collection, folded into a single call since this crate has no separate
//! "open for mining" handle to return (`spec.md` §1 scope: this crate hands
//! back a finished, minable `Block`, not a mutable builder).

use std::collections::HashSet;

use ethereum_types::{Address, Bloom, H256};
use keccak_hash::keccak;
use log::debug;

use crate::config;
use crate::execution::{ExecutionBackend, Receipt, StateBackend};
use crate::types::{Block, Bytes, Header};
use crate::ChainManager;

/// A finished, unsealed candidate block plus the receipts its transactions
/// produced -- enough for a miner to seal and for a caller to inspect gas
/// usage/logs before broadcasting (`spec.md` §4.H).
pub struct Candidate {
	pub block: Block,
	pub receipts: Vec<Receipt>,
}

impl<E: ExecutionBackend> ChainManager<E> {
	/// Build a candidate extending the current head: pack pending
	/// transactions highest-fee-first under the gas budget, select eligible
	/// uncles, then finalize (`spec.md` §4.H steps 1-6).
	pub fn make_head_candidate(&self, now: u64, coinbase: Address, extra_data: Bytes) -> Candidate {
		let parent = self.head_block();
		let parent_hash = parent.hash();
		let number = parent.header.number + 1;
		let gas_limit = self.execution().calc_gaslimit(&parent.header);
		let difficulty = self.execution().calc_difficulty(&parent.header, now);

		let state_for_uncles = self.state();
		let uncles = self.select_uncles(&parent, &state_for_uncles);
		let uncles_hash = keccak(rlp::encode_list(&uncles));

		let mut header = Header {
			parent_hash,
			number,
			timestamp: now,
			difficulty,
			gas_limit,
			gas_used: ethereum_types::U256::zero(),
			coinbase,
			extra_data,
			state_root: H256::zero(),
			receipts_root: H256::zero(),
			tx_list_root: H256::zero(),
			uncles_hash,
			bloom: Bloom::zero(),
		};

		let mut open_block = Block { header: header.clone(), transactions: Vec::new(), uncles: uncles.clone() };

		let mut state = state_for_uncles;
		self.execution().initialize(&mut state, &open_block);

		let mut receipts = Vec::new();
		let mut bloom = Bloom::zero();
		let mut gas_used = ethereum_types::U256::zero();
		let mut included = Vec::new();

		for tx in self.pool_candidates() {
			if gas_used + tx.startgas > gas_limit {
				continue;
			}
			match self.execution().apply_transaction(&mut state, &tx) {
				Ok(receipt) => {
					gas_used += receipt.gas_used;
					bloom.accrue_bloom(&receipt.bloom);
					receipts.push(receipt);
					included.push(tx);
				}
				Err(_) => continue,
			}
		}

		open_block.transactions = included;
		self.execution().finalize(&mut state, &open_block);

		header.gas_used = gas_used;
		header.state_root = state.root();
		header.receipts_root = self.execution().mk_receipt_sha(&receipts);
		header.tx_list_root = self.execution().mk_transaction_sha(&open_block.transactions);
		header.bloom = bloom;

		open_block.header = header;
		debug!(
			target: "chain::candidate",
			"assembled candidate #{} on top of {:?}: {} txs, {} uncles, {} gas used",
			number, parent_hash, open_block.transactions.len(), uncles.len(), gas_used
		);
		Candidate { block: open_block, receipts }
	}

	/// Ancestor's children, depth 1..=`UNCLE_SEARCH_DEPTH` above the parent,
	/// excluding the direct parent line itself, capped at
	/// `MAX_UNCLES_PER_BLOCK` and to a `RECENT_UNCLE_DEPTH`-height window,
	/// and excluding anything the last `RECENT_UNCLE_DEPTH` blocks already
	/// cited as an uncle (`spec.md` §4.H step 5, §9's `ineligible` note).
	fn select_uncles(&self, parent: &Block, state: &E::State) -> Vec<Header> {
		let mut direct_line = HashSet::new();
		direct_line.insert(parent.hash());
		let mut line_cursor = parent.clone();
		for _ in 0..config::UNCLE_SEARCH_DEPTH {
			match self.get_parent(&line_cursor) {
				Some(p) => {
					direct_line.insert(p.hash());
					line_cursor = p;
				}
				None => break,
			}
		}

		// Already cited as an uncle by one of the last RECENT_UNCLE_DEPTH
		// blocks -- the live poststate's `recent_uncles` carries exactly
		// that window (`spec.md` §4.D step 3).
		let mut seen: HashSet<H256> = state.to_snapshot().recent_uncles.into_iter().flat_map(|(_, hashes)| hashes).collect();
		let mut uncles = Vec::new();
		let mut cursor = parent.clone();

		for _ in 0..config::UNCLE_SEARCH_DEPTH {
			let grand = match self.get_parent(&cursor) {
				Some(p) => p,
				None => break,
			};
			if parent.header.number.saturating_sub(grand.header.number) > config::RECENT_UNCLE_DEPTH as u64 {
				break;
			}

			for child in self.get_children(&grand.hash()) {
				if uncles.len() >= config::MAX_UNCLES_PER_BLOCK {
					break;
				}
				let child_hash = child.hash();
				if direct_line.contains(&child_hash) || seen.contains(&child_hash) {
					continue;
				}
				seen.insert(child_hash);
				uncles.push(child.header);
			}

			if uncles.len() >= config::MAX_UNCLES_PER_BLOCK {
				break;
			}
			cursor = grand;
		}

		uncles
	}
}
