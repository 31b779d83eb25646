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

//! Pending-transaction pool (`spec.md` §4.G).
//!
//! Ordered gasprice-descending, as `spec.md` §4.G and §4.H both require: the
//! candidate builder just takes a prefix of this order. Shaped after the
//! `BTreeSet`-of-scored-keys pattern the teacher's `transaction-pool` crate
//! uses for its `VerifiedTransaction` ordering, reduced to the one criterion
//! (gasprice) this core is told to care about -- nonce ordering per sender
//! and gas-price replacement rules are the embedder's concern, not this
//! crate's (`spec.md` §1 Non-goals).

use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};

use ethereum_types::{H256, U256};
use log::trace;

use crate::types::Transaction;

/// Ordering key: gasprice descending, then hash ascending to break ties
/// deterministically.
type OrderKey = (Reverse<U256>, H256);

fn order_key(tx: &Transaction) -> OrderKey {
	(Reverse(tx.gasprice), tx.hash())
}

#[derive(Default)]
pub struct TransactionPool {
	by_hash: HashMap<H256, Transaction>,
	order: BTreeSet<OrderKey>,
}

impl TransactionPool {
	pub fn new() -> Self {
		TransactionPool::default()
	}

	/// Admit `tx` if its gasprice clears `min_gasprice` and it isn't already
	/// present. Evicts the single cheapest transaction if this insertion
	/// would push the pool over `max_size` (`spec.md` §4.G "budget-constrained").
	pub fn add_transaction(&mut self, tx: Transaction, min_gasprice: U256, max_size: usize) -> bool {
		if tx.gasprice < min_gasprice {
			return false;
		}
		let hash = tx.hash();
		if self.by_hash.contains_key(&hash) {
			return false;
		}

		self.order.insert(order_key(&tx));
		self.by_hash.insert(hash, tx);

		if self.by_hash.len() > max_size {
			if let Some(&worst) = self.order.iter().next_back() {
				self.order.remove(&worst);
				self.by_hash.remove(&worst.1);
				trace!(target: "chain::pool", "evicted {:?} to stay under max_size {}", worst.1, max_size);
			}
		}
		true
	}

	/// Re-admit a transaction displaced by a reorg, bypassing the gasprice
	/// floor -- it already cleared it once (`spec.md` §4.E reorg step).
	pub(crate) fn reinstate(&mut self, tx: Transaction) {
		let hash = tx.hash();
		if !self.by_hash.contains_key(&hash) {
			self.order.insert(order_key(&tx));
			self.by_hash.insert(hash, tx);
		}
	}

	/// Drop every transaction that a just-applied block already included
	/// (`spec.md` §4.G "pruned post-block-apply").
	pub(crate) fn prune_applied(&mut self, applied: &[Transaction]) {
		for tx in applied {
			let hash = tx.hash();
			if let Some(tx) = self.by_hash.remove(&hash) {
				self.order.remove(&order_key(&tx));
			}
		}
	}

	/// Every pending transaction, gasprice descending -- the candidate
	/// builder packs a prefix of this under its gas budget (`spec.md` §4.H).
	pub fn candidates(&self) -> Vec<Transaction> {
		self.order.iter().filter_map(|key| self.by_hash.get(&key.1).cloned()).collect()
	}

	pub fn len(&self) -> usize {
		self.by_hash.len()
	}

	pub fn is_empty(&self) -> bool {
		self.by_hash.is_empty()
	}

	pub fn contains(&self, hash: &H256) -> bool {
		self.by_hash.contains_key(hash)
	}
}
