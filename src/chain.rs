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

//! The chain manager itself: construction, block accessors (`spec.md` §4.B)
//! and block ingestion with fork choice (`spec.md` §4.E).
//!
//! Shaped after `ethcore/src/client/client.rs`'s `Client`: one struct behind
//! `parking_lot` locks, a single `import_verified_blocks`-style entry point,
//! and a `commit_block`-style single end-of-import commit. The multi-threaded
//! import queue and verification pipeline that surrounds `Client` in the
//! teacher are gone -- `spec.md` §5 calls for a single-threaded, non-suspending
//! caller discipline, so there is nothing here for a thread to contend over;
//! the locks exist only so a `ChainManager` can be shared behind an `Arc` for
//! read access (`get_block`, `head_hash`, ...), not to arbitrate writers.

use std::collections::HashMap;

use ethereum_types::{H256, U256};
use itertools::Itertools;
use log::{debug, trace, warn};
use parking_lot::{Mutex, RwLock};

use crate::config::ChainConfig;
use crate::error::{ErrorKind, Result};
use crate::execution::{ExecutionBackend, StateBackend};
use crate::genesis::GenesisInput;
use crate::keys;
use crate::kv::PersistentIndex;
use crate::pool::TransactionPool;
use crate::poststate;
use crate::queue::{ParentQueue, TimeQueue};
use crate::types::{Block, BlockNumber, Transaction, TxLocation};

/// What became of a block handed to [`ChainManager::add_block`]
/// (`spec.md` §4.E, §7.1: none of these are errors).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
	/// Extended the canonical chain (either directly, or via a reorg onto
	/// a heavier side branch).
	Applied,
	/// Timestamp is still in the future; parked in the time queue.
	Deferred,
	/// Parent hasn't arrived yet; parked in the parent queue.
	Queued,
	/// Already known (already in the block store).
	Known,
	/// Stored as a valid side branch, but not heavy enough to become head.
	Retained,
	/// The execution layer rejected the block outright.
	Rejected,
}

pub struct ChainManager<E: ExecutionBackend> {
	pub(crate) index: PersistentIndex,
	execution: E,
	config: ChainConfig,
	head: RwLock<H256>,
	state: RwLock<E::State>,
	pub(crate) score_cache: RwLock<HashMap<H256, U256>>,
	time_queue: Mutex<TimeQueue>,
	parent_queue: Mutex<ParentQueue>,
	pool: Mutex<TransactionPool>,
}

impl<E: ExecutionBackend> ChainManager<E> {
	/// Resolve `genesis` (or resume from a stored `head_hash`) and bring up
	/// a chain manager ready to accept blocks (`spec.md` §6).
	pub fn new(index: PersistentIndex, execution: E, config: ChainConfig, genesis: GenesisInput<E::State>) -> Result<Self> {
		let stored_head = index.get(keys::HEAD_HASH).map(|raw| H256::from_slice(&raw));

		let head_hash = match stored_head {
			Some(hash) => hash,
			None => {
				let resolved = genesis.resolve().ok_or(ErrorKind::NoGenesis)?;
				let hash = resolved.header.hash();
				let genesis_block = Block { header: resolved.header, transactions: Vec::new(), uncles: Vec::new() };

				index.put(&keys::block_key(&hash), &rlp::encode(&genesis_block));
				index.put(&keys::height_key(genesis_block.header.number), hash.as_bytes());
				index.put(keys::HEAD_HASH, hash.as_bytes());
				index.put(keys::GENESIS_NUMBER, &genesis_block.header.number.to_be_bytes());
				index.put(
					keys::GENESIS_STATE,
					&serde_json::to_vec(&resolved.state.to_snapshot()).expect("state snapshot always serializes"),
				);
				index.put(&keys::score_key(&hash), &crate::score::u256_to_ascii(U256::zero()));
				index.commit()?;
				hash
			}
		};

		let state = poststate::reconstruct::<E>(&index, head_hash)?;

		Ok(ChainManager {
			index,
			execution,
			config,
			head: RwLock::new(head_hash),
			state: RwLock::new(state),
			score_cache: RwLock::new(HashMap::new()),
			time_queue: Mutex::new(TimeQueue::new()),
			parent_queue: Mutex::new(ParentQueue::new()),
			pool: Mutex::new(TransactionPool::new()),
		})
	}

	// ---- component B: block accessors -----------------------------------

	pub fn get_block(&self, hash: &H256) -> Option<Block> {
		self.index.get(&keys::block_key(hash)).map(|raw| rlp::decode(&raw).expect("corrupt block store"))
	}

	pub fn get_parent(&self, block: &Block) -> Option<Block> {
		self.get_block(&block.header.parent_hash)
	}

	pub fn is_genesis_number(&self, number: BlockNumber) -> bool {
		number == self.genesis_number()
	}

	/// The height genesis itself sits at. Usually zero, but a `Snapshot`
	/// genesis may continue a prior chain's history at a nonzero height
	/// (`spec.md` §6(d)).
	fn genesis_number(&self) -> BlockNumber {
		self.index
			.get(keys::GENESIS_NUMBER)
			.map(|raw| {
				let mut buf = [0u8; 8];
				buf.copy_from_slice(&raw);
				BlockNumber::from_be_bytes(buf)
			})
			.unwrap_or(0)
	}

	pub fn get_blockhash_by_number(&self, number: BlockNumber) -> Option<H256> {
		self.index.get(&keys::height_key(number)).map(|raw| H256::from_slice(&raw))
	}

	pub fn get_block_by_number(&self, number: BlockNumber) -> Option<Block> {
		self.get_blockhash_by_number(number).and_then(|hash| self.get_block(&hash))
	}

	pub fn get_child_hashes(&self, parent: &H256) -> Vec<H256> {
		self.index.get(&keys::child_key(parent)).map(|raw| rlp::decode_list(&raw)).unwrap_or_default()
	}

	pub fn get_children(&self, parent: &H256) -> Vec<Block> {
		self.get_child_hashes(parent).into_iter().filter_map(|hash| self.get_block(&hash)).collect()
	}

	pub fn get_transaction_location(&self, tx_hash: &H256) -> Option<TxLocation> {
		self.index.get(&keys::txindex_key(tx_hash)).map(|raw| rlp::decode(&raw).expect("corrupt txindex entry"))
	}

	pub fn get_transaction(&self, tx_hash: &H256) -> Option<Transaction> {
		let loc = self.get_transaction_location(tx_hash)?;
		let block = self.get_block_by_number(loc.block_number)?;
		block.transactions.into_iter().nth(loc.index)
	}

	pub fn head_hash(&self) -> H256 {
		*self.head.read()
	}

	pub fn head_block(&self) -> Block {
		self.get_block(&self.head_hash()).expect("head_hash always points at a stored block")
	}

	pub(crate) fn state(&self) -> E::State {
		self.state.read().clone()
	}

	pub fn config(&self) -> &ChainConfig {
		&self.config
	}

	pub(crate) fn execution(&self) -> &E {
		&self.execution
	}

	// ---- component G: pool front door ------------------------------------

	/// Admit a transaction into the pool (`spec.md` §4.G).
	pub fn submit_transaction(&self, tx: Transaction) -> bool {
		self.pool.lock().add_transaction(tx, self.config.min_gasprice, self.config.max_pool_size)
	}

	pub fn pool_len(&self) -> usize {
		self.pool.lock().len()
	}

	pub(crate) fn pool_candidates(&self) -> Vec<Transaction> {
		self.pool.lock().candidates()
	}

	// ---- component E: ingestion and fork choice --------------------------

	/// Hand a block to the chain manager (`spec.md` §4.E). Never returns
	/// `Err` for anything execution, timing or pool related -- only a
	/// corrupt-store condition surfaces as one (`spec.md` §7). Does not
	/// itself drain the arrival queues -- a future-dated or orphaned block
	/// sits there until a caller explicitly calls [`Self::process_time_queue`]
	/// or [`Self::process_parent_queue`] (`spec.md` §6, §8 scenarios 2-3).
	pub fn add_block(&self, block: Block, now: u64) -> Result<AddOutcome> {
		self.add_block_one(block, now)
	}

	fn add_block_one(&self, block: Block, now: u64) -> Result<AddOutcome> {
		let hash = block.hash();

		if self.index.contains(&keys::block_key(&hash)) {
			return Ok(AddOutcome::Known);
		}

		if block.header.timestamp > now {
			trace!(target: "chain::queue", "deferring block {} (timestamp {} > now {})", hash, block.header.timestamp, now);
			self.time_queue.lock().insert(block);
			return Ok(AddOutcome::Deferred);
		}

		if !self.is_genesis_number(block.header.number) && !self.index.contains(&keys::block_key(&block.header.parent_hash)) {
			trace!(target: "chain::queue", "queuing block {} on missing parent {}", hash, block.header.parent_hash);
			self.parent_queue.lock().insert(block.header.parent_hash, block);
			return Ok(AddOutcome::Queued);
		}

		self.import_ready_block(block)
	}

	/// Pop every time-queue entry with `timestamp <= now` and re-offer it to
	/// [`Self::add_block_one`] (`spec.md` §4.E "`process_time_queue`").
	pub fn process_time_queue(&self, now: u64) -> Result<()> {
		let ready = self.time_queue.lock().drain_ready(now);
		for block in ready {
			self.add_block_one(block, now)?;
		}
		Ok(())
	}

	/// For each parent hash currently blocking a waiting bucket, if that
	/// parent is now in the store, re-ingest every waiting child and remove
	/// the bucket (`spec.md` §4.E, §9: "for each parent hash now resolved,
	/// ingest its waiting children and remove the bucket", done explicitly
	/// rather than mutating the map while iterating it as a sequence).
	pub fn process_parent_queue(&self, now: u64) -> Result<()> {
		loop {
			let pending_parents = self.parent_queue.lock().pending_parents();
			let mut progressed = false;

			for parent_hash in pending_parents {
				if !self.index.contains(&keys::block_key(&parent_hash)) {
					continue;
				}
				let released = self.parent_queue.lock().take(&parent_hash);
				if let Some(children) = released {
					progressed = true;
					for child in children {
						self.add_block_one(child, now)?;
					}
				}
			}

			if !progressed {
				return Ok(());
			}
		}
	}

	pub fn has_block(&self, hash: &H256) -> bool {
		self.index.contains(&keys::block_key(hash))
	}

	/// All stored canonical blocks in `[from, to)`, per `spec.md` §6, §9
	/// (the source's `get_chain` never returns its accumulator when the loop
	/// exhausts `to`; this returns it).
	pub fn get_chain(&self, from: BlockNumber, to: BlockNumber) -> Vec<Block> {
		(from..to).filter_map(|number| self.get_block_by_number(number)).collect()
	}

	fn import_ready_block(&self, block: Block) -> Result<AddOutcome> {
		let hash = block.hash();
		let head = self.head_hash();

		if block.header.parent_hash == head {
			let mut state = self.state();
			if self.execution.apply_block(&mut state, &block).is_err() {
				warn!(target: "chain", "execution rejected block {} extending head {}", hash, head);
				return Ok(AddOutcome::Rejected);
			}

			self.store_block(&block);
			self.index.put(&keys::height_key(block.header.number), hash.as_bytes());
			self.index.put(keys::HEAD_HASH, hash.as_bytes());
			self.index_transactions(&block);
			self.get_score(&block);

			*self.state.write() = state;
			*self.head.write() = hash;
			self.pool.lock().prune_applied(&block.transactions);

			self.index.commit()?;
			debug!(
				target: "chain",
				"extended head to {} at #{} ({} txs: {})",
				hash,
				block.header.number,
				block.transactions.len(),
				block.transactions.iter().map(|tx| tx.hash()).join(",")
			);
			return Ok(AddOutcome::Applied);
		}

		// Side branch: reconstruct the parent's poststate and speculatively
		// apply there, so an invalid side block never disturbs the live head.
		let mut branch_state = match poststate::reconstruct::<E>(&self.index, block.header.parent_hash) {
			Ok(state) => state,
			Err(_) => {
				self.parent_queue.lock().insert(block.header.parent_hash, block);
				return Ok(AddOutcome::Queued);
			}
		};
		if self.execution.apply_block(&mut branch_state, &block).is_err() {
			warn!(target: "chain", "execution rejected side branch block {}", hash);
			return Ok(AddOutcome::Rejected);
		}

		self.store_block(&block);
		let new_score = self.get_score(&block);
		let head_score = self.get_score(&self.head_block());
		debug!(target: "chain::score", "side branch {} scores {} against head score {}", hash, new_score, head_score);

		if new_score > head_score {
			self.reorg_to(&block, branch_state)?;
			Ok(AddOutcome::Applied)
		} else {
			// Side branch recorded (block + child pointer + score) but not
			// adopted: the height/tx index stays exactly as it is, since
			// `reorg_to` is the only place that ever rewrites them.
			self.index.commit()?;
			Ok(AddOutcome::Retained)
		}
	}

	fn store_block(&self, block: &Block) {
		let hash = block.hash();
		self.index.put(&keys::block_key(&hash), &rlp::encode(block));
		self.add_child(block.header.parent_hash, hash);
	}

	fn add_child(&self, parent: H256, child: H256) {
		let mut children = self.get_child_hashes(&parent);
		if !children.contains(&child) {
			children.push(child);
			self.index.put(&keys::child_key(&parent), &rlp::encode_list(&children));
		}
	}

	fn index_transactions(&self, block: &Block) {
		for (idx, tx) in block.transactions.iter().enumerate() {
			let loc = TxLocation { block_number: block.header.number, index: idx };
			self.index.put(&keys::txindex_key(&tx.hash()), &rlp::encode(&loc));
		}
	}

	/// Atomically rewrite the height index and tx index from the fork point
	/// forward, then swap in the new head and state, all under one
	/// `commit()` (`spec.md` §4.E "reorg protocol").
	fn reorg_to(&self, new_head: &Block, new_state: E::State) -> Result<()> {
		let mut retreat = self.head_block();
		let mut advance = new_head.clone();
		let mut old_branch = Vec::new();
		let mut new_branch = vec![advance.clone()];

		while retreat.header.number > advance.header.number {
			old_branch.push(retreat.clone());
			retreat = self.get_parent(&retreat).ok_or_else(|| ErrorKind::CorruptStore(retreat.header.parent_hash))?;
		}
		while advance.header.number > retreat.header.number {
			advance = self.get_parent(&advance).ok_or_else(|| ErrorKind::CorruptStore(advance.header.parent_hash))?;
			new_branch.push(advance.clone());
		}
		while retreat.hash() != advance.hash() {
			old_branch.push(retreat.clone());
			retreat = self.get_parent(&retreat).ok_or_else(|| ErrorKind::CorruptStore(retreat.header.parent_hash))?;
			advance = self.get_parent(&advance).ok_or_else(|| ErrorKind::CorruptStore(advance.header.parent_hash))?;
			new_branch.push(advance.clone());
		}
		new_branch.reverse(); // ascending, fork point (exclusive) to new head

		warn!(
			target: "chain",
			"reorg: retiring {} block(s) ({}) for {} block(s) ({}) onto new head {}",
			old_branch.len(),
			old_branch.iter().map(|b| b.hash()).join(","),
			new_branch.len(),
			new_branch.iter().map(|b| b.hash()).join(","),
			new_head.hash()
		);

		// Rewrite the height index one height at a time, fork point upward,
		// terminating only when both sides are empty at that height (`spec.md`
		// §4.E reorg protocol). A shorter new chain still orphans every height
		// the old chain reached above it -- `block:<i>` must be deleted there,
		// not just left pointing at the retired block (I1). Per height, delete
		// the old side's `txindex` entries *before* writing the new side's, so
		// a transaction replayed into both branches ends up indexed, not
		// wrongly dropped (I4).
		let old_by_height: HashMap<BlockNumber, &Block> = old_branch.iter().map(|b| (b.header.number, b)).collect();
		let new_by_height: HashMap<BlockNumber, &Block> = new_branch.iter().map(|b| (b.header.number, b)).collect();
		let lowest = new_branch.first().map(|b| b.header.number).unwrap_or(new_head.header.number);
		let highest = old_by_height.keys().chain(new_by_height.keys()).copied().max().unwrap_or(lowest);

		for height in lowest..=highest {
			if let Some(block) = old_by_height.get(&height) {
				for tx in &block.transactions {
					self.index.delete(&keys::txindex_key(&tx.hash()));
				}
			}
			match new_by_height.get(&height) {
				Some(block) => {
					self.index.put(&keys::height_key(height), block.hash().as_bytes());
					self.index_transactions(block);
				}
				None => self.index.delete(&keys::height_key(height)),
			}
		}

		self.index.put(keys::HEAD_HASH, new_head.hash().as_bytes());
		*self.head.write() = new_head.hash();
		*self.state.write() = new_state;

		let mut pool = self.pool.lock();
		for block in &old_branch {
			for tx in &block.transactions {
				pool.reinstate(tx.clone());
			}
		}
		for block in &new_branch {
			pool.prune_applied(&block.transactions);
		}
		drop(pool);

		self.index.commit()?;
		Ok(())
	}
}
