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

//! Typed key-family wrapper over a byte KV store (`spec.md` §4.A).
//!
//! Writes made through `put`/`delete` are staged in a `DBTransaction` and
//! only become durable on `commit`, mirroring `Client::commit_block`'s
//! single end-of-import `state.commit()` in `ethcore/src/client/client.rs`.

use std::mem;
use std::sync::Arc;

use kvdb::{DBTransaction, KeyValueDB};
use parking_lot::Mutex;

use crate::error::Result;

/// Wraps a byte KV store, batching writes for one ingestion at a time.
pub struct PersistentIndex {
	db: Arc<dyn KeyValueDB>,
	batch: Mutex<DBTransaction>,
}

impl PersistentIndex {
	pub fn new(db: Arc<dyn KeyValueDB>) -> Self {
		PersistentIndex { db, batch: Mutex::new(DBTransaction::new()) }
	}

	/// Creates an ephemeral index backed by an in-memory store. Useful for
	/// tests and for embedders without a durable backend yet.
	pub fn in_memory() -> Self {
		Self::new(Arc::new(kvdb_memorydb::create(0)))
	}

	pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
		self.db.get(None, key).expect("key-value store io failure").map(|v| v.into_vec())
	}

	pub fn contains(&self, key: &[u8]) -> bool {
		self.get(key).is_some()
	}

	/// Stage a write. Not visible to `get` until `commit`.
	pub fn put(&self, key: &[u8], value: &[u8]) {
		self.batch.lock().put(None, key, value);
	}

	/// Stage a delete. Not visible to `get` until `commit`.
	pub fn delete(&self, key: &[u8]) {
		self.batch.lock().delete(None, key);
	}

	/// Make every staged write durable, atomically, and reset the batch.
	pub fn commit(&self) -> Result<()> {
		let batch = mem::replace(&mut *self.batch.lock(), DBTransaction::new());
		self.db.write(batch)?;
		Ok(())
	}
}
