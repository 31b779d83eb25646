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

//! Error taxonomy for the chain manager.
//!
//! Only *structural* problems (dangling parent during poststate
//! reconstruction, missing genesis at construction) and I/O failures from the
//! key-value store are modeled as `Err`. Execution rejection, deferred
//! arrival and pool rejection are normal outcomes and are reported as
//! `bool`/`Option`, never as an error -- see `chain::ChainManager::add_block`.

use ethereum_types::H256;

error_chain! {
	foreign_links {
		Io(::std::io::Error) #[doc = "Failure reported by the underlying key-value store."];
	}

	errors {
		/// No genesis was supplied and no `head_hash` is present in the store.
		NoGenesis {
			description("no genesis supplied and no stored head to resume from")
			display("chain has no genesis and no stored head_hash to resume from")
		}
		/// Walking backward from some block hit a non-genesis ancestor that
		/// isn't in the store. The store must be treated as corrupt.
		CorruptStore(hash: H256) {
			description("dangling parent reference while reconstructing poststate")
			display("block {} references a missing non-genesis parent; store is corrupt", hash)
		}
		/// The execution layer rejected a block or transaction. Carried only
		/// for logging -- callers see `add_block -> false`, not this `Err`.
		Execution(message: String) {
			description("execution layer rejected a block")
			display("execution failed: {}", message)
		}
	}
}
