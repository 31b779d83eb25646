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

//! Byte-key builders for the key families in `spec.md` §3.
//!
//! A block's own content-addressed key is just its 32-byte hash; everything
//! else is an ASCII-prefixed derived key so the families coexist in one
//! flat keyspace without column support from the underlying store.

use ethereum_types::H256;

use crate::types::BlockNumber;

pub const HEAD_HASH: &[u8] = b"head_hash";
pub const GENESIS_NUMBER: &[u8] = b"GENESIS_NUMBER";
pub const GENESIS_STATE: &[u8] = b"GENESIS_STATE";

pub fn block_key(hash: &H256) -> Vec<u8> {
	hash.as_bytes().to_vec()
}

pub fn score_key(hash: &H256) -> Vec<u8> {
	let mut k = b"score:".to_vec();
	k.extend_from_slice(hash.as_bytes());
	k
}

pub fn height_key(number: BlockNumber) -> Vec<u8> {
	let mut k = b"block:".to_vec();
	k.extend_from_slice(&number.to_be_bytes());
	k
}

pub fn child_key(parent: &H256) -> Vec<u8> {
	let mut k = b"child:".to_vec();
	k.extend_from_slice(parent.as_bytes());
	k
}

pub fn txindex_key(tx_hash: &H256) -> Vec<u8> {
	let mut k = b"txindex:".to_vec();
	k.extend_from_slice(tx_hash.as_bytes());
	k
}
