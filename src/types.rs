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

//! Block, header and transaction types.
//!
//! These are the concrete on-wire shapes the chain manager reasons about.
//! Everything the execution layer, signing and full RLP schema would add is
//! out of scope (`spec.md` §1) -- transactions here carry only the fields
//! the core touches directly, per §3's "opaque to the core except for..."

use std::collections::BTreeMap;

use ethereum_types::{Address, Bloom, H256, U256};
use keccak_hash::keccak;
pub use parity_bytes::Bytes;
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use serde::{Deserialize, Serialize};

/// Block height.
pub type BlockNumber = u64;

/// A block header. Field set per `spec.md` §3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
	pub parent_hash: H256,
	pub number: BlockNumber,
	pub timestamp: u64,
	pub difficulty: U256,
	pub gas_limit: U256,
	pub gas_used: U256,
	pub coinbase: Address,
	pub extra_data: Bytes,
	pub state_root: H256,
	pub receipts_root: H256,
	pub tx_list_root: H256,
	pub uncles_hash: H256,
	pub bloom: Bloom,
}

impl Header {
	/// The content hash of this header. Derived, never stored.
	pub fn hash(&self) -> H256 {
		keccak(rlp::encode(self))
	}
}

impl Encodable for Header {
	fn rlp_append(&self, s: &mut RlpStream) {
		s.begin_list(13);
		s.append(&self.parent_hash);
		s.append(&self.number);
		s.append(&self.timestamp);
		s.append(&self.difficulty);
		s.append(&self.gas_limit);
		s.append(&self.gas_used);
		s.append(&self.coinbase);
		s.append(&self.extra_data);
		s.append(&self.state_root);
		s.append(&self.receipts_root);
		s.append(&self.tx_list_root);
		s.append(&self.uncles_hash);
		s.append(&self.bloom);
	}
}

impl Decodable for Header {
	fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
		Ok(Header {
			parent_hash: rlp.val_at(0)?,
			number: rlp.val_at(1)?,
			timestamp: rlp.val_at(2)?,
			difficulty: rlp.val_at(3)?,
			gas_limit: rlp.val_at(4)?,
			gas_used: rlp.val_at(5)?,
			coinbase: rlp.val_at(6)?,
			extra_data: rlp.val_at(7)?,
			state_root: rlp.val_at(8)?,
			receipts_root: rlp.val_at(9)?,
			tx_list_root: rlp.val_at(10)?,
			uncles_hash: rlp.val_at(11)?,
			bloom: rlp.val_at(12)?,
		})
	}
}

/// A compact header projection carrying only the fields needed to validate
/// descendants -- `spec.md` §3 "Prev-header".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrevHeader {
	pub hash: H256,
	pub number: BlockNumber,
	pub timestamp: u64,
	pub difficulty: U256,
	pub gas_limit: U256,
	pub state_root: H256,
}

impl<'a> From<&'a Header> for PrevHeader {
	fn from(h: &'a Header) -> Self {
		PrevHeader {
			hash: h.hash(),
			number: h.number,
			timestamp: h.timestamp,
			difficulty: h.difficulty,
			gas_limit: h.gas_limit,
			state_root: h.state_root,
		}
	}
}

/// A transaction. Opaque to the core beyond the fields listed in `spec.md` §3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
	pub nonce: U256,
	pub gasprice: U256,
	pub startgas: U256,
	pub to: Option<Address>,
	pub value: U256,
	pub data: Bytes,
	pub v: u64,
	pub r: U256,
	pub s: U256,
}

impl Transaction {
	/// The content hash of this transaction. Derived, never stored.
	pub fn hash(&self) -> H256 {
		keccak(rlp::encode(self))
	}
}

impl Encodable for Transaction {
	fn rlp_append(&self, s: &mut RlpStream) {
		s.begin_list(9);
		s.append(&self.nonce);
		s.append(&self.gasprice);
		s.append(&self.startgas);
		match self.to {
			Some(ref addr) => { s.append(addr); }
			None => { s.append_empty_data(); }
		}
		s.append(&self.value);
		s.append(&self.data);
		s.append(&self.v);
		s.append(&self.r);
		s.append(&self.s);
	}
}

impl Decodable for Transaction {
	fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
		let to_rlp = rlp.at(3)?;
		let to = if to_rlp.is_empty() { None } else { Some(to_rlp.as_val()?) };
		Ok(Transaction {
			nonce: rlp.val_at(0)?,
			gasprice: rlp.val_at(1)?,
			startgas: rlp.val_at(2)?,
			to,
			value: rlp.val_at(4)?,
			data: rlp.val_at(5)?,
			v: rlp.val_at(6)?,
			r: rlp.val_at(7)?,
			s: rlp.val_at(8)?,
		})
	}
}

/// `{header, transactions[], uncles[]}` -- `spec.md` §3 "Block".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
	pub header: Header,
	pub transactions: Vec<Transaction>,
	pub uncles: Vec<Header>,
}

impl Block {
	pub fn hash(&self) -> H256 {
		self.header.hash()
	}
}

impl Encodable for Block {
	fn rlp_append(&self, s: &mut RlpStream) {
		s.begin_list(3);
		s.append(&self.header);
		s.append_list(&self.transactions);
		s.append_list(&self.uncles);
	}
}

impl Decodable for Block {
	fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
		Ok(Block {
			header: rlp.val_at(0)?,
			transactions: rlp.list_at(1)?,
			uncles: rlp.list_at(2)?,
		})
	}
}

/// A serializable record sufficient to rebuild execution state --
/// `spec.md` §3 "State snapshot".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
	pub state_root: H256,
	pub block_number: BlockNumber,
	pub gas_used: U256,
	pub prev_headers: Vec<PrevHeader>,
	pub recent_uncles: BTreeMap<BlockNumber, Vec<H256>>,
}

impl StateSnapshot {
	pub fn empty_at(state_root: H256, block_number: BlockNumber, gas_used: U256) -> Self {
		StateSnapshot {
			state_root,
			block_number,
			gas_used,
			prev_headers: Vec::new(),
			recent_uncles: BTreeMap::new(),
		}
	}
}

/// `[block_number, index]` pointer stored under `txindex:<tx_hash>` --
/// `spec.md` §3 key family table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxLocation {
	pub block_number: BlockNumber,
	pub index: usize,
}

impl Encodable for TxLocation {
	fn rlp_append(&self, s: &mut RlpStream) {
		s.begin_list(2);
		s.append(&self.block_number);
		s.append(&(self.index as u64));
	}
}

impl Decodable for TxLocation {
	fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
		Ok(TxLocation {
			block_number: rlp.val_at(0)?,
			index: rlp.val_at::<u64>(1)? as usize,
		})
	}
}
