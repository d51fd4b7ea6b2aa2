//! Transaction assembly and canonical msgpack encoding
//!
//! Only the fields the Ijarah flow needs are modelled: payments and NoOp
//! application calls with args, foreign accounts and box references.
//! Encoding follows the node's canonical form: map keys sorted, zero and
//! empty values omitted.

use crate::types::{sha512_256, Address};
use data_encoding::BASE32_NOPAD;
use eyre::{eyre, Result};
use serde::{Deserialize, Serialize, Serializer};
use serde_bytes::Bytes;

const TX_PREFIX: &[u8] = b"TX";
const TX_GROUP_PREFIX: &[u8] = b"TG";

/// Size an ed25519 signature adds to a signed transaction
const SIGNATURE_OVERHEAD: u64 = 75;

/// Network parameters for building transactions (`GET /v2/transactions/params`)
#[derive(Debug, Clone, Deserialize)]
pub struct SuggestedParams {
    /// Fee per byte; zero when the network is not congested
    pub fee: u64,
    #[serde(rename = "min-fee")]
    pub min_fee: u64,
    #[serde(rename = "last-round")]
    pub last_round: u64,
    #[serde(rename = "genesis-id")]
    pub genesis_id: String,
    #[serde(rename = "genesis-hash", with = "crate::algod::base64_bytes")]
    pub genesis_hash: Vec<u8>,
    #[serde(rename = "consensus-version", default)]
    pub consensus_version: String,
}

/// Reference to a box the call will touch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoxReference {
    /// Index into the foreign apps array; 0 is the called application
    #[serde(rename = "i", skip_serializing_if = "is_zero")]
    pub app_index: u64,
    #[serde(rename = "n", with = "serde_bytes", skip_serializing_if = "Vec::is_empty")]
    pub name: Vec<u8>,
}

/// Type-specific transaction fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxKind {
    Payment {
        receiver: Address,
        amount: u64,
    },
    AppCall {
        app_id: u64,
        app_args: Vec<Vec<u8>>,
        accounts: Vec<Address>,
        boxes: Vec<BoxReference>,
    },
}

/// An unsigned transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub sender: Address,
    pub fee: u64,
    pub first_valid: u64,
    pub last_valid: u64,
    pub genesis_id: String,
    pub genesis_hash: Vec<u8>,
    pub group: Option<[u8; 32]>,
    pub note: Vec<u8>,
    pub kind: TxKind,
}

/// A transaction with its signature; `None` is only accepted by simulation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub txn: Transaction,
    pub sig: Option<[u8; 64]>,
}

// ========== Canonical msgpack ==========
//
// Wire structs list their fields in key order and skip zero or empty
// values, so `rmp_serde::to_vec_named` yields the node's canonical form.

fn is_zero(value: &u64) -> bool {
    *value == 0
}

fn is_empty_str(value: &&str) -> bool {
    value.is_empty()
}

fn bytes(data: &[u8]) -> Option<&Bytes> {
    (!data.is_empty()).then(|| Bytes::new(data))
}

#[derive(Serialize)]
struct TxnFields<'a> {
    #[serde(skip_serializing_if = "is_zero")]
    amt: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    apaa: Vec<&'a Bytes>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    apat: Vec<&'a Bytes>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    apbx: Vec<&'a BoxReference>,
    #[serde(skip_serializing_if = "is_zero")]
    apid: u64,
    #[serde(skip_serializing_if = "is_zero")]
    fee: u64,
    #[serde(skip_serializing_if = "is_zero")]
    fv: u64,
    #[serde(skip_serializing_if = "is_empty_str")]
    gen: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    gh: Option<&'a Bytes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    grp: Option<&'a Bytes>,
    #[serde(skip_serializing_if = "is_zero")]
    lv: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<&'a Bytes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rcv: Option<&'a Bytes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    snd: Option<&'a Bytes>,
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct SignedTxnFields<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    sig: Option<&'a Bytes>,
    txn: &'a Transaction,
}

#[derive(Serialize)]
struct TxGroup<'a> {
    txlist: Vec<&'a Bytes>,
}

#[derive(Serialize)]
struct SimulateRequest<'a> {
    #[serde(rename = "allow-empty-signatures")]
    allow_empty_signatures: bool,
    #[serde(rename = "txn-groups")]
    txn_groups: Vec<SimulateGroup<'a>>,
}

#[derive(Serialize)]
struct SimulateGroup<'a> {
    txns: &'a [SignedTransaction],
}

fn to_msgpack<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    rmp_serde::to_vec_named(value).map_err(|e| eyre!("msgpack encoding failed: {}", e))
}

impl Serialize for Transaction {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut fields = TxnFields {
            amt: 0,
            apaa: Vec::new(),
            apat: Vec::new(),
            apbx: Vec::new(),
            apid: 0,
            fee: self.fee,
            fv: self.first_valid,
            gen: &self.genesis_id,
            gh: bytes(&self.genesis_hash),
            grp: self.group.as_ref().map(|g| Bytes::new(g)),
            lv: self.last_valid,
            note: bytes(&self.note),
            rcv: None,
            snd: (self.sender != Address::ZERO).then(|| Bytes::new(self.sender.as_bytes())),
            kind: "",
        };

        match &self.kind {
            TxKind::Payment { receiver, amount } => {
                fields.kind = "pay";
                fields.amt = *amount;
                fields.rcv = (*receiver != Address::ZERO).then(|| Bytes::new(receiver.as_bytes()));
            }
            TxKind::AppCall {
                app_id,
                app_args,
                accounts,
                boxes,
            } => {
                fields.kind = "appl";
                fields.apid = *app_id;
                fields.apaa = app_args.iter().map(|a| Bytes::new(a)).collect();
                fields.apat = accounts.iter().map(|a| Bytes::new(a.as_bytes())).collect();
                fields.apbx = boxes.iter().collect();
            }
        }

        fields.serialize(serializer)
    }
}

impl Serialize for SignedTransaction {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        SignedTxnFields {
            sig: self.sig.as_ref().map(|s| Bytes::new(s)),
            txn: &self.txn,
        }
        .serialize(serializer)
    }
}

impl Transaction {
    /// Payment from `sender` to `receiver`, fee computed from the suggested params
    pub fn payment(
        params: &SuggestedParams,
        sender: Address,
        receiver: Address,
        amount: u64,
    ) -> Result<Self> {
        let mut txn = Self::base(params, sender, TxKind::Payment { receiver, amount });
        txn.fee = txn.suggested_fee(params)?;
        Ok(txn)
    }

    /// NoOp application call with a flat fee
    pub fn app_call(
        params: &SuggestedParams,
        sender: Address,
        app_id: u64,
        app_args: Vec<Vec<u8>>,
        boxes: Vec<BoxReference>,
        flat_fee: u64,
    ) -> Self {
        let mut txn = Self::base(
            params,
            sender,
            TxKind::AppCall {
                app_id,
                app_args,
                accounts: Vec::new(),
                boxes,
            },
        );
        txn.fee = flat_fee;
        txn
    }

    fn base(params: &SuggestedParams, sender: Address, kind: TxKind) -> Self {
        Self {
            sender,
            fee: 0,
            first_valid: params.last_round,
            last_valid: params.last_round + crate::constants::VALIDITY_WINDOW,
            genesis_id: params.genesis_id.clone(),
            genesis_hash: params.genesis_hash.clone(),
            group: None,
            note: Vec::new(),
            kind,
        }
    }

    /// Per-byte fee on the estimated signed size, floored at the minimum fee
    pub fn suggested_fee(&self, params: &SuggestedParams) -> Result<u64> {
        let size = self.encode()?.len() as u64 + SIGNATURE_OVERHEAD;
        Ok(params.fee.saturating_mul(size).max(params.min_fee))
    }

    /// Canonical msgpack encoding of the unsigned transaction
    pub fn encode(&self) -> Result<Vec<u8>> {
        to_msgpack(self)
    }

    /// Bytes an ed25519 signer signs: `"TX"` followed by the encoding
    pub fn bytes_to_sign(&self) -> Result<Vec<u8>> {
        let mut data = TX_PREFIX.to_vec();
        data.extend_from_slice(&self.encode()?);
        Ok(data)
    }

    pub fn raw_id(&self) -> Result<[u8; 32]> {
        Ok(sha512_256(&self.bytes_to_sign()?))
    }

    /// Transaction id as the node reports it
    pub fn id(&self) -> Result<String> {
        Ok(BASE32_NOPAD.encode(&self.raw_id()?))
    }
}

impl SignedTransaction {
    pub fn new(txn: Transaction, sig: [u8; 64]) -> Self {
        Self {
            txn,
            sig: Some(sig),
        }
    }

    /// Wrap without a signature, for simulation only
    pub fn unsigned(txn: Transaction) -> Self {
        Self { txn, sig: None }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        to_msgpack(self)
    }

    pub fn id(&self) -> Result<String> {
        self.txn.id()
    }
}

/// Compute the group id of `txns` and stamp it on each of them
pub fn assign_group_id(txns: &mut [Transaction]) -> Result<[u8; 32]> {
    for txn in txns.iter_mut() {
        txn.group = None;
    }
    let ids = txns
        .iter()
        .map(Transaction::raw_id)
        .collect::<Result<Vec<_>>>()?;
    let txlist = ids.iter().map(|id| Bytes::new(id)).collect();

    let mut data = TX_GROUP_PREFIX.to_vec();
    data.extend_from_slice(&to_msgpack(&TxGroup { txlist })?);
    let group = sha512_256(&data);

    for txn in txns.iter_mut() {
        txn.group = Some(group);
    }
    Ok(group)
}

/// Encode a simulate request body
pub fn encode_simulate_request(txns: &[SignedTransaction]) -> Result<Vec<u8>> {
    to_msgpack(&SimulateRequest {
        allow_empty_signatures: true,
        txn_groups: vec![SimulateGroup { txns }],
    })
}
