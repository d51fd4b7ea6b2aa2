//! In-memory ledger that runs the lease contract's rules

use crate::algod::{
    AccountInfo, ApplicationInfo, ApplicationParams, Ledger, NodeStatus, PendingTransaction,
    SimulateResponse, SimulatedGroup, SimulatedTxnResult, TealKeyValue, TealValue,
};
use crate::constants::{
    estimate_ujrah, ANNUAL_UJRAH_RATE_BP, MIN_LEASE_DEPOSIT, SECONDS_PER_YEAR,
};
use crate::contracts::{
    box_name, method_by_selector, AbiValue, ANNUAL_UJRAH_RATE_KEY, CHECK_LESSOR_INFO, CLAIM_UJRAH,
    GET_MY_IJARAH_INFO, LEASE_VALIDATION_RIGHTS, SECONDS_PER_YEAR_KEY, TERMINATE_LEASE,
    TOTAL_CONTRACT_BALANCE,
};
use crate::error::LeaseError;
use crate::signer::{LocalSigner, TransactionSigner};
use crate::transaction::{assign_group_id, SignedTransaction, SuggestedParams, Transaction, TxKind};
use crate::types::Address;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use eyre::{bail, ensure, eyre, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

const ACCOUNT_MIN_BALANCE: u64 = 100_000;
const APP_FUNDING: u64 = 10_000_000_000;
const GENESIS_TIMESTAMP: u64 = 1_700_000_000;

#[derive(Debug, Clone, Copy)]
struct LeaseBox {
    principal: u64,
    start: u64,
    last_claim: u64,
}

#[derive(Clone)]
struct State {
    round: u64,
    now: u64,
    balances: HashMap<Address, u64>,
    boxes: HashMap<Address, LeaseBox>,
    pending: HashMap<String, PendingTransaction>,
    submitted: Vec<Vec<SignedTransaction>>,
    confirm: bool,
    simulation_failure: Option<String>,
}

impl State {
    fn ujrah(&self, lessor: &Address) -> u64 {
        self.boxes
            .get(lessor)
            .map(|b| {
                estimate_ujrah(
                    b.principal,
                    self.now.saturating_sub(b.last_claim),
                    ANNUAL_UJRAH_RATE_BP,
                )
            })
            .unwrap_or(0)
    }

    fn transfer(&mut self, from: Address, to: Address, amount: u64) -> Result<()> {
        let balance = self.balances.get(&from).copied().unwrap_or(0);
        ensure!(balance >= amount, "overspend: {} has {}", from, balance);
        self.balances.insert(from, balance - amount);
        *self.balances.entry(to).or_insert(0) += amount;
        Ok(())
    }

    fn charge_fee(&mut self, txn: &Transaction) -> Result<()> {
        let balance = self.balances.get(&txn.sender).copied().unwrap_or(0);
        ensure!(
            balance >= txn.fee + ACCOUNT_MIN_BALANCE,
            "overspend: {} cannot pay fee {}",
            txn.sender,
            txn.fee
        );
        self.balances.insert(txn.sender, balance - txn.fee);
        Ok(())
    }
}

/// Wallet that declines every signature request
pub struct DecliningSigner {
    address: Address,
}

impl DecliningSigner {
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            address: LocalSigner::from_seed(seed).address(),
        }
    }
}

impl TransactionSigner for DecliningSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_group(&self, _txns: &[Transaction]) -> Result<Vec<SignedTransaction>> {
        Err(LeaseError::WalletRejected("user cancelled the request".to_string()).into())
    }
}

/// Ledger double with a controllable clock
pub struct MockLedger {
    app_id: u64,
    app_address: Address,
    state: Mutex<State>,
    requests: AtomicUsize,
}

impl MockLedger {
    pub fn new(app_id: u64) -> Self {
        let app_address = Address::for_application(app_id);
        let mut balances = HashMap::new();
        balances.insert(app_address, APP_FUNDING);

        Self {
            app_id,
            app_address,
            state: Mutex::new(State {
                round: 1,
                now: GENESIS_TIMESTAMP,
                balances,
                boxes: HashMap::new(),
                pending: HashMap::new(),
                submitted: Vec::new(),
                confirm: true,
                simulation_failure: None,
            }),
            requests: AtomicUsize::new(0),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    fn hit(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }

    pub fn fund(&self, address: Address, amount: u64) {
        *self.state().balances.entry(address).or_insert(0) += amount;
    }

    pub fn advance_time(&self, seconds: u64) {
        self.state().now += seconds;
    }

    /// When false, submitted groups apply but never report a confirmed round
    pub fn set_confirmations(&self, confirm: bool) {
        self.state().confirm = confirm;
    }

    /// Mark `tx_id` as evicted from the pool with `reason`
    pub fn reject(&self, tx_id: &str, reason: &str) {
        self.state().pending.insert(
            tx_id.to_string(),
            PendingTransaction {
                confirmed_round: None,
                pool_error: reason.to_string(),
                logs: Vec::new(),
            },
        );
    }

    /// Make every simulation report `message` as its group failure
    pub fn fail_simulations(&self, message: &str) {
        self.state().simulation_failure = Some(message.to_string());
    }

    /// Number of node requests served so far
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn submitted(&self) -> Vec<Vec<SignedTransaction>> {
        self.state().submitted.clone()
    }

    /// Run the app call at `index` against `state`, returning its log lines
    fn execute(&self, state: &mut State, group: &[Transaction], index: usize) -> Result<Vec<Vec<u8>>> {
        let txn = &group[index];
        let TxKind::AppCall {
            app_id,
            app_args,
            boxes,
            ..
        } = &txn.kind
        else {
            return Ok(Vec::new());
        };
        ensure!(*app_id == self.app_id, "unknown application {}", app_id);

        let selector = app_args.first().ok_or_else(|| eyre!("missing selector"))?;
        let method = method_by_selector(selector).ok_or_else(|| eyre!("unknown selector"))?;
        let args = method.decode_app_args(app_args)?;
        let sender = txn.sender;

        let require_box = |lessor: &Address| -> Result<()> {
            let name = box_name(lessor);
            ensure!(
                boxes.iter().any(|b| b.app_index == 0 && b.name == name),
                "invalid Box reference {}",
                hex::encode(&name)
            );
            Ok(())
        };

        let value = if *method == LEASE_VALIDATION_RIGHTS {
            require_box(&sender)?;
            let payment = index
                .checked_sub(1)
                .and_then(|i| group.get(i))
                .ok_or_else(|| eyre!("missing payment transaction"))?;
            let TxKind::Payment { receiver, amount } = payment.kind else {
                bail!("expected payment transaction");
            };
            ensure!(receiver == self.app_address, "Invalid receiver");
            ensure!(amount >= MIN_LEASE_DEPOSIT, "Min 1 ALGO");

            let unclaimed = state.ujrah(&sender);
            if unclaimed > 0 {
                state.transfer(self.app_address, sender, unclaimed)?;
            }
            let principal = state.boxes.get(&sender).map(|b| b.principal).unwrap_or(0) + amount;
            let now = state.now;
            state.boxes.insert(
                sender,
                LeaseBox {
                    principal,
                    start: now,
                    last_claim: now,
                },
            );
            AbiValue::String(format!("Lease started! Amount: {}", principal))
        } else if *method == CLAIM_UJRAH {
            require_box(&sender)?;
            let ujrah = state.ujrah(&sender);
            ensure!(ujrah > 0, "No ujrah yet");
            let now = state.now;
            if let Some(record) = state.boxes.get_mut(&sender) {
                record.last_claim = now;
            }
            state.transfer(self.app_address, sender, ujrah)?;
            AbiValue::String(format!("Ujrah claimed: {}", ujrah))
        } else if *method == TERMINATE_LEASE {
            require_box(&sender)?;
            let amount = args.first().and_then(AbiValue::as_u64).unwrap_or(0);
            ensure!(amount > 0, "Invalid amount");
            let record = state.boxes.get(&sender).copied();
            let principal = record.map(|b| b.principal).unwrap_or(0);
            ensure!(amount <= principal, "Exceeds balance");

            let total = amount + state.ujrah(&sender);
            match record {
                Some(record) if principal > amount => {
                    let now = state.now;
                    state.boxes.insert(
                        sender,
                        LeaseBox {
                            principal: principal - amount,
                            start: record.start,
                            last_claim: now,
                        },
                    );
                }
                _ => {
                    state.boxes.remove(&sender);
                }
            }
            state.transfer(self.app_address, sender, total)?;
            AbiValue::String(format!("Withdrawn {} microALGO", total))
        } else if *method == GET_MY_IJARAH_INFO {
            require_box(&sender)?;
            let fields = match state.boxes.get(&sender) {
                Some(b) => [b.principal, state.ujrah(&sender), state.now - b.start],
                None => [0, 0, 0],
            };
            AbiValue::Tuple(fields.into_iter().map(AbiValue::Uint64).collect())
        } else if *method == CHECK_LESSOR_INFO {
            let lessor = *args
                .first()
                .and_then(AbiValue::as_address)
                .ok_or_else(|| eyre!("missing lessor"))?;
            require_box(&lessor)?;
            let principal = state.boxes.get(&lessor).map(|b| b.principal).unwrap_or(0);
            AbiValue::Tuple(vec![
                AbiValue::Uint64(principal),
                AbiValue::Uint64(state.ujrah(&lessor)),
            ])
        } else if *method == TOTAL_CONTRACT_BALANCE {
            AbiValue::Uint64(state.balances.get(&self.app_address).copied().unwrap_or(0))
        } else {
            bail!("unhandled method {}", method.name);
        };

        Ok(vec![method.encode_return(&value)?])
    }
}

fn verify(signed: &SignedTransaction) -> Result<()> {
    let sig = signed.sig.ok_or_else(|| eyre!("transaction is not signed"))?;
    let key = VerifyingKey::from_bytes(signed.txn.sender.as_bytes())?;
    key.verify(&signed.txn.bytes_to_sign()?, &Signature::from_bytes(&sig))
        .map_err(|_| eyre!("signature validation failed"))
}

impl Ledger for MockLedger {
    async fn suggested_params(&self) -> Result<SuggestedParams> {
        self.hit();
        Ok(SuggestedParams {
            fee: 0,
            min_fee: 1_000,
            last_round: self.state().round,
            genesis_id: "dockernet-v1".to_string(),
            genesis_hash: vec![7u8; 32],
            consensus_version: String::new(),
        })
    }

    async fn account_info(&self, address: &Address) -> Result<AccountInfo> {
        self.hit();
        let state = self.state();
        Ok(AccountInfo {
            address: address.to_string(),
            amount: state.balances.get(address).copied().unwrap_or(0),
            min_balance: ACCOUNT_MIN_BALANCE,
            round: state.round,
        })
    }

    async fn simulate(&self, txns: &[SignedTransaction]) -> Result<SimulateResponse> {
        self.hit();
        let group: Vec<Transaction> = txns.iter().map(|s| s.txn.clone()).collect();
        let mut scratch = self.state().clone();
        if let Some(message) = scratch.simulation_failure.take() {
            return Ok(SimulateResponse {
                txn_groups: vec![SimulatedGroup {
                    failure_message: Some(message),
                    txn_results: Vec::new(),
                }],
            });
        }

        let mut results = Vec::with_capacity(group.len());
        for index in 0..group.len() {
            match self.execute(&mut scratch, &group, index) {
                Ok(logs) => results.push(SimulatedTxnResult {
                    txn_result: PendingTransaction {
                        logs,
                        ..Default::default()
                    },
                }),
                Err(e) => {
                    return Ok(SimulateResponse {
                        txn_groups: vec![SimulatedGroup {
                            failure_message: Some(format!("logic eval error: {}", e)),
                            txn_results: Vec::new(),
                        }],
                    })
                }
            }
        }

        Ok(SimulateResponse {
            txn_groups: vec![SimulatedGroup {
                failure_message: None,
                txn_results: results,
            }],
        })
    }

    async fn submit(&self, txns: &[SignedTransaction]) -> Result<String> {
        self.hit();
        ensure!(!txns.is_empty(), "empty group");
        for signed in txns {
            verify(signed)?;
        }

        let group: Vec<Transaction> = txns.iter().map(|s| s.txn.clone()).collect();
        if group.len() > 1 {
            let mut regrouped = group.clone();
            let expected = assign_group_id(&mut regrouped)?;
            ensure!(
                group.iter().all(|t| t.group == Some(expected)),
                "incomplete group"
            );
        }

        let mut state = self.state();
        let mut next = state.clone();
        let mut logs = Vec::with_capacity(group.len());
        for (index, txn) in group.iter().enumerate() {
            next.charge_fee(txn)
                .and_then(|_| match txn.kind {
                    TxKind::Payment { receiver, amount } => {
                        next.transfer(txn.sender, receiver, amount)
                    }
                    TxKind::AppCall { .. } => Ok(()),
                })
                .and_then(|_| self.execute(&mut next, &group, index))
                .map(|l| logs.push(l))
                .map_err(|e| eyre!("TransactionPool.Remember: {}", e))?;
        }

        next.round += 1;
        let confirmed_round = next.confirm.then_some(next.round);
        for (txn, logs) in group.iter().zip(logs) {
            next.pending.insert(
                txn.id()?,
                PendingTransaction {
                    confirmed_round,
                    pool_error: String::new(),
                    logs,
                },
            );
        }
        next.submitted.push(txns.to_vec());
        *state = next;

        group[0].id()
    }

    async fn pending_transaction(&self, tx_id: &str) -> Result<PendingTransaction> {
        self.hit();
        self.state()
            .pending
            .get(tx_id)
            .cloned()
            .ok_or_else(|| eyre!("txn does not exist"))
    }

    async fn status(&self) -> Result<NodeStatus> {
        self.hit();
        Ok(NodeStatus {
            last_round: self.state().round,
        })
    }

    async fn wait_for_block_after(&self, round: u64) -> Result<NodeStatus> {
        self.hit();
        let mut state = self.state();
        state.round = state.round.max(round + 1);
        Ok(NodeStatus {
            last_round: state.round,
        })
    }

    async fn application(&self, app_id: u64) -> Result<ApplicationInfo> {
        self.hit();
        ensure!(app_id == self.app_id, "application does not exist");
        let uint = |key: &str, uint: u64| TealKeyValue {
            key: key.as_bytes().to_vec(),
            value: TealValue {
                value_type: 2,
                bytes: Vec::new(),
                uint,
            },
        };
        Ok(ApplicationInfo {
            id: app_id,
            params: ApplicationParams {
                creator: Address::ZERO.to_string(),
                global_state: vec![
                    uint(ANNUAL_UJRAH_RATE_KEY, ANNUAL_UJRAH_RATE_BP),
                    uint(SECONDS_PER_YEAR_KEY, SECONDS_PER_YEAR),
                ],
            },
        })
    }
}
