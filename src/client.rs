//! IjarahClient - main entry point for the SDK

use crate::algod::{AccountInfo, AlgodClient, Ledger, PendingTransaction};
use crate::config::NetworkConfig;
use crate::constants::{DEFAULT_CONFIRMATION_ROUNDS, STATE_CHANGING_FEE};
use crate::contracts::{
    box_name, AbiValue, Method, ANNUAL_UJRAH_RATE_KEY, CHECK_LESSOR_INFO, CLAIM_UJRAH,
    GET_MY_IJARAH_INFO, LEASE_VALIDATION_RIGHTS, SECONDS_PER_YEAR_KEY, TERMINATE_LEASE,
    TOTAL_CONTRACT_BALANCE,
};
use crate::error::LeaseError;
use crate::signer::TransactionSigner;
use crate::state::AccountState;
use crate::transaction::{assign_group_id, BoxReference, SignedTransaction, Transaction};
use crate::types::{Address, ContractParams, DepositParams, LeaseInfo, LessorInfo, WithdrawParams};
use crate::wallet::WalletSession;
use eyre::{eyre, Context, Result};

/// Result of a confirmed state-changing call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallReceipt {
    /// Id of the application call transaction
    pub tx_id: String,
    pub confirmed_round: u64,
    /// String returned by the contract method
    pub message: Option<String>,
}

/// Main client for interacting with the Tawf Sharia contract
///
/// Owns the wallet session and network configuration explicitly; nothing
/// is global. Reads are simulated and need no signature, writes need a
/// connected wallet.
pub struct IjarahClient<S: TransactionSigner, L: Ledger = AlgodClient> {
    session: WalletSession<S>,
    config: NetworkConfig,
    ledger: L,
    confirmation_rounds: u64,
}

impl<S: TransactionSigner> IjarahClient<S, AlgodClient> {
    /// Create a client with no wallet connected
    pub fn new(config: NetworkConfig) -> Result<Self> {
        let ledger = AlgodClient::from_config(&config)?;
        Ok(Self::with_ledger(ledger, config))
    }

    /// Create a client with `signer` already connected
    pub fn with_signer(signer: S, config: NetworkConfig) -> Result<Self> {
        let mut client = Self::new(config)?;
        client.connect(signer);
        Ok(client)
    }
}

impl<S: TransactionSigner, L: Ledger> IjarahClient<S, L> {
    /// Create a client over any ledger implementation
    pub fn with_ledger(ledger: L, config: NetworkConfig) -> Self {
        Self {
            session: WalletSession::new(),
            config,
            ledger,
            confirmation_rounds: DEFAULT_CONFIRMATION_ROUNDS,
        }
    }

    /// Rounds to wait for confirmation before giving up
    pub fn with_confirmation_rounds(mut self, rounds: u64) -> Self {
        self.confirmation_rounds = rounds;
        self
    }

    pub fn connect(&mut self, signer: S) -> Address {
        self.session.connect(signer)
    }

    pub fn disconnect(&mut self) -> Option<S> {
        self.session.disconnect()
    }

    pub fn session(&self) -> &WalletSession<S> {
        &self.session
    }

    /// Connected account, if any
    pub fn address(&self) -> Option<Address> {
        self.session.active_address()
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    fn box_reference(&self, lessor: &Address) -> BoxReference {
        BoxReference {
            app_index: 0,
            name: box_name(lessor),
        }
    }

    /// Sender for simulated reads: the connected account, else the app account
    fn read_sender(&self) -> Address {
        self.address()
            .unwrap_or_else(|| self.config.app_address())
    }

    // ========== Read-only (simulated) calls ==========

    /// Evaluate `method` without signing or committing; `None` when nothing is returned
    async fn simulate_call(
        &self,
        sender: Address,
        method: &Method,
        args: &[AbiValue],
        boxes: Vec<BoxReference>,
    ) -> Result<Option<AbiValue>> {
        let params = self.ledger.suggested_params().await?;
        let app_args = method.encode_app_args(args)?;
        let txn = Transaction::app_call(
            &params,
            sender,
            self.config.app_id,
            app_args,
            boxes,
            params.min_fee,
        );

        let response = self
            .ledger
            .simulate(&[SignedTransaction::unsigned(txn)])
            .await
            .with_context(|| format!("Failed to simulate {}", method.name))?;

        if let Some(failure) = response.failure() {
            return Err(LeaseError::Simulation(failure.to_string()).into());
        }

        method.decode_return(response.logs(0))
    }

    /// Lease of `lessor` as `get_my_ijarah_info` reports it
    async fn lease_of(&self, lessor: Address) -> Result<Option<LeaseInfo>> {
        let value = self
            .simulate_call(
                lessor,
                &GET_MY_IJARAH_INFO,
                &[],
                vec![self.box_reference(&lessor)],
            )
            .await?;

        let Some(value) = value else {
            return Ok(None);
        };
        let fields = value
            .as_u64_tuple()
            .ok_or_else(|| eyre!("Unexpected lease info return: {:?}", value))?;
        match fields.as_slice() {
            [principal, ujrah, duration] => Ok(LeaseInfo::from_tuple(*principal, *ujrah, *duration)),
            _ => Err(eyre!("Unexpected lease info arity: {}", fields.len())),
        }
    }

    /// Lease of the connected account; `None` when there is no active lease
    pub async fn my_lease_info(&self) -> Result<Option<LeaseInfo>> {
        let address = self.session.signer()?.address();
        self.lease_of(address).await
    }

    /// Principal and ujrah of any lessor
    pub async fn lessor_info(&self, lessor: &Address) -> Result<Option<LessorInfo>> {
        let value = self
            .simulate_call(
                self.read_sender(),
                &CHECK_LESSOR_INFO,
                &[AbiValue::Address(*lessor)],
                vec![self.box_reference(lessor)],
            )
            .await?;

        let Some(value) = value else {
            return Ok(None);
        };
        match value.as_u64_tuple().as_deref() {
            Some([principal, ujrah]) => Ok(LessorInfo::from_tuple(*principal, *ujrah)),
            _ => Err(eyre!("Unexpected lessor info return: {:?}", value)),
        }
    }

    /// Balance held by the application account, in µAlgo
    pub async fn total_contract_balance(&self) -> Result<u64> {
        let value = self
            .simulate_call(self.read_sender(), &TOTAL_CONTRACT_BALANCE, &[], Vec::new())
            .await?
            .ok_or_else(|| eyre!("total_contract_balance returned nothing"))?;
        value
            .as_u64()
            .ok_or_else(|| eyre!("Unexpected balance return: {:?}", value))
    }

    /// Accrual parameters from the application's global state
    pub async fn read_global_state(&self) -> Result<ContractParams> {
        let app = self
            .ledger
            .application(self.config.app_id)
            .await
            .context("Failed to read contract global state")?;

        Ok(ContractParams {
            annual_ujrah_rate_bp: app.params.global_uint(ANNUAL_UJRAH_RATE_KEY),
            seconds_per_year: app.params.global_uint(SECONDS_PER_YEAR_KEY),
        })
    }

    // ========== Account state ==========

    /// Balance of the connected account
    pub async fn account_info(&self) -> Result<AccountInfo> {
        let address = self.session.signer()?.address();
        self.ledger.account_info(&address).await
    }

    /// Re-derive account state from the node: balance and lease, fetched together
    pub async fn reconcile(&self) -> Result<AccountState> {
        let address = self.session.signer()?.address();
        let (account, lease) =
            tokio::try_join!(self.ledger.account_info(&address), self.lease_of(address))
                .context("Failed to refresh account state")?;

        tracing::debug!(
            "Reconciled {}: balance {} µAlgo, lease {:?}",
            address,
            account.amount,
            lease
        );
        Ok(AccountState::new(address, &account, lease))
    }

    // ========== Lease operations ==========

    /// Deposit ALGO into the contract and start (or top up) a lease
    ///
    /// # Arguments
    ///
    /// * `params` - Amount in µAlgo; at least [`crate::constants::MIN_LEASE_DEPOSIT`]
    ///
    /// # Returns
    ///
    /// Receipt of the confirmed application call
    pub async fn deposit(&self, params: DepositParams) -> Result<CallReceipt> {
        // Validate before touching the network
        params.validate()?;
        let signer = self.session.signer()?;
        let sender = signer.address();

        let (suggested, account) = tokio::try_join!(
            self.ledger.suggested_params(),
            self.ledger.account_info(&sender)
        )?;

        let payment =
            Transaction::payment(&suggested, sender, self.config.app_address(), params.amount)?;
        let call = Transaction::app_call(
            &suggested,
            sender,
            self.config.app_id,
            LEASE_VALIDATION_RIGHTS.encode_app_args(&[])?,
            vec![self.box_reference(&sender)],
            STATE_CHANGING_FEE,
        );

        let required = params.amount + payment.fee + call.fee;
        if required > account.available() {
            return Err(LeaseError::InsufficientBalance {
                required,
                available: account.available(),
            }
            .into());
        }

        self.submit_group(signer, vec![payment, call], &LEASE_VALIDATION_RIGHTS)
            .await
            .context("Failed to start lease")
    }

    /// Claim accrued ujrah
    pub async fn claim(&self) -> Result<CallReceipt> {
        let signer = self.session.signer()?;
        let sender = signer.address();

        let lease = self
            .lease_of(sender)
            .await?
            .ok_or_else(|| LeaseError::NoActiveLease(sender.to_string()))?;
        if lease.ujrah == 0 {
            return Err(LeaseError::NothingToClaim.into());
        }

        let suggested = self.ledger.suggested_params().await?;
        let call = Transaction::app_call(
            &suggested,
            sender,
            self.config.app_id,
            CLAIM_UJRAH.encode_app_args(&[])?,
            vec![self.box_reference(&sender)],
            STATE_CHANGING_FEE,
        );

        self.submit_group(signer, vec![call], &CLAIM_UJRAH)
            .await
            .context("Failed to claim ujrah")
    }

    /// Withdraw principal (partially or fully) together with accrued ujrah
    pub async fn terminate(&self, params: WithdrawParams) -> Result<CallReceipt> {
        params.validate()?;
        let signer = self.session.signer()?;
        let sender = signer.address();

        let lease = self
            .lease_of(sender)
            .await?
            .ok_or_else(|| LeaseError::NoActiveLease(sender.to_string()))?;
        let amount = params.resolve(&lease)?;

        let suggested = self.ledger.suggested_params().await?;
        let call = Transaction::app_call(
            &suggested,
            sender,
            self.config.app_id,
            TERMINATE_LEASE.encode_app_args(&[AbiValue::Uint64(amount)])?,
            vec![self.box_reference(&sender)],
            STATE_CHANGING_FEE,
        );

        self.submit_group(signer, vec![call], &TERMINATE_LEASE)
            .await
            .context("Failed to terminate lease")
    }

    /// Withdraw the whole principal
    pub async fn terminate_all(&self) -> Result<CallReceipt> {
        self.terminate(WithdrawParams::full()).await
    }

    /// Group, sign, submit and confirm; the method call is the last transaction
    async fn submit_group(
        &self,
        signer: &S,
        mut txns: Vec<Transaction>,
        method: &Method,
    ) -> Result<CallReceipt> {
        eyre::ensure!(
            txns.len() == method.transaction_arg_count() + 1,
            "{} takes {} transaction(s), got {}",
            method.name,
            method.transaction_arg_count() + 1,
            txns.len()
        );
        if txns.len() > 1 {
            assign_group_id(&mut txns)?;
        }
        let tx_id = txns
            .last()
            .ok_or_else(|| eyre!("Empty transaction group"))?
            .id()?;

        let signed = signer.sign_group(&txns).await?;
        self.ledger.submit(&signed).await?;
        tracing::info!("Submitted {} as {}", method.name, tx_id);

        let pending = self
            .wait_for_confirmation(&tx_id, self.confirmation_rounds)
            .await?;
        let message = method
            .decode_return(&pending.logs)?
            .and_then(|v| v.as_str().map(str::to_string));

        Ok(CallReceipt {
            tx_id,
            confirmed_round: pending.confirmed_round.unwrap_or_default(),
            message,
        })
    }

    // ========== Utility Methods ==========

    /// Wait until `tx_id` is in a block or `rounds` rounds have passed
    ///
    /// On timeout the transaction may still land; callers should re-query
    /// state rather than assume it failed.
    pub async fn wait_for_confirmation(
        &self,
        tx_id: &str,
        rounds: u64,
    ) -> Result<PendingTransaction> {
        let status = self.ledger.status().await?;
        let start = status.last_round.saturating_add(1);
        // At least one lookup, even for a zero-round budget
        let end = start.saturating_add(rounds.max(1));
        let mut current = start;

        while current < end {
            match self.ledger.pending_transaction(tx_id).await {
                Ok(pending) if pending.is_confirmed() => {
                    tracing::info!(
                        "Transaction {} confirmed in round {}",
                        tx_id,
                        pending.confirmed_round.unwrap_or_default()
                    );
                    return Ok(pending);
                }
                Ok(pending) if !pending.pool_error.is_empty() => {
                    return Err(LeaseError::Rejected {
                        tx_id: tx_id.to_string(),
                        reason: pending.pool_error,
                    }
                    .into());
                }
                Ok(_) => {}
                Err(e) => tracing::debug!("Pending lookup for {} failed: {}", tx_id, e),
            }

            tracing::debug!(
                "Transaction {} pending (round {}/{})",
                tx_id,
                current - start + 1,
                rounds
            );
            self.ledger.wait_for_block_after(current).await?;
            current += 1;
        }

        Err(LeaseError::ConfirmationTimeout {
            tx_id: tx_id.to_string(),
            rounds,
        }
        .into())
    }
}
