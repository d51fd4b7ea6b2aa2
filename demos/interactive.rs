//! Interactive CLI for the Ijarah SDK
//!
//! Run with: cargo run --example interactive
//!
//! Signs with LESSOR_SEED (hex or base64) when set, otherwise with the first
//! account of the KMD wallet configured through KMD_* variables.

use std::io::{self, Write};

use futures::StreamExt;
use ijarah_sdk::constants::{estimate_for_days, format_algo, format_duration, format_rate};
use ijarah_sdk::dashboard::{PRICE_REFRESH, TRANSACTIONS_REFRESH};
use ijarah_sdk::{
    price_snapshots, transaction_snapshots, Address, DepositParams, ErrorCategory, IjarahClient,
    IndexerClient, KmdConfig, KmdSigner, LocalSigner, NetworkConfig, PriceFeed,
    TransactionSigner, WithdrawParams,
};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = NetworkConfig::from_env()?;

    match std::env::var("LESSOR_SEED") {
        Ok(seed) => {
            let signer = LocalSigner::from_secret(&seed)?;
            run(IjarahClient::with_signer(signer, config)?).await
        }
        Err(_) => {
            let signer = KmdSigner::discover(KmdConfig::from_env()).await?;
            run(IjarahClient::with_signer(signer, config)?).await
        }
    }
}

async fn run<S: TransactionSigner>(client: IjarahClient<S>) -> eyre::Result<()> {
    println!("\n========================================");
    println!("       Ijarah SDK Interactive CLI");
    println!("========================================");
    println!("Network:          {}", client.config().network);
    println!("Application:      {}", client.config().app_id);
    if let Some(address) = client.address() {
        println!("Connected wallet: {}", address);
    }

    // Main loop
    loop {
        println!("\n----------------------------------------");
        println!("Select an option:");
        println!("  1. View info");
        println!("  2. Start lease (deposit)");
        println!("  3. Claim ujrah");
        println!("  4. Terminate lease (withdraw)");
        println!("  5. Look up a lessor");
        println!("  6. Dashboard");
        println!("  q. Quit");
        println!("----------------------------------------");

        let choice = prompt("Enter choice: ")?;

        let result = match choice.as_str() {
            "1" => view_info(&client).await,
            "2" => deposit_flow(&client).await,
            "3" => claim_flow(&client).await,
            "4" => withdraw_flow(&client).await,
            "5" => lessor_flow(&client).await,
            "6" => dashboard_tick(&client).await,
            "q" | "Q" => {
                println!("\nGoodbye!");
                break;
            }
            _ => {
                println!("\nInvalid choice. Please try again.");
                Ok(())
            }
        };

        if let Err(e) = result {
            match ErrorCategory::of(&e) {
                ErrorCategory::Validation => println!("\n{}", e),
                ErrorCategory::WalletRejected => println!("\nWallet declined: {}", e),
                ErrorCategory::Network => println!("\nNetwork error: {:#}", e),
            }
        }
    }

    Ok(())
}

fn prompt(label: &str) -> eyre::Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Account, lease and contract parameters
async fn view_info<S: TransactionSigner>(client: &IjarahClient<S>) -> eyre::Result<()> {
    println!("\n=== Account Info ===");

    // Fetch all data in parallel
    let (state, params, total) = tokio::join!(
        client.reconcile(),
        client.read_global_state(),
        client.total_contract_balance()
    );

    let state = state?;
    println!("{}", state);
    if let Some(lease) = state.lease {
        println!("Leased for: {}", format_duration(lease.duration));
    }

    if let Ok(params) = params {
        if let Some(rate) = params.annual_ujrah_rate_bp {
            println!("\nAnnual ujrah rate: {}", format_rate(rate));
        }
    }
    if let Ok(total) = total {
        println!("Contract balance: {} ALGO", format_algo(total));
    }

    Ok(())
}

async fn deposit_flow<S: TransactionSigner>(client: &IjarahClient<S>) -> eyre::Result<()> {
    println!("\n=== Start Lease ===");

    let state = client.reconcile().await?;
    println!("Available: {} ALGO", format_algo(state.available()));

    let input = prompt("Amount to lease (ALGO) [1]: ")?;
    let params = if input.is_empty() {
        DepositParams::from_algo("1")?
    } else {
        DepositParams::from_algo(&input)?
    };

    println!(
        "Estimated ujrah after 30 days: {} ALGO",
        format_algo(estimate_for_days(params.amount, 30))
    );
    println!("\nLeasing {} ALGO...", format_algo(params.amount));

    let receipt = client.deposit(params).await?;
    println!("Transaction: {}", receipt.tx_id);
    println!("Confirmed in round {}", receipt.confirmed_round);

    println!("\n{}", client.reconcile().await?);
    Ok(())
}

async fn claim_flow<S: TransactionSigner>(client: &IjarahClient<S>) -> eyre::Result<()> {
    println!("\n=== Claim Ujrah ===");

    let receipt = client.claim().await?;
    println!("Transaction: {}", receipt.tx_id);
    println!("Confirmed in round {}", receipt.confirmed_round);

    println!("\n{}", client.reconcile().await?);
    Ok(())
}

async fn withdraw_flow<S: TransactionSigner>(client: &IjarahClient<S>) -> eyre::Result<()> {
    println!("\n=== Terminate Lease ===");

    let Some(lease) = client.my_lease_info().await? else {
        println!("No active lease.");
        return Ok(());
    };
    println!("Principal: {} ALGO", format_algo(lease.principal));
    println!("Ujrah:     {} ALGO", format_algo(lease.ujrah));
    println!("Full termination pays {} ALGO", format_algo(lease.payout()));

    let input = prompt("Amount to withdraw (ALGO) or 'all' [all]: ")?;
    let params = if input.is_empty() || input.eq_ignore_ascii_case("all") {
        WithdrawParams::full()
    } else {
        WithdrawParams::partial(ijarah_sdk::constants::parse_algo(&input)?)
    };

    let receipt = client.terminate(params).await?;
    println!("Transaction: {}", receipt.tx_id);
    if let Some(message) = receipt.message {
        println!("{}", message);
    }

    println!("\n{}", client.reconcile().await?);
    Ok(())
}

async fn lessor_flow<S: TransactionSigner>(client: &IjarahClient<S>) -> eyre::Result<()> {
    println!("\n=== Lessor Lookup ===");

    let address: Address = prompt("Lessor address: ")?.parse()?;
    match client.lessor_info(&address).await? {
        Some(info) => {
            println!("Principal: {} ALGO", format_algo(info.principal));
            println!("Ujrah:     {} ALGO", format_algo(info.ujrah));
        }
        None => println!("{} has no active lease.", address.short()),
    }
    Ok(())
}

/// One refresh of both dashboard feeds
async fn dashboard_tick<S: TransactionSigner>(client: &IjarahClient<S>) -> eyre::Result<()> {
    println!("\n=== Dashboard ===");

    let mut prices = Box::pin(price_snapshots(PriceFeed::new()?, PRICE_REFRESH));
    let mut txns = Box::pin(transaction_snapshots(
        IndexerClient::from_config(client.config())?,
        TRANSACTIONS_REFRESH,
    ));

    let (history, recent) = tokio::join!(prices.next(), txns.next());

    match history {
        Some(Ok(history)) => println!("{}", history),
        Some(Err(e)) => println!("Price unavailable: {}", e),
        None => {}
    }

    if let Some(Ok(recent)) = recent {
        println!("\n{:<12} {:<6} {:>14}  {}", "Id", "Type", "Amount", "Sender");
        println!("{}", "-".repeat(60));
        for tx in recent {
            println!(
                "{:<12} {:<6} {:>14.6}  {}",
                &tx.id[..tx.id.len().min(10)],
                tx.tx_type,
                tx.amount,
                tx.sender
            );
        }
    }

    Ok(())
}
