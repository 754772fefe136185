// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # EBB Node
//!
//! Entry point for the `ebb-node` binary: a command-line wallet and
//! ledger for the EBB reversible payment protocol.
//!
//! Every invocation follows the same shape: load the state document from
//! disk, run one operation against the in-memory ledger, persist the
//! document, print the result. The state object is explicit and local —
//! there is no process-wide singleton, and nothing survives between
//! commands except the file.

mod cli;
mod logging;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use std::collections::HashSet;
use std::path::PathBuf;

use ebb_protocol::config::{now_millis, NetworkConfig};
use ebb_protocol::crypto::keys::Address;
use ebb_protocol::crypto::OneTimeSecret;
use ebb_protocol::storage::StateDocument;
use ebb_protocol::transaction::dispute::{GuardianDecision, GuardianVote};
use ebb_protocol::transaction::types::Amount;
use ebb_protocol::transaction::Transaction;
use ebb_protocol::wallet::{Direction, SecretChannel, SendOptions, Wallet};

use cli::{Commands, ContactCommands, EbbNodeCli, WalletCommands};
use logging::LogFormat;

fn main() -> Result<()> {
    let cli = EbbNodeCli::parse();
    logging::init_logging(
        "ebb_node=info,ebb_protocol=info",
        if cli.log_json {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        },
    );

    let config = NetworkConfig {
        required_guardian_votes: cli.guardian_quorum,
        ..Default::default()
    };
    // A broken config is a broken deployment; refuse to touch the ledger.
    config.validate().context("invalid network configuration")?;

    let data_dir = resolve_data_dir(cli.data_dir);
    let state_path = data_dir.join("state.json");
    let mut document = StateDocument::load(&state_path)
        .with_context(|| format!("failed to load state from {}", state_path.display()))?;

    run_command(cli.command, &mut document, &config)?;

    document
        .save(&state_path)
        .with_context(|| format!("failed to save state to {}", state_path.display()))?;
    tracing::debug!(path = %state_path.display(), "state persisted");
    Ok(())
}

/// Picks the data directory: flag/env, then `$HOME/.ebb`, then `./.ebb`.
fn resolve_data_dir(flag: Option<PathBuf>) -> PathBuf {
    flag.unwrap_or_else(|| {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".ebb"))
            .unwrap_or_else(|| PathBuf::from(".ebb"))
    })
}

/// Prints a freshly generated handshake secret to the terminal, once.
///
/// This is the CLI's stand-in for a real out-of-band channel: the
/// operator reads the secret off the screen and delivers it however they
/// see fit. The process never sees it again.
struct TerminalSecretChannel;

impl SecretChannel for TerminalSecretChannel {
    fn deliver(&self, transaction_id: &str, secret: &OneTimeSecret) {
        println!("One-time secret for {}: {}", transaction_id, secret.expose());
        println!("Deliver it to the recipient out of band. It will not be shown again.");
    }
}

fn run_command(
    command: Commands,
    document: &mut StateDocument,
    config: &NetworkConfig,
) -> Result<()> {
    match command {
        Commands::Wallet(cmd) => wallet_command(cmd, document),
        Commands::Send(args) => {
            let wallet = active_wallet(document, args.password.as_deref())?;
            let recipient = resolve_address(document, &args.to)?;
            let amount = parse_amount(&args.amount)?;

            let tx = wallet.send(
                &mut document.ledger,
                recipient,
                amount,
                SendOptions {
                    memo: args.memo,
                    grace_period_ms: args.grace_period_ms,
                    use_handshake: args.handshake,
                },
                config,
                Some(&TerminalSecretChannel),
            )?;

            println!("Sent. Transaction id: {}", tx.id);
            println!(
                "Cancellable until {} unless the recipient confirms first.",
                format_millis(tx.expires_at)
            );
            Ok(())
        }
        Commands::Confirm(args) => {
            let wallet = active_wallet(document, args.password.as_deref())?;
            let tx = wallet.confirm_received(
                &mut document.ledger,
                &args.tx_id,
                args.secret.as_deref(),
            )?;
            println!("Confirmed {} ({}).", tx.id, tx.state);
            Ok(())
        }
        Commands::Cancel(args) => {
            let wallet = active_wallet(document, args.password.as_deref())?;
            let tx = wallet.cancel_sent(&mut document.ledger, &args.tx_id)?;
            println!("Cancelled {}. Funds returned.", tx.id);
            Ok(())
        }
        Commands::Freeze(args) => {
            let tx = document
                .ledger
                .freeze_transaction(&args.tx_id, &args.reason)?;
            println!("Frozen {} for guardian review.", tx.id);
            Ok(())
        }
        Commands::Vote(args) => {
            let wallet = active_wallet(document, args.password.as_deref())?;
            let decision = match args.decision.as_str() {
                "approve" => GuardianDecision::Approve,
                "recover" => GuardianDecision::Recover,
                _ => GuardianDecision::PendingReview,
            };
            document.ledger.record_guardian_vote(
                &args.tx_id,
                GuardianVote {
                    guardian: wallet.address(),
                    decision,
                    reason: args.reason,
                    timestamp: now_millis(),
                },
            )?;
            println!("Vote recorded: {} on {}.", decision, args.tx_id);
            Ok(())
        }
        Commands::Resolve(args) => {
            let tx = document
                .ledger
                .resolve_dispute(&args.tx_id, config.required_guardian_votes)?;
            println!("Resolved {}: now {}.", tx.id, tx.state);
            Ok(())
        }
        Commands::Balance(args) => {
            let address = match args.who {
                Some(who) => resolve_address(document, &who)?,
                None => active_wallet_address(document)?,
            };
            let balance = document.ledger.balance(&address);
            println!("Address          : {}", address);
            println!("Available        : {}", balance.available);
            println!("Pending outgoing : {}", balance.pending_outgoing);
            println!("Pending incoming : {}", balance.pending_incoming);
            println!("Total            : {}", balance.total);
            Ok(())
        }
        Commands::History => {
            let address = active_wallet_address(document)?;
            let wallet_view = document.ledger.transactions_for(&address);
            if wallet_view.is_empty() {
                println!("No transactions yet.");
            }
            for tx in wallet_view {
                print_tx_line(tx, &address);
            }
            Ok(())
        }
        Commands::Pending => {
            let address = active_wallet_address(document)?;
            let pending = document.ledger.pending_transactions_for(&address);
            if pending.is_empty() {
                println!("Nothing in flight.");
            }
            for tx in pending {
                print_tx_line(tx, &address);
            }
            Ok(())
        }
        Commands::Sweep(args) => {
            let settled = document.ledger.sweep_expired(!args.return_funds);
            println!("Settled {} expired transaction(s).", settled.len());
            for tx in settled {
                println!("  {}  -> {}", tx.id, tx.state);
            }
            Ok(())
        }
        Commands::Seal => {
            let candidates = uncommitted_transactions(document);
            if candidates.is_empty() {
                println!("Nothing to seal.");
                return Ok(());
            }
            let count = candidates.len();
            let block = document.ledger.append_block(candidates)?;
            println!(
                "Sealed block {} with {} transaction(s): {}",
                block.index(),
                count,
                block.hash
            );
            Ok(())
        }
        Commands::Faucet(args) => {
            let address = match args.to {
                Some(to) => resolve_address(document, &to)?,
                None => active_wallet_address(document)?,
            };
            let amount = parse_amount(&args.amount)?;
            document.ledger.mint(&address, &amount);
            println!("Minted {} to {}.", amount, address);
            Ok(())
        }
        Commands::Contact(cmd) => contact_command(cmd, document),
        Commands::Status => {
            println!("Block height : {}", document.ledger.block_height());
            println!("Accounts     : {}", document.ledger.accounts.len());
            println!("Pending txs  : {}", document.ledger.pending_transactions.len());
            println!("All-time txs : {}", document.ledger.transactions.len());
            println!("Wallets      : {}", document.wallets.len());
            println!("Contacts     : {}", document.contacts.len());
            Ok(())
        }
    }
}

fn wallet_command(command: WalletCommands, document: &mut StateDocument) -> Result<()> {
    match command {
        WalletCommands::New(args) => {
            let wallet = Wallet::create(args.name);
            let export = wallet.export(args.password.as_deref())?;
            document.wallets.push(export);
            document.active_wallet = Some(document.wallets.len() - 1);

            println!("Wallet created and selected.");
            println!("  Address : {}", wallet.address());
            if args.password.is_none() {
                println!("  Warning : secret key stored in PLAINTEXT (no --password given).");
            }
            Ok(())
        }
        WalletCommands::List => {
            if document.wallets.is_empty() {
                println!("No wallets. Create one with `ebb-node wallet new`.");
            }
            for (index, export) in document.wallets.iter().enumerate() {
                let marker = if document.active_wallet == Some(index) {
                    "*"
                } else {
                    " "
                };
                println!(
                    "{} [{}] {}  {}",
                    marker,
                    index,
                    export.address,
                    export.name.as_deref().unwrap_or("(unnamed)"),
                );
            }
            Ok(())
        }
        WalletCommands::Use(args) => {
            if args.index >= document.wallets.len() {
                bail!(
                    "no wallet at index {} ({} wallet(s) known)",
                    args.index,
                    document.wallets.len()
                );
            }
            document.active_wallet = Some(args.index);
            println!("Active wallet: [{}] {}", args.index, document.wallets[args.index].address);
            Ok(())
        }
        WalletCommands::Show => {
            let address = active_wallet_address(document)?;
            let index = document
                .active_wallet
                .ok_or_else(|| anyhow!("no active wallet"))?;
            let export = &document.wallets[index];
            println!("Address : {}", address);
            println!("Name    : {}", export.name.as_deref().unwrap_or("(unnamed)"));
            println!("Created : {}", format_millis(export.created_at));
            Ok(())
        }
    }
}

fn contact_command(command: ContactCommands, document: &mut StateDocument) -> Result<()> {
    match command {
        ContactCommands::Add(args) => {
            let address = Address::from_hex(&args.address)
                .map_err(|e| anyhow!("invalid address for contact '{}': {}", args.name, e))?;
            document.contacts.add(&args.name, address, args.memo)?;
            println!("Contact '{}' added.", args.name);
            Ok(())
        }
        ContactCommands::List => {
            if document.contacts.is_empty() {
                println!("Address book is empty.");
            }
            for contact in document.contacts.all() {
                match &contact.memo {
                    Some(memo) => println!("{}  {}  ({})", contact.name, contact.address, memo),
                    None => println!("{}  {}", contact.name, contact.address),
                }
            }
            Ok(())
        }
        ContactCommands::Remove(args) => {
            document.contacts.remove(&args.name)?;
            println!("Contact '{}' removed.", args.name);
            Ok(())
        }
    }
}

/// Reconstructs the active wallet, decrypting its key if needed.
fn active_wallet(document: &StateDocument, password: Option<&str>) -> Result<Wallet> {
    let index = document
        .active_wallet
        .ok_or_else(|| anyhow!("no active wallet; create one with `ebb-node wallet new`"))?;
    let export = document
        .wallets
        .get(index)
        .ok_or_else(|| anyhow!("active wallet index {} is out of range", index))?;
    Wallet::import(export, password)
        .with_context(|| format!("failed to unlock wallet {}", export.address))
}

/// The active wallet's address, without touching key material.
fn active_wallet_address(document: &StateDocument) -> Result<Address> {
    let index = document
        .active_wallet
        .ok_or_else(|| anyhow!("no active wallet; create one with `ebb-node wallet new`"))?;
    document
        .wallets
        .get(index)
        .map(|export| export.address)
        .ok_or_else(|| anyhow!("active wallet index {} is out of range", index))
}

/// Resolves a recipient string: contact name first, then raw hex.
fn resolve_address(document: &StateDocument, input: &str) -> Result<Address> {
    if let Some(contact) = document.contacts.find_by_name(input) {
        return Ok(contact.address);
    }
    Address::from_hex(input)
        .map_err(|_| anyhow!("'{}' is neither a known contact nor a valid address", input))
}

fn parse_amount(input: &str) -> Result<Amount> {
    Amount::parse(input).map_err(|_| anyhow!("'{}' is not a valid amount", input))
}

fn print_tx_line(tx: &Transaction, viewpoint: &Address) {
    let direction = if tx.sender == *viewpoint {
        Direction::Sent
    } else {
        Direction::Received
    };
    let counterparty = if tx.sender == *viewpoint {
        tx.recipient
    } else {
        tx.sender
    };
    let arrow = match direction {
        Direction::Sent => "->",
        Direction::Received => "<-",
    };
    println!(
        "{}  {:9}  {} {} {}  {}",
        tx.id, tx.state.to_string(), tx.amount, arrow, counterparty, tx.memo
    );
}

/// Formats a Unix-millisecond timestamp for humans.
fn format_millis(millis: u64) -> String {
    chrono::DateTime::from_timestamp_millis(millis as i64)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| millis.to_string())
}

/// Transactions present in the all-time index but not yet committed to
/// any block, oldest first. This is what `seal` commits.
fn uncommitted_transactions(document: &StateDocument) -> Vec<Transaction> {
    let committed: HashSet<&str> = document
        .ledger
        .blocks
        .iter()
        .flat_map(|block| block.transactions.iter().map(|tx| tx.id.as_str()))
        .collect();

    let mut candidates: Vec<Transaction> = document
        .ledger
        .transactions
        .values()
        .filter(|tx| !committed.contains(tx.id.as_str()))
        .cloned()
        .collect();
    candidates.sort_by_key(|tx| (tx.created_at, tx.id.clone()));
    candidates
}
