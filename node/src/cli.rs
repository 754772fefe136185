//! # CLI Interface
//!
//! Defines the command-line argument structure for `ebb-node` using
//! `clap` derive. One subcommand per ledger operation; every invocation
//! loads the state document, runs the operation, and persists the result.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// EBB reversible payment ledger.
///
/// A single-writer wallet-and-ledger node. Transfers pass through a
/// pending window during which the sender may cancel, the recipient may
/// confirm, and guardians may freeze and resolve disputes.
#[derive(Parser, Debug)]
#[command(
    name = "ebb-node",
    about = "EBB reversible payment ledger",
    version,
    propagate_version = true
)]
pub struct EbbNodeCli {
    /// Path to the data directory holding the state document.
    ///
    /// Defaults to `$HOME/.ebb` (falling back to `./.ebb`).
    #[arg(long, short = 'd', env = "EBB_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Guardian votes required to resolve a frozen transaction.
    ///
    /// Single-operator deployments (i.e. this CLI, most of the time)
    /// leave it at 1.
    #[arg(long, env = "EBB_GUARDIAN_QUORUM", default_value_t = 1, global = true)]
    pub guardian_quorum: u32,

    /// Emit logs as JSON instead of human-readable lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the EBB node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage wallets (create, list, select, inspect).
    #[command(subcommand)]
    Wallet(WalletCommands),
    /// Send funds from the active wallet through the pending window.
    Send(SendArgs),
    /// Confirm a transaction addressed to the active wallet.
    Confirm(ConfirmArgs),
    /// Cancel a pending transaction the active wallet sent.
    Cancel(TxIdArgs),
    /// Freeze a pending transaction for guardian review.
    Freeze(FreezeArgs),
    /// Record a guardian vote on a frozen transaction.
    Vote(VoteArgs),
    /// Resolve a frozen transaction once guardian quorum is reached.
    Resolve(TxIdArgs),
    /// Show a balance breakdown (active wallet by default).
    Balance(BalanceArgs),
    /// Show the active wallet's transaction history.
    History,
    /// Show the active wallet's in-flight transactions.
    Pending,
    /// Settle every expired pending transaction.
    Sweep(SweepArgs),
    /// Commit uncommitted transactions into a new block.
    Seal,
    /// Mint funds to an address (devnet bootstrap only).
    Faucet(FaucetArgs),
    /// Manage the address book.
    #[command(subcommand)]
    Contact(ContactCommands),
    /// Print ledger status: height, accounts, pending count.
    Status,
}

/// Wallet management subcommands.
#[derive(Subcommand, Debug)]
pub enum WalletCommands {
    /// Create a new wallet and make it active.
    New(WalletNewArgs),
    /// List all wallets.
    List,
    /// Select the active wallet by index.
    Use(WalletUseArgs),
    /// Show the active wallet's address and metadata.
    Show,
}

/// Arguments for `wallet new`.
#[derive(Parser, Debug)]
pub struct WalletNewArgs {
    /// Display name for the wallet.
    #[arg(long)]
    pub name: Option<String>,

    /// Encrypt the wallet's secret key under this password.
    ///
    /// Without it the key is stored in plaintext — acceptable on a
    /// devnet, nowhere else.
    #[arg(long)]
    pub password: Option<String>,
}

/// Arguments for `wallet use`.
#[derive(Parser, Debug)]
pub struct WalletUseArgs {
    /// Index of the wallet, as shown by `wallet list`.
    pub index: usize,
}

/// Arguments for `send`.
#[derive(Parser, Debug)]
pub struct SendArgs {
    /// Recipient: a contact name or a 64-hex-character address.
    pub to: String,

    /// Amount in the smallest unit (decimal).
    pub amount: String,

    /// Memo to attach.
    #[arg(long)]
    pub memo: Option<String>,

    /// Grace period in milliseconds (defaults to the network default).
    #[arg(long)]
    pub grace_period_ms: Option<u64>,

    /// Require the recipient to present a one-time secret to confirm.
    /// The secret is printed ONCE; deliver it out of band.
    #[arg(long)]
    pub handshake: bool,

    /// Password for the active wallet, if its key is encrypted.
    #[arg(long)]
    pub password: Option<String>,
}

/// Arguments for `confirm`.
#[derive(Parser, Debug)]
pub struct ConfirmArgs {
    /// The transaction to confirm.
    pub tx_id: String,

    /// One-time secret, for handshake transactions.
    #[arg(long)]
    pub secret: Option<String>,

    /// Password for the active wallet, if its key is encrypted.
    #[arg(long)]
    pub password: Option<String>,
}

/// Arguments for commands identified by a transaction id.
#[derive(Parser, Debug)]
pub struct TxIdArgs {
    /// The transaction id.
    pub tx_id: String,

    /// Password for the active wallet, if its key is encrypted.
    #[arg(long)]
    pub password: Option<String>,
}

/// Arguments for `freeze`.
#[derive(Parser, Debug)]
pub struct FreezeArgs {
    /// The transaction to freeze.
    pub tx_id: String,

    /// Why the transaction is being frozen.
    #[arg(long, default_value = "flagged for review")]
    pub reason: String,
}

/// Arguments for `vote`.
#[derive(Parser, Debug)]
pub struct VoteArgs {
    /// The frozen transaction under review.
    pub tx_id: String,

    /// The decision: approve, recover, or pending.
    #[arg(value_parser = ["approve", "recover", "pending"])]
    pub decision: String,

    /// The guardian's stated reasoning.
    #[arg(long, default_value = "reviewed")]
    pub reason: String,

    /// Password for the active wallet, if its key is encrypted.
    #[arg(long)]
    pub password: Option<String>,
}

/// Arguments for `balance`.
#[derive(Parser, Debug)]
pub struct BalanceArgs {
    /// Address or contact name to inspect; the active wallet when omitted.
    pub who: Option<String>,
}

/// Arguments for `sweep`.
#[derive(Parser, Debug)]
pub struct SweepArgs {
    /// Return expired funds to senders instead of auto-finalizing.
    #[arg(long)]
    pub return_funds: bool,
}

/// Arguments for `faucet`.
#[derive(Parser, Debug)]
pub struct FaucetArgs {
    /// Amount to mint, in the smallest unit (decimal).
    pub amount: String,

    /// Target address or contact name; the active wallet when omitted.
    #[arg(long)]
    pub to: Option<String>,
}

/// Address-book subcommands.
#[derive(Subcommand, Debug)]
pub enum ContactCommands {
    /// Add a named contact.
    Add(ContactAddArgs),
    /// List all contacts.
    List,
    /// Remove a contact by name.
    Remove(ContactRemoveArgs),
}

/// Arguments for `contact add`.
#[derive(Parser, Debug)]
pub struct ContactAddArgs {
    /// Contact name.
    pub name: String,

    /// The contact's address, 64 hex characters.
    pub address: String,

    /// Optional note.
    #[arg(long)]
    pub memo: Option<String>,
}

/// Arguments for `contact remove`.
#[derive(Parser, Debug)]
pub struct ContactRemoveArgs {
    /// Contact name.
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        // Ensures the derive macros produce a valid CLI definition.
        EbbNodeCli::command().debug_assert();
    }
}
