//! End-to-end integration tests for the EBB protocol.
//!
//! These tests exercise full flows through the public API: wallet
//! creation, sending through the pending window, confirmation and
//! cancellation, guardian freezes, expiry sweeps, block sealing, and
//! persistence round-trips. They prove the components compose — the
//! per-module unit tests prove they work in isolation.
//!
//! Each test stands alone with its own ledger (and its own temp dir when
//! persistence is involved). No shared state, no ordering dependencies,
//! no flaky failures.

use ebb_protocol::config::{now_millis, NetworkConfig};
use ebb_protocol::crypto::hash::{merkle_root, sha256};
use ebb_protocol::ledger::{LedgerError, LedgerState, SharedLedger};
use ebb_protocol::storage::StateDocument;
use ebb_protocol::transaction::dispute::{GuardianDecision, GuardianVote};
use ebb_protocol::transaction::types::{Amount, TransactionState};
use ebb_protocol::transaction::{validate_structure, TransactionBuilder};
use ebb_protocol::wallet::{SendOptions, Wallet};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

fn amount(v: u64) -> Amount {
    Amount::from(v)
}

/// A funded Alice, an empty Bob, and a fresh ledger.
fn two_party_setup() -> (LedgerState, Wallet, Wallet) {
    let mut ledger = LedgerState::new();
    let alice = Wallet::create(Some("alice".into()));
    let bob = Wallet::create(Some("bob".into()));
    ledger.mint(&alice.address(), &amount(1000));
    (ledger, alice, bob)
}

fn default_send(
    ledger: &mut LedgerState,
    from: &Wallet,
    to: &Wallet,
    value: u64,
) -> ebb_protocol::transaction::Transaction {
    from.send(
        ledger,
        to.address(),
        amount(value),
        SendOptions::default(),
        &NetworkConfig::default(),
        None,
    )
    .unwrap()
}

// ---------------------------------------------------------------------------
// Happy Paths
// ---------------------------------------------------------------------------

#[test]
fn mint_send_confirm_flow() {
    let (mut ledger, alice, bob) = two_party_setup();

    let tx = alice
        .send(
            &mut ledger,
            bob.address(),
            amount(100),
            SendOptions {
                grace_period_ms: Some(3 * 60 * 1000),
                memo: Some("rent".into()),
                ..Default::default()
            },
            &NetworkConfig::default(),
            None,
        )
        .unwrap();

    // After send: Alice 900 available / 100 locked, Bob 100 incoming.
    let a = alice.balance(&ledger);
    assert_eq!(a.available, amount(900));
    assert_eq!(a.pending_outgoing, amount(100));
    let b = bob.balance(&ledger);
    assert_eq!(b.pending_incoming, amount(100));
    assert_eq!(b.total, amount(100));

    // After confirm: funds delivered, pending buckets drained.
    bob.confirm_received(&mut ledger, &tx.id, None).unwrap();
    let a = alice.balance(&ledger);
    assert_eq!(a.available, amount(900));
    assert!(a.pending_outgoing.is_zero());
    let b = bob.balance(&ledger);
    assert_eq!(b.available, amount(100));
    assert!(b.pending_incoming.is_zero());

    assert_eq!(ledger.total_supply(), amount(1000));
}

#[test]
fn send_then_cancel_restores_everything() {
    let (mut ledger, alice, bob) = two_party_setup();
    let tx = default_send(&mut ledger, &alice, &bob, 50);

    alice.cancel_sent(&mut ledger, &tx.id).unwrap();

    let a = alice.balance(&ledger);
    assert_eq!(a.available, amount(1000));
    assert!(a.pending_outgoing.is_zero());
    assert!(bob.balance(&ledger).pending_incoming.is_zero());
    assert_eq!(ledger.total_supply(), amount(1000));
}

#[test]
fn overspend_is_rejected_without_side_effects() {
    let (mut ledger, alice, bob) = two_party_setup();

    let result = alice.send(
        &mut ledger,
        bob.address(),
        amount(1500),
        SendOptions::default(),
        &NetworkConfig::default(),
        None,
    );
    assert!(matches!(
        result,
        Err(LedgerError::InsufficientBalance { .. })
    ));
    assert_eq!(alice.balance(&ledger).available, amount(1000));
    assert!(ledger.pending_transactions.is_empty());
}

#[test]
fn handshake_flow_end_to_end() {
    use ebb_protocol::crypto::OneTimeSecret;
    use ebb_protocol::wallet::SecretChannel;
    use std::sync::Mutex;

    struct Courier(Mutex<Option<String>>);
    impl SecretChannel for Courier {
        fn deliver(&self, _transaction_id: &str, secret: &OneTimeSecret) {
            *self.0.lock().unwrap() = Some(secret.expose().to_string());
        }
    }

    let (mut ledger, alice, bob) = two_party_setup();
    let courier = Courier(Mutex::new(None));

    let tx = alice
        .send(
            &mut ledger,
            bob.address(),
            amount(75),
            SendOptions {
                use_handshake: true,
                ..Default::default()
            },
            &NetworkConfig::default(),
            Some(&courier),
        )
        .unwrap();

    // Without the secret, Bob gets nowhere.
    assert!(bob.confirm_received(&mut ledger, &tx.id, None).is_err());
    assert!(bob
        .confirm_received(&mut ledger, &tx.id, Some("1badc0de1badc0de"))
        .is_err());
    assert!(ledger.transaction(&tx.id).unwrap().is_pending());

    // With the couriered secret, the transfer completes and the ack is
    // recorded on the transaction.
    let secret = courier.0.lock().unwrap().clone().unwrap();
    let confirmed = bob
        .confirm_received(&mut ledger, &tx.id, Some(&secret))
        .unwrap();
    assert_eq!(confirmed.state, TransactionState::Finalized);
    assert!(confirmed.handshake.unwrap().ack_id.is_some());
    assert_eq!(bob.balance(&ledger).available, amount(75));
}

// ---------------------------------------------------------------------------
// Guardian Flows
// ---------------------------------------------------------------------------

#[test]
fn freeze_vote_recover_flow() {
    let (mut ledger, alice, bob) = two_party_setup();
    let tx = default_send(&mut ledger, &alice, &bob, 100);

    ledger
        .freeze_transaction(&tx.id, "recipient reported as phishing")
        .unwrap();

    // Sender can no longer cancel, recipient can no longer unilaterally
    // keep the funds out of review: the record is FROZEN.
    assert!(alice.cancel_sent(&mut ledger, &tx.id).is_err());

    // Two of three guardians vote to recover.
    for _ in 0..2 {
        ledger
            .record_guardian_vote(
                &tx.id,
                GuardianVote {
                    guardian: Wallet::create(None).address(),
                    decision: GuardianDecision::Recover,
                    reason: "confirmed phishing report".into(),
                    timestamp: now_millis(),
                },
            )
            .unwrap();
    }

    // Quorum of 3 not reached yet.
    assert!(matches!(
        ledger.resolve_dispute(&tx.id, 3),
        Err(LedgerError::QuorumNotReached { .. })
    ));

    // Quorum of 2 resolves: funds return exactly as a cancellation would.
    let resolved = ledger.resolve_dispute(&tx.id, 2).unwrap();
    assert_eq!(resolved.state, TransactionState::Recovered);
    assert_eq!(alice.balance(&ledger).available, amount(1000));
    assert!(bob.balance(&ledger).pending_incoming.is_zero());
    assert_eq!(ledger.total_supply(), amount(1000));
}

#[test]
fn freeze_approve_delivers_like_confirmation() {
    let (mut ledger, alice, bob) = two_party_setup();
    let tx = default_send(&mut ledger, &alice, &bob, 100);

    ledger.freeze_transaction(&tx.id, "routine review").unwrap();
    ledger
        .record_guardian_vote(
            &tx.id,
            GuardianVote {
                guardian: Wallet::create(None).address(),
                decision: GuardianDecision::Approve,
                reason: "legitimate invoice".into(),
                timestamp: now_millis(),
            },
        )
        .unwrap();

    let resolved = ledger.resolve_dispute(&tx.id, 1).unwrap();
    assert_eq!(resolved.state, TransactionState::Finalized);
    assert_eq!(bob.balance(&ledger).available, amount(100));
    assert_eq!(alice.balance(&ledger).available, amount(900));
}

// ---------------------------------------------------------------------------
// Expiry
// ---------------------------------------------------------------------------

#[test]
fn expiry_sweep_settles_only_expired() {
    let mut ledger = LedgerState::new();
    let config = NetworkConfig::default();
    let alice = Wallet::create(None);
    let bob = Wallet::create(None);
    ledger.mint(&alice.address(), &amount(1000));

    // One transaction created in the past (already expired), one fresh.
    let (stale, _) = TransactionBuilder::new(bob.address(), amount(40))
        .created_at(now_millis() - 2 * config.default_grace_period_ms)
        .build(alice.keypair(), &config)
        .unwrap();
    ledger.add_pending_transaction(stale.clone()).unwrap();
    let fresh = default_send(&mut ledger, &alice, &bob, 60);

    let settled = ledger.sweep_expired(true);
    assert_eq!(settled.len(), 1);
    assert_eq!(settled[0].id, stale.id);
    assert_eq!(settled[0].state, TransactionState::Finalized);

    assert!(ledger.transaction(&fresh.id).unwrap().is_pending());
    assert_eq!(bob.balance(&ledger).available, amount(40));
    assert_eq!(bob.balance(&ledger).pending_incoming, amount(60));
}

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

#[test]
fn sealed_history_is_tamper_evident() {
    let (mut ledger, alice, bob) = two_party_setup();

    let tx = default_send(&mut ledger, &alice, &bob, 100);
    let confirmed = bob.confirm_received(&mut ledger, &tx.id, None).unwrap();

    let block = ledger.append_block(vec![confirmed.clone()]).unwrap();
    assert_eq!(ledger.block_height(), 1);
    assert!(ledger.pending_transactions.is_empty());

    // The committed Merkle root is exactly the root over content hashes.
    assert_eq!(
        block.header.merkle_root,
        merkle_root(&[confirmed.content_hash()])
    );

    // A tampered copy of the block fails validation against the real tip
    // with the specific broken rule reported.
    let genesis = ledger.block_by_index(0).unwrap();
    let mut forged = block.clone();
    forged.header.merkle_root = sha256(b"cooked books");
    let violations = forged.validate(genesis);
    assert!(!violations.is_empty());
}

#[test]
fn chain_grows_and_links() {
    let (mut ledger, alice, bob) = two_party_setup();

    for value in [10u64, 20, 30] {
        let tx = default_send(&mut ledger, &alice, &bob, value);
        let confirmed = bob.confirm_received(&mut ledger, &tx.id, None).unwrap();
        ledger.append_block(vec![confirmed]).unwrap();
    }

    assert_eq!(ledger.block_height(), 3);
    for i in 1..=3u64 {
        let block = ledger.block_by_index(i).unwrap();
        let previous = ledger.block_by_index(i - 1).unwrap();
        assert_eq!(block.header.previous_hash, previous.hash);
        assert!(block.validate(previous).is_empty());
    }
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[test]
fn full_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let config = NetworkConfig::default();

    // Session one: create wallets, move money, freeze something, seal a
    // block, save.
    let alice_address;
    let bob_address;
    let frozen_id;
    {
        let mut document = StateDocument::fresh();
        let alice = Wallet::create(Some("alice".into()));
        let bob = Wallet::create(Some("bob".into()));
        alice_address = alice.address();
        bob_address = bob.address();

        document.ledger.mint(&alice.address(), &amount(1000));
        let paid = default_send(&mut document.ledger, &alice, &bob, 100);
        let confirmed = bob
            .confirm_received(&mut document.ledger, &paid.id, None)
            .unwrap();
        document.ledger.append_block(vec![confirmed]).unwrap();

        let held = default_send(&mut document.ledger, &alice, &bob, 200);
        document
            .ledger
            .freeze_transaction(&held.id, "manual review")
            .unwrap();
        frozen_id = held.id;

        document.wallets.push(alice.export(Some("pw")).unwrap());
        document.wallets.push(bob.export(None).unwrap());
        document.active_wallet = Some(0);
        document.save(&path).unwrap();
    }

    // Session two: load and carry on where we left off.
    {
        let mut document = StateDocument::load(&path).unwrap();
        assert_eq!(document.ledger.block_height(), 1);

        let alice = Wallet::import(&document.wallets[0], Some("pw")).unwrap();
        assert_eq!(alice.address(), alice_address);

        // The frozen transaction is still frozen and resolvable.
        assert_eq!(
            document.ledger.transaction(&frozen_id).unwrap().state,
            TransactionState::Frozen
        );
        document
            .ledger
            .record_guardian_vote(
                &frozen_id,
                GuardianVote {
                    guardian: Wallet::create(None).address(),
                    decision: GuardianDecision::Recover,
                    reason: "review complete".into(),
                    timestamp: now_millis(),
                },
            )
            .unwrap();
        document.ledger.resolve_dispute(&frozen_id, 1).unwrap();

        assert_eq!(
            document.ledger.balance(&alice_address).available,
            amount(900)
        );
        assert_eq!(
            document.ledger.balance(&bob_address).available,
            amount(100)
        );
        assert_eq!(document.ledger.total_supply(), amount(1000));
    }
}

// ---------------------------------------------------------------------------
// Cross-Cutting
// ---------------------------------------------------------------------------

#[test]
fn every_accepted_transaction_is_structurally_valid() {
    let (mut ledger, alice, bob) = two_party_setup();
    let tx = default_send(&mut ledger, &alice, &bob, 100);
    let confirmed = bob.confirm_received(&mut ledger, &tx.id, None).unwrap();

    assert!(validate_structure(&tx).is_empty());
    assert!(validate_structure(&confirmed).is_empty());
    assert_eq!(confirmed.version, tx.version + 1);
}

#[test]
fn shared_ledger_supports_threaded_use() {
    let (ledger, alice, bob) = two_party_setup();
    let shared = SharedLedger::new(ledger);
    let config = NetworkConfig::default();

    // Writer thread sends; reader threads poll balances concurrently.
    let tx = alice
        .send(
            &mut shared.write(),
            bob.address(),
            amount(100),
            SendOptions::default(),
            &config,
            None,
        )
        .unwrap();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let shared = shared.clone();
            let addr = bob.address();
            std::thread::spawn(move || shared.read().balance(&addr).pending_incoming.clone())
        })
        .collect();
    for reader in readers {
        assert_eq!(reader.join().unwrap(), amount(100));
    }

    bob.confirm_received(&mut shared.write(), &tx.id, None)
        .unwrap();
    assert_eq!(shared.read().balance(&bob.address()).available, amount(100));
}
