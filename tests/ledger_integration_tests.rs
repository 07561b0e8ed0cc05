//! Ledger integration tests
//!
//! Drives the public API the way miners and clients do, including real
//! threads racing for the same epoch.

use epoch_chain::core::proof_of_work;
use epoch_chain::{
    Block, Blockchain, LedgerConfig, Miner, ProofOfWork, RejectedBlock, RejectedTransaction,
    SnapshotStore, Transaction, TransactionProducer, Wallet, Wallets,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use tempfile::tempdir;

// Complexity pinned at 1, so the target prefix is always "0"
fn fixed_config(capacity: usize) -> LedgerConfig {
    LedgerConfig {
        capacity,
        initial_complexity: 1,
        min_complexity: 1,
        max_complexity: 1,
        ..LedgerConfig::default()
    }
}

fn mine(ledger: &Blockchain, wallet: &Wallet) -> Block {
    let challenge = ledger.get_challenge(&wallet.party()).unwrap();
    let block = ProofOfWork::new_proof_of_work(&challenge)
        .run(wallet.get_title())
        .unwrap();
    ledger.offer_block(block.clone()).unwrap();
    block
}

fn assert_chain_properties(ledger: &Blockchain) {
    let blocks = ledger.blocks();
    let mut previous = Block::genesis();
    let mut seen_ids = HashSet::new();

    for block in &blocks {
        assert_eq!(block.get_id(), previous.get_id() + 1);
        assert!(block
            .get_hash()
            .starts_with(&"0".repeat(block.get_complexity() as usize)));
        assert!(ProofOfWork::validate(block, previous.get_hash()));
        for transaction in block.get_transactions() {
            assert!(seen_ids.insert(transaction.get_id()));
            assert!(!ledger.pool_contains(transaction.get_id()));
        }
        previous = block.clone();
    }
}

#[test]
fn test_race_for_one_epoch_has_single_winner() {
    let ledger = Blockchain::new(fixed_config(3)).unwrap();
    let a = Wallet::new("A").unwrap();
    let b = Wallet::new("B").unwrap();
    let miner_c = Wallet::new("C").unwrap();
    let miner_d = Wallet::new("D").unwrap();
    assert_eq!(ledger.target_prefix(), "0");

    // A earns the funds it is about to spend
    mine(&ledger, &a);
    assert!(ledger.estimated_balance(&a.party()) >= 10);

    let t1 = Transaction::new_signed(ledger.next_transaction_id(), &a, b.party(), 10).unwrap();
    ledger.offer_transaction(t1.clone()).unwrap();
    assert!(ledger.pool_contains(t1.get_id()));

    let challenge_c = ledger.get_challenge(&miner_c.party()).unwrap();
    let challenge_d = ledger.get_challenge(&miner_d.party()).unwrap();
    assert_eq!(challenge_c.generation(), challenge_d.generation());

    let block_c = ProofOfWork::new_proof_of_work(&challenge_c).run("C").unwrap();
    let block_d = ProofOfWork::new_proof_of_work(&challenge_d).run("D").unwrap();
    assert_eq!(block_c.get_id(), block_d.get_id());

    let ledger = Arc::new(ledger);
    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = [block_c, block_d]
        .into_iter()
        .map(|block| {
            let ledger = Arc::clone(&ledger);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                ledger.offer_block(block)
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let loser = results.into_iter().find(|r| r.is_err()).unwrap();
    assert_eq!(
        loser,
        Err(RejectedBlock::BadId {
            expected: 3,
            actual: 2
        })
    );

    assert!(challenge_c.is_done());
    assert!(!ledger.pool_contains(t1.get_id()));
    assert_eq!(ledger.confirmed_balance(&b.party()), 10);
    assert_eq!(ledger.confirmed_balance(&a.party()), 90);
    assert_chain_properties(&ledger);
}

#[test]
fn test_threads_racing_on_live_challenges() {
    let ledger = Arc::new(Blockchain::new(fixed_config(5)).unwrap());
    let wallets: Vec<Wallet> = (1..=4)
        .map(|n| Wallet::new(format!("miner-{n}")).unwrap())
        .collect();
    let challenges: Vec<_> = wallets
        .iter()
        .map(|wallet| ledger.get_challenge(&wallet.party()).unwrap())
        .collect();

    let handles: Vec<_> = wallets
        .iter()
        .zip(challenges)
        .map(|(wallet, challenge)| {
            let ledger = Arc::clone(&ledger);
            let title = wallet.get_title().to_string();
            thread::spawn(move || {
                let block = ProofOfWork::new_proof_of_work(&challenge).run(&title)?;
                ledger.offer_block(block)?;
                Ok::<(), epoch_chain::MiningError>(())
            })
        })
        .collect();

    let accepted = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(Result::is_ok)
        .count();

    assert_eq!(accepted, 1);
    assert_eq!(ledger.len(), 1);
    assert_chain_properties(&ledger);
}

#[test]
fn test_block_below_difficulty_is_rejected() {
    let ledger = Blockchain::new(fixed_config(3)).unwrap();
    let miner = Wallet::new("m1").unwrap();
    let challenge = ledger.get_challenge(&miner.party()).unwrap();

    // Correct id and hash chain, but the digest misses the prefix
    let (nonce, hash) = (0u64..)
        .map(|nonce| {
            let hash = proof_of_work::calculate_hash(
                challenge.transactions(),
                challenge.complexity(),
                nonce,
                challenge.previous_hash(),
            );
            (nonce, hash)
        })
        .find(|(_, hash)| !hash.starts_with('0'))
        .unwrap();
    let block = Block::new(
        challenge.next_block_id(),
        challenge.complexity(),
        nonce,
        hash.clone(),
        "m1".to_string(),
        challenge.transactions().clone(),
    );

    assert_eq!(
        ledger.offer_block(block),
        Err(RejectedBlock::BelowDifficulty {
            prefix: "0".to_string(),
            hash
        })
    );
    assert!(ledger.is_empty());
}

#[test]
fn test_duplicate_transaction_id_is_rejected() {
    let ledger = Blockchain::new(fixed_config(3)).unwrap();
    let a = Wallet::new("A").unwrap();
    let b = Wallet::new("B").unwrap();
    mine(&ledger, &a);

    let id = ledger.next_transaction_id();
    ledger
        .offer_transaction(Transaction::new_signed(id, &a, b.party(), 10).unwrap())
        .unwrap();
    let same_id = Transaction::new_signed(id, &a, b.party(), 20).unwrap();

    assert_eq!(
        ledger.offer_transaction(same_id),
        Err(RejectedTransaction::Duplicate)
    );
    assert_eq!(ledger.pool_len(), 1);
}

#[test]
fn test_balances_settle_once_pool_is_empty() {
    let ledger = Blockchain::new(fixed_config(4)).unwrap();
    let a = Wallet::new("A").unwrap();
    let b = Wallet::new("B").unwrap();
    mine(&ledger, &a);

    let transfer =
        Transaction::new_signed(ledger.next_transaction_id(), &a, b.party(), 40).unwrap();
    ledger.offer_transaction(transfer).unwrap();
    assert_ne!(
        ledger.estimated_balance(&a.party()),
        ledger.confirmed_balance(&a.party())
    );

    mine(&ledger, &b);
    assert_eq!(ledger.pool_len(), 0);
    for party in [a.party(), b.party(), ledger.owner().clone()] {
        assert_eq!(
            ledger.estimated_balance(&party),
            ledger.confirmed_balance(&party)
        );
    }
    assert_eq!(ledger.confirmed_balance(&a.party()), 60);
    assert_eq!(ledger.confirmed_balance(&b.party()), 140);
    assert_eq!(ledger.confirmed_balance(ledger.owner()), -200);
}

#[test]
fn test_workers_fill_ledger_until_closed() {
    let ledger = Arc::new(Blockchain::new(fixed_config(6)).unwrap());
    let closed_calls = Arc::new(AtomicUsize::new(0));
    {
        let closed_calls = Arc::clone(&closed_calls);
        ledger.set_on_close(move |_| {
            closed_calls.fetch_add(1, Ordering::SeqCst);
        });
    }

    let mut wallets = Wallets::new();
    for n in 1..=3 {
        wallets.create_wallet(&format!("miner-{n}")).unwrap();
    }
    let stop = Arc::new(AtomicBool::new(false));
    let miners: Vec<_> = wallets
        .iter()
        .map(|wallet| {
            let miner = Miner::new(Arc::clone(&ledger), wallet.clone());
            let stop = Arc::clone(&stop);
            thread::spawn(move || miner.run(&stop, Duration::from_millis(1)))
        })
        .collect();
    let producer = TransactionProducer::new(Arc::clone(&ledger), wallets);
    let offered = {
        let stop = Arc::clone(&stop);
        thread::spawn(move || producer.run(&stop, Duration::from_millis(1)))
    };

    let mined: usize = miners.into_iter().map(|h| h.join().unwrap()).sum();
    stop.store(true, Ordering::SeqCst);
    offered.join().unwrap();

    assert!(ledger.is_closed());
    assert_eq!(ledger.len(), 6);
    assert_eq!(mined, 6);
    assert_eq!(closed_calls.load(Ordering::SeqCst), 1);
    assert_chain_properties(&ledger);
    assert!(ledger.verify_chain().is_ok());
    assert!(ledger.verify_chain().is_ok());
}

#[test]
fn test_challenges_stay_consistent_while_blocks_are_appended() {
    // Complexity 0 so appends come as fast as the lock allows
    let config = LedgerConfig {
        capacity: 30,
        initial_complexity: 0,
        min_complexity: 0,
        max_complexity: 0,
        ..LedgerConfig::default()
    };
    let ledger = Arc::new(Blockchain::new(config).unwrap());
    let stop = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (1..=4)
        .map(|n| {
            let ledger = Arc::clone(&ledger);
            let party = Wallet::new(format!("reader-{n}")).unwrap().party();
            thread::spawn(move || {
                let mut challenges = Vec::new();
                while let Ok(challenge) = ledger.get_challenge(&party) {
                    challenges.push(challenge);
                }
                challenges
            })
        })
        .collect();
    let miners: Vec<_> = (1..=3)
        .map(|n| {
            let miner = Miner::new(
                Arc::clone(&ledger),
                Wallet::new(format!("miner-{n}")).unwrap(),
            );
            let stop = Arc::clone(&stop);
            thread::spawn(move || miner.run(&stop, Duration::ZERO))
        })
        .collect();

    let mined: usize = miners.into_iter().map(|h| h.join().unwrap()).sum();
    let challenges: Vec<_> = readers
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();

    assert_eq!(mined, 30);
    assert_eq!(ledger.len(), 30);
    assert!(!challenges.is_empty());
    for challenge in &challenges {
        let tip = ledger.block_by_id(challenge.next_block_id() - 1).unwrap();
        assert_eq!(challenge.previous_hash(), tip.get_hash());
        assert_eq!(challenge.generation(), challenge.next_block_id());
    }
    assert!(ledger.verify_chain().is_ok());
}

#[test]
fn test_saved_ledger_detects_tampering() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ledger");
    let ledger = Blockchain::new(fixed_config(5)).unwrap();
    let a = Wallet::new("A").unwrap();
    let b = Wallet::new("B").unwrap();
    mine(&ledger, &a);
    ledger
        .offer_transaction(
            Transaction::new_signed(ledger.next_transaction_id(), &a, b.party(), 30).unwrap(),
        )
        .unwrap();
    mine(&ledger, &b);

    let store = SnapshotStore::open(&path).unwrap();
    store.save(&ledger.snapshot()).unwrap();

    let restored = Blockchain::restore(fixed_config(5), store.load().unwrap().unwrap()).unwrap();
    assert!(restored.verify_chain().is_ok());
    assert_eq!(restored.confirmed_balance(&b.party()), 130);
    assert_eq!(restored.to_string(), ledger.to_string());

    // Rewrite block #1 so its reward goes elsewhere
    let mut snapshot = store.load().unwrap().unwrap();
    let first = snapshot.chain[0].clone();
    let mut transactions = first.get_transactions().clone();
    transactions.insert(
        Transaction::new_signed(999, &a, b.party(), 1).unwrap(),
    );
    snapshot.chain[0] = Block::new(
        first.get_id(),
        first.get_complexity(),
        first.get_nonce(),
        first.get_hash().to_string(),
        first.get_miner().to_string(),
        transactions,
    );
    store.save(&snapshot).unwrap();

    let tampered = Blockchain::restore(fixed_config(5), store.load().unwrap().unwrap()).unwrap();
    let err = tampered.verify_chain().unwrap_err();
    assert_eq!(err.block_id, 1);
    assert_eq!(tampered.verify_chain().unwrap_err(), err);
}
