// Ledger benchmarks for CryptoChain.
//
// Covers the balance scan over chains of growing length, transaction
// signing and validation, and full chain validation.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use cryptochain_protocol::ledger::{BlockData, Blockchain};
use cryptochain_protocol::transaction::Transaction;
use cryptochain_protocol::vault::{calculate_balance, Wallet};

/// A chain of `blocks` blocks, each carrying `per_block` transfers between
/// fresh wallets plus one reward. `watched` only ever receives.
fn build_chain(blocks: usize, per_block: usize, watched: &str) -> Blockchain {
    let miner = Wallet::new();
    let mut chain = Blockchain::new();
    for _ in 0..blocks {
        let mut txs: Vec<Transaction> = (0..per_block)
            .map(|_| Transaction::new(&Wallet::new(), watched, 1).expect("transfer"))
            .collect();
        txs.push(Transaction::reward(&miner));
        chain
            .add_block(BlockData::from_transactions(txs))
            .expect("add block");
    }
    chain
}

fn bench_calculate_balance(c: &mut Criterion) {
    let watched = Wallet::new();
    let mut group = c.benchmark_group("ledger/calculate_balance");

    for blocks in [10usize, 100, 500] {
        let chain = build_chain(blocks, 5, watched.address());
        group.throughput(Throughput::Elements(blocks as u64));
        group.bench_with_input(BenchmarkId::from_parameter(blocks), &chain, |b, chain| {
            b.iter(|| calculate_balance(chain.blocks(), watched.address()));
        });
    }

    group.finish();
}

fn bench_create_transaction(c: &mut Criterion) {
    let sender = Wallet::new();
    let recipient = Wallet::new();

    c.bench_function("transaction/create", |b| {
        b.iter(|| Transaction::new(&sender, recipient.address(), 50));
    });
}

fn bench_amend_transaction(c: &mut Criterion) {
    let sender = Wallet::new();
    let base = Transaction::new(&sender, Wallet::new().address(), 1).expect("transfer");

    c.bench_function("transaction/update", |b| {
        b.iter(|| {
            let mut tx = base.clone();
            tx.update(&sender, "recipient", 1)
        });
    });
}

fn bench_validate_transaction(c: &mut Criterion) {
    let tx = Transaction::new(&Wallet::new(), Wallet::new().address(), 50).expect("transfer");

    c.bench_function("transaction/validate", |b| {
        b.iter(|| tx.validate());
    });
}

fn bench_validate_chain(c: &mut Criterion) {
    let chain = build_chain(50, 5, Wallet::new().address());

    c.bench_function("ledger/validate_transaction_data_50", |b| {
        b.iter(|| Blockchain::validate_transaction_data(chain.blocks()));
    });
}

criterion_group!(
    benches,
    bench_calculate_balance,
    bench_create_transaction,
    bench_amend_transaction,
    bench_validate_transaction,
    bench_validate_chain,
);
criterion_main!(benches);
