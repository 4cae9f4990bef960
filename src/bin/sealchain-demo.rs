#![forbid(unsafe_code)]
//! Walks through a small ledger session: two actors, one signed transfer,
//! one rejected forgery, one mined block, and a final audit.

use clap::Parser;
use colored::*;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use sealchain::blockchain::Blockchain;
use sealchain::config::load_config;
use sealchain::crypto::KeyPair;
use sealchain::miner::{Miner, SealOutcome};
use sealchain::transaction::{Amount, Transaction};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "sealchain-demo", about = "Run a demo ledger session")]
struct Args {
    /// Path to a TOML config file
    #[arg(long, default_value = "sealchain.toml")]
    config: PathBuf,

    /// Override chain difficulty (leading zero hex characters)
    #[arg(long)]
    difficulty: Option<u32>,

    /// Override the number of sealing threads
    #[arg(long)]
    threads: Option<usize>,

    /// Abort sealing after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Print the resulting chain as JSON
    #[arg(long)]
    json: bool,
}

fn short(id: &str) -> String {
    if id.len() > 20 {
        format!("{}...{}", &id[..10], &id[id.len() - 10..])
    } else {
        id.to_string()
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let mut config = load_config(&args.config)?;
    if let Some(difficulty) = args.difficulty {
        config.chain.difficulty = difficulty;
    }
    if let Some(threads) = args.threads {
        config.miner.threads = threads;
    }
    if args.timeout_secs.is_some() {
        config.miner.timeout_secs = args.timeout_secs;
    }
    config.validate()?;
    info!(?config, "Configuration loaded");

    let sender = KeyPair::generate();
    let receiver = KeyPair::generate();
    let sender_id = sender.public_key_hex();
    let receiver_id = receiver.public_key_hex();

    println!("{}", "Sealchain demo".bright_cyan().bold());
    println!("{}", "--------------".bright_cyan());
    println!("Sender:   {}", short(&sender_id).bright_white());
    println!("Receiver: {}", short(&receiver_id).bright_white());
    println!();

    let mut chain = Blockchain::with_config(&config.chain)?;
    println!(
        "Genesis sealed: {}",
        chain.blocks()[0].hash_str().bright_green()
    );

    let mut transfer = Transaction::transfer(sender_id.clone(), receiver_id.clone(), Amount::from_num(10));
    transfer.sign(&sender)?;

    let mut forged = transfer.clone();
    if let Transaction::Transfer(tx) = &mut forged {
        tx.amount = Amount::from_num(5);
    }

    chain.submit_transaction(transfer)?;
    println!("{} signed transfer of 10 accepted", "✓".green());

    match chain.submit_transaction(forged) {
        Ok(()) => println!("{} altered transfer was accepted", "✗".red()),
        Err(e) => println!("{} altered transfer rejected: {}", "✓".green(), e),
    }

    let miner = Miner::from_config(&config.miner);
    let start = Instant::now();
    match chain.mine_now_with(&miner, &sender_id)? {
        SealOutcome::Sealed(block) => {
            println!(
                "{} block #{} sealed in {:.3}s (nonce {}): {}",
                "✓".green(),
                chain.len() - 1,
                start.elapsed().as_secs_f64(),
                block.header.nonce,
                block.hash_str().bright_green()
            );
        }
        SealOutcome::Cancelled => {
            println!(
                "{} sealing cancelled after {:?}",
                "!".yellow(),
                config.miner.timeout_secs.map(Duration::from_secs)
            );
        }
    }

    match chain.validate_chain() {
        Ok(()) => println!("{} chain of {} blocks is valid", "✓".green(), chain.len()),
        Err(e) => println!("{} chain invalid: {}", "✗".red(), e),
    }

    println!();
    println!("Balances:");
    println!("  sender:   {}", chain.balance_of(&sender_id));
    println!("  receiver: {}", chain.balance_of(&receiver_id));

    if args.json {
        println!("{}", serde_json::to_string_pretty(chain.blocks())?);
    }

    Ok(())
}
