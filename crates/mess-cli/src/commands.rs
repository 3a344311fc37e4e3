use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use serde_json::{json, Value};

use mess_ledger::{
    Ack, Caller, CreditCouponsRequest, CreditWalletRequest, DebitReceipt, DebitWalletRequest,
    LedgerConfig, LedgerEngine, LedgerError, PurchaseSubscriptionRequest, RedeemCouponRequest,
};
use mess_store::InMemoryAccountStore;
use mess_types::{Account, MessId, TransactionRecord, UserId, Vendor};

use crate::cli::*;

/// What a command produced, before rendering.
#[derive(Debug)]
pub enum Outcome {
    Ack(Ack),
    Debit(DebitReceipt),
    Seeded(String),
    Account(Account),
    Trail(Vec<TransactionRecord>),
}

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match execute(&cli) {
        Ok(outcome) => {
            match cli.format {
                OutputFormat::Text => print_text(&outcome),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&to_json(&outcome))?),
            }
            Ok(())
        }
        Err(error) => {
            if cli.format == OutputFormat::Json {
                if let Some(body) = error_body(&error) {
                    println!("{}", serde_json::to_string_pretty(&body)?);
                }
            }
            Err(error)
        }
    }
}

/// JSON error payload for ledger failures; other failures have none.
pub fn error_body(error: &anyhow::Error) -> Option<Value> {
    let ledger = error.downcast_ref::<LedgerError>()?;
    Some(json!({
        "error": { "code": ledger.kind().code(), "message": ledger.to_string() }
    }))
}

/// Load state and config, run one command, and persist any mutation.
pub fn execute(cli: &Cli) -> anyhow::Result<Outcome> {
    let config = match &cli.config {
        Some(path) => LedgerConfig::load(path)?,
        None => LedgerConfig::default(),
    };
    let store = InMemoryAccountStore::load(&cli.state)
        .with_context(|| format!("failed to load state from {}", cli.state.display()))?;
    let engine = LedgerEngine::from_config(store, &config);

    // A blank caller is treated as no caller at all.
    let caller_id = cli.caller.as_deref().map(str::trim).filter(|id| !id.is_empty());
    let caller = match caller_id {
        Some(id) => {
            let mut caller = Caller::new(UserId::new(id)?);
            for role in &cli.roles {
                caller = caller.with_role(role.as_str());
            }
            Some(caller)
        }
        None => None,
    };
    let caller = caller.as_ref();

    let outcome = match &cli.command {
        Command::SeedAccount(args) => {
            let mut account = Account::new(UserId::new(args.user.as_str())?).with_wallet(args.wallet);
            for (mess, count) in &args.coupons {
                account = account.with_coupons(MessId::new(mess.as_str())?, *count);
            }
            if !account.is_consistent() {
                anyhow::bail!("seeded balances must not be negative");
            }
            engine.store().insert_account(account)?;
            Outcome::Seeded(format!("Seeded account {}", args.user))
        }
        Command::SeedVendor(args) => {
            let mut vendor = Vendor::new(MessId::new(args.mess.as_str())?);
            if let Some(name) = &args.name {
                vendor = vendor.with_name(name.as_str());
            }
            engine.store().insert_vendor(vendor)?;
            Outcome::Seeded(format!("Seeded mess {}", args.mess))
        }
        Command::CreditCoupons(args) => Outcome::Ack(engine.credit_coupons(
            caller,
            &CreditCouponsRequest::new(&args.user, &args.mess, args.count),
        )?),
        Command::RedeemCoupon(args) => Outcome::Ack(engine.redeem_coupon(
            caller,
            &RedeemCouponRequest::new(&args.user, &args.mess, args.count),
        )?),
        Command::CreditWallet(args) => Outcome::Ack(
            engine.credit_wallet(caller, &CreditWalletRequest::new(&args.user, args.amount))?,
        ),
        Command::DebitWallet(args) => Outcome::Debit(
            engine.debit_wallet(caller, &DebitWalletRequest::new(&args.user, args.amount))?,
        ),
        Command::Purchase(args) => Outcome::Ack(engine.purchase_subscription(
            caller,
            &PurchaseSubscriptionRequest::new(&args.user, &args.mess, args.price, args.coupons),
        )?),
        Command::Show(args) => {
            return Ok(Outcome::Account(
                engine.account(caller, &UserId::new(args.user.as_str())?)?,
            ))
        }
        Command::Audit(args) => {
            return Ok(Outcome::Trail(
                engine.audit_trail(caller, &UserId::new(args.user.as_str())?)?,
            ))
        }
    };

    save(engine.store(), &cli.state)?;
    Ok(outcome)
}

fn save(store: &InMemoryAccountStore, path: &Path) -> anyhow::Result<()> {
    store
        .save(path)
        .with_context(|| format!("failed to write state to {}", path.display()))?;
    tracing::debug!(path = %path.display(), "state saved");
    Ok(())
}

pub fn to_json(outcome: &Outcome) -> Value {
    match outcome {
        Outcome::Ack(ack) => json!(ack),
        Outcome::Debit(receipt) => json!(receipt),
        Outcome::Seeded(message) => json!({ "success": true, "message": message }),
        Outcome::Account(account) => json!(account),
        Outcome::Trail(records) => json!(records),
    }
}

fn print_text(outcome: &Outcome) {
    match outcome {
        Outcome::Ack(ack) => println!("{} {}", "✓".green().bold(), ack.message),
        Outcome::Seeded(message) => println!("{} {}", "✓".green().bold(), message),
        Outcome::Debit(receipt) => println!(
            "{} Wallet debited. New balance: {}",
            "✓".green().bold(),
            receipt.new_balance.to_string().bold()
        ),
        Outcome::Account(account) => {
            println!("User {}", account.user_id.as_str().yellow().bold());
            println!("  Wallet: {}", account.wallet.to_string().bold());
            if account.coupons.is_empty() {
                println!("  Coupons: {}", "none".dimmed());
            }
            for (mess, count) in &account.coupons {
                println!("  Coupons @ {}: {}", mess.as_str().cyan(), count);
            }
        }
        Outcome::Trail(records) if records.is_empty() => println!("Audit trail: no records."),
        Outcome::Trail(records) => {
            for record in records {
                let mess = record.mess_id.as_ref().map(MessId::as_str).unwrap_or("-");
                println!(
                    "{}  {}  {}  {}  {}  {}",
                    record.id.short_id().yellow(),
                    record.timestamp.to_rfc3339().dimmed(),
                    record.kind.as_str().green(),
                    record.amount,
                    mess.cyan(),
                    record.details
                );
            }
        }
    }
}
