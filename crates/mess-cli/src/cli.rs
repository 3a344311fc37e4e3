use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "messledger",
    about = "Mess ledger: wallet balances and per-mess meal coupons",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// JSON state file; created on first write
    #[arg(long, global = true, default_value = "messledger.json")]
    pub state: PathBuf,

    /// TOML ledger configuration
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Authenticated user id to act as
    #[arg(long, global = true)]
    pub caller: Option<String>,

    /// Role held by the caller (repeatable)
    #[arg(long = "role", global = true)]
    pub roles: Vec<String>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create or replace a user account
    SeedAccount(SeedAccountArgs),
    /// Create or replace a mess (vendor) record
    SeedVendor(SeedVendorArgs),
    /// Add coupons for a mess to a user
    CreditCoupons(CouponArgs),
    /// Redeem coupons for a mess
    RedeemCoupon(CouponArgs),
    /// Add funds to a wallet
    CreditWallet(WalletArgs),
    /// Spend funds from a wallet
    DebitWallet(WalletArgs),
    /// Buy a subscription plan: debit the price, credit the coupons
    Purchase(PurchaseArgs),
    /// Show a user's balances
    Show(UserArgs),
    /// Show a user's audit trail
    Audit(UserArgs),
}

#[derive(Args)]
pub struct SeedAccountArgs {
    pub user: String,
    #[arg(long, default_value = "0")]
    pub wallet: i64,
    /// Initial coupons as MESS=COUNT (repeatable)
    #[arg(long = "coupons", value_parser = parse_coupon_entry)]
    pub coupons: Vec<(String, i64)>,
}

#[derive(Args)]
pub struct SeedVendorArgs {
    pub mess: String,
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Args)]
pub struct CouponArgs {
    pub user: String,
    pub mess: String,
    pub count: i64,
}

#[derive(Args)]
pub struct WalletArgs {
    pub user: String,
    pub amount: i64,
}

#[derive(Args)]
pub struct PurchaseArgs {
    pub user: String,
    pub mess: String,
    #[arg(long)]
    pub price: i64,
    #[arg(long)]
    pub coupons: i64,
}

#[derive(Args)]
pub struct UserArgs {
    pub user: String,
}

fn parse_coupon_entry(raw: &str) -> Result<(String, i64), String> {
    let (mess, count) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected MESS=COUNT, got `{raw}`"))?;
    let count = count
        .trim()
        .parse::<i64>()
        .map_err(|e| format!("invalid coupon count in `{raw}`: {e}"))?;
    Ok((mess.trim().to_string(), count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coupon_entries_parse() {
        assert_eq!(parse_coupon_entry("north=5"), Ok(("north".into(), 5)));
        assert!(parse_coupon_entry("north").is_err());
        assert!(parse_coupon_entry("north=five").is_err());
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = Cli::try_parse_from([
            "messledger",
            "redeem-coupon",
            "u1",
            "m1",
            "2",
            "--caller",
            "staff",
            "--role",
            "mess_staff",
            "--role",
            "auditor",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.caller.as_deref(), Some("staff"));
        assert_eq!(cli.roles, vec!["mess_staff", "auditor"]);
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(matches!(cli.command, Command::RedeemCoupon(CouponArgs { count: 2, .. })));
    }

    #[test]
    fn purchase_requires_price_and_coupons() {
        assert!(Cli::try_parse_from(["messledger", "purchase", "u1", "m1", "--price", "50"]).is_err());
    }
}
