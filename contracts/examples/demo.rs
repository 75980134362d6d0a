//! Walkthrough of a card escrow's lifecycle.
//!
//! Deploys a private USDC-like token and a card escrow, raises the spend
//! limit with an owner signature, funds the escrow through a delegated
//! transfer authorization, pays the operator, and shows what a party
//! without the escrow's keys can and cannot see.
//!
//! Run with:
//!   cargo run -p veil-contracts --example demo
//!
//! Set `RUST_LOG=debug` to see every node transaction.

use std::sync::Arc;
use std::time::Instant;

use veil_contracts::card_escrow::{build_signed_escrow_message, CardEscrow, EscrowAction};
use veil_contracts::token::{PrivateToken, TokenMetadata};
use veil_protocol::authwit::{random_nonce, TransferAuthorization};
use veil_protocol::config::NodeConfig;
use veil_protocol::crypto::schnorr::SchnorrSecretKey;
use veil_protocol::logging::{init_logging, LogFormat};
use veil_protocol::{Amount, Node, Pxe, Wallet};

// ---------------------------------------------------------------------------
// ANSI color constants
// ---------------------------------------------------------------------------

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";
const WHITE: &str = "\x1b[37m";

const BG_BLUE: &str = "\x1b[44m";

// ---------------------------------------------------------------------------
// Display helpers
// ---------------------------------------------------------------------------

fn banner() {
    println!();
    println!("{BG_BLUE}{BOLD}{WHITE}                                                                    {RESET}");
    println!("{BG_BLUE}{BOLD}{WHITE}    VEIL  --  Card Escrow Walkthrough                               {RESET}");
    println!("{BG_BLUE}{BOLD}{WHITE}    Poseidon/BN254 + BIP-340/secp256k1 + X25519/AES-GCM notes       {RESET}");
    println!("{BG_BLUE}{BOLD}{WHITE}                                                                    {RESET}");
    println!();
}

fn section(num: u32, title: &str) {
    println!();
    println!("{BOLD}{CYAN}===[{YELLOW} Step {num} {CYAN}]======================================================{RESET}");
    println!("{BOLD}{WHITE}  {title}{RESET}");
}

fn success(text: &str) {
    println!("{GREEN}  [OK] {text}{RESET}");
}

fn refused(text: &str) {
    println!("{RED}  [REFUSED] {text}{RESET}");
}

fn info(label: &str, value: &str) {
    println!("{WHITE}  {BOLD}{label}:{RESET} {YELLOW}{value}{RESET}");
}

fn usdc(amount: Amount, decimals: u8) -> String {
    let unit = 10u128.pow(decimals as u32);
    format!("{}.{:0width$} USDC", amount / unit, amount % unit, width = decimals as usize)
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() {
    init_logging("warn", LogFormat::Pretty);
    banner();

    let metadata = TokenMetadata::usdc();
    let d = metadata.decimals;
    let node = Arc::new(Node::new(NodeConfig::default()));
    let pxe = Arc::new(Pxe::new("cardholder"));

    section(1, "Accounts and token");
    let owner = Wallet::create(node.clone(), pxe.clone()).expect("owner wallet");
    let operator = Wallet::create(node.clone(), pxe.clone()).expect("operator wallet");
    let (token, _, _) =
        PrivateToken::deploy_with_minter(&owner.context(), metadata.clone()).expect("token deploy");
    token
        .mint_to_private(&owner.context(), owner.address(), metadata.wad(20_000))
        .expect("mint");
    info("Owner", &owner.address().to_string());
    info("Operator", &operator.address().to_string());
    info("Token", &token.address().to_string());
    success(&format!("Minted {} privately to owner", usdc(metadata.wad(20_000), d)));

    section(2, "Deploy the escrow");
    let owner_key = SchnorrSecretKey::generate();
    let deployed = CardEscrow::deploy(
        &owner.context(),
        &token,
        operator.address(),
        owner_key.public_key(),
        metadata.wad(1_000),
    )
    .expect("escrow deploy");
    let escrow = deployed.escrow;
    let ctx = owner.context();
    info("Escrow", &escrow.address().to_string());
    info("Spend limit", &usdc(escrow.get_spend_limit(&ctx).expect("limit"), d));
    info("Block", &deployed.receipt.block_number.to_string());

    section(3, "Owner signs a higher spend limit");
    let nonce = escrow.get_nonce(&ctx).expect("nonce");
    let t = Instant::now();
    let signed = build_signed_escrow_message(
        &escrow.address(),
        metadata.wad(2_000),
        nonce,
        EscrowAction::SpendLimit,
        &owner_key,
    );
    info("Digest", &hex::encode(signed.digest));
    info("Signed in", &format!("{:.2} ms", t.elapsed().as_secs_f64() * 1000.0));
    escrow
        .change_spend_limit_by_signature(&ctx, metadata.wad(2_000), &signed.signature_bytes())
        .expect("limit change");
    success(&format!(
        "Spend limit now {} (nonce {})",
        usdc(escrow.get_spend_limit(&ctx).expect("limit"), d),
        escrow.get_nonce(&ctx).expect("nonce")
    ));

    match escrow.change_spend_limit_by_signature(&ctx, metadata.wad(2_000), &signed.signature_bytes()) {
        Err(e) => refused(&format!("Replaying the same signature: {e}")),
        Ok(_) => unreachable!("replayed signature must fail"),
    }

    section(4, "Fund through a delegated transfer authorization");
    let amount = metadata.wad(10_000);
    let authwit_nonce = random_nonce();
    let witness = owner.create_authwit(&TransferAuthorization {
        consumer: token.address(),
        caller: escrow.address(),
        from: owner.address(),
        to: escrow.address(),
        amount,
        nonce: authwit_nonce,
    });
    escrow
        .deposit(&ctx, amount, authwit_nonce, &[witness])
        .expect("deposit");
    success(&format!("Escrow balance {}", usdc(escrow.get_balance(&ctx).expect("balance"), d)));

    section(5, "Owner signs a withdrawal to the operator");
    let nonce = escrow.get_nonce(&ctx).expect("nonce");
    let signed = build_signed_escrow_message(
        &escrow.address(),
        metadata.wad(1_000),
        nonce,
        EscrowAction::Withdraw,
        &owner_key,
    );
    escrow
        .withdraw_by_signature(&ctx, metadata.wad(1_000), &signed.signature_bytes())
        .expect("withdraw");
    info("Escrow balance", &usdc(escrow.get_balance(&ctx).expect("balance"), d));
    info(
        "Operator balance",
        &usdc(token.balance_of_private(&ctx, operator.address()).expect("balance"), d),
    );
    info("Nonce", &escrow.get_nonce(&ctx).expect("nonce").to_string());

    section(6, "A second party with only the contract instance");
    let auditor_pxe = Arc::new(Pxe::new("auditor"));
    let auditor = Wallet::create(node.clone(), auditor_pxe.clone()).expect("auditor wallet");
    auditor_pxe
        .register_contract(escrow.address(), deployed.instance.clone())
        .expect("register contract");
    match escrow.get_config(&auditor.context()) {
        Err(e) => refused(&format!("get_config without keys: {e}")),
        Ok(_) => unreachable!("keyless read must fail"),
    }

    auditor_pxe.register_account(&deployed.secret, deployed.instance.partial_address());
    let config = escrow.get_config(&auditor.context()).expect("config");
    success(&format!(
        "After register_account: operator {}, limit {}",
        config.operator,
        usdc(config.spend_limit, d)
    ));

    println!();
    println!("{DIM}  Ledger height: {}{RESET}", node.block_number());
    println!();
}
