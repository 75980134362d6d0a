//! Integration tests for the card escrow contract.
//!
//! These tests run the escrow against a real token on an in-process node:
//! funding through delegated transfer authorizations, owner-signed spend
//! limit changes and withdrawals, replay attempts, and reads from parties
//! with and without the escrow's keys.

use std::sync::Arc;
use std::thread;

use ark_bn254::Fr;

use veil_contracts::card_escrow::{
    build_signed_escrow_message, CardEscrow, DeployedEscrow, EscrowAccount, EscrowAction,
    EscrowError, ESCROW_ARTIFACT,
};
use veil_contracts::token::{wad, PrivateToken, TokenError, TokenMetadata};
use veil_protocol::authwit::{random_nonce, TransferAuthorization};
use veil_protocol::crypto::schnorr::SchnorrSecretKey;
use veil_protocol::environment::{seal_value, ContractCode, NodeError, NoteKey, TxReceipt};
use veil_protocol::identity::{validate_contract_address, AccountSecret, Address, ContractInstance};
use veil_protocol::{Amount, Node, Pxe, Wallet};

const DECIMALS: u8 = 6;

struct Fixture {
    node: Arc<Node>,
    deployer: Wallet,
    operator: Wallet,
    owner_key: SchnorrSecretKey,
    token: PrivateToken,
    deployed: DeployedEscrow,
}

impl Fixture {
    fn escrow(&self) -> CardEscrow {
        self.deployed.escrow
    }

    fn sign(&self, amount: Amount, nonce: u64, action: EscrowAction) -> [u8; 64] {
        build_signed_escrow_message(
            &self.escrow().address(),
            amount,
            nonce,
            action,
            &self.owner_key,
        )
        .signature_bytes()
    }

    /// Sign at the escrow's current nonce.
    fn sign_now(&self, amount: Amount, action: EscrowAction) -> [u8; 64] {
        let nonce = self.escrow().get_nonce(&self.deployer.context()).unwrap();
        self.sign(amount, nonce, action)
    }

    fn deposit(&self, amount: Amount) -> Result<TxReceipt, EscrowError> {
        let nonce = random_nonce();
        let witness = self.deployer.create_authwit(&TransferAuthorization {
            consumer: self.token.address(),
            caller: self.escrow().address(),
            from: self.deployer.address(),
            to: self.escrow().address(),
            amount,
            nonce,
        });
        self.escrow()
            .deposit(&self.deployer.context(), amount, nonce, &[witness])
    }

    fn token_balance(&self, wallet: &Wallet) -> Amount {
        self.token
            .balance_of_private(&self.deployer.context(), wallet.address())
            .unwrap()
    }
}

/// Helper: a deployer holding 20,000 USDC, an operator, and an escrow with a
/// 1,000 USDC spend limit, all sharing one PXE.
fn setup() -> Fixture {
    let node = Arc::new(Node::default());
    let pxe = Arc::new(Pxe::new("deployer"));
    let deployer = Wallet::create(node.clone(), pxe.clone()).unwrap();
    let operator = Wallet::create(node.clone(), pxe).unwrap();

    let (token, _, _) =
        PrivateToken::deploy_with_minter(&deployer.context(), TokenMetadata::usdc()).unwrap();
    token
        .mint_to_private(&deployer.context(), deployer.address(), wad(20_000, DECIMALS))
        .unwrap();

    let owner_key = SchnorrSecretKey::generate();
    let deployed = CardEscrow::deploy(
        &deployer.context(),
        &token,
        operator.address(),
        owner_key.public_key(),
        wad(1_000, DECIMALS),
    )
    .unwrap();

    Fixture {
        node,
        deployer,
        operator,
        owner_key,
        token,
        deployed,
    }
}

// ---------------------------------------------------------------------------
// Lifecycle Tests
// ---------------------------------------------------------------------------

#[test]
fn full_lifecycle_happy_path() {
    let f = setup();
    let ctx = f.deployer.context();
    let escrow = f.escrow();

    // 1. Initial state
    let config = escrow.get_config(&ctx).unwrap();
    assert_eq!(config.owner, f.deployer.address());
    assert_eq!(config.operator, f.operator.address());
    assert_eq!(config.token, f.token.address());
    assert_eq!(config.spend_limit, wad(1_000, DECIMALS));
    assert_eq!(escrow.get_nonce(&ctx).unwrap(), 0);

    // 2. Raise the limit
    let sig = f.sign(wad(2_000, DECIMALS), 0, EscrowAction::SpendLimit);
    escrow
        .change_spend_limit_by_signature(&ctx, wad(2_000, DECIMALS), &sig)
        .unwrap();
    assert_eq!(escrow.get_spend_limit(&ctx).unwrap(), wad(2_000, DECIMALS));
    assert_eq!(escrow.get_nonce(&ctx).unwrap(), 1);

    // 3. Fund
    f.deposit(wad(10_000, DECIMALS)).unwrap();
    assert_eq!(escrow.get_balance(&ctx).unwrap(), wad(10_000, DECIMALS));
    assert_eq!(f.token_balance(&f.deployer), wad(10_000, DECIMALS));

    // 4. Withdraw to the operator
    let sig = f.sign(wad(1_000, DECIMALS), 1, EscrowAction::Withdraw);
    escrow
        .withdraw_by_signature(&ctx, wad(1_000, DECIMALS), &sig)
        .unwrap();
    assert_eq!(escrow.get_balance(&ctx).unwrap(), wad(9_000, DECIMALS));
    assert_eq!(f.token_balance(&f.operator), wad(1_000, DECIMALS));
    assert_eq!(escrow.get_nonce(&ctx).unwrap(), 2);

    // Escrow bookkeeping matches the token ledger.
    assert_eq!(
        f.token
            .balance_of_private(&ctx, escrow.address())
            .unwrap(),
        wad(9_000, DECIMALS)
    );
}

#[test]
fn deployed_address_matches_instance() {
    let f = setup();
    assert!(validate_contract_address(
        &f.escrow().address(),
        &f.deployed.instance
    ));
    assert!(f.node.view(|s| s.is_deployed(&f.escrow().address())));
}

#[test]
fn receipts_are_ordered() {
    let f = setup();
    let r1 = f.deposit(wad(1, DECIMALS)).unwrap();
    let r2 = f.deposit(wad(1, DECIMALS)).unwrap();
    assert!(r2.block_number > r1.block_number);
    assert!(r1.block_number > f.deployed.receipt.block_number);
}

// ---------------------------------------------------------------------------
// Replay Protection
// ---------------------------------------------------------------------------

#[test]
fn spend_limit_signature_cannot_be_replayed() {
    let f = setup();
    let ctx = f.deployer.context();
    let sig = f.sign(wad(2_000, DECIMALS), 0, EscrowAction::SpendLimit);

    f.escrow()
        .change_spend_limit_by_signature(&ctx, wad(2_000, DECIMALS), &sig)
        .unwrap();
    assert_eq!(
        f.escrow()
            .change_spend_limit_by_signature(&ctx, wad(2_000, DECIMALS), &sig),
        Err(EscrowError::SignatureInvalid)
    );
    assert_eq!(f.escrow().get_nonce(&ctx).unwrap(), 1);
}

#[test]
fn withdraw_signature_cannot_be_replayed() {
    let f = setup();
    let ctx = f.deployer.context();
    f.deposit(wad(5_000, DECIMALS)).unwrap();

    let sig = f.sign_now(wad(100, DECIMALS), EscrowAction::Withdraw);
    f.escrow()
        .withdraw_by_signature(&ctx, wad(100, DECIMALS), &sig)
        .unwrap();
    assert_eq!(
        f.escrow()
            .withdraw_by_signature(&ctx, wad(100, DECIMALS), &sig),
        Err(EscrowError::SignatureInvalid)
    );
    assert_eq!(f.escrow().get_balance(&ctx).unwrap(), wad(4_900, DECIMALS));
    assert_eq!(f.token_balance(&f.operator), wad(100, DECIMALS));
}

#[test]
fn spend_limit_signature_rejected_as_withdrawal() {
    let f = setup();
    let ctx = f.deployer.context();
    f.deposit(wad(5_000, DECIMALS)).unwrap();

    let sig = f.sign(wad(500, DECIMALS), 0, EscrowAction::SpendLimit);
    assert_eq!(
        f.escrow()
            .withdraw_by_signature(&ctx, wad(500, DECIMALS), &sig),
        Err(EscrowError::SignatureInvalid)
    );

    let sig = f.sign(wad(500, DECIMALS), 0, EscrowAction::Withdraw);
    assert_eq!(
        f.escrow()
            .change_spend_limit_by_signature(&ctx, wad(500, DECIMALS), &sig),
        Err(EscrowError::SignatureInvalid)
    );
    assert_eq!(f.escrow().get_nonce(&ctx).unwrap(), 0);
}

#[test]
fn signature_from_another_key_rejected() {
    let f = setup();
    let ctx = f.deployer.context();
    let impostor = SchnorrSecretKey::generate();
    let sig = build_signed_escrow_message(
        &f.escrow().address(),
        wad(9_999, DECIMALS),
        0,
        EscrowAction::SpendLimit,
        &impostor,
    )
    .signature_bytes();
    assert_eq!(
        f.escrow()
            .change_spend_limit_by_signature(&ctx, wad(9_999, DECIMALS), &sig),
        Err(EscrowError::SignatureInvalid)
    );
    assert_eq!(
        f.escrow().get_spend_limit(&ctx).unwrap(),
        wad(1_000, DECIMALS)
    );
}

#[test]
fn malformed_signatures_rejected() {
    let f = setup();
    let ctx = f.deployer.context();
    let sig = f.sign(wad(2_000, DECIMALS), 0, EscrowAction::SpendLimit);

    for bad in [&sig[..0], &sig[..32], &sig[..63]] {
        assert_eq!(
            f.escrow()
                .change_spend_limit_by_signature(&ctx, wad(2_000, DECIMALS), bad),
            Err(EscrowError::SignatureInvalid)
        );
    }
    let mut long = sig.to_vec();
    long.push(0);
    assert_eq!(
        f.escrow()
            .change_spend_limit_by_signature(&ctx, wad(2_000, DECIMALS), &long),
        Err(EscrowError::SignatureInvalid)
    );
    assert_eq!(f.escrow().get_nonce(&ctx).unwrap(), 0);
}

#[test]
fn competing_signatures_for_same_nonce_first_wins() {
    let f = setup();
    let ctx = f.deployer.context();
    f.deposit(wad(5_000, DECIMALS)).unwrap();

    let a = f.sign(wad(100, DECIMALS), 0, EscrowAction::Withdraw);
    let b = f.sign(wad(200, DECIMALS), 0, EscrowAction::Withdraw);

    f.escrow()
        .withdraw_by_signature(&ctx, wad(200, DECIMALS), &b)
        .unwrap();
    assert_eq!(
        f.escrow()
            .withdraw_by_signature(&ctx, wad(100, DECIMALS), &a),
        Err(EscrowError::SignatureInvalid)
    );
    assert_eq!(f.escrow().get_balance(&ctx).unwrap(), wad(4_800, DECIMALS));
}

#[test]
fn concurrent_withdrawals_on_same_nonce_apply_once() {
    let f = setup();
    f.deposit(wad(5_000, DECIMALS)).unwrap();

    let sigs = [
        (wad(100, DECIMALS), f.sign(wad(100, DECIMALS), 0, EscrowAction::Withdraw)),
        (wad(300, DECIMALS), f.sign(wad(300, DECIMALS), 0, EscrowAction::Withdraw)),
    ];

    let results: Vec<Result<TxReceipt, EscrowError>> = thread::scope(|s| {
        let handles: Vec<_> = sigs
            .iter()
            .map(|(amount, sig)| {
                let f = &f;
                s.spawn(move || {
                    f.escrow()
                        .withdraw_by_signature(&f.deployer.context(), *amount, sig)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let ok = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(ok, 1);
    assert!(results
        .iter()
        .any(|r| *r == Err(EscrowError::SignatureInvalid)));

    let ctx = f.deployer.context();
    assert_eq!(f.escrow().get_nonce(&ctx).unwrap(), 1);
    let paid = f.token_balance(&f.operator);
    assert!(paid == wad(100, DECIMALS) || paid == wad(300, DECIMALS));
    assert_eq!(
        f.escrow().get_balance(&ctx).unwrap(),
        wad(5_000, DECIMALS) - paid
    );
}

#[test]
fn zero_withdrawal_revokes_outstanding_signature() {
    let f = setup();
    let ctx = f.deployer.context();
    f.deposit(wad(5_000, DECIMALS)).unwrap();

    let pending = f.sign(wad(500, DECIMALS), 0, EscrowAction::Withdraw);
    let revoke = f.sign(0, 0, EscrowAction::Withdraw);
    f.escrow().withdraw_by_signature(&ctx, 0, &revoke).unwrap();
    assert_eq!(f.escrow().get_nonce(&ctx).unwrap(), 1);

    assert_eq!(
        f.escrow()
            .withdraw_by_signature(&ctx, wad(500, DECIMALS), &pending),
        Err(EscrowError::SignatureInvalid)
    );
    assert_eq!(f.escrow().get_balance(&ctx).unwrap(), wad(5_000, DECIMALS));
    assert_eq!(f.token_balance(&f.operator), 0);
}

// ---------------------------------------------------------------------------
// Limits and Balances
// ---------------------------------------------------------------------------

#[test]
fn withdrawal_over_spend_limit_rejected() {
    let f = setup();
    let ctx = f.deployer.context();
    f.deposit(wad(10_000, DECIMALS)).unwrap();

    let sig = f.sign(wad(1_001, DECIMALS), 0, EscrowAction::Withdraw);
    assert_eq!(
        f.escrow()
            .withdraw_by_signature(&ctx, wad(1_001, DECIMALS), &sig),
        Err(EscrowError::InsufficientSpendLimit {
            requested: wad(1_001, DECIMALS),
            limit: wad(1_000, DECIMALS),
        })
    );

    // Exactly the limit is fine, with the same nonce.
    let sig = f.sign(wad(1_000, DECIMALS), 0, EscrowAction::Withdraw);
    f.escrow()
        .withdraw_by_signature(&ctx, wad(1_000, DECIMALS), &sig)
        .unwrap();
}

#[test]
fn withdrawal_over_balance_rejected() {
    let f = setup();
    let ctx = f.deployer.context();
    f.deposit(wad(500, DECIMALS)).unwrap();

    let sig = f.sign(wad(600, DECIMALS), 0, EscrowAction::Withdraw);
    assert_eq!(
        f.escrow()
            .withdraw_by_signature(&ctx, wad(600, DECIMALS), &sig),
        Err(EscrowError::InsufficientBalance {
            requested: wad(600, DECIMALS),
            available: wad(500, DECIMALS),
        })
    );
    assert_eq!(f.token_balance(&f.operator), 0);
}

#[test]
fn nonce_unchanged_after_every_kind_of_failure() {
    let f = setup();
    let ctx = f.deployer.context();
    f.deposit(wad(100, DECIMALS)).unwrap();

    let over_limit = f.sign(wad(2_000, DECIMALS), 0, EscrowAction::Withdraw);
    let over_balance = f.sign(wad(200, DECIMALS), 0, EscrowAction::Withdraw);
    let wrong_nonce = f.sign(wad(1, DECIMALS), 5, EscrowAction::Withdraw);

    assert!(f
        .escrow()
        .withdraw_by_signature(&ctx, wad(2_000, DECIMALS), &over_limit)
        .is_err());
    assert!(f
        .escrow()
        .withdraw_by_signature(&ctx, wad(200, DECIMALS), &over_balance)
        .is_err());
    assert!(f
        .escrow()
        .withdraw_by_signature(&ctx, wad(1, DECIMALS), &wrong_nonce)
        .is_err());
    assert!(f.deposit(wad(1_000_000, DECIMALS)).is_err());

    assert_eq!(f.escrow().get_nonce(&ctx).unwrap(), 0);
    assert_eq!(f.escrow().get_balance(&ctx).unwrap(), wad(100, DECIMALS));
    assert_eq!(
        f.escrow().get_spend_limit(&ctx).unwrap(),
        wad(1_000, DECIMALS)
    );
}

#[test]
fn lowered_limit_applies_to_next_withdrawal() {
    let f = setup();
    let ctx = f.deployer.context();
    f.deposit(wad(1_000, DECIMALS)).unwrap();

    let sig = f.sign(wad(50, DECIMALS), 0, EscrowAction::SpendLimit);
    f.escrow()
        .change_spend_limit_by_signature(&ctx, wad(50, DECIMALS), &sig)
        .unwrap();

    let sig = f.sign(wad(51, DECIMALS), 1, EscrowAction::Withdraw);
    assert!(matches!(
        f.escrow()
            .withdraw_by_signature(&ctx, wad(51, DECIMALS), &sig),
        Err(EscrowError::InsufficientSpendLimit { .. })
    ));
}

// ---------------------------------------------------------------------------
// Deposits
// ---------------------------------------------------------------------------

#[test]
fn deposit_without_authorization_rejected() {
    let f = setup();
    let ctx = f.deployer.context();
    assert_eq!(
        f.escrow()
            .deposit(&ctx, wad(10, DECIMALS), random_nonce(), &[]),
        Err(EscrowError::AuthorizationInvalid)
    );
    assert_eq!(f.escrow().get_balance(&ctx).unwrap(), 0);
}

#[test]
fn deposit_authorization_for_other_amount_rejected() {
    let f = setup();
    let ctx = f.deployer.context();
    let nonce = random_nonce();
    let witness = f.deployer.create_authwit(&TransferAuthorization {
        consumer: f.token.address(),
        caller: f.escrow().address(),
        from: f.deployer.address(),
        to: f.escrow().address(),
        amount: wad(10, DECIMALS),
        nonce,
    });
    assert_eq!(
        f.escrow()
            .deposit(&ctx, wad(11, DECIMALS), nonce, &[witness]),
        Err(EscrowError::AuthorizationInvalid)
    );
}

#[test]
fn deposit_authorization_cannot_be_reused() {
    let f = setup();
    let ctx = f.deployer.context();
    let amount = wad(10, DECIMALS);
    let nonce = random_nonce();
    let witness = f.deployer.create_authwit(&TransferAuthorization {
        consumer: f.token.address(),
        caller: f.escrow().address(),
        from: f.deployer.address(),
        to: f.escrow().address(),
        amount,
        nonce,
    });

    f.escrow().deposit(&ctx, amount, nonce, &[witness]).unwrap();
    assert_eq!(
        f.escrow().deposit(&ctx, amount, nonce, &[witness]),
        Err(EscrowError::AuthorizationConsumed)
    );
    assert_eq!(f.escrow().get_balance(&ctx).unwrap(), amount);
}

#[test]
fn concurrent_redemption_of_one_authorization() {
    let f = setup();
    let amount = wad(10, DECIMALS);
    let nonce = random_nonce();
    let witness = f.deployer.create_authwit(&TransferAuthorization {
        consumer: f.token.address(),
        caller: f.escrow().address(),
        from: f.deployer.address(),
        to: f.escrow().address(),
        amount,
        nonce,
    });

    let results: Vec<Result<TxReceipt, EscrowError>> = thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let f = &f;
                s.spawn(move || {
                    f.escrow()
                        .deposit(&f.deployer.context(), amount, nonce, &[witness])
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|r| **r == Err(EscrowError::AuthorizationConsumed))
            .count(),
        3
    );
    assert_eq!(
        f.escrow().get_balance(&f.deployer.context()).unwrap(),
        amount
    );
}

#[test]
fn deposit_beyond_depositor_funds_rejected() {
    let f = setup();
    assert_eq!(
        f.deposit(wad(20_001, DECIMALS)),
        Err(EscrowError::InsufficientFunds {
            requested: wad(20_001, DECIMALS),
            available: wad(20_000, DECIMALS),
        })
    );
    assert_eq!(f.token_balance(&f.deployer), wad(20_000, DECIMALS));
}

// ---------------------------------------------------------------------------
// Confidentiality
// ---------------------------------------------------------------------------

#[test]
fn unregistered_party_cannot_call() {
    let f = setup();
    let outsider = Wallet::create(f.node.clone(), Arc::new(Pxe::new("outsider"))).unwrap();
    assert_eq!(
        f.escrow().get_config(&outsider.context()),
        Err(EscrowError::UnknownContract {
            address: f.escrow().address()
        })
    );
}

#[test]
fn contract_without_keys_cannot_read_until_account_registered() {
    let f = setup();
    let escrow = f.escrow();

    let auditor_pxe = Arc::new(Pxe::new("auditor"));
    let auditor = Wallet::create(f.node.clone(), auditor_pxe.clone()).unwrap();
    auditor_pxe
        .register_contract(escrow.address(), f.deployed.instance.clone())
        .unwrap();

    let denied = || EscrowError::ConfidentialityDenied {
        address: escrow.address(),
    };
    assert_eq!(escrow.get_config(&auditor.context()), Err(denied()));
    assert_eq!(escrow.get_spend_limit(&auditor.context()), Err(denied()));
    assert_eq!(escrow.get_nonce(&auditor.context()), Err(denied()));
    assert_eq!(escrow.get_balance(&auditor.context()), Err(denied()));

    let registered = auditor_pxe.register_account(
        &f.deployed.secret,
        f.deployed.instance.partial_address(),
    );
    assert_eq!(registered, escrow.address());

    let theirs = escrow.get_config(&auditor.context()).unwrap();
    let ours = escrow.get_config(&f.deployer.context()).unwrap();
    assert_eq!(theirs, ours);
    assert_eq!(theirs.spend_limit, wad(1_000, DECIMALS));
}

#[test]
fn wrong_secret_does_not_unlock_state() {
    let f = setup();
    let escrow = f.escrow();

    let pxe = Arc::new(Pxe::new("guesser"));
    let guesser = Wallet::create(f.node.clone(), pxe.clone()).unwrap();
    pxe.register_contract(escrow.address(), f.deployed.instance.clone())
        .unwrap();
    let derived = pxe.register_account(
        &AccountSecret::random(),
        f.deployed.instance.partial_address(),
    );
    assert_ne!(derived, escrow.address());

    assert_eq!(
        escrow.get_nonce(&guesser.context()),
        Err(EscrowError::ConfidentialityDenied {
            address: escrow.address()
        })
    );
}

#[test]
fn keyless_party_cannot_withdraw_even_with_valid_signature() {
    let f = setup();
    f.deposit(wad(500, DECIMALS)).unwrap();
    let sig = f.sign(wad(100, DECIMALS), 0, EscrowAction::Withdraw);

    let pxe = Arc::new(Pxe::new("relay"));
    let relay = Wallet::create(f.node.clone(), pxe.clone()).unwrap();
    pxe.register_contract(f.escrow().address(), f.deployed.instance.clone())
        .unwrap();

    assert!(matches!(
        f.escrow()
            .withdraw_by_signature(&relay.context(), wad(100, DECIMALS), &sig),
        Err(EscrowError::ConfidentialityDenied { .. })
    ));

    // The signature is still good from a PXE that holds the keys.
    f.escrow()
        .withdraw_by_signature(&f.deployer.context(), wad(100, DECIMALS), &sig)
        .unwrap();
}

#[test]
fn ledger_holds_only_ciphertext() {
    let f = setup();
    f.deposit(wad(1_234, DECIMALS)).unwrap();

    let needle = wad(1_234, DECIMALS).to_le_bytes();
    let escrow = f.escrow().address();
    let leaked = f.node.view(|state| {
        let key = veil_protocol::environment::NoteKey::new(escrow, escrow, "account");
        state
            .notes(&key)
            .iter()
            .any(|note| note.ciphertext.windows(needle.len()).any(|w| w == needle))
    });
    assert!(!leaked);
}

// ---------------------------------------------------------------------------
// Ledger Write Isolation
// ---------------------------------------------------------------------------

/// Code an attacker controls, claiming the escrow's artifact name.
struct ForgedEscrow;

impl ContractCode for ForgedEscrow {
    const ARTIFACT: &'static str = ESCROW_ARTIFACT;
}

/// An unrelated contract the attacker deploys legitimately.
struct Forger;

impl ContractCode for Forger {
    const ARTIFACT: &'static str = "veil::forger";
}

#[test]
fn outside_code_cannot_overwrite_escrow_state() {
    let f = setup();
    f.deposit(wad(5_000, DECIMALS)).unwrap();
    let escrow = f.escrow().address();
    let key = NoteKey::new(escrow, escrow, "account");
    let before = f.node.view(|s| s.notes(&key).to_vec());

    // Same owner and operator, but a limit the owner never signed.
    let forged_account = EscrowAccount::new(
        f.deployer.address(),
        f.operator.address(),
        f.token.address(),
        f.owner_key.public_key(),
        Amount::MAX,
    );
    let recipient = f.node.view(|s| s.public_keys(&escrow)).unwrap();
    let forged = seal_value(&key, &recipient, &forged_account).unwrap();

    let result = f.node.transact("forge", |state| {
        state.scope::<ForgedEscrow>(escrow)?.replace_note(key.clone(), forged.clone())
    });
    assert_eq!(result, Err(NodeError::CodeMismatch { contract: escrow }));

    let forger = ContractInstance::new(
        Forger::ARTIFACT,
        f.operator.address(),
        &[],
        AccountSecret::random().derive_keys().public_keys(),
    );
    let forger_address = forger.address();
    f.node.deploy::<Forger>(forger).unwrap();
    let result = f.node.transact("forge", |state| {
        state
            .scope::<Forger>(forger_address)?
            .replace_note(key.clone(), forged.clone())
    });
    assert_eq!(
        result,
        Err(NodeError::ForeignState {
            executing: forger_address,
            target: escrow
        })
    );

    assert_eq!(f.node.view(|s| s.notes(&key).to_vec()), before);
    let ctx = f.deployer.context();
    assert_eq!(f.escrow().get_spend_limit(&ctx).unwrap(), wad(1_000, DECIMALS));

    let sig = f.sign_now(wad(2_000, DECIMALS), EscrowAction::Withdraw);
    assert_eq!(
        f.escrow()
            .withdraw_by_signature(&ctx, wad(2_000, DECIMALS), &sig)
            .unwrap_err(),
        EscrowError::InsufficientSpendLimit {
            requested: wad(2_000, DECIMALS),
            limit: wad(1_000, DECIMALS)
        }
    );
}

#[test]
fn escrow_artifact_cannot_be_redeployed_by_other_code() {
    let f = setup();
    let instance = ContractInstance::new(
        ESCROW_ARTIFACT,
        f.operator.address(),
        &[],
        AccountSecret::random().derive_keys().public_keys(),
    );
    assert_eq!(
        f.node.deploy::<ForgedEscrow>(instance),
        Err(NodeError::ArtifactClaimed {
            artifact: ESCROW_ARTIFACT.to_string()
        })
    );
}

#[test]
fn operator_with_escrow_keys_cannot_move_escrow_funds() {
    let f = setup();
    f.deposit(wad(3_000, DECIMALS)).unwrap();
    let escrow = f.escrow().address();
    let ctx = f.operator.context();

    // The operator shares the deployer's PXE, so the escrow's keys are in
    // reach. Being able to read the notes is not the same as being the
    // escrow.
    assert!(f.operator.pxe().has_account(&escrow));
    let err = f
        .token
        .transfer_private_to_private(
            &ctx,
            escrow,
            f.operator.address(),
            wad(3_000, DECIMALS),
            Fr::from(0u64),
            &[],
        )
        .unwrap_err();
    assert_eq!(err, TokenError::AuthorizationInvalid { from: escrow });

    assert_eq!(
        f.token.balance_of_private(&ctx, escrow).unwrap(),
        wad(3_000, DECIMALS)
    );
    assert_eq!(f.token_balance(&f.operator), 0);
    assert_eq!(f.escrow().get_balance(&ctx).unwrap(), wad(3_000, DECIMALS));
}

#[test]
fn deploy_requires_operator_public_keys() {
    let node = Arc::new(Node::default());
    let pxe = Arc::new(Pxe::new("deployer"));
    let deployer = Wallet::create(node.clone(), pxe).unwrap();
    let (token, _, _) =
        PrivateToken::deploy_with_minter(&deployer.context(), TokenMetadata::usdc()).unwrap();

    let nobody = Address::from_field(Fr::from(404u64));
    let err = CardEscrow::deploy(
        &deployer.context(),
        &token,
        nobody,
        SchnorrSecretKey::generate().public_key(),
        wad(1_000, DECIMALS),
    )
    .unwrap_err();
    assert_eq!(err, EscrowError::UnknownAccount { address: nobody });
}
