/// End-to-end tests of the staking controller against the in-process sandbox
/// ledger and a few scripted collaborators.
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use anyhow::anyhow;
use async_trait::async_trait;
use tokio::sync::{oneshot, Notify};

use stake_console_core::display::BASE_PER_UNIT;
use stake_console_core::intent::{FN_CLAIM_REWARD, FN_STAKE, FN_UNSTAKE};
use stake_console_core::ledger::CallArg;
use stake_console_core::sandbox::Holdings;
use stake_console_core::{
    Account, ActionMode, Address, Command, ContractCall, ContractConfig, Edit, Level,
    LedgerWriter, LifecycleState, Network, NotificationLog, ReceiptStatus, SandboxLedger,
    Session, StakingController, StakingError, Submission, TransactionKind, TxHash,
};

const ONE: u128 = BASE_PER_UNIT;
const STAKING: Address = Address::new([0xaa; 20]);
const TOKEN: Address = Address::new([0xbb; 20]);
const USER: Address = Address::new([0x11; 20]);

fn contracts() -> ContractConfig {
    ContractConfig {
        network: Network::Localhost,
        staking_contract: Some(STAKING),
        reward_token: Some(TOKEN),
    }
}

async fn sandbox(holdings: Holdings) -> Arc<SandboxLedger> {
    let ledger = Arc::new(SandboxLedger::new(USER, STAKING, TOKEN).with_reward_rate(ONE / 10));
    ledger.set_holdings(USER, holdings).await;
    ledger
}

/// 2.5 available, 1.0 staked, 0.3 earned.
fn funded() -> Holdings {
    Holdings {
        native: ONE * 5 / 2,
        staked: ONE,
        earned: ONE * 3 / 10,
        reward_tokens: 0,
    }
}

async fn controller_with(
    ledger: Arc<SandboxLedger>,
    writer: Arc<dyn LedgerWriter>,
) -> (StakingController, Arc<NotificationLog>) {
    let session = Session::connect(Account::new(USER), contracts(), ledger.clone())
        .await
        .expect("session should connect");
    let log = Arc::new(NotificationLog::new());
    let controller = StakingController::new(session, writer, ledger, log.clone());
    (controller, log)
}

async fn controller(ledger: Arc<SandboxLedger>) -> (StakingController, Arc<NotificationLog>) {
    controller_with(ledger.clone(), ledger).await
}

/// Writer that records calls and holds each dispatch until released.
struct GatedWriter {
    calls: StdMutex<Vec<ContractCall>>,
    started: Notify,
    gate: tokio::sync::Mutex<Option<oneshot::Receiver<anyhow::Result<TxHash>>>>,
}

impl GatedWriter {
    fn new() -> (Arc<Self>, oneshot::Sender<anyhow::Result<TxHash>>) {
        let (tx, rx) = oneshot::channel();
        let writer = Arc::new(Self {
            calls: StdMutex::new(Vec::new()),
            started: Notify::new(),
            gate: tokio::sync::Mutex::new(Some(rx)),
        });
        (writer, tx)
    }

    fn calls(&self) -> Vec<ContractCall> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl LedgerWriter for GatedWriter {
    async fn write(&self, call: ContractCall) -> anyhow::Result<TxHash> {
        self.calls.lock().expect("calls lock").push(call);
        self.started.notify_one();
        let rx = self
            .gate
            .lock()
            .await
            .take()
            .ok_or_else(|| anyhow!("writer already used"))?;
        rx.await.map_err(|_| anyhow!("gate dropped"))?
    }
}

#[tokio::test]
async fn connect_fetches_all_balances() {
    let ledger = sandbox(funded()).await;
    let (controller, _) = controller(ledger.clone()).await;
    let balances = controller.balances().await;
    assert_eq!(balances.available, Some(ONE * 5 / 2));
    assert_eq!(balances.staked, Some(ONE));
    assert_eq!(balances.earned, Some(ONE * 3 / 10));
    assert_eq!(ledger.read_count(), 3);
}

#[tokio::test]
async fn connect_requires_staking_contract() {
    let ledger = sandbox(funded()).await;
    let config = ContractConfig {
        staking_contract: None,
        ..contracts()
    };
    let err = Session::connect(Account::new(USER), config, ledger)
        .await
        .err()
        .expect("connect should fail");
    assert!(matches!(err, StakingError::Config(_)));
}

#[tokio::test]
async fn clamp_then_mode_switch_resets() {
    let (controller, _) = controller(sandbox(funded()).await).await;

    assert_eq!(controller.set_amount("3").await, Edit::Clamped);
    assert_eq!(controller.amount().await, "2.5");

    controller.set_mode(ActionMode::Unstake).await;
    assert_eq!(controller.amount().await, "0");
    assert_eq!(controller.ceiling().await, ONE);

    assert_eq!(controller.set_amount("1.5").await, Edit::Clamped);
    assert_eq!(controller.amount().await, "1.0");
}

#[tokio::test]
async fn reselecting_the_same_mode_resets_amount() {
    let (controller, _) = controller(sandbox(funded()).await).await;
    assert_eq!(controller.mode().await, ActionMode::Stake);

    assert_eq!(controller.set_amount("1.2").await, Edit::Accepted);
    controller.set_mode(ActionMode::Stake).await;
    assert_eq!(controller.mode().await, ActionMode::Stake);
    assert_eq!(controller.amount().await, "0");
}

#[tokio::test]
async fn maxed_field_rejects_longer_text() {
    let (controller, _) = controller(sandbox(funded()).await).await;
    controller.set_max().await;
    controller.set_max().await;
    assert_eq!(controller.amount().await, "2.5");

    assert_eq!(controller.set_amount("2.55").await, Edit::Rejected);
    assert_eq!(controller.amount().await, "2.5");

    // Shorter text is a normal edit
    assert_eq!(controller.set_amount("2").await, Edit::Accepted);
    assert_eq!(controller.amount().await, "2");
}

#[tokio::test]
async fn malformed_text_is_ignored() {
    let (controller, _) = controller(sandbox(funded()).await).await;
    controller.set_amount("1.2").await;
    for raw in ["abc", "-1", "1e5", "1.2.3", " 1"] {
        assert_eq!(controller.set_amount(raw).await, Edit::Rejected, "{raw}");
    }
    assert_eq!(controller.amount().await, "1.2");
}

#[tokio::test]
async fn slider_follows_ceiling() {
    let (controller, _) = controller(sandbox(funded()).await).await;
    controller.set_slider_percent(50).await;
    assert_eq!(controller.amount().await, "1.25");
    controller.set_slider_percent(100).await;
    assert_eq!(controller.amount().await, "2.5");
}

#[tokio::test]
async fn stake_records_pending_and_sends_value() {
    let ledger = sandbox(funded()).await;
    let (writer, release) = GatedWriter::new();
    let (controller, _) = controller_with(ledger, writer.clone()).await;
    controller.set_amount("1.0").await;

    let hash = TxHash::new([7; 32]);
    let observe = async {
        writer.started.notified().await;
        let pending = controller.pending().await;
        release.send(Ok(hash)).expect("submit should be waiting");
        pending
    };
    let (outcome, pending) = tokio::join!(controller.submit(), observe);

    let pending = pending.expect("pending operation while dispatching");
    assert_eq!(pending.kind, TransactionKind::Stake);
    assert_eq!(pending.progress_label(), "STAKING...");

    assert_eq!(outcome.expect("submit should pass"), Submission::Dispatched(hash));
    let calls = writer.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].function, FN_STAKE);
    assert_eq!(calls[0].contract, STAKING);
    assert_eq!(calls[0].args, vec![CallArg::Uint(ONE)]);
    assert_eq!(calls[0].value, Some(ONE));

    // Cleared once dispatch settled; confirmation is tracked separately
    assert_eq!(controller.pending().await, None);
    assert_eq!(controller.lifecycle().await, LifecycleState::Submitted(hash));
}

#[tokio::test]
async fn progress_label_spans_dispatch_and_confirmation() {
    let ledger = sandbox(funded()).await;
    let (writer, release) = GatedWriter::new();
    let (controller, _) = controller_with(ledger, writer.clone()).await;
    assert_eq!(controller.progress_label().await, None);
    controller.set_amount("1").await;

    let hash = TxHash::new([5; 32]);
    let observe = async {
        writer.started.notified().await;
        let label = controller.progress_label().await;
        release.send(Ok(hash)).expect("submit should be waiting");
        label
    };
    let (outcome, during_dispatch) = tokio::join!(controller.submit(), observe);
    assert_eq!(outcome.expect("submit"), Submission::Dispatched(hash));
    assert_eq!(during_dispatch, Some("STAKING..."));

    // Dispatch settled, receipt still outstanding
    assert_eq!(controller.pending().await, None);
    assert_eq!(controller.progress_label().await, Some("STAKING..."));
    let status = Command::Status
        .execute(&controller, false)
        .await
        .expect("execute");
    assert!(status.contains("Pending:  STAKING..."), "{status}");

    controller.handle_receipt(hash, ReceiptStatus::Pending).await;
    assert_eq!(controller.progress_label().await, Some("STAKING..."));

    controller.handle_receipt(hash, ReceiptStatus::Success).await;
    assert_eq!(controller.progress_label().await, None);
}

#[tokio::test]
async fn claim_label_clears_after_follow() {
    let ledger = sandbox(funded()).await;
    let (controller, _) = controller(ledger).await;

    let tx = match controller.claim().await.expect("claim") {
        Submission::Dispatched(tx) => tx,
        Submission::Ignored => panic!("nothing was pending"),
    };
    assert_eq!(controller.progress_label().await, Some("CLAIMING..."));
    controller.follow(tx).await.expect("claim should confirm");
    assert_eq!(controller.progress_label().await, None);
}

#[tokio::test]
async fn second_submit_while_pending_is_dropped() {
    let ledger = sandbox(funded()).await;
    let (writer, release) = GatedWriter::new();
    let (controller, log) = controller_with(ledger, writer.clone()).await;
    controller.set_amount("1").await;

    let hash = TxHash::new([9; 32]);
    let second = async {
        writer.started.notified().await;
        let before = controller.pending().await;
        let again = controller.submit().await;
        let after = controller.pending().await;
        release.send(Ok(hash)).expect("first submit should be waiting");
        (before, again, after)
    };
    let (first, (before, again, after)) = tokio::join!(controller.submit(), second);

    assert_eq!(again.expect("guarded submit is not an error"), Submission::Ignored);
    assert_eq!(before, after);
    assert_eq!(first.expect("first submit"), Submission::Dispatched(hash));
    assert_eq!(writer.calls().len(), 1);
    assert!(log.snapshot().is_empty(), "double submission must stay silent");
}

#[tokio::test]
async fn zero_amount_is_rejected_before_dispatch() {
    let ledger = sandbox(funded()).await;
    let (controller, log) = controller(ledger.clone()).await;

    let err = controller.submit().await.expect_err("zero must be rejected");
    assert!(matches!(err, StakingError::InvalidAmount(_)));
    assert!(err.is_input_validation());
    assert_eq!(controller.pending().await, None);
    assert_eq!(controller.lifecycle().await, LifecycleState::Idle);
    assert_eq!(ledger.write_count(), 0);

    let notes = log.drain();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].level, Level::Error);
}

#[tokio::test]
async fn amount_above_refreshed_ceiling_is_rejected() {
    let ledger = sandbox(funded()).await;
    let (controller, _) = controller(ledger.clone()).await;
    controller.set_amount("2").await;

    // Balance drops underneath the already-entered amount
    ledger
        .set_holdings(USER, Holdings { native: ONE, ..funded() })
        .await;
    controller.refresh().await;

    let err = controller.submit().await.expect_err("over ceiling");
    assert!(matches!(err, StakingError::InsufficientBalance(_)));
    assert_eq!(ledger.write_count(), 0);
}

#[tokio::test]
async fn claim_confirmation_refreshes_once() {
    let ledger = sandbox(funded()).await;
    let (controller, log) = controller(ledger.clone()).await;

    let tx = match controller.claim().await.expect("claim should dispatch") {
        Submission::Dispatched(tx) => tx,
        Submission::Ignored => panic!("nothing was pending"),
    };
    let reads_before = ledger.read_count();

    let state = controller.handle_receipt(tx, ReceiptStatus::Success).await;
    assert_eq!(state, LifecycleState::Confirmed(tx));
    assert_eq!(ledger.read_count() - reads_before, 3);

    let notes = log.drain();
    assert_eq!(notes.iter().filter(|n| n.level == Level::Success).count(), 1);
    assert_eq!(controller.balances().await.earned, Some(0));

    // A repeated confirmation is inert
    controller.handle_receipt(tx, ReceiptStatus::Success).await;
    assert_eq!(ledger.read_count() - reads_before, 3);
    assert!(log.drain().is_empty());

    let tokens = controller
        .reward_token_balance()
        .await
        .expect("reward token read");
    assert_eq!(tokens, Some(ONE * 3 / 10));
}

#[tokio::test]
async fn claim_sends_no_arguments() {
    let ledger = sandbox(funded()).await;
    let (writer, release) = GatedWriter::new();
    let (controller, _) = controller_with(ledger, writer.clone()).await;
    release
        .send(Ok(TxHash::new([1; 32])))
        .expect("receiver alive");
    controller.claim().await.expect("claim");
    let calls = writer.calls();
    assert_eq!(calls[0].function, FN_CLAIM_REWARD);
    assert!(calls[0].args.is_empty());
    assert_eq!(calls[0].value, None);
}

#[tokio::test]
async fn nothing_to_claim() {
    let ledger = sandbox(Holdings {
        earned: 0,
        ..funded()
    })
    .await;
    let (controller, log) = controller(ledger.clone()).await;
    let err = controller.claim().await.expect_err("nothing earned");
    assert!(matches!(err, StakingError::InvalidState(_)));
    assert_eq!(ledger.write_count(), 0);
    assert_eq!(log.drain().len(), 1);
}

#[tokio::test]
async fn follow_stake_to_confirmation() {
    let ledger = sandbox(funded()).await;
    let (controller, log) = controller(ledger.clone()).await;
    controller.set_amount("1.5").await;

    let tx = match controller.submit().await.expect("stake") {
        Submission::Dispatched(tx) => tx,
        Submission::Ignored => panic!("unexpected ignore"),
    };
    let state = controller.follow(tx).await.expect("stake should confirm");
    assert_eq!(state, LifecycleState::Confirmed(tx));

    let balances = controller.balances().await;
    assert_eq!(balances.available, Some(ONE));
    assert_eq!(balances.staked, Some(ONE * 5 / 2));

    let levels: Vec<Level> = log.drain().into_iter().map(|n| n.level).collect();
    assert_eq!(levels, vec![Level::Info, Level::Success]);
}

#[tokio::test]
async fn unstake_sends_amount_without_value() {
    let ledger = sandbox(funded()).await;
    let (writer, release) = GatedWriter::new();
    let (controller, _) = controller_with(ledger, writer.clone()).await;
    controller.set_mode(ActionMode::Unstake).await;
    controller.set_amount("0.5").await;
    release
        .send(Ok(TxHash::new([2; 32])))
        .expect("receiver alive");
    controller.submit().await.expect("unstake");
    let calls = writer.calls();
    assert_eq!(calls[0].function, FN_UNSTAKE);
    assert_eq!(calls[0].args, vec![CallArg::Uint(ONE / 2)]);
    assert_eq!(calls[0].value, None);
}

#[tokio::test]
async fn rejected_signature_clears_pending() {
    let ledger = sandbox(funded()).await;
    let (controller, log) = controller(ledger.clone()).await;
    controller.set_amount("1").await;
    ledger.reject_next_signature();

    let err = controller.submit().await.expect_err("wallet declined");
    assert!(matches!(err, StakingError::DispatchRejected(_)));
    assert_eq!(controller.pending().await, None);
    assert_eq!(controller.lifecycle().await, LifecycleState::Idle);

    let notes = log.drain();
    assert_eq!(notes.len(), 1);
    assert!(notes[0].message.contains("rejected"));

    // The user can retry immediately
    assert!(matches!(
        controller.submit().await,
        Ok(Submission::Dispatched(_))
    ));
}

#[tokio::test]
async fn failed_transaction_skips_refresh() {
    let ledger = sandbox(funded()).await;
    let (controller, log) = controller(ledger.clone()).await;
    controller.set_amount("1").await;
    ledger.fail_next_transaction();

    let tx = match controller.submit().await.expect("dispatch") {
        Submission::Dispatched(tx) => tx,
        Submission::Ignored => panic!("unexpected ignore"),
    };
    let reads_before = ledger.read_count();
    let err = controller.follow(tx).await.expect_err("should fail");
    assert!(matches!(err, StakingError::TransactionFailed(_)));
    assert_eq!(controller.lifecycle().await, LifecycleState::Failed(tx));
    assert_eq!(ledger.read_count(), reads_before);

    let levels: Vec<Level> = log.drain().into_iter().map(|n| n.level).collect();
    assert_eq!(levels, vec![Level::Info, Level::Error]);
}

#[tokio::test]
async fn superseded_receipts_are_ignored() {
    let ledger = sandbox(funded()).await;
    let (controller, log) = controller(ledger.clone()).await;
    controller.set_amount("0.5").await;

    let first = match controller.submit().await.expect("first") {
        Submission::Dispatched(tx) => tx,
        Submission::Ignored => panic!("unexpected ignore"),
    };
    let second = match controller.submit().await.expect("second") {
        Submission::Dispatched(tx) => tx,
        Submission::Ignored => panic!("nothing pending after dispatch settled"),
    };
    assert_ne!(first, second);

    let reads_before = ledger.read_count();
    let state = controller.handle_receipt(first, ReceiptStatus::Success).await;
    assert_eq!(state, LifecycleState::Submitted(second));
    assert_eq!(ledger.read_count(), reads_before);
    assert!(log.drain().is_empty());
}

#[tokio::test]
async fn following_a_replaced_transaction_reports_current_state() {
    let ledger = sandbox(funded()).await;
    let (controller, log) = controller(ledger.clone()).await;
    controller.set_amount("0.5").await;
    ledger.fail_next_transaction();

    let first = match controller.submit().await.expect("first") {
        Submission::Dispatched(tx) => tx,
        Submission::Ignored => panic!("unexpected ignore"),
    };
    let second = match controller.submit().await.expect("second") {
        Submission::Dispatched(tx) => tx,
        Submission::Ignored => panic!("nothing pending after dispatch settled"),
    };

    let reads_before = ledger.read_count();
    let state = controller
        .follow(first)
        .await
        .expect("a replaced transaction is not a failure");
    assert_eq!(state, LifecycleState::Submitted(second));
    assert_eq!(controller.lifecycle().await, LifecycleState::Submitted(second));
    assert_eq!(ledger.read_count(), reads_before);
    assert!(log.drain().is_empty());

    // The tracked one still runs to completion
    let state = controller.follow(second).await.expect("second confirms");
    assert_eq!(state, LifecycleState::Confirmed(second));
    let levels: Vec<Level> = log.drain().into_iter().map(|n| n.level).collect();
    assert_eq!(levels, vec![Level::Info, Level::Success]);
}

#[tokio::test]
async fn json_submit_separates_invalid_from_rejected() {
    let ledger = sandbox(funded()).await;
    let (controller, _) = controller(ledger.clone()).await;

    let out = Command::Submit
        .execute(&controller, true)
        .await
        .expect("execute");
    let v: serde_json::Value = serde_json::from_str(&out).expect("json");
    assert_eq!(v["status"], "invalid");

    controller.set_amount("1").await;
    ledger.reject_next_signature();
    let out = Command::Submit
        .execute(&controller, true)
        .await
        .expect("execute");
    let v: serde_json::Value = serde_json::from_str(&out).expect("json");
    assert_eq!(v["status"], "rejected");
    assert_eq!(ledger.write_count(), 1);
}

#[tokio::test]
async fn read_failure_keeps_cached_values() {
    let ledger = sandbox(funded()).await;
    let (controller, log) = controller(ledger.clone()).await;
    let before = controller.balances().await;

    ledger.set_reads_failing(true);
    ledger.set_holdings(USER, Holdings::default()).await;
    let after = controller.refresh().await;
    assert_eq!(after, before);
    assert!(log.drain().is_empty(), "read failures are not surfaced");

    ledger.set_reads_failing(false);
    assert_eq!(controller.refresh().await.available, Some(0));
}

#[tokio::test]
async fn disconnect_returns_account() {
    let (controller, _) = controller(sandbox(funded()).await).await;
    assert_eq!(controller.disconnect().address, USER);
}

#[tokio::test]
async fn commands_drive_the_form() {
    let ledger = sandbox(funded()).await;
    let (controller, log) = controller(ledger).await;

    let out = Command::parse("amount 3")
        .expect("parse")
        .execute(&controller, false)
        .await
        .expect("execute");
    assert_eq!(out, "Amount: 2.5 (clamped to max)");

    let out = Command::parse("unstake")
        .expect("parse")
        .execute(&controller, false)
        .await
        .expect("execute");
    assert!(out.starts_with("Mode: unstake"));
    assert_eq!(controller.amount().await, "0");

    // Failure text goes through notifications only
    let out = Command::Submit
        .execute(&controller, false)
        .await
        .expect("execute");
    assert!(out.is_empty());
    assert_eq!(log.drain().len(), 1);

    let out = Command::Balance
        .execute(&controller, true)
        .await
        .expect("execute");
    let v: serde_json::Value = serde_json::from_str(&out).expect("json");
    assert_eq!(v["staked"]["display"], "1.0");
    assert_eq!(v["reward_tokens"]["base_units"], "0");

    let out = Command::Status
        .execute(&controller, true)
        .await
        .expect("execute");
    let v: serde_json::Value = serde_json::from_str(&out).expect("json");
    assert_eq!(v["mode"], "unstake");
    assert_eq!(v["chain_id"], 31337);
    assert!(v["pending"].is_null());
}
