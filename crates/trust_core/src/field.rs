//! Debounced verification field controller.
//!
//! Drives the classifier from interactive input: debounces keystrokes,
//! skips redundant re-verification of an unchanged value, and guards
//! against a slow in-flight classification for an older value overwriting
//! the result of a newer one. Results are applied only if the email they
//! were computed for still equals the field's current value.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Duration, Instant};
use tracing::debug;

use crate::classifier::Classify;
use crate::EmailClassification;

/// Lifecycle of a single verification field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldState {
    /// No interaction yet (or the field was cleared).
    Idle,
    /// Input received; the debounce timer is running.
    Pending,
    /// Debounce elapsed; classification in flight.
    Verifying,
    /// Classification complete for the current value.
    Resolved,
}

/// Snapshot of the field for rendering.
#[derive(Debug, Clone)]
pub struct FieldView {
    pub state: FieldState,
    pub value: String,
    pub classification: Option<EmailClassification>,
}

enum Msg {
    Input(String),
    Settled {
        email: String,
        classification: EmailClassification,
    },
}

/// Controller bound to one email input. Dropping it cancels the pending
/// debounce timer and stops the driver task.
pub struct VerificationField {
    tx: mpsc::UnboundedSender<Msg>,
    view: Arc<Mutex<FieldView>>,
    validity: watch::Receiver<bool>,
    task: tokio::task::JoinHandle<()>,
}

impl VerificationField {
    /// Spawn the driver task for a field with the given debounce delay.
    pub fn spawn(classifier: Arc<dyn Classify>, debounce: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (validity_tx, validity_rx) = watch::channel(false);
        let view = Arc::new(Mutex::new(FieldView {
            state: FieldState::Idle,
            value: String::new(),
            classification: None,
        }));

        let task = tokio::spawn(drive(
            classifier,
            debounce,
            rx,
            tx.clone(),
            view.clone(),
            validity_tx,
        ));

        Self {
            tx,
            view,
            validity: validity_rx,
            task,
        }
    }

    /// Record an edit to the field. Any displayed result is invalidated
    /// immediately and the debounce timer restarts; clearing the field
    /// returns it to idle.
    pub fn set_input(&self, value: &str) {
        let _ = self.tx.send(Msg::Input(value.to_string()));
    }

    /// Current upward validity signal.
    pub fn is_valid(&self) -> bool {
        *self.validity.borrow()
    }

    /// Watchable validity signal for callers that gate submission on it.
    pub fn validity_signal(&self) -> watch::Receiver<bool> {
        self.validity.clone()
    }

    pub fn view(&self) -> FieldView {
        self.view
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn state(&self) -> FieldState {
        self.view().state
    }
}

impl Drop for VerificationField {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn drive(
    classifier: Arc<dyn Classify>,
    debounce: Duration,
    mut rx: mpsc::UnboundedReceiver<Msg>,
    loopback: mpsc::UnboundedSender<Msg>,
    view: Arc<Mutex<FieldView>>,
    validity: watch::Sender<bool>,
) {
    let mut deadline: Option<Instant> = None;
    let mut last_verified: Option<String> = None;

    loop {
        let current_deadline = deadline;
        let timer = async move {
            match current_deadline {
                Some(at) => sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            msg = rx.recv() => {
                let Some(msg) = msg else { break };
                match msg {
                    Msg::Input(value) => {
                        let mut v = view.lock().unwrap_or_else(PoisonError::into_inner);

                        // Not an edit: identical input (focus churn, repeated
                        // paste) must not invalidate a result or restart the
                        // timer.
                        if value == v.value {
                            debug!("Ignoring non-edit input of unchanged value");
                            continue;
                        }

                        v.classification = None;
                        v.value = value.clone();
                        let _ = validity.send(false);

                        if value.trim().is_empty() {
                            v.state = FieldState::Idle;
                            deadline = None;
                        } else {
                            v.state = FieldState::Pending;
                            deadline = Some(Instant::now() + debounce);
                        }
                    }
                    Msg::Settled { email, classification } => {
                        let mut v = view.lock().unwrap_or_else(PoisonError::into_inner);
                        if v.value == email {
                            v.state = FieldState::Resolved;
                            let _ = validity.send(classification.is_valid);
                            v.classification = Some(classification);
                        } else {
                            // A slow classification for an older value must
                            // not overwrite the newer state.
                            debug!(
                                "Discarding stale classification for '{}' (current value '{}')",
                                email, v.value
                            );
                        }
                    }
                }
            }
            _ = timer => {
                deadline = None;

                let (value, state) = {
                    let v = view.lock().unwrap_or_else(PoisonError::into_inner);
                    (v.value.clone(), v.state)
                };

                if value.trim().is_empty() {
                    continue;
                }

                // Suppress redundant work for a value that is already being
                // (or has been) verified.
                let redundant = last_verified.as_deref() == Some(value.as_str())
                    && matches!(state, FieldState::Verifying | FieldState::Resolved);
                if redundant {
                    debug!("Skipping re-verification of unchanged value '{}'", value);
                    continue;
                }

                last_verified = Some(value.clone());
                {
                    let mut v = view.lock().unwrap_or_else(PoisonError::into_inner);
                    v.state = FieldState::Verifying;
                }

                let classifier = classifier.clone();
                let loopback = loopback.clone();
                tokio::spawn(async move {
                    let classification = classifier.classify(&value).await;
                    let _ = loopback.send(Msg::Settled {
                        email: value,
                        classification,
                    });
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClassificationSource, STATUS_ACCEPTED, STATUS_DISPOSABLE};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted classifier: verdict and latency keyed by domain.
    struct ScriptedClassifier {
        calls: AtomicUsize,
    }

    impl ScriptedClassifier {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Classify for ScriptedClassifier {
        async fn classify(&self, email: &str) -> EmailClassification {
            self.calls.fetch_add(1, Ordering::SeqCst);

            // The first scenario's "slow" address takes far longer than the
            // fast one, so a stale result can arrive after a fresh one.
            let (delay_ms, is_valid, status) = if email.ends_with("@disposable.example") {
                (5_000, false, STATUS_DISPOSABLE)
            } else {
                (10, true, STATUS_ACCEPTED)
            };
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;

            EmailClassification {
                email: email.to_string(),
                domain: email.split('@').next_back().unwrap_or_default().to_string(),
                is_valid,
                is_disposable: !is_valid,
                is_personal: false,
                status,
                message: String::new(),
                source: ClassificationSource::Local,
            }
        }
    }

    async fn settle(field: &VerificationField) {
        for _ in 0..1_000 {
            if field.state() == FieldState::Resolved {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("field never resolved: {:?}", field.view());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_until_input() {
        let field = VerificationField::spawn(
            Arc::new(ScriptedClassifier::new()),
            Duration::from_millis(500),
        );
        assert_eq!(field.state(), FieldState::Idle);
        assert!(!field.is_valid());
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_then_resolve() {
        let field = VerificationField::spawn(
            Arc::new(ScriptedClassifier::new()),
            Duration::from_millis(500),
        );

        field.set_input("coordinator@trusted.example");
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(field.state(), FieldState::Pending);
        assert!(!field.is_valid());

        settle(&field).await;
        assert!(field.is_valid());
        let view = field.view();
        assert_eq!(
            view.classification.unwrap().email,
            "coordinator@trusted.example"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_edit_restarts_debounce() {
        let classifier = Arc::new(ScriptedClassifier::new());
        let field = VerificationField::spawn(classifier.clone(), Duration::from_millis(500));

        // Keystrokes 200ms apart never let the timer elapse.
        for partial in ["c", "co", "coo", "coor"] {
            field.set_input(partial);
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);

        field.set_input("coordinator@trusted.example");
        settle(&field).await;
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_result_discarded() {
        let field = VerificationField::spawn(
            Arc::new(ScriptedClassifier::new()),
            Duration::from_millis(500),
        );

        // The slow classification for the first value is still in flight
        // when the user switches to the second value.
        field.set_input("a@disposable.example");
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(field.state(), FieldState::Verifying);

        field.set_input("b@trusted.example");
        settle(&field).await;
        assert!(field.is_valid());

        // Let the slow classification land; it must be discarded.
        tokio::time::sleep(Duration::from_secs(10)).await;
        let view = field.view();
        assert!(field.is_valid());
        assert_eq!(
            view.classification.unwrap().email,
            "b@trusted.example"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_invalidates_previous_result() {
        let field = VerificationField::spawn(
            Arc::new(ScriptedClassifier::new()),
            Duration::from_millis(500),
        );

        field.set_input("coordinator@trusted.example");
        settle(&field).await;
        assert!(field.is_valid());

        field.set_input("coordinator@trusted.examplx");
        tokio::time::sleep(Duration::from_millis(50)).await;
        let view = field.view();
        assert_eq!(view.state, FieldState::Pending);
        assert!(view.classification.is_none());
        assert!(!field.is_valid());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clearing_returns_to_idle() {
        let field = VerificationField::spawn(
            Arc::new(ScriptedClassifier::new()),
            Duration::from_millis(500),
        );

        field.set_input("coordinator@trusted.example");
        settle(&field).await;

        field.set_input("");
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(field.state(), FieldState::Idle);
        assert!(!field.is_valid());

        // No classification fires for the cleared field.
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(field.state(), FieldState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_redundant_verification_suppressed() {
        let classifier = Arc::new(ScriptedClassifier::new());
        let field = VerificationField::spawn(classifier.clone(), Duration::from_millis(500));

        field.set_input("coordinator@trusted.example");
        settle(&field).await;
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);

        // Same value again is not an edit: no invalidation, no second
        // classification.
        field.set_input("coordinator@trusted.example");
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_validity_signal_tracks_result() {
        let field = VerificationField::spawn(
            Arc::new(ScriptedClassifier::new()),
            Duration::from_millis(500),
        );
        let mut signal = field.validity_signal();
        assert!(!*signal.borrow());

        field.set_input("coordinator@trusted.example");
        settle(&field).await;
        signal.changed().await.unwrap();
        assert!(*signal.borrow());
    }
}
