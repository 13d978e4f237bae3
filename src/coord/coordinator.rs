//! Coordinator - the join/race state machine
//!
//! A `Coordinator` mints single-use `CallbackToken`s, one per outstanding
//! operation, and folds their reported `(status, value)` pairs into one
//! aggregate outcome that is handed to the completion closure exactly once.
//!
//! All state lives in one `Rc<RefCell<..>>` cell shared by the coordinator
//! handle and every token, so a token stays valid after the caller dropped
//! its handle. Everything runs on one thread; user code (closures, hooks,
//! dropped values) only ever runs after the cell's borrow is released.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::core::config::CoordinatorConfig;
use crate::core::errors::{ConvergeError, Result};
use crate::coord::hooks::{CoordinatorHook, LoggingHook};
use crate::coord::types::{CoordinatorEvent, CoordinatorSnapshot, Outcome, PolicyKind};

type CompletionFn<S, V> = Box<dyn FnOnce(S, Outcome<V>)>;

enum Mode<S, V> {
    Join {
        results: Vec<Option<V>>,
    },
    Race {
        default: Option<(S, V)>,
    },
}

impl<S, V> Mode<S, V> {
    fn kind(&self) -> PolicyKind {
        match self {
            Mode::Join { .. } => PolicyKind::Join,
            Mode::Race { .. } => PolicyKind::Race,
        }
    }
}

struct State<S, V> {
    success_status: S,
    mode: Mode<S, V>,
    minted: usize,
    pending: usize,
    final_status: Option<S>,
    // Outcome decided but not yet delivered.
    ready: Option<Outcome<V>>,
    on_complete: Option<CompletionFn<S, V>>,
    finalize_registered: bool,
    finalized: bool,
    cancelled: bool,
}

/// Everything a transition wants to drop or run once the borrow is gone.
struct Deferred<S, V> {
    events: Vec<CoordinatorEvent>,
    fire: Option<(CompletionFn<S, V>, S, Outcome<V>)>,
    released: Released<S, V>,
}

impl<S, V> Deferred<S, V> {
    fn new() -> Self {
        Self {
            events: Vec::new(),
            fire: None,
            released: Released::default(),
        }
    }
}

/// Values taken out of the cell so their destructors run outside the borrow.
struct Released<S, V> {
    closure: Option<CompletionFn<S, V>>,
    results: Vec<Option<V>>,
    ready: Option<Outcome<V>>,
    default: Option<(S, V)>,
}

impl<S, V> Default for Released<S, V> {
    fn default() -> Self {
        Self {
            closure: None,
            results: Vec::new(),
            ready: None,
            default: None,
        }
    }
}

impl<S: Clone + PartialEq, V> State<S, V> {
    fn is_resolved(&self) -> bool {
        self.final_status.is_some()
    }

    fn is_settled(&self) -> bool {
        self.is_resolved() || self.finalized || self.cancelled
    }

    fn resolve(&mut self, status: S, outcome: Outcome<V>, deferred: &mut Deferred<S, V>) {
        let success = status == self.success_status;
        self.final_status = Some(status);
        self.ready = Some(outcome);
        deferred.events.push(CoordinatorEvent::Resolved { success });
    }

    /// Resolve from drained branches: every join slot filled, or every
    /// race branch lost. Also covers the zero-token case.
    fn settle_if_drained(&mut self, deferred: &mut Deferred<S, V>) {
        if self.is_resolved() || self.pending > 0 {
            return;
        }
        match &mut self.mode {
            Mode::Join { results } => {
                debug_assert!(results.iter().all(Option::is_some));
                let values: Vec<V> = std::mem::take(results).into_iter().flatten().collect();
                let status = self.success_status.clone();
                self.resolve(status, Outcome::All(values), deferred);
            }
            Mode::Race { default } => {
                if let Some((status, value)) = default.take() {
                    self.resolve(status, Outcome::First(value), deferred);
                }
            }
        }
    }

    fn take_fire(&mut self, deferred: &mut Deferred<S, V>) {
        if self.finalized || self.cancelled || self.on_complete.is_none() || self.ready.is_none() {
            return;
        }
        let Some(status) = self.final_status.clone() else {
            return;
        };
        let (Some(closure), Some(outcome)) = (self.on_complete.take(), self.ready.take()) else {
            return;
        };
        self.finalized = true;
        deferred.events.push(CoordinatorEvent::Fired);
        deferred.fire = Some((closure, status, outcome));
    }
}

struct Inner<S, V> {
    name: String,
    strict: bool,
    hooks: RefCell<Vec<Rc<dyn CoordinatorHook>>>,
    state: RefCell<State<S, V>>,
}

impl<S: Clone + PartialEq, V> Inner<S, V> {
    /// Drop released values, emit events, then run the completion closure.
    fn finish(&self, deferred: Deferred<S, V>) {
        let Deferred {
            events,
            fire,
            released,
        } = deferred;
        drop(released);

        if !events.is_empty() {
            let hooks = self.hooks.borrow().clone();
            for event in &events {
                for hook in &hooks {
                    hook.on_event(&self.name, event);
                }
            }
        }

        if let Some((closure, status, outcome)) = fire {
            closure(status, outcome);
        }
    }

    fn misuse(&self, err: &ConvergeError) {
        if self.strict {
            panic!("{}", err);
        }
        tracing::error!(coordinator = %self.name, error = %err, "precondition violated; call ignored");
    }

    fn invoke(&self, index: usize, status: S, value: V) {
        let mut deferred = Deferred::new();
        {
            let mut state = self.state.borrow_mut();
            if state.is_settled() {
                tracing::trace!(coordinator = %self.name, index, "callback after settlement ignored");
                deferred.events.push(CoordinatorEvent::Ignored { index });
            } else {
                let success = status == state.success_status;
                state.pending = state.pending.saturating_sub(1);
                deferred.events.push(CoordinatorEvent::Invoked {
                    index,
                    success,
                    pending: state.pending,
                });

                let state = &mut *state;
                match (&mut state.mode, success) {
                    (Mode::Join { results }, true) => {
                        if let Some(slot) = results.get_mut(index) {
                            *slot = Some(value);
                        }
                        state.settle_if_drained(&mut deferred);
                    }
                    (Mode::Join { results }, false) => {
                        deferred.released.results = std::mem::take(results);
                        state.resolve(status, Outcome::All(Vec::new()), &mut deferred);
                    }
                    (Mode::Race { default }, true) => {
                        deferred.released.default = default.take();
                        state.resolve(status, Outcome::First(value), &mut deferred);
                    }
                    (Mode::Race { .. }, false) => {
                        state.settle_if_drained(&mut deferred);
                    }
                }
                state.take_fire(&mut deferred);
            }
        }
        self.finish(deferred);
    }
}

/// Join/race combinator over single-shot callbacks.
///
/// `S` is the status type compared against the success sentinel, `V` the
/// value each branch reports. Cloning a `Coordinator` clones the handle,
/// not the state.
pub struct Coordinator<S, V> {
    inner: Rc<Inner<S, V>>,
}

impl<S, V> Clone for Coordinator<S, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S: Clone + PartialEq, V> Coordinator<S, V> {
    /// Wait for every branch; the first branch reporting anything other
    /// than `success_status` decides the outcome with empty results.
    pub fn join(success_status: S) -> Self {
        Self::build(
            success_status,
            Mode::Join {
                results: Vec::new(),
            },
            &CoordinatorConfig::default(),
        )
    }

    /// The first branch reporting `success_status` wins. If none does, the
    /// aggregate is `(default_status, default_value)` once all reported.
    pub fn race(success_status: S, default_status: S, default_value: V) -> Self {
        Self::build(
            success_status,
            Mode::Race {
                default: Some((default_status, default_value)),
            },
            &CoordinatorConfig::default(),
        )
    }

    pub fn join_with_config(success_status: S, config: &CoordinatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(success_status, Mode::Join { results: Vec::new() }, config))
    }

    pub fn race_with_config(
        success_status: S,
        default_status: S,
        default_value: V,
        config: &CoordinatorConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(
            success_status,
            Mode::Race {
                default: Some((default_status, default_value)),
            },
            config,
        ))
    }

    fn build(success_status: S, mode: Mode<S, V>, config: &CoordinatorConfig) -> Self {
        let mut hooks: Vec<Rc<dyn CoordinatorHook>> = Vec::new();
        if config.log_events {
            hooks.push(Rc::new(LoggingHook));
        }
        Self {
            inner: Rc::new(Inner {
                name: config.resolve_name(),
                strict: config.strict,
                hooks: RefCell::new(hooks),
                state: RefCell::new(State {
                    success_status,
                    mode,
                    minted: 0,
                    pending: 0,
                    final_status: None,
                    ready: None,
                    on_complete: None,
                    finalize_registered: false,
                    finalized: false,
                    cancelled: false,
                }),
            }),
        }
    }

    pub fn add_hook(&self, hook: Rc<dyn CoordinatorHook>) {
        self.inner.hooks.borrow_mut().push(hook);
    }

    /// Mint a token for one more outstanding branch.
    ///
    /// Minting after the outcome was decided is a programming error: with
    /// a strict config this panics, otherwise it is logged and the returned
    /// token is inert. Minting after `cancel` always returns an inert token.
    pub fn new_callback(&self) -> CallbackToken<S, V> {
        match self.try_new_callback() {
            Ok(token) => token,
            Err(err) => {
                if matches!(err, ConvergeError::AlreadyResolved { .. }) {
                    self.inner.misuse(&err);
                } else {
                    tracing::debug!(coordinator = %self.inner.name, "callback minted after cancel is inert");
                }
                let index = self.inner.state.borrow().minted;
                CallbackToken {
                    inner: Rc::clone(&self.inner),
                    index,
                }
            }
        }
    }

    /// Like `new_callback`, but reports misuse as an error.
    pub fn try_new_callback(&self) -> Result<CallbackToken<S, V>> {
        let index = {
            let mut state = self.inner.state.borrow_mut();
            if state.cancelled {
                return Err(ConvergeError::cancelled(self.inner.name.as_str()));
            }
            if state.is_resolved() || state.finalized {
                return Err(ConvergeError::already_resolved(self.inner.name.as_str()));
            }
            let index = state.minted;
            state.minted += 1;
            state.pending += 1;
            if let Mode::Join { results } = &mut state.mode {
                results.push(None);
            }
            index
        };

        let mut deferred = Deferred::new();
        deferred.events.push(CoordinatorEvent::Minted { index });
        self.inner.finish(deferred);

        Ok(CallbackToken {
            inner: Rc::clone(&self.inner),
            index,
        })
    }

    /// Register the completion closure.
    ///
    /// Runs it before returning if the outcome is already decided, including
    /// when no token was ever minted. Registering a second closure is a
    /// programming error handled per the config's `strict` flag; after
    /// `cancel` the closure is dropped without running.
    pub fn finalize<F>(&self, on_complete: F)
    where
        F: FnOnce(S, Outcome<V>) + 'static,
    {
        if let Err(err) = self.try_finalize(on_complete) {
            if matches!(err, ConvergeError::AlreadyFinalized { .. }) {
                self.inner.misuse(&err);
            }
        }
    }

    /// Like `finalize`, but reports a second registration or a prior cancel
    /// as an error. The rejected closure is dropped.
    pub fn try_finalize<F>(&self, on_complete: F) -> Result<()>
    where
        F: FnOnce(S, Outcome<V>) + 'static,
    {
        let mut deferred = Deferred::new();
        let result = {
            let mut state = self.inner.state.borrow_mut();
            if state.finalize_registered {
                deferred.released.closure = Some(Box::new(on_complete));
                Err(ConvergeError::already_finalized(self.inner.name.as_str()))
            } else if state.cancelled {
                state.finalize_registered = true;
                deferred.released.closure = Some(Box::new(on_complete));
                Err(ConvergeError::cancelled(self.inner.name.as_str()))
            } else {
                state.finalize_registered = true;
                state.on_complete = Some(Box::new(on_complete));
                state.settle_if_drained(&mut deferred);
                state.take_fire(&mut deferred);
                Ok(())
            }
        };
        self.inner.finish(deferred);
        result
    }

    /// Stop the completion closure from ever running.
    ///
    /// The pending closure and any values collected so far are dropped
    /// before this returns. Outstanding tokens become no-ops. No-op once
    /// the closure has fired or after a previous cancel.
    pub fn cancel(&self) {
        let mut deferred = Deferred::new();
        {
            let mut state = self.inner.state.borrow_mut();
            if state.finalized || state.cancelled {
                tracing::trace!(coordinator = %self.inner.name, "cancel after settlement ignored");
                return;
            }
            state.cancelled = true;
            deferred.released.closure = state.on_complete.take();
            deferred.released.ready = state.ready.take();
            match &mut state.mode {
                Mode::Join { results } => deferred.released.results = std::mem::take(results),
                Mode::Race { default } => deferred.released.default = default.take(),
            }
            deferred.events.push(CoordinatorEvent::Cancelled);
        }
        self.inner.finish(deferred);
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn policy(&self) -> PolicyKind {
        self.inner.state.borrow().mode.kind()
    }

    /// Tokens minted but not yet invoked
    pub fn pending(&self) -> usize {
        self.inner.state.borrow().pending
    }

    pub fn minted(&self) -> usize {
        self.inner.state.borrow().minted
    }

    /// The outcome has been decided, whether or not it was delivered yet
    pub fn is_resolved(&self) -> bool {
        self.inner.state.borrow().is_resolved()
    }

    /// The completion closure has run
    pub fn is_finalized(&self) -> bool {
        self.inner.state.borrow().finalized
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.state.borrow().cancelled
    }

    pub fn final_status(&self) -> Option<S> {
        self.inner.state.borrow().final_status.clone()
    }

    pub fn snapshot(&self) -> CoordinatorSnapshot {
        let state = self.inner.state.borrow();
        CoordinatorSnapshot {
            name: self.inner.name.clone(),
            policy: state.mode.kind(),
            minted: state.minted,
            pending: state.pending,
            resolved: state.is_resolved(),
            finalize_registered: state.finalize_registered,
            finalized: state.finalized,
            cancelled: state.cancelled,
        }
    }
}

impl<S, V> fmt::Debug for Coordinator<S, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("Coordinator");
        out.field("name", &self.inner.name);
        match self.inner.state.try_borrow() {
            Ok(state) => out
                .field("minted", &state.minted)
                .field("pending", &state.pending)
                .field("finalized", &state.finalized)
                .field("cancelled", &state.cancelled),
            Err(_) => out.field("state", &"<borrowed>"),
        };
        out.finish()
    }
}

/// Single-use handle for one outstanding branch.
///
/// Holds a share of the coordinator's state, so it may be invoked after
/// every `Coordinator` handle has been dropped.
#[must_use = "a branch never reports unless its token is invoked"]
pub struct CallbackToken<S, V> {
    inner: Rc<Inner<S, V>>,
    index: usize,
}

impl<S: Clone + PartialEq, V> CallbackToken<S, V> {
    /// Creation-order position of this branch
    pub fn index(&self) -> usize {
        self.index
    }

    /// Report this branch's outcome. No-op once the aggregate has resolved
    /// or the coordinator was cancelled.
    pub fn invoke(self, status: S, value: V) {
        self.inner.invoke(self.index, status, value);
    }

    /// Turn the token into a plain callback closure.
    pub fn into_callback(self) -> impl FnOnce(S, V) {
        move |status, value| self.invoke(status, value)
    }
}

impl<S, V> fmt::Debug for CallbackToken<S, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackToken")
            .field("coordinator", &self.inner.name)
            .field("index", &self.index)
            .finish()
    }
}
