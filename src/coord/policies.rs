//! Typed façades over `Coordinator`
//!
//! Each wrapper fixes the policy and reshapes the completion closure so
//! callers never match on `Outcome` themselves.

use std::rc::Rc;

use crate::core::config::CoordinatorConfig;
use crate::core::errors::Result;
use crate::coord::completion::{channel, Completion};
use crate::coord::coordinator::{CallbackToken, Coordinator};
use crate::coord::hooks::CoordinatorHook;
use crate::coord::types::{CoordinatorSnapshot, Outcome};

/// Methods every wrapper forwards unchanged to its coordinator.
macro_rules! delegate_coordinator {
    ($s:ty, $v:ty) => {
        /// Stop the completion from ever running; see `Coordinator::cancel`.
        pub fn cancel(&self) {
            self.inner.cancel()
        }

        pub fn pending(&self) -> usize {
            self.inner.pending()
        }

        pub fn is_finalized(&self) -> bool {
            self.inner.is_finalized()
        }

        pub fn is_cancelled(&self) -> bool {
            self.inner.is_cancelled()
        }

        pub fn name(&self) -> &str {
            self.inner.name()
        }

        pub fn add_hook(&self, hook: Rc<dyn CoordinatorHook>) {
            self.inner.add_hook(hook)
        }

        pub fn snapshot(&self) -> CoordinatorSnapshot {
            self.inner.snapshot()
        }

        pub fn coordinator(&self) -> &Coordinator<$s, $v> {
            &self.inner
        }

        pub fn into_inner(self) -> Coordinator<$s, $v> {
            self.inner
        }
    };
}

/// Wait for all branches, collecting one value per branch in creation order.
#[derive(Debug, Clone)]
pub struct Join<S, V> {
    inner: Coordinator<S, V>,
}

impl<S: Clone + PartialEq + 'static, V: 'static> Join<S, V> {
    pub fn new(success_status: S) -> Self {
        Self {
            inner: Coordinator::join(success_status),
        }
    }

    pub fn with_config(success_status: S, config: &CoordinatorConfig) -> Result<Self> {
        Ok(Self {
            inner: Coordinator::join_with_config(success_status, config)?,
        })
    }

    pub fn new_callback(&self) -> CallbackToken<S, V> {
        self.inner.new_callback()
    }

    pub fn try_new_callback(&self) -> Result<CallbackToken<S, V>> {
        self.inner.try_new_callback()
    }

    pub fn finalize<F>(&self, on_complete: F)
    where
        F: FnOnce(S, Vec<V>) + 'static,
    {
        self.inner
            .finalize(move |status, outcome| on_complete(status, outcome.into_values()))
    }

    pub fn try_finalize<F>(&self, on_complete: F) -> Result<()>
    where
        F: FnOnce(S, Vec<V>) + 'static,
    {
        self.inner
            .try_finalize(move |status, outcome| on_complete(status, outcome.into_values()))
    }

    pub fn completion(&self) -> Result<Completion<(S, Vec<V>)>> {
        let (tx, completion) = channel(self.name());
        self.try_finalize(move |status, values| {
            let _ = tx.send((status, values));
        })?;
        Ok(completion)
    }

    delegate_coordinator!(S, V);
}

/// Join whose branches each report a batch; batches are concatenated in
/// creation order.
#[derive(Debug, Clone)]
pub struct FlattenJoin<S, T> {
    inner: Coordinator<S, Vec<T>>,
}

impl<S: Clone + PartialEq + 'static, T: 'static> FlattenJoin<S, T> {
    pub fn new(success_status: S) -> Self {
        Self {
            inner: Coordinator::join(success_status),
        }
    }

    pub fn with_config(success_status: S, config: &CoordinatorConfig) -> Result<Self> {
        Ok(Self {
            inner: Coordinator::join_with_config(success_status, config)?,
        })
    }

    pub fn new_callback(&self) -> CallbackToken<S, Vec<T>> {
        self.inner.new_callback()
    }

    pub fn try_new_callback(&self) -> Result<CallbackToken<S, Vec<T>>> {
        self.inner.try_new_callback()
    }

    pub fn finalize<F>(&self, on_complete: F)
    where
        F: FnOnce(S, Vec<T>) + 'static,
    {
        self.inner
            .finalize(move |status, outcome| on_complete(status, flatten(outcome)))
    }

    pub fn try_finalize<F>(&self, on_complete: F) -> Result<()>
    where
        F: FnOnce(S, Vec<T>) + 'static,
    {
        self.inner
            .try_finalize(move |status, outcome| on_complete(status, flatten(outcome)))
    }

    pub fn completion(&self) -> Result<Completion<(S, Vec<T>)>> {
        let (tx, completion) = channel(self.name());
        self.try_finalize(move |status, values| {
            let _ = tx.send((status, values));
        })?;
        Ok(completion)
    }

    delegate_coordinator!(S, Vec<T>);
}

fn flatten<T>(outcome: Outcome<Vec<T>>) -> Vec<T> {
    outcome.into_values().into_iter().flatten().collect()
}

/// Join over branches that only report a status.
#[derive(Debug, Clone)]
pub struct StatusJoin<S> {
    inner: Coordinator<S, ()>,
}

/// Token for a `StatusJoin` branch
#[derive(Debug)]
#[must_use = "a branch never reports unless its token is invoked"]
pub struct StatusToken<S> {
    inner: CallbackToken<S, ()>,
}

impl<S: Clone + PartialEq> StatusToken<S> {
    pub fn index(&self) -> usize {
        self.inner.index()
    }

    pub fn invoke(self, status: S) {
        self.inner.invoke(status, ())
    }

    pub fn into_callback(self) -> impl FnOnce(S) {
        move |status| self.invoke(status)
    }
}

impl<S: Clone + PartialEq + 'static> StatusJoin<S> {
    pub fn new(success_status: S) -> Self {
        Self {
            inner: Coordinator::join(success_status),
        }
    }

    pub fn with_config(success_status: S, config: &CoordinatorConfig) -> Result<Self> {
        Ok(Self {
            inner: Coordinator::join_with_config(success_status, config)?,
        })
    }

    pub fn new_callback(&self) -> StatusToken<S> {
        StatusToken {
            inner: self.inner.new_callback(),
        }
    }

    pub fn try_new_callback(&self) -> Result<StatusToken<S>> {
        Ok(StatusToken {
            inner: self.inner.try_new_callback()?,
        })
    }

    pub fn finalize<F>(&self, on_complete: F)
    where
        F: FnOnce(S) + 'static,
    {
        self.inner.finalize(move |status, _| on_complete(status))
    }

    pub fn try_finalize<F>(&self, on_complete: F) -> Result<()>
    where
        F: FnOnce(S) + 'static,
    {
        self.inner.try_finalize(move |status, _| on_complete(status))
    }

    pub fn completion(&self) -> Result<Completion<S>> {
        let (tx, completion) = channel(self.name());
        self.try_finalize(move |status| {
            let _ = tx.send(status);
        })?;
        Ok(completion)
    }

    delegate_coordinator!(S, ());
}

/// Join over branches that only signal "done". It cannot fail.
#[derive(Debug, Clone)]
pub struct CompletionJoin {
    inner: Coordinator<(), ()>,
}

/// Token for a `CompletionJoin` branch
#[derive(Debug)]
#[must_use = "a branch never reports unless its token is invoked"]
pub struct CompletionToken {
    inner: CallbackToken<(), ()>,
}

impl CompletionToken {
    pub fn index(&self) -> usize {
        self.inner.index()
    }

    pub fn done(self) {
        self.inner.invoke((), ())
    }

    pub fn into_callback(self) -> impl FnOnce() {
        move || self.done()
    }
}

impl Default for CompletionJoin {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionJoin {
    pub fn new() -> Self {
        Self {
            inner: Coordinator::join(()),
        }
    }

    pub fn with_config(config: &CoordinatorConfig) -> Result<Self> {
        Ok(Self {
            inner: Coordinator::join_with_config((), config)?,
        })
    }

    pub fn new_callback(&self) -> CompletionToken {
        CompletionToken {
            inner: self.inner.new_callback(),
        }
    }

    pub fn try_new_callback(&self) -> Result<CompletionToken> {
        Ok(CompletionToken {
            inner: self.inner.try_new_callback()?,
        })
    }

    pub fn finalize<F>(&self, on_complete: F)
    where
        F: FnOnce() + 'static,
    {
        self.inner.finalize(move |_, _| on_complete())
    }

    pub fn try_finalize<F>(&self, on_complete: F) -> Result<()>
    where
        F: FnOnce() + 'static,
    {
        self.inner.try_finalize(move |_, _| on_complete())
    }

    pub fn completion(&self) -> Result<Completion<()>> {
        let (tx, completion) = channel(self.name());
        self.try_finalize(move || {
            let _ = tx.send(());
        })?;
        Ok(completion)
    }

    delegate_coordinator!((), ());
}

/// First success wins; otherwise the default once every branch reported.
#[derive(Debug, Clone)]
pub struct Race<S, V> {
    inner: Coordinator<S, V>,
}

impl<S: Clone + PartialEq + 'static, V: 'static> Race<S, V> {
    pub fn new(success_status: S, default_status: S, default_value: V) -> Self {
        Self {
            inner: Coordinator::race(success_status, default_status, default_value),
        }
    }

    pub fn with_config(
        success_status: S,
        default_status: S,
        default_value: V,
        config: &CoordinatorConfig,
    ) -> Result<Self> {
        Ok(Self {
            inner: Coordinator::race_with_config(
                success_status,
                default_status,
                default_value,
                config,
            )?,
        })
    }

    pub fn new_callback(&self) -> CallbackToken<S, V> {
        self.inner.new_callback()
    }

    pub fn try_new_callback(&self) -> Result<CallbackToken<S, V>> {
        self.inner.try_new_callback()
    }

    pub fn finalize<F>(&self, on_complete: F)
    where
        F: FnOnce(S, V) + 'static,
    {
        self.inner.finalize(move |status, outcome| {
            if let Some(value) = outcome.into_first() {
                on_complete(status, value)
            }
        })
    }

    pub fn try_finalize<F>(&self, on_complete: F) -> Result<()>
    where
        F: FnOnce(S, V) + 'static,
    {
        self.inner.try_finalize(move |status, outcome| {
            if let Some(value) = outcome.into_first() {
                on_complete(status, value)
            }
        })
    }

    pub fn completion(&self) -> Result<Completion<(S, V)>> {
        let (tx, completion) = channel(self.name());
        self.try_finalize(move |status, value| {
            let _ = tx.send((status, value));
        })?;
        Ok(completion)
    }

    delegate_coordinator!(S, V);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    #[test]
    fn test_join_wrapper_collects_values() {
        let join = Join::<&'static str, u32>::new("ok");
        let seen = Rc::new(RefCell::new(None));
        let sink = seen.clone();
        join.finalize(move |status, values| *sink.borrow_mut() = Some((status, values)));

        let a = join.new_callback();
        let b = join.new_callback();
        b.invoke("ok", 20);
        assert_eq!(join.pending(), 1);
        a.invoke("ok", 10);

        assert_eq!(*seen.borrow(), Some(("ok", vec![10, 20])));
        assert!(join.is_finalized());
    }

    #[test]
    fn test_flatten_join_concatenates_in_creation_order() {
        let join = FlattenJoin::<bool, char>::new(true);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();

        let first = join.new_callback();
        let second = join.new_callback();
        let third = join.new_callback();
        join.finalize(move |_, values| *sink.borrow_mut() = values);

        third.invoke(true, vec!['e']);
        first.invoke(true, vec!['a', 'b']);
        second.invoke(true, vec![]);

        assert_eq!(*seen.borrow(), vec!['a', 'b', 'e']);
    }

    #[test]
    fn test_status_join_reports_first_failure() {
        let join = StatusJoin::<i32>::new(0);
        let seen = Rc::new(Cell::new(None));
        let sink = seen.clone();
        join.finalize(move |status| sink.set(Some(status)));

        let a = join.new_callback();
        let b = join.new_callback();
        assert_eq!(b.index(), 1);
        b.invoke(-5);
        a.invoke(-9);

        assert_eq!(seen.get(), Some(-5));
    }

    #[test]
    fn test_completion_join_fires_after_all_done() {
        let join = CompletionJoin::new();
        let fired = Rc::new(Cell::new(0));
        let counter = fired.clone();

        let callbacks: Vec<_> = (0..3).map(|_| join.new_callback().into_callback()).collect();
        join.finalize(move || counter.set(counter.get() + 1));

        for callback in callbacks {
            assert_eq!(fired.get(), 0);
            callback();
        }
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_completion_join_empty() {
        let join = CompletionJoin::default();
        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();
        join.finalize(move || flag.set(true));
        assert!(fired.get());
    }

    #[test]
    fn test_race_wrapper() {
        let race = Race::<bool, i32>::new(true, false, -1);
        let seen = Rc::new(Cell::new(None));
        let sink = seen.clone();
        race.finalize(move |status, value| sink.set(Some((status, value))));

        let t1 = race.new_callback();
        let t2 = race.new_callback();
        let t3 = race.new_callback();
        t1.invoke(false, 1);
        t2.invoke(true, 2);
        assert_eq!(seen.get(), Some((true, 2)));
        t3.invoke(true, 3);
        assert_eq!(seen.get(), Some((true, 2)));
    }

    #[test]
    fn test_wrapper_cancel_and_inner() {
        let race = Race::<bool, String>::new(true, false, String::new());
        let token = race.new_callback();
        race.cancel();
        assert!(race.is_cancelled());
        token.invoke(true, "late".to_string());
        let coord = race.into_inner();
        assert!(!coord.is_finalized());
        assert_eq!(coord.pending(), 1);
    }
}
