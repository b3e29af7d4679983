use std::sync::{Arc, Mutex};

use proptest::prelude::*;
use rxbind_runtime::reactive::{Stream, SubscriptionBag, Variable};

fn collect<T: Clone + Send + 'static>(stream: &Stream<T>, bag: &SubscriptionBag) -> Arc<Mutex<Vec<T>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = Arc::clone(&seen);
    bag.subscribe(stream, move |v| s.lock().unwrap().push(v));
    seen
}

// ---------------------------------------------------------------------------
// Property Tests
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn early_subscriber_sees_initial_then_every_write(
        initial in any::<i64>(),
        writes in proptest::collection::vec(any::<i64>(), 0..64)
    ) {
        let var = Variable::new(initial);
        let bag = SubscriptionBag::new();
        let seen = collect(&var.observe(), &bag);

        for &w in &writes {
            var.set(w);
        }

        let mut expected = vec![initial];
        expected.extend(writes.iter().copied());
        prop_assert_eq!(&*seen.lock().unwrap(), &expected);
        prop_assert_eq!(var.version(), writes.len() as u64);
    }

    #[test]
    fn late_subscriber_sees_only_latest(
        initial in any::<u16>(),
        writes in proptest::collection::vec(any::<u16>(), 0..32),
        tail in proptest::collection::vec(any::<u16>(), 0..8)
    ) {
        let var = Variable::new(initial);
        for &w in &writes {
            var.set(w);
        }
        let bag = SubscriptionBag::new();
        let seen = collect(&var.observe(), &bag);
        for &t in &tail {
            var.set(t);
        }

        let mut expected = vec![writes.last().copied().unwrap_or(initial)];
        expected.extend(tail.iter().copied());
        prop_assert_eq!(&*seen.lock().unwrap(), &expected);
    }

    #[test]
    fn get_always_reflects_last_set(
        writes in proptest::collection::vec(".{0,8}", 1..32)
    ) {
        let var = Variable::new(String::new());
        for w in &writes {
            var.set(w.clone());
            prop_assert_eq!(&var.get(), w);
        }
    }

    #[test]
    fn nothing_published_after_dispose(
        before in proptest::collection::vec(any::<u8>(), 0..16),
        after in proptest::collection::vec(any::<u8>(), 1..16)
    ) {
        let var = Variable::new(0u8);
        let bag = SubscriptionBag::new();
        let seen = collect(&var.observe(), &bag);
        for &b in &before {
            var.set(b);
        }
        var.dispose();
        for &a in &after {
            var.set(a);
        }
        prop_assert_eq!(seen.lock().unwrap().len(), before.len() + 1);
        prop_assert_eq!(var.get(), *after.last().unwrap());
    }

    #[test]
    fn changes_never_emit_value_current_at_subscription(
        initial in any::<i32>(),
        writes in proptest::collection::vec(any::<i32>(), 0..32)
    ) {
        use rxbind_runtime::dispatch::{DispatcherRef, ImmediateDispatcher};
        use rxbind_runtime::reactive::{CallbackObserver, ControlProperty};

        let dispatcher: DispatcherRef = Arc::new(ImmediateDispatcher::new());
        let var = Variable::new(initial);
        let prop = ControlProperty::new(dispatcher, var.observe(), CallbackObserver::new(|_: i32| {}));
        let bag = SubscriptionBag::new();
        let seen = collect(&prop.changes().as_stream(), &bag);

        for &w in &writes {
            var.set(w);
        }
        prop_assert_eq!(&*seen.lock().unwrap(), &writes);
    }
}
