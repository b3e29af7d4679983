//! Binding scenarios written against the public prelude only.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use proptest::prelude::*;
use rxbind::prelude::*;

struct Label {
    text: Mutex<String>,
}

fn label() -> Arc<Label> {
    Arc::new(Label {
        text: Mutex::new(String::new()),
    })
}

fn set_label(l: &Label, text: String) {
    *l.text.lock().unwrap() = text;
}

#[test]
fn variable_two_subscriber_scenario() {
    let var = Variable::new(0);
    let log = Arc::new(Mutex::new(Vec::new()));
    let bag = SubscriptionBag::new();

    let a = Arc::clone(&log);
    bag.subscribe(&var.observe(), move |v| a.lock().unwrap().push(('A', v)));
    var.set(5);
    let b = Arc::clone(&log);
    bag.subscribe(&var.observe(), move |v| b.lock().unwrap().push(('B', v)));
    var.set(7);

    assert_eq!(
        *log.lock().unwrap(),
        vec![('A', 0), ('A', 5), ('B', 5), ('A', 7), ('B', 7)]
    );
}

#[test]
fn binding_construction_without_target_fails_first() {
    let dispatcher: DispatcherRef = Arc::new(ImmediateDispatcher::new());
    let applied = Arc::new(AtomicUsize::new(0));
    let a = Arc::clone(&applied);
    let result = UiBinding::<Label, String>::builder()
        .dispatcher(dispatcher)
        .apply(move |_: &Label, _: String| {
            a.fetch_add(1, Ordering::SeqCst);
        })
        .build();
    assert_eq!(result.unwrap_err(), BindingError::MissingArgument("target"));
    assert_eq!(applied.load(Ordering::SeqCst), 0);
}

#[test]
fn bag_add_twice_cancels_once() {
    let cancelled = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&cancelled);
    let sub = Subscription::new(move || {
        c.fetch_add(1, Ordering::SeqCst);
    });
    let bag = SubscriptionBag::new();
    bag.add(sub.clone());
    bag.add(sub);
    bag.release_all();
    bag.release_all();
    assert_eq!(cancelled.load(Ordering::SeqCst), 1);
}

#[test]
fn glue_entry_points_compose() {
    let manual = Arc::new(ManualDispatcher::new());
    let dispatcher: DispatcherRef = manual.clone();
    let title = label();
    let clicks = EventEmitter::<()>::new();
    let count = Variable::new(0u32);
    let bag = SubscriptionBag::new();

    let c = Arc::new(count);
    let counter = Arc::clone(&c);
    wrap_event(dispatcher.clone(), clicks.clone())
        .subscribe_next(move |()| counter.update(|n| n + 1))
        .dispose_by(&bag);
    c.observe()
        .map(|n| format!("{n} clicks"))
        .bind_to(bind_property(dispatcher.clone(), Arc::clone(&title), set_label))
        .dispose_by(&bag);
    manual.run_pending();
    assert_eq!(*title.text.lock().unwrap(), "0 clicks");

    clicks.emit(());
    clicks.emit(());
    manual.run_pending();
    assert_eq!(*title.text.lock().unwrap(), "2 clicks");

    bag.release_all();
    manual.run_pending();
    assert_eq!(clicks.handler_count(), 0);
}

#[test]
fn two_way_property_between_variable_and_label() {
    let dispatcher: DispatcherRef = Arc::new(ImmediateDispatcher::new());
    let name = Variable::new("initial".to_string());
    let target = label();
    let prop = two_way_property(
        dispatcher.clone(),
        name.observe(),
        bind_property(dispatcher, Arc::clone(&target), set_label),
    );
    let bag = SubscriptionBag::new();
    bag.add(prop.changes().subscribe(prop.clone()));

    name.set("renamed".into());
    assert_eq!(*target.text.lock().unwrap(), "renamed");
}

proptest! {
    #[test]
    fn immediate_binding_applies_every_value_in_order(
        values in proptest::collection::vec(".{0,6}", 0..24)
    ) {
        let dispatcher: DispatcherRef = Arc::new(ImmediateDispatcher::new());
        let history = Arc::new(Mutex::new(Vec::new()));
        let sink = UiBinding::new(dispatcher, Arc::clone(&history), |h: &Mutex<Vec<String>>, v| {
            h.lock().unwrap().push(v);
        });
        let _sub = Stream::from_values(values.clone()).bind_to(sink);
        prop_assert_eq!(&*history.lock().unwrap(), &values);
    }
}
