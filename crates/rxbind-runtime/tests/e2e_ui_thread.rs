//! End-to-end bindings over a real UI thread.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use rxbind_runtime::config::DispatcherConfig;
use rxbind_runtime::dispatch::{Dispatcher, DispatcherRef, UiThread};
use rxbind_runtime::fault::FaultPolicy;
use rxbind_runtime::reactive::{
    ControlEvent, ControlProperty, EventEmitter, Observer, Stream, StreamError, SubscriptionBag, Teardown,
    UiBinding, WORKER_THREAD_NAME,
};
use tracing::Level;

const UI_NAME: &str = "rxbind-e2e-ui";
const TIMEOUT: Duration = Duration::from_secs(5);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(Level::DEBUG)
        .try_init();
}

fn start_ui() -> Arc<UiThread> {
    init_tracing();
    let config = DispatcherConfig::default()
        .with_thread_name(UI_NAME)
        .with_fault_policy(FaultPolicy::Collect);
    Arc::new(UiThread::start(config).expect("spawn ui thread"))
}

/// Block until every task posted so far has run.
fn flush(ui: &UiThread) {
    let (tx, rx) = mpsc::channel();
    ui.run_on_context(Box::new(move || {
        let _ = tx.send(());
    }));
    rx.recv_timeout(TIMEOUT).expect("ui thread flushed");
}

fn current_thread_name() -> String {
    thread::current().name().unwrap_or_default().to_owned()
}

#[derive(Default)]
struct TextBox {
    text: Mutex<String>,
    changed: EventEmitter<()>,
    writer_threads: Mutex<Vec<String>>,
}

impl TextBox {
    fn text(&self) -> String {
        self.text.lock().unwrap().clone()
    }

    fn set_text(&self, value: String) {
        self.writer_threads.lock().unwrap().push(current_thread_name());
        let changed = {
            let mut text = self.text.lock().unwrap();
            let changed = *text != value;
            *text = value;
            changed
        };
        if changed {
            self.changed.emit(());
        }
    }
}

#[test]
fn producers_apply_on_ui_thread_in_per_producer_order() {
    let ui = start_ui();
    let dispatcher: DispatcherRef = ui.clone();
    let applied = Arc::new(Mutex::new(Vec::new()));
    let binding = UiBinding::new(
        dispatcher,
        Arc::clone(&applied),
        |log: &Mutex<Vec<(usize, u32, String)>>, (p, n): (usize, u32)| {
            log.lock().unwrap().push((p, n, current_thread_name()));
        },
    );

    let producers: Vec<_> = (0..4)
        .map(|p| {
            let binding = binding.clone();
            thread::spawn(move || {
                for n in 0..250 {
                    binding.on_next((p, n));
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }
    flush(&ui);

    let applied = applied.lock().unwrap();
    assert_eq!(applied.len(), 1000);
    assert!(applied.iter().all(|(_, _, name)| name == UI_NAME));
    for p in 0..4 {
        let seq: Vec<u32> = applied.iter().filter(|e| e.0 == p).map(|e| e.1).collect();
        assert_eq!(seq, (0..250).collect::<Vec<_>>());
    }
}

#[test]
fn two_way_property_round_trip() {
    let ui = start_ui();
    let dispatcher: DispatcherRef = ui.clone();
    let text_box = Arc::new(TextBox::default());
    let text = ControlProperty::from_accessors(
        dispatcher,
        Arc::clone(&text_box),
        Stream::from_event(text_box.changed.clone()),
        TextBox::text,
        TextBox::set_text,
    );

    let bag = SubscriptionBag::new();
    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    bag.add(text.changes().subscribe_next(move |v| {
        let _ = tx.lock().unwrap().send((v, current_thread_name()));
    }));
    flush(&ui);

    let writer = text.clone();
    thread::spawn(move || writer.on_next("typed".to_string()))
        .join()
        .unwrap();

    let (value, thread_name) = rx.recv_timeout(TIMEOUT).expect("change observed");
    assert_eq!(value, "typed");
    assert_eq!(thread_name, UI_NAME);
    assert_eq!(text_box.text(), "typed");
    assert_eq!(*text_box.writer_threads.lock().unwrap(), vec![UI_NAME.to_string()]);

    bag.release_all();
    flush(&ui);
    assert_eq!(text_box.changed.handler_count(), 0);
}

#[test]
fn self_bound_property_settles_on_ui_thread() {
    let ui = start_ui();
    let dispatcher: DispatcherRef = ui.clone();
    let text_box = Arc::new(TextBox::default());
    let text = ControlProperty::from_accessors(
        dispatcher,
        Arc::clone(&text_box),
        Stream::from_event(text_box.changed.clone()),
        TextBox::text,
        TextBox::set_text,
    );
    let bag = SubscriptionBag::new();
    bag.add(text.changes().subscribe(text.clone()));
    flush(&ui);

    let tb = Arc::clone(&text_box);
    ui.run_on_context(Box::new(move || tb.set_text("echo".into())));
    flush(&ui);

    // One external assignment plus exactly one echoed write.
    assert_eq!(text_box.writer_threads.lock().unwrap().len(), 2);
    assert_eq!(text_box.text(), "echo");
}

#[test]
fn background_work_delivers_on_ui_thread() {
    let ui = start_ui();
    let dispatcher: DispatcherRef = ui.clone();
    let source = Stream::new(|observer: rxbind_runtime::reactive::SharedObserver<String>| {
        observer.on_next(current_thread_name());
        observer.on_completed();
        rxbind_runtime::reactive::Subscription::empty()
    });

    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    let _sub = source.run_in_background(dispatcher).subscribe_next(move |produced_on| {
        let _ = tx.lock().unwrap().send((produced_on, current_thread_name()));
    });

    let (produced_on, delivered_on) = rx.recv_timeout(TIMEOUT).expect("value delivered");
    assert_eq!(produced_on, WORKER_THREAD_NAME);
    assert_eq!(delivered_on, UI_NAME);
}

#[test]
fn teardown_stops_bindings_owned_by_a_view() {
    let ui = start_ui();
    let dispatcher: DispatcherRef = ui.clone();
    let view_end = Teardown::new();
    let label = Arc::new(Mutex::new(Vec::new()));
    let clicks = EventEmitter::<u32>::new();

    let _sub = Stream::from_event(clicks.clone())
        .take_until(&view_end.signal())
        .bind_to(UiBinding::new(
            dispatcher,
            Arc::clone(&label),
            |l: &Mutex<Vec<u32>>, v| l.lock().unwrap().push(v),
        ));

    clicks.emit(1);
    view_end.fire();
    clicks.emit(2);
    flush(&ui);

    assert_eq!(*label.lock().unwrap(), vec![1]);
    assert_eq!(clicks.handler_count(), 0);
}

#[test]
fn binding_errors_reach_the_fault_channel() {
    let ui = start_ui();
    let dispatcher: DispatcherRef = ui.clone();
    let sink = UiBinding::new(dispatcher, Arc::new(()), |_: &(), _: u8| {});
    let _sub = Stream::fail(StreamError::msg("network down")).bind_to(sink);

    let faults = ui.faults().take();
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].origin(), "UiBinding");
    assert_eq!(faults[0].error().to_string(), "network down");
}

#[test]
fn shutdown_runs_queued_bindings_first() {
    let ui = start_ui();
    let dispatcher: DispatcherRef = ui.clone();
    let applied = Arc::new(Mutex::new(Vec::new()));
    let binding = UiBinding::new(dispatcher, Arc::clone(&applied), |l: &Mutex<Vec<u32>>, v| {
        l.lock().unwrap().push(v);
    });
    for v in 0..50 {
        binding.on_next(v);
    }
    ui.shutdown();
    assert_eq!(applied.lock().unwrap().len(), 50);
    assert!(!ui.is_running());
}

#[test]
fn control_event_detaches_after_ui_thread_stopped() {
    let ui = start_ui();
    let dispatcher: DispatcherRef = ui.clone();
    let clicks = EventEmitter::<u32>::new();
    let sub = ControlEvent::from_source(dispatcher, clicks.clone()).subscribe_next(|_: u32| {});
    flush(&ui);
    assert_eq!(clicks.handler_count(), 1);

    ui.shutdown();
    sub.cancel();
    assert_eq!(clicks.handler_count(), 0);
}
