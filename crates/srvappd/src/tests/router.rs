//! Fan-out, missing-channel and capability behaviour of the log router.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use rstest::rstest;

use crate::log::{
    ERROR_CHANNEL, INFO_CHANNEL, LogBuffer, LogForwarder, LogRecord, LogRouter, LogSink,
};

use super::support::{Capabilities, RecordingSink, router_with};

#[rstest]
#[case(1)]
#[case(3)]
#[case(8)]
fn every_sink_sees_each_message_once_in_order(#[case] sink_count: usize) {
    let router = LogRouter::new();
    let sinks: Vec<Arc<RecordingSink>> = (0..sink_count)
        .map(|index| RecordingSink::new(&format!("sink-{index}")))
        .collect();
    for sink in &sinks {
        router.register(INFO_CHANNEL, sink.clone());
    }

    router.info("first");
    router.info_local("second");

    for sink in &sinks {
        assert_eq!(sink.texts(), vec!["first".to_owned(), "second".to_owned()]);
    }
}

#[rstest]
fn duplicate_registration_duplicates_delivery() {
    let router = LogRouter::new();
    let sink = RecordingSink::new("twice");
    router.register(INFO_CHANNEL, sink.clone());
    router.register(INFO_CHANNEL, sink.clone());

    router.info("echo");

    assert_eq!(sink.texts(), vec!["echo".to_owned(), "echo".to_owned()]);
}

#[rstest]
fn concurrent_dispatch_reaches_every_sink() {
    let router = Arc::new(LogRouter::new());
    let first = RecordingSink::new("first");
    let second = RecordingSink::new("second");
    router.register(INFO_CHANNEL, first.clone());
    router.register(INFO_CHANNEL, second.clone());

    let threads = 4;
    let per_thread = 50;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|worker| {
            let router = Arc::clone(&router);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for index in 0..per_thread {
                    router.info(format_args!("{worker}-{index}"));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("logging thread panicked");
    }

    assert_eq!(first.messages().len(), threads * per_thread);
    assert_eq!(second.messages().len(), threads * per_thread);
}

#[rstest]
fn missing_channel_writes_one_error_entry() {
    let (router, sink) = router_with(&[ERROR_CHANNEL]);

    router.log_to(false, "audit", "dropped");

    assert_eq!(
        sink.messages(),
        vec![(
            ERROR_CHANNEL.to_owned(),
            "Couldn't log to audit logs. Loggers missing.".to_owned()
        )]
    );
}

#[rstest]
fn missing_error_channel_does_not_recurse() {
    let (router, sink) = router_with(&[INFO_CHANNEL]);

    router.error("nowhere to go");
    router.log_to(true, "audit", "also nowhere");

    assert!(sink.messages().is_empty());
}

#[rstest]
fn capability_probing_skips_sinks_without_support() {
    let router = LogRouter::new();
    let plain = RecordingSink::new("plain");
    let full = RecordingSink::with_capabilities(
        "full",
        Capabilities {
            close: true,
            toggle: true,
            flush: true,
            fail_close: false,
        },
    );
    router.register(INFO_CHANNEL, plain.clone());
    router.register(INFO_CHANNEL, full.clone());

    router.set_enabled(INFO_CHANNEL, false);
    router.set_flush_interval(INFO_CHANNEL, Duration::from_secs(9));
    router.info("after toggle");

    assert_eq!(plain.texts(), vec!["after toggle".to_owned()]);
    assert!(full.texts().is_empty());
    assert_eq!(full.intervals(), vec![Duration::from_secs(9)]);
    assert!(plain.intervals().is_empty());
}

#[rstest]
fn admin_calls_on_missing_channel_report_to_error_channel() {
    let (router, sink) = router_with(&[ERROR_CHANNEL]);

    router.set_enabled("audit", true);
    router.set_flush_interval("audit", Duration::from_secs(1));

    let texts = sink.texts();
    assert_eq!(texts.len(), 2, "{texts:?}");
    assert!(texts.iter().all(|text| text.contains("audit")));
}

#[rstest]
fn close_all_closes_shared_sinks_once_and_reports_failures() {
    let router = LogRouter::new();
    let errors = RecordingSink::new("errors");
    let shared = RecordingSink::with_capabilities(
        "shared",
        Capabilities {
            close: true,
            ..Capabilities::default()
        },
    );
    let broken = RecordingSink::with_capabilities(
        "broken",
        Capabilities {
            close: true,
            fail_close: true,
            ..Capabilities::default()
        },
    );
    router.register(ERROR_CHANNEL, errors.clone());
    router.register(INFO_CHANNEL, shared.clone());
    router.register(ERROR_CHANNEL, shared.clone());
    router.register(INFO_CHANNEL, broken.clone());

    router.close_all();

    assert_eq!(shared.closes(), 1);
    assert_eq!(broken.closes(), 1);
    let failures: Vec<String> = errors
        .texts()
        .into_iter()
        .filter(|text| text.contains("broken"))
        .collect();
    assert_eq!(failures.len(), 1, "{failures:?}");
}

#[rstest]
fn buffer_and_counter_sink_on_info_each_receive_the_message() {
    let router = LogRouter::new();
    let buffer = Arc::new(LogBuffer::new(10));
    let counter = RecordingSink::new("counter");
    router.register(INFO_CHANNEL, buffer.clone() as Arc<dyn LogSink>);
    router.register(INFO_CHANNEL, counter.clone());

    router.info(format_args!("user {} logged in", 42));

    let records = buffer.read_all();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].channel, INFO_CHANNEL);
    assert_eq!(records[0].text, "user 42 logged in");
    assert!(records[0].file.ends_with("tests/router.rs"), "{}", records[0].file);
    assert_eq!(counter.messages().len(), 1);
}

#[derive(Default)]
struct CollectingForwarder {
    records: std::sync::Mutex<Vec<String>>,
}

impl LogForwarder for CollectingForwarder {
    fn forward(&self, record: &LogRecord) -> Result<(), crate::log::ForwardError> {
        self.records
            .lock()
            .expect("forwarder mutex poisoned")
            .push(record.text.clone());
        Ok(())
    }
}

#[rstest]
fn only_non_local_messages_are_forwarded() {
    let forwarder = Arc::new(CollectingForwarder::default());
    let router = LogRouter::with_forwarder(forwarder.clone()).expect("forwarder should start");
    let sink = RecordingSink::new("local");
    router.register(INFO_CHANNEL, sink.clone());

    router.info("remote");
    router.info_local("local only");
    router.close_all();

    assert_eq!(sink.texts().len(), 2);
    let forwarded = forwarder
        .records
        .lock()
        .expect("forwarder mutex poisoned")
        .clone();
    assert_eq!(forwarded, vec!["remote".to_owned()]);
}
