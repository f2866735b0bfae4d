use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("palaver.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("palaver.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("palaver.client.request_duration_seconds");
pub(crate) static CLIENT_PING_FAILURES: Counter = Counter::new("palaver.client.ping_failures");

pub(crate) static STREAM_INCREMENTS: Counter = Counter::new("palaver.stream.increments");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("palaver.stream.errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("palaver.stream.bytes");

pub(crate) static SESSION_EXCHANGES: Counter = Counter::new("palaver.session.exchanges");
pub(crate) static SESSION_EXCHANGE_FAILURES: Counter =
    Counter::new("palaver.session.exchange_failures");
pub(crate) static SESSION_REJECTED_SUBMITS: Counter =
    Counter::new("palaver.session.rejected_submits");
pub(crate) static SESSION_REJECTED_CLEARS: Counter =
    Counter::new("palaver.session.rejected_clears");
pub(crate) static SESSION_TTFB: Moments = Moments::new("palaver.session.ttfb_seconds");
pub(crate) static SESSION_EXCHANGE_DURATION: Moments =
    Moments::new("palaver.session.exchange_duration_seconds");

pub(crate) static SUGGEST_REQUESTS: Counter = Counter::new("palaver.suggest.requests");
pub(crate) static SUGGEST_FAILURES: Counter = Counter::new("palaver.suggest.failures");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);
    collector.register_counter(&CLIENT_PING_FAILURES);

    collector.register_counter(&STREAM_INCREMENTS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_BYTES);

    collector.register_counter(&SESSION_EXCHANGES);
    collector.register_counter(&SESSION_EXCHANGE_FAILURES);
    collector.register_counter(&SESSION_REJECTED_SUBMITS);
    collector.register_counter(&SESSION_REJECTED_CLEARS);
    collector.register_moments(&SESSION_TTFB);
    collector.register_moments(&SESSION_EXCHANGE_DURATION);

    collector.register_counter(&SUGGEST_REQUESTS);
    collector.register_counter(&SUGGEST_FAILURES);
}
