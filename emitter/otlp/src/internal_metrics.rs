use std::sync::atomic::{AtomicUsize, Ordering};

macro_rules! metrics {
    (
        $pub_container:ty {
            $field:ident: $internal_container:ident {
                $(
                    $(#[$meta:meta])*
                    $metric:ident: $ty:ident -> $pub_ty:ident,
                )*
            }
        }
    ) => {
        #[derive(Default)]
        pub(crate) struct $internal_container {
            $(
                $(#[$meta])*
                pub(crate) $metric: $ty,
            )*
        }

        impl $pub_container {
            $(
                $(#[$meta])*
                pub fn $metric(&self) -> $pub_ty {
                    self.$field.$metric.sample()
                }
            )*
        }
    };
}

#[derive(Default)]
pub(crate) struct Counter(AtomicUsize);

impl Counter {
    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn sample(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }
}

/**
Self-diagnostics for an [`crate::Exporter`].
*/
pub struct ExporterMetrics<'a> {
    pub(crate) metrics: &'a InternalMetrics,
}

metrics!(
    ExporterMetrics<'_> {
        metrics: InternalMetrics {
            /**
            A batch was encoded and printed instead of sent.
            */
            dry_run_printed: Counter -> usize,
            /**
            A batch could not be encoded.
            */
            payload_encode_failed: Counter -> usize,
            /**
            A new connection to the collector was established.
            */
            transport_conn_established: Counter -> usize,
            /**
            Connecting to the collector failed.
            */
            transport_conn_failed: Counter -> usize,
            /**
            A TLS handshake with the collector completed.
            */
            transport_conn_tls_handshake: Counter -> usize,
            /**
            A TLS handshake with the collector failed.
            */
            transport_conn_tls_failed: Counter -> usize,
            /**
            A request was sent to the collector.
            */
            transport_request_sent: Counter -> usize,
            /**
            A request could not be sent to the collector.
            */
            transport_request_failed: Counter -> usize,
            /**
            The collector accepted a batch with a successful status code.
            */
            export_succeeded: Counter -> usize,
            /**
            The collector rejected a batch with an unsuccessful status code.
            */
            export_rejected: Counter -> usize,
            /**
            A replay script for the last request was written.
            */
            replay_written: Counter -> usize,
            /**
            A replay script for the last request could not be written.
            */
            replay_failed: Counter -> usize,
        }
    }
);
