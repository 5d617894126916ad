// Copyright (c) Quill Team
// SPDX-License-Identifier: Apache-2.0

use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

pub static POSTS_CREATED: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new("quill_posts_created_total", "Posts created")
        .expect("metric can be created");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric can be registered");
    counter
});

pub static COMMENTS_CREATED: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new("quill_comments_created_total", "Comments created")
        .expect("metric can be created");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric can be registered");
    counter
});

pub static NOTIFICATIONS_FANNED_OUT: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "quill_notifications_fanned_out_total",
        "Notification records created by fan-out",
    )
    .expect("metric can be created");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric can be registered");
    counter
});

pub static LIVE_BROADCASTS: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new("quill_live_broadcasts_total", "Live-update broadcasts sent")
        .expect("metric can be created");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric can be registered");
    counter
});

pub static LIVE_SUBSCRIBERS: Lazy<IntGauge> = Lazy::new(|| {
    let gauge = IntGauge::new(
        "quill_live_subscribers",
        "Currently connected live-update subscribers",
    )
    .expect("metric can be created");
    REGISTRY
        .register(Box::new(gauge.clone()))
        .expect("metric can be registered");
    gauge
});

/// Render all registered metrics in the Prometheus text format.
pub fn gather() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_render_in_text_format() {
        POSTS_CREATED.inc();
        LIVE_SUBSCRIBERS.set(2);

        let output = gather();
        assert!(output.contains("quill_posts_created_total"));
        assert!(output.contains("quill_live_subscribers 2"));
    }
}
