//! Synthetic candidate values used when the config supplies none.

use crate::delivery::RandomSource;

const SERVICES: [&str; 8] = [
    "api", "auth", "billing", "cart", "gateway", "ingest", "search", "worker",
];

const VERBS: [&str; 6] = ["GET", "POST", "PUT", "DELETE", "PATCH", "HEAD"];

const OUTCOMES: [&str; 5] = ["ok", "retry", "timeout", "refused", "cached"];

/// `n` distinct container names.
pub fn container_names(n: usize, random: &RandomSource) -> Vec<String> {
    (0..n)
        .map(|i| {
            let service = SERVICES[random.below(SERVICES.len())];
            format!("{service}-{i:05}-{:06x}", random.below(0x100_0000))
        })
        .collect()
}

/// `n` logfmt-style lines with randomized fields.
pub fn log_lines(n: usize, random: &RandomSource) -> Vec<String> {
    (0..n)
        .map(|_| {
            format!(
                "method={} path=/v1/{}/{} status={} outcome={} duration_ms={} opaqueid={}",
                VERBS[random.below(VERBS.len())],
                SERVICES[random.below(SERVICES.len())],
                random.below(10_000),
                [200, 201, 204, 400, 404, 500, 503][random.below(7)],
                OUTCOMES[random.below(OUTCOMES.len())],
                random.below(2_000),
                random.below(1_000),
            )
        })
        .collect()
}
