use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::aggregate::{DurationStats, MetricsSnapshot};

#[derive(Tabled)]
struct OperationRow {
    endpoint: String,
    #[tabled(display = "float2")]
    avg_time_ms: f64,
    #[tabled(display = "float2")]
    min_time_ms: f64,
    #[tabled(display = "float2")]
    max_time_ms: f64,
    #[tabled(display = "float2")]
    p90_time_ms: f64,
    #[tabled(display = "float2")]
    p95_time_ms: f64,
    total_requests: u64,
}

fn float2(n: &f64) -> String {
    format!("{:.2}", n)
}

impl OperationRow {
    fn new(endpoint: &str, stats: &DurationStats) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            avg_time_ms: stats.avg_ms,
            min_time_ms: stats.min_ms,
            max_time_ms: stats.max_ms,
            p90_time_ms: stats.p90_ms,
            p95_time_ms: stats.p95_ms,
            total_requests: stats.count,
        }
    }
}

pub(crate) fn print_operations(snapshot: &MetricsSnapshot) {
    let Some(overall) = &snapshot.http_req_duration else {
        println!("\nNo requests were recorded");
        return;
    };

    println!("\nSummary of requests");

    let mut rows = vec![OperationRow::new("(all)", overall)];
    rows.extend(
        snapshot
            .endpoints
            .iter()
            .map(|(endpoint, stats)| OperationRow::new(endpoint, stats)),
    );

    let mut table = Table::new(rows);
    table.with(Style::modern());

    println!("{table}");
}
