use sysinfo::{Pid, ProcessRefreshKind, System, MINIMUM_CPU_UPDATE_INTERVAL};

use footfall_core::prelude::DelegatedShutdownListener;

/// Watch the load generator's own CPU usage and warn when it runs hot.
///
/// A saturated generator queues requests before they reach the wire, which inflates every
/// latency percentile the run reports. This does not stop the run, it only tells the operator
/// that the numbers may be skewed.
pub(crate) fn start_monitor(mut shutdown_listener: DelegatedShutdownListener) {
    std::thread::Builder::new()
        .name("monitor".to_string())
        .spawn(move || {
            let this_process_pid = Pid::from_u32(std::process::id());
            let mut sys = System::new();

            sys.refresh_cpu();
            let cpu_count = sys.cpus().len().max(1);

            loop {
                if shutdown_listener.should_shutdown() {
                    break;
                }

                sys.refresh_process_specifics(
                    this_process_pid,
                    ProcessRefreshKind::new().with_cpu(),
                );

                if let Some(process) = sys.process(this_process_pid) {
                    let usage = process.cpu_usage() / cpu_count as f32;
                    if usage > 10.0 {
                        log::warn!(
                            "High CPU usage detected. Footfall is using {:.2}% of the CPU, with {} available cores; latency percentiles may be skewed",
                            usage,
                            cpu_count
                        );
                    }
                }

                std::thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL);
            }
        })
        .expect("Failed to start monitor thread");
}
