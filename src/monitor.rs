use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::Result;
use crate::SharedNetwork;

#[derive(Debug, Clone, Serialize)]
pub struct MonitorRecord {
    pub taken_at: DateTime<Utc>,
    pub tick: u64,
    pub energy: f64,
    pub delivered: u64,
    pub dropped: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MonitorReport {
    pub records: Vec<MonitorRecord>,
    /// Polls skipped because the tick driver held the lock.
    pub skipped: u64,
}

impl MonitorReport {
    /// `(tick, cumulative energy)` per successful poll.
    pub fn energy_record(&self) -> Vec<(u64, f64)> {
        self.records.iter().map(|r| (r.tick, r.energy)).collect()
    }

    /// `(tick, cumulative drops)` per successful poll.
    pub fn drop_record(&self) -> Vec<(u64, u64)> {
        self.records.iter().map(|r| (r.tick, r.dropped)).collect()
    }
}

/// Background poller over a shared network. It only ever `try_read`s, so a
/// busy tick driver is never held up by sampling.
pub struct Monitor {
    shutdown_tx: broadcast::Sender<()>,
    handle: JoinHandle<MonitorReport>,
}

impl Monitor {
    pub fn start(network: SharedNetwork, period: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(monitor_task(network, period, shutdown_rx));
        info!("Monitor started with a {:?} period", period);
        Self { shutdown_tx, handle }
    }

    pub async fn stop(self) -> Result<MonitorReport> {
        // The task may already be gone; its report is still in the handle.
        let _ = self.shutdown_tx.send(());
        let report = self.handle.await?;
        info!(
            "Monitor stopped after {} samples ({} skipped)",
            report.records.len(),
            report.skipped
        );
        Ok(report)
    }
}

async fn monitor_task(
    network: SharedNetwork,
    period: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> MonitorReport {
    let mut interval = tokio::time::interval(period);
    let mut report = MonitorReport::default();

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                debug!("Monitor task shutting down");
                break;
            }
            _ = interval.tick() => {
                match network.try_read() {
                    Ok(guard) => {
                        let sample = guard.current_sample();
                        report.records.push(MonitorRecord {
                            taken_at: Utc::now(),
                            tick: sample.time,
                            energy: sample.energy,
                            delivered: sample.delivered,
                            dropped: sample.dropped,
                        });
                    }
                    Err(_) => report.skipped += 1,
                }
            }
        }
    }

    report
}

/// Advances a shared network `ticks` times, taking the write lock once per
/// tick and yielding in between so readers get a chance. Returns the final
/// simulation time.
pub async fn drive(network: SharedNetwork, ticks: u64) -> u64 {
    for _ in 0..ticks {
        {
            let mut guard = network.write().await;
            guard.tick_once();
        }
        tokio::task::yield_now().await;
    }
    let time = network.read().await.time();
    debug!("Driver finished at tick {}", time);
    time
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SimConfig, Topology};
    use crate::protocol::Protocol;
    use crate::{build_network, into_shared};

    fn shared_ring() -> SharedNetwork {
        let network = build_network(&Topology::ring(4, 100.0), Protocol::EcoRp, SimConfig::default()).unwrap();
        into_shared(network)
    }

    #[tokio::test]
    async fn monitor_records_driven_ticks() {
        let network = shared_ring();
        let monitor = Monitor::start(network.clone(), Duration::from_millis(1));

        let time = drive(network.clone(), 20).await;
        assert_eq!(time, 20);
        tokio::time::sleep(Duration::from_millis(10)).await;

        let report = monitor.stop().await.unwrap();
        assert!(report.records.iter().any(|r| r.tick == 20));
        let energy = report.energy_record();
        assert!(energy.windows(2).all(|w| w[0].1 <= w[1].1));
        assert_eq!(report.drop_record().len(), report.records.len());
    }

    #[tokio::test]
    async fn polling_skips_while_writer_holds_the_lock() {
        let network = shared_ring();
        let monitor = Monitor::start(network.clone(), Duration::from_millis(1));

        {
            let mut guard = network.write().await;
            guard.tick_once();
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let report = monitor.stop().await.unwrap();
        assert!(report.skipped > 0);
        assert!(report.records.iter().all(|r| r.tick != 1 || r.energy > 0.0));
    }
}
