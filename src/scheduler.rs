use crate::collectors::Probes;
use crate::config::{Config, DevicesConfig};
use crate::error::ProbeError;
use crate::models::device::{Device, Reading};
use crate::models::raid::RaidGroup;
use crate::models::snapshot::{Row, Snapshot};
use crate::raid;
use crate::sampler::{Outcome, Sampler};
use chrono::{DateTime, Utc};
use std::any::Any;
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// A device missing from this many consecutive polls is dropped.
const MISSED_POLLS_BEFORE_REMOVAL: u32 = 2;

/// Granularity of the shutdown check while waiting for the next tick.
const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

/// Name of the background refresh thread.
pub const REFRESH_THREAD: &str = "xdmon-refresh";

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub interval:          Duration,
    pub temperature_every: u32,
    pub min_elapsed:       Duration,
    pub smoothing:         f64,
    /// Probe SMART temperatures at all.
    pub temperatures:      bool,
    pub devices:           DevicesConfig,
}

impl SchedulerConfig {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            interval:          cfg.general.refresh_interval(),
            temperature_every: cfg.general.temperature_every(),
            min_elapsed:       cfg.general.min_elapsed(),
            smoothing:         cfg.general.smoothing,
            temperatures:      true,
            devices:           cfg.devices.clone(),
        }
    }
}

/// Owns all per-device state and turns probe output into snapshots.
pub struct Scheduler {
    cfg:         SchedulerConfig,
    probes:      Probes,
    sampler:     Sampler,
    devices:     BTreeMap<String, Device>,
    raid_groups: Vec<RaidGroup>,
    ticks:       u64,
    /// Why temperatures are off for the rest of the session.
    temperature_disabled: Option<String>,
}

impl Scheduler {
    pub fn new(cfg: SchedulerConfig, probes: Probes) -> Self {
        let sampler = Sampler::new(cfg.min_elapsed, cfg.smoothing);
        Self {
            cfg,
            probes,
            sampler,
            devices:              BTreeMap::new(),
            raid_groups:          Vec::new(),
            ticks:                0,
            temperature_disabled: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.cfg.interval
    }

    /// One refresh: list, sample, probe temperatures when due, aggregate,
    /// publish. Probe failures degrade single fields and never escape. A
    /// panic while probing rolls the device state back to the last tick.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Arc<Snapshot> {
        self.ticks += 1;

        let saved = (self.devices.clone(), self.raid_groups.clone());
        let probed = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut notices = Vec::new();
            self.refresh_topology(&mut notices);
            self.refresh_counters(now, &mut notices);
            self.refresh_temperatures(now);
            notices
        }));
        let mut notices = match probed {
            Ok(notices) => notices,
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                warn!(tick = self.ticks, panic = %msg, "refresh panicked, keeping previous state");
                (self.devices, self.raid_groups) = saved;
                vec![format!("refresh failed: {}", msg)]
            }
        };

        if let Some(reason) = &self.temperature_disabled {
            notices.push(format!("temperatures unavailable: {}", reason));
        }
        Arc::new(self.build_snapshot(now, notices))
    }

    /// Run ticks on the calling thread until `shutdown` is set or the
    /// receiver hangs up.
    pub fn run(mut self, tx: mpsc::Sender<Arc<Snapshot>>, shutdown: Arc<AtomicBool>) {
        info!(interval = ?self.cfg.interval, "refresh loop started");
        while !shutdown.load(Ordering::Relaxed) {
            let started  = Instant::now();
            let snapshot = self.tick(Utc::now());
            debug!(tick = snapshot.tick, rows = snapshot.rows.len(), "snapshot published");
            if tx.send(snapshot).is_err() {
                debug!("snapshot receiver dropped");
                break;
            }
            wait(self.cfg.interval.saturating_sub(started.elapsed()), &shutdown);
        }
        info!("refresh loop stopped");
    }

    /// Start [`Scheduler::run`] on a background thread.
    pub fn spawn(
        self,
        shutdown: Arc<AtomicBool>,
    ) -> io::Result<(mpsc::Receiver<Arc<Snapshot>>, JoinHandle<()>)> {
        let (tx, rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name(REFRESH_THREAD.to_string())
            .spawn(move || self.run(tx, shutdown))?;
        Ok((rx, handle))
    }

    // ── Device set ────────────────────────────────────────────────────

    fn refresh_topology(&mut self, notices: &mut Vec<String>) {
        let mut topo = match self.probes.devices.list_external_devices() {
            Ok(t)  => t,
            Err(e) => {
                // A failed listing is not an absence: keep the known set.
                warn!(error = %e, "device listing failed, keeping previous set");
                notices.push(format!("device listing failed: {}", e));
                return;
            }
        };
        topo.devices.retain(|d| !self.cfg.devices.is_excluded(&d.id));
        let topo = topo.normalize();

        let seen: HashSet<String> = topo.devices.iter().map(|d| d.id.clone()).collect();
        for info in topo.devices {
            match self.devices.get_mut(&info.id) {
                Some(dev) => {
                    dev.info         = info;
                    dev.missed_polls = 0;
                }
                None => {
                    info!(device = %info.id, name = %info.name, "device attached");
                    self.devices.insert(info.id.clone(), Device::new(info));
                }
            }
        }

        let mut absent: HashSet<String> = HashSet::new();
        for (id, dev) in self.devices.iter_mut() {
            if !seen.contains(id) {
                dev.missed_polls += 1;
                absent.insert(id.clone());
            }
        }
        self.devices.retain(|id, dev| {
            let keep = dev.missed_polls < MISSED_POLLS_BEFORE_REMOVAL;
            if !keep {
                info!(device = %id, "device detached");
            }
            keep
        });
        absent.retain(|id| self.devices.contains_key(id));

        self.raid_groups = carry_over_groups(&self.raid_groups, topo.raid_groups, &absent);
    }

    // ── Throughput ────────────────────────────────────────────────────

    fn refresh_counters(&mut self, now: DateTime<Utc>, notices: &mut Vec<String>) {
        let ids: Vec<String> = self.devices
            .values()
            .filter(|d| d.missed_polls == 0)
            .map(|d| d.info.id.clone())
            .collect();
        if ids.is_empty() { return; }

        let counters = match self.probes.counters.read_counters(&ids) {
            Ok(c)  => c,
            Err(e) => {
                warn!(error = %e, "counter read failed, holding previous rates");
                notices.push(format!("I/O counters unavailable: {}", e));
                return;
            }
        };

        for id in ids {
            let Some(dev) = self.devices.get_mut(&id) else { continue };
            let Some(c) = counters.get(&id) else {
                debug!(device = %id, "no counters this tick, holding previous rates");
                continue;
            };

            let current = Reading { counters: *c, at: now };
            let out = self.sampler.sample(&id, dev.last_reading.as_ref(), dev.last_sample.as_ref(), current);
            match out.outcome {
                Outcome::ClockAnomaly => warn!(device = %id, "non-positive elapsed time, holding previous rates"),
                Outcome::CounterReset => info!(device = %id, "I/O counters went backwards, baseline reset"),
                Outcome::First | Outcome::Measured => {}
            }
            dev.last_reading = Some(out.baseline);
            dev.last_sample  = Some(out.sample);
        }
    }

    // ── Temperature ───────────────────────────────────────────────────

    fn refresh_temperatures(&mut self, now: DateTime<Utc>) {
        if !self.cfg.temperatures || self.temperature_disabled.is_some() { return; }
        let due = (self.ticks - 1) % u64::from(self.cfg.temperature_every.max(1)) == 0;

        for dev in self.devices.values_mut() {
            if dev.missed_polls > 0 { continue; }
            if !due && dev.temperature_polled_at.is_some() { continue; }

            match self.probes.temperature.read_temperature(&dev.info.id) {
                Ok(t) => dev.temperature = t,
                Err(e) if e.is_permanent() => {
                    warn!(error = %e, "temperature probing disabled");
                    self.temperature_disabled = Some(e.to_string());
                    break;
                }
                Err(e @ ProbeError::PermissionDenied(_)) => {
                    debug!(device = %dev.info.id, error = %e, "temperature not readable");
                    dev.temperature = None;
                }
                Err(e) => {
                    debug!(device = %dev.info.id, error = %e, "temperature probe failed, keeping last value");
                }
            }
            dev.temperature_polled_at = Some(now);
        }

        if self.temperature_disabled.is_some() {
            for dev in self.devices.values_mut() {
                dev.temperature = None;
            }
        }
    }

    // ── Snapshot ──────────────────────────────────────────────────────

    fn build_snapshot(&self, now: DateTime<Utc>, notices: Vec<String>) -> Snapshot {
        let mut grouped: HashSet<&str> = HashSet::new();
        let mut rows: Vec<Row> = Vec::new();

        for group in &self.raid_groups {
            let members: Vec<Row> = group.members
                .iter()
                .filter_map(|id| self.devices.get(id))
                .map(|d| device_row(d, &self.cfg.devices))
                .collect();
            if members.is_empty() { continue; }
            grouped.extend(group.members.iter().map(String::as_str));
            rows.push(raid::group_row(group, self.cfg.devices.alias(&group.id), members, now));
        }
        rows.sort_by(|a, b| a.name.cmp(&b.name));

        // BTreeMap order: standalone devices sorted by id.
        rows.extend(
            self.devices
                .values()
                .filter(|d| !grouped.contains(d.id()))
                .map(|d| device_row(d, &self.cfg.devices)),
        );

        Snapshot {
            tick:     self.ticks,
            taken_at: now,
            rows,
            notice:   if notices.is_empty() { None } else { Some(notices.join("; ")) },
        }
    }
}

fn device_row(dev: &Device, devices: &DevicesConfig) -> Row {
    Row {
        id:                  dev.info.id.clone(),
        name:                devices.alias(dev.id()).unwrap_or(&dev.info.name).to_string(),
        capacity_bytes:      dev.info.capacity_bytes,
        temperature:         dev.temperature,
        read_bytes_per_sec:  dev.read_rate(),
        write_bytes_per_sec: dev.write_rate(),
        members:             Vec::new(),
    }
}

/// Devices missing from one poll keep their RAID membership until removed.
fn carry_over_groups(old: &[RaidGroup], mut new: Vec<RaidGroup>, absent: &HashSet<String>) -> Vec<RaidGroup> {
    for prev in old {
        let kept: Vec<&String> = prev.members.iter().filter(|m| absent.contains(*m)).collect();
        if kept.is_empty() { continue; }

        match new.iter_mut().find(|g| g.id == prev.id) {
            Some(g) => {
                for m in kept {
                    if !g.members.contains(m) {
                        g.members.push(m.clone());
                    }
                }
            }
            None => {
                let mut g = prev.clone();
                g.members.retain(|m| absent.contains(m));
                new.push(g);
            }
        }
    }
    new
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn wait(mut remaining: Duration, shutdown: &AtomicBool) {
    while !remaining.is_zero() && !shutdown.load(Ordering::Relaxed) {
        let step = remaining.min(SHUTDOWN_POLL);
        thread::sleep(step);
        remaining -= step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::{CounterProbe, DeviceProbe, TemperatureProbe, Unsupported};
    use crate::error::ProbeResult;
    use crate::models::device::{Celsius, Counters, DeviceInfo, Topology};
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    const MB: u64 = 1_000_000;

    #[derive(Default)]
    struct World {
        topology:      Option<ProbeResult<Topology>>,
        counters:      HashMap<String, Counters>,
        counters_fail: bool,
        temps:         HashMap<String, ProbeResult<Option<Celsius>>>,
        temp_calls:    usize,
    }

    #[derive(Clone, Default)]
    struct Fake(Arc<Mutex<World>>);

    impl Fake {
        fn with<R>(&self, f: impl FnOnce(&mut World) -> R) -> R {
            f(&mut self.0.lock().unwrap())
        }

        fn attach(&self, ids: &[&str]) {
            self.with(|w| {
                w.topology = Some(Ok(Topology {
                    devices:     ids.iter().map(|id| DeviceInfo::new(*id, format!("{} media", id), 1_000)).collect(),
                    raid_groups: Vec::new(),
                }))
            });
        }

        fn set_counters(&self, id: &str, read: u64, write: u64) {
            self.with(|w| w.counters.insert(id.to_string(), Counters::new(read, write)));
        }

        fn probes(&self) -> Probes {
            Probes {
                devices:     Box::new(self.clone()),
                counters:    Box::new(self.clone()),
                temperature: Box::new(self.clone()),
            }
        }
    }

    impl DeviceProbe for Fake {
        fn list_external_devices(&mut self) -> ProbeResult<Topology> {
            self.with(|w| w.topology.clone().unwrap_or_else(|| Ok(Topology::default())))
        }
    }

    impl CounterProbe for Fake {
        fn read_counters(&mut self, ids: &[String]) -> ProbeResult<HashMap<String, Counters>> {
            self.with(|w| {
                if w.counters_fail {
                    return Err(ProbeError::transient("ioreg exited 1"));
                }
                Ok(w.counters.iter().filter(|(k, _)| ids.contains(k)).map(|(k, v)| (k.clone(), *v)).collect())
            })
        }
    }

    impl TemperatureProbe for Fake {
        fn read_temperature(&mut self, device_id: &str) -> ProbeResult<Option<Celsius>> {
            self.with(|w| {
                w.temp_calls += 1;
                w.temps.get(device_id).cloned().unwrap_or(Ok(None))
            })
        }
    }

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn config() -> SchedulerConfig {
        SchedulerConfig {
            interval:          Duration::from_millis(10),
            temperature_every: 3,
            min_elapsed:       Duration::from_millis(1),
            smoothing:         1.0,
            temperatures:      true,
            devices:           DevicesConfig::default(),
        }
    }

    fn scheduler(fake: &Fake) -> Scheduler {
        Scheduler::new(config(), fake.probes())
    }

    #[test]
    fn scenario_rates_from_two_ticks() {
        let fake = Fake::default();
        fake.attach(&["disk4"]);
        let mut s = scheduler(&fake);

        fake.set_counters("disk4", 100 * MB, 50 * MB);
        let first = s.tick(t(0));
        let row = first.find("disk4").unwrap();
        assert_eq!(row.read_bytes_per_sec, 0.0);
        assert_eq!(row.write_bytes_per_sec, 0.0);

        fake.set_counters("disk4", 105 * MB, 53 * MB);
        let second = s.tick(t(2));
        let row = second.find("disk4").unwrap();
        assert_eq!(row.read_bytes_per_sec, 2_500_000.0);
        assert_eq!(row.write_bytes_per_sec, 1_500_000.0);
        assert_eq!(second.tick, 2);
        assert_eq!(second.notice, None);
    }

    #[test]
    fn device_removed_after_two_missed_polls() {
        let fake = Fake::default();
        fake.attach(&["disk4", "disk5"]);
        let mut s = scheduler(&fake);
        s.tick(t(0));

        fake.attach(&["disk4"]);
        let once = s.tick(t(2));
        assert!(once.find("disk5").is_some(), "one missed poll keeps the device");

        let twice = s.tick(t(4));
        assert!(twice.find("disk5").is_none());
        assert!(twice.find("disk4").is_some());
    }

    #[test]
    fn returning_device_resets_missed_count() {
        let fake = Fake::default();
        fake.attach(&["disk4"]);
        let mut s = scheduler(&fake);
        s.tick(t(0));

        fake.attach(&[]);
        s.tick(t(2));
        fake.attach(&["disk4"]);
        s.tick(t(4));
        fake.attach(&[]);
        let snap = s.tick(t(6));
        assert!(snap.find("disk4").is_some());
    }

    #[test]
    fn reattached_device_starts_from_zero() {
        let fake = Fake::default();
        fake.attach(&["disk4"]);
        let mut s = scheduler(&fake);
        fake.set_counters("disk4", 10 * MB, 0);
        s.tick(t(0));
        fake.set_counters("disk4", 20 * MB, 0);
        assert!(s.tick(t(2)).find("disk4").unwrap().read_bytes_per_sec > 0.0);

        fake.attach(&[]);
        s.tick(t(4));
        s.tick(t(6));

        fake.attach(&["disk4"]);
        fake.set_counters("disk4", 1 * MB, 0);
        let snap = s.tick(t(8));
        assert_eq!(snap.find("disk4").unwrap().read_bytes_per_sec, 0.0);
    }

    #[test]
    fn listing_failure_keeps_previous_set_and_flags_notice() {
        let fake = Fake::default();
        fake.attach(&["disk4"]);
        let mut s = scheduler(&fake);
        s.tick(t(0));

        fake.with(|w| w.topology = Some(Err(ProbeError::transient("diskutil exited 1"))));
        for secs in [2, 4, 6] {
            let snap = s.tick(t(secs));
            assert!(snap.find("disk4").is_some());
            assert!(snap.notice.as_deref().unwrap().contains("device listing failed"));
        }
    }

    #[test]
    fn listing_unavailable_never_stops_ticks() {
        let fake = Fake::default();
        let mut s = Scheduler::new(config(), Probes {
            devices:     Box::new(Unsupported),
            counters:    Box::new(fake.clone()),
            temperature: Box::new(fake.clone()),
        });
        for secs in 0..3 {
            let snap = s.tick(t(secs));
            assert!(snap.rows.is_empty());
            assert!(snap.notice.is_some());
        }
    }

    /// Listing that panics on one chosen call and otherwise defers to `Fake`.
    #[derive(Clone)]
    struct PanicsOnce {
        inner:    Fake,
        calls:    Arc<AtomicUsize>,
        panic_on: usize,
    }

    impl PanicsOnce {
        fn new(inner: &Fake, panic_on: usize) -> Self {
            Self { inner: inner.clone(), calls: Arc::new(AtomicUsize::new(0)), panic_on }
        }
    }

    impl DeviceProbe for PanicsOnce {
        fn list_external_devices(&mut self) -> ProbeResult<Topology> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == self.panic_on {
                panic!("diskutil output changed shape");
            }
            self.inner.list_external_devices()
        }
    }

    fn panicking_scheduler(fake: &Fake, panic_on: usize) -> Scheduler {
        Scheduler::new(config(), Probes {
            devices:     Box::new(PanicsOnce::new(fake, panic_on)),
            counters:    Box::new(fake.clone()),
            temperature: Box::new(fake.clone()),
        })
    }

    #[test]
    fn panicking_probe_keeps_previous_state() {
        let fake = Fake::default();
        fake.attach(&["disk4"]);
        let mut s = panicking_scheduler(&fake, 2);

        fake.set_counters("disk4", 0, 0);
        s.tick(t(0));
        fake.set_counters("disk4", 4 * MB, 0);
        s.tick(t(2));

        fake.set_counters("disk4", 5 * MB, 0);
        let snap = s.tick(t(4));
        assert_eq!(snap.tick, 3);
        assert_eq!(snap.find("disk4").unwrap().read_bytes_per_sec, 2_000_000.0);
        assert!(snap.notice.as_deref().unwrap().contains("diskutil output changed shape"));

        // The baseline from tick 2 is still in place.
        fake.set_counters("disk4", 8 * MB, 0);
        let snap = s.tick(t(6));
        assert_eq!(snap.find("disk4").unwrap().read_bytes_per_sec, 1_000_000.0);
        assert_eq!(snap.notice, None);
    }

    #[test]
    fn refresh_thread_survives_a_panicking_probe() {
        let fake = Fake::default();
        fake.attach(&["disk4"]);
        let shutdown = Arc::new(AtomicBool::new(false));
        let (rx, handle) = panicking_scheduler(&fake, 1).spawn(shutdown.clone()).unwrap();

        let ticks: Vec<u64> = (0..4)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap().tick)
            .collect();
        assert_eq!(ticks, vec![1, 2, 3, 4]);

        shutdown.store(true, Ordering::Relaxed);
        handle.join().unwrap();
    }

    #[test]
    fn counter_failure_holds_previous_rates() {
        let fake = Fake::default();
        fake.attach(&["disk4"]);
        let mut s = scheduler(&fake);
        fake.set_counters("disk4", 0, 0);
        s.tick(t(0));
        fake.set_counters("disk4", 4 * MB, 0);
        s.tick(t(2));

        fake.with(|w| w.counters_fail = true);
        let snap = s.tick(t(4));
        assert_eq!(snap.find("disk4").unwrap().read_bytes_per_sec, 2_000_000.0);
        assert!(snap.notice.is_some());
    }

    #[test]
    fn raid_rows_sum_members_and_come_first() {
        let fake = Fake::default();
        fake.with(|w| {
            let mut group = RaidGroup::new("5C2A", "Backup", vec!["disk5".into(), "disk4".into()]);
            group.capacity_bytes = Some(4_000);
            w.topology = Some(Ok(Topology {
                devices: vec![
                    DeviceInfo::new("disk4", "T7", 2_000),
                    DeviceInfo::new("disk5", "T7", 2_000),
                    DeviceInfo::new("disk2", "Stick", 64),
                ],
                raid_groups: vec![group],
            }));
        });
        let mut s = scheduler(&fake);
        fake.set_counters("disk4", 0, 0);
        fake.set_counters("disk5", 0, 0);
        fake.set_counters("disk2", 0, 0);
        s.tick(t(0));

        fake.set_counters("disk4", 4 * MB, 0);
        fake.set_counters("disk5", 3 * MB, 0);
        let snap = s.tick(t(2));

        assert_eq!(snap.rows.len(), 2);
        let group = &snap.rows[0];
        assert!(group.is_group());
        assert_eq!(group.name, "Backup (disk4, disk5)");
        assert_eq!(group.read_bytes_per_sec, 3_500_000.0);
        assert_eq!(group.temperature, None);
        assert_eq!(group.capacity_bytes, 4_000);
        assert_eq!(snap.find("disk4").unwrap().read_bytes_per_sec, 2_000_000.0);
        assert_eq!(snap.find("disk5").unwrap().read_bytes_per_sec, 1_500_000.0);
        assert_eq!(snap.rows[1].id, "disk2");
    }

    #[test]
    fn raid_member_missing_once_stays_in_group() {
        let fake = Fake::default();
        let set = |ids: &[&str]| Topology {
            devices:     ids.iter().map(|id| DeviceInfo::new(*id, *id, 10)).collect(),
            raid_groups: vec![RaidGroup::new("md0", "md0 raid1", vec!["sdb".into(), "sdc".into()])],
        };
        fake.with(|w| w.topology = Some(Ok(set(&["sdb", "sdc"]))));
        let mut s = scheduler(&fake);
        s.tick(t(0));

        fake.with(|w| w.topology = Some(Ok(set(&["sdb"]))));
        let snap = s.tick(t(2));
        assert_eq!(snap.rows.len(), 1);
        assert_eq!(snap.rows[0].members.len(), 2);

        let snap = s.tick(t(4));
        assert_eq!(snap.rows.len(), 1);
        assert_eq!(snap.rows[0].members.len(), 1);
    }

    #[test]
    fn missing_temperature_is_none_not_zero() {
        let fake = Fake::default();
        fake.attach(&["disk4", "disk5"]);
        fake.with(|w| {
            w.temps.insert("disk4".into(), Ok(Some(0)));
            w.temps.insert("disk5".into(), Err(ProbeError::permission_denied("need root")));
        });
        let mut s = scheduler(&fake);
        let snap = s.tick(t(0));
        assert_eq!(snap.find("disk4").unwrap().temperature, Some(0));
        assert_eq!(snap.find("disk5").unwrap().temperature, None);
    }

    #[test]
    fn missing_tool_disables_temperature_probing() {
        let fake = Fake::default();
        fake.attach(&["disk4"]);
        fake.with(|w| { w.temps.insert("disk4".into(), Err(ProbeError::unavailable("`smartctl` not found"))); });
        let mut s = scheduler(&fake);

        for secs in 0..7 {
            let snap = s.tick(t(secs * 2));
            assert_eq!(snap.find("disk4").unwrap().temperature, None);
            assert!(snap.notice.as_deref().unwrap().contains("temperatures unavailable"));
        }
        assert_eq!(fake.with(|w| w.temp_calls), 1);
    }

    #[test]
    fn temperature_probed_every_n_ticks_and_on_attach() {
        let fake = Fake::default();
        fake.attach(&["disk4"]);
        fake.with(|w| { w.temps.insert("disk4".into(), Ok(Some(40))); });
        let mut s = scheduler(&fake);

        s.tick(t(0));
        s.tick(t(2));
        assert_eq!(fake.with(|w| w.temp_calls), 1);

        // New device mid-cycle is probed right away.
        fake.attach(&["disk4", "disk5"]);
        s.tick(t(4));
        assert_eq!(fake.with(|w| w.temp_calls), 2);

        // Tick 4 is due again (every 3): both devices.
        let snap = s.tick(t(6));
        assert_eq!(fake.with(|w| w.temp_calls), 4);
        assert_eq!(snap.find("disk4").unwrap().temperature, Some(40));
    }

    #[test]
    fn temperatures_switched_off_are_never_probed() {
        let fake = Fake::default();
        fake.attach(&["disk4"]);
        let mut s = Scheduler::new(SchedulerConfig { temperatures: false, ..config() }, fake.probes());
        let snap = s.tick(t(0));
        assert_eq!(fake.with(|w| w.temp_calls), 0);
        assert_eq!(snap.find("disk4").unwrap().temperature, None);
        assert_eq!(snap.notice, None);
    }

    #[test]
    fn transient_temperature_failure_keeps_last_value() {
        let fake = Fake::default();
        fake.attach(&["disk4"]);
        fake.with(|w| { w.temps.insert("disk4".into(), Ok(Some(45))); });
        let mut s = Scheduler::new(SchedulerConfig { temperature_every: 1, ..config() }, fake.probes());
        s.tick(t(0));

        fake.with(|w| {
            w.temps.insert("disk4".into(), Err(ProbeError::Timeout {
                command: "smartctl".into(),
                elapsed: Duration::from_secs(3),
            }));
        });
        let snap = s.tick(t(2));
        assert_eq!(snap.find("disk4").unwrap().temperature, Some(45));
    }

    #[test]
    fn exclusions_and_aliases_apply() {
        let fake = Fake::default();
        fake.attach(&["disk4", "disk9"]);
        let mut devices = DevicesConfig::default();
        devices.exclude.push("disk9*".into());
        devices.aliases.insert("disk4".into(), "photos".into());
        let mut s = Scheduler::new(SchedulerConfig { devices, ..config() }, fake.probes());

        let snap = s.tick(t(0));
        assert_eq!(snap.rows.len(), 1);
        assert_eq!(snap.rows[0].name, "photos");
    }

    #[test]
    fn run_publishes_until_shutdown() {
        let fake = Fake::default();
        fake.attach(&["disk4"]);
        let shutdown = Arc::new(AtomicBool::new(false));
        let (rx, handle) = scheduler(&fake).spawn(shutdown.clone()).unwrap();

        let a = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        let b = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(b.tick > a.tick);

        shutdown.store(true, Ordering::Relaxed);
        handle.join().unwrap();
    }

    #[test]
    fn run_stops_when_receiver_dropped() {
        let fake = Fake::default();
        let shutdown = Arc::new(AtomicBool::new(false));
        let (rx, handle) = scheduler(&fake).spawn(shutdown).unwrap();
        drop(rx);
        handle.join().unwrap();
    }
}
