//! OS probes. Every external call lives here, behind the three probe
//! traits the scheduler drives.

pub mod command;
pub mod diskstats;
pub mod diskutil;
pub mod ioreg;
pub mod lsblk;
pub mod mdraid;
pub mod smart;

use crate::error::{ProbeError, ProbeResult};
use crate::models::device::{Celsius, Counters, Topology};
use std::collections::HashMap;
use std::time::Duration;

/// Lists attached external devices and RAID sets (static attributes only).
pub trait DeviceProbe {
    fn list_external_devices(&mut self) -> ProbeResult<Topology>;
}

/// Reads cumulative byte counters. Ids missing from the returned map had
/// no reading this time.
pub trait CounterProbe {
    fn read_counters(&mut self, ids: &[String]) -> ProbeResult<HashMap<String, Counters>>;
}

/// `Ok(None)` means the device answered but exposes no temperature.
pub trait TemperatureProbe {
    fn read_temperature(&mut self, device_id: &str) -> ProbeResult<Option<Celsius>>;
}

/// The probe set one scheduler owns.
pub struct Probes {
    pub devices:     Box<dyn DeviceProbe + Send>,
    pub counters:    Box<dyn CounterProbe + Send>,
    pub temperature: Box<dyn TemperatureProbe + Send>,
}

/// Probes for the platform we were built for.
pub fn system_probes(timeout: Duration) -> Probes {
    #[cfg(target_os = "macos")]
    {
        Probes {
            devices:     Box::new(diskutil::DiskutilProbe::new(timeout)),
            counters:    Box::new(ioreg::IoregProbe::new(timeout)),
            temperature: Box::new(smart::SmartctlProbe::new(timeout)),
        }
    }
    #[cfg(target_os = "linux")]
    {
        Probes {
            devices:     Box::new(lsblk::LsblkProbe::new(timeout)),
            counters:    Box::new(diskstats::DiskstatsProbe),
            temperature: Box::new(smart::SmartctlProbe::new(timeout)),
        }
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        Probes {
            devices:     Box::new(Unsupported),
            counters:    Box::new(Unsupported),
            temperature: Box::new(smart::SmartctlProbe::new(timeout)),
        }
    }
}

/// Stand-in for platforms without a device or counter source.
pub struct Unsupported;

impl DeviceProbe for Unsupported {
    fn list_external_devices(&mut self) -> ProbeResult<Topology> {
        Err(ProbeError::unavailable(format!("no device listing on {}", std::env::consts::OS)))
    }
}

impl CounterProbe for Unsupported {
    fn read_counters(&mut self, _ids: &[String]) -> ProbeResult<HashMap<String, Counters>> {
        Err(ProbeError::unavailable(format!("no I/O counters on {}", std::env::consts::OS)))
    }
}
