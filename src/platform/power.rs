//! Battery charge via the `battery` crate.

use crate::core::system_monitor::{BatteryInfo, SourceError, SourceResult};

/// Charge and power state of the first battery.
pub fn read_battery() -> SourceResult<BatteryInfo> {
    let manager = ::battery::Manager::new()
        .map_err(|e| SourceError::unavailable(format!("battery API unavailable: {}", e)))?;
    let mut batteries = manager
        .batteries()
        .map_err(|e| SourceError::failed(format!("failed to list batteries: {}", e)))?;

    let battery = match batteries.next() {
        Some(Ok(battery)) => battery,
        Some(Err(e)) => return Err(SourceError::failed(format!("failed to read battery: {}", e))),
        None => return Err(SourceError::unavailable("no battery")),
    };

    let percent = battery
        .state_of_charge()
        .get::<::battery::units::ratio::percent>();

    Ok(BatteryInfo {
        percent,
        plugged: battery.state() != ::battery::State::Discharging,
    })
}
