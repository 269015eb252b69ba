// Platform-specific metric collection

mod gpu_probe;
mod power;
mod sensors;
mod sysinfo_source;

pub use gpu_probe::detect_gpus;
pub use power::read_battery;
pub use sensors::read_fans;
pub use sysinfo_source::SysinfoSource;
