pub mod data;
pub mod events;
pub mod metrics;
pub mod report;
pub mod time;

pub use data::{
    BatteryInfo, DeviceSnapshot, DiscoveredDevice, EnergyCounters, Fault, InverterInfo, MeterInfo,
    MeterLocation, Sample,
};
pub use events::{
    Event, HeartbeatStatus, InverterHeartbeat, PushTestResult, ScanState, ScanStatus, SiteUpdate,
};
pub use metrics::{
    BatteryBlock, GridBlock, InverterMetrics, PowerBlock, SiteBlock, SiteFault, SiteMetrics,
};
pub use report::MinutelyReport;
