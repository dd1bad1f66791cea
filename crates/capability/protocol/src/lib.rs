//! Fronius Solar API v1 客户端
//!
//! 轮询 GetPowerFlowRealtimeData 获取瞬时功率流，发现期间探测
//! GetAPIVersion / GetInverterInfo / GetStorageRealtimeData /
//! GetMeterRealtimeData 获取身份与能力记录。

pub mod client;
pub mod error;
pub mod parse;
pub mod types;

pub use client::{SolarApiClient, POWER_FLOW_TIMEOUT, PROBE_TIMEOUT};
pub use error::ProtocolError;
pub use types::{InverterInfoReading, PowerFlowReading};
