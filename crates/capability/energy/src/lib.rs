//! 功率积分：梯形法把瞬时功率序列积成瓦时，外加分钟报文用的快照台账。

pub mod integrator;
pub mod ledger;

pub use integrator::{BidirectionalIntegrator, EnergyIntegrator, MAX_SAMPLE_GAP_SECS};
pub use ledger::{EnergyDeltas, EnergyTotals, SnapshotLedger};
