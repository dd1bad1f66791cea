//! 站点状态：逆变器集合、聚合快照、滚动历史与分钟报文生成。

pub mod inverter;
pub mod site;

pub use inverter::Inverter;
pub use site::{Site, HISTORY_CAPACITY, HISTORY_WINDOW_SECS, MINUTELY_HISTORY_DEPTH};
