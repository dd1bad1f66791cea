//! 应用共享状态。

use fronius_collector::Collector;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub collector: Arc<Collector>,
}
