//! 分钟报文的快照台账。
//!
//! 报告增量 = round(当前累计 − 上次快照)；快照按取整后的增量推进，
//! 而不是直接替换成当前值。这样取整误差不会累积，且已报告增量之和
//! 恒等于快照的净推进量。

/// 一次读数：六个累计量（瓦时，缺数据按 0 处理）。
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EnergyTotals {
    pub solar_wh: f64,
    pub battery_in_wh: f64,
    pub battery_out_wh: f64,
    pub grid_in_wh: f64,
    pub grid_out_wh: f64,
    pub load_wh: f64,
}

/// 一分钟的取整增量（瓦时）。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnergyDeltas {
    pub solar_wh: i64,
    pub battery_in_wh: i64,
    pub battery_out_wh: i64,
    pub grid_in_wh: i64,
    pub grid_out_wh: i64,
    pub load_wh: i64,
}

/// 快照台账。
#[derive(Debug, Clone, Default)]
pub struct SnapshotLedger {
    last: Option<EnergyTotals>,
}

impl SnapshotLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// 推进台账。
    ///
    /// 首次调用只存快照并返回 None（引导期）；之后返回取整增量，
    /// 并把快照推进 `last + delta`。
    pub fn advance(&mut self, current: EnergyTotals) -> Option<EnergyDeltas> {
        let Some(last) = self.last else {
            self.last = Some(current);
            return None;
        };

        let deltas = EnergyDeltas {
            solar_wh: (current.solar_wh - last.solar_wh).round() as i64,
            battery_in_wh: (current.battery_in_wh - last.battery_in_wh).round() as i64,
            battery_out_wh: (current.battery_out_wh - last.battery_out_wh).round() as i64,
            grid_in_wh: (current.grid_in_wh - last.grid_in_wh).round() as i64,
            grid_out_wh: (current.grid_out_wh - last.grid_out_wh).round() as i64,
            load_wh: (current.load_wh - last.load_wh).round() as i64,
        };
        self.last = Some(EnergyTotals {
            solar_wh: last.solar_wh + deltas.solar_wh as f64,
            battery_in_wh: last.battery_in_wh + deltas.battery_in_wh as f64,
            battery_out_wh: last.battery_out_wh + deltas.battery_out_wh as f64,
            grid_in_wh: last.grid_in_wh + deltas.grid_in_wh as f64,
            grid_out_wh: last.grid_out_wh + deltas.grid_out_wh as f64,
            load_wh: last.load_wh + deltas.load_wh as f64,
        });
        Some(deltas)
    }

    /// 当前快照（引导前为 None）。
    pub fn last(&self) -> Option<EnergyTotals> {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals(solar: f64) -> EnergyTotals {
        EnergyTotals {
            solar_wh: solar,
            ..EnergyTotals::default()
        }
    }

    #[test]
    fn first_advance_bootstraps() {
        let mut ledger = SnapshotLedger::new();
        assert_eq!(ledger.advance(totals(10.0)), None);
        assert_eq!(ledger.last(), Some(totals(10.0)));
    }

    #[test]
    fn deltas_are_rounded_and_snapshot_advances_by_delta() {
        let mut ledger = SnapshotLedger::new();
        ledger.advance(totals(0.0));
        let deltas = ledger.advance(totals(10.4)).expect("delta");
        assert_eq!(deltas.solar_wh, 10);
        // 快照推进到 10，而不是 10.4
        assert_eq!(ledger.last().expect("snapshot").solar_wh, 10.0);
        // 残差 0.4 进入下一分钟
        let deltas = ledger.advance(totals(20.8)).expect("delta");
        assert_eq!(deltas.solar_wh, 11);
        assert_eq!(ledger.last().expect("snapshot").solar_wh, 21.0);
    }

    #[test]
    fn reported_deltas_sum_to_snapshot_movement() {
        // 漂移性质：任意序列下 Σ增量 == 最终快照 − 初始快照
        let mut ledger = SnapshotLedger::new();
        let series = [0.0, 3.2, 7.9, 8.1, 15.6, 15.6, 23.49];
        ledger.advance(totals(series[0]));
        let initial = ledger.last().expect("initial").solar_wh;
        let mut reported = 0_i64;
        for value in &series[1..] {
            reported += ledger.advance(totals(*value)).expect("delta").solar_wh;
        }
        let movement = ledger.last().expect("final").solar_wh - initial;
        assert_eq!(reported as f64, movement);
    }
}
