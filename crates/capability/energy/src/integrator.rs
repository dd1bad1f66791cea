//! 能量积分器。
//!
//! 连续两个有效采样之间按梯形法积分；采样间隔超过上限时放弃连续性，
//! 把新采样当作首个采样重新锚定。缺失的采样完全不触碰积分器状态。

use chrono::{DateTime, Utc};

/// 两个采样之间允许的最大间隔（秒）。超过即视为序列断裂。
pub const MAX_SAMPLE_GAP_SECS: f64 = 10.0;

/// 单向能量积分器（瓦 → 瓦时累计）。
#[derive(Debug, Clone, Default)]
pub struct EnergyIntegrator {
    total_wh: f64,
    last: Option<(f64, DateTime<Utc>)>,
}

impl EnergyIntegrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 喂入一个有效采样。
    ///
    /// 若存在上一采样且 `0 < Δt ≤ MAX_SAMPLE_GAP_SECS`，累加梯形
    /// `(p + p_prev) / 2 · Δt`；否则只把本采样记为新的锚点。
    pub fn update_power(&mut self, power_w: f64, at: DateTime<Utc>) {
        if let Some((prev_w, prev_at)) = self.last {
            let delta_secs = (at - prev_at).num_milliseconds() as f64 / 1000.0;
            if delta_secs > 0.0 && delta_secs <= MAX_SAMPLE_GAP_SECS {
                self.total_wh += (power_w + prev_w) / 2.0 * delta_secs / 3600.0;
            }
        }
        self.last = Some((power_w, at));
    }

    /// 累计瓦时。
    pub fn value_wh(&self) -> f64 {
        self.total_wh
    }

    /// 是否已经锚定过至少一个有效采样。
    pub fn has_samples(&self) -> bool {
        self.last.is_some() || self.total_wh != 0.0
    }

    /// 序列断裂（采样值缺失）：丢弃锚点，累计保留。
    /// 下一个有效采样会被当作首个采样，不产生积分步。
    pub fn invalidate_anchor(&mut self) {
        self.last = None;
    }

    /// 清空所有状态。
    pub fn reset(&mut self) {
        self.total_wh = 0.0;
        self.last = None;
    }
}

/// 双向能量积分器：按符号拆成两个共享时间轴的单向积分器。
///
/// 每次有效采样都会同时驱动两半（异号的一半喂 0），保证符号长期
/// 不变时另一半的时间轴不会停滞。
#[derive(Debug, Clone, Default)]
pub struct BidirectionalIntegrator {
    positive: EnergyIntegrator,
    negative: EnergyIntegrator,
}

impl BidirectionalIntegrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 喂入一个带符号的有效采样。
    pub fn update_power(&mut self, power_w: f64, at: DateTime<Utc>) {
        if power_w > 0.0 {
            self.positive.update_power(power_w, at);
            self.negative.update_power(0.0, at);
        } else if power_w < 0.0 {
            self.negative.update_power(-power_w, at);
            self.positive.update_power(0.0, at);
        } else {
            self.positive.update_power(0.0, at);
            self.negative.update_power(0.0, at);
        }
    }

    /// 正向累计瓦时。
    pub fn positive_wh(&self) -> f64 {
        self.positive.value_wh()
    }

    /// 负向累计瓦时（按绝对值累计）。
    pub fn negative_wh(&self) -> f64 {
        self.negative.value_wh()
    }

    pub fn has_samples(&self) -> bool {
        self.positive.has_samples() || self.negative.has_samples()
    }

    /// 序列断裂：两半同时丢弃锚点。
    pub fn invalidate_anchor(&mut self) {
        self.positive.invalidate_anchor();
        self.negative.invalidate_anchor();
    }

    pub fn reset(&mut self) {
        self.positive.reset();
        self.negative.reset();
    }
}
