use anyhow::{bail, Result};

use crate::hand::{Hand, FINGER_SLOTS};
use crate::vector::Vector;

/// 指数移動平均にもとづく1ステップ外挿
///
/// 履歴 (古い順) の EMA を最新の観測から過去へ向かって畳み込み、
/// predicted = current + (current - ema) で次フレームを推定する。
/// 最新の観測は初期値としてだけ使い、更新ループには入れない
pub struct HandPredictor {
    weight: f64,
}

impl HandPredictor {
    pub fn new(weight: f64) -> Result<Self> {
        if weight <= 0.0 || weight >= 1.0 {
            bail!("prediction weight {} must lie inside (0, 1)", weight);
        }
        Ok(Self { weight })
    }

    /// 履歴全体の EMA
    pub fn ema(&self, values: &[Vector]) -> Option<Vector> {
        let last = *values.last()?;
        let mut e = last;
        for v in values[..values.len() - 1].iter().rev() {
            e = *v * self.weight + e * (1.0 - self.weight);
        }
        Some(e)
    }

    /// 1成分ぶんの外挿
    pub fn predict_vector(&self, values: &[Vector]) -> Option<Vector> {
        let current = *values.last()?;
        let e = self.ema(values)?;
        Some(current + (current - e))
    }

    /// 手の履歴 (古い順) から次の手を推定する
    ///
    /// position / direction をスロットごとに独立して外挿する。
    /// bisect は最新の観測値をそのまま引き継ぐ
    pub fn predict(&self, history: &[Hand]) -> Option<Hand> {
        let last = history.last()?;
        let mut predicted = last.clone();
        for slot in 0..FINGER_SLOTS {
            let positions: Vec<Vector> = history.iter().map(|h| h.fingers[slot].position).collect();
            let directions: Vec<Vector> =
                history.iter().map(|h| h.fingers[slot].direction).collect();
            predicted.fingers[slot].position = self.predict_vector(&positions)?;
            predicted.fingers[slot].direction = self.predict_vector(&directions)?;
        }
        Some(predicted)
    }
}
