use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::curve::CurvePoint;
use crate::depth::DepthMask;
use crate::vector::Vector;

/// 連続した曲率点とみなす距離 (ピクセル)
const CONTINUATION: f64 = 5.0;

/// 二等分方向に伸ばして内外を判定する距離 (ピクセル)
const PROBE_DISTANCE: f64 = 25.0;

/// 指先認識のパラメータ
#[derive(Debug, Clone, Deserialize)]
pub struct FingerParams {
    /// セグメントとして採用する最小の曲率点数
    #[serde(default)]
    pub min_pixels_per_segment: usize,
}

impl Default for FingerParams {
    fn default() -> Self {
        Self {
            min_pixels_per_segment: 0,
        }
    }
}

/// 認識された指先
///
/// bisect は二等分方向に伸ばした探査点。シルエットの外に出た位置
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fingertip {
    pub position: Vector,
    pub direction: Vector,
    pub bisect: Vector,
}

/// 曲率点の並びから指先を取り出す
pub struct FingerRecognizer {
    min_pixels_per_segment: usize,
}

impl FingerRecognizer {
    pub fn new(params: &FingerParams) -> Self {
        Self {
            min_pixels_per_segment: params.min_pixels_per_segment,
        }
    }

    pub fn recognize(&self, curves: &[CurvePoint], mask: &DepthMask) -> Vec<Fingertip> {
        if curves.is_empty() {
            return Vec::new();
        }

        let rotated = rotate_for_wrap(curves);

        let mut tips = Vec::new();
        let mut run: Vec<&CurvePoint> = vec![rotated[0]];
        for &cp in &rotated[1..] {
            if is_continuation(&cp.point, &run[run.len() - 1].point) {
                run.push(cp);
            } else {
                self.flush_run(&run, mask, &mut tips);
                run.clear();
                run.push(cp);
            }
        }
        self.flush_run(&run, mask, &mut tips);

        debug!(fingertips = tips.len(), curves = curves.len(), "finger pass");
        tips
    }

    /// セグメントの中央の点を指先候補として判定する
    fn flush_run(&self, run: &[&CurvePoint], mask: &DepthMask, tips: &mut Vec<Fingertip>) {
        if run.len() < self.min_pixels_per_segment {
            return;
        }
        let midpoint = run[run.len() / 2];
        if let Some(tip) = classify(midpoint, mask) {
            tips.push(tip);
        }
    }
}

/// 指先は二等分方向に伸ばすとシルエットの外に出る。
/// 谷 (指の股) は内側に入るので落ちる
fn classify(cp: &CurvePoint, mask: &DepthMask) -> Option<Fingertip> {
    let probe = cp.point + Vector::bisect(cp.seg_a, cp.seg_b) * PROBE_DISTANCE;
    if mask.is_in_range(probe.x as i32, probe.y as i32) {
        return None;
    }
    Some(Fingertip {
        position: cp.point,
        direction: cp.seg_c * 0.5 - cp.seg_b,
        bisect: probe,
    })
}

fn is_continuation(a: &Vector, b: &Vector) -> bool {
    (a.x - b.x).abs() < CONTINUATION && (a.y - b.y).abs() < CONTINUATION
}

/// 末尾と先頭がつながっている場合、巻き込んだ並びの先頭から始まるよう回転する
fn rotate_for_wrap(curves: &[CurvePoint]) -> Vec<&CurvePoint> {
    let len = curves.len();
    if len > 1 && is_continuation(&curves[len - 1].point, &curves[0].point) {
        let mut start = len - 1;
        while start > 0 && is_continuation(&curves[start - 1].point, &curves[start].point) {
            start -= 1;
        }
        curves[start..].iter().chain(curves[..start].iter()).collect()
    } else {
        curves.iter().collect()
    }
}
