use anyhow::{bail, Result};
use serde::Deserialize;
use tracing::debug;

use crate::vector::Vector;

/// k曲率のパラメータ (角度は度で指定)
#[derive(Debug, Clone, Deserialize)]
pub struct CurveParams {
    /// 前後に何ピクセル離れた点と比較するか
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default = "default_min_angle")]
    pub min_angle: f64,
    #[serde(default = "default_max_angle")]
    pub max_angle: f64,
}

fn default_k() -> usize {
    20
}
fn default_min_angle() -> f64 {
    25.0
}
fn default_max_angle() -> f64 {
    55.0
}

impl Default for CurveParams {
    fn default() -> Self {
        Self {
            k: default_k(),
            min_angle: default_min_angle(),
            max_angle: default_max_angle(),
        }
    }
}

/// 曲率条件を満たした輪郭点
///
/// seg_a / seg_b は kステップ前後の点から自点へ向かうベクトル。
/// 指先では両方とも輪郭の外側を向く
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurvePoint {
    pub point: Vector,
    pub seg_a: Vector,
    pub seg_b: Vector,
    pub seg_c: Vector,
}

/// 閉じた点列に対する k曲率検出器
pub struct CurveDetector {
    k: usize,
    /// ラジアンに変換済み
    min_angle: f64,
    max_angle: f64,
}

impl CurveDetector {
    pub fn new(params: &CurveParams) -> Result<Self> {
        if params.k == 0 {
            bail!("curvature k must be at least 1");
        }
        if params.min_angle < 0.0 || params.min_angle >= params.max_angle {
            bail!(
                "curvature angle window [{}, {}] is invalid",
                params.min_angle,
                params.max_angle
            );
        }
        Ok(Self {
            k: params.k,
            min_angle: params.min_angle.to_radians(),
            max_angle: params.max_angle.to_radians(),
        })
    }

    /// 角度が窓に入った点だけを CurvePoint として返す
    pub fn detect(&self, contour: &[Vector]) -> Vec<CurvePoint> {
        let len = contour.len();
        if len == 0 {
            return Vec::new();
        }

        // 輪郭の両端が隣接していれば閉曲線としてインデックスを回す
        let gap = contour[len - 1] - contour[0];
        let limit = (self.k + 1) as f64;
        let wraps = gap.x.abs() <= limit && gap.y.abs() <= limit;

        let mut curves = Vec::new();
        for i in 0..len {
            let back = if i >= self.k {
                i - self.k
            } else if wraps {
                (i as isize - self.k as isize).rem_euclid(len as isize) as usize
            } else {
                0
            };
            let forward = if i + self.k < len {
                i + self.k
            } else if wraps {
                (i + self.k) % len
            } else {
                len - 1
            };

            let seg_a = contour[i] - contour[back];
            let seg_b = contour[i] - contour[forward];
            let seg_c = seg_b - seg_a;
            let theta = Vector::theta(seg_a, seg_b);
            if theta >= self.min_angle && theta <= self.max_angle {
                curves.push(CurvePoint {
                    point: contour[i],
                    seg_a,
                    seg_b,
                    seg_c,
                });
            }
        }
        debug!(curves = curves.len(), contour = len, "curvature pass");
        curves
    }
}
