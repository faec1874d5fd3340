use anyhow::{bail, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::contour::ContourParams;
use crate::curve::CurveParams;
use crate::finger::FingerParams;
use crate::gesture::DtwParams;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub depth: DepthConfig,
    #[serde(default)]
    pub contour: ContourParams,
    #[serde(default)]
    pub curve: CurveParams,
    #[serde(default)]
    pub finger: FingerParams,
    #[serde(default)]
    pub smooth: SmoothConfig,
    #[serde(default)]
    pub enhance: EnhanceConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub dtw: DtwParams,
}

/// 深度の閾値ウィンドウ (mm)
#[derive(Debug, Deserialize, Clone)]
pub struct DepthConfig {
    #[serde(default = "default_depth_min")]
    pub min: i16,
    #[serde(default = "default_depth_max")]
    pub max: i16,
}

fn default_depth_min() -> i16 {
    800
}
fn default_depth_max() -> i16 {
    4000
}

impl Default for DepthConfig {
    fn default() -> Self {
        Self {
            min: default_depth_min(),
            max: default_depth_max(),
        }
    }
}

/// 平滑化
#[derive(Debug, Deserialize, Clone)]
pub struct SmoothConfig {
    #[serde(default = "default_smooth_enabled")]
    pub enabled: bool,
    /// 平滑化係数 (0, 1)
    #[serde(default = "default_smooth_factor")]
    pub factor: f64,
}

fn default_smooth_enabled() -> bool {
    true
}
fn default_smooth_factor() -> f64 {
    0.5
}

impl Default for SmoothConfig {
    fn default() -> Self {
        Self {
            enabled: default_smooth_enabled(),
            factor: default_smooth_factor(),
        }
    }
}

/// 指本数の一貫性補修
#[derive(Debug, Deserialize, Clone)]
pub struct EnhanceConfig {
    #[serde(default = "default_enhance_enabled")]
    pub enabled: bool,
    /// 予測に使うEMAの重み (0, 1)
    #[serde(default = "default_prediction_weight")]
    pub prediction_weight: f64,
    /// 本数の変化を信用するまでに保留するフレーム数
    #[serde(default = "default_frame_limit")]
    pub frame_limit: usize,
}

fn default_enhance_enabled() -> bool {
    true
}
fn default_prediction_weight() -> f64 {
    0.8
}
fn default_frame_limit() -> usize {
    10
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            enabled: default_enhance_enabled(),
            prediction_weight: default_prediction_weight(),
            frame_limit: default_frame_limit(),
        }
    }
}

/// ジェスチャーストリーム
#[derive(Debug, Deserialize, Clone)]
pub struct StreamConfig {
    #[serde(default = "default_stream_capacity")]
    pub capacity: usize,
}

fn default_stream_capacity() -> usize {
    40
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            capacity: default_stream_capacity(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// パラメータ範囲の検査。境界で早めに落とす
    pub fn validate(&self) -> Result<()> {
        if self.depth.min >= self.depth.max {
            bail!(
                "depth window min {} must be below max {}",
                self.depth.min,
                self.depth.max
            );
        }
        if self.contour.rows_to_skip == 0 {
            bail!("contour rows_to_skip must be at least 1");
        }
        if !(0.0..1.0).contains(&self.contour.scan_height_offset) {
            bail!(
                "contour scan_height_offset {} must lie in [0, 1)",
                self.contour.scan_height_offset
            );
        }
        if self.curve.k == 0 {
            bail!("curvature k must be at least 1");
        }
        if self.curve.min_angle < 0.0 || self.curve.min_angle >= self.curve.max_angle {
            bail!(
                "curvature angle window [{}, {}] is invalid",
                self.curve.min_angle,
                self.curve.max_angle
            );
        }
        if self.smooth.factor <= 0.0 || self.smooth.factor >= 1.0 {
            bail!(
                "smoothing factor {} must lie inside (0, 1)",
                self.smooth.factor
            );
        }
        if self.enhance.prediction_weight <= 0.0 || self.enhance.prediction_weight >= 1.0 {
            bail!(
                "prediction weight {} must lie inside (0, 1)",
                self.enhance.prediction_weight
            );
        }
        if self.stream.capacity == 0 {
            bail!("gesture stream capacity must be at least 1");
        }
        if self.dtw.path_cost_threshold <= 0.0 || self.dtw.frame_distance_threshold <= 0.0 {
            bail!("dtw thresholds must be positive");
        }
        Ok(())
    }
}
