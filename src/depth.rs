use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// 深度ピクセルの分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pixel {
    /// 距離が閾値内
    InRange,
    /// 距離が閾値外
    OutOfRange,
    /// センサーが値を返さなかった (マスク処理では生成しない)
    Undefined,
}

/// 深度の閾値ウィンドウ (mm)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceThreshold {
    pub min: i16,
    pub max: i16,
}

impl DistanceThreshold {
    pub fn new(min: i16, max: i16) -> Result<Self> {
        if min >= max {
            bail!("distance threshold min {} must be below max {}", min, max);
        }
        Ok(Self { min, max })
    }

    /// 両端は排他。min < d < max のときだけ InRange
    pub fn classify(&self, distance: i16) -> Pixel {
        if self.min < distance && distance < self.max {
            Pixel::InRange
        } else {
            Pixel::OutOfRange
        }
    }
}

/// 1フレーム分の範囲マスク (行優先)
pub struct DepthMask {
    pixels: Vec<Pixel>,
    width: i32,
    height: i32,
}

impl DepthMask {
    /// 生の距離バッファを閾値処理してマスクを作る
    pub fn from_distances(
        distances: &[i16],
        width: u32,
        height: u32,
        threshold: DistanceThreshold,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            bail!("invalid frame size {}x{}", width, height);
        }
        if distances.len() != (width as usize) * (height as usize) {
            bail!(
                "distance buffer length {} does not match frame {}x{}",
                distances.len(),
                width,
                height
            );
        }
        let pixels = distances.iter().map(|&d| threshold.classify(d)).collect();
        Ok(Self {
            pixels,
            width: width as i32,
            height: height as i32,
        })
    }

    /// 既に分類済みのピクセル列から作る (外部プロデューサー用)
    pub fn from_pixels(pixels: Vec<Pixel>, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            bail!("invalid frame size {}x{}", width, height);
        }
        if pixels.len() != (width as usize) * (height as usize) {
            bail!(
                "pixel buffer length {} does not match frame {}x{}",
                pixels.len(),
                width,
                height
            );
        }
        Ok(Self {
            pixels,
            width: width as i32,
            height: height as i32,
        })
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// 画像外の座標は OutOfRange として読める
    pub fn get(&self, x: i32, y: i32) -> Pixel {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return Pixel::OutOfRange;
        }
        self.pixels[(y * self.width + x) as usize]
    }

    /// InRange 判定。Undefined は範囲外扱い
    pub fn is_in_range(&self, x: i32, y: i32) -> bool {
        self.get(x, y) == Pixel::InRange
    }
}
