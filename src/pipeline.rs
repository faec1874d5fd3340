use anyhow::Result;
use tracing::debug;

use crate::config::Config;
use crate::contour::ContourTracker;
use crate::curve::{CurveDetector, CurvePoint};
use crate::depth::{DepthMask, DistanceThreshold};
use crate::finger::{FingerRecognizer, Fingertip};
use crate::hand::{Hand, FINGER_SLOTS};
use crate::tracker::enhance::ConsistencyEnhancer;
use crate::tracker::smooth::HandSmoother;
use crate::vector::Vector;

/// 1フレームの処理結果
///
/// 各ステージの出力をまとめて返す。forwarded が下流 (認識) に
/// 渡すべき手で、保留中は空、補修時は複数になる
pub struct FrameAnalysis {
    pub contour: Vec<Vector>,
    pub curves: Vec<CurvePoint>,
    pub fingertips: Vec<Fingertip>,
    pub hand: Hand,
    pub forwarded: Vec<Hand>,
    pub fixed_inconsistencies: bool,
}

/// 深度フレームから手を組み立てる毎フレームの駆動部
///
/// マスク → 輪郭 → 曲率 → 指先 → 手 → 平滑化 → 一貫性補修 の順。
/// トラッカーの状態はフレーム間で使い回す
pub struct FramePipeline {
    threshold: DistanceThreshold,
    contour: ContourTracker,
    curves: CurveDetector,
    fingers: FingerRecognizer,
    smoother: Option<HandSmoother>,
    enhancer: Option<ConsistencyEnhancer>,
}

impl FramePipeline {
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        let smoother = if config.smooth.enabled {
            Some(HandSmoother::from_config(&config.smooth)?)
        } else {
            None
        };
        let enhancer = if config.enhance.enabled {
            Some(ConsistencyEnhancer::from_config(&config.enhance)?)
        } else {
            None
        };
        Ok(Self {
            threshold: DistanceThreshold::new(config.depth.min, config.depth.max)?,
            contour: ContourTracker::new(config.contour.clone()),
            curves: CurveDetector::new(&config.curve)?,
            fingers: FingerRecognizer::new(&config.finger),
            smoother,
            enhancer,
        })
    }

    /// 深度フレーム1枚を処理する
    ///
    /// distances は行優先で width * height 要素
    pub fn process(&mut self, distances: &[i16], width: u32, height: u32) -> Result<FrameAnalysis> {
        let mask = DepthMask::from_distances(distances, width, height, self.threshold)?;

        let contour = self.contour.track(&mask);
        let curves = self.curves.detect(&contour);
        let mut fingertips = self.fingers.recognize(&curves, &mask);
        fingertips.truncate(FINGER_SLOTS);

        let mut hand = Hand::from_fingertips(&fingertips);
        if let Some(smoother) = &mut self.smoother {
            hand = smoother.apply(hand);
        }
        let (forwarded, fixed_inconsistencies) = match &mut self.enhancer {
            Some(enhancer) => {
                let forwarded = enhancer.process(hand.clone());
                (forwarded, enhancer.fixed_inconsistencies())
            }
            None => (vec![hand.clone()], false),
        };

        debug!(
            contour = contour.len(),
            curves = curves.len(),
            fingertips = fingertips.len(),
            forwarded = forwarded.len(),
            "frame processed"
        );
        Ok(FrameAnalysis {
            contour,
            curves,
            fingertips,
            hand,
            forwarded,
            fixed_inconsistencies,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth;

    fn pipeline_without_history() -> FramePipeline {
        // 平滑化・補修なしで単フレームの挙動を見る
        let mut config = Config::default();
        config.smooth.enabled = false;
        config.enhance.enabled = false;
        FramePipeline::new(&config).unwrap()
    }

    #[test]
    fn test_frame_validation() {
        let mut p = pipeline_without_history();
        assert!(p.process(&[0; 10], 5, 3).is_err());
        assert!(p.process(&[0; 15], 0, 15).is_err());
    }

    #[test]
    fn test_empty_frame_gives_empty_hand() {
        let mut p = pipeline_without_history();
        let distances = vec![0i16; 64 * 48];
        let analysis = p.process(&distances, 64, 48).unwrap();
        assert!(analysis.contour.is_empty());
        assert!(analysis.curves.is_empty());
        assert!(analysis.fingertips.is_empty());
        assert_eq!(analysis.hand.finger_count(), 0);
        assert_eq!(analysis.hand.fingers.len(), FINGER_SLOTS);
        assert_eq!(analysis.forwarded.len(), 1);
    }

    #[test]
    fn test_synthetic_hand_detects_five_fingers() {
        let mut p = pipeline_without_history();
        let frame = synth::hand_frame(5);
        let analysis = p.process(&frame.distances, frame.width, frame.height).unwrap();
        assert!(!analysis.contour.is_empty());
        assert!(!analysis.curves.is_empty());
        assert_eq!(analysis.hand.finger_count(), 5, "fingertips: {:?}", analysis.fingertips);
    }

    #[test]
    fn test_synthetic_fist_detects_no_fingers() {
        let mut p = pipeline_without_history();
        let frame = synth::hand_frame(0);
        let analysis = p.process(&frame.distances, frame.width, frame.height).unwrap();
        assert!(!analysis.contour.is_empty());
        assert_eq!(analysis.hand.finger_count(), 0);
    }

    #[test]
    fn test_contour_has_no_duplicates() {
        let mut p = pipeline_without_history();
        let frame = synth::hand_frame(3);
        let analysis = p.process(&frame.distances, frame.width, frame.height).unwrap();
        let mut seen = std::collections::HashSet::new();
        for v in &analysis.contour {
            assert!(seen.insert((v.x as i64, v.y as i64)));
        }
    }

    #[test]
    fn test_smoothing_keeps_constant_frames_stable() {
        let mut config = Config::default();
        config.enhance.enabled = false;
        let mut p = FramePipeline::new(&config).unwrap();
        let frame = synth::hand_frame(5);
        let first = p.process(&frame.distances, frame.width, frame.height).unwrap();
        let second = p.process(&frame.distances, frame.width, frame.height).unwrap();
        assert_eq!(first.hand, second.hand);
    }

    #[test]
    fn test_enhancer_forwards_during_steady_stream() {
        let mut config = Config::default();
        config.smooth.enabled = false;
        let mut p = FramePipeline::new(&config).unwrap();
        let frame = synth::hand_frame(5);
        for _ in 0..5 {
            let analysis = p.process(&frame.distances, frame.width, frame.height).unwrap();
            assert_eq!(analysis.forwarded.len(), 1);
            assert!(!analysis.fixed_inconsistencies);
        }
    }
}
