use std::collections::VecDeque;

use anyhow::Result;
use tracing::debug;

use crate::config::EnhanceConfig;
use crate::hand::{Hand, FINGER_SLOTS};
use crate::tracker::predict::HandPredictor;

/// 「良い」手を保持するキューの上限
const QUEUE_CAP: usize = 40;

/// このフレーム数たまったら指本数の変化を信用し始める
const SATURATION: usize = 30;

/// 指本数の一貫性を監視し、瞬間的な取りこぼしを予測で補修する
///
/// 直近の手がじゅうぶん溜まった状態で指の本数が急に変わったら、
/// そのフレームを保留する。変化が frame_limit を超えて続けば
/// 本物の変化として流し、すぐ戻れば予測した指で欠けを埋めて流す
pub struct ConsistencyEnhancer {
    queue: VecDeque<Hand>,
    pending: Vec<Hand>,
    prev: Option<Hand>,
    predictor: HandPredictor,
    frame_limit: usize,
    fixed_inconsistencies: bool,
}

impl ConsistencyEnhancer {
    pub fn new(frame_limit: usize, prediction_weight: f64) -> Result<Self> {
        Ok(Self {
            queue: VecDeque::with_capacity(QUEUE_CAP + 1),
            pending: Vec::with_capacity(frame_limit + 1),
            prev: None,
            predictor: HandPredictor::new(prediction_weight)?,
            frame_limit,
            fixed_inconsistencies: false,
        })
    }

    pub fn from_config(config: &EnhanceConfig) -> Result<Self> {
        Self::new(config.frame_limit, config.prediction_weight)
    }

    /// 直前のフレームで補修が行われたか
    pub fn fixed_inconsistencies(&self) -> bool {
        self.fixed_inconsistencies
    }

    /// 1フレームぶんの手を受け取り、下流に流す手を返す
    ///
    /// 保留中は空、補修・受け入れ時は複数返ることがある
    pub fn process(&mut self, hand: Hand) -> Vec<Hand> {
        let mut forwarded = Vec::new();

        let inconsistent = self.queue.len() >= SATURATION
            && self
                .prev
                .as_ref()
                .is_some_and(|p| p.finger_count() != hand.finger_count());

        if inconsistent {
            self.pending.push(hand.clone());
            if self.pending.len() > self.frame_limit {
                // 変化が続いた。本物の指本数の変化として受け入れる
                debug!(frames = self.pending.len(), "finger count change accepted");
                for h in self.pending.drain(..) {
                    push_bounded(&mut self.queue, h.clone());
                    forwarded.push(h);
                }
            }
        } else if !self.pending.is_empty() {
            self.pending.push(hand.clone());
            let pending: Vec<Hand> = self.pending.drain(..).collect();
            for mut h in pending {
                let history: Vec<Hand> = self.queue.iter().cloned().collect();
                if let Some(predicted) = self.predictor.predict(&history) {
                    for slot in 0..FINGER_SLOTS {
                        if !h.has_finger(slot) {
                            h.fingers[slot] = predicted.fingers[slot];
                        }
                    }
                }
                push_bounded(&mut self.queue, h.clone());
                forwarded.push(h);
            }
            debug!(frames = forwarded.len(), "inconsistent frames repaired");
            self.fixed_inconsistencies = true;
        } else {
            push_bounded(&mut self.queue, hand.clone());
            forwarded.push(hand.clone());
            self.fixed_inconsistencies = false;
        }

        self.prev = Some(hand);
        forwarded
    }
}

fn push_bounded(queue: &mut VecDeque<Hand>, hand: Hand) {
    queue.push_back(hand);
    while queue.len() > QUEUE_CAP {
        queue.pop_front();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finger::Fingertip;
    use crate::vector::Vector;

    /// count 本の指を持つ手
    fn make_hand(count: usize, x: f64) -> Hand {
        let tip = Fingertip {
            position: Vector::new(x, 10.0, 0.0),
            direction: Vector::new(0.0, -1.0, 0.0),
            bisect: Vector::ZERO,
        };
        Hand::from_fingertips(&vec![tip; count])
    }

    fn enhancer() -> ConsistencyEnhancer {
        ConsistencyEnhancer::new(10, 0.8).unwrap()
    }

    /// キューを飽和させる (31フレームの5本指)
    fn saturate(e: &mut ConsistencyEnhancer) {
        for i in 0..31 {
            let out = e.process(make_hand(5, i as f64));
            assert_eq!(out.len(), 1);
        }
    }

    #[test]
    fn test_normal_flow_forwards_every_hand() {
        let mut e = enhancer();
        for i in 0..10 {
            let hand = make_hand(5, i as f64);
            let out = e.process(hand.clone());
            assert_eq!(out, vec![hand]);
            assert!(!e.fixed_inconsistencies());
        }
    }

    #[test]
    fn test_count_change_before_saturation_passes_through() {
        let mut e = enhancer();
        for i in 0..5 {
            e.process(make_hand(5, i as f64));
        }
        let out = e.process(make_hand(3, 5.0));
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_inconsistent_frames_are_held() {
        let mut e = enhancer();
        saturate(&mut e);
        // 4本に落ちたフレームは保留される
        assert!(e.process(make_hand(4, 31.0)).is_empty());
        // 本数が揺れ続ける間も保留のまま
        assert!(e.process(make_hand(5, 32.0)).is_empty());
    }

    #[test]
    fn test_repair_fills_missing_fingers() {
        let mut e = enhancer();
        saturate(&mut e);
        assert!(e.process(make_hand(4, 31.0)).is_empty());
        // 本数が直前と一致したので、保留分がまとめて補修されて流れる
        let out = e.process(make_hand(4, 32.0));
        assert_eq!(out.len(), 2);
        assert!(e.fixed_inconsistencies());
        for hand in &out {
            assert_eq!(hand.finger_count(), 5, "missing slot left unrepaired");
        }
    }

    #[test]
    fn test_sustained_change_is_accepted() {
        let mut e = enhancer();
        saturate(&mut e);
        // 本数が揺れ続ける: 4,5,4,5,... 11フレーム目で上限を超えて放流
        let mut released = Vec::new();
        for i in 0..11 {
            let count = if i % 2 == 0 { 4 } else { 5 };
            released = e.process(make_hand(count, 31.0 + i as f64));
            if i < 10 {
                assert!(released.is_empty(), "released early at frame {}", i);
            }
        }
        assert_eq!(released.len(), 11);
        // 受け入れなので補修はされない
        assert!(!e.fixed_inconsistencies());
        assert_eq!(released[0].finger_count(), 4);
    }

    #[test]
    fn test_repaired_hands_keep_detected_fingers() {
        let mut e = enhancer();
        saturate(&mut e);
        let four = make_hand(4, 31.0);
        e.process(four.clone());
        let out = e.process(make_hand(4, 32.0));
        // 検出されていたスロットはそのまま
        assert_eq!(out[0].fingers[0].position, four.fingers[0].position);
    }
}
