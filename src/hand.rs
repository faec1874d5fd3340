use serde::{Deserialize, Serialize};

use crate::finger::Fingertip;
use crate::vector::Vector;

/// 検出できなかった指のスロットに入る番兵値
pub const FINGER_NOT_FOUND: Vector = Vector::new(1000.0, 1000.0, 1000.0);

/// 1つの手が持つ指スロット数
pub const FINGER_SLOTS: usize = 5;

/// 5本の指スロットを固定で持つ手
///
/// スロット順は 親指, 人差し指, 中指, 薬指, 小指。
/// 欠けたスロットは position に FINGER_NOT_FOUND が入る
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hand {
    pub fingers: [Fingertip; FINGER_SLOTS],
}

impl Hand {
    /// 全スロットが欠けた手
    pub fn empty() -> Self {
        Self {
            fingers: [Fingertip {
                position: FINGER_NOT_FOUND,
                direction: FINGER_NOT_FOUND,
                bisect: Vector::ZERO,
            }; FINGER_SLOTS],
        }
    }

    /// 先頭から最大5本をスロットに詰める。残りは番兵で埋まる
    pub fn from_fingertips(tips: &[Fingertip]) -> Self {
        let mut hand = Self::empty();
        for (slot, tip) in hand.fingers.iter_mut().zip(tips.iter()) {
            *slot = *tip;
        }
        hand
    }

    pub fn has_finger(&self, index: usize) -> bool {
        self.fingers[index].position != FINGER_NOT_FOUND
    }

    /// 検出された指の本数
    pub fn finger_count(&self) -> usize {
        self.fingers
            .iter()
            .filter(|f| f.position.x != FINGER_NOT_FOUND.x)
            .count()
    }
}

impl Default for Hand {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub fn make_tip(x: f64, y: f64) -> Fingertip {
        Fingertip {
            position: Vector::new(x, y, 0.0),
            direction: Vector::new(0.0, -1.0, 0.0),
            bisect: Vector::new(x, y - 25.0, 0.0),
        }
    }

    #[test]
    fn test_empty_hand_has_five_slots() {
        let hand = Hand::empty();
        assert_eq!(hand.fingers.len(), FINGER_SLOTS);
        assert_eq!(hand.finger_count(), 0);
        for i in 0..FINGER_SLOTS {
            assert!(!hand.has_finger(i));
        }
    }

    #[test]
    fn test_from_fingertips_fills_in_order() {
        let tips = vec![make_tip(1.0, 2.0), make_tip(3.0, 4.0)];
        let hand = Hand::from_fingertips(&tips);
        assert_eq!(hand.finger_count(), 2);
        assert!(hand.has_finger(0));
        assert!(hand.has_finger(1));
        assert!(!hand.has_finger(2));
        assert_eq!(hand.fingers[0].position, Vector::new(1.0, 2.0, 0.0));
    }

    #[test]
    fn test_from_fingertips_truncates_to_five() {
        let tips: Vec<_> = (0..8).map(|i| make_tip(i as f64, 0.0)).collect();
        let hand = Hand::from_fingertips(&tips);
        assert_eq!(hand.fingers.len(), FINGER_SLOTS);
        assert_eq!(hand.finger_count(), 5);
        assert_eq!(hand.fingers[4].position.x, 4.0);
    }

    #[test]
    fn test_serde_round_trip() {
        let hand = Hand::from_fingertips(&[make_tip(10.0, 20.0), make_tip(30.0, 40.0)]);
        let json = serde_json::to_string(&hand).unwrap();
        let back: Hand = serde_json::from_str(&json).unwrap();
        assert_eq!(hand, back);
    }
}
