use anyhow::{bail, Result};

use crate::config::SmoothConfig;
use crate::hand::Hand;
use crate::vector::Vector;

/// 一次の指数平滑化フィルタ
///
/// 各スロットの position / direction を成分ごとに
/// prev + α(cur - prev) で混ぜる
pub struct HandSmoother {
    alpha: f64,
    prev: Option<Hand>,
}

impl HandSmoother {
    pub fn new(alpha: f64) -> Result<Self> {
        if alpha <= 0.0 || alpha >= 1.0 {
            bail!("smoothing factor {} must lie inside (0, 1)", alpha);
        }
        Ok(Self { alpha, prev: None })
    }

    pub fn from_config(config: &SmoothConfig) -> Result<Self> {
        Self::new(config.factor)
    }

    pub fn apply(&mut self, hand: Hand) -> Hand {
        let prev = match &self.prev {
            Some(prev) => prev.clone(),
            None => {
                self.prev = Some(hand.clone());
                return hand;
            }
        };

        let result = smooth_hand(&hand, &prev, self.alpha);
        self.prev = Some(result.clone());
        result
    }

    pub fn reset(&mut self) {
        self.prev = None;
    }
}

pub fn smooth_vector(current: Vector, previous: Vector, alpha: f64) -> Vector {
    previous + (current - previous) * alpha
}

/// 検出済みかどうかは見ない。番兵値もそのまま数値として混ざる
pub fn smooth_hand(current: &Hand, previous: &Hand, alpha: f64) -> Hand {
    let mut result = current.clone();
    for i in 0..result.fingers.len() {
        result.fingers[i].position = smooth_vector(
            current.fingers[i].position,
            previous.fingers[i].position,
            alpha,
        );
        result.fingers[i].direction = smooth_vector(
            current.fingers[i].direction,
            previous.fingers[i].direction,
            alpha,
        );
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finger::Fingertip;

    fn make_hand(x: f64) -> Hand {
        let tip = Fingertip {
            position: Vector::new(x, x * 2.0, x * 3.0),
            direction: Vector::new(x, 0.0, 0.0),
            bisect: Vector::ZERO,
        };
        Hand::from_fingertips(&[tip])
    }

    #[test]
    fn test_alpha_validation() {
        assert!(HandSmoother::new(0.0).is_err());
        assert!(HandSmoother::new(1.0).is_err());
        assert!(HandSmoother::new(-0.5).is_err());
        assert!(HandSmoother::new(1.5).is_err());
        assert!(HandSmoother::new(0.5).is_ok());
    }

    #[test]
    fn test_smooth_vector_midpoint() {
        let out = smooth_vector(
            Vector::new(10.0, 20.0, 30.0),
            Vector::new(0.0, 0.0, 0.0),
            0.5,
        );
        assert_eq!(out, Vector::new(5.0, 10.0, 15.0));
    }

    #[test]
    fn test_smooth_is_identity_on_constant_input() {
        for alpha in [0.1, 0.5, 0.9] {
            let v = Vector::new(3.0, -4.0, 5.0);
            assert_eq!(smooth_vector(v, v, alpha), v);
        }
    }

    #[test]
    fn test_first_frame_passthrough() {
        let mut s = HandSmoother::new(0.5).unwrap();
        let hand = make_hand(10.0);
        assert_eq!(s.apply(hand.clone()), hand);
    }

    #[test]
    fn test_second_frame_blends() {
        let mut s = HandSmoother::new(0.5).unwrap();
        s.apply(make_hand(0.0));
        let out = s.apply(make_hand(10.0));
        assert_eq!(out.fingers[0].position, Vector::new(5.0, 10.0, 15.0));
        assert_eq!(out.fingers[0].direction, Vector::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn test_smoothed_output_feeds_back() {
        let mut s = HandSmoother::new(0.5).unwrap();
        s.apply(make_hand(0.0));
        s.apply(make_hand(10.0)); // -> 5
        let out = s.apply(make_hand(10.0)); // 5 + 0.5*(10-5) = 7.5
        assert_eq!(out.fingers[0].position.x, 7.5);
    }

    #[test]
    fn test_reset() {
        let mut s = HandSmoother::new(0.5).unwrap();
        s.apply(make_hand(0.0));
        s.reset();
        let hand = make_hand(10.0);
        assert_eq!(s.apply(hand.clone()), hand);
    }
}
