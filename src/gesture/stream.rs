use std::collections::VecDeque;

use anyhow::{bail, Result};

use crate::gesture::Gesture;
use crate::hand::Hand;

/// 直近の手を保持する有界FIFO
///
/// 容量を超えたら最古のフレームを捨てる。
/// accumulated_frame_count は clear では戻らない単調カウンタ
pub struct GestureStream {
    frames: VecDeque<Hand>,
    capacity: usize,
    accumulated: u64,
}

impl GestureStream {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            bail!("gesture stream capacity must be at least 1");
        }
        Ok(Self {
            frames: VecDeque::with_capacity(capacity + 1),
            capacity,
            accumulated: 0,
        })
    }

    pub fn add_frame(&mut self, hand: Hand) {
        self.frames.push_back(hand);
        while self.frames.len() > self.capacity {
            self.frames.pop_front();
        }
        self.accumulated += 1;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn is_saturated(&self) -> bool {
        self.frames.len() == self.capacity
    }

    pub fn accumulated_frame_count(&self) -> u64 {
        self.accumulated
    }

    pub fn last(&self) -> Option<&Hand> {
        self.frames.back()
    }

    /// 現在の中身を到着順のままジェスチャーにする
    pub fn to_gesture(&self, name: &str) -> Gesture {
        Gesture::new(name, self.frames.iter().cloned().collect())
    }

    pub fn frames(&self) -> impl Iterator<Item = &Hand> {
        self.frames.iter()
    }

    /// 中身を空にする。累計カウンタはそのまま
    pub fn clear(&mut self) {
        self.frames.clear();
    }
}
