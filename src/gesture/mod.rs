pub mod dtw;
pub mod store;
pub mod stream;

use serde::{Deserialize, Serialize};

use crate::hand::Hand;

pub use dtw::{DtwMatcher, DtwParams};
pub use stream::GestureStream;

/// 記録済みジェスチャー
///
/// 名前はライブラリ内で一意でなくてよい
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gesture {
    pub name: String,
    pub frames: Vec<Hand>,
}

impl Gesture {
    pub fn new(name: impl Into<String>, frames: Vec<Hand>) -> Self {
        Self {
            name: name.into(),
            frames,
        }
    }
}
