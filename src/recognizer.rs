use anyhow::Result;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::gesture::{store, DtwMatcher, DtwParams, Gesture, GestureStream};
use crate::hand::Hand;

/// ジェスチャーとして保存する最小フレーム数
pub const MIN_GESTURE_FRAMES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognizerMode {
    Idle,
    Recording,
    Recognizing,
}

/// 認識・記録の結果イベント
#[derive(Debug, Clone, PartialEq)]
pub enum GestureEvent {
    Recognized(Gesture),
    Recorded(Gesture),
}

/// 記録と認識のファサード
///
/// ストリーム・ライブラリ・DTWマッチャーを1か所で所有する。
/// 外部へのI/Oエラーは bool でしか返さない
pub struct GestureRecognizer {
    mode: RecognizerMode,
    stream: GestureStream,
    library: Vec<Gesture>,
    matcher: DtwMatcher,
}

impl GestureRecognizer {
    pub fn new(stream_capacity: usize, dtw: DtwParams) -> Result<Self> {
        Ok(Self {
            mode: RecognizerMode::Idle,
            stream: GestureStream::new(stream_capacity)?,
            library: Vec::new(),
            matcher: DtwMatcher::new(dtw),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.stream.capacity, config.dtw.clone())
    }

    pub fn mode(&self) -> RecognizerMode {
        self.mode
    }

    pub fn library(&self) -> &[Gesture] {
        &self.library
    }

    pub fn store_gesture(&mut self, gesture: Gesture) {
        info!(name = %gesture.name, frames = gesture.frames.len(), "gesture stored");
        self.library.push(gesture);
    }

    /// 記録を開始する。認識中なら先に止める
    pub fn start_recording(&mut self) {
        if self.mode == RecognizerMode::Recognizing {
            self.stop_recognizing();
        }
        self.stream.clear();
        self.mode = RecognizerMode::Recording;
        info!("recording started");
    }

    /// 記録を終了し、フレームが足りていればジェスチャーを返す
    pub fn stop_recording(&mut self, name: &str) -> Option<GestureEvent> {
        if self.mode != RecognizerMode::Recording {
            return None;
        }
        self.mode = RecognizerMode::Idle;
        let gesture = self.stream.to_gesture(name);
        self.stream.clear();
        if gesture.frames.len() < MIN_GESTURE_FRAMES {
            warn!(
                frames = gesture.frames.len(),
                minimum = MIN_GESTURE_FRAMES,
                "recording discarded"
            );
            return None;
        }
        info!(name = %gesture.name, frames = gesture.frames.len(), "gesture recorded");
        Some(GestureEvent::Recorded(gesture))
    }

    /// 認識を開始する。ストリームは空から始める
    pub fn start_recognizing(&mut self) {
        self.stream.clear();
        self.mode = RecognizerMode::Recognizing;
        info!("recognition started");
    }

    pub fn stop_recognizing(&mut self) {
        self.mode = RecognizerMode::Idle;
        info!("recognition stopped");
    }

    /// 1フレームぶんの手を流し込む
    pub fn analyze_frame(&mut self, hand: Hand) -> Option<GestureEvent> {
        match self.mode {
            RecognizerMode::Recognizing => {
                self.stream.add_frame(hand);
                if !self.stream.is_saturated() {
                    return None;
                }
                let observation: Vec<Hand> = self.stream.frames().cloned().collect();
                let last = observation.last()?;
                let candidate = self.matcher.select_candidate(last, &self.library)?;
                if self.matcher.matches(&observation, &candidate.frames) {
                    info!(name = %candidate.name, "gesture recognized");
                    return Some(GestureEvent::Recognized(candidate.clone()));
                }
                None
            }
            RecognizerMode::Recording => {
                self.stream.add_frame(hand);
                if self.stream.accumulated_frame_count() > self.stream.capacity() as u64 {
                    debug!(
                        capacity = self.stream.capacity(),
                        "recording over capacity, oldest frame dropped"
                    );
                }
                None
            }
            RecognizerMode::Idle => None,
        }
    }

    /// ライブラリを保存する。失敗は false
    pub fn save_library(&self, path: &str) -> bool {
        match store::save_gestures(path, &self.library) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, path, "failed to save gesture library");
                false
            }
        }
    }

    /// ライブラリを読み込んで置き換える。失敗は false で中身は変えない
    pub fn load_library(&mut self, path: &str) -> bool {
        match store::load_gestures(path) {
            Ok(gestures) => {
                info!(count = gestures.len(), path, "gesture library loaded");
                self.library = gestures;
                true
            }
            Err(e) => {
                warn!(error = %e, path, "failed to load gesture library");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finger::Fingertip;
    use crate::vector::Vector;

    fn make_hand(x: f64) -> Hand {
        let tip = Fingertip {
            position: Vector::new(x, 0.0, 0.0),
            direction: Vector::ZERO,
            bisect: Vector::ZERO,
        };
        Hand::from_fingertips(&[tip])
    }

    fn recognizer(capacity: usize) -> GestureRecognizer {
        GestureRecognizer::new(capacity, DtwParams::default()).unwrap()
    }

    #[test]
    fn test_initial_mode_is_idle() {
        let r = recognizer(40);
        assert_eq!(r.mode(), RecognizerMode::Idle);
    }

    #[test]
    fn test_idle_ignores_frames() {
        let mut r = recognizer(40);
        assert!(r.analyze_frame(make_hand(1.0)).is_none());
    }

    #[test]
    fn test_recording_produces_gesture() {
        let mut r = recognizer(40);
        r.start_recording();
        assert_eq!(r.mode(), RecognizerMode::Recording);
        for i in 0..12 {
            assert!(r.analyze_frame(make_hand(i as f64)).is_none());
        }
        let event = r.stop_recording("wave").unwrap();
        assert_eq!(r.mode(), RecognizerMode::Idle);
        match event {
            GestureEvent::Recorded(g) => {
                assert_eq!(g.name, "wave");
                assert_eq!(g.frames.len(), 12);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_short_recording_is_discarded() {
        let mut r = recognizer(40);
        r.start_recording();
        for i in 0..MIN_GESTURE_FRAMES - 1 {
            r.analyze_frame(make_hand(i as f64));
        }
        assert!(r.stop_recording("tiny").is_none());
    }

    #[test]
    fn test_stop_recording_outside_recording_mode() {
        let mut r = recognizer(40);
        assert!(r.stop_recording("nothing").is_none());
    }

    #[test]
    fn test_starting_recording_stops_recognition() {
        let mut r = recognizer(40);
        r.start_recognizing();
        assert_eq!(r.mode(), RecognizerMode::Recognizing);
        r.start_recording();
        assert_eq!(r.mode(), RecognizerMode::Recording);
    }

    #[test]
    fn test_recognizes_replayed_recording() {
        let capacity = 12;
        let mut r = recognizer(capacity);

        r.start_recording();
        for i in 0..capacity {
            r.analyze_frame(make_hand(i as f64));
        }
        let recorded = match r.stop_recording("sweep").unwrap() {
            GestureEvent::Recorded(g) => g,
            other => panic!("unexpected event {:?}", other),
        };
        r.store_gesture(recorded);

        r.start_recognizing();
        let mut recognized = None;
        for i in 0..capacity {
            if let Some(event) = r.analyze_frame(make_hand(i as f64)) {
                recognized = Some(event);
            }
        }
        match recognized.expect("gesture should be recognized") {
            GestureEvent::Recognized(g) => assert_eq!(g.name, "sweep"),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_no_recognition_below_saturation() {
        let mut r = recognizer(20);
        r.store_gesture(Gesture::new("g", (0..20).map(|i| make_hand(i as f64)).collect()));
        r.start_recognizing();
        for i in 0..19 {
            assert!(r.analyze_frame(make_hand(i as f64)).is_none());
        }
    }

    #[test]
    fn test_distant_library_is_not_recognized() {
        let capacity = 12;
        let mut r = recognizer(capacity);
        r.store_gesture(Gesture::new(
            "far",
            (0..capacity).map(|i| make_hand(500.0 + i as f64)).collect(),
        ));
        r.start_recognizing();
        for i in 0..capacity * 2 {
            assert!(r.analyze_frame(make_hand(i as f64 % 12.0)).is_none());
        }
    }

    #[test]
    fn test_library_round_trip_via_facade() {
        let mut path = std::env::temp_dir();
        path.push(format!("yubi-tracker-facade-{}.json", std::process::id()));
        let path = path.to_string_lossy().to_string();

        let mut r = recognizer(40);
        r.store_gesture(Gesture::new("a", (0..10).map(|i| make_hand(i as f64)).collect()));
        assert!(r.save_library(&path));

        let mut other = recognizer(40);
        assert!(other.load_library(&path));
        assert_eq!(other.library(), r.library());

        let _ = std::fs::remove_file(&path);
        let _ = std::fs::remove_file(format!("{}.bak", path));
    }

    #[test]
    fn test_load_failure_keeps_library() {
        let mut r = recognizer(40);
        r.store_gesture(Gesture::new("keep", (0..10).map(|i| make_hand(i as f64)).collect()));
        assert!(!r.load_library("/nonexistent/path/gestures.json"));
        assert_eq!(r.library().len(), 1);
    }
}
