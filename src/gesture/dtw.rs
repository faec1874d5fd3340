//! Dynamic time warping over hand-frame sequences.
//!
//! Matches the observation window against stored gestures: a candidate is
//! picked by last-frame distance, then the accumulated-cost matrix is
//! backtracked and the mean path cost gates acceptance.

use serde::Deserialize;
use tracing::debug;

use crate::gesture::Gesture;
use crate::hand::Hand;
use crate::vector::Vector;

#[derive(Debug, Clone, Deserialize)]
pub struct DtwParams {
    /// Accept when total path cost / observation length stays below this.
    #[serde(default = "default_path_cost_threshold")]
    pub path_cost_threshold: f64,
    /// Candidate gate on the distance between the last frames.
    #[serde(default = "default_frame_distance_threshold")]
    pub frame_distance_threshold: f64,
    /// Reject after this many horizontal-only backtrack steps.
    #[serde(default = "default_movement_threshold")]
    pub horizontal_movement_threshold: usize,
    /// Reject after this many vertical-only backtrack steps.
    #[serde(default = "default_movement_threshold")]
    pub vertical_movement_threshold: usize,
    /// Local-cost multipliers for the (vertical, horizontal, diagonal)
    /// transitions. Left/below transitions carry no local cost by default,
    /// the diagonal pays half.
    #[serde(default = "default_weights")]
    pub weights: Vector,
}

fn default_path_cost_threshold() -> f64 {
    8.0
}
fn default_frame_distance_threshold() -> f64 {
    30.0
}
fn default_movement_threshold() -> usize {
    10
}
fn default_weights() -> Vector {
    Vector::new(0.0, 0.0, 0.5)
}

impl Default for DtwParams {
    fn default() -> Self {
        Self {
            path_cost_threshold: default_path_cost_threshold(),
            frame_distance_threshold: default_frame_distance_threshold(),
            horizontal_movement_threshold: default_movement_threshold(),
            vertical_movement_threshold: default_movement_threshold(),
            weights: default_weights(),
        }
    }
}

/// Sum of the per-slot Euclidean distances between finger positions.
pub fn hand_distance(a: &Hand, b: &Hand) -> f64 {
    a.fingers
        .iter()
        .zip(b.fingers.iter())
        .map(|(fa, fb)| (fa.position - fb.position).length())
        .sum()
}

pub struct DtwMatcher {
    params: DtwParams,
}

impl DtwMatcher {
    pub fn new(params: DtwParams) -> Self {
        Self { params }
    }

    /// Pick the stored gesture whose last frame is closest to the
    /// observation's last frame, if it is close enough.
    pub fn select_candidate<'a>(
        &self,
        observed_last: &Hand,
        library: &'a [Gesture],
    ) -> Option<&'a Gesture> {
        let mut best: Option<(f64, &Gesture)> = None;
        for gesture in library {
            let last = match gesture.frames.last() {
                Some(last) => last,
                None => continue,
            };
            let distance = hand_distance(observed_last, last);
            if best.map_or(true, |(d, _)| distance < d) {
                best = Some((distance, gesture));
            }
        }
        match best {
            Some((distance, gesture)) if distance < self.params.frame_distance_threshold => {
                debug!(name = %gesture.name, distance, "dtw candidate selected");
                Some(gesture)
            }
            _ => None,
        }
    }

    /// Total cost of the backtracked warping path.
    /// None when the path diverges past the movement thresholds.
    pub fn path_cost(&self, observation: &[Hand], candidate: &[Hand]) -> Option<f64> {
        let n = observation.len();
        let m = candidate.len();
        if n == 0 || m == 0 {
            return None;
        }

        let mut local = vec![0.0; n * m];
        for r in 0..n {
            for c in 0..m {
                local[r * m + c] = hand_distance(&observation[r], &candidate[c]);
            }
        }

        // Accumulated cost. The origin carries no local cost.
        let mut acc = vec![0.0; n * m];
        for c in 1..m {
            acc[c] = local[c] + acc[c - 1];
        }
        for r in 1..n {
            acc[r * m] = local[r * m] + acc[(r - 1) * m];
        }
        let w = self.params.weights;
        for r in 1..n {
            for c in 1..m {
                let d = local[r * m + c];
                let vertical = w.x * d + acc[(r - 1) * m + c];
                let horizontal = w.y * d + acc[r * m + c - 1];
                let diagonal = w.z * d + acc[(r - 1) * m + c - 1];
                acc[r * m + c] = vertical.min(horizontal).min(diagonal);
            }
        }

        self.backtrack(&acc, n, m)
    }

    /// Walk back from the far corner, preferring diagonal steps on ties,
    /// and add up the visited accumulated costs. Too many consecutive
    /// horizontal or vertical steps abort the match; only a diagonal step
    /// resets the counters.
    fn backtrack(&self, acc: &[f64], n: usize, m: usize) -> Option<f64> {
        enum Step {
            Horizontal,
            Vertical,
            Diagonal,
        }

        let mut r = n - 1;
        let mut c = m - 1;
        let mut total = 0.0;
        let mut horizontal_run = 0usize;
        let mut vertical_run = 0usize;

        while r > 0 || c > 0 {
            let (step, value) = if r == 0 {
                (Step::Horizontal, acc[c - 1])
            } else if c == 0 {
                (Step::Vertical, acc[(r - 1) * m])
            } else {
                let vertical = acc[(r - 1) * m + c];
                let horizontal = acc[r * m + c - 1];
                let diagonal = acc[(r - 1) * m + c - 1];
                if diagonal <= vertical && diagonal <= horizontal {
                    (Step::Diagonal, diagonal)
                } else if horizontal <= vertical && horizontal <= diagonal {
                    (Step::Horizontal, horizontal)
                } else {
                    (Step::Vertical, vertical)
                }
            };

            total += value;
            match step {
                Step::Diagonal => {
                    horizontal_run = 0;
                    vertical_run = 0;
                    r -= 1;
                    c -= 1;
                }
                Step::Horizontal => {
                    horizontal_run += 1;
                    if horizontal_run > self.params.horizontal_movement_threshold {
                        debug!("dtw path diverged horizontally");
                        return None;
                    }
                    c -= 1;
                }
                Step::Vertical => {
                    vertical_run += 1;
                    if vertical_run > self.params.vertical_movement_threshold {
                        debug!("dtw path diverged vertically");
                        return None;
                    }
                    r -= 1;
                }
            }
        }
        Some(total)
    }

    /// Mean path cost per observation frame.
    pub fn mean_path_cost(&self, observation: &[Hand], candidate: &[Hand]) -> Option<f64> {
        let total = self.path_cost(observation, candidate)?;
        Some(total / observation.len() as f64)
    }

    /// True when the candidate is accepted for this observation window.
    pub fn matches(&self, observation: &[Hand], candidate: &[Hand]) -> bool {
        match self.mean_path_cost(observation, candidate) {
            Some(mean) => {
                debug!(mean, threshold = self.params.path_cost_threshold, "dtw mean path cost");
                mean < self.params.path_cost_threshold
            }
            None => false,
        }
    }
}
