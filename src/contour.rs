use std::collections::HashSet;

use serde::Deserialize;
use tracing::debug;

use crate::depth::{DepthMask, Pixel};
use crate::vector::Vector;

/// 近傍探索の半径 (ピクセル)
const GRID_RADIUS: i32 = 2;

/// 輪郭追跡のパラメータ
#[derive(Debug, Clone, Deserialize)]
pub struct ContourParams {
    /// 輪郭の最大ピクセル数。超えたら打ち切る
    #[serde(default = "default_max_edge_pixels")]
    pub max_edge_pixels: usize,
    /// 開始点スキャンの行ストライド
    #[serde(default = "default_rows_to_skip")]
    pub rows_to_skip: usize,
    /// 行き詰まったときに遡る輪郭ピクセル数の上限
    #[serde(default = "default_max_backtrack")]
    pub max_backtrack: usize,
    /// 開始点スキャンを始める高さ (画像下端からの比率)
    #[serde(default = "default_scan_height_offset")]
    pub scan_height_offset: f64,
    #[serde(default = "default_scan_from_left")]
    pub enable_scan_from_left: bool,
    #[serde(default = "default_scan_from_right")]
    pub enable_scan_from_right: bool,
}

fn default_max_edge_pixels() -> usize {
    700
}
fn default_rows_to_skip() -> usize {
    5
}
fn default_max_backtrack() -> usize {
    25
}
fn default_scan_height_offset() -> f64 {
    0.2
}
fn default_scan_from_left() -> bool {
    true
}
fn default_scan_from_right() -> bool {
    false
}

impl Default for ContourParams {
    fn default() -> Self {
        Self {
            max_edge_pixels: default_max_edge_pixels(),
            rows_to_skip: default_rows_to_skip(),
            max_backtrack: default_max_backtrack(),
            scan_height_offset: default_scan_height_offset(),
            enable_scan_from_left: default_scan_from_left(),
            enable_scan_from_right: default_scan_from_right(),
        }
    }
}

/// 現在の探索象限
///
/// 指の輪郭は上方向に伸びるので、上向きの遷移を優先する
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchDirection {
    UpLeft,
    UpRight,
    DownRight,
    DownLeft,
    Undefined,
}

/// 行き詰まった象限から次に試す象限
fn next_probable(direction: SearchDirection) -> SearchDirection {
    match direction {
        SearchDirection::UpLeft => SearchDirection::UpRight,
        SearchDirection::UpRight => SearchDirection::DownRight,
        SearchDirection::DownRight => SearchDirection::UpRight,
        SearchDirection::DownLeft => SearchDirection::DownRight,
        SearchDirection::Undefined => SearchDirection::UpLeft,
    }
}

/// 時計回りの象限順
const CLOCKWISE: [SearchDirection; 4] = [
    SearchDirection::UpLeft,
    SearchDirection::UpRight,
    SearchDirection::DownRight,
    SearchDirection::DownLeft,
];

/// シルエットを1ピクセルずつ辿る輪郭トラッカー
///
/// 状態が大きいのでフレームごとに作り直さず、clear して使い回す
pub struct ContourTracker {
    params: ContourParams,
    contour: Vec<(i32, i32)>,
    visited: HashSet<(i32, i32)>,
    direction: SearchDirection,
}

impl ContourTracker {
    pub fn new(params: ContourParams) -> Self {
        Self {
            params,
            contour: Vec::new(),
            visited: HashSet::new(),
            direction: SearchDirection::Undefined,
        }
    }

    /// マスクから輪郭ピクセル列を抽出する
    ///
    /// 戻り値は辿った順の (x, y, 0)。見つからなければ空
    pub fn track(&mut self, mask: &DepthMask) -> Vec<Vector> {
        self.contour.clear();
        self.visited.clear();
        self.direction = SearchDirection::UpLeft;

        if self.params.enable_scan_from_left {
            if let Some(start) = self.find_start_from_left(mask) {
                self.walk(mask, start);
            }
        }
        if self.params.enable_scan_from_right && self.contour.is_empty() {
            if let Some(start) = self.find_start_from_right(mask) {
                self.walk(mask, start);
            }
        }

        debug!(pixels = self.contour.len(), "contour pass finished");
        self.contour
            .iter()
            .map(|&(x, y)| Vector::new(x as f64, y as f64, 0.0))
            .collect()
    }

    /// 下から上に向かって行をスキャンし、最初の InRange ピクセルを返す
    fn find_start_from_left(&self, mask: &DepthMask) -> Option<(i32, i32)> {
        let height = mask.height();
        let offset = (height as f64 * self.params.scan_height_offset) as i32;
        let mut y = height - 1 - offset;
        while y >= 0 {
            if let Some(p) = next_point_in_range(mask, (0, y), (mask.width() - 1, y)) {
                return Some(p);
            }
            y -= self.params.rows_to_skip as i32;
        }
        None
    }

    /// 右下から上に向かってスキャンし、見つけた行を左へ渡って
    /// 物体の左端から歩き始める
    fn find_start_from_right(&self, mask: &DepthMask) -> Option<(i32, i32)> {
        let height = mask.height();
        let offset = (height as f64 * self.params.scan_height_offset) as i32;
        let mut y = height - 1 - offset;
        while y >= 0 {
            let mut x = mask.width() - 1;
            while x >= 0 && !mask.is_in_range(x, y) {
                x -= 1;
            }
            if x >= 0 {
                // 行に沿って左へ。最初の OutOfRange の手前が左端
                let mut left = x;
                while left - 1 >= 0 && mask.is_in_range(left - 1, y) {
                    left -= 1;
                }
                return Some((left, y));
            }
            y -= self.params.rows_to_skip as i32;
        }
        None
    }

    fn walk(&mut self, mask: &DepthMask, start: (i32, i32)) {
        let mut current = start;
        self.push(current);

        loop {
            if self.contour.len() > self.params.max_edge_pixels {
                debug!(limit = self.params.max_edge_pixels, "contour length limit");
                break;
            }
            match self.find_next(mask, current) {
                Some(next) => {
                    if self.visited.contains(&next) {
                        // 一周して既知のピクセルに戻った
                        debug!(?next, "contour closed");
                        break;
                    }
                    self.push(next);
                    current = next;
                }
                None => {
                    debug!(?current, "no next contour pixel");
                    break;
                }
            }
        }
    }

    fn push(&mut self, point: (i32, i32)) {
        self.contour.push(point);
        self.visited.insert(point);
    }

    /// 次の輪郭ピクセルを決める
    ///
    /// 現在の象限 → 次候補の象限 → 時計回り全周 → (重複時) 反時計回り
    /// → 単線の端点 → バックトラック、の順に試す
    fn find_next(&mut self, mask: &DepthMask, point: (i32, i32)) -> Option<(i32, i32)> {
        let mut candidate = self.search_quadrant(mask, point, self.direction, false);

        if candidate.is_none() {
            let alt = next_probable(self.direction);
            if let Some(c) = self.search_quadrant(mask, point, alt, false) {
                self.direction = alt;
                candidate = Some(c);
            }
        }
        if candidate.is_none() {
            candidate = self.sweep(mask, point, true, false);
        }

        let candidate = match candidate {
            Some(c) => c,
            None => return self.backtrack(mask),
        };
        if !self.visited.contains(&candidate) {
            return Some(candidate);
        }

        // 既出ピクセルに当たった。逆回りに探し直す
        if let Some(c) = self.sweep(mask, point, false, false) {
            if !self.visited.contains(&c) {
                return Some(c);
            }
        }
        if let Some(c) = self.line_end(mask, point) {
            if !self.visited.contains(&c) {
                return Some(c);
            }
        }
        if let Some(c) = self.backtrack(mask) {
            return Some(c);
        }

        // 未踏の候補が残っていない。重複を返して打ち切らせる
        Some(candidate)
    }

    /// 象限を順に回って最初の境界ピクセルを返す
    fn sweep(
        &mut self,
        mask: &DepthMask,
        point: (i32, i32),
        clockwise: bool,
        skip_visited: bool,
    ) -> Option<(i32, i32)> {
        let start = CLOCKWISE
            .iter()
            .position(|&d| d == self.direction)
            .unwrap_or(0);
        for i in 0..CLOCKWISE.len() {
            let idx = if clockwise {
                (start + i) % CLOCKWISE.len()
            } else {
                (start + CLOCKWISE.len() - i) % CLOCKWISE.len()
            };
            let dir = CLOCKWISE[idx];
            if let Some(c) = self.search_quadrant(mask, point, dir, skip_visited) {
                self.direction = dir;
                return Some(c);
            }
        }
        None
    }

    /// 象限ごとの探索ルーチンに振り分ける
    ///
    /// 時計回りに歩くので、壁の外側は常に進行方向の左に来る。
    /// どの隣接ピクセルが範囲外であるべきかは象限ごとに異なる
    fn search_quadrant(
        &self,
        mask: &DepthMask,
        point: (i32, i32),
        direction: SearchDirection,
        skip_visited: bool,
    ) -> Option<(i32, i32)> {
        match direction {
            SearchDirection::UpLeft => self.search_up_left(mask, point, skip_visited),
            SearchDirection::UpRight => self.search_up_right(mask, point, skip_visited),
            SearchDirection::DownRight => self.search_down_right(mask, point, skip_visited),
            SearchDirection::DownLeft => self.search_down_left(mask, point, skip_visited),
            SearchDirection::Undefined => None,
        }
    }

    /// 左の壁を上る象限。外側は左 (上昇中) または下 (左折直後)。
    /// 候補の右が開いたら壁の向きが変わっているので打ち切る
    fn search_up_left(
        &self,
        mask: &DepthMask,
        point: (i32, i32),
        skip_visited: bool,
    ) -> Option<(i32, i32)> {
        for row in 0..=GRID_RADIUS {
            for col in 0..=GRID_RADIUS {
                if row == 0 && col == 0 {
                    continue;
                }
                let (cx, cy) = (point.0 - col, point.1 - row);
                if !mask.is_in_range(cx, cy) {
                    continue;
                }
                if !mask.is_in_range(cx - 1, cy) || !mask.is_in_range(cx, cy + 1) {
                    if skip_visited && self.visited.contains(&(cx, cy)) {
                        continue;
                    }
                    return Some((cx, cy));
                }
                if !mask.is_in_range(cx + 1, cy) {
                    return None;
                }
            }
        }
        None
    }

    /// 上辺を右へ渡る象限。外側は上 (右進中) または左 (上昇の続き)。
    /// 候補の下が開いたら打ち切る
    fn search_up_right(
        &self,
        mask: &DepthMask,
        point: (i32, i32),
        skip_visited: bool,
    ) -> Option<(i32, i32)> {
        for row in 0..=GRID_RADIUS {
            for col in 0..=GRID_RADIUS {
                if row == 0 && col == 0 {
                    continue;
                }
                let (cx, cy) = (point.0 + col, point.1 - row);
                if !mask.is_in_range(cx, cy) {
                    continue;
                }
                if !mask.is_in_range(cx, cy - 1) || !mask.is_in_range(cx - 1, cy) {
                    if skip_visited && self.visited.contains(&(cx, cy)) {
                        continue;
                    }
                    return Some((cx, cy));
                }
                if !mask.is_in_range(cx, cy + 1) {
                    return None;
                }
            }
        }
        None
    }

    /// 右の壁を下る象限。外側は右 (下降中) または上 (谷底の右進)。
    /// 候補の左が開いたら打ち切る
    fn search_down_right(
        &self,
        mask: &DepthMask,
        point: (i32, i32),
        skip_visited: bool,
    ) -> Option<(i32, i32)> {
        for row in 0..=GRID_RADIUS {
            for col in 0..=GRID_RADIUS {
                if row == 0 && col == 0 {
                    continue;
                }
                let (cx, cy) = (point.0 + col, point.1 + row);
                if !mask.is_in_range(cx, cy) {
                    continue;
                }
                if !mask.is_in_range(cx + 1, cy) || !mask.is_in_range(cx, cy - 1) {
                    if skip_visited && self.visited.contains(&(cx, cy)) {
                        continue;
                    }
                    return Some((cx, cy));
                }
                if !mask.is_in_range(cx - 1, cy) {
                    return None;
                }
            }
        }
        None
    }

    /// 下辺を左へ戻る象限。外側は下 (左進中) または右 (下降の続き)。
    /// 候補の上が開いたら打ち切る
    fn search_down_left(
        &self,
        mask: &DepthMask,
        point: (i32, i32),
        skip_visited: bool,
    ) -> Option<(i32, i32)> {
        for row in 0..=GRID_RADIUS {
            for col in 0..=GRID_RADIUS {
                if row == 0 && col == 0 {
                    continue;
                }
                let (cx, cy) = (point.0 - col, point.1 + row);
                if !mask.is_in_range(cx, cy) {
                    continue;
                }
                if !mask.is_in_range(cx, cy + 1) || !mask.is_in_range(cx + 1, cy) {
                    if skip_visited && self.visited.contains(&(cx, cy)) {
                        continue;
                    }
                    return Some((cx, cy));
                }
                if !mask.is_in_range(cx, cy - 1) {
                    return None;
                }
            }
        }
        None
    }

    /// 近傍が幅1ピクセルの縦線・横線のとき、その終端まで進めて返す
    fn line_end(&self, mask: &DepthMask, point: (i32, i32)) -> Option<(i32, i32)> {
        let (x, y) = point;

        // 縦の単線
        if !mask.is_in_range(x - 1, y) && !mask.is_in_range(x + 1, y) {
            for step in [-1, 1] {
                if mask.is_in_range(x, y + step) {
                    let mut yy = y + step;
                    while mask.is_in_range(x, yy + step)
                        && !mask.is_in_range(x - 1, yy)
                        && !mask.is_in_range(x + 1, yy)
                    {
                        yy += step;
                    }
                    return Some((x, yy));
                }
            }
        }
        // 横の単線
        if !mask.is_in_range(x, y - 1) && !mask.is_in_range(x, y + 1) {
            for step in [-1, 1] {
                if mask.is_in_range(x + step, y) {
                    let mut xx = x + step;
                    while mask.is_in_range(xx + step, y)
                        && !mask.is_in_range(xx, y - 1)
                        && !mask.is_in_range(xx, y + 1)
                    {
                        xx += step;
                    }
                    return Some((xx, y));
                }
            }
        }
        None
    }

    /// 直近の輪郭ピクセルを遡り、未踏の隣接境界ピクセルを探す
    fn backtrack(&mut self, mask: &DepthMask) -> Option<(i32, i32)> {
        let len = self.contour.len();
        let steps = self.params.max_backtrack.min(len);
        for i in 0..steps {
            let point = self.contour[len - 1 - i];
            if let Some(c) = self.sweep(mask, point, true, true) {
                return Some(c);
            }
        }
        None
    }
}

/// a から b へ同じ行を辿り、最初の InRange ピクセルを返す
fn next_point_in_range(mask: &DepthMask, a: (i32, i32), b: (i32, i32)) -> Option<(i32, i32)> {
    let step = if b.0 >= a.0 { 1 } else { -1 };
    let delta_y = b.1 - b.1; // 行内の走査なので常に 0
    let mut x = a.0;
    while x != b.0 {
        if delta_y.abs() <= 1 && mask.get(x, a.1) == Pixel::InRange {
            return Some((x, a.1));
        }
        x += step;
    }
    None
}
