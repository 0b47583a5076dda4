//! Value and position transitions between consecutive rankings.
//!
//! Nothing here draws. The hosting layer measures where each comment sits
//! (in whatever unit it lays out with), hands those positions over after every
//! new ranking and asks for per-frame values and offsets.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::ranking::{CommentId, Ranking};

pub const VALUE_DURATION: Duration = Duration::from_millis(800);
pub const MOVE_DURATION: Duration = Duration::from_millis(700);
pub const FOLLOW_WINDOW: Duration = Duration::from_millis(1500);
pub const FOLLOW_DAMPING: f64 = 0.25;

/// Offsets below this are not worth animating.
const MIN_MOVE: f64 = 1.0;

pub fn ease_out_cubic(progress: f64) -> f64 {
    let p = progress.clamp(0.0, 1.0);
    1.0 - (1.0 - p).powi(3)
}

/// CSS-style timing curve through (0,0), (x1,y1), (x2,y2), (1,1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicBezier {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
}

/// `cubic-bezier(0.22, 1, 0.36, 1)`: fast start, long settle.
pub const DECELERATE: CubicBezier = CubicBezier::new(0.22, 1.0, 0.36, 1.0);

impl CubicBezier {
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    fn sample(a1: f64, a2: f64, t: f64) -> f64 {
        let u = 1.0 - t;
        3.0 * u * u * t * a1 + 3.0 * u * t * t * a2 + t * t * t
    }

    fn slope(a1: f64, a2: f64, t: f64) -> f64 {
        let u = 1.0 - t;
        3.0 * u * u * a1 + 6.0 * u * t * (a2 - a1) + 3.0 * t * t * (1.0 - a2)
    }

    /// Eased output for time fraction `x`.
    pub fn ease(&self, x: f64) -> f64 {
        let x = x.clamp(0.0, 1.0);
        if x == 0.0 || x == 1.0 {
            return x;
        }

        let mut t = x;
        for _ in 0..8 {
            let err = Self::sample(self.x1, self.x2, t) - x;
            if err.abs() < 1e-6 {
                return Self::sample(self.y1, self.y2, t);
            }
            let d = Self::slope(self.x1, self.x2, t);
            if d.abs() < 1e-6 {
                break;
            }
            t -= err / d;
        }

        // Newton stalled; bisect.
        let (mut lo, mut hi) = (0.0, 1.0);
        t = x;
        for _ in 0..32 {
            let value = Self::sample(self.x1, self.x2, t);
            if (value - x).abs() < 1e-7 {
                break;
            }
            if value < x {
                lo = t;
            } else {
                hi = t;
            }
            t = (lo + hi) / 2.0;
        }
        Self::sample(self.y1, self.y2, t)
    }
}

fn progress(start: Instant, duration: Duration, now: Instant) -> f64 {
    if duration.is_zero() {
        return 1.0;
    }
    let elapsed = now.saturating_duration_since(start);
    (elapsed.as_secs_f64() / duration.as_secs_f64()).min(1.0)
}

/// Counts a displayed integer from `from` to `to`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueTween {
    from: i64,
    to: i64,
    start: Instant,
    duration: Duration,
}

impl ValueTween {
    pub fn new(from: i64, to: i64, start: Instant, duration: Duration) -> Self {
        Self {
            from,
            to,
            start,
            duration,
        }
    }

    pub fn value_at(&self, now: Instant) -> i64 {
        let p = progress(self.start, self.duration, now);
        if p >= 1.0 {
            return self.to;
        }
        let delta = (self.to - self.from) as f64;
        self.from + (delta * ease_out_cubic(p)).round() as i64
    }

    pub fn is_done(&self, now: Instant) -> bool {
        progress(self.start, self.duration, now) >= 1.0
    }
}

/// Inverted offset that plays back to rest (the "IP" of FLIP).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveTween {
    offset: f64,
    start: Instant,
    duration: Duration,
}

impl MoveTween {
    pub fn new(offset: f64, start: Instant, duration: Duration) -> Self {
        Self {
            offset,
            start,
            duration,
        }
    }

    pub fn offset_at(&self, now: Instant) -> f64 {
        let p = progress(self.start, self.duration, now);
        self.offset * (1.0 - DECELERATE.ease(p))
    }

    pub fn is_done(&self, now: Instant) -> bool {
        progress(self.start, self.duration, now) >= 1.0
    }
}

/// Offsets (`previous - current`) for identities present in both layouts.
pub fn plan_moves(
    previous: &HashMap<CommentId, f64>,
    current: &HashMap<CommentId, f64>,
) -> HashMap<CommentId, f64> {
    current
        .iter()
        .filter_map(|(id, now_at)| {
            let before = previous.get(id)?;
            let delta = before - now_at;
            (delta.abs() >= MIN_MOVE).then_some((*id, delta))
        })
        .collect()
}

/// Damped viewport follow of one highlighted comment.
#[derive(Debug, Clone, PartialEq)]
pub struct Follow {
    target: CommentId,
    until: Option<Instant>,
    position: Option<f64>,
    damping: f64,
}

impl Follow {
    pub fn new(target: CommentId, damping: f64) -> Self {
        Self {
            target,
            until: None,
            position: None,
            damping: damping.clamp(0.01, 1.0),
        }
    }

    pub fn target(&self) -> CommentId {
        self.target
    }

    /// Opens a follow window after a ranking update.
    pub fn arm(&mut self, now: Instant, window: Duration) {
        self.until = Some(now + window);
    }

    /// Forgets the fractional scroll so the next step starts from the real one.
    pub fn rebaseline(&mut self) {
        self.position = None;
    }

    pub fn is_active(&self, now: Instant) -> bool {
        self.until.is_some_and(|until| now < until)
    }

    /// Next scroll offset that moves `element_at` toward the viewport centre.
    /// Returns `scroll` unchanged outside the window or without an element.
    pub fn step(
        &mut self,
        now: Instant,
        scroll: f64,
        element_at: Option<f64>,
        element_size: f64,
        viewport: f64,
    ) -> f64 {
        if !self.is_active(now) {
            self.position = None;
            return scroll;
        }
        let Some(element_at) = element_at else {
            return scroll;
        };
        let current = self.position.unwrap_or(scroll);
        let desired = (element_at + element_size / 2.0 - viewport / 2.0).max(0.0);
        let diff = desired - current;
        let next = if diff.abs() < 0.5 {
            desired
        } else {
            current + diff * self.damping
        };
        self.position = Some(next);
        next
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    #[serde(with = "humantime_serde")]
    pub value_duration: Duration,
    #[serde(with = "humantime_serde")]
    pub move_duration: Duration,
    #[serde(with = "humantime_serde")]
    pub follow_window: Duration,
    pub follow_damping: f64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            value_duration: VALUE_DURATION,
            move_duration: MOVE_DURATION,
            follow_window: FOLLOW_WINDOW,
            follow_damping: FOLLOW_DAMPING,
        }
    }
}

/// Owns the previous snapshot and every running transition.
#[derive(Debug, Default)]
pub struct Animator {
    config: AnimationConfig,
    previous_positions: HashMap<CommentId, f64>,
    targets: HashMap<CommentId, i64>,
    values: HashMap<CommentId, ValueTween>,
    moves: HashMap<CommentId, MoveTween>,
    follow: Option<Follow>,
}

impl Animator {
    pub fn new(config: AnimationConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Drops every snapshot and transition, e.g. when the target changes.
    pub fn reset(&mut self) {
        self.previous_positions.clear();
        self.targets.clear();
        self.values.clear();
        self.moves.clear();
        if let Some(follow) = self.follow.as_mut() {
            follow.rebaseline();
        }
    }

    pub fn set_highlight(&mut self, id: Option<CommentId>) {
        self.follow = id.map(|id| Follow::new(id, self.config.follow_damping));
    }

    pub fn highlight(&self) -> Option<CommentId> {
        self.follow.as_ref().map(Follow::target)
    }

    /// Diffs `ranking` laid out at `positions` against the previous snapshot.
    pub fn apply(&mut self, ranking: &Ranking, positions: &HashMap<CommentId, f64>, now: Instant) {
        let mut targets = HashMap::with_capacity(ranking.len());
        for comment in &ranking.comments {
            let id = comment.comment_id;
            let next = comment.like_count as i64;
            if let Some(&previous) = self.targets.get(&id) {
                let shown = self
                    .values
                    .get(&id)
                    .map(|tween| tween.value_at(now))
                    .unwrap_or(previous);
                if shown != next {
                    self.values
                        .insert(id, ValueTween::new(shown, next, now, self.config.value_duration));
                }
            }
            targets.insert(id, next);
        }
        self.values.retain(|id, _| targets.contains_key(id));
        self.targets = targets;

        // Start from where an interrupted move currently shows the row.
        let previous: HashMap<CommentId, f64> = self
            .previous_positions
            .iter()
            .map(|(id, at)| (*id, at + self.offset(*id, now)))
            .collect();
        let mut moves = HashMap::new();
        for (id, delta) in plan_moves(&previous, positions) {
            moves.insert(id, MoveTween::new(delta, now, self.config.move_duration));
        }
        self.moves = moves;
        self.previous_positions = positions.clone();

        let window = self.config.follow_window;
        if let Some(follow) = self.follow.as_mut() {
            follow.arm(now, window);
        }
    }

    /// Integer to display for `id`, or `None` when the comment is unknown.
    pub fn display_value(&self, id: CommentId, now: Instant) -> Option<i64> {
        match self.values.get(&id) {
            Some(tween) => Some(tween.value_at(now)),
            None => self.targets.get(&id).copied(),
        }
    }

    /// Current visual offset from the rest position; zero for unknown ids.
    pub fn offset(&self, id: CommentId, now: Instant) -> f64 {
        self.moves
            .get(&id)
            .map(|tween| tween.offset_at(now))
            .unwrap_or(0.0)
    }

    /// Removes finished transitions. Returns whether anything is still running.
    pub fn prune(&mut self, now: Instant) -> bool {
        self.values.retain(|_, tween| !tween.is_done(now));
        self.moves.retain(|_, tween| !tween.is_done(now));
        self.is_animating(now)
    }

    pub fn is_animating(&self, now: Instant) -> bool {
        !self.values.is_empty()
            || !self.moves.is_empty()
            || self.follow.as_ref().is_some_and(|f| f.is_active(now))
    }

    pub fn rebaseline(&mut self) {
        if let Some(follow) = self.follow.as_mut() {
            follow.rebaseline();
        }
    }

    /// Damped scroll toward the highlighted comment; `scroll` when nothing to follow.
    pub fn follow_scroll(
        &mut self,
        now: Instant,
        scroll: f64,
        positions: &HashMap<CommentId, f64>,
        element_size: f64,
        viewport: f64,
    ) -> f64 {
        let Some(follow) = self.follow.as_mut() else {
            return scroll;
        };
        let element_at = positions.get(&follow.target()).copied();
        follow.step(now, scroll, element_at, element_size, viewport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::RankedComment;

    fn ranking(entries: &[(CommentId, u64)]) -> Ranking {
        Ranking {
            comments: entries
                .iter()
                .map(|(id, likes)| RankedComment {
                    comment_id: *id,
                    author_id: String::new(),
                    display_name: String::new(),
                    like_count: *likes,
                    registered_at: String::new(),
                    avatar_url: String::new(),
                    best_top: false,
                })
                .collect(),
            ranks: (1..=entries.len() as u32).collect(),
            total_count: entries.len(),
            last_observed_page_count: 1,
        }
    }

    fn rows(ids: &[CommentId]) -> HashMap<CommentId, f64> {
        ids.iter()
            .enumerate()
            .map(|(row, id)| (*id, row as f64))
            .collect()
    }

    #[test]
    fn easing_endpoints() {
        assert_eq!(ease_out_cubic(0.0), 0.0);
        assert_eq!(ease_out_cubic(1.0), 1.0);
        assert!(ease_out_cubic(0.5) > 0.5);
        assert_eq!(DECELERATE.ease(0.0), 0.0);
        assert_eq!(DECELERATE.ease(1.0), 1.0);
        let mid = DECELERATE.ease(0.5);
        assert!(mid > 0.8 && mid < 1.0, "mid was {mid}");
    }

    #[test]
    fn bezier_is_monotonic() {
        let mut last = 0.0;
        for step in 1..=20 {
            let value = DECELERATE.ease(step as f64 / 20.0);
            assert!(value >= last - 1e-9);
            last = value;
        }
    }

    #[test]
    fn value_tween_counts_toward_target() {
        let start = Instant::now();
        let tween = ValueTween::new(100, 200, start, Duration::from_millis(800));
        assert_eq!(tween.value_at(start), 100);
        let mid = tween.value_at(start + Duration::from_millis(400));
        assert!(mid > 150 && mid < 200, "mid was {mid}");
        assert_eq!(tween.value_at(start + Duration::from_millis(800)), 200);
        assert!(tween.is_done(start + Duration::from_secs(1)));

        let down = ValueTween::new(50, 10, start, Duration::from_millis(800));
        assert_eq!(down.value_at(start + Duration::from_secs(2)), 10);
    }

    #[test]
    fn plan_moves_skips_new_and_still_rows() {
        let previous = rows(&[1, 2, 3]);
        let current = rows(&[3, 1, 4, 2]);
        let moves = plan_moves(&previous, &current);
        assert_eq!(moves.get(&3), Some(&2.0));
        assert_eq!(moves.get(&1), Some(&-1.0));
        assert_eq!(moves.get(&2), Some(&-2.0));
        assert!(!moves.contains_key(&4));

        let tiny: HashMap<CommentId, f64> = [(1, 0.4)].into_iter().collect();
        assert!(plan_moves(&rows(&[1]), &tiny).is_empty());
    }

    #[test]
    fn animator_starts_value_and_move_transitions() {
        let start = Instant::now();
        let mut animator = Animator::new(AnimationConfig::default());

        animator.apply(&ranking(&[(1, 10), (2, 5)]), &rows(&[1, 2]), start);
        assert_eq!(animator.display_value(1, start), Some(10));
        assert_eq!(animator.offset(1, start), 0.0);
        assert!(!animator.is_animating(start));

        let later = start + Duration::from_secs(10);
        animator.apply(&ranking(&[(2, 20), (1, 10)]), &rows(&[2, 1]), later);
        assert_eq!(animator.display_value(2, later), Some(5));
        assert_eq!(animator.offset(2, later), 1.0);
        assert_eq!(animator.offset(1, later), -1.0);
        assert!(animator.is_animating(later));

        let done = later + Duration::from_secs(1);
        assert_eq!(animator.display_value(2, done), Some(20));
        assert_eq!(animator.offset(2, done), 0.0);
        assert!(!animator.prune(done));
    }

    #[test]
    fn disappearing_rows_drop_their_transitions() {
        let start = Instant::now();
        let mut animator = Animator::new(AnimationConfig::default());
        animator.apply(&ranking(&[(1, 10), (2, 5)]), &rows(&[1, 2]), start);
        animator.apply(&ranking(&[(2, 50), (1, 10)]), &rows(&[2, 1]), start);
        animator.apply(&ranking(&[(1, 11)]), &rows(&[1]), start);
        assert_eq!(animator.display_value(2, start), None);
        assert_eq!(animator.offset(2, start), 0.0);
    }

    #[test]
    fn retarget_starts_from_displayed_value() {
        let start = Instant::now();
        let mut animator = Animator::new(AnimationConfig::default());
        animator.apply(&ranking(&[(1, 0)]), &rows(&[1]), start);
        animator.apply(&ranking(&[(1, 100)]), &rows(&[1]), start);
        let mid = start + Duration::from_millis(400);
        let shown = animator.display_value(1, mid).unwrap();
        animator.apply(&ranking(&[(1, 0)]), &rows(&[1]), mid);
        assert_eq!(animator.display_value(1, mid), Some(shown));
    }

    #[test]
    fn follow_converges_within_window() {
        let start = Instant::now();
        let mut follow = Follow::new(7, 0.5);
        assert_eq!(follow.step(start, 0.0, Some(50.0), 1.0, 10.0), 0.0);

        follow.arm(start, Duration::from_secs(1));
        let mut scroll = 0.0;
        for _ in 0..40 {
            scroll = follow.step(start, scroll, Some(50.0), 1.0, 10.0);
        }
        assert!((scroll - 45.5).abs() < 1e-9, "scroll was {scroll}");

        assert_eq!(follow.step(start, 3.0, None, 1.0, 10.0), 3.0);
        let after = start + Duration::from_secs(2);
        assert_eq!(follow.step(after, 3.0, Some(50.0), 1.0, 10.0), 3.0);
    }

    #[test]
    fn follow_rebaseline_uses_real_scroll() {
        let start = Instant::now();
        let mut follow = Follow::new(1, 0.5);
        follow.arm(start, Duration::from_secs(1));
        let first = follow.step(start, 0.0, Some(20.0), 0.0, 0.0);
        assert_eq!(first, 10.0);
        follow.rebaseline();
        let second = follow.step(start, 16.0, Some(20.0), 0.0, 0.0);
        assert_eq!(second, 18.0);
    }

    #[test]
    fn animator_follow_tracks_highlight() {
        let start = Instant::now();
        let mut animator = Animator::new(AnimationConfig::default());
        animator.set_highlight(Some(2));
        let positions = rows(&[1, 2]);
        animator.apply(&ranking(&[(1, 10), (2, 5)]), &positions, start);
        let scroll = animator.follow_scroll(start, 0.0, &positions, 1.0, 1.0);
        assert!(scroll > 0.0);
        animator.set_highlight(None);
        assert_eq!(animator.follow_scroll(start, 0.0, &positions, 1.0, 1.0), 0.0);
    }
}
