//! Follow-the-bottom behavior for the transcript view.
//!
//! The tracker only sees numbers the presentation layer reports; it owns no
//! viewport.  It answers one question after every transcript change: should
//! the view jump to the bottom?
//!
//! A report far from the bottom detaches unless the content height changed
//! since the previous report.  A height change means the layout grew under
//! the viewport, which is not the viewer's doing.  How far the viewport moved
//! between two reports does not matter, so a slow drag detaches just like a
//! fling.

/// Distance from the bottom, in pixels, that still counts as "at the bottom".
pub const DEFAULT_FOLLOW_THRESHOLD: f32 = 50.0;
/// Content height changes below this are rounding, not layout growth.
const CONTENT_DELTA_EPSILON: f32 = 1.0;

/// A viewport position, as reported on every scroll event.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScrollMetrics {
    /// Distance scrolled from the top of the content.
    pub offset: f32,
    /// Height of the visible area.
    pub viewport_height: f32,
    /// Height of the whole transcript.
    pub content_height: f32,
}

impl ScrollMetrics {
    /// Distance between the bottom of the viewport and the bottom of the
    /// content.
    pub fn distance_from_bottom(&self) -> f32 {
        (self.content_height - (self.offset + self.viewport_height)).max(0.0)
    }
}

/// Whether the view auto-scrolls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowState {
    /// Scroll to the bottom on every transcript change.
    Following,
    /// The viewer scrolled away; leave the view alone.
    Detached,
}

/// Tracks whether the viewer wants the transcript to follow new content.
#[derive(Debug, Clone)]
pub struct ScrollTracker {
    state: FollowState,
    threshold: f32,
    last_content_height: Option<f32>,
    pending_scroll_to_bottom: bool,
}

impl ScrollTracker {
    /// Creates a tracker in the `Following` state.
    pub fn new(threshold: f32) -> Self {
        Self {
            state: FollowState::Following,
            threshold: threshold.max(0.0),
            last_content_height: None,
            pending_scroll_to_bottom: false,
        }
    }

    pub fn state(&self) -> FollowState {
        self.state
    }

    pub fn follow_bottom(&self) -> bool {
        self.state == FollowState::Following
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Feed a scroll event from the presentation layer.
    ///
    /// Leaves `Following` when the viewport sits more than the threshold away
    /// from the bottom of content whose height has not changed, and no scroll
    /// to the bottom is still pending.  Returns to `Following` as soon as the
    /// viewport is back within the threshold.
    pub fn report_scroll(&mut self, metrics: ScrollMetrics) -> FollowState {
        let near_bottom = metrics.distance_from_bottom() <= self.threshold;
        let content_changed = self
            .last_content_height
            .is_some_and(|height| (metrics.content_height - height).abs() > CONTENT_DELTA_EPSILON);

        match self.state {
            FollowState::Following
                if !near_bottom && !content_changed && !self.pending_scroll_to_bottom =>
            {
                tracing::trace!(offset = metrics.offset, "autoscroll detached");
                self.state = FollowState::Detached;
            }
            FollowState::Detached if near_bottom => {
                tracing::trace!(offset = metrics.offset, "autoscroll resumed");
                self.state = FollowState::Following;
            }
            _ => {}
        }

        self.last_content_height = Some(metrics.content_height);
        self.state
    }

    /// Force `Following` and request a scroll, as on a new submission.
    pub fn jump_to_bottom(&mut self) {
        self.state = FollowState::Following;
        self.pending_scroll_to_bottom = true;
    }

    /// Note a transcript change.  Requests a scroll only while `Following`.
    pub fn on_transcript_changed(&mut self) -> bool {
        if self.follow_bottom() {
            self.pending_scroll_to_bottom = true;
        }
        self.pending_scroll_to_bottom
    }

    /// Consume the pending scroll request.  The presentation layer scrolls to
    /// the bottom when this returns true.
    pub fn apply_pending_scroll(&mut self) -> bool {
        let should_scroll = self.pending_scroll_to_bottom && self.follow_bottom();
        self.pending_scroll_to_bottom = false;
        should_scroll
    }

    pub fn reset(&mut self) {
        self.state = FollowState::Following;
        self.last_content_height = None;
        self.pending_scroll_to_bottom = true;
    }
}

impl Default for ScrollTracker {
    fn default() -> Self {
        Self::new(DEFAULT_FOLLOW_THRESHOLD)
    }
}
