//! Focus Controller: which node is centered and how the view gets there.
//!
//! # Responsibility
//! - Track the focused node and the current view window.
//! - Animate focus changes along a smooth zoom path, driven by host ticks.
//! - Derive per-node label visibility, opacity and font size.
//! - Re-anchor focus by identity after every layout rebuild.
//!
//! # Invariants
//! - At most one transition is active; a new one starts from the current
//!   intermediate view and replaces the old one.
//! - The focused id always exists in the most recent layout passed in.
//! - A deleted focus falls back to its nearest surviving ancestor, then root.

mod zoom;

pub use zoom::{ease_cubic_in_out, ViewWindow, ZoomPath};

use crate::error::{OrgError, OrgResult};
use crate::layout::{LayoutRecord, PackLayout};
use crate::model::NodeId;
use log::debug;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Focus and label tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusConfig {
    /// Length of one focus transition in milliseconds.
    pub transition_ms: u64,
    /// Target window diameter as a multiple of the focused radius.
    pub overscan: f64,
    /// Fraction of the viewport the window may fill.
    pub fit_margin: f64,
    /// Upper bound for label font size.
    pub max_label_font: f64,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            transition_ms: 750,
            overscan: 2.1,
            fit_margin: 0.95,
            max_label_font: 12.0,
        }
    }
}

impl FocusConfig {
    pub fn transition(&self) -> Duration {
        Duration::from_millis(self.transition_ms)
    }
}

/// Label presentation for one node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelState {
    /// Whether the label is displayed at all.
    pub visible: bool,
    /// Fade level in `[0, 1]`.
    pub opacity: f64,
    pub font_size: f64,
}

#[derive(Debug, Clone)]
struct Transition {
    path: ZoomPath,
    previous_focus: NodeId,
    elapsed: Duration,
    duration: Duration,
}

impl Transition {
    fn eased_progress(&self) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let t = self.elapsed.as_secs_f64() / self.duration.as_secs_f64();
        ease_cubic_in_out(t.min(1.0))
    }
}

/// Focus state machine.
#[derive(Debug, Clone)]
pub struct FocusController {
    config: FocusConfig,
    focus: NodeId,
    focus_path: Vec<NodeId>,
    view: ViewWindow,
    transition: Option<Transition>,
}

impl FocusController {
    /// Starts focused on the layout root with the root window in view.
    pub fn new(layout: &PackLayout, config: FocusConfig) -> Self {
        let root = layout.root();
        Self {
            config,
            focus: root.id,
            focus_path: vec![root.id],
            view: ViewWindow::around(root, config.overscan),
            transition: None,
        }
    }

    pub fn focus(&self) -> NodeId {
        self.focus
    }

    /// Ids from the root down to the focus.
    pub fn focus_path(&self) -> &[NodeId] {
        &self.focus_path
    }

    /// Current, possibly intermediate, view window.
    pub fn view(&self) -> ViewWindow {
        self.view
    }

    /// Window the current transition is heading to, or the current view.
    pub fn target_view(&self) -> ViewWindow {
        self.transition
            .as_ref()
            .map_or(self.view, |transition| transition.path.to())
    }

    pub fn is_animating(&self) -> bool {
        self.transition.is_some()
    }

    /// Eased progress of the active transition; `1.0` when idle.
    pub fn progress(&self) -> f64 {
        self.transition
            .as_ref()
            .map_or(1.0, Transition::eased_progress)
    }

    pub fn config(&self) -> &FocusConfig {
        &self.config
    }

    /// Focuses `id`. Returns `Ok(false)` when it already is the focus.
    pub fn select(&mut self, id: NodeId, layout: &PackLayout) -> OrgResult<bool> {
        if layout.get(id).is_none() {
            return Err(OrgError::NodeNotFound(id));
        }
        if id == self.focus {
            return Ok(false);
        }
        self.begin(id, layout);
        Ok(true)
    }

    /// Focuses the root. Returns `false` when it already is the focus.
    pub fn reset_to_root(&mut self, layout: &PackLayout) -> bool {
        let root_id = layout.root().id;
        if root_id == self.focus {
            return false;
        }
        self.begin(root_id, layout);
        true
    }

    /// Handles a click at layout coordinates.
    ///
    /// Clicking a circle selects it; clicking outside every circle resets
    /// to the root. Returns whether a transition started.
    pub fn click(&mut self, x: f64, y: f64, layout: &PackLayout) -> bool {
        match layout.hit_test(x, y) {
            Some(id) => self.select(id, layout).unwrap_or(false),
            None => self.reset_to_root(layout),
        }
    }

    /// Advances the active transition. Returns whether it is still running.
    pub fn tick(&mut self, dt: Duration) -> bool {
        let Some(transition) = self.transition.as_mut() else {
            return false;
        };
        transition.elapsed = transition.elapsed.saturating_add(dt);
        if transition.elapsed >= transition.duration {
            self.view = transition.path.to();
            self.transition = None;
            debug!("event=focus_transition module=focus status=done");
            return false;
        }
        self.view = transition.path.at(transition.eased_progress());
        true
    }

    /// Re-resolves focus against a rebuilt layout.
    ///
    /// Keeps the focus when it survived, otherwise falls back to the nearest
    /// surviving ancestor on the remembered path, then to the root. Starts a
    /// transition when the target window moved.
    pub fn reanchor(&mut self, layout: &PackLayout) -> NodeId {
        let anchor = self
            .focus_path
            .iter()
            .rev()
            .copied()
            .find(|id| layout.get(*id).is_some())
            .unwrap_or(layout.root().id);
        let Some(record) = layout.get(anchor) else {
            return self.focus;
        };
        let target = ViewWindow::around(record, self.config.overscan);
        let previous_focus = self.focus;
        self.focus = anchor;
        self.focus_path = layout.path_to(anchor);

        if !self.target_view().approx_eq(&target) || self.focus != previous_focus {
            self.start_transition(previous_focus, target);
        }
        if anchor != previous_focus {
            debug!("event=focus_reanchor module=focus status=fallback");
        }
        anchor
    }

    /// Label state for one node of `layout`.
    pub fn label_state(&self, id: NodeId, layout: &PackLayout) -> Option<LabelState> {
        let record = layout.get(id)?;
        let visible = is_labelled(record, self.focus);
        let opacity = match &self.transition {
            Some(transition) => {
                let from = if is_labelled(record, transition.previous_focus) {
                    1.0
                } else {
                    0.0
                };
                let to = if visible { 1.0 } else { 0.0 };
                from + (to - from) * transition.eased_progress()
            }
            None if visible => 1.0,
            None => 0.0,
        };
        Some(LabelState {
            visible,
            opacity,
            font_size: (record.radius / 3.0).min(self.config.max_label_font),
        })
    }

    /// Label states for every node, in layout order.
    pub fn label_states(&self, layout: &PackLayout) -> Vec<(NodeId, LabelState)> {
        layout
            .iter()
            .filter_map(|record| Some((record.id, self.label_state(record.id, layout)?)))
            .collect()
    }

    fn begin(&mut self, target_id: NodeId, layout: &PackLayout) {
        let Some(record) = layout.get(target_id) else {
            return;
        };
        let target = ViewWindow::around(record, self.config.overscan);
        let previous_focus = self.focus;
        self.focus = target_id;
        self.focus_path = layout.path_to(target_id);
        self.start_transition(previous_focus, target);
    }

    fn start_transition(&mut self, previous_focus: NodeId, target: ViewWindow) {
        let duration = self.config.transition();
        if duration.is_zero() {
            self.view = target;
            self.transition = None;
            return;
        }
        debug!(
            "event=focus_transition module=focus status=start duration_ms={}",
            duration.as_millis()
        );
        self.transition = Some(Transition {
            path: ZoomPath::new(self.view, target),
            previous_focus,
            elapsed: Duration::ZERO,
            duration,
        });
    }
}

/// A label shows for direct children of the focus, and for a focused leaf.
fn is_labelled(record: &LayoutRecord, focus: NodeId) -> bool {
    record.parent == Some(focus) || (record.id == focus && !record.has_children())
}
