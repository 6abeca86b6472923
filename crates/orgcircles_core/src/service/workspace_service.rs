//! Workspace command surface.
//!
//! # Responsibility
//! - Expose every model command to UI adapters as plain calls returning
//!   results.
//! - After each successful mutation: save the snapshot (write-through),
//!   rebuild the layout, re-anchor focus.
//! - Feed rendering surfaces with layout records, focus and label state.
//!
//! # Invariants
//! - A rejected command changes nothing and writes nothing.
//! - A failed save never rolls back the in-memory model; it is reported in
//!   `Committed::persist_error`.
//! - The layout always reflects the current model.

use crate::config::WorkspaceConfig;
use crate::error::OrgResult;
use crate::focus::{FocusController, LabelState, ViewWindow};
use crate::layout::PackLayout;
use crate::model::{
    IdGenerator, MemberId, NodeId, NodeKind, RandomIdGenerator, Template, TemplateId,
};
use crate::org::{Confirmation, Organization, RoleEditOutcome};
use crate::repo::{SnapshotStore, StoreError};
use log::{error, info, warn};
use std::time::{Duration, Instant};

/// Outcome of a command that passed validation and mutated the model.
#[derive(Debug)]
pub struct Committed<T> {
    pub value: T,
    /// Set when the write-through save failed. The model keeps the change.
    pub persist_error: Option<StoreError>,
}

impl<T> Committed<T> {
    pub fn is_persisted(&self) -> bool {
        self.persist_error.is_none()
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

/// One node as the rendering surface should draw it.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameNode {
    pub id: NodeId,
    pub kind: NodeKind,
    pub name: String,
    pub depth: usize,
    /// Offset from the viewport center in screen units.
    pub screen_x: f64,
    pub screen_y: f64,
    pub screen_radius: f64,
    pub label: LabelState,
}

/// Everything a rendering surface needs for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub focus: NodeId,
    pub view: ViewWindow,
    pub scale: f64,
    pub animating: bool,
    pub nodes: Vec<FrameNode>,
}

/// Use-case service owning the model, its store, layout and focus.
pub struct WorkspaceService<S: SnapshotStore> {
    org: Organization,
    store: S,
    config: WorkspaceConfig,
    layout: PackLayout,
    focus: FocusController,
}

impl<S: SnapshotStore> WorkspaceService<S> {
    /// Loads the stored snapshot, or starts from the default model.
    pub fn open(store: S, config: WorkspaceConfig) -> Self {
        Self::open_with_ids(store, config, Box::new(RandomIdGenerator))
    }

    /// Same as [`WorkspaceService::open`] with a caller-chosen id generator.
    ///
    /// Missing, undecodable or invariant-violating snapshots never fail the
    /// open; they are logged and replaced by the default model.
    pub fn open_with_ids(store: S, config: WorkspaceConfig, ids: Box<dyn IdGenerator>) -> Self {
        let started_at = Instant::now();
        let org = match load_organization(&store) {
            Some(org) => org.with_ids(ids),
            None => Organization::with_id_generator(ids),
        };
        let layout = PackLayout::compute(org.tree(), &config.layout);
        let focus = FocusController::new(&layout, config.focus);
        info!(
            "event=workspace_open module=service status=ok nodes={} members={} templates={} duration_ms={}",
            org.tree().len(),
            org.members().len(),
            org.templates().len(),
            started_at.elapsed().as_millis()
        );
        Self {
            org,
            store,
            config,
            layout,
            focus,
        }
    }

    pub fn organization(&self) -> &Organization {
        &self.org
    }

    pub fn layout(&self) -> &PackLayout {
        &self.layout
    }

    pub fn focus(&self) -> &FocusController {
        &self.focus
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn add_circle(
        &mut self,
        parent_id: NodeId,
        name: &str,
        description: &str,
        driver: &str,
    ) -> OrgResult<Committed<NodeId>> {
        self.run("add_circle", |org| {
            org.insert_circle(parent_id, name, description, driver)
        })
    }

    pub fn edit_circle(
        &mut self,
        node_id: NodeId,
        name: &str,
        description: &str,
        driver: &str,
        new_parent_id: Option<NodeId>,
    ) -> OrgResult<Committed<()>> {
        self.run("edit_circle", |org| {
            org.edit_circle(node_id, name, description, driver, new_parent_id)
        })
    }

    pub fn delete_circle(&mut self, node_id: NodeId) -> OrgResult<Committed<usize>> {
        self.run("delete_circle", |org| org.delete_circle(node_id))
    }

    pub fn add_role(
        &mut self,
        parent_id: NodeId,
        name: &str,
        description: &str,
        driver: &str,
    ) -> OrgResult<Committed<NodeId>> {
        self.run("add_role", |org| {
            org.insert_role(parent_id, name, description, driver)
        })
    }

    pub fn add_role_from_template(
        &mut self,
        parent_id: NodeId,
        template_id: TemplateId,
    ) -> OrgResult<Committed<NodeId>> {
        self.run("add_role_from_template", |org| {
            org.insert_role_from_template(parent_id, template_id)
        })
    }

    pub fn edit_role(
        &mut self,
        node_id: NodeId,
        name: &str,
        description: &str,
        driver: &str,
        new_parent_id: Option<NodeId>,
    ) -> OrgResult<Committed<RoleEditOutcome>> {
        self.run("edit_role", |org| {
            org.edit_role(node_id, name, description, driver, new_parent_id)
        })
    }

    pub fn delete_role(&mut self, node_id: NodeId) -> OrgResult<Committed<()>> {
        self.run("delete_role", |org| org.delete_role(node_id))
    }

    pub fn add_member(&mut self, name: &str, description: &str) -> OrgResult<Committed<MemberId>> {
        self.run("add_member", |org| org.add_member(name, description))
    }

    pub fn edit_member(
        &mut self,
        member_id: MemberId,
        name: &str,
        description: &str,
    ) -> OrgResult<Committed<()>> {
        self.run("edit_member", |org| {
            org.edit_member(member_id, name, description)
        })
    }

    pub fn delete_member(&mut self, member_id: MemberId) -> OrgResult<Committed<usize>> {
        self.run("delete_member", |org| org.delete_member(member_id))
    }

    /// Links a member to a role. Nothing is saved when the call is a no-op.
    pub fn assign_member(&mut self, member_id: MemberId, role_id: NodeId) -> Committed<bool> {
        let changed = self.org.assign(member_id, role_id);
        self.settle_if("assign_member", changed)
    }

    /// Unlinks a member from a role. Nothing is saved when the call is a no-op.
    pub fn unassign_member(
        &mut self,
        member_id: MemberId,
        role_id: NodeId,
        confirmation: Confirmation<'_>,
    ) -> Committed<bool> {
        let changed = self.org.unassign(member_id, role_id, confirmation);
        self.settle_if("unassign_member", changed)
    }

    pub fn toggle_member(&mut self, member_id: MemberId, role_id: NodeId) -> Committed<bool> {
        let changed = self.org.toggle(member_id, role_id);
        self.settle_if("toggle_member", changed)
    }

    pub fn add_template(&mut self, name: &str, description: &str) -> OrgResult<Committed<Template>> {
        self.run("add_template", |org| org.create_template(name, description))
    }

    pub fn edit_template(
        &mut self,
        template_id: TemplateId,
        name: &str,
        description: &str,
    ) -> OrgResult<Committed<usize>> {
        self.run("edit_template", |org| {
            org.edit_template(template_id, name, description)
        })
    }

    pub fn delete_template(&mut self, template_id: TemplateId) -> OrgResult<Committed<usize>> {
        self.run("delete_template", |org| org.delete_template(template_id))
    }

    /// Starts a transition to `id`. `Ok(false)` when it already is the focus.
    pub fn select_node(&mut self, id: NodeId) -> OrgResult<bool> {
        self.focus.select(id, &self.layout)
    }

    pub fn reset_focus_to_root(&mut self) -> bool {
        self.focus.reset_to_root(&self.layout)
    }

    /// Handles a click given as an offset from the viewport center.
    pub fn click(&mut self, screen_x: f64, screen_y: f64) -> bool {
        let view = self.focus.view();
        let (x, y) = view.unproject(screen_x, screen_y, self.scale_for(view));
        self.focus.click(x, y, &self.layout)
    }

    /// Advances the focus animation. Returns whether it is still running.
    pub fn tick(&mut self, dt: Duration) -> bool {
        self.focus.tick(dt)
    }

    /// Changes the viewport and rebuilds the layout.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.config.layout.width = width;
        self.config.layout.height = height;
        self.rebuild();
    }

    pub fn label_states(&self) -> Vec<(NodeId, LabelState)> {
        self.focus.label_states(&self.layout)
    }

    /// Screen-space description of the current frame.
    pub fn frame(&self) -> Frame {
        let view = self.focus.view();
        let scale = self.scale_for(view);
        let nodes = self
            .layout
            .iter()
            .filter_map(|record| {
                let label = self.focus.label_state(record.id, &self.layout)?;
                let (screen_x, screen_y) = view.project(record.x, record.y, scale);
                Some(FrameNode {
                    id: record.id,
                    kind: record.kind,
                    name: record.name.clone(),
                    depth: record.depth,
                    screen_x,
                    screen_y,
                    screen_radius: record.radius * scale,
                    label,
                })
            })
            .collect();
        Frame {
            focus: self.focus.focus(),
            view,
            scale,
            animating: self.focus.is_animating(),
            nodes,
        }
    }

    fn scale_for(&self, view: ViewWindow) -> f64 {
        view.scale(
            self.config.layout.width,
            self.config.layout.height,
            self.config.focus.fit_margin,
        )
    }

    fn run<T>(
        &mut self,
        command: &'static str,
        op: impl FnOnce(&mut Organization) -> OrgResult<T>,
    ) -> OrgResult<Committed<T>> {
        let started_at = Instant::now();
        match op(&mut self.org) {
            Ok(value) => {
                let persist_error = self.settle();
                info!(
                    "event=command module=service status=ok command={command} persisted={} duration_ms={}",
                    persist_error.is_none(),
                    started_at.elapsed().as_millis()
                );
                Ok(Committed {
                    value,
                    persist_error,
                })
            }
            Err(err) => {
                warn!(
                    "event=command module=service status=error command={command} error_code={}",
                    err.code()
                );
                Err(err)
            }
        }
    }

    fn settle_if(&mut self, command: &'static str, changed: bool) -> Committed<bool> {
        if !changed {
            info!("event=command module=service status=skip command={command}");
            return Committed {
                value: false,
                persist_error: None,
            };
        }
        let persist_error = self.settle();
        info!(
            "event=command module=service status=ok command={command} persisted={}",
            persist_error.is_none()
        );
        Committed {
            value: true,
            persist_error,
        }
    }

    /// Save, rebuild, re-anchor.
    fn settle(&mut self) -> Option<StoreError> {
        let persist_error = self.store.save(&self.org.to_snapshot()).err();
        if let Some(err) = &persist_error {
            error!(
                "event=snapshot_save module=service status=error error_code={}",
                err.code()
            );
        }
        self.rebuild();
        persist_error
    }

    fn rebuild(&mut self) {
        self.layout = PackLayout::compute(self.org.tree(), &self.config.layout);
        self.focus.reanchor(&self.layout);
    }
}

fn load_organization<S: SnapshotStore>(store: &S) -> Option<Organization> {
    let snapshot = match store.load() {
        Ok(Some(snapshot)) => snapshot,
        Ok(None) => {
            info!("event=snapshot_load module=service status=skip reason=empty");
            return None;
        }
        Err(err) => {
            warn!(
                "event=snapshot_load module=service status=error error_code={} fallback=default",
                err.code()
            );
            return None;
        }
    };
    match Organization::from_snapshot(&snapshot) {
        Ok(org) => {
            info!("event=snapshot_load module=service status=ok");
            Some(org)
        }
        Err(err) => {
            warn!(
                "event=snapshot_load module=service status=error error_code={} fallback=default",
                err.code()
            );
            None
        }
    }
}
