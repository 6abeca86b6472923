//! Pack Layout Engine.
//!
//! # Responsibility
//! - Map the organization tree onto nested circles: children strictly inside
//!   their parent, siblings never overlapping, every enclosure minimal.
//! - Scale the pack to the configured viewport, centered on the root.
//!
//! # Invariants
//! - Layout is pure: it reads the tree and never mutates it.
//! - Deeper nodes are packed before shallower ones (bottom-up), and siblings,
//!   which always share a depth, are ordered by case-insensitive name, then
//!   id. Stored child order is untouched.
//! - Output is deterministic for a given tree and config.
//!
//! # See also
//! - src/focus/mod.rs for how records feed the view

mod enclose;
mod siblings;

use crate::model::{NodeId, NodeKind};
use crate::org::OrgTree;
use enclose::{Circle, Lcg};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;

const PADDING_REFINE_STEPS: usize = 16;
const PADDING_REFINE_TOLERANCE: f64 = 1e-12;

/// Layout tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackLayoutConfig {
    /// Viewport width in output units.
    pub width: f64,
    /// Viewport height in output units.
    pub height: f64,
    /// Gap between siblings, and between children and their parent's rim.
    pub padding: f64,
    /// Nominal weight of every leaf; leaf radius is its square root.
    pub leaf_weight: f64,
}

impl Default for PackLayoutConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            padding: 4.0,
            leaf_weight: 100.0,
        }
    }
}

/// Placement of one node.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutRecord {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub depth: usize,
    pub kind: NodeKind,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    /// Child ids in packing order.
    pub children: Vec<NodeId>,
}

impl LayoutRecord {
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Returns whether the point lies inside (or on) this circle.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        let dx = x - self.x;
        let dy = y - self.y;
        dx * dx + dy * dy <= self.radius * self.radius
    }
}

/// Packed circles for a whole tree, in pre-order.
#[derive(Debug, Clone)]
pub struct PackLayout {
    records: Vec<LayoutRecord>,
    index: HashMap<NodeId, usize>,
}

#[derive(Debug)]
struct WorkNode {
    id: NodeId,
    parent: Option<usize>,
    children: Vec<usize>,
    depth: usize,
    kind: NodeKind,
    name: String,
    x: f64,
    y: f64,
    r: f64,
}

impl PackLayout {
    /// Computes the layout of `tree` under `config`.
    pub fn compute(tree: &OrgTree, config: &PackLayoutConfig) -> Self {
        let started_at = Instant::now();
        let mut nodes = build_work_tree(tree);
        let extent = config.width.min(config.height).max(1.0);
        let padding = config.padding.max(0.0);
        let leaf_radius = if config.leaf_weight > 0.0 {
            config.leaf_weight.sqrt()
        } else {
            1.0
        };
        for node in nodes.iter_mut().filter(|node| node.children.is_empty()) {
            node.r = leaf_radius;
        }

        // First pass packs in raw units to learn the root size; the second
        // pass expresses padding in raw units so that it lands on `padding`
        // after the final scale. The scale itself depends on the padded
        // root, so the second pass is repeated until that ratio settles.
        let mut random = Lcg::new();
        pack_all(&mut nodes, padding * 0.5, &mut random);
        let mut raw_padding = padding * nodes[0].r / extent;
        for _ in 0..PADDING_REFINE_STEPS {
            pack_all(&mut nodes, raw_padding, &mut random);
            let next = padding * nodes[0].r / extent;
            let settled = (next - raw_padding).abs() <= PADDING_REFINE_TOLERANCE * next.max(1.0);
            raw_padding = next;
            if settled || padding == 0.0 {
                break;
            }
        }

        let scale = if nodes[0].r > 0.0 {
            extent / (2.0 * nodes[0].r)
        } else {
            1.0
        };
        place_absolute(&mut nodes, scale);

        let records: Vec<LayoutRecord> = nodes
            .iter()
            .map(|node| LayoutRecord {
                id: node.id,
                parent: node.parent.map(|p| nodes[p].id),
                depth: node.depth,
                kind: node.kind,
                name: node.name.clone(),
                x: node.x,
                y: node.y,
                radius: node.r,
                children: node.children.iter().map(|c| nodes[*c].id).collect(),
            })
            .collect();
        let index = records
            .iter()
            .enumerate()
            .map(|(position, record)| (record.id, position))
            .collect();

        debug!(
            "event=layout_compute module=layout status=ok nodes={} duration_ms={}",
            records.len(),
            started_at.elapsed().as_millis()
        );
        Self { records, index }
    }

    pub fn root(&self) -> &LayoutRecord {
        // A tree always has its root, so the first record always exists.
        &self.records[0]
    }

    pub fn get(&self, id: NodeId) -> Option<&LayoutRecord> {
        self.index.get(&id).map(|position| &self.records[*position])
    }

    /// Records in pre-order of packing order.
    pub fn records(&self) -> &[LayoutRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &LayoutRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Ids from the root down to `id`, both included.
    pub fn path_to(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut cursor = self.get(id);
        while let Some(record) = cursor {
            path.push(record.id);
            cursor = record.parent.and_then(|parent| self.get(parent));
        }
        path.reverse();
        path
    }

    /// Deepest node whose circle contains the point, if any.
    pub fn hit_test(&self, x: f64, y: f64) -> Option<NodeId> {
        self.records
            .iter()
            .filter(|record| record.contains_point(x, y))
            .max_by_key(|record| record.depth)
            .map(|record| record.id)
    }
}

fn build_work_tree(tree: &OrgTree) -> Vec<WorkNode> {
    let mut nodes: Vec<WorkNode> = Vec::with_capacity(tree.len());
    let mut stack: Vec<(NodeId, Option<usize>, usize)> = vec![(tree.root_id(), None, 0)];
    while let Some((id, parent, depth)) = stack.pop() {
        let Some(node) = tree.find_node(id) else {
            continue;
        };
        let position = nodes.len();
        nodes.push(WorkNode {
            id,
            parent,
            children: Vec::new(),
            depth,
            kind: node.kind,
            name: node.name.clone(),
            x: 0.0,
            y: 0.0,
            r: 0.0,
        });
        if let Some(parent) = parent {
            nodes[parent].children.push(position);
        }

        let mut children: Vec<(String, NodeId)> = tree
            .children(id)
            .iter()
            .filter_map(|child| Some((tree.find_node(*child)?.name.to_lowercase(), *child)))
            .collect();
        children.sort();
        for (_, child) in children.into_iter().rev() {
            stack.push((child, Some(position), depth + 1));
        }
    }
    nodes
}

/// Packs every internal node bottom-up with `pad` added around each child.
fn pack_all(nodes: &mut [WorkNode], pad: f64, random: &mut Lcg) {
    // Pre-order puts every descendant after its ancestor.
    for position in (0..nodes.len()).rev() {
        if nodes[position].children.is_empty() {
            continue;
        }
        let children = nodes[position].children.clone();
        let mut circles: Vec<Circle> = children
            .iter()
            .map(|child| Circle::new(0.0, 0.0, nodes[*child].r + pad))
            .collect();
        let enclosing = siblings::pack_siblings(&mut circles, random);
        for (child, circle) in children.iter().zip(&circles) {
            nodes[*child].x = circle.x;
            nodes[*child].y = circle.y;
        }
        nodes[position].r = enclosing + pad;
    }
}

/// Turns parent-relative positions into absolute ones and applies `scale`.
fn place_absolute(nodes: &mut [WorkNode], scale: f64) {
    for position in 0..nodes.len() {
        nodes[position].r *= scale;
        match nodes[position].parent {
            Some(parent) => {
                let (px, py) = (nodes[parent].x, nodes[parent].y);
                nodes[position].x = px + nodes[position].x * scale;
                nodes[position].y = py + nodes[position].y * scale;
            }
            None => {
                nodes[position].x = 0.0;
                nodes[position].y = 0.0;
            }
        }
    }
}
