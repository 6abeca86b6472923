use orgcircles_core::model::SequentialIdGenerator;
use orgcircles_core::org::RoleEditOutcome;
use orgcircles_core::{
    Confirmation, ErrorKind, InMemorySnapshotStore, NodeKind, SnapshotStore, StoreError,
    WorkspaceConfig, WorkspaceService,
};
use std::time::Duration;

fn open(store: InMemorySnapshotStore) -> WorkspaceService<InMemorySnapshotStore> {
    WorkspaceService::open_with_ids(
        store,
        WorkspaceConfig::default(),
        Box::new(SequentialIdGenerator::starting_at(100)),
    )
}

#[test]
fn empty_store_opens_default_model_without_saving() {
    let workspace = open(InMemorySnapshotStore::new());

    assert_eq!(workspace.organization().tree().len(), 1);
    assert_eq!(workspace.layout().len(), 1);
    assert_eq!(workspace.focus().focus(), workspace.organization().root_id());
    assert!(workspace.store().document().is_none());
}

#[test]
fn malformed_document_falls_back_to_default_model() {
    let workspace = open(InMemorySnapshotStore::with_document("{\"tree\": 42"));

    let root = workspace
        .organization()
        .find_node(workspace.organization().root_id())
        .unwrap();
    assert_eq!(root.name, "Company");
    assert_eq!(workspace.organization().tree().len(), 1);
}

#[test]
fn staffing_scenario_links_member_and_role() {
    let mut workspace = open(InMemorySnapshotStore::new());
    let root = workspace.organization().root_id();

    let engineering = workspace
        .add_circle(root, "Engineering", "", "")
        .unwrap()
        .into_value();
    let lead = workspace
        .add_role(engineering, "Lead", "", "")
        .unwrap()
        .into_value();
    let alice = workspace.add_member("Alice", "").unwrap().into_value();
    let assigned = workspace.assign_member(alice, lead);

    assert!(assigned.value);
    assert!(assigned.is_persisted());
    let org = workspace.organization();
    assert!(org.find_node(lead).unwrap().member_ids.contains(&alice));
    assert!(org.member(alice).unwrap().holds(lead));
    assert!(workspace.layout().get(lead).is_some());
    org.check_invariants().unwrap();
}

#[test]
fn template_scenario_propagates_to_existing_and_new_circles() {
    let mut workspace = open(InMemorySnapshotStore::new());
    let root = workspace.organization().root_id();
    let alpha = workspace.add_circle(root, "Alpha", "", "").unwrap().value;
    workspace.add_role(alpha, "Scout", "", "").unwrap();

    let template = workspace.add_template("Facilitator", "").unwrap().value;

    let holders = |workspace: &WorkspaceService<InMemorySnapshotStore>| {
        let org = workspace.organization();
        org.instances_of(template.id)
            .into_iter()
            .filter_map(|id| org.tree().parent(id))
            .collect::<Vec<_>>()
    };
    let before = holders(&workspace);
    assert_eq!(before.len(), 2);
    assert!(before.contains(&root) && before.contains(&alpha));

    let beta = workspace.add_circle(root, "Beta", "", "").unwrap().value;
    let after = holders(&workspace);
    assert_eq!(after.len(), 3);
    assert!(after.contains(&beta));
    for instance in workspace.organization().instances_of(template.id) {
        let node = workspace.organization().find_node(instance).unwrap();
        assert_eq!(node.kind, NodeKind::TemplateInstance);
        assert_eq!(node.name, "Facilitator");
    }
}

#[test]
fn merge_scenario_combines_assignments() {
    let mut workspace = open(InMemorySnapshotStore::new());
    let root = workspace.organization().root_id();
    let a = workspace.add_circle(root, "A", "", "").unwrap().value;
    let b = workspace.add_circle(root, "B", "", "").unwrap().value;
    let a_lead = workspace.add_role(a, "Lead", "", "").unwrap().value;
    let b_lead = workspace.add_role(b, "Lead", "", "").unwrap().value;
    let alice = workspace.add_member("Alice", "").unwrap().value;
    let bob = workspace.add_member("Bob", "").unwrap().value;
    workspace.assign_member(alice, a_lead);
    workspace.assign_member(bob, b_lead);

    let outcome = workspace
        .edit_role(a_lead, "Lead", "", "", Some(b))
        .unwrap()
        .value;

    assert_eq!(outcome, RoleEditOutcome::Merged { into: b_lead });
    let org = workspace.organization();
    let merged = org.find_node(b_lead).unwrap();
    assert!(merged.member_ids.contains(&alice));
    assert!(merged.member_ids.contains(&bob));
    assert!(org
        .tree()
        .children(a)
        .iter()
        .all(|child| org.find_node(*child).unwrap().name != "Lead"));
    assert!(workspace.layout().get(a_lead).is_none());
    org.check_invariants().unwrap();
}

#[test]
fn every_successful_command_writes_through() {
    let mut workspace = open(InMemorySnapshotStore::new());
    let root = workspace.organization().root_id();

    let circle = workspace.add_circle(root, "Alpha", "", "").unwrap();
    assert!(circle.is_persisted());

    let saved = workspace.store().load().unwrap().unwrap();
    assert_eq!(saved, workspace.organization().to_snapshot());

    let reopened = open(InMemorySnapshotStore::with_document(
        workspace.store().document().unwrap(),
    ));
    assert_eq!(
        reopened.organization().to_snapshot(),
        workspace.organization().to_snapshot()
    );
}

#[test]
fn rejected_command_writes_nothing() {
    let mut workspace = open(InMemorySnapshotStore::new());
    let root = workspace.organization().root_id();
    workspace.add_circle(root, "Alpha", "", "").unwrap();
    let before = workspace.store().document();

    let err = workspace.add_circle(root, "   ", "", "").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let err = workspace.delete_circle(root).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Invariant);

    assert_eq!(workspace.store().document(), before);
}

#[test]
fn no_op_membership_commands_skip_saving() {
    let mut workspace = open(InMemorySnapshotStore::new());
    let root = workspace.organization().root_id();
    let role = workspace.add_role(root, "Scout", "", "").unwrap().value;
    let ada = workspace.add_member("Ada", "").unwrap().value;
    workspace.assign_member(ada, role);
    let before = workspace.store().document();

    let repeated = workspace.assign_member(ada, role);
    let on_circle = workspace.assign_member(ada, root);
    let declined = workspace.unassign_member(ada, role, Confirmation::Required(&|| false));

    assert!(!repeated.value && !on_circle.value && !declined.value);
    assert_eq!(workspace.store().document(), before);

    assert!(workspace.toggle_member(ada, role).value);
    assert!(!workspace.organization().is_assigned(ada, role));
    assert_ne!(workspace.store().document(), before);
}

#[test]
fn failed_save_keeps_change_in_memory() {
    let mut workspace = open(InMemorySnapshotStore::failing("read-only volume"));
    let root = workspace.organization().root_id();

    let committed = workspace.add_circle(root, "Alpha", "", "").unwrap();

    assert!(matches!(
        committed.persist_error,
        Some(StoreError::Unavailable(_))
    ));
    let circle = committed.value;
    assert!(workspace.organization().find_node(circle).is_some());
    assert!(workspace.layout().get(circle).is_some());
}

#[test]
fn deleting_focused_circle_moves_focus_to_parent() {
    let mut workspace = open(InMemorySnapshotStore::new());
    let root = workspace.organization().root_id();
    let outer = workspace.add_circle(root, "Outer", "", "").unwrap().value;
    let inner = workspace.add_circle(outer, "Inner", "", "").unwrap().value;
    workspace.select_node(inner).unwrap();
    workspace.tick(Duration::from_secs(1));

    workspace.delete_circle(inner).unwrap();
    assert_eq!(workspace.focus().focus(), outer);

    workspace.delete_circle(outer).unwrap();
    assert_eq!(workspace.focus().focus(), root);
}

#[test]
fn screen_click_selects_node_under_pointer() {
    let mut workspace = open(InMemorySnapshotStore::new());
    let root = workspace.organization().root_id();
    let advisor = workspace.add_role(root, "Advisor", "", "").unwrap().value;
    workspace.add_circle(root, "Guild", "", "").unwrap();
    let frame = workspace.frame();
    let target = frame.nodes.iter().find(|node| node.id == advisor).unwrap();
    assert!(target.label.visible);

    assert!(workspace.click(target.screen_x, target.screen_y));
    assert_eq!(workspace.focus().focus(), advisor);

    while workspace.tick(Duration::from_millis(16)) {}
    let settled = workspace.frame();
    assert!(!settled.animating);
    let focused = settled.nodes.iter().find(|node| node.id == advisor).unwrap();
    assert!(focused.screen_x.abs() < 1e-6 && focused.screen_y.abs() < 1e-6);
}

#[test]
fn resize_rebuilds_layout_for_new_viewport() {
    let mut workspace = open(InMemorySnapshotStore::new());

    workspace.resize(400.0, 1000.0);

    assert!((workspace.layout().root().radius - 200.0).abs() < 1e-6);
    assert_eq!(workspace.config().layout.width, 400.0);
}

#[test]
fn template_commands_update_and_remove_instances() {
    let mut workspace = open(InMemorySnapshotStore::new());
    let root = workspace.organization().root_id();
    workspace.add_role(root, "Advisor", "", "").unwrap();
    let template = workspace.add_template("Facilitator", "").unwrap().value;

    let updated = workspace
        .edit_template(template.id, "Host", "welcomes")
        .unwrap()
        .value;
    assert_eq!(updated, 1);

    let duplicate = workspace.add_template("host", "").unwrap_err();
    assert_eq!(duplicate.kind(), ErrorKind::Duplicate);

    let removed = workspace.delete_template(template.id).unwrap().value;
    assert_eq!(removed, 1);
    assert!(workspace.organization().templates().is_empty());
}
