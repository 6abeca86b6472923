use orgcircles_core::model::SequentialIdGenerator;
use orgcircles_core::{Confirmation, NameField, NodeId, OrgError, Organization};
use std::cell::Cell;
use uuid::Uuid;

fn setup() -> (Organization, NodeId, NodeId) {
    let mut org = Organization::with_id_generator(Box::new(SequentialIdGenerator::new()));
    let root = org.root_id();
    let circle = org.insert_circle(root, "Guild", "", "").unwrap();
    let role = org.insert_role(circle, "Steward", "", "").unwrap();
    (org, circle, role)
}

#[test]
fn add_and_edit_member_trim_fields() {
    let (mut org, _, _) = setup();

    let ada = org.add_member("  Ada ", " mathematician ").unwrap();
    org.edit_member(ada, "Ada L.", "first programmer").unwrap();

    let member = org.member(ada).unwrap();
    assert_eq!(member.name, "Ada L.");
    assert_eq!(member.description, "first programmer");
    assert_eq!(
        org.add_member(" ", "").unwrap_err(),
        OrgError::EmptyName(NameField::Member)
    );
    let missing = Uuid::from_u128(999);
    assert_eq!(
        org.edit_member(missing, "X", "").unwrap_err(),
        OrgError::MemberNotFound(missing)
    );
}

#[test]
fn assign_links_both_sides_once() {
    let (mut org, _, role) = setup();
    let ada = org.add_member("Ada", "").unwrap();

    assert!(org.assign(ada, role));
    assert!(!org.assign(ada, role));

    assert!(org.is_assigned(ada, role));
    assert!(org.member(ada).unwrap().holds(role));
    assert!(org.find_node(role).unwrap().member_ids.contains(&ada));
    org.check_invariants().unwrap();
}

#[test]
fn assign_ignores_unknown_ids_and_circles() {
    let (mut org, circle, role) = setup();
    let ada = org.add_member("Ada", "").unwrap();
    let before = org.to_snapshot();

    assert!(!org.assign(Uuid::from_u128(999), role));
    assert!(!org.assign(ada, Uuid::from_u128(998)));
    assert!(!org.assign(ada, circle));

    assert_eq!(org.to_snapshot(), before);
}

#[test]
fn unassign_honors_declined_confirmation() {
    let (mut org, _, role) = setup();
    let ada = org.add_member("Ada", "").unwrap();
    org.assign(ada, role);
    let asked = Cell::new(0);
    let decline = || {
        asked.set(asked.get() + 1);
        false
    };

    assert!(!org.unassign(ada, role, Confirmation::Required(&decline)));

    assert_eq!(asked.get(), 1);
    assert!(org.is_assigned(ada, role));
}

#[test]
fn unassign_removes_link_when_confirmed() {
    let (mut org, _, role) = setup();
    let ada = org.add_member("Ada", "").unwrap();
    org.assign(ada, role);
    let accept = || true;

    assert!(org.unassign(ada, role, Confirmation::Required(&accept)));
    assert!(!org.unassign(ada, role, Confirmation::NotRequired));

    assert!(!org.is_assigned(ada, role));
    org.check_invariants().unwrap();
}

#[test]
fn unassign_skips_confirmation_when_not_linked() {
    let (mut org, _, role) = setup();
    let ada = org.add_member("Ada", "").unwrap();
    let never = || -> bool { panic!("confirmation must not be requested") };

    assert!(!org.unassign(ada, role, Confirmation::Required(&never)));
}

#[test]
fn toggle_flips_assignment() {
    let (mut org, _, role) = setup();
    let ada = org.add_member("Ada", "").unwrap();

    assert!(org.toggle(ada, role));
    assert!(org.is_assigned(ada, role));
    assert!(org.toggle(ada, role));
    assert!(!org.is_assigned(ada, role));
}

#[test]
fn delete_member_releases_every_assignment() {
    let (mut org, circle, role) = setup();
    let other = org.insert_role(circle, "Treasurer", "", "").unwrap();
    let ada = org.add_member("Ada", "").unwrap();
    org.assign(ada, role);
    org.assign(ada, other);

    let released = org.delete_member(ada).unwrap();

    assert_eq!(released, 2);
    assert!(org.member(ada).is_none());
    assert!(org.find_node(role).unwrap().member_ids.is_empty());
    assert!(org.find_node(other).unwrap().member_ids.is_empty());
    assert_eq!(
        org.delete_member(ada).unwrap_err(),
        OrgError::MemberNotFound(ada)
    );
    org.check_invariants().unwrap();
}

#[test]
fn circle_roster_lists_templates_first_then_roles_by_name() {
    let (mut org, circle, steward) = setup();
    let archivist = org.insert_role(circle, "archivist", "", "").unwrap();
    let template = org.create_template("Facilitator", "").unwrap();
    let ada = org.add_member("Ada", "").unwrap();
    let bob = org.add_member("Bob", "").unwrap();
    let cyd = org.add_member("Cyd", "").unwrap();
    org.assign(bob, steward);
    org.assign(ada, steward);

    let roster = org.circle_roster(circle).unwrap();

    let names: Vec<&str> = roster.roles.iter().map(|role| role.name.as_str()).collect();
    assert_eq!(names, vec!["Facilitator", "archivist", "Steward"]);
    assert!(roster.roles[0].is_template);
    assert_eq!(org.instances_of(template.id).len(), 2);
    assert_eq!(roster.roles[2].member_ids, vec![ada, bob]);
    assert_eq!(roster.roles[1].role_id, archivist);
    assert_eq!(roster.unassigned, vec![cyd]);
}

#[test]
fn root_roster_lists_template_instances_only() {
    let (mut org, _, _) = setup();
    let root = org.root_id();
    org.insert_role(root, "Advisor", "", "").unwrap();
    org.create_template("Facilitator", "").unwrap();

    let roster = org.circle_roster(root).unwrap();

    assert!(roster.roles.iter().all(|role| role.is_template));
    assert_eq!(roster.roles.len(), 2);
    assert!(org.circle_roster(Uuid::from_u128(999)).is_none());
}
