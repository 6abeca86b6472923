use orgcircles_core::model::SequentialIdGenerator;
use orgcircles_core::{Confirmation, NodeId, Organization};

const NAMES: [&str; 6] = ["Lead", "lead", "Scout", "Facilitator", "Secretary", "Guild"];

/// Small deterministic generator so every run replays the same sequence.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.0 >> 33
    }

    fn below(&mut self, bound: usize) -> usize {
        (self.next() % bound.max(1) as u64) as usize
    }

    fn pick<T: Copy>(&mut self, items: &[T]) -> Option<T> {
        if items.is_empty() {
            return None;
        }
        Some(items[self.below(items.len())])
    }

    fn name(&mut self) -> &'static str {
        NAMES[self.below(NAMES.len())]
    }
}

fn circles(org: &Organization) -> Vec<NodeId> {
    org.tree().circles()
}

fn roles(org: &Organization) -> Vec<NodeId> {
    org.tree().role_leaves(org.root_id())
}

/// Applies one randomly chosen operation; returns whether it was accepted.
fn apply_step(org: &mut Organization, rng: &mut Lcg) -> bool {
    let circle = rng.pick(&circles(org)).unwrap_or(org.root_id());
    let role = rng.pick(&roles(org));
    let member_ids: Vec<_> = org.members().iter().map(|member| member.id).collect();
    let member = rng.pick(&member_ids);
    let template_ids: Vec<_> = org.templates().iter().map(|template| template.id).collect();
    let template = rng.pick(&template_ids);
    let destination = rng.pick(&circles(org));

    match rng.below(14) {
        0 => org.insert_circle(circle, rng.name(), "", "").is_ok(),
        1 => org.insert_role(circle, rng.name(), "", "").is_ok(),
        2 => org
            .edit_circle(circle, rng.name(), "", "", destination)
            .is_ok(),
        3 => match role {
            Some(role) => org
                .edit_role(role, rng.name(), "", "", destination)
                .is_ok(),
            None => false,
        },
        4 => role.is_some_and(|role| org.delete_role(role).is_ok()),
        5 => org.delete_circle(circle).is_ok(),
        6 => org.create_template(rng.name(), "").is_ok(),
        7 => template.is_some_and(|template| org.delete_template(template).is_ok()),
        8 => template.is_some_and(|template| {
            let name = rng.name();
            org.edit_template(template, name, "").is_ok()
        }),
        9 => org.add_member(rng.name(), "").is_ok(),
        10 => match (member, role) {
            (Some(member), Some(role)) => org.assign(member, role),
            _ => false,
        },
        11 => match (member, role) {
            (Some(member), Some(role)) => org.unassign(member, role, Confirmation::NotRequired),
            _ => false,
        },
        12 => member.is_some_and(|member| org.delete_member(member).is_ok()),
        _ => template.is_some_and(|template| org.insert_role_from_template(circle, template).is_ok()),
    }
}

fn assert_one_instance_per_template(org: &Organization, step: usize) {
    for circle_id in circles(org) {
        if !org.tree().has_children(circle_id) {
            continue;
        }
        for template in org.templates() {
            let held = org
                .tree()
                .children(circle_id)
                .iter()
                .filter(|child| org.find_node(**child).unwrap().instantiates(template.id))
                .count();
            assert_eq!(
                held, 1,
                "step {step}: circle {circle_id} holds {held} instances of {}",
                template.name
            );
        }
    }
}

fn run_sequence(seed: u64, steps: usize) -> (Organization, usize) {
    let mut org = Organization::with_id_generator(Box::new(SequentialIdGenerator::new()));
    let mut rng = Lcg(seed);
    let mut accepted = 0;

    for step in 0..steps {
        let before = org.to_snapshot();
        if apply_step(&mut org, &mut rng) {
            accepted += 1;
        } else {
            assert_eq!(org.to_snapshot(), before, "step {step}: rejected call mutated");
        }
        if let Err(violation) = org.check_invariants() {
            panic!("step {step}: {violation}");
        }
        assert_one_instance_per_template(&org, step);
    }
    (org, accepted)
}

#[test]
fn invariants_hold_after_every_step_of_mixed_sequences() {
    for seed in [1, 7, 42, 2024, 31_337] {
        let (org, accepted) = run_sequence(seed, 400);

        assert!(accepted > 60, "seed {seed}: only {accepted} steps accepted");
        let restored = Organization::from_snapshot(&org.to_snapshot()).unwrap();
        assert_eq!(restored.to_snapshot(), org.to_snapshot());
    }
}

#[test]
fn sequences_are_deterministic() {
    let (first, _) = run_sequence(99, 200);
    let (second, _) = run_sequence(99, 200);

    assert_eq!(first.to_snapshot(), second.to_snapshot());
}
