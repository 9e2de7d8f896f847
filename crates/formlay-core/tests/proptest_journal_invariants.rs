//! Property-based tests for the model change journal.
//!
//! 1. Reverting a full edit range restores the exact structural hash
//! 2. Reverting restores the change mark
//! 3. Arbitrary primitive sequences never break parent/child links

use formlay_core::{
    Alignment, ComponentId, Dimension, GroupKind, IntervalId, IntervalSizes, LayoutInvariantCode,
    LayoutModel, MAX_SIZE, Size,
};
use proptest::prelude::*;

// ── Strategies ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Op {
    AddGap { target: usize, pref: i32 },
    AddGroup { target: usize, parallel: bool },
    AddComponent { target: usize },
    Remove { target: usize },
    Resize { target: usize, pref: i32, grow: bool },
    Align { target: usize, alignment: u8 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..64, 0i32..200).prop_map(|(target, pref)| Op::AddGap { target, pref }),
        (0usize..64, any::<bool>()).prop_map(|(target, parallel)| Op::AddGroup { target, parallel }),
        (0usize..64).prop_map(|target| Op::AddComponent { target }),
        (0usize..64).prop_map(|target| Op::Remove { target }),
        (0usize..64, 0i32..200, any::<bool>())
            .prop_map(|(target, pref, grow)| Op::Resize { target, pref, grow }),
        (0usize..64, 0u8..4).prop_map(|(target, alignment)| Op::Align { target, alignment }),
    ]
}

fn fresh() -> (LayoutModel, IntervalId) {
    let mut model = LayoutModel::new();
    let roots = model
        .create_container(ComponentId::from("form"), Size::new(400, 300))
        .expect("container");
    (model, roots[0])
}

fn pick(ids: &[IntervalId], target: usize) -> Option<IntervalId> {
    (!ids.is_empty()).then(|| ids[target % ids.len()])
}

fn reachable(model: &LayoutModel, root: IntervalId) -> Vec<IntervalId> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        out.push(id);
        stack.extend(model.children(id).iter().copied());
    }
    out
}

/// Apply primitive edits; invalid ones are rejected by the model and ignored.
fn apply_ops(model: &mut LayoutModel, root: IntervalId, ops: &[Op], counter: &mut usize) {
    let h = Dimension::Horizontal;
    for op in ops {
        let ids = reachable(model, root);
        let groups: Vec<IntervalId> = ids.iter().copied().filter(|id| model.is_group(*id)).collect();
        match op {
            Op::AddGap { target, pref } => {
                if let Some(parent) = pick(&groups, *target)
                    && let Ok(gap) = model.create_gap(h, IntervalSizes::fixed(*pref))
                {
                    let _ = model.add_interval(gap, parent, None);
                }
            }
            Op::AddGroup { target, parallel } => {
                let kind = if *parallel {
                    GroupKind::Parallel
                } else {
                    GroupKind::Sequential
                };
                if let Some(parent) = pick(&groups, *target)
                    && let Ok(group) = model.create_group(h, kind)
                {
                    let _ = model.add_interval(group, parent, Some(0));
                }
            }
            Op::AddComponent { target } => {
                *counter += 1;
                let id = ComponentId::new(format!("c{counter}"));
                if let Some(parent) = pick(&groups, *target)
                    && let Ok(intervals) = model.create_component(id)
                {
                    let _ = model.add_interval(intervals[0], parent, None);
                }
            }
            Op::Remove { target } => {
                let non_root: Vec<IntervalId> =
                    ids.iter().copied().filter(|id| *id != root).collect();
                if let Some(id) = pick(&non_root, *target) {
                    let _ = model.remove_interval(id);
                }
            }
            Op::Resize { target, pref, grow } => {
                if let Some(id) = pick(&ids, *target) {
                    let sizes = if *grow {
                        IntervalSizes::resizing(*pref)
                    } else {
                        IntervalSizes::new(0, *pref, MAX_SIZE)
                    };
                    let _ = model.set_interval_sizes(id, sizes);
                }
            }
            Op::Align { target, alignment } => {
                let alignment = match alignment {
                    0 => Alignment::Default,
                    1 => Alignment::Leading,
                    2 => Alignment::Trailing,
                    _ => Alignment::Center,
                };
                if let Some(id) = pick(&ids, *target) {
                    let _ = model.set_interval_alignment(id, alignment);
                }
            }
        }
    }
}

proptest! {
    #[test]
    fn revert_restores_hash_and_mark(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let (mut model, root) = fresh();
        let hash = model.state_hash();
        let start = model.change_mark();
        let mut counter = 0;
        apply_ops(&mut model, root, &ops, &mut counter);
        let end = model.change_mark();
        model.revert(start, end).expect("revert");
        prop_assert_eq!(model.state_hash(), hash);
        prop_assert_eq!(model.change_mark(), start);
    }

    #[test]
    fn revert_of_suffix_matches_prefix_state(
        prefix in prop::collection::vec(op_strategy(), 0..20),
        suffix in prop::collection::vec(op_strategy(), 0..20),
    ) {
        let (mut model, root) = fresh();
        let mut counter = 0;
        apply_ops(&mut model, root, &prefix, &mut counter);
        let hash = model.state_hash();
        let middle = model.change_mark();
        apply_ops(&mut model, root, &suffix, &mut counter);
        let end = model.change_mark();
        model.revert(middle, end).expect("revert");
        prop_assert_eq!(model.state_hash(), hash);
    }

    #[test]
    fn links_stay_consistent(ops in prop::collection::vec(op_strategy(), 0..60)) {
        let (mut model, root) = fresh();
        let mut counter = 0;
        apply_ops(&mut model, root, &ops, &mut counter);
        let report = model.invariant_report();
        for issue in &report.issues {
            prop_assert!(
                !matches!(
                    issue.code,
                    LayoutInvariantCode::ParentMismatch
                        | LayoutInvariantCode::MissingInterval
                        | LayoutInvariantCode::DimensionMismatch
                        | LayoutInvariantCode::LeafWithChildren
                ),
                "link issue: {}",
                issue.message
            );
        }
        let snapshot = model.snapshot();
        let rebuilt = LayoutModel::from_snapshot(snapshot).expect("snapshot stays valid");
        prop_assert_eq!(rebuilt.state_hash(), model.state_hash());
    }
}
