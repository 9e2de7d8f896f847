//! Property/fuzz-style invariants for designer edit streams.
//!
//! Random streams of adds, moves (free and snapped), resizes, removals,
//! alignments and resizing switches are run against a headless designer.
//! After every edit the invariant report must come back clean, warnings
//! included, and replaying a seed must reproduce the same structure.

use formlay_core::{
    Alignment, ComponentId, Dimension, Edge, LayoutModel, PaddingType, Point, Rect, Size,
};
use formlay_designer::{FixedSnap, LayoutDesigner, NoSnap, PositionDef, StaticMapper};
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct Lcg {
    state: u64,
}

impl Lcg {
    fn new(seed: u64) -> Self {
        Self {
            state: seed ^ 0x9E37_79B9_7F4A_7C15,
        }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        self.state
    }

    fn next_i32_range(&mut self, min: i32, max: i32) -> i32 {
        debug_assert!(min <= max);
        if min == max {
            return min;
        }
        let span = u64::from((max - min) as u32 + 1);
        min + (self.next_u64() % span) as i32
    }

    fn choose_index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0);
        (self.next_u64() % len as u64) as usize
    }

    fn choose_bool(&mut self) -> bool {
        (self.next_u64() & 1) == 0
    }
}

#[derive(Debug, Clone, Copy)]
enum Edit {
    Add,
    Move,
    Resize,
    Remove,
    Align,
    Resizing,
    Anchor,
    Snap,
}

const EDITS: [Edit; 8] = [
    Edit::Add,
    Edit::Move,
    Edit::Resize,
    Edit::Remove,
    Edit::Align,
    Edit::Resizing,
    Edit::Anchor,
    Edit::Snap,
];

struct Session {
    designer: LayoutDesigner<StaticMapper>,
    placed: Vec<ComponentId>,
    next_name: usize,
}

impl Session {
    fn new() -> Self {
        let form = ComponentId::from("form");
        let mut model = LayoutModel::new();
        model
            .create_container(form, Size::new(400, 300))
            .expect("form");
        let mut mapper = StaticMapper::new();
        mapper.set_interior("form", Rect::from_size(400, 300));
        let mut designer = LayoutDesigner::new(model, mapper);
        designer.update_current_state();
        Self {
            designer,
            placed: Vec::new(),
            next_name: 0,
        }
    }

    fn random_rect(rng: &mut Lcg) -> Rect {
        let x = rng.next_i32_range(0, 300);
        let y = rng.next_i32_range(0, 250);
        let w = rng.next_i32_range(10, 90);
        let h = rng.next_i32_range(10, 30);
        Rect::new(x, y, w.min(400 - x), h.min(300 - y))
    }

    fn pick(&self, rng: &mut Lcg) -> Option<ComponentId> {
        (!self.placed.is_empty()).then(|| self.placed[rng.choose_index(self.placed.len())].clone())
    }

    fn dim(rng: &mut Lcg) -> Dimension {
        if rng.choose_bool() {
            Dimension::Horizontal
        } else {
            Dimension::Vertical
        }
    }

    /// Apply one random edit. Rejected edits are fine; broken trees are not.
    fn apply(&mut self, rng: &mut Lcg, edit: Edit) {
        let form = ComponentId::from("form");
        match edit {
            Edit::Add => {
                let id = ComponentId::new(format!("c{}", self.next_name));
                self.next_name += 1;
                let rect = Self::random_rect(rng);
                if self.designer.add_component(id.clone(), &form, rect).is_ok() {
                    self.placed.push(id);
                }
            }
            Edit::Move => {
                let Some(id) = self.pick(rng) else { return };
                let Ok(()) = self
                    .designer
                    .start_moving(std::slice::from_ref(&id), Point::new(0, 0))
                else {
                    return;
                };
                let dx = rng.next_i32_range(-60, 60);
                let dy = rng.next_i32_range(-40, 40);
                let commit = rng.next_u64() % 4 != 0;
                self.finish_move(&id, Point::new(dx, dy), false, commit);
            }
            Edit::Resize => {
                let Some(id) = self.pick(rng) else { return };
                let edge = if rng.choose_bool() {
                    Edge::Leading
                } else {
                    Edge::Trailing
                };
                let dim = Self::dim(rng);
                let mut edges = [None, None];
                edges[dim.index()] = Some(edge);
                if self
                    .designer
                    .start_resizing(&id, edges, Point::new(0, 0))
                    .is_err()
                {
                    return;
                }
                let delta = rng.next_i32_range(-20, 40);
                let point = match dim {
                    Dimension::Horizontal => Point::new(delta, 0),
                    Dimension::Vertical => Point::new(0, delta),
                };
                self.finish_move(&id, point, false, true);
            }
            Edit::Remove => {
                let Some(id) = self.pick(rng) else { return };
                self.designer
                    .remove_components(std::slice::from_ref(&id))
                    .expect("remove");
                self.placed.retain(|placed| *placed != id);
            }
            Edit::Align => {
                if self.placed.len() < 2 {
                    return;
                }
                let first = rng.choose_index(self.placed.len());
                let mut second = rng.choose_index(self.placed.len());
                if second == first {
                    second = (first + 1) % self.placed.len();
                }
                let ids = [self.placed[first].clone(), self.placed[second].clone()];
                let alignment = if rng.choose_bool() {
                    Alignment::Leading
                } else {
                    Alignment::Trailing
                };
                let closed = rng.choose_bool();
                let dim = Self::dim(rng);
                let _ = self.designer.align(&ids, closed, dim, alignment);
            }
            Edit::Resizing => {
                let Some(id) = self.pick(rng) else { return };
                let dim = Self::dim(rng);
                let on = rng.choose_bool();
                let _ = self.designer.set_component_resizing(&id, dim, on);
            }
            Edit::Anchor => {
                let Some(id) = self.pick(rng) else { return };
                let dim = Self::dim(rng);
                let alignment = if rng.choose_bool() {
                    Alignment::Leading
                } else {
                    Alignment::Trailing
                };
                let _ = self.designer.adjust_component_alignment(&id, dim, alignment);
            }
            Edit::Snap => self.snap_move(rng),
        }
    }

    /// Move one component against a snap on one axis: aligned with another
    /// component's edge, or next to it with related padding.
    fn snap_move(&mut self, rng: &mut Lcg) {
        if self.placed.len() < 2 {
            return;
        }
        let first = rng.choose_index(self.placed.len());
        let second = (first + 1 + rng.choose_index(self.placed.len() - 1)) % self.placed.len();
        let (id, target) = (self.placed[first].clone(), self.placed[second].clone());
        let dim = Self::dim(rng);
        let model = self.designer.model();
        let (Some(moving), Some(target_iv)) = (
            model.component_interval(&id, dim).and_then(|iv| model.current_space(iv).to_rect()),
            model.component_interval(&target, dim),
        ) else {
            return;
        };
        let Some(target_rect) = model.current_space(target_iv).to_rect() else {
            return;
        };
        let next_to = rng.choose_bool();
        let edge = if rng.choose_bool() {
            Edge::Leading
        } else {
            Edge::Trailing
        };
        let (position, land) = if next_to {
            let padding = 6;
            let land = match edge {
                Edge::Trailing => target_rect.end(dim) + padding,
                Edge::Leading => target_rect.start(dim) - padding - moving.extent(dim),
            };
            (
                PositionDef::next_to(target_iv, edge, Some(PaddingType::Related)),
                land,
            )
        } else {
            let land = match edge {
                Edge::Leading => target_rect.start(dim),
                Edge::Trailing => target_rect.end(dim) - moving.extent(dim),
            };
            (PositionDef::aligned(target_iv, edge.alignment()), land)
        };
        let shift = land - moving.start(dim);
        let other = rng.next_i32_range(-40, 40);
        let point = match dim {
            Dimension::Horizontal => Point::new(shift, other),
            Dimension::Vertical => Point::new(other, shift),
        };
        let mut positions = [None, None];
        positions[dim.index()] = Some(position);
        self.designer.set_snap_provider(FixedSnap(positions));
        if self
            .designer
            .start_moving(std::slice::from_ref(&id), Point::new(0, 0))
            .is_ok()
        {
            self.finish_move(&id, point, true, true);
        }
        self.designer.set_snap_provider(NoSnap);
    }

    /// Drive a started drag to `point`. On commit the host shows the
    /// component where the drag put it.
    fn finish_move(&mut self, id: &ComponentId, point: Point, snapping: bool, commit: bool) {
        let bounds = self.designer.move_to(point, None, snapping, None);
        if commit
            && let Ok(bounds) = bounds
            && let Some(rect) = bounds.first()
        {
            self.designer.mapper_mut().set_bounds(id.clone(), *rect);
        }
        self.designer.end_moving(commit).expect("end move");
    }

    fn assert_valid(&self, seed: u64, step: usize, edit: Edit) {
        let report = self.designer.model().invariant_report();
        assert!(
            report.issues.is_empty(),
            "seed {seed} step {step} ({edit:?}): {:?}",
            report.issues
        );
    }
}

fn run_stream(seed: u64, steps: usize) -> u64 {
    let mut rng = Lcg::new(seed);
    let mut session = Session::new();
    for step in 0..steps {
        let edit = EDITS[rng.choose_index(EDITS.len())];
        session.apply(&mut rng, edit);
        session.assert_valid(seed, step, edit);
    }
    session.designer.model().state_hash()
}

#[test]
fn random_edit_streams_keep_trees_valid() {
    for seed in 0..24_u64 {
        run_stream(seed, 40);
    }
}

#[test]
fn replaying_a_seed_is_deterministic() {
    for seed in [3_u64, 17, 4242] {
        assert_eq!(run_stream(seed, 30), run_stream(seed, 30));
    }
}

#[test]
fn removing_everything_leaves_one_filling_gap_per_axis() {
    let mut rng = Lcg::new(99);
    let mut session = Session::new();
    for _ in 0..8 {
        session.apply(&mut rng, Edit::Add);
    }
    let all = session.placed.clone();
    session
        .designer
        .remove_components(&all)
        .expect("remove all");
    let roots = session
        .designer
        .model()
        .default_roots(&ComponentId::from("form"))
        .expect("roots");
    for root in roots {
        let model = session.designer.model();
        assert_eq!(model.child_count(root), 1);
        assert!(model.is_gap(model.children(root)[0]));
    }
}

// ── Strategies ──────────────────────────────────────────────────────────

fn edit_strategy() -> impl Strategy<Value = Edit> {
    prop_oneof![
        3 => Just(Edit::Add),
        2 => Just(Edit::Move),
        2 => Just(Edit::Resize),
        1 => Just(Edit::Remove),
        1 => Just(Edit::Align),
        1 => Just(Edit::Resizing),
        1 => Just(Edit::Anchor),
        2 => Just(Edit::Snap),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn any_edit_sequence_keeps_trees_valid(
        seed in any::<u64>(),
        edits in prop::collection::vec(edit_strategy(), 1..24),
    ) {
        let mut rng = Lcg::new(seed);
        let mut session = Session::new();
        for (step, edit) in edits.into_iter().enumerate() {
            session.apply(&mut rng, edit);
            let report = session.designer.model().invariant_report();
            prop_assert!(
                report.issues.is_empty(),
                "step {} ({:?}): {:?}",
                step,
                edit,
                report.issues
            );
        }
    }
}
