//! Model diagnostics: textual dumps, invariant reports, structural hashing
//! and serializable snapshots.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::component::{ComponentId, LayoutComponent};
use crate::error::ModelError;
use crate::interval::{IntervalId, IntervalKind, IntervalNode, IntervalSizes};
use crate::model::LayoutModel;
use crate::region::LayoutRegion;
use crate::types::{Alignment, Dimension, MAX_SIZE};

/// Severity for one invariant finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutInvariantSeverity {
    Error,
    Warning,
}

/// Stable code for invariant findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutInvariantCode {
    MissingInterval,
    ParentMismatch,
    DimensionMismatch,
    LeafWithChildren,
    AdjacentGaps,
    RedundantGroup,
    ParallelWithoutContent,
    EmptyRootWithoutFiller,
    RootWithStrayGap,
    ComponentIntervalMismatch,
    SpaceOutsideParent,
}

/// One actionable invariant finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutInvariantIssue {
    pub code: LayoutInvariantCode,
    pub severity: LayoutInvariantSeverity,
    pub interval: Option<IntervalId>,
    pub related: Option<IntervalId>,
    pub message: String,
}

/// Structured invariant report over every layout tree of the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutInvariantReport {
    pub state_hash: u64,
    pub issues: Vec<LayoutInvariantIssue>,
}

impl LayoutInvariantReport {
    /// Return true if any error-level finding exists.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.issues
            .iter()
            .any(|issue| issue.severity == LayoutInvariantSeverity::Error)
    }

    /// Error-level findings only.
    pub fn errors(&self) -> impl Iterator<Item = &LayoutInvariantIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity == LayoutInvariantSeverity::Error)
    }
}

/// Serializable copy of the structural model state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub next_interval: IntervalId,
    pub intervals: Vec<IntervalNode>,
    pub components: Vec<LayoutComponent>,
}

impl LayoutModel {
    /// Indented textual dump of one subtree, ids included.
    #[must_use]
    pub fn dump(&self, root: IntervalId) -> String {
        let mut out = String::new();
        self.dump_into(&mut out, root, 0, true);
        out
    }

    /// Like [`Self::dump`] but without ids and attribute flags, for
    /// structural comparisons across edits that recreate intervals.
    #[must_use]
    pub fn dump_structure(&self, root: IntervalId) -> String {
        let mut out = String::new();
        self.dump_into(&mut out, root, 0, false);
        out
    }

    fn dump_into(&self, out: &mut String, id: IntervalId, depth: usize, with_ids: bool) {
        let Some(node) = self.intervals.get(&id) else {
            let _ = writeln!(out, "{:indent$}<missing {id}>", "", indent = depth * 2);
            return;
        };
        let _ = write!(out, "{:indent$}", "", indent = depth * 2);
        match &node.kind {
            IntervalKind::Component { component } => {
                let _ = write!(out, "component '{component}'");
            }
            IntervalKind::Gap { padding } => {
                let _ = write!(out, "gap");
                if let Some(padding) = padding {
                    let _ = write!(out, " padding={}", padding.as_str());
                }
            }
            IntervalKind::Sequential => {
                let _ = write!(out, "sequential");
            }
            IntervalKind::Parallel { group_alignment } => {
                let _ = write!(out, "parallel group={}", group_alignment.as_str());
            }
        }
        if with_ids {
            let _ = write!(out, " {id}");
        }
        if node.alignment != Alignment::Default {
            let _ = write!(out, " align={}", node.alignment.as_str());
        }
        if node.sizes != IntervalSizes::DEFAULT {
            let _ = write!(out, " size={}", format_sizes(node.sizes));
        }
        if with_ids && !node.attributes.is_empty() {
            let _ = write!(out, " attrs={:?}", node.attributes);
        }
        out.push('\n');
        for child in &node.children {
            self.dump_into(out, *child, depth + 1, with_ids);
        }
    }

    /// Deterministic FNV-1a hash of the structural state.
    ///
    /// Cached current spaces and the journal are excluded.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
        const PRIME: u64 = 0x0000_0001_0000_01b3;

        fn mix(hash: &mut u64, byte: u8) {
            *hash ^= u64::from(byte);
            *hash = hash.wrapping_mul(PRIME);
        }

        fn mix_bytes(hash: &mut u64, bytes: &[u8]) {
            for byte in bytes {
                mix(hash, *byte);
            }
        }

        fn mix_i32(hash: &mut u64, value: i32) {
            mix_bytes(hash, &value.to_le_bytes());
        }

        fn mix_u64(hash: &mut u64, value: u64) {
            mix_bytes(hash, &value.to_le_bytes());
        }

        fn mix_bool(hash: &mut u64, value: bool) {
            mix(hash, u8::from(value));
        }

        fn mix_str(hash: &mut u64, value: &str) {
            mix_u64(hash, value.len() as u64);
            mix_bytes(hash, value.as_bytes());
        }

        fn mix_opt_interval(hash: &mut u64, value: Option<IntervalId>) {
            match value {
                Some(value) => {
                    mix(hash, 1);
                    mix_u64(hash, value.get());
                }
                None => mix(hash, 0),
            }
        }

        let mut hash = OFFSET_BASIS;
        mix_u64(&mut hash, self.next_interval.get());
        mix_u64(&mut hash, self.intervals.len() as u64);
        for node in self.intervals.values() {
            mix_u64(&mut hash, node.id.get());
            mix(&mut hash, node.dimension.index() as u8);
            mix_str(&mut hash, node.kind.tag());
            match &node.kind {
                IntervalKind::Component { component } => mix_str(&mut hash, component.as_str()),
                IntervalKind::Gap { padding } => {
                    mix_str(&mut hash, padding.map_or("", |padding| padding.as_str()));
                }
                IntervalKind::Sequential => {}
                IntervalKind::Parallel { group_alignment } => {
                    mix_str(&mut hash, group_alignment.as_str());
                }
            }
            mix_opt_interval(&mut hash, node.parent);
            mix_u64(&mut hash, node.children.len() as u64);
            for child in &node.children {
                mix_u64(&mut hash, child.get());
            }
            mix_str(&mut hash, node.alignment.as_str());
            mix_i32(&mut hash, node.sizes.min);
            mix_i32(&mut hash, node.sizes.pref);
            mix_i32(&mut hash, node.sizes.max);
            mix(&mut hash, node.attributes.bits());
        }
        mix_u64(&mut hash, self.components.len() as u64);
        for component in self.components.values() {
            mix_str(&mut hash, component.id.as_str());
            mix_str(
                &mut hash,
                component.parent.as_ref().map_or("", ComponentId::as_str),
            );
            for interval in component.intervals {
                mix_u64(&mut hash, interval.get());
            }
            mix_bool(&mut hash, component.container);
            mix_u64(&mut hash, component.sub_components.len() as u64);
            for sub in &component.sub_components {
                mix_str(&mut hash, sub.as_str());
            }
            mix_u64(&mut hash, component.layers.len() as u64);
            for roots in &component.layers {
                for root in roots {
                    mix_u64(&mut hash, root.get());
                }
            }
        }
        hash
    }

    /// Check the structural invariants of every layer of every container.
    #[must_use]
    pub fn invariant_report(&self) -> LayoutInvariantReport {
        let mut issues = Vec::new();
        for component in self.components.values() {
            for dim in Dimension::ALL {
                let interval = component.interval(dim);
                match self.intervals.get(&interval) {
                    Some(node)
                        if node.dimension == dim
                            && matches!(&node.kind, IntervalKind::Component { component: owner } if owner == &component.id) => {}
                    _ => push_issue(
                        &mut issues,
                        LayoutInvariantCode::ComponentIntervalMismatch,
                        LayoutInvariantSeverity::Error,
                        Some(interval),
                        None,
                        format!(
                            "component '{}' does not own a matching {} interval",
                            component.id,
                            dim.as_str()
                        ),
                    ),
                }
            }
            for roots in &component.layers {
                for dim in Dimension::ALL {
                    self.check_root(roots[dim.index()], dim, &mut issues);
                }
            }
        }
        LayoutInvariantReport {
            state_hash: self.state_hash(),
            issues,
        }
    }

    fn check_root(&self, root: IntervalId, dim: Dimension, issues: &mut Vec<LayoutInvariantIssue>) {
        let Some(node) = self.intervals.get(&root) else {
            push_issue(
                issues,
                LayoutInvariantCode::MissingInterval,
                LayoutInvariantSeverity::Error,
                Some(root),
                None,
                format!("layer root {root} is missing"),
            );
            return;
        };
        if node.parent.is_some() {
            push_issue(
                issues,
                LayoutInvariantCode::ParentMismatch,
                LayoutInvariantSeverity::Error,
                Some(root),
                node.parent,
                format!("layer root {root} must not have a parent"),
            );
        }
        let content = node
            .children
            .iter()
            .filter(|child| !self.is_gap(**child))
            .count();
        let gaps = node.children.len() - content;
        if content == 0 {
            let filler_ok = gaps == 1
                && node
                    .children
                    .first()
                    .is_some_and(|gap| self.max_size(*gap) == MAX_SIZE);
            if !filler_ok {
                push_issue(
                    issues,
                    LayoutInvariantCode::EmptyRootWithoutFiller,
                    LayoutInvariantSeverity::Error,
                    Some(root),
                    None,
                    format!("empty root {root} must hold exactly one filling gap"),
                );
            }
        } else if gaps > 0 {
            push_issue(
                issues,
                LayoutInvariantCode::RootWithStrayGap,
                LayoutInvariantSeverity::Error,
                Some(root),
                None,
                format!("root {root} holds {gaps} gap(s) next to its content"),
            );
        }
        let mut visited = FxHashSet::default();
        self.check_subtree(root, dim, true, issues, &mut visited);
    }

    fn check_subtree(
        &self,
        id: IntervalId,
        dim: Dimension,
        is_root: bool,
        issues: &mut Vec<LayoutInvariantIssue>,
        visited: &mut FxHashSet<IntervalId>,
    ) {
        if !visited.insert(id) {
            return;
        }
        let Some(node) = self.intervals.get(&id) else {
            return;
        };
        if node.dimension != dim {
            push_issue(
                issues,
                LayoutInvariantCode::DimensionMismatch,
                LayoutInvariantSeverity::Error,
                Some(id),
                node.parent,
                format!("interval {id} is {} inside a {} tree", node.dimension.as_str(), dim.as_str()),
            );
        }
        if !node.is_group() && !node.children.is_empty() {
            push_issue(
                issues,
                LayoutInvariantCode::LeafWithChildren,
                LayoutInvariantSeverity::Error,
                Some(id),
                None,
                format!("leaf {id} has children"),
            );
        }
        if node.is_group() && !is_root {
            if node.children.len() <= 1 {
                push_issue(
                    issues,
                    LayoutInvariantCode::RedundantGroup,
                    LayoutInvariantSeverity::Error,
                    Some(id),
                    node.parent,
                    format!("group {id} has {} child(ren)", node.children.len()),
                );
            }
            if node.is_parallel() && node.children.iter().all(|child| self.is_gap(*child)) {
                push_issue(
                    issues,
                    LayoutInvariantCode::ParallelWithoutContent,
                    LayoutInvariantSeverity::Error,
                    Some(id),
                    None,
                    format!("parallel group {id} holds only gaps"),
                );
            }
        }
        if node.is_sequential() {
            for pair in node.children.windows(2) {
                if self.is_gap(pair[0]) && self.is_gap(pair[1]) {
                    push_issue(
                        issues,
                        LayoutInvariantCode::AdjacentGaps,
                        LayoutInvariantSeverity::Error,
                        Some(pair[0]),
                        Some(pair[1]),
                        format!("sequence {id} has adjacent gaps {} and {}", pair[0], pair[1]),
                    );
                }
            }
        }
        for child in &node.children {
            match self.intervals.get(child) {
                None => push_issue(
                    issues,
                    LayoutInvariantCode::MissingInterval,
                    LayoutInvariantSeverity::Error,
                    Some(*child),
                    Some(id),
                    format!("group {id} references missing child {child}"),
                ),
                Some(child_node) if child_node.parent != Some(id) => push_issue(
                    issues,
                    LayoutInvariantCode::ParentMismatch,
                    LayoutInvariantSeverity::Error,
                    Some(*child),
                    Some(id),
                    format!("child {child} of {id} points to {:?}", child_node.parent.map(IntervalId::get)),
                ),
                Some(child_node) => {
                    if child_node.is_component()
                        && !space_within(&node.current, &child_node.current, dim)
                    {
                        push_issue(
                            issues,
                            LayoutInvariantCode::SpaceOutsideParent,
                            LayoutInvariantSeverity::Warning,
                            Some(*child),
                            Some(id),
                            format!("component {child} lies outside the current space of {id}"),
                        );
                    }
                    self.check_subtree(*child, dim, false, issues, visited);
                }
            }
        }
    }

    /// Serializable snapshot of the structural state.
    #[must_use]
    pub fn snapshot(&self) -> ModelSnapshot {
        ModelSnapshot {
            next_interval: self.next_interval,
            intervals: self.intervals.values().cloned().collect(),
            components: self.components.values().cloned().collect(),
        }
    }

    /// Rebuild a model from a snapshot, validating parent/child links.
    ///
    /// The rebuilt model starts with an empty journal.
    pub fn from_snapshot(snapshot: ModelSnapshot) -> Result<Self, ModelError> {
        let mut intervals = BTreeMap::new();
        for node in snapshot.intervals {
            let id = node.id;
            if intervals.insert(id, node).is_some() {
                return Err(ModelError::DuplicateInterval { interval: id });
            }
        }
        for node in intervals.values() {
            for child in &node.children {
                let Some(child_node) = intervals.get(child) else {
                    return Err(ModelError::UnknownInterval { interval: *child });
                };
                if child_node.parent != Some(node.id) {
                    return Err(ModelError::ParentMismatch {
                        interval: *child,
                        expected: Some(node.id),
                        actual: child_node.parent,
                    });
                }
            }
            if let Some(parent) = node.parent {
                let linked = intervals
                    .get(&parent)
                    .is_some_and(|parent_node| parent_node.children.contains(&node.id));
                if !linked {
                    return Err(ModelError::ParentMismatch {
                        interval: node.id,
                        expected: None,
                        actual: Some(parent),
                    });
                }
            }
        }
        let mut next_interval = snapshot.next_interval;
        if let Some(max_existing) = intervals.keys().next_back().copied()
            && next_interval <= max_existing
        {
            next_interval = max_existing.checked_next()?;
        }
        let mut components = BTreeMap::new();
        for component in snapshot.components {
            for interval in component.intervals {
                if !intervals.contains_key(&interval) {
                    return Err(ModelError::UnknownInterval { interval });
                }
            }
            let id = component.id.clone();
            if components.insert(id.clone(), component).is_some() {
                return Err(ModelError::DuplicateComponent { component: id });
            }
        }
        Ok(Self {
            intervals,
            components,
            next_interval,
            sequence: 0,
            journal_floor: 0,
            journal: Vec::new(),
        })
    }
}

fn space_within(outer: &LayoutRegion, inner: &LayoutRegion, dim: Dimension) -> bool {
    if !outer.is_set(dim) || !inner.is_set(dim) {
        return true;
    }
    outer.contains(inner, dim)
}

fn format_sizes(sizes: IntervalSizes) -> String {
    fn one(value: i32) -> String {
        match value {
            crate::types::NOT_EXPLICITLY_DEFINED => "-".to_owned(),
            crate::types::USE_PREFERRED_SIZE => "pref".to_owned(),
            MAX_SIZE => "max".to_owned(),
            other => other.to_string(),
        }
    }
    format!("{}/{}/{}", one(sizes.min), one(sizes.pref), one(sizes.max))
}

fn push_issue(
    issues: &mut Vec<LayoutInvariantIssue>,
    code: LayoutInvariantCode,
    severity: LayoutInvariantSeverity,
    interval: Option<IntervalId>,
    related: Option<IntervalId>,
    message: String,
) {
    issues.push(LayoutInvariantIssue {
        code,
        severity,
        interval,
        related,
        message,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Rect, Size};
    use crate::interval::GroupKind;

    const H: Dimension = Dimension::Horizontal;

    fn form() -> (LayoutModel, [IntervalId; 2]) {
        let mut model = LayoutModel::new();
        let roots = model
            .create_container(ComponentId::from("form"), Size::new(400, 300))
            .expect("container");
        (model, roots)
    }

    #[test]
    fn fresh_container_is_clean() {
        let (model, _) = form();
        let report = model.invariant_report();
        assert!(!report.has_errors(), "{:?}", report.issues);
        assert_eq!(report.state_hash, model.state_hash());
    }

    #[test]
    fn dump_lists_nested_structure() {
        let (mut model, roots) = form();
        let filler = model.child(roots[0], 0).expect("filler");
        model.remove_interval(filler).expect("remove");
        let seq = model.create_group(H, GroupKind::Sequential).expect("seq");
        let gap = model.create_gap(H, IntervalSizes::fixed(10)).expect("gap");
        let a = model.create_component(ComponentId::from("a")).expect("a")[0];
        model.add_interval(seq, roots[0], None).expect("add");
        model.add_interval(gap, seq, None).expect("add");
        model.add_interval(a, seq, None).expect("add");
        let dump = model.dump_structure(roots[0]);
        assert_eq!(
            dump,
            "parallel group=leading\n  sequential\n    gap size=pref/10/pref\n    component 'a'\n"
        );
        assert!(model.dump(roots[0]).contains(&format!("component 'a' {a}")));
    }

    #[test]
    fn report_flags_adjacent_gaps_and_redundant_groups() {
        let (mut model, roots) = form();
        let filler = model.child(roots[0], 0).expect("filler");
        model.remove_interval(filler).expect("remove");
        let seq = model.create_group(H, GroupKind::Sequential).expect("seq");
        model.add_interval(seq, roots[0], None).expect("add");
        for _ in 0..2 {
            let gap = model.create_gap(H, IntervalSizes::fixed(5)).expect("gap");
            model.add_interval(gap, seq, None).expect("add");
        }
        let report = model.invariant_report();
        let codes: Vec<_> = report.errors().map(|issue| issue.code).collect();
        assert!(codes.contains(&LayoutInvariantCode::AdjacentGaps));

        let par = model.create_group(H, GroupKind::Parallel).expect("par");
        model.add_interval(par, seq, None).expect("add");
        let codes: Vec<_> = model
            .invariant_report()
            .errors()
            .map(|issue| issue.code)
            .collect();
        assert!(codes.contains(&LayoutInvariantCode::RedundantGroup));
        assert!(codes.contains(&LayoutInvariantCode::ParallelWithoutContent));
    }

    #[test]
    fn report_flags_empty_root_without_filler() {
        let (mut model, roots) = form();
        let filler = model.child(roots[1], 0).expect("filler");
        model.remove_interval(filler).expect("remove");
        let codes: Vec<_> = model
            .invariant_report()
            .errors()
            .map(|issue| issue.code)
            .collect();
        assert_eq!(codes, vec![LayoutInvariantCode::EmptyRootWithoutFiller]);
    }

    #[test]
    fn space_outside_parent_is_a_warning() {
        let (mut model, roots) = form();
        let a = model.create_component(ComponentId::from("a")).expect("a")[0];
        let filler = model.child(roots[0], 0).expect("filler");
        model.remove_interval(filler).expect("remove");
        model.add_interval(a, roots[0], None).expect("add");
        model.set_current_space(roots[0], LayoutRegion::from_rect(Rect::new(0, 0, 100, 100), None));
        model.set_current_space(a, LayoutRegion::from_rect(Rect::new(90, 0, 30, 10), None));
        let report = model.invariant_report();
        assert!(!report.has_errors());
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].code, LayoutInvariantCode::SpaceOutsideParent);
    }

    #[test]
    fn state_hash_ignores_current_space() {
        let (mut model, roots) = form();
        let before = model.state_hash();
        model.set_current_space(roots[0], LayoutRegion::from_rect(Rect::new(0, 0, 5, 5), None));
        assert_eq!(model.state_hash(), before);
        let gap = model.child(roots[0], 0).expect("gap");
        model.set_interval_size(gap, 0, 1, MAX_SIZE).expect("sizes");
        assert_ne!(model.state_hash(), before);
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let (mut model, roots) = form();
        model.create_component(ComponentId::from("a")).expect("a");
        let gap = model.child(roots[0], 0).expect("gap");
        model
            .set_attribute(gap, crate::interval::IntervalAttributes::FLEX_SIZEDEF, true)
            .expect("attr");
        let json = serde_json::to_string(&model.snapshot()).expect("serialize");
        let snapshot: ModelSnapshot = serde_json::from_str(&json).expect("deserialize");
        let rebuilt = LayoutModel::from_snapshot(snapshot).expect("rebuild");
        assert_eq!(rebuilt.state_hash(), model.state_hash());
        assert_eq!(rebuilt.dump(roots[0]), model.dump(roots[0]));
    }

    #[test]
    fn from_snapshot_rejects_broken_links() {
        let (model, roots) = form();
        let mut snapshot = model.snapshot();
        let gap = model.child(roots[0], 0).expect("gap");
        for node in &mut snapshot.intervals {
            if node.id == gap {
                node.parent = None;
            }
        }
        assert!(matches!(
            LayoutModel::from_snapshot(snapshot),
            Err(ModelError::ParentMismatch { .. })
        ));
    }
}
