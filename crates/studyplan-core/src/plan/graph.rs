//! Prerequisite graph over plan steps.
//!
//! Steps reference their prerequisites by id. The graph is built as an
//! arena over the step slice (index adjacency computed from ids), so a
//! cycle is an error condition the analysis reports, not a structure the
//! types can share ownership through.

use std::collections::HashMap;
use uuid::Uuid;

use super::PlanStep;

/// Immutable prerequisite-graph view over a slice of steps.
pub struct DependencyGraph<'a> {
    steps: &'a [PlanStep],
    index_of: HashMap<Uuid, usize>,
    /// For each step, indices of its prerequisites. Ids that resolve to
    /// no step in the slice are ignored.
    prereqs: Vec<Vec<usize>>,
}

impl<'a> DependencyGraph<'a> {
    pub fn new(steps: &'a [PlanStep]) -> Self {
        let index_of: HashMap<Uuid, usize> =
            steps.iter().enumerate().map(|(i, s)| (s.id, i)).collect();
        let prereqs = steps
            .iter()
            .map(|step| {
                step.prerequisite_ids
                    .iter()
                    .filter_map(|id| index_of.get(id).copied())
                    .collect()
            })
            .collect();
        Self {
            steps,
            index_of,
            prereqs,
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Depth-first search with an explicit recursion stack. Returns the
    /// offending path (prerequisite order, ending where it re-enters) if
    /// any cycle exists, including single-step self-references.
    pub fn detect_cycle(&self) -> Option<Vec<Uuid>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            White,
            Gray,
            Black,
        }

        let n = self.steps.len();
        let mut marks = vec![Mark::White; n];
        let mut path: Vec<usize> = Vec::new();

        fn visit(
            node: usize,
            prereqs: &[Vec<usize>],
            marks: &mut [Mark],
            path: &mut Vec<usize>,
        ) -> Option<Vec<usize>> {
            marks[node] = Mark::Gray;
            path.push(node);
            for &dep in &prereqs[node] {
                match marks[dep] {
                    Mark::Gray => {
                        // Found the back edge; slice the path from the
                        // re-entered node and close the loop.
                        let start = path.iter().position(|&p| p == dep).unwrap_or(0);
                        let mut cycle: Vec<usize> = path[start..].to_vec();
                        cycle.push(dep);
                        return Some(cycle);
                    }
                    Mark::White => {
                        if let Some(cycle) = visit(dep, prereqs, marks, path) {
                            return Some(cycle);
                        }
                    }
                    Mark::Black => {}
                }
            }
            path.pop();
            marks[node] = Mark::Black;
            None
        }

        for start in 0..n {
            if marks[start] == Mark::White {
                if let Some(cycle) = visit(start, &self.prereqs, &mut marks, &mut path) {
                    return Some(cycle.into_iter().map(|i| self.steps[i].id).collect());
                }
            }
        }
        None
    }

    /// Kahn's algorithm. Returns steps ordered so every prerequisite
    /// precedes its dependents, or `None` exactly when a cycle exists.
    /// Ties break on sequence index, so the result is deterministic.
    pub fn topological_sort(&self) -> Option<Vec<&'a PlanStep>> {
        let n = self.steps.len();
        // dependents[i] lists steps that require step i.
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut in_degree = vec![0usize; n];
        for (i, deps) in self.prereqs.iter().enumerate() {
            for &dep in deps {
                dependents[dep].push(i);
                in_degree[i] += 1;
            }
        }

        let mut ready: Vec<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        ready.sort_by_key(|&i| self.steps[i].sequence_index);

        let mut ordered = Vec::with_capacity(n);
        while let Some(&next) = ready.first() {
            ready.remove(0);
            ordered.push(&self.steps[next]);
            for &dependent in &dependents[next] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    let pos = ready
                        .binary_search_by_key(
                            &self.steps[dependent].sequence_index,
                            |&i| self.steps[i].sequence_index,
                        )
                        .unwrap_or_else(|e| e);
                    ready.insert(pos, dependent);
                }
            }
        }

        if ordered.len() == n {
            Some(ordered)
        } else {
            None
        }
    }

    /// True when `id` resolves to a step in this graph.
    pub fn contains(&self, id: Uuid) -> bool {
        self.index_of.contains_key(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::StepType;

    fn step(title: &str, index: usize) -> PlanStep {
        PlanStep {
            id: Uuid::new_v4(),
            plan_id: Uuid::nil(),
            title: title.to_string(),
            estimated_minutes: 30,
            sequence_index: index,
            prerequisite_ids: Vec::new(),
            step_type: StepType::Task,
            recommended_start: None,
            due_by: None,
        }
    }

    #[test]
    fn empty_graph_has_no_cycle_and_sorts() {
        let steps: Vec<PlanStep> = Vec::new();
        let graph = DependencyGraph::new(&steps);
        assert!(graph.detect_cycle().is_none());
        assert_eq!(graph.topological_sort().unwrap().len(), 0);
    }

    #[test]
    fn linear_chain_sorts_in_order() {
        let mut steps = vec![step("a", 0), step("b", 1), step("c", 2)];
        let (a, b) = (steps[0].id, steps[1].id);
        steps[1].prerequisite_ids.push(a);
        steps[2].prerequisite_ids.push(b);

        let graph = DependencyGraph::new(&steps);
        assert!(graph.detect_cycle().is_none());
        let sorted = graph.topological_sort().unwrap();
        let titles: Vec<_> = sorted.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let mut steps = vec![step("a", 0)];
        let a = steps[0].id;
        steps[0].prerequisite_ids.push(a);

        let graph = DependencyGraph::new(&steps);
        let cycle = graph.detect_cycle().unwrap();
        assert_eq!(cycle, vec![a, a]);
        assert!(graph.topological_sort().is_none());
    }

    #[test]
    fn two_step_cycle_detected_with_path() {
        let mut steps = vec![step("a", 0), step("b", 1)];
        let (a, b) = (steps[0].id, steps[1].id);
        steps[0].prerequisite_ids.push(b);
        steps[1].prerequisite_ids.push(a);

        let graph = DependencyGraph::new(&steps);
        let cycle = graph.detect_cycle().unwrap();
        assert_eq!(cycle.len(), 3);
        assert_eq!(cycle.first(), cycle.last());
        assert!(graph.topological_sort().is_none());
    }

    #[test]
    fn unknown_prerequisite_ids_are_ignored() {
        let mut steps = vec![step("a", 0)];
        steps[0].prerequisite_ids.push(Uuid::new_v4());
        let graph = DependencyGraph::new(&steps);
        assert!(graph.detect_cycle().is_none());
        assert_eq!(graph.topological_sort().unwrap().len(), 1);
    }

    #[test]
    fn toposort_none_iff_cycle() {
        // Diamond: d depends on b and c, both depend on a.
        let mut steps = vec![step("a", 0), step("b", 1), step("c", 2), step("d", 3)];
        let a = steps[0].id;
        steps[1].prerequisite_ids.push(a);
        steps[2].prerequisite_ids.push(a);
        let (b, c) = (steps[1].id, steps[2].id);
        steps[3].prerequisite_ids = vec![b, c];

        let graph = DependencyGraph::new(&steps);
        assert!(graph.detect_cycle().is_none());
        let sorted = graph.topological_sort().unwrap();
        assert_eq!(sorted[0].title, "a");
        assert_eq!(sorted[3].title, "d");
    }
}
