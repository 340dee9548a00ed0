use sim_types::Position;
use std::collections::BTreeMap;

/// Matching order. Carriers are matched first; their match is a reservation
/// for after they unload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Carrying,
    Free,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    pub position: Position,
    pub priority: Priority,
}

/// Greedy nearest-pair matching between requesters and targets.
///
/// For each priority class in order, the globally closest remaining
/// (requester, target) pair by Manhattan distance is committed and both are
/// removed, until one side runs out. Ties go to the lexicographically
/// smallest requester, then target. No target is ever assigned twice.
pub fn assign(requests: &[Request], targets: &[Position]) -> BTreeMap<Position, Position> {
    let mut seen = Vec::with_capacity(requests.len());
    let requests: Vec<Request> = requests
        .iter()
        .copied()
        .filter(|request| {
            if seen.contains(&request.position) {
                return false;
            }
            seen.push(request.position);
            true
        })
        .collect();

    let mut targets: Vec<Position> = targets.to_vec();
    targets.sort();
    targets.dedup();
    let mut target_taken = vec![false; targets.len()];

    let mut assignments = BTreeMap::new();
    for priority in [Priority::Carrying, Priority::Free] {
        let mut requesters: Vec<Position> = requests
            .iter()
            .filter(|request| request.priority == priority)
            .map(|request| request.position)
            .collect();
        requesters.sort();

        let distances: Vec<Vec<u32>> = requesters
            .iter()
            .map(|requester| targets.iter().map(|t| requester.manhattan(*t)).collect())
            .collect();
        let mut requester_done = vec![false; requesters.len()];

        loop {
            let mut best: Option<(u32, usize, usize)> = None;
            for (r, row) in distances.iter().enumerate() {
                if requester_done[r] {
                    continue;
                }
                for (t, distance) in row.iter().enumerate() {
                    if target_taken[t] {
                        continue;
                    }
                    // Rows and columns are sorted, so strict `<` keeps the
                    // lexicographically smallest pair among equal distances.
                    if best.map_or(true, |(d, _, _)| *distance < d) {
                        best = Some((*distance, r, t));
                    }
                }
            }
            let Some((_, r, t)) = best else {
                break;
            };
            requester_done[r] = true;
            target_taken[t] = true;
            assignments.insert(requesters[r], targets[t]);
        }
    }
    assignments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn free(x: i32, y: i32) -> Request {
        Request {
            position: Position::new(x, y),
            priority: Priority::Free,
        }
    }

    fn carrying(x: i32, y: i32) -> Request {
        Request {
            position: Position::new(x, y),
            priority: Priority::Carrying,
        }
    }

    #[test]
    fn single_target_goes_to_the_closest_requester_only() {
        let assignments = assign(&[free(0, 0), free(4, 4)], &[Position::new(3, 4)]);
        assert_eq!(assignments.len(), 1);
        assert_eq!(
            assignments.get(&Position::new(4, 4)),
            Some(&Position::new(3, 4))
        );
        assert!(!assignments.contains_key(&Position::new(0, 0)));
    }

    #[test]
    fn globally_smallest_pair_is_committed_before_row_order() {
        // Requester (0,0) is scanned first, but (5,0)-(6,0) is the closest pair.
        let assignments = assign(
            &[free(0, 0), free(5, 0)],
            &[Position::new(6, 0), Position::new(2, 0)],
        );
        assert_eq!(assignments[&Position::new(5, 0)], Position::new(6, 0));
        assert_eq!(assignments[&Position::new(0, 0)], Position::new(2, 0));
    }

    #[test]
    fn carriers_are_matched_before_free_requesters() {
        let assignments = assign(
            &[free(1, 0), carrying(5, 0)],
            &[Position::new(2, 0)],
        );
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[&Position::new(5, 0)], Position::new(2, 0));
    }

    #[test]
    fn equal_distances_break_ties_lexicographically() {
        let assignments = assign(&[free(2, 2), free(0, 2)], &[Position::new(1, 2)]);
        assert_eq!(
            assignments,
            BTreeMap::from([(Position::new(0, 2), Position::new(1, 2))])
        );
    }

    #[test]
    fn no_target_is_assigned_twice() {
        let requests: Vec<Request> = (0..6).map(|i| free(i, i % 3)).collect();
        let targets = [
            Position::new(1, 1),
            Position::new(4, 0),
            Position::new(1, 1),
            Position::new(9, 9),
        ];
        let assignments = assign(&requests, &targets);
        let mut assigned: Vec<Position> = assignments.values().copied().collect();
        let before = assigned.len();
        assigned.sort();
        assigned.dedup();
        assert_eq!(assigned.len(), before);
        assert_eq!(before, 3);
    }

    #[test]
    fn duplicate_requester_positions_keep_the_first_request() {
        let assignments = assign(
            &[free(0, 0), carrying(0, 0)],
            &[Position::new(0, 1), Position::new(0, 3)],
        );
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[&Position::new(0, 0)], Position::new(0, 1));
    }

    #[test]
    fn empty_inputs_yield_no_assignments() {
        assert!(assign(&[], &[Position::new(1, 1)]).is_empty());
        assert!(assign(&[free(1, 1)], &[]).is_empty());
    }
}
