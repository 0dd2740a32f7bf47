//! Greedy nearest-neighbor ordering for multi-stop routes.

/// Orders all nodes of a duration matrix as an open tour starting at `start`.
///
/// At each step the cheapest unvisited node from the current position is
/// chosen. The comparison is strictly-smaller, so when two candidates cost
/// the same the lower index wins; callers rely on this for reproducible
/// visiting orders. The result is a permutation of `0..n` beginning with
/// `start`. This is a heuristic, not an optimal tour.
///
/// Callers must guarantee a non-empty square matrix and `start < n`; the
/// HTTP layer validates coordinate counts before any matrix exists.
pub fn nearest_neighbor_order(durations: &[Vec<f64>], start: usize) -> Vec<usize> {
    let n = durations.len();
    debug_assert!(start < n, "start index out of bounds");

    let mut order = Vec::with_capacity(n);
    let mut visited = vec![false; n];
    visited[start] = true;
    order.push(start);

    let mut current = start;
    while order.len() < n {
        let mut best = None;
        let mut best_cost = f64::INFINITY;

        for candidate in 0..n {
            if visited[candidate] {
                continue;
            }
            let cost = durations[current][candidate];
            if cost < best_cost {
                best_cost = cost;
                best = Some(candidate);
            }
        }

        // Every remaining cost was non-finite; take the lowest index so the
        // output stays a permutation.
        let next = best.unwrap_or_else(|| {
            (0..n)
                .find(|&i| !visited[i])
                .expect("loop condition guarantees an unvisited node")
        });

        visited[next] = true;
        order.push(next);
        current = next;
    }

    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_permutation(order: &[usize], n: usize) -> bool {
        let mut seen = vec![false; n];
        for &i in order {
            if i >= n || seen[i] {
                return false;
            }
            seen[i] = true;
        }
        order.len() == n
    }

    #[test]
    fn follows_cheapest_edges() {
        // 0 -> 2 (1.0) -> 1 (2.0) -> 3 is the greedy order.
        let durations = vec![
            vec![0.0, 5.0, 1.0, 9.0],
            vec![5.0, 0.0, 2.0, 4.0],
            vec![1.0, 2.0, 0.0, 7.0],
            vec![9.0, 4.0, 7.0, 0.0],
        ];
        assert_eq!(nearest_neighbor_order(&durations, 0), vec![0, 2, 1, 3]);
    }

    #[test]
    fn returns_permutation_for_asymmetric_matrix() {
        let durations = vec![
            vec![0.0, 10.0, 3.0, 8.0, 2.0],
            vec![1.0, 0.0, 9.0, 4.0, 6.0],
            vec![7.0, 2.0, 0.0, 5.0, 11.0],
            vec![3.0, 12.0, 6.0, 0.0, 1.0],
            vec![4.0, 8.0, 2.0, 9.0, 0.0],
        ];
        let order = nearest_neighbor_order(&durations, 0);
        assert!(is_permutation(&order, 5));
        assert_eq!(order[0], 0);
    }

    #[test]
    fn equal_costs_pick_the_lower_index() {
        let durations = vec![
            vec![0.0, 3.0, 3.0],
            vec![3.0, 0.0, 1.0],
            vec![3.0, 1.0, 0.0],
        ];
        assert_eq!(nearest_neighbor_order(&durations, 0), vec![0, 1, 2]);
    }

    #[test]
    fn respects_start_index() {
        let durations = vec![
            vec![0.0, 1.0, 2.0],
            vec![1.0, 0.0, 5.0],
            vec![2.0, 5.0, 0.0],
        ];
        let order = nearest_neighbor_order(&durations, 2);
        assert_eq!(order[0], 2);
        assert!(is_permutation(&order, 3));
    }

    #[test]
    fn single_node_returns_start() {
        let durations = vec![vec![0.0]];
        assert_eq!(nearest_neighbor_order(&durations, 0), vec![0]);
    }

    #[test]
    fn unreachable_nodes_still_yield_a_permutation() {
        let inf = f64::INFINITY;
        let durations = vec![
            vec![0.0, inf, inf],
            vec![inf, 0.0, inf],
            vec![inf, inf, 0.0],
        ];
        let order = nearest_neighbor_order(&durations, 0);
        assert!(is_permutation(&order, 3));
        assert_eq!(order, vec![0, 1, 2]);
    }
}
