use std::collections::BTreeSet;

/// Finds a cycle with an iterative depth-first traversal.
///
/// `successors[i]` lists the nodes reachable from `i` in one step; `ids[i]`
/// orders the roots and names the nodes. Returns the cycle as a list of node
/// indices that starts and ends with the same node.
pub(crate) fn find_cycle(ids: &[&str], successors: &[Vec<usize>]) -> Option<Vec<usize>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        OnPath,
        Done,
    }

    let mut roots: Vec<usize> = (0..ids.len()).collect();
    roots.sort_by_key(|&i| ids[i]);

    let mut marks = vec![Mark::Unvisited; ids.len()];
    // (node, index of the next successor to explore)
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for root in roots {
        if marks[root] != Mark::Unvisited {
            continue;
        }
        marks[root] = Mark::OnPath;
        stack.push((root, 0));

        while let Some(top) = stack.last_mut() {
            let (node, next) = *top;
            if let Some(&child) = successors[node].get(next) {
                top.1 += 1;
                match marks[child] {
                    Mark::Unvisited => {
                        marks[child] = Mark::OnPath;
                        stack.push((child, 0));
                    }
                    Mark::OnPath => {
                        let start = stack
                            .iter()
                            .position(|&(n, _)| n == child)
                            .unwrap_or(0);
                        let mut cycle: Vec<usize> = stack[start..].iter().map(|&(n, _)| n).collect();
                        cycle.push(child);
                        return Some(cycle);
                    }
                    Mark::Done => {}
                }
            } else {
                marks[node] = Mark::Done;
                stack.pop();
            }
        }
    }
    None
}

/// Kahn's algorithm with ties broken by node id, so the order is stable for
/// identical input. Returns `None` when the graph has a cycle.
pub(crate) fn topological_order(ids: &[&str], successors: &[Vec<usize>]) -> Option<Vec<usize>> {
    let mut in_degree = vec![0usize; ids.len()];
    for targets in successors {
        for &t in targets {
            in_degree[t] += 1;
        }
    }

    let mut ready: BTreeSet<(&str, usize)> = in_degree
        .iter()
        .enumerate()
        .filter(|&(_, d)| *d == 0)
        .map(|(i, _)| (ids[i], i))
        .collect();

    let mut order = Vec::with_capacity(ids.len());
    while let Some((_, node)) = ready.pop_first() {
        order.push(node);
        for &t in &successors[node] {
            in_degree[t] -= 1;
            if in_degree[t] == 0 {
                ready.insert((ids[t], t));
            }
        }
    }

    (order.len() == ids.len()).then_some(order)
}
