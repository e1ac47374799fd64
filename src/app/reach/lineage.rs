use std::collections::{HashMap, HashSet};

/// Collects the nodes of the first path found (depth-first, not shortest)
/// from each lineage source to the terminal node.
pub fn lineage_path_nodes<'a, S, E>(sources: S, terminal: &str, edges: E) -> HashSet<String>
where
    S: IntoIterator<Item = &'a str>,
    E: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut forward: HashMap<&str, Vec<&str>> = HashMap::new();
    for (source, target) in edges {
        forward.entry(source).or_default().push(target);
    }
    for targets in forward.values_mut() {
        targets.sort_unstable();
    }

    let mut out = HashSet::new();
    for source in sources {
        if let Some(path) = first_path(source, terminal, &forward) {
            out.extend(path.into_iter().map(str::to_owned));
        }
    }
    out
}

fn first_path<'a>(
    source: &'a str,
    terminal: &str,
    forward: &HashMap<&str, Vec<&'a str>>,
) -> Option<Vec<&'a str>> {
    let mut stack: Vec<(&'a str, usize)> = vec![(source, 0)];
    let mut visited: HashSet<&str> = HashSet::from([source]);

    while let Some(&(node, cursor)) = stack.last() {
        if node == terminal {
            return Some(stack.iter().map(|&(id, _)| id).collect());
        }

        let children = forward.get(node).map(Vec::as_slice).unwrap_or_default();
        let mut next_cursor = cursor;
        let mut descended = false;
        while next_cursor < children.len() {
            let next = children[next_cursor];
            next_cursor += 1;
            if visited.insert(next) {
                if let Some(top) = stack.last_mut() {
                    top.1 = next_cursor;
                }
                stack.push((next, 0));
                descended = true;
                break;
            }
        }

        if !descended {
            stack.pop();
        }
    }

    None
}
