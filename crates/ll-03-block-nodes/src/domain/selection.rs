//! Candidate selection for non-preferred connections.

use rand::Rng;

/// Picks up to `slots` endpoints from `candidates`, ordered by ascending
/// priority with random tie-breaking inside a priority tier.
pub fn select_secondary<R: Rng>(
    candidates: &[(String, i32)],
    slots: usize,
    rng: &mut R,
) -> Vec<String> {
    let mut ranked: Vec<(i32, u32, &String)> = candidates
        .iter()
        .map(|(endpoint, priority)| (*priority, rng.gen::<u32>(), endpoint))
        .collect();
    ranked.sort_unstable_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
    ranked
        .into_iter()
        .take(slots)
        .map(|(_, _, endpoint)| endpoint.clone())
        .collect()
}
