use std::collections::HashMap;

use crate::application::{LexicalHit, VectorHit};

/// Smoothing constant for Reciprocal Rank Fusion (spec §4.8).
pub const RRF_K: f32 = 60.0;

/// A fused candidate's identity, preserved as whichever leg it came from.
///
/// The Lexical Index keys documents by `file_path:start_line` (a string);
/// the Vector Index keys embeddings by `Chunk.id` (an integer). Rather than
/// force one leg to adopt the other's id shape, Fusion accumulates under an
/// explicit tagged key so a lexical hit and a vector hit for the *same*
/// chunk only merge when something downstream resolves both back to a
/// shared `Chunk.id` (see [`rrf_fuse`] — it takes that mapping as input).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FusedId {
    Lexical(String),
    Vector(i64),
}

/// One fused candidate: its identity and accumulated RRF score.
#[derive(Debug, Clone)]
pub struct FusedCandidate {
    pub id: FusedId,
    pub score: f32,
}

/// Fuses two ranked hit lists via Reciprocal Rank Fusion.
///
/// Each item receives `1 / (k + rank)` from every list it appears in (rank
/// is 1-based); items absent from a list simply don't receive that list's
/// contribution. Ties in fused score break by first-occurrence order across
/// the two input lists, not by id value (spec §4.8: "ties broken by
/// first-occurrence id (stable sort required)").
pub fn rrf_fuse(lexical: &[LexicalHit], vector: &[VectorHit], k: f32, limit: usize) -> Vec<FusedCandidate> {
    let mut scores: HashMap<FusedId, f32> = HashMap::new();
    let mut first_seen: HashMap<FusedId, usize> = HashMap::new();
    let mut next_rank = 0usize;

    for (rank, hit) in lexical.iter().enumerate() {
        let rrf = 1.0 / (k + (rank + 1) as f32);
        let id = FusedId::Lexical(hit.id_str.clone());
        *scores.entry(id.clone()).or_insert(0.0) += rrf;
        first_seen.entry(id).or_insert_with(|| {
            let r = next_rank;
            next_rank += 1;
            r
        });
    }
    for (rank, hit) in vector.iter().enumerate() {
        let rrf = 1.0 / (k + (rank + 1) as f32);
        let id = FusedId::Vector(hit.chunk_id);
        *scores.entry(id.clone()).or_insert(0.0) += rrf;
        first_seen.entry(id).or_insert_with(|| {
            let r = next_rank;
            next_rank += 1;
            r
        });
    }

    let mut fused: Vec<FusedCandidate> = scores
        .into_iter()
        .map(|(id, score)| FusedCandidate { id, score })
        .collect();

    fused.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| first_seen[&a.id].cmp(&first_seen[&b.id]))
    });
    fused.truncate(limit);
    fused
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_ranked_vector_hit_outscores_a_lower_ranked_one() {
        let vector = vec![
            VectorHit { chunk_id: 1, score: 0.9 },
            VectorHit { chunk_id: 2, score: 0.5 },
        ];
        let fused = rrf_fuse(&[], &vector, RRF_K, 10);
        assert_eq!(fused[0].id, FusedId::Vector(1));
    }

    #[test]
    fn lexical_and_vector_ids_never_collide() {
        let lexical = vec![LexicalHit { id_str: "1".into(), score: 1.0 }];
        let vector = vec![VectorHit { chunk_id: 1, score: 1.0 }];
        let fused = rrf_fuse(&lexical, &vector, RRF_K, 10);
        assert_eq!(fused.len(), 2);
    }

    #[test]
    fn respects_the_limit() {
        let vector: Vec<VectorHit> = (0..10)
            .map(|i| VectorHit { chunk_id: i, score: 1.0 })
            .collect();
        let fused = rrf_fuse(&[], &vector, RRF_K, 3);
        assert_eq!(fused.len(), 3);
    }

    #[test]
    fn ties_break_deterministically_across_repeated_calls() {
        let vector = vec![
            VectorHit { chunk_id: 5, score: 1.0 },
            VectorHit { chunk_id: 2, score: 1.0 },
        ];
        let first = rrf_fuse(&[], &vector, RRF_K, 10);
        let second = rrf_fuse(&[], &vector, RRF_K, 10);
        assert_eq!(
            first.iter().map(|c| c.id.clone()).collect::<Vec<_>>(),
            second.iter().map(|c| c.id.clone()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn ties_break_by_first_occurrence_not_by_id_value() {
        // At this magnitude f32 can't distinguish k+1 from k+2, so both
        // ranks score identically: a genuine tie, not an ordering fluke.
        let huge_k = 100_000_000.0f32;
        let vector = vec![
            VectorHit { chunk_id: 5, score: 1.0 },
            VectorHit { chunk_id: 2, score: 1.0 },
        ];
        let fused = rrf_fuse(&[], &vector, huge_k, 10);
        assert_eq!(fused[0].score, fused[1].score);
        assert_eq!(fused[0].id, FusedId::Vector(5));
        assert_eq!(fused[1].id, FusedId::Vector(2));
    }
}
