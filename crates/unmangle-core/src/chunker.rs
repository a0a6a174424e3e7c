//! Token-bounded source chunking.
//!
//! Splits source into contiguous, overlapping chunks sized by a token
//! budget derived from the model context window. Chunking is purely
//! size-based and never AST-aware: the LLM only needs local identifier
//! visibility, and the rename pass is applied to the real source, so clean
//! statement boundaries buy nothing.
//!
//! Boundaries are found by binary search over char-aligned cut points,
//! using the token counter as an oracle (O(log n) counter calls per chunk).

/// Token-counting oracle, deterministic per model family.
///
/// Implementations must be monotone: counting a longer prefix of the same
/// text never yields fewer tokens. The chunker relies on this for its
/// binary search.
pub trait TokenCounter: Send + Sync {
    /// Count the tokens in `text`.
    fn count(&self, text: &str) -> usize;
}

/// Cheap deterministic counter: roughly one token per four characters.
///
/// Good enough as a sizing oracle; real tokenizers for the supported model
/// families average 3-5 characters per token on minified JavaScript.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicCounter;

impl TokenCounter for HeuristicCounter {
    fn count(&self, text: &str) -> usize {
        text.chars().count().div_ceil(4)
    }
}

/// Per-chunk token budget and overlap policy.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkLimits {
    /// Target token count: non-final chunks should not stop below this.
    pub soft_tokens: usize,
    /// Maximum token count: no chunk may exceed this.
    pub hard_tokens: usize,
    /// Fraction of a chunk's tail repeated as the next chunk's leading
    /// context, in `[0, 1)`.
    pub overlap_ratio: f64,
}

impl ChunkLimits {
    /// Derive limits from a model context window.
    ///
    /// `soft_fraction` and `hard_fraction` are fractions of the window;
    /// the remainder of the window is headroom for the prompt scaffold and
    /// the model's reply.
    #[must_use]
    pub fn from_context_window(
        context_window: usize,
        soft_fraction: f64,
        hard_fraction: f64,
        overlap_ratio: f64,
    ) -> Self {
        let soft = ((context_window as f64) * soft_fraction) as usize;
        let hard = ((context_window as f64) * hard_fraction) as usize;
        Self {
            soft_tokens: soft.max(1),
            hard_tokens: hard.max(2),
            overlap_ratio,
        }
    }
}

/// A contiguous slice of the source, one LLM request's worth.
///
/// `text == source[start..end]`; offsets are byte positions on char
/// boundaries. A chunk overlaps its predecessor by
/// `overlap_ratio × predecessor length`.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeChunk {
    /// Position in the chunk sequence.
    pub index: usize,
    /// The chunk text.
    pub text: String,
    /// Byte offset of the chunk start in the original source.
    pub start: usize,
    /// Byte offset one past the chunk end.
    pub end: usize,
}

/// Split `source` into an ordered sequence of token-bounded chunks.
///
/// Guarantees:
/// - chunks cover the whole source with no gaps (successive chunks meet or
///   overlap);
/// - every chunk's token count is at most `limits.hard_tokens`;
/// - every non-final chunk's token count is at least `limits.soft_tokens`,
///   unless the remaining suffix was already below it;
/// - the cursor always advances, so the sequence is finite.
#[must_use]
pub fn divide_into_chunks(
    source: &str,
    limits: &ChunkLimits,
    counter: &dyn TokenCounter,
) -> Vec<CodeChunk> {
    let mut chunks = Vec::new();
    if source.is_empty() {
        return chunks;
    }

    // Candidate cut points: every char boundary after 0, plus the end.
    let bounds: Vec<usize> = source
        .char_indices()
        .map(|(i, _)| i)
        .skip(1)
        .chain(std::iter::once(source.len()))
        .collect();

    let mut start = 0usize;
    let mut index = 0usize;

    loop {
        let rest = &source[start..];
        if counter.count(rest) <= limits.hard_tokens {
            // Final chunk: whatever is left fits, no trailing overlap.
            chunks.push(CodeChunk {
                index,
                text: rest.to_string(),
                start,
                end: source.len(),
            });
            break;
        }

        // Binary-search the largest cut point whose prefix stays within the
        // hard threshold. The counter's monotonicity makes the predicate
        // monotone over `bounds[first..]`.
        let first = bounds.partition_point(|&b| b <= start);
        let mut best: Option<usize> = None;
        let (mut lo, mut hi) = (first, bounds.len() - 1);
        while lo <= hi {
            let mid = lo + (hi - lo) / 2;
            if counter.count(&source[start..bounds[mid]]) <= limits.hard_tokens {
                best = Some(mid);
                lo = mid + 1;
            } else if mid == first {
                break;
            } else {
                hi = mid - 1;
            }
        }

        // If even the smallest candidate exceeds the budget, take it anyway
        // rather than looping forever; real inputs never hit this.
        let end = bounds[best.unwrap_or(first)];
        chunks.push(CodeChunk {
            index,
            text: source[start..end].to_string(),
            start,
            end,
        });

        // The next chunk starts earlier than this boundary so the model
        // sees cross-chunk context.
        let span = end - start;
        let step_back = ((span as f64) * limits.overlap_ratio) as usize;
        let mut next = end - step_back.min(span);
        while next > 0 && !source.is_char_boundary(next) {
            next -= 1;
        }
        if next <= start {
            next = end;
        }
        start = next;
        index += 1;
    }

    tracing::debug!(
        chunks = chunks.len(),
        source_bytes = source.len(),
        hard_tokens = limits.hard_tokens,
        "divided source into chunks"
    );
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(soft: usize, hard: usize, overlap: f64) -> ChunkLimits {
        ChunkLimits {
            soft_tokens: soft,
            hard_tokens: hard,
            overlap_ratio: overlap,
        }
    }

    /// Rebuild the source from chunk spans, skipping each chunk's leading
    /// overlap region.
    fn reconstruct(source_len: usize, chunks: &[CodeChunk]) -> String {
        assert!(!chunks.is_empty());
        assert_eq!(chunks[0].start, 0);
        assert_eq!(chunks.last().unwrap().end, source_len);

        let mut out = chunks[0].text.clone();
        for pair in chunks.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            assert!(next.start <= prev.end, "gap between chunks");
            let overlap = prev.end - next.start;
            out.push_str(&next.text[overlap..]);
        }
        out
    }

    fn sample_source() -> String {
        let mut s = String::new();
        for i in 0..120 {
            s.push_str(&format!("var v{i} = fn{i}(a{i}, b{i});\n"));
        }
        s
    }

    #[test]
    fn test_single_chunk_when_under_hard() {
        let source = "function a(b){return b+1}";
        let chunks = divide_into_chunks(source, &limits(8, 100, 0.2), &HeuristicCounter);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, source);
        assert_eq!(chunks[0].start, 0);
        assert_eq!(chunks[0].end, source.len());
    }

    #[test]
    fn test_empty_source_yields_no_chunks() {
        let chunks = divide_into_chunks("", &limits(8, 16, 0.2), &HeuristicCounter);
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_coverage_reconstructs_source() {
        let source = sample_source();
        let chunks = divide_into_chunks(&source, &limits(20, 40, 0.25), &HeuristicCounter);
        assert!(chunks.len() > 2);
        assert_eq!(reconstruct(source.len(), &chunks), source);
    }

    #[test]
    fn test_coverage_without_overlap() {
        let source = sample_source();
        let chunks = divide_into_chunks(&source, &limits(20, 40, 0.0), &HeuristicCounter);
        assert_eq!(reconstruct(source.len(), &chunks), source);
        for pair in chunks.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn test_token_bounds_hold() {
        let source = sample_source();
        let lim = limits(20, 40, 0.25);
        let counter = HeuristicCounter;
        let chunks = divide_into_chunks(&source, &lim, &counter);

        for (i, chunk) in chunks.iter().enumerate() {
            let tokens = counter.count(&chunk.text);
            assert!(tokens <= lim.hard_tokens, "chunk {i} over hard bound");
            if i + 1 < chunks.len() {
                assert!(tokens >= lim.soft_tokens, "non-final chunk {i} under soft bound");
            }
        }
    }

    #[test]
    fn test_multibyte_source_stays_on_char_boundaries() {
        let source = "const π = 3.14159; /* φψω φψω φψω */ const ñ = π * 2;".repeat(20);
        let chunks = divide_into_chunks(&source, &limits(10, 20, 0.3), &HeuristicCounter);
        assert_eq!(reconstruct(source.len(), &chunks), source);
        for chunk in &chunks {
            assert_eq!(chunk.text, &source[chunk.start..chunk.end]);
        }
    }

    #[test]
    fn test_indices_are_sequential() {
        let source = sample_source();
        let chunks = divide_into_chunks(&source, &limits(20, 40, 0.2), &HeuristicCounter);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
        }
    }

    #[test]
    fn test_heuristic_counter_monotone() {
        let counter = HeuristicCounter;
        let text = "let abc = 1; let def = 2;";
        let mut prev = 0;
        for (i, _) in text.char_indices().skip(1) {
            let n = counter.count(&text[..i]);
            assert!(n >= prev);
            prev = n;
        }
    }
}
