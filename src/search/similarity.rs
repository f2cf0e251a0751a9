//! TF-IDF scoring math and the norm byte codec.
//!
//! Norms are stored as one byte per document per field. The byte holds a
//! float with a 3-bit mantissa and a 5-bit exponent (zero exponent 15), which
//! covers roughly `7e9` down to `2e-9` with about one significant decimal
//! digit of precision.

use std::fmt::Debug;

use lazy_static::lazy_static;

lazy_static! {
    static ref NORM_TABLE: [f32; 256] = {
        let mut table = [0.0f32; 256];
        for (b, slot) in table.iter_mut().enumerate() {
            *slot = byte_to_float(b as u8);
        }
        table
    };
}

const MANTISSA_BITS: u32 = 3;
const ZERO_EXPONENT: i32 = 15;
const FLOAT_ZERO: i32 = (63 - ZERO_EXPONENT) << MANTISSA_BITS;

fn byte_to_float(b: u8) -> f32 {
    if b == 0 {
        return 0.0;
    }
    let mut bits = (b as u32) << (24 - MANTISSA_BITS);
    bits += ((63 - ZERO_EXPONENT) as u32) << 24;
    f32::from_bits(bits)
}

fn float_to_byte(f: f32) -> u8 {
    let bits = f.to_bits() as i32;
    let small = bits >> (24 - MANTISSA_BITS);
    if small <= FLOAT_ZERO {
        return if bits <= 0 { 0 } else { 1 };
    }
    if small >= FLOAT_ZERO + 0x100 {
        return 255;
    }
    (small - FLOAT_ZERO) as u8
}

/// Encode a norm float into a single byte. Precision is lost.
pub fn encode_norm(f: f32) -> u8 {
    float_to_byte(f)
}

/// Decode a norm byte through the precomputed table.
pub fn decode_norm(b: u8) -> f32 {
    NORM_TABLE[b as usize]
}

/// Scoring functions shared by all weights and scorers of a search.
///
/// Every method has the classic TF-IDF default; implementors override the
/// pieces they want to change.
pub trait Similarity: Send + Sync + Debug {
    /// Normalization factor for a field with `num_terms` tokens.
    fn length_norm(&self, _field: &str, num_terms: u32) -> f32 {
        1.0 / (num_terms as f32).sqrt()
    }

    /// Normalization applied to all query weights so scores are comparable across queries.
    fn query_norm(&self, sum_of_squared_weights: f32) -> f32 {
        if sum_of_squared_weights <= 0.0 {
            return 1.0;
        }
        1.0 / sum_of_squared_weights.sqrt()
    }

    /// Score factor for a term occurring `freq` times in a document.
    fn tf(&self, freq: f32) -> f32 {
        freq.sqrt()
    }

    /// Frequency contribution of a sloppy phrase match at edit `distance`.
    fn sloppy_freq(&self, distance: u32) -> f32 {
        1.0 / (distance as f32 + 1.0)
    }

    /// Inverse document frequency.
    fn idf(&self, doc_freq: u64, num_docs: u64) -> f32 {
        if num_docs == 0 {
            return 0.0;
        }
        ((num_docs as f64 / (doc_freq as f64 + 1.0)).ln() + 1.0) as f32
    }

    /// Sum of the idf of each term, used by phrase queries.
    fn idf_phrase(&self, doc_freqs: &[u64], num_docs: u64) -> f32 {
        doc_freqs.iter().map(|&df| self.idf(df, num_docs)).sum()
    }

    /// Fraction of the query clauses a document matched.
    fn coord(&self, overlap: usize, max_overlap: usize) -> f32 {
        if max_overlap == 0 {
            return 0.0;
        }
        overlap as f32 / max_overlap as f32
    }

    /// Encode a norm into a byte.
    fn encode_norm(&self, f: f32) -> u8 {
        encode_norm(f)
    }

    /// Decode a norm byte.
    fn decode_norm(&self, b: u8) -> f32 {
        decode_norm(b)
    }
}

/// The default TF-IDF similarity.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSimilarity;

impl Similarity for DefaultSimilarity {}
