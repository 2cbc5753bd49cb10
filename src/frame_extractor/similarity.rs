//! 文本相似度

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w\w+\b").expect("valid token regex"));

pub trait TextSimilarity: Send + Sync {
    /// 返回 [0, 1] 区间的相似度
    fn score(&self, a: &str, b: &str) -> f32;
}

/// 两篇文档上拟合的 TF-IDF 余弦相似度
///
/// idf 使用平滑形式 `ln((1 + n) / (1 + df)) + 1`，向量做 L2 归一化。
/// 词元为长度 ≥ 2 的单词，统一小写。
#[derive(Debug, Default, Clone, Copy)]
pub struct TfIdfCosine;

impl TfIdfCosine {
    fn term_counts(text: &str) -> HashMap<String, f64> {
        let lower = text.to_lowercase();
        let mut counts = HashMap::new();
        for token in TOKEN_RE.find_iter(&lower) {
            *counts.entry(token.as_str().to_string()).or_insert(0.0) += 1.0;
        }
        counts
    }

    fn weighted(counts: &HashMap<String, f64>, idf: &HashMap<&str, f64>) -> HashMap<String, f64> {
        let mut vector: HashMap<String, f64> = counts
            .iter()
            .map(|(term, tf)| (term.clone(), tf * idf[term.as_str()]))
            .collect();
        let norm = vector.values().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for v in vector.values_mut() {
                *v /= norm;
            }
        }
        vector
    }
}

impl TextSimilarity for TfIdfCosine {
    fn score(&self, a: &str, b: &str) -> f32 {
        let counts_a = Self::term_counts(a);
        let counts_b = Self::term_counts(b);
        if counts_a.is_empty() || counts_b.is_empty() {
            return 0.0;
        }

        let n_docs = 2.0_f64;
        let mut idf: HashMap<&str, f64> = HashMap::new();
        for term in counts_a.keys().chain(counts_b.keys()) {
            if idf.contains_key(term.as_str()) {
                continue;
            }
            let df = counts_a.contains_key(term) as u8 as f64 + counts_b.contains_key(term) as u8 as f64;
            idf.insert(term.as_str(), ((1.0 + n_docs) / (1.0 + df)).ln() + 1.0);
        }

        let va = Self::weighted(&counts_a, &idf);
        let vb = Self::weighted(&counts_b, &idf);

        let dot: f64 = va
            .iter()
            .filter_map(|(term, wa)| vb.get(term).map(|wb| wa * wb))
            .sum();

        dot.clamp(0.0, 1.0) as f32
    }
}
