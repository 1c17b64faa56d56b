pub const DEFAULT_TOP_TARGETS: usize = 5;

/// Mock drug-target prediction: one placeholder drug per leading gene.
pub fn predict_drug_targets(genes: &[String], top_n: usize) -> Vec<String> {
    genes
        .iter()
        .take(top_n)
        .map(|gene| format!("Drug_{}", gene))
        .collect()
}
