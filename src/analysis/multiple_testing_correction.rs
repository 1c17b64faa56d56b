use adjustp::{adjust, Procedure};

/// Benjamini-Hochberg adjustment of one analysis run. The output is
/// index-aligned with `p_values`.
pub fn adjust_gene_p_values(p_values: &[f64]) -> Vec<f64> {
    if p_values.is_empty() {
        return Vec::new();
    }

    adjust(p_values, Procedure::BenjaminiHochberg)
        .into_iter()
        .zip(p_values)
        .map(|(adjusted_p, &raw_p)| adjusted_p.max(raw_p).min(1.0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjusted_values_dominate_raw_values() {
        let p_values = vec![0.01, 0.04, 0.03, 0.02, 0.5, 1.0];
        let adjusted = adjust_gene_p_values(&p_values);

        assert_eq!(adjusted.len(), p_values.len());
        for (raw, adj) in p_values.iter().zip(adjusted.iter()) {
            assert!(adj >= raw);
            assert!(*adj <= 1.0);
        }
    }

    #[test]
    fn preserves_input_order() {
        // Hand computed: m = 4, sorted [0.01, 0.02, 0.03, 0.04] -> all 0.04.
        let adjusted = adjust_gene_p_values(&[0.04, 0.01, 0.03, 0.02]);
        for adj in &adjusted {
            assert!((adj - 0.04).abs() < 1e-12);
        }

        let adjusted = adjust_gene_p_values(&[0.5, 0.001, 0.9]);
        assert!((adjusted[1] - 0.003).abs() < 1e-12);
        assert!((adjusted[0] - 0.75).abs() < 1e-12);
        assert!((adjusted[2] - 0.9).abs() < 1e-12);
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert!(adjust_gene_p_values(&[]).is_empty());
    }
}
