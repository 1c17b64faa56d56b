use std::fs::{self, File, create_dir_all};
use std::io::{self, BufWriter, Write};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::fmt::Write as FmtWrite;
use strum::IntoEnumIterator;
use crate::analysis::differential_expression::AnalysisResult;
use crate::analysis::expression_plots::PlotKind;

pub const RESULTS_FILENAME: &str = "differential_expression_results.txt";
pub const SIGNIFICANT_GENES_FILENAME: &str = "significant_genes.txt";

const BUFFER_SIZE: usize = 8192 * 32;

pub const PLOTS_DIRNAME: &str = "plots";

fn remove_if_file(path: &Path) -> io::Result<()> {
    if path.is_file() {
        fs::remove_file(path)?;
    }
    Ok(())
}

/// Removes the files a previous run left in `dir_path`. Anything else in the
/// directory is left alone.
pub fn clean_previous_results(dir_path: &Path) -> io::Result<()> {
    remove_if_file(&dir_path.join(RESULTS_FILENAME))?;
    remove_if_file(&dir_path.join(SIGNIFICANT_GENES_FILENAME))?;

    let plots_dir = dir_path.join(PLOTS_DIRNAME);
    for kind in PlotKind::iter() {
        remove_if_file(&plots_dir.join(format!("{}.html", kind)))?;
    }
    Ok(())
}

/// Writes the per-gene table and the significant gene list into
/// `output_dir`, replacing the outputs of an earlier run. Returns the table's path.
pub fn write_differential_expression_results(
    result: &AnalysisResult,
    output_dir: &Path,
) -> Result<PathBuf, Box<dyn Error>> {
    clean_previous_results(output_dir)?;
    create_dir_all(output_dir)?;

    let results_path = output_dir.join(RESULTS_FILENAME);
    let file = File::create(&results_path)?;
    let mut writer = BufWriter::with_capacity(BUFFER_SIZE, file);

    writer.write_all(b"Gene\tlog2 Fold Change\tp-value\tAdjusted p-value\tMean Expression\tSignificant\n")?;

    let mut line_buffer = String::with_capacity(256);
    for gene in result.gene_results() {
        line_buffer.clear();
        write!(
            &mut line_buffer,
            "{}\t{:.3}\t{:.5e}\t{:.5e}\t{:.3}\t{}\n",
            gene.gene,
            gene.log2fc,
            gene.p_value,
            gene.adj_p_value,
            gene.mean_expression,
            if gene.significant { "yes" } else { "no" }
        )?;
        writer.write_all(line_buffer.as_bytes())?;
    }
    writer.flush()?;

    let genes_file = File::create(output_dir.join(SIGNIFICANT_GENES_FILENAME))?;
    let mut genes_writer = BufWriter::new(genes_file);
    for gene in &result.significant_genes {
        writeln!(genes_writer, "{}", gene)?;
    }
    genes_writer.flush()?;

    Ok(results_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::differential_expression::GeneResult;
    use tempfile::tempdir;

    #[test]
    fn writes_table_and_gene_list() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(SIGNIFICANT_GENES_FILENAME), "OLD1\nOLD2\n").unwrap();

        let result = AnalysisResult::from_gene_results(vec![
            GeneResult {
                gene: "TP53".to_string(),
                log2fc: 2.0,
                p_value: 0.001,
                adj_p_value: 0.002,
                significant: true,
                mean_expression: 4.5,
            },
            GeneResult {
                gene: "APOE".to_string(),
                log2fc: 0.0,
                p_value: 1.0,
                adj_p_value: 1.0,
                significant: false,
                mean_expression: 3.0,
            },
        ]);

        let path = write_differential_expression_results(&result, dir.path()).unwrap();
        let table = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Gene\tlog2 Fold Change"));
        assert_eq!(lines[1], "TP53\t2.000\t1.00000e-3\t2.00000e-3\t4.500\tyes");
        assert!(lines[2].ends_with("\tno"));

        let genes = fs::read_to_string(dir.path().join(SIGNIFICANT_GENES_FILENAME)).unwrap();
        assert_eq!(genes, "TP53\n");
    }

    #[test]
    fn unrelated_files_in_output_dir_survive() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("matrix.csv");
        fs::write(&input, "gene,s1,s2\nA,1,2\n").unwrap();
        let nested = dir.path().join("notes");
        fs::create_dir(&nested).unwrap();
        fs::write(nested.join("readme.txt"), "keep").unwrap();

        let plots_dir = dir.path().join(PLOTS_DIRNAME);
        fs::create_dir(&plots_dir).unwrap();
        let old_plot = plots_dir.join("volcano.html");
        fs::write(&old_plot, "<html></html>").unwrap();
        let own_plot = plots_dir.join("custom.html");
        fs::write(&own_plot, "mine").unwrap();

        let result = AnalysisResult::from_gene_results(Vec::new());
        write_differential_expression_results(&result, dir.path()).unwrap();

        assert_eq!(fs::read_to_string(&input).unwrap(), "gene,s1,s2\nA,1,2\n");
        assert_eq!(fs::read_to_string(nested.join("readme.txt")).unwrap(), "keep");
        assert_eq!(fs::read_to_string(&own_plot).unwrap(), "mine");
        assert!(!old_plot.exists());
        assert!(dir.path().join(RESULTS_FILENAME).exists());
    }
}
