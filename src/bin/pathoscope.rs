use jemallocator::Jemalloc;

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use plotly::Plot;

use PathoScope::parsers::expression_parser::read_expression_matrix;
use PathoScope::analysis::{
    chart_data::*,
    differential_expression::*,
    expression_plots::*,
    write_results::*,
};

#[derive(Parser, Debug)]
#[command(name = "pathoscope", about, version)]
struct CliArgs {
    #[arg(
        short = 'e',
        long = "expression",
        value_name = "CSV",
        help = "Expression matrix in CSV format: one row per gene, one column per sample. The first half of the sample columns are controls, the rest treatment.",
        required = true
    )]
    expression: PathBuf,

    #[arg(
        short = 'd',
        long = "dir",
        value_name = "DIRECTORY",
        help = "Directory to write the differential expression results to.",
        required = true
    )]
    output_dir: PathBuf,

    #[arg(
        long = "plots",
        help = "If specified, also saves volcano, heatmap and MA plots as interactive HTML.",
        default_value_t = false
    )]
    save_plots: bool,
}

fn main() -> ExitCode {
    let cli_args: CliArgs = CliArgs::parse();

    println!("\nReading expression matrix from: {}", cli_args.expression.to_string_lossy());

    let matrix = match read_expression_matrix(&cli_args.expression) {
        Ok(matrix) => matrix,
        Err(e) => {
            eprintln!("\nError reading expression matrix '{}':", cli_args.expression.to_string_lossy());
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    println!(
        "Successfully parsed {} genes across {} samples\n",
        matrix.n_genes(),
        matrix.n_samples()
    );

    let grouping = SampleGrouping::by_position(matrix.n_samples());
    println!(
        "Comparing {} control sample(s) against {} treatment sample(s)\n",
        grouping.control_size(),
        grouping.treatment_size()
    );

    let result = match differential_expression_analysis(&matrix) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("\nError running differential expression analysis:");
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    println!(
        "Found {} significant genes (|log2FC| > {} and adjusted p-value < {})\n",
        result.significant_genes.len(),
        LOG2FC_THRESHOLD,
        ADJ_P_VALUE_THRESHOLD
    );

    println!("Writing results to: {}\n", cli_args.output_dir.to_string_lossy());
    if let Err(e) = write_differential_expression_results(&result, &cli_args.output_dir) {
        eprintln!("Error writing results: {}", e);
        return ExitCode::FAILURE;
    }

    if cli_args.save_plots {
        let plots_dir = cli_args.output_dir.join(PLOTS_DIRNAME);
        println!("Saving plots to: {}\n", plots_dir.to_string_lossy());

        let mut plots: Vec<(PlotKind, Plot)> = vec![
            (PlotKind::Volcano, volcano_plot(&volcano_data(&result))),
            (PlotKind::MaPlot, ma_plot(&ma_plot_data(&result))),
        ];
        let heatmap = heatmap_data(&matrix, &result);
        if heatmap.is_empty() {
            println!("No significant genes, skipping heatmap\n");
        } else {
            plots.push((PlotKind::Heatmap, heatmap_plot(&heatmap)));
        }

        if let Err(e) = save_plots(&plots, &plots_dir) {
            eprintln!("Error saving plots: {}", e);
            return ExitCode::FAILURE;
        }
    }

    println!("Analysis completed successfully!");
    ExitCode::SUCCESS
}
