use std::fs;
use std::path::Path;
use std::error::Error;
use plotly::{
    Plot, Layout, Scatter, HeatMap, Bar,
    common::{
        Title, Font, Marker, Mode,
        ColorScale, ColorScalePalette,
        Orientation, DashType, TextPosition
    },
    layout::{
        Axis, Margin, HoverMode,
        Shape, ShapeType, ShapeLine
    },
    color::NamedColor
};
use serde_json::Value;
use strum_macros::{Display, EnumIter};
use textwrap::wrap;
use crate::analysis::chart_data::*;
use crate::analysis::differential_expression::{ADJ_P_VALUE_THRESHOLD, LOG2FC_THRESHOLD};
use crate::collaborators::enrichment::EnrichmentTerm;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum PlotKind {
    Volcano,
    Heatmap,
    MaPlot,
    Enrichment,
}

fn wrap_text(
    text: &str,
    width: usize
) -> String {
    wrap(text, width).join("<br>")
}

fn styled_axis(title: &str) -> Axis {
    Axis::new()
        .title(Title::with_text(title).font(Font::new().size(12)))
        .tick_font(Font::new().size(10))
        .show_line(true)
        .line_color(NamedColor::Black)
        .show_grid(true)
        .grid_color("rgba(0,0,0,0.05)")
        .auto_margin(true)
}

fn dashed_line(color: NamedColor) -> ShapeLine {
    ShapeLine::new()
        .color(color)
        .dash(DashType::Dash)
}

fn horizontal_rule(y: f64, color: NamedColor) -> Shape {
    Shape::new()
        .shape_type(ShapeType::Line)
        .x_ref("paper")
        .x0(0.0)
        .x1(1.0)
        .y0(y)
        .y1(y)
        .line(dashed_line(color))
}

fn vertical_rule(x: f64, color: NamedColor) -> Shape {
    Shape::new()
        .shape_type(ShapeType::Line)
        .y_ref("paper")
        .x0(x)
        .x1(x)
        .y0(0.0)
        .y1(1.0)
        .line(dashed_line(color))
}

pub fn volcano_plot(data: &VolcanoData) -> Plot {
    let genes: Vec<String> = data.points.iter().map(|point| point.gene.clone()).collect();
    let log2fc: Vec<f64> = data.points.iter().map(|point| point.log2fc).collect();
    let neg_log10_p: Vec<f64> = data.points.iter().map(|point| point.neg_log10_p).collect();
    let colors: Vec<&'static str> = data.points
        .iter()
        .map(|point| point.category.color())
        .collect();

    let scatter_trace = Scatter::new(log2fc, neg_log10_p)
        .mode(Mode::Markers)
        .name("Genes")
        .text_array(genes)
        .marker(Marker::new()
            .color_array(colors)
            .size(8)
            .opacity(0.7))
        .hover_template("<b>%{text}</b><br>log2FC: %{x:.3f}<br>-log10(p): %{y:.3f}<extra></extra>")
        .show_legend(false);

    let mut plot = Plot::new();
    plot.add_trace(scatter_trace);

    let mut layout = Layout::new()
        .title(Title::with_text("Volcano Plot - Differential Expression"))
        .x_axis(styled_axis("log2 Fold Change"))
        .y_axis(styled_axis("-log10(p-value)"))
        .hover_mode(HoverMode::Closest)
        .show_legend(false);
    layout.add_shape(horizontal_rule(-ADJ_P_VALUE_THRESHOLD.log10(), NamedColor::Red));
    layout.add_shape(vertical_rule(LOG2FC_THRESHOLD, NamedColor::Red));
    layout.add_shape(vertical_rule(-LOG2FC_THRESHOLD, NamedColor::Red));
    plot.set_layout(layout);

    plot
}

pub fn heatmap_plot(data: &HeatmapData) -> Plot {
    let heatmap_trace = HeatMap::new(
            data.samples.clone(),
            data.genes.clone(),
            data.values.clone()
        )
        .color_scale(ColorScale::Palette(ColorScalePalette::RdBu))
        .reverse_scale(true)
        .hover_template("<b>%{y}</b><br>Sample: %{x}<br>Expression: %{z:.3f}<extra></extra>");

    let mut plot = Plot::new();
    plot.add_trace(heatmap_trace);

    let layout = Layout::new()
        .title(Title::with_text("Expression Heatmap - Top Significant Genes"))
        .x_axis(styled_axis("Samples"))
        .y_axis(styled_axis("Genes"))
        .height(600);
    plot.set_layout(layout);

    plot
}

pub fn ma_plot(data: &MaPlotData) -> Plot {
    let genes: Vec<String> = data.points.iter().map(|point| point.gene.clone()).collect();
    let mean_expression: Vec<f64> = data.points.iter().map(|point| point.mean_expression).collect();
    let log2fc: Vec<f64> = data.points.iter().map(|point| point.log2fc).collect();
    let colors: Vec<&'static str> = data.points
        .iter()
        .map(|point| point.category.color())
        .collect();

    let scatter_trace = Scatter::new(mean_expression, log2fc)
        .mode(Mode::Markers)
        .name("Genes")
        .text_array(genes)
        .marker(Marker::new()
            .color_array(colors)
            .size(8)
            .opacity(0.7))
        .hover_template("<b>%{text}</b><br>Mean expression: %{x:.3f}<br>log2FC: %{y:.3f}<extra></extra>")
        .show_legend(false);

    let mut plot = Plot::new();
    plot.add_trace(scatter_trace);

    let mut layout = Layout::new()
        .title(Title::with_text("MA Plot - log2FC vs Mean Expression"))
        .x_axis(styled_axis("Mean Expression"))
        .y_axis(styled_axis("log2 Fold Change"))
        .hover_mode(HoverMode::Closest)
        .show_legend(false);
    layout.add_shape(horizontal_rule(0.0, NamedColor::Black));
    plot.set_layout(layout);

    plot
}

pub fn enrichment_color(p_value: f64) -> &'static str {
    if p_value < 0.01 {
        "red"
    } else if p_value < 0.05 {
        "orange"
    } else {
        "blue"
    }
}

pub fn enrichment_bar_plot(terms: &[EnrichmentTerm]) -> Plot {
    let term_names: Vec<String> = terms.iter().map(|term| wrap_text(&term.term, 40)).collect();
    let neg_log10_p: Vec<f64> = terms.iter().map(|term| neg_log10_p_value(term.p_value)).collect();
    let colors: Vec<&'static str> = terms.iter().map(|term| enrichment_color(term.p_value)).collect();
    let labels: Vec<String> = terms.iter().map(|term| format!("p={:.2e}", term.p_value)).collect();

    let bar_trace = Bar::new(neg_log10_p, term_names)
        .orientation(Orientation::Horizontal)
        .marker(Marker::new().color_array(colors))
        .text_array(labels)
        .text_position(TextPosition::Auto)
        .show_legend(false);

    let mut plot = Plot::new();
    plot.add_trace(bar_trace);

    let mut layout = Layout::new()
        .title(Title::with_text("Gene Ontology & Reactome Enrichment"))
        .height(400.max(terms.len() * 25))
        .margin(Margin::new()
            .left(300)
            .right(50)
            .top(50)
            .bottom(50))
        .x_axis(styled_axis("-log10(p-value)"))
        .y_axis(styled_axis("Terms"))
        .show_legend(false);
    layout.add_shape(vertical_rule(-ADJ_P_VALUE_THRESHOLD.log10(), NamedColor::Red));
    plot.set_layout(layout);

    plot
}

/// Plotly figure as a JSON value, ready to embed in an API response.
pub fn figure_json(plot: &Plot) -> Value {
    serde_json::from_str(&plot.to_json()).unwrap_or(Value::Null)
}

pub fn save_plots(
    plots: &[(PlotKind, Plot)],
    plots_dir: &Path,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    fs::create_dir_all(plots_dir)?;
    for (kind, plot) in plots {
        let plot_name_path = plots_dir.join(format!("{}.html", kind));
        plot.write_html(plot_name_path);
    }
    Ok(())
}
