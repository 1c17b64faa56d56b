pub mod parsers {
    pub mod expression_parser;
}

pub mod analysis {
    pub mod differential_expression;
    pub mod multiple_testing_correction;
    pub mod chart_data;
    pub mod expression_plots;
    pub mod write_results;
    pub mod disease_report;
}

pub mod collaborators {
    pub mod client;
    pub mod fallback;
    pub mod kegg;
    pub mod enrichment;
    pub mod string_network;
    pub mod explanation;
    pub mod drug_targets;
}

pub mod utils {
    pub mod history;
    pub mod presets;
    pub mod download;
}

pub mod config;

pub mod server {
    pub mod routes;
}
