use crate::collaborators::enrichment::EnrichmentTerm;
use crate::collaborators::string_network::{
    InteractionNetwork, NetworkEdge, NetworkNode, NodeGroup, DEFAULT_INTERACTION,
};

pub const GENERAL_GENES: [&str; 5] = ["TP53", "BRCA1", "APOE", "INS", "TNF"];
pub const GENERAL_PATHWAYS: [&str; 5] = ["hsa00010", "hsa00020", "hsa00030", "hsa00040", "hsa00051"];
pub const FALLBACK_NETWORK_SIZE: usize = 10;
pub const EXPLANATION_UNAVAILABLE: &str = "AI explanation unavailable.";

/// Alternative names mapped to the search term KEGG knows them by.
pub const DISEASE_ALIASES: &[(&str, &str)] = &[
    ("alzheimer's", "alzheimer"),
    ("alzheimer's disease", "alzheimer"),
    ("diabetes mellitus", "diabetes"),
    ("parkinson's", "parkinson"),
    ("parkinson's disease", "parkinson"),
];

// Order matters: lookups fall back to the first key that contains the query.
const DISEASE_GENES: &[(&str, [&str; 10])] = &[
    ("alzheimer", ["APP", "PSEN1", "PSEN2", "APOE", "MAPT", "SNCA", "GRN", "VCP", "CHMP2B", "TARDBP"]),
    ("diabetes", ["INS", "INSR", "GCK", "HNF1A", "HNF4A", "PPARG", "KCNJ11", "ABCC8", "MTTP", "WFS1"]),
    ("cancer", ["TP53", "BRCA1", "BRCA2", "APC", "KRAS", "PIK3CA", "PTEN", "CDKN2A", "RB1", "MYC"]),
    ("breast cancer", ["BRCA1", "BRCA2", "TP53", "PTEN", "CDH1", "STK11", "PALB2", "CHEK2", "ATM", "BARD1"]),
    ("lung cancer", ["EGFR", "KRAS", "ALK", "ROS1", "BRAF", "MET", "RET", "TP53", "CDKN2A", "PTEN"]),
    ("parkinson", ["SNCA", "LRRK2", "PARK2", "PINK1", "DJ1", "ATP13A2", "VPS35", "EIF4G1", "DNAJC6", "SYNJ1"]),
    ("hypertension", ["ACE", "AGT", "AGTR1", "CYP11B2", "ADD1", "GNB3", "NOS3", "EDN1", "EDNRA", "EDNRB"]),
    ("asthma", ["IL13", "IL4", "IL5", "TNF", "ADAM33", "GSDMB", "ORMDL3", "CHI3L1", "HLA-DQB1", "IL33"]),
    ("arthritis", ["TNF", "IL1B", "IL6", "IL17A", "IL23R", "PTPN22", "CTLA4", "STAT4", "TRAF1", "CD40"]),
    ("obesity", ["LEP", "LEPR", "MC4R", "POMC", "FTO", "TMEM18", "GNPDA2", "SH2B1", "MTCH2", "NEGR1"]),
    ("depression", ["SLC6A4", "COMT", "MAOA", "BDNF", "HTR2A", "DRD2", "DRD4", "TPH2", "GABRA2", "CRHR1"]),
    ("schizophrenia", ["DISC1", "COMT", "DRD2", "HTR2A", "BDNF", "NRG1", "DTNBP1", "DAOA", "G72", "CHRNA7"]),
    ("autism", ["SHANK3", "CHD8", "ADNP", "ARID1B", "DYRK1A", "GRIN2B", "MECP2", "FOXP1", "FOXP2", "CNTNAP2"]),
    ("epilepsy", ["SCN1A", "SCN2A", "KCNQ2", "KCNQ3", "GABRA1", "GABRG2", "CHRNA4", "CHRNB2", "LGI1", "DEPDC5"]),
];

const NEUROTRANSMISSION_PATHWAYS: [&str; 5] = ["hsa04726", "hsa04727", "hsa04728", "hsa04729", "hsa04730"];

const DISEASE_PATHWAYS: &[(&str, [&str; 5])] = &[
    ("alzheimer", ["hsa05010", "hsa05012", "hsa05014", "hsa05016", "hsa05020"]),
    ("diabetes", ["hsa04910", "hsa04930", "hsa04931", "hsa04932", "hsa04940"]),
    ("cancer", ["hsa05200", "hsa05202", "hsa05203", "hsa05204", "hsa05205"]),
    ("breast cancer", ["hsa05224", "hsa05215", "hsa05216", "hsa05217", "hsa05218"]),
    ("lung cancer", ["hsa05223", "hsa05215", "hsa05216", "hsa05217", "hsa05218"]),
    ("parkinson", ["hsa05012", "hsa05014", "hsa05016", "hsa05020", "hsa05022"]),
    ("hypertension", ["hsa04924", "hsa04925", "hsa04926", "hsa04927", "hsa04928"]),
    ("asthma", ["hsa05310", "hsa05320", "hsa05321", "hsa05322", "hsa05323"]),
    ("arthritis", ["hsa05323", "hsa05322", "hsa05321", "hsa05320", "hsa05310"]),
    ("obesity", ["hsa04931", "hsa04932", "hsa04933", "hsa04934", "hsa04935"]),
    ("depression", NEUROTRANSMISSION_PATHWAYS),
    ("schizophrenia", NEUROTRANSMISSION_PATHWAYS),
    ("autism", NEUROTRANSMISSION_PATHWAYS),
    ("epilepsy", NEUROTRANSMISSION_PATHWAYS),
];

const ENRICHMENT_TERMS: [(&str, f64); 15] = [
    ("GO:0006915~apoptotic process", 0.001),
    ("GO:0007165~signal transduction", 0.005),
    ("GO:0006954~inflammatory response", 0.01),
    ("GO:0006468~protein phosphorylation", 0.015),
    ("GO:0006355~regulation of transcription", 0.02),
    ("Reactome:R-HSA-73857~RNA Polymerase II Transcription", 0.025),
    ("Reactome:R-HSA-74160~Gene expression", 0.03),
    ("Reactome:R-HSA-109581~Apoptosis", 0.035),
    ("Reactome:R-HSA-168256~Immune System", 0.04),
    ("Reactome:R-HSA-162582~Signal Transduction", 0.045),
    ("GO:0007049~cell cycle", 0.05),
    ("GO:0008283~cell proliferation", 0.055),
    ("GO:0007155~cell adhesion", 0.06),
    ("GO:0006952~defense response", 0.065),
    ("GO:0006810~transport", 0.07),
];

/// Finds the table entry for a disease name.
///
/// The longest key contained in the name wins ("breast cancer screening"
/// resolves to "breast cancer", not "cancer"). Otherwise the first key that
/// contains the name is used ("alz" resolves to "alzheimer").
pub fn lookup_disease<'a, V>(
    table: &'a [(&'static str, V)],
    disease: &str,
) -> Option<(&'static str, &'a V)> {
    let disease = disease.trim().to_lowercase();
    if disease.is_empty() {
        return None;
    }

    table
        .iter()
        .filter(|(key, _)| disease.contains(key))
        .fold(None, |best: Option<&(&'static str, V)>, entry| match best {
            Some(current) if current.0.len() >= entry.0.len() => Some(current),
            _ => Some(entry),
        })
        .or_else(|| table.iter().find(|(key, _)| key.contains(disease.as_str())))
        .map(|(key, value)| (*key, value))
}

pub fn canonical_disease_name(disease: &str) -> Option<&'static str> {
    let disease = disease.trim().to_lowercase();
    DISEASE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == disease)
        .map(|(_, canonical)| *canonical)
}

pub fn fallback_genes(disease: &str, max_genes: usize) -> Vec<String> {
    let genes: &[&str] = match lookup_disease(DISEASE_GENES, disease) {
        Some((_, genes)) => genes,
        None => &GENERAL_GENES,
    };
    genes.iter().take(max_genes).map(|gene| gene.to_string()).collect()
}

pub fn fallback_pathways(disease: Option<&str>, max_paths: usize) -> Vec<String> {
    let pathways: &[&str] = match disease.and_then(|name| lookup_disease(DISEASE_PATHWAYS, name)) {
        Some((_, pathways)) => pathways,
        None => &GENERAL_PATHWAYS,
    };
    pathways.iter().take(max_paths).map(|pathway| pathway.to_string()).collect()
}

pub fn fallback_enrichment(max_terms: usize) -> Vec<EnrichmentTerm> {
    ENRICHMENT_TERMS
        .iter()
        .take(max_terms)
        .map(|&(term, p_value)| EnrichmentTerm {
            term: term.to_string(),
            p_value,
        })
        .collect()
}

/// Chain network over the first query genes, with rising mock weights.
pub fn fallback_network(genes: &[String]) -> InteractionNetwork {
    let nodes: Vec<NetworkNode> = genes
        .iter()
        .take(FALLBACK_NETWORK_SIZE)
        .map(|gene| NetworkNode::new(gene, NodeGroup::Query))
        .collect();

    let edges = nodes
        .windows(2)
        .enumerate()
        .map(|(i, pair)| NetworkEdge {
            source: pair[0].id.clone(),
            target: pair[1].id.clone(),
            weight: 500.0 + 50.0 * i as f64,
            interaction: DEFAULT_INTERACTION.to_string(),
        })
        .collect();

    InteractionNetwork {
        nodes,
        edges,
        network_url: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_contained_key_wins() {
        assert_eq!(lookup_disease(DISEASE_GENES, "Breast Cancer").map(|(key, _)| key), Some("breast cancer"));
        assert_eq!(lookup_disease(DISEASE_GENES, "colon cancer").map(|(key, _)| key), Some("cancer"));
        assert_eq!(lookup_disease(DISEASE_GENES, "Rheumatoid Arthritis").map(|(key, _)| key), Some("arthritis"));
        assert_eq!(lookup_disease(DISEASE_GENES, "Alzheimer's disease").map(|(key, _)| key), Some("alzheimer"));
    }

    #[test]
    fn partial_names_resolve_to_first_containing_key() {
        assert_eq!(lookup_disease(DISEASE_GENES, "park").map(|(key, _)| key), Some("parkinson"));
        assert!(lookup_disease(DISEASE_GENES, "").is_none());
        assert!(lookup_disease(DISEASE_GENES, "scurvy").is_none());
    }

    #[test]
    fn unknown_diseases_use_general_tables() {
        assert_eq!(fallback_genes("scurvy", 10), vec!["TP53", "BRCA1", "APOE", "INS", "TNF"]);
        assert_eq!(fallback_genes("diabetes", 3), vec!["INS", "INSR", "GCK"]);
        assert_eq!(fallback_pathways(None, 2), vec!["hsa00010", "hsa00020"]);
        assert_eq!(fallback_pathways(Some("Epilepsy"), 1), vec!["hsa04726"]);
    }

    #[test]
    fn enrichment_fallback_is_truncated() {
        assert_eq!(fallback_enrichment(100).len(), 15);
        let terms = fallback_enrichment(2);
        assert_eq!(terms[0].term, "GO:0006915~apoptotic process");
        assert_eq!(terms[1].p_value, 0.005);
    }

    #[test]
    fn network_fallback_is_a_weighted_chain() {
        let genes: Vec<String> = (0..12).map(|i| format!("G{}", i)).collect();
        let network = fallback_network(&genes);
        assert_eq!(network.nodes.len(), 10);
        assert_eq!(network.edges.len(), 9);
        assert_eq!(network.edges[0].weight, 500.0);
        assert_eq!(network.edges[8].weight, 900.0);
        assert_eq!(network.edges[3].source, "G3");
        assert_eq!(network.edges[3].target, "G4");
    }

    #[test]
    fn aliases_map_to_search_terms() {
        assert_eq!(canonical_disease_name("Parkinson's Disease"), Some("parkinson"));
        assert_eq!(canonical_disease_name("asthma"), None);
    }
}
