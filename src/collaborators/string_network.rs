use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use strum_macros::Display;
use crate::collaborators::client::{CollaboratorError, Collaborators};

pub const MAX_QUERY_GENES: usize = 100;
pub const MAX_IMAGE_GENES: usize = 50;
pub const REQUIRED_SCORE: u32 = 400;
pub const NETWORK_TYPE: &str = "physical";
pub const DEFAULT_INTERACTION: &str = "interacts_with";
const SERVICE: &str = "STRING";
const IDENTIFIER_SEPARATOR: &str = "\r";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NodeGroup {
    Query,
    Interaction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkNode {
    pub id: String,
    pub label: String,
    pub group: NodeGroup,
}

impl NetworkNode {
    pub fn new(id: &str, group: NodeGroup) -> Self {
        Self {
            id: id.to_string(),
            label: id.to_string(),
            group,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkEdge {
    pub source: String,
    pub target: String,
    pub weight: f64,
    pub interaction: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionNetwork {
    pub nodes: Vec<NetworkNode>,
    pub edges: Vec<NetworkEdge>,
    pub network_url: Option<String>,
}

impl InteractionNetwork {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkStatistics {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub query_nodes: usize,
    pub interaction_nodes: usize,
    pub average_degree: f64,
    pub density: f64,
    pub min_weight: Option<f64>,
    pub max_weight: Option<f64>,
    pub avg_weight: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NetworkQuality {
    High,
    Medium,
    #[default]
    Low,
}

impl NetworkQuality {
    pub fn from_edge_count(edges: usize) -> Self {
        if edges > 10 {
            NetworkQuality::High
        } else if edges > 5 {
            NetworkQuality::Medium
        } else {
            NetworkQuality::Low
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkReport {
    pub network_stats: NetworkStatistics,
    pub top_interacting_genes: Vec<(String, usize)>,
    pub network_quality: NetworkQuality,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct StringInteraction {
    #[serde(rename = "preferredName_A")]
    preferred_name_a: String,
    #[serde(rename = "preferredName_B")]
    preferred_name_b: String,
    score: f64,
    #[serde(default)]
    interaction: Option<String>,
}

fn network_from_interactions(
    interactions: Vec<StringInteraction>,
    genes: &[String],
) -> InteractionNetwork {
    let query: FxHashSet<&str> = genes.iter().map(String::as_str).collect();
    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut nodes = Vec::new();
    let mut edges = Vec::with_capacity(interactions.len());

    for interaction in interactions {
        for name in [&interaction.preferred_name_a, &interaction.preferred_name_b] {
            if seen.insert(name.clone()) {
                let group = if query.contains(name.as_str()) {
                    NodeGroup::Query
                } else {
                    NodeGroup::Interaction
                };
                nodes.push(NetworkNode::new(name, group));
            }
        }

        edges.push(NetworkEdge {
            source: interaction.preferred_name_a,
            target: interaction.preferred_name_b,
            weight: interaction.score * 1000.0,
            interaction: interaction
                .interaction
                .unwrap_or_else(|| DEFAULT_INTERACTION.to_string()),
        });
    }

    InteractionNetwork {
        nodes,
        edges,
        network_url: None,
    }
}

fn joined_identifiers(genes: &[String], limit: usize) -> String {
    genes
        .iter()
        .take(limit)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(IDENTIFIER_SEPARATOR)
}

/// Query parameters of a `json/network` request. Values are encoded by the
/// HTTP client, so gene ids can never add or override parameters.
pub fn network_query(genes: &[String], species: u32) -> Vec<(&'static str, String)> {
    vec![
        ("identifiers", joined_identifiers(genes, MAX_QUERY_GENES)),
        ("species", species.to_string()),
        ("required_score", REQUIRED_SCORE.to_string()),
        ("network_type", NETWORK_TYPE.to_string()),
        ("add_nodes", "0".to_string()),
    ]
}

/// Static network image for the first `MAX_IMAGE_GENES` genes, `None` when
/// `string_url` is not a valid base URL.
pub fn string_image_url(string_url: &str, genes: &[String], species: u32) -> Option<String> {
    let endpoint = format!("{}/image/network", string_url.trim_end_matches('/'));
    reqwest::Url::parse_with_params(
        &endpoint,
        &[
            ("identifiers", joined_identifiers(genes, MAX_IMAGE_GENES)),
            ("species", species.to_string()),
        ],
    )
    .ok()
    .map(String::from)
}

impl Collaborators {
    pub async fn fetch_interaction_network(
        &self,
        genes: &[String],
    ) -> Result<InteractionNetwork, CollaboratorError> {
        if genes.len() < 2 {
            return Ok(InteractionNetwork::default());
        }

        let url = format!("{}/json/network", self.config.string_url.trim_end_matches('/'));
        let query = network_query(genes, self.config.species);

        let body = self
            .get_text_with_query(SERVICE, &url, &query, self.config.string_timeout)
            .await?;
        let interactions: Vec<StringInteraction> = serde_json::from_str(&body)
            .map_err(|e| CollaboratorError::Malformed {
                service: SERVICE,
                reason: e.to_string(),
            })?;

        let mut network = network_from_interactions(interactions, genes);
        if !network.is_empty() {
            network.network_url = string_image_url(
                &self.config.string_url,
                genes,
                self.config.species,
            );
        }
        Ok(network)
    }
}

pub fn cytoscape_config(network: &InteractionNetwork) -> Value {
    let node_elements = network.nodes.iter().map(|node| {
        json!({
            "data": {
                "id": node.id,
                "label": node.label,
                "group": node.group,
            }
        })
    });
    let edge_elements = network.edges.iter().map(|edge| {
        json!({
            "data": {
                "id": format!("{}_{}", edge.source, edge.target),
                "source": edge.source,
                "target": edge.target,
                "weight": edge.weight,
                "interaction": edge.interaction,
            }
        })
    });
    let elements: Vec<Value> = node_elements.chain(edge_elements).collect();

    json!({
        "elements": elements,
        "style": [
            {
                "selector": "node",
                "style": {
                    "label": "data(label)",
                    "font-size": "12px",
                    "font-weight": "bold",
                    "text-valign": "center",
                    "text-halign": "center",
                    "width": "30px",
                    "height": "30px",
                    "border-width": 2,
                    "border-color": "#333"
                }
            },
            {
                "selector": "node[group=\"query\"]",
                "style": {"background-color": "#ff6b6b", "width": "40px", "height": "40px"}
            },
            {
                "selector": "node[group=\"interaction\"]",
                "style": {"background-color": "#4ecdc4", "width": "25px", "height": "25px"}
            },
            {
                "selector": "edge",
                "style": {
                    "width": "mapData(weight, 0, 1000, 1, 8)",
                    "line-color": "#666",
                    "curve-style": "bezier",
                    "target-arrow-shape": "triangle",
                    "target-arrow-color": "#666"
                }
            }
        ],
        "layout": {
            "name": "cose",
            "animate": true,
            "animationDuration": 1000,
            "nodeDimensionsIncludeLabels": true,
            "fit": true,
            "padding": 50
        }
    })
}

pub fn network_statistics(network: &InteractionNetwork) -> NetworkStatistics {
    let total_nodes = network.nodes.len();
    let total_edges = network.edges.len();
    let query_nodes = network
        .nodes
        .iter()
        .filter(|node| node.group == NodeGroup::Query)
        .count();

    let average_degree = if total_nodes > 0 {
        (2 * total_edges) as f64 / total_nodes as f64
    } else {
        0.0
    };
    let density = if total_nodes > 1 {
        total_edges as f64 / (total_nodes * (total_nodes - 1)) as f64
    } else {
        0.0
    };

    let weights: Vec<f64> = network.edges.iter().map(|edge| edge.weight).collect();
    let (min_weight, max_weight, avg_weight) = if weights.is_empty() {
        (None, None, None)
    } else {
        (
            weights.iter().copied().reduce(f64::min),
            weights.iter().copied().reduce(f64::max),
            Some(weights.iter().sum::<f64>() / weights.len() as f64),
        )
    };

    NetworkStatistics {
        total_nodes,
        total_edges,
        query_nodes,
        interaction_nodes: total_nodes - query_nodes,
        average_degree,
        density,
        min_weight,
        max_weight,
        avg_weight,
    }
}

pub fn network_report(network: &InteractionNetwork, genes: &[String]) -> NetworkReport {
    let network_stats = network_statistics(network);

    let query: FxHashSet<&str> = genes.iter().map(String::as_str).collect();
    let mut counts: FxHashMap<&str, usize> = FxHashMap::default();
    let mut first_seen: Vec<&str> = Vec::new();
    for edge in &network.edges {
        for gene in [edge.source.as_str(), edge.target.as_str()] {
            if query.contains(gene) {
                let count = counts.entry(gene).or_insert_with(|| {
                    first_seen.push(gene);
                    0
                });
                *count += 1;
            }
        }
    }

    let mut top_interacting_genes: Vec<(String, usize)> = first_seen
        .into_iter()
        .map(|gene| (gene.to_string(), counts[gene]))
        .collect();
    top_interacting_genes.sort_by(|a, b| b.1.cmp(&a.1));
    top_interacting_genes.truncate(10);

    let mut recommendations = Vec::new();
    if network_stats.total_edges < 5 {
        recommendations.push("Consider lowering the interaction score threshold".to_string());
    }
    if (network_stats.query_nodes as f64) < genes.len() as f64 * 0.5 {
        recommendations.push("Many query genes not found in network - check gene names".to_string());
    }

    NetworkReport {
        network_quality: NetworkQuality::from_edge_count(network_stats.total_edges),
        network_stats,
        top_interacting_genes,
        recommendations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::client::CollaboratorConfig;
    use crate::collaborators::fallback::fallback_network;

    fn genes(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn builds_deduplicated_nodes_and_scaled_edges() {
        let raw = r#"[
            {"preferredName_A": "TP53", "preferredName_B": "MDM2", "score": 0.999},
            {"preferredName_A": "TP53", "preferredName_B": "BRCA1", "score": 0.75, "interaction": "binds"}
        ]"#;
        let interactions: Vec<StringInteraction> = serde_json::from_str(raw).unwrap();
        let network = network_from_interactions(interactions, &genes(&["TP53", "BRCA1"]));

        let ids: Vec<&str> = network.nodes.iter().map(|node| node.id.as_str()).collect();
        assert_eq!(ids, vec!["TP53", "MDM2", "BRCA1"]);
        assert_eq!(network.nodes[1].group, NodeGroup::Interaction);
        assert_eq!(network.nodes[2].group, NodeGroup::Query);
        assert!((network.edges[0].weight - 999.0).abs() < 1e-9);
        assert_eq!(network.edges[0].interaction, DEFAULT_INTERACTION);
        assert_eq!(network.edges[1].interaction, "binds");
    }

    #[test]
    fn statistics_of_fallback_chain() {
        let network = fallback_network(&genes(&["A", "B", "C", "D"]));
        let stats = network_statistics(&network);

        assert_eq!(stats.total_nodes, 4);
        assert_eq!(stats.total_edges, 3);
        assert_eq!(stats.query_nodes, 4);
        assert_eq!(stats.interaction_nodes, 0);
        assert!((stats.average_degree - 1.5).abs() < 1e-12);
        assert!((stats.density - 0.25).abs() < 1e-12);
        assert_eq!(stats.min_weight, Some(500.0));
        assert_eq!(stats.max_weight, Some(600.0));
        assert_eq!(stats.avg_weight, Some(550.0));
    }

    #[test]
    fn report_ranks_query_genes_by_degree() {
        let query = genes(&["A", "B", "C", "D", "E", "F", "G", "H"]);
        let network = fallback_network(&query[..4]);
        let report = network_report(&network, &query);

        assert_eq!(report.network_quality, NetworkQuality::Low);
        assert_eq!(report.top_interacting_genes[0], ("B".to_string(), 2));
        assert_eq!(report.top_interacting_genes[1], ("C".to_string(), 2));
        assert_eq!(report.top_interacting_genes.len(), 4);
        assert_eq!(report.recommendations.len(), 1);
        assert_eq!(NetworkQuality::from_edge_count(11), NetworkQuality::High);
        assert_eq!(NetworkQuality::from_edge_count(6), NetworkQuality::Medium);
    }

    #[test]
    fn cytoscape_elements_cover_nodes_and_edges() {
        let network = fallback_network(&genes(&["A", "B", "C"]));
        let config = cytoscape_config(&network);
        let elements = config["elements"].as_array().unwrap();

        assert_eq!(elements.len(), 5);
        assert_eq!(elements[0]["data"]["group"], "query");
        assert_eq!(elements[3]["data"]["id"], "A_B");
        assert_eq!(config["layout"]["name"], "cose");
    }

    #[test]
    fn image_url_joins_identifiers() {
        let url = string_image_url("https://string-db.org/api", &genes(&["TP53", "MDM2"]), 9606);
        assert_eq!(
            url.as_deref(),
            Some("https://string-db.org/api/image/network?identifiers=TP53%0DMDM2&species=9606")
        );
        assert_eq!(string_image_url("not a url", &genes(&["TP53"]), 9606), None);
    }

    #[test]
    fn gene_ids_cannot_inject_query_parameters() {
        let query = network_query(&genes(&["TP53", "A&species=10090", "B=1"]), 9606);
        let request = reqwest::Client::new()
            .get("https://string-db.org/api/json/network")
            .query(&query)
            .build()
            .unwrap();

        let pairs: Vec<(String, String)> = request
            .url()
            .query_pairs()
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        assert_eq!(pairs.len(), 5);
        assert_eq!(pairs[0], ("identifiers".to_string(), "TP53\rA&species=10090\rB=1".to_string()));
        assert_eq!(pairs[1], ("species".to_string(), "9606".to_string()));
        assert_eq!(pairs[2], ("required_score".to_string(), "400".to_string()));

        let url = string_image_url("https://string-db.org/api", &genes(&["A&B=1"]), 9606).unwrap();
        assert!(url.contains("identifiers=A%26B%3D1&species=9606"));
    }

    #[tokio::test]
    async fn single_gene_gives_empty_network() {
        let collaborators = Collaborators::new(CollaboratorConfig::with_base_url("http://127.0.0.1:9"));
        let network = collaborators.fetch_interaction_network(&genes(&["TP53"])).await.unwrap();
        assert!(network.is_empty());
    }
}
