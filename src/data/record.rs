use serde::{Serialize, Deserialize};

/// One directed edge `(source, edge_type, target)`. Edge types are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge(pub usize, pub usize, pub usize);

impl Edge {
    pub fn source(&self) -> usize {
        self.0
    }

    pub fn edge_type(&self) -> usize {
        self.1
    }

    pub fn target(&self) -> usize {
        self.2
    }
}

/// One raw graph sample as stored on disk.
///
/// `targets[task_id][0]` is the regression target for task `task_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphRecord {
    pub graph: Vec<Edge>,
    pub node_features: Vec<Vec<f64>>,
    #[serde(default)]
    pub targets: Vec<Vec<f64>>,
}

impl GraphRecord {
    pub fn num_nodes(&self) -> usize {
        self.node_features.len()
    }

    /// Width of the first node's feature vector.
    pub fn annotation_size(&self) -> usize {
        self.node_features.first().map_or(0, |f| f.len())
    }

    /// Largest vertex index referenced by any edge.
    pub fn max_vertex(&self) -> usize {
        self.graph.iter()
            .map(|e| e.source().max(e.target()))
            .max()
            .unwrap_or(0)
    }

    /// Largest (1-based) edge type used.
    pub fn max_edge_type(&self) -> usize {
        self.graph.iter().map(Edge::edge_type).max().unwrap_or(0)
    }

    pub fn target(&self, task_id: usize) -> Option<f64> {
        self.targets.get(task_id).and_then(|t| t.first()).copied()
    }

    /// Checks internal consistency; the error text names what is wrong.
    pub fn validate(&self) -> Result<(), String> {
        if self.graph.is_empty() {
            return Err("`graph` has no edges".into());
        }
        if self.node_features.is_empty() {
            return Err("`node_features` is empty".into());
        }

        let width = self.annotation_size();
        if let Some(v) = self.node_features.iter().position(|f| f.len() != width) {
            return Err(format!(
                "node {} has {} features, expected {}",
                v,
                self.node_features[v].len(),
                width
            ));
        }

        let n = self.num_nodes();
        for edge in &self.graph {
            if edge.source() >= n || edge.target() >= n {
                return Err(format!(
                    "edge {:?} references a vertex outside 0..{}",
                    (edge.0, edge.1, edge.2),
                    n
                ));
            }
            if edge.edge_type() == 0 {
                return Err(format!("edge {:?} has edge type 0; types are 1-based", (edge.0, edge.1, edge.2)));
            }
        }
        Ok(())
    }
}
