use std::sync::Arc;

use rand::seq::SliceRandom;
use serde_json::{json, Map, Value};

use crate::config::run_config::RunConfig;
use crate::data::record::GraphRecord;
use crate::data::schema::DatasetSchema;
use crate::error::{Error, Result};
use crate::math::matrix::Matrix;
use crate::model::core::{GraphModel, MinibatchIter, NodeRepresentations, NodeStates};
use crate::model::minibatch::Minibatch;
use crate::model::readout::GatedReadout;

const DEFAULT_BATCH_SIZE: usize = 128;

/// Baseline architecture with parameter-free propagation.
///
/// Each step mixes every node with the mean of its typed incoming messages:
///
/// `h_v ← tanh(h_v + (1/deg(v)) Σ_{(u, k, v)} w_k · h_u)`
///
/// with fixed per-type weights `w_k = 1 / (k + 1)`. Edges are followed in
/// both directions; when directions are not tied, the reverse of type `k`
/// becomes type `k + num_edge_types / 2`. All learning happens in the
/// shared gated readout.
#[derive(Debug, Clone)]
pub struct MeanFieldModel {
    hidden_size: usize,
    num_timesteps: usize,
    tie_fwd_bkwd: bool,
    task_id: usize,
    batch_size: usize,
    edge_type_weights: Vec<f64>,
}

/// One processed graph.
#[derive(Debug, Clone, PartialEq)]
pub struct MeanFieldGraph {
    /// `(source, 0-based forward edge type, target)`.
    pub edges: Vec<(usize, usize, usize)>,
    /// Annotations zero-padded to `hidden_size`.
    pub initial: Matrix,
    pub target: f64,
}

/// Graphs of one minibatch, by index into the shared split.
#[derive(Debug, Clone)]
pub struct MeanFieldBatch {
    graphs: Arc<Vec<MeanFieldGraph>>,
    indices: Vec<usize>,
}

impl MeanFieldBatch {
    pub fn graphs(&self) -> impl Iterator<Item = &MeanFieldGraph> {
        self.indices.iter().map(move |&i| &self.graphs[i])
    }
}

impl MeanFieldModel {
    pub fn new(config: &RunConfig) -> Result<Self> {
        let batch_size = config.extra_usize("batch_size")?.unwrap_or(DEFAULT_BATCH_SIZE);
        if batch_size == 0 {
            return Err(Error::Config("batch_size must be at least 1".into()));
        }

        Ok(MeanFieldModel {
            hidden_size: config.hidden_size,
            num_timesteps: config.num_timesteps,
            tie_fwd_bkwd: config.tie_fwd_bkwd,
            task_id: config.task_id,
            batch_size,
            edge_type_weights: Vec::new(),
        })
    }

    pub fn num_edge_types(&self) -> usize {
        self.edge_type_weights.len()
    }

    fn propagate(&self, graph: &MeanFieldGraph) -> Result<Matrix> {
        let n = graph.initial.rows;
        let num_types = self.edge_type_weights.len();
        let num_fwd = if self.tie_fwd_bkwd { num_types } else { num_types / 2 };

        // (source, weight, target) in both directions.
        let mut messages = Vec::with_capacity(graph.edges.len() * 2);
        for &(src, fwd_type, dst) in &graph.edges {
            let bwd_type = if self.tie_fwd_bkwd { fwd_type } else { fwd_type + num_fwd };
            if bwd_type >= num_types {
                return Err(Error::Model(format!(
                    "edge type {} is outside the {} types the model was prepared for",
                    fwd_type + 1,
                    num_fwd
                )));
            }
            messages.push((src, self.edge_type_weights[fwd_type], dst));
            messages.push((dst, self.edge_type_weights[bwd_type], src));
        }

        let mut in_degree = vec![0usize; n];
        for &(_, _, dst) in &messages {
            in_degree[dst] += 1;
        }

        let mut h = graph.initial.clone();
        for _ in 0..self.num_timesteps {
            let mut incoming = Matrix::zeros(n, self.hidden_size);
            for &(src, weight, dst) in &messages {
                let scale = weight / in_degree[dst] as f64;
                for (acc, x) in incoming.data[dst].iter_mut().zip(&h.data[src]) {
                    *acc += scale * x;
                }
            }
            h = (h + incoming).map(f64::tanh);
        }
        Ok(h)
    }
}

impl GraphModel for MeanFieldModel {
    type Dataset = Vec<MeanFieldGraph>;
    type Batch = MeanFieldBatch;

    fn default_params() -> Map<String, Value> {
        match json!({ "batch_size": DEFAULT_BATCH_SIZE }) {
            Value::Object(map) => map,
            _ => unreachable!("json! object literal"),
        }
    }

    fn process_raw_graphs(&self, raw: Vec<GraphRecord>, schema: &DatasetSchema) -> Result<Self::Dataset> {
        if schema.annotation_size > self.hidden_size {
            return Err(Error::Config(format!(
                "hidden_size {} cannot hold {} node features",
                self.hidden_size, schema.annotation_size
            )));
        }

        raw.into_iter()
            .enumerate()
            .map(|(i, record)| {
                let target = record.target(self.task_id).ok_or_else(|| {
                    Error::Model(format!("graph {} has no target for task {}", i, self.task_id))
                })?;

                let mut initial = Matrix::zeros(record.num_nodes(), self.hidden_size);
                for (row, features) in initial.data.iter_mut().zip(&record.node_features) {
                    if features.len() > self.hidden_size {
                        return Err(Error::Config(format!(
                            "graph {} has {} node features, more than hidden_size {}",
                            i, features.len(), self.hidden_size
                        )));
                    }
                    row[..features.len()].copy_from_slice(features);
                }

                let edges = record.graph.iter()
                    .map(|e| (e.source(), e.edge_type() - 1, e.target()))
                    .collect();

                Ok(MeanFieldGraph { edges, initial, target })
            })
            .collect()
    }

    fn prepare_specific_model(&mut self, schema: &DatasetSchema) -> Result<()> {
        if schema.num_edge_types == 0 {
            return Err(Error::Config("dataset has no edge types".into()));
        }
        if schema.annotation_size > self.hidden_size {
            return Err(Error::Config(format!(
                "hidden_size {} cannot hold {} node features",
                self.hidden_size, schema.annotation_size
            )));
        }

        let num_fwd = if self.tie_fwd_bkwd {
            schema.num_edge_types
        } else {
            schema.num_edge_types / 2
        };
        // Reverse directions reuse the weight of their forward type.
        self.edge_type_weights = (0..schema.num_edge_types)
            .map(|k| 1.0 / ((k % num_fwd.max(1)) + 1) as f64)
            .collect();

        log::info!(
            "mean-field model: {} edge types, {} timesteps, hidden size {}",
            schema.num_edge_types, self.num_timesteps, self.hidden_size
        );
        Ok(())
    }

    fn compute_final_node_representations(&self, batch: &Self::Batch) -> Result<NodeRepresentations> {
        let graphs = batch.graphs()
            .map(|g| Ok(NodeStates { initial: g.initial.clone(), last: self.propagate(g)? }))
            .collect::<Result<Vec<_>>>()?;
        Ok(NodeRepresentations { hidden_size: self.hidden_size, graphs })
    }

    fn gated_regression(
        &self,
        representations: &NodeRepresentations,
        readout: &mut GatedReadout,
        dropout_keep_prob: f64,
    ) -> Result<Vec<f64>> {
        readout.forward(representations, dropout_keep_prob)
    }

    fn make_minibatch_iterator(&self, data: Arc<Self::Dataset>, is_training: bool) -> MinibatchIter<Self::Batch> {
        let mut indices: Vec<usize> = (0..data.len()).collect();
        if is_training {
            indices.shuffle(&mut rand::thread_rng());
        }

        let chunks: Vec<Vec<usize>> = indices.chunks(self.batch_size).map(<[usize]>::to_vec).collect();
        Box::new(chunks.into_iter().map(move |indices| {
            let targets = indices.iter().map(|&i| data[i].target).collect();
            Ok(Minibatch::new(targets, MeanFieldBatch { graphs: Arc::clone(&data), indices }))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::record::Edge;
    use crate::data::schema::SchemaAccumulator;

    fn config(extra: Value) -> RunConfig {
        let mut params = RunConfig::default_params();
        params.extend(MeanFieldModel::default_params());
        if let Value::Object(m) = extra {
            params.extend(m);
        }
        RunConfig::from_params(&params).unwrap()
    }

    fn records(n: usize) -> Vec<GraphRecord> {
        (0..n)
            .map(|i| GraphRecord {
                graph: vec![Edge(0, 1, 1), Edge(1, 2, 2)],
                node_features: vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]],
                targets: vec![vec![i as f64]],
            })
            .collect()
    }

    fn prepared(extra: Value, recs: &[GraphRecord]) -> (MeanFieldModel, DatasetSchema) {
        let cfg = config(extra);
        let schema = SchemaAccumulator::new().observe(recs, cfg.tie_fwd_bkwd).schema();
        let mut model = MeanFieldModel::new(&cfg).unwrap();
        model.prepare_specific_model(&schema).unwrap();
        (model, schema)
    }

    #[test]
    fn annotations_are_padded_to_hidden_size() {
        let recs = records(1);
        let (model, schema) = prepared(json!({ "hidden_size": 4 }), &recs);
        let data = model.process_raw_graphs(recs, &schema).unwrap();
        assert_eq!(data[0].initial.data[2], vec![1.0, 1.0, 0.0, 0.0]);
        assert_eq!(data[0].edges[1], (1, 1, 2));
    }

    #[test]
    fn evaluation_batches_keep_dataset_order() {
        let recs = records(5);
        let (model, schema) = prepared(json!({ "hidden_size": 2, "batch_size": 2 }), &recs);
        let data = Arc::new(model.process_raw_graphs(recs, &schema).unwrap());

        let targets: Vec<Vec<f64>> = model.make_minibatch_iterator(data, false)
            .map(|b| b.unwrap().target_values)
            .collect();
        assert_eq!(targets, vec![vec![0.0, 1.0], vec![2.0, 3.0], vec![4.0]]);
    }

    #[test]
    fn training_batches_cover_every_graph_once() {
        let recs = records(7);
        let (model, schema) = prepared(json!({ "hidden_size": 2, "batch_size": 3 }), &recs);
        let data = Arc::new(model.process_raw_graphs(recs, &schema).unwrap());

        let mut seen: Vec<f64> = model.make_minibatch_iterator(data, true)
            .flat_map(|b| b.unwrap().target_values)
            .collect();
        seen.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(seen, (0..7).map(|i| i as f64).collect::<Vec<_>>());
    }

    #[test]
    fn propagation_keeps_shapes_and_bounds() {
        let recs = records(2);
        let (model, schema) = prepared(json!({ "hidden_size": 3, "num_timesteps": 2, "tie_fwd_bkwd": false }), &recs);
        assert_eq!(model.num_edge_types(), 4);

        let data = Arc::new(model.process_raw_graphs(recs, &schema).unwrap());
        let batch = model.make_minibatch_iterator(data, false).next().unwrap().unwrap();
        let reps = model.compute_final_node_representations(&batch.payload).unwrap();

        assert_eq!(reps.graphs.len(), 2);
        let last = &reps.graphs[0].last;
        assert_eq!((last.rows, last.cols), (3, 3));
        assert!(last.data.iter().flatten().all(|x| x.abs() < 1.0));
    }

    #[test]
    fn missing_target_is_rejected() {
        let mut recs = records(1);
        recs[0].targets.clear();
        let (model, schema) = prepared(json!({ "hidden_size": 2 }), &recs);
        assert!(matches!(model.process_raw_graphs(recs, &schema), Err(Error::Model(_))));
    }

    #[test]
    fn features_wider_than_hidden_size_are_rejected() {
        let recs = records(1);
        let cfg = config(json!({ "hidden_size": 1 }));
        let schema = SchemaAccumulator::new().observe(&recs, true).schema();
        let mut model = MeanFieldModel::new(&cfg).unwrap();
        assert!(matches!(model.prepare_specific_model(&schema), Err(Error::Config(_))));
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let cfg = config(json!({ "batch_size": 0 }));
        assert!(MeanFieldModel::new(&cfg).is_err());
    }
}
