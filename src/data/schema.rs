use serde::{Serialize, Deserialize};

use crate::data::record::GraphRecord;

/// Dataset-wide shape information fixed at model-build time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSchema {
    /// Largest vertex index seen on any edge of any loaded graph.
    pub max_num_vertices: usize,
    /// Forward edge types, doubled when forward and backward are not tied.
    pub num_edge_types: usize,
    /// Per-node feature width, taken from the first loaded graph.
    pub annotation_size: usize,
}

/// Running schema, threaded by value through successive loads.
///
/// Each `observe` returns a new accumulator; loading train then validation
/// keeps the larger vertex count and edge-type count of the two.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchemaAccumulator {
    schema: DatasetSchema,
}

impl SchemaAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(self, records: &[GraphRecord], tie_fwd_bkwd: bool) -> SchemaAccumulator {
        let mut schema = self.schema;

        let mut num_fwd_edge_types = 0;
        for record in records {
            schema.max_num_vertices = schema.max_num_vertices.max(record.max_vertex());
            num_fwd_edge_types = num_fwd_edge_types.max(record.max_edge_type());
        }

        let direction_factor = if tie_fwd_bkwd { 1 } else { 2 };
        schema.num_edge_types = schema.num_edge_types.max(num_fwd_edge_types * direction_factor);

        if schema.annotation_size == 0 {
            schema.annotation_size = records.first().map_or(0, GraphRecord::annotation_size);
        }

        SchemaAccumulator { schema }
    }

    /// Combines two independently accumulated schemas; `self` wins the
    /// annotation size if both have one.
    pub fn merge(self, other: SchemaAccumulator) -> SchemaAccumulator {
        let (a, b) = (self.schema, other.schema);
        SchemaAccumulator {
            schema: DatasetSchema {
                max_num_vertices: a.max_num_vertices.max(b.max_num_vertices),
                num_edge_types: a.num_edge_types.max(b.num_edge_types),
                annotation_size: if a.annotation_size != 0 { a.annotation_size } else { b.annotation_size },
            },
        }
    }

    pub fn schema(&self) -> DatasetSchema {
        self.schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::record::Edge;

    fn graph(edges: Vec<Edge>, width: usize, nodes: usize) -> GraphRecord {
        GraphRecord {
            graph: edges,
            node_features: vec![vec![0.0; width]; nodes],
            targets: vec![],
        }
    }

    #[test]
    fn untied_edge_types_double_the_running_maximum() {
        let split_a = vec![graph(vec![Edge(0, 2, 1)], 4, 2)];
        let split_b = vec![graph(vec![Edge(0, 3, 1), Edge(1, 1, 2)], 4, 3)];

        let acc = SchemaAccumulator::new()
            .observe(&split_a, false)
            .observe(&split_b, false);

        assert_eq!(acc.schema().num_edge_types, 6);
        assert_eq!(acc.schema().max_num_vertices, 2);
    }

    #[test]
    fn smaller_second_split_keeps_larger_schema() {
        let big = vec![graph(vec![Edge(0, 4, 9)], 3, 10)];
        let small = vec![graph(vec![Edge(0, 1, 1)], 3, 2)];

        let acc = SchemaAccumulator::new().observe(&big, true).observe(&small, true);
        assert_eq!(acc.schema().num_edge_types, 4);
        assert_eq!(acc.schema().max_num_vertices, 9);
    }

    #[test]
    fn annotation_size_comes_from_first_graph_of_first_split() {
        let first = vec![graph(vec![Edge(0, 1, 1)], 5, 2)];
        let second = vec![graph(vec![Edge(0, 1, 1)], 8, 2)];

        let acc = SchemaAccumulator::new().observe(&first, true).observe(&second, true);
        assert_eq!(acc.schema().annotation_size, 5);
    }

    #[test]
    fn merge_takes_maxima() {
        let a = SchemaAccumulator::new().observe(&[graph(vec![Edge(0, 2, 3)], 2, 4)], true);
        let b = SchemaAccumulator::new().observe(&[graph(vec![Edge(5, 1, 0)], 7, 6)], true);
        let merged = a.merge(b).schema();
        assert_eq!(merged, DatasetSchema { max_num_vertices: 5, num_edge_types: 2, annotation_size: 2 });
    }
}
