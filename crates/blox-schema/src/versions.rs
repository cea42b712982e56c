pub const GRAPH_DOCUMENT_SCHEMA_0_0_1: &str = "blox-graph/0.0.1";
pub const GRAPH_FRAGMENT_SCHEMA_0_0_1: &str = "blox-graph-fragment/0.0.1";
