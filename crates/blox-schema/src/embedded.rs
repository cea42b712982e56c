use crate::versions::{GRAPH_DOCUMENT_SCHEMA_0_0_1, GRAPH_FRAGMENT_SCHEMA_0_0_1};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddedSchema {
    pub id: &'static str,
    pub json: &'static str,
}

const GRAPH_DOCUMENT_SCHEMA: &str = include_str!("../schemas/graph-document.schema.json");
const GRAPH_FRAGMENT_SCHEMA: &str = include_str!("../schemas/graph-fragment.schema.json");

pub fn get_json_schema(schema_id: &str) -> Option<EmbeddedSchema> {
    match schema_id {
        GRAPH_DOCUMENT_SCHEMA_0_0_1 => Some(EmbeddedSchema {
            id: GRAPH_DOCUMENT_SCHEMA_0_0_1,
            json: GRAPH_DOCUMENT_SCHEMA,
        }),
        GRAPH_FRAGMENT_SCHEMA_0_0_1 => Some(EmbeddedSchema {
            id: GRAPH_FRAGMENT_SCHEMA_0_0_1,
            json: GRAPH_FRAGMENT_SCHEMA,
        }),
        _ => None,
    }
}

#[cfg(test)]
#[path = "embedded_test.rs"]
mod tests;
