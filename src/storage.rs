use std::{collections::BTreeMap, path::Path};

use log::info;
use rusqlite::{Connection, params};

use crate::{
    errors::GrayMatchError,
    graph::{AttributedGraph, EdgeAttrs, EdgeKind, VertexAttrs},
    schema::{ensure_schema, read_meta, write_meta},
};

/// Data graph persisted in SQLite.
pub struct GraphStore {
    conn: Connection,
}

impl GraphStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GrayMatchError> {
        let conn = Connection::open(path)
            .map_err(|e| GrayMatchError::storage(format!("open: {e}")))?;
        ensure_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, GrayMatchError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| GrayMatchError::storage(format!("open: {e}")))?;
        ensure_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Replaces the stored graph in one transaction.
    pub fn save_graph(&mut self, graph: &AttributedGraph) -> Result<(), GrayMatchError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM gm_edges", [])?;
        tx.execute("DELETE FROM gm_vertices", [])?;
        write_meta(&tx, "directed", if graph.is_directed() { "1" } else { "0" })?;
        {
            let mut insert = tx.prepare_cached(
                "INSERT INTO gm_vertices(id, seq, label, props) VALUES(?1, ?2, ?3, ?4)",
            )?;
            for (seq, id) in graph.vertex_ids().iter().enumerate() {
                let attrs = graph.vertex(id).cloned().unwrap_or_default();
                let props = serde_json::to_string(&attrs.props)
                    .map_err(|e| GrayMatchError::serialization(e.to_string()))?;
                insert.execute(params![id, seq as i64, attrs.label, props])?;
            }
            let mut insert = tx.prepare_cached(
                "INSERT INTO gm_edges(src, dst, key, label, kind, added_at)
                 VALUES(?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for (src, dst, attrs) in graph.edges() {
                insert.execute(params![
                    src,
                    dst,
                    attrs.key,
                    attrs.label,
                    kind_name(attrs.kind),
                    attrs.added_at
                ])?;
            }
        }
        tx.commit()?;
        info!(
            "stored graph with {} vertices and {} edges",
            graph.vertex_count(),
            graph.edge_count()
        );
        Ok(())
    }

    pub fn load_graph(&self) -> Result<AttributedGraph, GrayMatchError> {
        let directed = read_meta(&self.conn, "directed")?.as_deref() == Some("1");
        let mut graph = AttributedGraph::new(directed);

        let mut stmt = self
            .conn
            .prepare_cached("SELECT id, label, props FROM gm_vertices ORDER BY seq")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        for row in rows {
            let (id, label, props) = row?;
            let props: BTreeMap<String, String> = serde_json::from_str(&props)
                .map_err(|e| GrayMatchError::serialization(format!("vertex {id}: {e}")))?;
            graph.add_vertex(id, VertexAttrs { label, props });
        }

        let mut stmt = self.conn.prepare_cached(
            "SELECT src, dst, key, label, kind, added_at FROM gm_edges ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Option<i64>>(5)?,
            ))
        })?;
        for row in rows {
            let (src, dst, key, label, kind, added_at) = row?;
            let attrs = EdgeAttrs {
                key,
                label,
                kind: parse_kind(&kind)?,
                added_at,
            };
            graph.add_edge(src, dst, attrs);
        }
        Ok(graph)
    }

    pub fn vertex_count(&self) -> Result<usize, GrayMatchError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM gm_vertices", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn edge_count(&self) -> Result<usize, GrayMatchError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM gm_edges", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn kind_name(kind: EdgeKind) -> &'static str {
    match kind {
        EdgeKind::Direct => "direct",
        EdgeKind::Path => "path",
    }
}

fn parse_kind(name: &str) -> Result<EdgeKind, GrayMatchError> {
    match name {
        "direct" => Ok(EdgeKind::Direct),
        "path" => Ok(EdgeKind::Path),
        other => Err(GrayMatchError::storage(format!("unknown edge kind '{other}'"))),
    }
}
