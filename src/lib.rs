//! Best-effort attributed graph pattern matching guided by random walk with restart.
//!
//! A [`Matcher`] grows partial matches of a small query [`Pattern`] from seed
//! vertices of a data [`AttributedGraph`]. Direct pattern edges are realised by
//! data edges or short bridges, path edges by best-proximity paths from a
//! [`PathExtractor`]. After graph updates [`scope::get_recompute_nodes`] bounds
//! what has to be recomputed.
//!
//! Run Criterion benchmarks with `cargo bench` to inspect reports under `target/criterion`.

pub mod algo;
pub mod bench_utils;
pub mod cache;
pub mod client;
pub mod condition;
pub mod config;
pub mod errors;
pub mod expand;
pub mod extract;
pub mod graph;
pub mod incremental;
pub mod io;
pub mod matcher;
pub mod pattern;
pub mod query;
pub mod rwr;
pub mod schema;
pub mod scope;
pub mod storage;
pub mod subgraph;
pub mod worker;

pub use crate::condition::{Condition, ConditionExpr};
pub use crate::config::{MatchConfig, RunConfig, ScopeConfig};
pub use crate::errors::GrayMatchError;
pub use crate::extract::{ExtractTree, ExtractorCache, PathExtractor};
pub use crate::graph::{AttributedGraph, EdgeAttrs, EdgeKind, VertexAttrs, VertexId};
pub use crate::matcher::{MatchResult, Matcher, NodeMap};
pub use crate::pattern::{Pattern, PatternBuilder};
pub use crate::query::{ParsedQuery, parse_query_args};
pub use crate::rwr::{ProximityOracle, RwrConfig, RwrScores};
pub use crate::scope::{ClusterPartition, get_recompute_nodes};
pub use crate::subgraph::MatchedSubgraph;
