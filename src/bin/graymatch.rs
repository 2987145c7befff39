use std::{env, path::Path, process, time::Duration};

use graymatch::{
    GrayMatchError,
    algo::{nodes_by_degree, weakly_connected_components},
    client::CommandLineConfig,
    config::{MatchConfig, RunConfig, ScopeConfig},
    graph::AttributedGraph,
    incremental::IncrementalRunner,
    io::load_graph,
    matcher::Matcher,
    query::{parse_query_args, parse_query_str},
    rwr::RwrScores,
    scope::get_recompute_nodes,
    storage::GraphStore,
};

fn main() {
    env_logger::init();
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        println!("{}", CommandLineConfig::help());
        return;
    }
    let arg_refs: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
    let config = match CommandLineConfig::from_args(&arg_refs) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("error: {err}");
            process::exit(2);
        }
    };
    if let Err(err) = run_command(&config) {
        eprintln!("command failed: {err}");
        process::exit(1);
    }
}

fn open_graph(config: &CommandLineConfig) -> Result<AttributedGraph, GrayMatchError> {
    match (&config.graph, &config.database) {
        (Some(path), _) => load_graph(Path::new(path)),
        (None, Some(path)) if !Path::new(path).exists() => {
            Err(GrayMatchError::not_found(format!("database {path}")))
        }
        (None, Some(path)) => GraphStore::open(path)?.load_graph(),
        (None, None) => Err(GrayMatchError::invalid_input(
            "a data graph is required (--graph or --db)",
        )),
    }
}

fn match_config(config: &CommandLineConfig) -> MatchConfig {
    let defaults = MatchConfig::default();
    MatchConfig {
        max_hops: config.max_hops.unwrap_or(defaults.max_hops),
        require_injective: config.injective,
        time_limit: config
            .time_limit
            .filter(|secs| *secs > 0.0)
            .map(Duration::from_secs_f64),
        ..defaults
    }
}

fn run_command(config: &CommandLineConfig) -> Result<(), GrayMatchError> {
    match config.command.as_str() {
        "info" => {
            let graph = open_graph(config)?;
            let components = weakly_connected_components(&graph);
            let max_degree = nodes_by_degree(&graph, true)
                .first()
                .map_or(0, |(_, degree)| *degree);
            println!(
                "vertices={} edges={} directed={} components={} max_degree={}",
                graph.vertex_count(),
                graph.edge_count(),
                graph.is_directed(),
                components.len(),
                max_degree
            );
            Ok(())
        }
        "match" => {
            let graph = open_graph(config)?;
            let query = parse_query_args(&config.query_args)?;
            let match_config = match_config(config);
            match_config.validate()?;
            let scores = RwrScores::compute(&graph, match_config.rwr.clone())?;
            let mut matcher = Matcher::new(&graph, &query.pattern, &scores, match_config);
            if let Some(condition) = query.condition {
                matcher = matcher.with_condition(Box::new(condition));
            }
            matcher.run();
            println!("matches={}", matcher.count());
            for result in matcher.results() {
                println!("{}", result.subgraph.structural_signature());
            }
            Ok(())
        }
        "scope" => {
            let graph = open_graph(config)?;
            let scope_config = ScopeConfig {
                min_cluster_size: config
                    .min_cluster_size
                    .unwrap_or(ScopeConfig::default().min_cluster_size),
                ..ScopeConfig::default()
            };
            let scope = get_recompute_nodes(&graph, &config.affected, &scope_config);
            let ids: Vec<String> = scope.iter().map(|v| v.to_string()).collect();
            println!("scope={} [{}]", scope.len(), ids.join(","));
            Ok(())
        }
        "run" => {
            let path = config
                .config
                .as_deref()
                .ok_or_else(|| GrayMatchError::invalid_input("run requires --config"))?;
            let run = RunConfig::load(Path::new(path))?;
            if !run.input_json.exists() {
                return Err(GrayMatchError::not_found(format!(
                    "input graph {}",
                    run.input_json.display()
                )));
            }
            let graph = load_graph(&run.input_json)?;
            let query = parse_query_str(&run.query)?;
            let workers = if config.workers > 1 {
                config.workers
            } else {
                run.num_proc
            };
            let reports = IncrementalRunner::new(&graph, &query.pattern)
                .with_condition(query.condition.as_ref())
                .with_match_config(run.match_config())
                .with_scope_config(run.scope_config())
                .with_workers(workers)
                .with_cache_dir(run.cache_dir.as_deref())
                .run(run.steps)?;
            for report in &reports {
                println!(
                    "step={} added={} scope={} matches={} elapsed_ms={}",
                    report.step,
                    report.added_edges,
                    report.scope_size,
                    report.matches,
                    report.elapsed.as_millis()
                );
            }
            let total: usize = reports.iter().map(|r| r.matches).sum();
            println!("total_matches={total}");
            Ok(())
        }
        other => Err(GrayMatchError::invalid_input(format!(
            "unknown command '{other}'"
        ))),
    }
}
