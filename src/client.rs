use crate::graph::VertexId;

#[derive(Clone, Debug, PartialEq)]
pub struct CommandLineConfig {
    pub graph: Option<String>,
    pub database: Option<String>,
    pub command: String,
    pub config: Option<String>,
    pub max_hops: Option<usize>,
    pub time_limit: Option<f64>,
    pub min_cluster_size: Option<usize>,
    pub affected: Vec<VertexId>,
    pub injective: bool,
    pub workers: usize,
    pub query_args: Vec<String>,
}

impl CommandLineConfig {
    pub fn from_args(args: &[&str]) -> Result<Self, String> {
        let mut config = Self {
            graph: None,
            database: None,
            command: String::from("info"),
            config: None,
            max_hops: None,
            time_limit: None,
            min_cluster_size: None,
            affected: Vec::new(),
            injective: false,
            workers: 1,
            query_args: Vec::new(),
        };
        let mut iter = args.iter().skip(1);
        while let Some(arg) = iter.next() {
            match *arg {
                "--" => {
                    config.query_args = iter.by_ref().map(|a| a.to_string()).collect();
                }
                "--graph" => config.graph = Some(value(&mut iter, "--graph")?.to_string()),
                "--db" | "--database" => {
                    config.database = Some(value(&mut iter, "--db")?.to_string())
                }
                "--command" => config.command = value(&mut iter, "--command")?.to_string(),
                "--config" => config.config = Some(value(&mut iter, "--config")?.to_string()),
                "--max-hops" => config.max_hops = Some(number(&mut iter, "--max-hops")?),
                "--time-limit" => config.time_limit = Some(number(&mut iter, "--time-limit")?),
                "--min-cluster" => {
                    config.min_cluster_size = Some(number(&mut iter, "--min-cluster")?)
                }
                "--workers" => config.workers = number(&mut iter, "--workers")?,
                "--affected" => {
                    config.affected = value(&mut iter, "--affected")?
                        .split(',')
                        .filter(|s| !s.is_empty())
                        .map(|s| {
                            s.trim()
                                .parse::<VertexId>()
                                .map_err(|_| format!("invalid vertex id '{s}' in --affected"))
                        })
                        .collect::<Result<_, _>>()?;
                }
                "--injective" => config.injective = true,
                other if other.starts_with('-') => {
                    return Err(format!("unknown flag {other}"));
                }
                other => config.command = other.to_string(),
            }
        }
        if config.workers == 0 {
            return Err("--workers must be positive".to_string());
        }
        if config.graph.is_some() && config.database.is_some() {
            return Err("use either --graph or --db, not both".to_string());
        }
        Ok(config)
    }

    pub fn help() -> &'static str {
        "Usage: graymatch [--graph FILE.json | --db FILE.sqlite] [--command info|match|scope|run]\n\
         \x20      [--config RUN.json] [--max-hops N] [--time-limit SECS] [--min-cluster N]\n\
         \x20      [--affected 1,2,3] [--injective] [--workers N] [-- QUERY ARGS...]\n"
    }
}

fn value<'a: 'b, 'b>(
    iter: &mut impl Iterator<Item = &'b &'a str>,
    flag: &str,
) -> Result<&'a str, String> {
    iter.next()
        .copied()
        .ok_or_else(|| format!("{flag} requires a value"))
}

fn number<'a: 'b, 'b, T: std::str::FromStr>(
    iter: &mut impl Iterator<Item = &'b &'a str>,
    flag: &str,
) -> Result<T, String> {
    let raw = value(iter, flag)?;
    raw.parse()
        .map_err(|_| format!("{flag} expects a number, got '{raw}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags_and_trailing_query() {
        let config = CommandLineConfig::from_args(&[
            "graymatch",
            "--graph",
            "g.json",
            "--command",
            "match",
            "--max-hops",
            "3",
            "--affected",
            "1,2",
            "--",
            "--vertex",
            "a",
        ])
        .unwrap();
        assert_eq!(config.graph.as_deref(), Some("g.json"));
        assert_eq!(config.command, "match");
        assert_eq!(config.max_hops, Some(3));
        assert_eq!(config.affected, vec![1, 2]);
        assert_eq!(config.query_args, vec!["--vertex", "a"]);
    }

    #[test]
    fn rejects_unknown_flags_and_bad_numbers() {
        assert!(CommandLineConfig::from_args(&["graymatch", "--bogus"]).is_err());
        assert!(CommandLineConfig::from_args(&["graymatch", "--max-hops", "x"]).is_err());
        assert!(CommandLineConfig::from_args(&["graymatch", "--graph"]).is_err());
    }
}
