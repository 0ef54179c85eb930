//! `graphmind`: a thin host-process binary over the `graphmind` library.
//! Each subcommand builds a fresh in-memory store or program, runs exactly
//! one pipeline stage, and prints its result — there is no persisted store
//! to reopen and no HTTP server.

mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{AnalyzeAlgorithm, Args, Command};
use graphmind::analytics::{self, AnalyticsError, GraphDescription, GraphFrame, PageRankConfig};
use graphmind::cancel::CancellationToken;
use graphmind::datalog::{self, Program};
use graphmind::json as gjson;
use graphmind::model::{GraphName, NamedNode};
use graphmind::parser::{GraphSelector, RdfFormat};
use graphmind::reasoner::Reasoner;
use graphmind::sparql::{self, QueryOptions, QueryResults};
use graphmind::store::Store;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    match args.command {
        Command::Convert { from_file, from_format, to_file, to_format, graph } => {
            convert(from_file, from_format, to_file, to_format, graph)
        }
        Command::Query { file, format, query, query_file, results_format, max_rows, path_depth_limit, no_wcoj } => {
            run_query(file, format, query, query_file, results_format, max_rows, path_depth_limit, no_wcoj)
        }
        Command::Reason { file, format, print_thinking_graph } => reason(file, format, print_thinking_graph),
        Command::Datalog { facts_file, rules_file, predicate } => run_datalog(facts_file, rules_file, predicate),
        Command::Analyze { graph_file, algorithm } => analyze(graph_file, algorithm),
    }
}

/// Guesses an [`RdfFormat`] from a file extension or an explicit `--format`
/// value ("turtle"/"ttl", "ntriples"/"nt", "nquads"/"nq").
fn resolve_format(explicit: Option<&str>, path: Option<&Path>) -> Result<RdfFormat> {
    let token = explicit
        .map(str::to_string)
        .or_else(|| path.and_then(|p| p.extension()).map(|e| e.to_string_lossy().to_string()))
        .context("no format given and none could be guessed from the file extension")?;
    match token.to_ascii_lowercase().as_str() {
        "turtle" | "ttl" => Ok(RdfFormat::Turtle),
        "ntriples" | "nt" => Ok(RdfFormat::NTriples),
        "nquads" | "nq" => Ok(RdfFormat::NQuads),
        other => bail!("unrecognized RDF format {other:?} (expected turtle, ntriples or nquads)"),
    }
}

fn read_input(file: Option<&Path>) -> Result<Vec<u8>> {
    match file {
        Some(path) => fs::read(path).with_context(|| format!("reading {}", path.display())),
        None => {
            let mut buf = Vec::new();
            io::stdin().read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}

fn graph_name_from_arg(graph: Option<&str>) -> Result<GraphName> {
    match graph {
        None => Ok(GraphName::DefaultGraph),
        Some(iri) => Ok(GraphName::NamedNode(NamedNode::new(iri).context("invalid graph IRI")?)),
    }
}

fn load_files(store: &Store, files: &[PathBuf], format: Option<&str>, graph: Option<&str>) -> Result<u64> {
    let target = graph_name_from_arg(graph)?;
    let mut inserted = 0;
    if files.is_empty() {
        let format = resolve_format(format, None)?;
        let text = read_input(None)?;
        inserted += store.load(&text, format, target.as_ref())?;
    } else {
        for file in files {
            let format = resolve_format(format, Some(file))?;
            let text = read_input(Some(file))?;
            inserted += store.load(&text, format, target.as_ref())?;
        }
    }
    Ok(inserted)
}

fn convert(
    from_file: Option<PathBuf>,
    from_format: Option<String>,
    to_file: Option<PathBuf>,
    to_format: Option<String>,
    graph: Option<String>,
) -> Result<()> {
    let from_format = resolve_format(from_format.as_deref(), from_file.as_deref())?;
    let to_format = resolve_format(to_format.as_deref(), to_file.as_deref())?;
    let store = Store::new();
    let target = graph_name_from_arg(graph.as_deref())?;
    let text = read_input(from_file.as_deref())?;
    store.load(&text, from_format, target.as_ref())?;

    let selector = match &target {
        GraphName::DefaultGraph => GraphSelector::Default,
        GraphName::NamedNode(n) => GraphSelector::Named(n.clone()),
        GraphName::BlankNode(_) => GraphSelector::All,
    };
    let bytes = store.export(to_format, &selector)?;
    write_output(to_file.as_deref(), &bytes)
}

fn write_output(file: Option<&Path>, bytes: &[u8]) -> Result<()> {
    match file {
        Some(path) => fs::write(path, bytes).with_context(|| format!("writing {}", path.display())),
        None => {
            io::stdout().write_all(bytes)?;
            Ok(())
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_query(
    files: Vec<PathBuf>,
    format: Option<String>,
    query_text: Option<String>,
    query_file: Option<PathBuf>,
    results_format: String,
    max_rows: Option<usize>,
    path_depth_limit: Option<usize>,
    no_wcoj: bool,
) -> Result<()> {
    let store = Store::new();
    load_files(&store, &files, format.as_deref(), None)?;

    let query_str = match (query_text, query_file) {
        (Some(q), None) => q,
        (None, Some(path)) => fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?,
        (None, None) => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
        (Some(_), Some(_)) => unreachable!("clap enforces --query and --query-file are exclusive"),
    };

    let options = QueryOptions {
        max_rows,
        path_depth_limit: path_depth_limit.or(QueryOptions::default().path_depth_limit),
        enable_wcoj: !no_wcoj,
        ..QueryOptions::default()
    };
    let results = sparql::query(&store, &query_str, &options, CancellationToken::default())?;
    print_query_results(&results, &results_format)
}

fn print_query_results(results: &QueryResults, format: &str) -> Result<()> {
    match results {
        QueryResults::Boolean(b) => println!("{b}"),
        QueryResults::Solutions { variables, solutions } => match format {
            "json" => {
                let rows: Vec<_> = solutions
                    .iter()
                    .map(|row| {
                        let mut obj = serde_json::Map::new();
                        for (var, term) in row.iter() {
                            obj.insert(var.as_str().to_string(), serde_json::Value::String(term.to_string()));
                        }
                        serde_json::Value::Object(obj)
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            }
            _ => {
                println!("{}", variables.iter().map(|v| v.as_str()).collect::<Vec<_>>().join("\t"));
                for row in solutions {
                    let cells: Vec<String> = variables
                        .iter()
                        .map(|v| row.get(v.as_str()).map(|t| t.to_string()).unwrap_or_default())
                        .collect();
                    println!("{}", cells.join("\t"));
                }
            }
        },
        QueryResults::Graph(quads) => {
            for quad in quads {
                println!("{quad}");
            }
        }
    }
    Ok(())
}

fn reason(files: Vec<PathBuf>, format: Option<String>, print_thinking_graph: bool) -> Result<()> {
    let store = Store::new();
    load_files(&store, &files, format.as_deref(), None)?;

    let mut reasoner = Reasoner::new();
    let ingested = reasoner.load_from_store(&store, "cli", "cli-session");
    tracing::info!(ingested, "observations loaded into reasoner");
    let summary = reasoner.deduce(CancellationToken::default())?;
    println!(
        "{} rule(s) fired over {} iteration(s), deriving {} new fact(s)",
        summary.rules_fired, summary.iterations, summary.derived_facts
    );
    for proof_id in &summary.proofs {
        for step in reasoner.proof_chain(proof_id) {
            println!("  [{}] {} <- {} (premises: {})", step.step, step.conclusion, step.rule, step.premises.join(", "));
        }
    }

    if print_thinking_graph {
        println!("{}", gjson::thinking_graph_to_json(reasoner.get_thinking_graph()).map_err(anyhow::Error::msg)?);
    }
    Ok(())
}

fn run_datalog(facts_file: PathBuf, rules_file: PathBuf, predicate: Option<String>) -> Result<()> {
    let facts_json = fs::read_to_string(&facts_file).with_context(|| format!("reading {}", facts_file.display()))?;
    let rules_json = fs::read_to_string(&rules_file).with_context(|| format!("reading {}", rules_file.display()))?;
    let facts = gjson::parse_facts(&facts_json).map_err(anyhow::Error::msg)?;
    let rules = gjson::parse_rules(&rules_json).map_err(anyhow::Error::msg)?;
    let program = Program { facts, rules };
    let result = datalog::evaluate(&program, &CancellationToken::default())?;

    let facts = match &predicate {
        Some(p) => datalog::query(&result, p),
        None => result.all_facts(),
    };
    println!("{}", gjson::facts_to_json(&facts).map_err(anyhow::Error::msg)?);
    Ok(())
}

fn analyze(graph_file: PathBuf, algorithm: AnalyzeAlgorithm) -> Result<()> {
    let text = fs::read_to_string(&graph_file).with_context(|| format!("reading {}", graph_file.display()))?;
    let description: GraphDescription =
        serde_json::from_str(&text).map_err(|e| AnalyticsError::Json(e.to_string()))?;
    let frame = GraphFrame::build(description)?;
    let cancellation = CancellationToken::default();

    match algorithm {
        AnalyzeAlgorithm::PageRank { damping, max_iter } => {
            let ranks = analytics::page_rank(&frame, PageRankConfig { damping, max_iter }, &cancellation)?;
            print_sorted_map(ranks.into_iter().map(|(id, r)| (id, format!("{r:.6}"))));
        }
        AnalyzeAlgorithm::ConnectedComponents => {
            let components = analytics::connected_components(&frame);
            print_sorted_map(components);
        }
        AnalyzeAlgorithm::ShortestPaths { landmarks } => {
            let paths = analytics::shortest_paths(&frame, &landmarks);
            let mut vertices: Vec<_> = paths.keys().cloned().collect();
            vertices.sort();
            for vertex in vertices {
                for landmark in &landmarks {
                    let hops = paths[&vertex].get(landmark).copied().flatten();
                    let display = hops.map(|h| h.to_string()).unwrap_or_else(|| "unreachable".to_string());
                    println!("{vertex}\t{landmark}\t{display}");
                }
            }
        }
        AnalyzeAlgorithm::TriangleCount => println!("{}", analytics::triangle_count(&frame)),
        AnalyzeAlgorithm::LabelPropagation { max_iter } => {
            let labels = analytics::label_propagation(&frame, max_iter, &cancellation)?;
            print_sorted_map(labels);
        }
        AnalyzeAlgorithm::Motif { pattern } => {
            let matches = analytics::motif_find(&frame, &pattern)?;
            for binding in matches {
                let mut vars: Vec<_> = binding.into_iter().collect();
                vars.sort_by(|a, b| a.0.cmp(&b.0));
                let row: Vec<String> = vars.into_iter().map(|(k, v)| format!("{k}={v}")).collect();
                println!("{}", row.join(" "));
            }
        }
    }
    Ok(())
}

fn print_sorted_map(map: impl IntoIterator<Item = (String, String)>) {
    let mut rows: Vec<(String, String)> = map.into_iter().collect();
    rows.sort_by(|a, b| a.0.cmp(&b.0));
    for (id, value) in rows {
        println!("{id}\t{value}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_format_from_explicit_token() {
        assert!(matches!(resolve_format(Some("ttl"), None).unwrap(), RdfFormat::Turtle));
        assert!(matches!(resolve_format(Some("nq"), None).unwrap(), RdfFormat::NQuads));
        assert!(resolve_format(Some("yaml"), None).is_err());
    }

    #[test]
    fn resolve_format_from_extension() {
        let path = PathBuf::from("data.nt");
        assert!(matches!(resolve_format(None, Some(path.as_path())).unwrap(), RdfFormat::NTriples));
    }

    #[test]
    fn resolve_format_requires_some_hint() {
        assert!(resolve_format(None, None).is_err());
    }
}
