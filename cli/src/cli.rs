//! Command-line surface of the `graphmind` host binary (spec.md §1: "a thin
//! host-process binary ... It is not a network service").
//!
//! Every subcommand loads its input into a fresh, in-memory [`graphmind`]
//! [`graphmind::store::Store`] and runs exactly one pipeline stage (bulk
//! load + SPARQL query, bulk load + reasoning, Datalog evaluation, or a
//! graph-analytics algorithm) before exiting — there is no on-disk
//! persisted store to open across invocations, since spec.md §1 names
//! "durable write-ahead log" and "multi-writer transactions" as Non-goals.

use clap::{Parser, Subcommand, ValueHint};
use std::path::PathBuf;

#[derive(Parser)]
#[command(about, version, name = "graphmind")]
/// graphmind command line toolkit: quad store, SPARQL, Datalog/OWL reasoning and graph analytics
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Convert an RDF file from one format to another (Turtle, N-Triples, N-Quads)
    Convert {
        /// File to convert from
        ///
        /// If no file is given, stdin is read as if it were the input file content.
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        from_file: Option<PathBuf>,
        /// The format of the file to convert from: "turtle", "ntriples" or "nquads"
        ///
        /// By default, the format is guessed from the input file extension.
        #[arg(long, required_unless_present = "from_file")]
        from_format: Option<String>,
        /// File to convert to
        ///
        /// If no file is given, stdout is used.
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        to_file: Option<PathBuf>,
        /// The format of the file to convert to: "turtle", "ntriples" or "nquads"
        ///
        /// By default, the format is guessed from the target file extension.
        #[arg(long, required_unless_present = "to_file")]
        to_format: Option<String>,
        /// Name of the graph to load triples into (Turtle/N-Triples input only)
        #[arg(long, value_hint = ValueHint::Url)]
        graph: Option<String>,
    },
    /// Load RDF file(s) and execute a SPARQL 1.1 query against the resulting store
    Query {
        /// File(s) to load before running the query
        ///
        /// If no file is given, stdin is used; --format must be set in that case.
        #[arg(short, long, num_args = 0.., value_hint = ValueHint::FilePath)]
        file: Vec<PathBuf>,
        /// The format of the file(s) to load
        ///
        /// By default, the format is guessed from each file's extension.
        #[arg(long)]
        format: Option<String>,
        /// The SPARQL query to execute
        ///
        /// If neither --query nor --query-file is given, stdin is used.
        #[arg(short, long, conflicts_with = "query_file")]
        query: Option<String>,
        /// File in which the query is stored
        #[arg(long, conflicts_with = "query", value_hint = ValueHint::FilePath)]
        query_file: Option<PathBuf>,
        /// Results format for SELECT ("text" or "json"); ignored for ASK/CONSTRUCT/DESCRIBE
        #[arg(long, default_value = "text")]
        results_format: String,
        /// Hard cap on the number of solution rows
        #[arg(long)]
        max_rows: Option<usize>,
        /// Max BFS depth for `p*`/`p+` property paths
        #[arg(long)]
        path_depth_limit: Option<usize>,
        /// Disable the worst-case-optimal join planner for star/chain BGPs
        #[arg(long)]
        no_wcoj: bool,
    },
    /// Load RDF file(s), lift OWL/RDFS rules, run the Datalog fixpoint, and print derivations
    Reason {
        /// File(s) to load as observations before reasoning
        #[arg(short, long, num_args = 0.., value_hint = ValueHint::FilePath)]
        file: Vec<PathBuf>,
        /// The format of the file(s) to load
        #[arg(long)]
        format: Option<String>,
        /// Also print the full `ThinkingGraph` (nodes + derivation chain) as JSON
        #[arg(long)]
        print_thinking_graph: bool,
    },
    /// Evaluate a Datalog program given as JSON facts and rules
    Datalog {
        /// File containing a JSON array of facts: [{"predicate": ..., "terms": [...]}]
        #[arg(long, value_hint = ValueHint::FilePath)]
        facts_file: PathBuf,
        /// File containing a JSON array of rules: [{"head": Fact, "body": [Fact, ...]}]
        #[arg(long, value_hint = ValueHint::FilePath)]
        rules_file: PathBuf,
        /// Only print facts for this predicate; by default every derived and base fact is printed
        #[arg(long)]
        predicate: Option<String>,
    },
    /// Run a graph analytics algorithm over a GraphFrame JSON description
    Analyze {
        /// File containing `{"vertices": [...], "edges": [...]}`
        #[arg(long, value_hint = ValueHint::FilePath)]
        graph_file: PathBuf,
        #[command(subcommand)]
        algorithm: AnalyzeAlgorithm,
    },
}

#[derive(Subcommand)]
pub enum AnalyzeAlgorithm {
    /// Power-iteration PageRank
    PageRank {
        #[arg(long, default_value_t = 0.85)]
        damping: f64,
        #[arg(long, default_value_t = 100)]
        max_iter: usize,
    },
    /// Weakly connected components over the undirected view
    ConnectedComponents,
    /// BFS hop-count shortest paths from a set of landmark vertices
    ShortestPaths {
        /// Landmark vertex ids to BFS from
        #[arg(required = true)]
        landmarks: Vec<String>,
    },
    /// Total count of undirected triangles
    TriangleCount,
    /// Synchronous label propagation community detection
    LabelPropagation {
        #[arg(long, default_value_t = 100)]
        max_iter: usize,
    },
    /// Subgraph-isomorphism motif search, e.g. "(x)-[e]->(y); (y)-[e2]->(z)"
    Motif {
        pattern: String,
    },
}
