use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;

fn graphmind() -> Command {
    Command::cargo_bin("graphmind").unwrap()
}

#[test]
fn query_runs_select_against_loaded_turtle() {
    let file = assert_fs::NamedTempFile::new("data.ttl").unwrap();
    file.write_str("@prefix : <http://example.com/> .\n:alice :knows :bob .\n").unwrap();

    graphmind()
        .arg("query")
        .arg("--file")
        .arg(file.path())
        .arg("--query")
        .arg("SELECT ?o WHERE { <http://example.com/alice> <http://example.com/knows> ?o }")
        .assert()
        .success()
        .stdout(predicate::str::contains("http://example.com/bob"));
}

#[test]
fn query_ask_prints_boolean() {
    let file = assert_fs::NamedTempFile::new("data.ttl").unwrap();
    file.write_str("@prefix : <http://example.com/> .\n:alice :knows :bob .\n").unwrap();

    graphmind()
        .arg("query")
        .arg("--file")
        .arg(file.path())
        .arg("--query")
        .arg("ASK { <http://example.com/alice> <http://example.com/knows> <http://example.com/bob> }")
        .assert()
        .success()
        .stdout(predicate::str::contains("true"));
}

#[test]
fn convert_turtle_to_ntriples() {
    let from = assert_fs::NamedTempFile::new("data.ttl").unwrap();
    from.write_str("@prefix : <http://example.com/> .\n:alice :knows :bob .\n").unwrap();
    let to = assert_fs::NamedTempFile::new("data.nt").unwrap();

    graphmind()
        .arg("convert")
        .arg("--from-file")
        .arg(from.path())
        .arg("--to-file")
        .arg(to.path())
        .assert()
        .success();

    to.assert(predicate::str::contains("http://example.com/alice"));
}

#[test]
fn reason_derives_symmetric_closure() {
    let file = assert_fs::NamedTempFile::new("data.ttl").unwrap();
    file.write_str(
        "@prefix : <http://example.com/> .\n\
         @prefix owl: <http://www.w3.org/2002/07/owl#> .\n\
         :siblingOf a owl:SymmetricProperty .\n\
         :alice :siblingOf :bob .\n",
    )
    .unwrap();

    graphmind()
        .arg("reason")
        .arg("--file")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("fact(s)"));
}

#[test]
fn analyze_triangle_count_on_a_triangle() {
    let graph = assert_fs::NamedTempFile::new("graph.json").unwrap();
    graph
        .write_str(
            r#"{"vertices":[{"id":"a"},{"id":"b"},{"id":"c"}],
                "edges":[{"src":"a","dst":"b"},{"src":"b","dst":"c"},{"src":"c","dst":"a"}]}"#,
        )
        .unwrap();

    graphmind()
        .arg("analyze")
        .arg("--graph-file")
        .arg(graph.path())
        .arg("triangle-count")
        .assert()
        .success()
        .stdout(predicate::str::contains("1"));
}

#[test]
fn datalog_derives_transitive_path() {
    let facts = assert_fs::NamedTempFile::new("facts.json").unwrap();
    facts.write_str(r#"[{"predicate":"edge","terms":["a","b"]},{"predicate":"edge","terms":["b","c"]}]"#).unwrap();
    let rules = assert_fs::NamedTempFile::new("rules.json").unwrap();
    rules
        .write_str(
            r#"[{"head":{"predicate":"path","terms":["?X","?Y"]},"body":[{"predicate":"edge","terms":["?X","?Y"]}]},
                {"head":{"predicate":"path","terms":["?X","?Z"]},"body":[{"predicate":"edge","terms":["?X","?Y"]},{"predicate":"path","terms":["?Y","?Z"]}]}]"#,
        )
        .unwrap();

    graphmind()
        .arg("datalog")
        .arg("--facts-file")
        .arg(facts.path())
        .arg("--rules-file")
        .arg(rules.path())
        .arg("--predicate")
        .arg("path")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"a\""))
        .stdout(predicate::str::contains("\"c\""));
}

#[test]
fn query_rejects_unreadable_file() {
    graphmind()
        .arg("query")
        .arg("--file")
        .arg("does-not-exist.ttl")
        .arg("--query")
        .arg("SELECT * WHERE { ?s ?p ?o }")
        .assert()
        .failure();
}
