//! The descriptors shipped in `config/sources.yaml` must compile as-is.

use std::path::{Path, PathBuf};

use roastery_core::{load_sources, Transport};
use roastery_scraper::CompiledSource;

fn sources_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("config")
        .join("sources.yaml")
}

#[test]
fn every_shipped_source_compiles() {
    let sources_file = load_sources(&sources_path()).expect("sources.yaml should load");
    let compiled = CompiledSource::compile_all(&sources_file.sources);
    assert!(compiled.is_ok(), "compile failed: {:?}", compiled.err());

    let compiled = compiled.unwrap();
    assert_eq!(compiled.len(), 10);
    let ids: Vec<&str> = compiled.iter().map(CompiledSource::id).collect();
    assert_eq!(ids, sources_file.ids());
}

#[test]
fn shipped_sources_mix_both_transports() {
    let sources_file = load_sources(&sources_path()).expect("sources.yaml should load");
    let compiled = CompiledSource::compile_all(&sources_file.sources).unwrap();
    for transport in [Transport::Static, Transport::Rendered] {
        assert!(
            compiled.iter().any(|s| s.transport() == transport),
            "no {transport} source shipped"
        );
    }
}
