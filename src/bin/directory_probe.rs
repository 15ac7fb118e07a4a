//! Directory probe: run one search against the configured directory
//! service and print the normalized candidates.
//!
//! Standalone operator tool for checking connectivity and eyeballing
//! what the normalizer makes of a deployment's records.
//!
//! Usage: `directory_probe <query> [scope]` where scope is one of
//! internal/external/verified/all (default all). Reads
//! `~/.partybook/config.json` for the base URL and token.

use std::sync::Arc;

use partybook::config::load_config;
use partybook::directory::http::HttpDirectoryService;
use partybook::directory::{
    DirectoryService, EntityKind, SearchOptions, SearchScope, SearchStrategy,
};

fn parse_scope(arg: Option<&str>) -> SearchScope {
    match arg {
        Some("internal") => SearchScope::Internal,
        Some("external") => SearchScope::External,
        Some("verified") => SearchScope::Verified,
        _ => SearchScope::All,
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let Some(query) = args.next() else {
        eprintln!("usage: directory_probe <query> [internal|external|verified|all]");
        std::process::exit(2);
    };
    let scope = parse_scope(args.next().as_deref());

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("config error: {}", e);
            std::process::exit(1);
        }
    };

    let directory =
        match HttpDirectoryService::new(&config.directory_base_url, config.api_token.clone()) {
            Ok(service) => Arc::new(service),
            Err(e) => {
                eprintln!("directory client error: {}", e);
                std::process::exit(1);
            }
        };

    let options = SearchOptions {
        scope,
        entity_kind: EntityKind::Any,
        strategy: SearchStrategy::Name,
        limit: config.search_limit,
    };

    log::info!(
        "Probe: searching {:?} (scope={})",
        query,
        scope.as_str()
    );

    match directory.search_candidates(&query, &options).await {
        Ok(candidates) => {
            if candidates.is_empty() {
                println!("no candidates for {:?}", query);
                return;
            }
            for candidate in &candidates {
                println!(
                    "{:10} {:8} {:30} {:15} {}",
                    candidate.id,
                    candidate.source_kind.as_str(),
                    candidate.display_name,
                    candidate.phone,
                    candidate.locality
                );
            }
            println!("{} candidate(s)", candidates.len());
        }
        Err(e) => {
            eprintln!("search failed: {}", e);
            std::process::exit(1);
        }
    }
}
