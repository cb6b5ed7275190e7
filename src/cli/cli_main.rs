//! # CLI Module
//!
//! ## Aim
//! Flag-pair command line session. A single invocation assembles a catalog
//! (built-in laws, a saved library file, remote SBO queries, in any
//! combination), optionally saves it, and optionally annotates a model
//! document with it.
//!
//! Flags, processed in this order:
//! - `-initialise <file>` register the built-in laws and save them to `<file>`
//! - `-load <file>`       append a saved catalog file
//! - `-query <ids>`       fetch comma-separated SBO ids from the webservice
//! - `-save <file>`       save the assembled catalog
//! - `-map <model>`       annotate the model document
//! - `-out <file>`        where the annotated model goes (default: stdout)
//! - `-test`              run the built-in demonstration session

use crate::Annotator::annotate::{AnnotationReport, annotate_model};
use crate::Annotator::model_document::ModelDocument;
use crate::Annotator::sbo_client::{SboRest, query_terms};
use crate::Matcher::catalog::{RateLawCatalog, builtin_laws};
use crate::Matcher::permutation_matcher::MatcherConfig;
use log::{error, info, warn};
use prettytable::{Table, row};

pub fn run_cli() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    std::process::exit(execute(&args));
}

#[derive(Debug, Default, PartialEq)]
struct CliOptions {
    initialise: Option<String>,
    load: Option<String>,
    query: Option<String>,
    save: Option<String>,
    map: Option<String>,
    out: Option<String>,
    test: bool,
}

fn parse_args(args: &[String]) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut iter = args.iter();
    while let Some(flag) = iter.next() {
        if flag == "-test" {
            options.test = true;
            continue;
        }
        let slot = match flag.as_str() {
            "-initialise" => &mut options.initialise,
            "-load" => &mut options.load,
            "-query" => &mut options.query,
            "-save" => &mut options.save,
            "-map" => &mut options.map,
            "-out" => &mut options.out,
            unknown => return Err(format!("unknown flag '{}'", unknown)),
        };
        let value = iter
            .next()
            .cloned()
            .ok_or_else(|| format!("flag '{}' needs a value", flag))?;
        *slot = Some(value);
    }
    if options == CliOptions::default() {
        return Err("no flags given".to_string());
    }
    if options.out.is_some() && options.map.is_none() {
        return Err("-out makes no sense without -map".to_string());
    }
    Ok(options)
}

fn show_usage() {
    println!("\x1b[34m\n SBOMatch: rate-law classification and SBO annotation of model documents\n\x1b[0m");
    println!("\x1b[33m  -initialise <file>   write the built-in rate-law library to <file>\x1b[0m");
    println!("\x1b[33m  -load <file>         load a rate-law library file\x1b[0m");
    println!("\x1b[33m  -query <id,id,...>   fetch rate laws for the given SBO ids\x1b[0m");
    println!("\x1b[33m  -save <file>         save the assembled library to <file>\x1b[0m");
    println!("\x1b[33m  -map <model>         annotate the model document (JSON)\x1b[0m");
    println!("\x1b[33m  -out <file>          write the annotated model to <file>\x1b[0m");
    println!("\x1b[33m  -test                run the built-in demonstration\x1b[0m");
}

pub fn execute(args: &[String]) -> i32 {
    let options = match parse_args(args) {
        Ok(options) => options,
        Err(message) => {
            error!("{}", message);
            show_usage();
            return 2;
        }
    };
    if options.test {
        return run_demo();
    }
    match run_session(&options) {
        Ok(()) => 0,
        Err(message) => {
            error!("{}", message);
            1
        }
    }
}

fn run_session(options: &CliOptions) -> Result<(), String> {
    let mut catalog = RateLawCatalog::new();

    if let Some(path) = &options.initialise {
        catalog = builtin_laws();
        catalog
            .save(path)
            .map_err(|e| format!("cannot write library '{}': {}", path, e))?;
        info!("initialised '{}' with {} built-in laws", path, catalog.len());
    }
    if let Some(path) = &options.load {
        let count = catalog
            .load(path)
            .map_err(|e| format!("cannot load library '{}': {}", path, e))?;
        info!("loaded {} laws from '{}'", count, path);
    }
    if let Some(ids) = &options.query {
        let ids = parse_id_list(ids)?;
        let service = SboRest::new();
        let failures = query_terms(&mut catalog, &service, &ids);
        if !failures.is_empty() {
            warn!("{} of {} queried terms were unusable", failures.len(), ids.len());
        }
    }
    if let Some(path) = &options.save {
        catalog
            .save(path)
            .map_err(|e| format!("cannot save library '{}': {}", path, e))?;
        info!("saved {} laws to '{}'", catalog.len(), path);
    }
    if let Some(model_path) = &options.map {
        if catalog.is_empty() {
            info!("no library given, falling back to the built-in laws");
            catalog = builtin_laws();
        }
        let mut model = ModelDocument::read_from_file(model_path)
            .map_err(|e| format!("cannot read model '{}': {}", model_path, e))?;
        let report = annotate_model(&mut model, &catalog, &MatcherConfig::default());
        print_report(&model.id, &report);
        match &options.out {
            Some(out_path) => model
                .write_to_file(out_path)
                .map_err(|e| format!("cannot write model '{}': {}", out_path, e))?,
            None => {
                let text = serde_json::to_string_pretty(&model)
                    .map_err(|e| format!("cannot serialize model: {}", e))?;
                println!("{}", text);
            }
        }
    }
    Ok(())
}

fn parse_id_list(text: &str) -> Result<Vec<u32>, String> {
    text.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.trim_start_matches("SBO:")
                .parse::<u32>()
                .map_err(|_| format!("'{}' is not an SBO id", s))
        })
        .collect()
}

fn print_report(model_id: &str, report: &AnnotationReport) {
    let mut table = Table::new();
    table.add_row(row!["reaction", "result"]);
    for (reaction, sbo_id) in &report.matched {
        table.add_row(row![reaction, format!("SBO:{:07}", sbo_id)]);
    }
    for reaction in &report.unmatched {
        table.add_row(row![reaction, "no matching rate law"]);
    }
    for (reaction, message) in &report.failed {
        table.add_row(row![reaction, format!("failed: {}", message)]);
    }
    println!("\nannotation of model '{}':", model_id);
    table.printstd();
    if report.conflicts > 0 {
        warn!(
            "{} parameter annotations were overwritten by later reactions",
            report.conflicts
        );
    }
}

/// Briggs-Haldane session against the built-in library, no files involved.
fn run_demo() -> i32 {
    let catalog = builtin_laws();
    catalog.pretty_print_catalog();

    let model_json = r#"{
        "id": "demo",
        "compartments": [{"id": "cell", "size": 1.0}],
        "parameters": [{"id": "K1", "value": 0.5}],
        "reactions": [
            {
                "id": "veq",
                "reactants": [{"species": "Sub"}],
                "products": [{"species": "Prod"}],
                "modifiers": [{"species": "Enz"}],
                "kinetic_law": {
                    "formula": "cell * k1 * Enz * Sub / (K1 + Sub)",
                    "parameters": [{"id": "k1", "value": 2.0}]
                }
            }
        ]
    }"#;
    let mut model: ModelDocument = match serde_json::from_str(model_json) {
        Ok(model) => model,
        Err(e) => {
            error!("demo model is broken: {}", e);
            return 1;
        }
    };
    let report = annotate_model(&mut model, &catalog, &MatcherConfig::default());
    print_report(&model.id, &report);
    match serde_json::to_string_pretty(&model) {
        Ok(text) => {
            println!("{}", text);
            0
        }
        Err(e) => {
            error!("cannot serialize demo model: {}", e);
            1
        }
    }
}
