use std::error::Error;

use clap::{arg, command, value_parser};
use sketch_synth::{
    parser::{candidates_from_json, catalog_from_json, hole_from_json, json_from_file},
    Solver, SynthesisConfig,
};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let matches = command!()
        .arg(arg!([catalog] "Path to the type catalog json file").default_value("tests/jdk-catalog.json"))
        .arg(arg!([sketches] "Path to the sketches json file").default_value("tests/readline-query.json"))
        .arg(arg!(--hole <FILE> "Hole parameters json file; defaults to the sketches file"))
        .arg(arg!(--unroll <N> "Loop unroll count").value_parser(value_parser!(usize)))
        .arg(arg!(--"arg-depth" <N> "Deepest nested argument construction").value_parser(value_parser!(usize)))
        .arg(arg!(--"compose-length" <N> "Longest composed method chain").value_parser(value_parser!(usize)))
        .arg(arg!(--"max-sequences" <N> "Bound on derived call sequences").value_parser(value_parser!(usize)))
        .arg(arg!(--"max-length" <N> "Bound on the length of one call sequence").value_parser(value_parser!(usize)))
        .arg(arg!(--seed <SEED> "Seed for the search tie-break").value_parser(value_parser!(u64)))
        .arg(arg!(--deterministic "Try candidates in catalog order"))
        .get_matches();

    let mut config = SynthesisConfig::default();
    if let Some(n) = matches.get_one::<usize>("unroll") {
        config.loop_unroll = *n;
    }
    if let Some(n) = matches.get_one::<usize>("arg-depth") {
        config.max_argument_depth = *n;
    }
    if let Some(n) = matches.get_one::<usize>("compose-length") {
        config.max_compose_length = *n;
    }
    if let Some(n) = matches.get_one::<usize>("max-sequences") {
        config.max_sequences = *n;
    }
    if let Some(n) = matches.get_one::<usize>("max-length") {
        config.max_sequence_length = *n;
    }
    config.seed = matches.get_one::<u64>("seed").copied();
    if matches.get_flag("deterministic") {
        config.randomize = false;
    }

    let catalog_path = matches.get_one::<String>("catalog").ok_or("missing catalog path")?;
    let catalog = catalog_from_json(&json_from_file(catalog_path)?)?;
    catalog.dump_graph();

    let sketches_path = matches.get_one::<String>("sketches").ok_or("missing sketches path")?;
    let query = json_from_file(sketches_path)?;
    let hole = match matches.get_one::<String>("hole") {
        Some(path) => hole_from_json(&json_from_file(path)?)?,
        None => hole_from_json(&query)?,
    };

    let mut solver = Solver::new(&catalog, config);
    let report = solver.solve_json(&candidates_from_json(&query), &hole);
    for (i, body) in report.results.iter().enumerate() {
        println!("// result {}", i);
        println!("{}", body);
    }
    for (index, failure) in &report.failures {
        log::warn!("candidate {} failed: {}", index, failure);
    }
    Ok(())
}
