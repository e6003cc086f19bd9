extern crate serde;
extern crate serde_json;

use colored::Colorize;
use std::fs::{create_dir_all, read_to_string, File};
use std::io::{stdout, Write};
use std::path::{Path, PathBuf};
use structopt::clap::AppSettings::*;
pub use structopt::StructOpt;

use crate::consumers::{
    bristol::write_bristol,
    evaluator::Evaluator,
    flattening::flatten,
    linter::Linter,
    stats::Stats,
};
use crate::producers::compositor::{compose, parse_connection};
use crate::structs::composite::CompositeCircuit;
use crate::{Domain, FlatCircuit, ModuleGraph, ParseOptions, Result, Source};

const ABOUT: &str = "
This is a collection of tools to turn hierarchical gate-level netlists (BLIF, or Yosys JSON) into flat Bristol circuits.

The tools below read every .blif or .json file of a directory given after the tool name (`workspace` in the examples below), or the files given explicitly. To read from stdin or write to stdout, pass a dash - instead of a filename.

Create example netlists:
    bristolify example workspace

Check that every wire is driven:
    bristolify lint workspace

Flatten into a Bristol circuit, and evaluate it on a witness:
    bristolify to-bristol workspace --eliminate-dead -o circuit.txt
    bristolify evaluate circuit.txt --witness workspace/hierarchy.witness --constants

Join a boolean and an arithmetic circuit through bit-packing bridges:
    bristolify compose workspace/composite/boolean.blif --arithmetic workspace/composite/arithmetic.blif --connection workspace/composite/connection.blif -o composite.bin

";

#[derive(Clone, Debug, StructOpt)]
#[structopt(
name = "bristolify",
about = "Flatten hierarchical netlists into Bristol circuits.",
long_about = ABOUT,
setting(DontCollapseArgsInUsage),
setting(ColoredHelp)
)]
pub struct Options {
    /// Which tool to run.
    ///
    /// example       Produce example netlists.
    ///
    /// lint          Check that every output, gate input, and subcircuit input is driven.
    ///
    /// to-bristol    Lint, flatten, and write a Bristol circuit.
    ///
    /// to-json       Flatten and print the flat circuit as JSON on a single line.
    ///
    /// to-yaml       Flatten and print the flat circuit as YAML.
    ///
    /// metrics       Calculate statistics about a netlist, or about a composite circuit (.bin).
    ///
    /// compose       Join a boolean and an arithmetic netlist into a composite circuit.
    ///
    /// evaluate      Evaluate a Bristol circuit on a witness.
    ///
    /// list-checks   Lists all the checks performed by the linter.
    #[structopt(default_value = "help")]
    pub tool: String,

    /// The tools work in a directory containing .blif or .json files.
    ///
    /// Alternatively, a list of files can be provided explicitly.
    ///
    /// The dash - means either write to stdout or read from stdin.
    #[structopt(default_value = ".")]
    pub paths: Vec<PathBuf>,

    /// Where to write the circuit. The dash - means stdout.
    #[structopt(short, long, default_value = "-")]
    pub output: PathBuf,

    /// Name of the top module. Defaults to the first BLIF model, or the JSON module with the most cells.
    #[structopt(long)]
    pub top: Option<String>,

    /// `evaluate --witness <file>`: the witness bits, as 0 and 1 characters.
    #[structopt(short, long)]
    pub witness: Option<PathBuf>,

    /// `evaluate --constants`: wires 0 and 1 hold false and true, and the witness omits them.
    #[structopt(long)]
    pub constants: bool,

    /// Renumber internal wires contiguously after flattening.
    #[structopt(long)]
    pub compact: bool,

    /// Drop the gates that no output depends on after flattening.
    #[structopt(long)]
    pub eliminate_dead: bool,

    /// `compose --arithmetic <file>`: the arithmetic netlist.
    #[structopt(long)]
    pub arithmetic: Option<PathBuf>,

    /// `compose --connection <file>`: the netlist connecting both circuits.
    #[structopt(long)]
    pub connection: Option<PathBuf>,

    /// Name of the boolean circuit in the connection netlist. Defaults to its top module.
    #[structopt(long)]
    pub connection_bool_top: Option<String>,

    /// Name of the arithmetic circuit in the connection netlist. Defaults to its top module.
    #[structopt(long)]
    pub connection_arith_top: Option<String>,
}

pub fn cli(options: &Options) -> Result<()> {
    match &options.tool[..] {
        "example" => main_example(options),
        "lint" => main_lint(&load_graph(options, &options.paths, Domain::Boolean)?),
        "to-bristol" => main_bristol(options),
        "to-json" => main_json(&load_flat(options, &options.paths, Domain::Boolean)?),
        "to-yaml" => main_yaml(&load_flat(options, &options.paths, Domain::Boolean)?),
        "metrics" => main_metrics(options),
        "compose" => main_compose(options),
        "evaluate" => main_evaluate(options),
        "list-checks" => main_list_checks(),
        "help" => {
            Options::clap().print_long_help()?;
            eprintln!("\n");
            Ok(())
        }
        _ => {
            Options::clap().print_long_help()?;
            eprintln!("\n");
            Err(format!("Unknown command {}", &options.tool).into())
        }
    }
}

fn load_graph(opts: &Options, paths: &[PathBuf], domain: Domain) -> Result<ModuleGraph> {
    let mut source = Source::from_dirs_and_files(paths)?;
    source.print_filenames = true;
    let parse_options = ParseOptions {
        top: opts.top.clone(),
    };
    source.read_graph(domain, &parse_options)
}

/// Lint, then flatten and sort. A failed lint stops here.
fn load_flat(opts: &Options, paths: &[PathBuf], domain: Domain) -> Result<FlatCircuit> {
    let graph = load_graph(opts, paths, domain)?;
    flatten_linted(opts, &graph)
}

fn flatten_linted(opts: &Options, graph: &ModuleGraph) -> Result<FlatCircuit> {
    let mut linter = Linter::new();
    linter.ingest_graph(graph);
    linter.ensure_clean(graph.top_name().unwrap_or_default())?;

    let mut flat = flatten(graph)?;
    flat.sort_topologically()?;
    if opts.eliminate_dead {
        flat.eliminate_dead_gates();
    }
    if opts.compact {
        flat.compact_wires();
    }
    Ok(flat)
}

fn open_output(path: &Path) -> Result<Box<dyn Write>> {
    if path == Path::new("-") {
        Ok(Box::new(stdout()))
    } else {
        if let Some(parent) = path.parent() {
            create_dir_all(parent)?;
        }
        eprintln!("Writing {}", path.display());
        Ok(Box::new(File::create(path)?))
    }
}

fn main_example(opts: &Options) -> Result<()> {
    use crate::producers::examples::*;

    if opts.paths.len() != 1 {
        return Err("Specify a single directory where to write examples.".into());
    }
    let out_dir = &opts.paths[0];
    let composite_dir = out_dir.join("composite");
    create_dir_all(&composite_dir)?;

    let files: Vec<(PathBuf, String)> = vec![
        (out_dir.join("hierarchy.blif"), example_hierarchy_blif().to_string()),
        (out_dir.join("hierarchy.witness"), "110\n".to_string()),
        (composite_dir.join("boolean.blif"), example_boolean_word_blif()),
        (composite_dir.join("arithmetic.blif"), example_arithmetic_blif().to_string()),
        (composite_dir.join("connection.blif"), example_connection_blif()),
    ];
    for (path, content) in files {
        open_output(&path)?.write_all(content.as_bytes())?;
    }
    Ok(())
}

fn main_lint(graph: &ModuleGraph) -> Result<()> {
    let mut linter = Linter::new();
    linter.ingest_graph(graph);
    eprintln!("Checked {} modules.", linter.modules_checked());
    print_violations(&linter.get_violations(), "CLEAN")
}

fn main_list_checks() -> Result<()> {
    Linter::print_implemented_checks();
    Ok(())
}

fn main_bristol(opts: &Options) -> Result<()> {
    let flat = load_flat(opts, &opts.paths, Domain::Boolean)?;
    let mut out = open_output(&opts.output)?;
    write_bristol(&flat, &mut out)?;
    out.flush()?;
    Ok(())
}

fn main_json(flat: &FlatCircuit) -> Result<()> {
    serde_json::to_writer(stdout(), flat)?;
    println!();
    Ok(())
}

fn main_yaml(flat: &FlatCircuit) -> Result<()> {
    serde_yaml::to_writer(stdout(), flat)?;
    println!();
    Ok(())
}

fn main_metrics(opts: &Options) -> Result<()> {
    let mut stats = Stats::default();
    let is_composite = |path: &PathBuf| path.extension().map_or(false, |ext| ext == "bin");

    if opts.paths.len() == 1 && is_composite(&opts.paths[0]) {
        let composite = CompositeCircuit::read_from(File::open(&opts.paths[0])?)?;
        stats.ingest_composite(&composite);
    } else {
        let graph = load_graph(opts, &opts.paths, Domain::Boolean)?;
        stats.ingest_graph(&graph);
        stats.ingest_flat(&flatten_linted(opts, &graph)?);
    }
    serde_json::to_writer_pretty(stdout(), &stats)?;
    println!();
    Ok(())
}

fn main_compose(opts: &Options) -> Result<()> {
    let arithmetic_path = opts.arithmetic.as_ref().ok_or("compose needs --arithmetic <netlist>")?;
    let connection_path = opts.connection.as_ref().ok_or("compose needs --connection <netlist>")?;

    let boolean_graph = load_graph(opts, &opts.paths, Domain::Boolean)?;
    let boolean = flatten_linted(opts, &boolean_graph)?;

    // The top override only applies to the boolean netlist.
    let arith_opts = Options {
        top: None,
        ..opts.clone()
    };
    let arithmetic_graph = load_graph(&arith_opts, &[arithmetic_path.clone()], Domain::Arithmetic)?;
    let arithmetic = flatten_linted(&arith_opts, &arithmetic_graph)?;

    let bool_top = opts.connection_bool_top.clone().unwrap_or_else(|| boolean.name.clone());
    let arith_top = opts.connection_arith_top.clone().unwrap_or_else(|| arithmetic.name.clone());
    let connection = parse_connection(
        &read_to_string(connection_path)?,
        &bool_top,
        &arith_top,
        &boolean_graph.allocator,
        &arithmetic_graph.allocator,
    )?;

    let composite = compose(&boolean, &arithmetic, &connection)?;
    let mut out = open_output(&opts.output)?;
    composite.write_into(&mut out)?;
    out.flush()?;
    Ok(())
}

fn main_evaluate(opts: &Options) -> Result<()> {
    let circuit_path = match &opts.paths[..] {
        [path] => path,
        _ => return Err("Specify a single Bristol circuit to evaluate.".into()),
    };
    let witness_path = opts.witness.as_ref().ok_or("evaluate needs --witness <file>")?;

    let mut evaluator = if opts.constants {
        Evaluator::with_constants()
    } else {
        Evaluator::default()
    };
    evaluator.ingest_witness(&read_to_string(witness_path)?)?;
    evaluator.ingest_circuit(&read_to_string(circuit_path)?);

    for (wire, value) in evaluator.outputs() {
        println!("Output {} :: {}", wire, *value as u8);
    }
    print_violations(&evaluator.get_violations(), "EVALUATED")
}

fn print_violations(errors: &[String], what_it_is_supposed_to_be: &str) -> Result<()> {
    eprintln!();
    if !errors.is_empty() {
        eprintln!("The circuit is {} {}!", "NOT".red().bold(), what_it_is_supposed_to_be);
        eprintln!("Violations:\n- {}\n", errors.join("\n- "));
        Err(format!("Found {} violations.", errors.len()).into())
    } else {
        eprintln!("The circuit is {}!", what_it_is_supposed_to_be.green().bold());
        Ok(())
    }
}

#[cfg(test)]
fn options(tool: &str, paths: Vec<PathBuf>) -> Options {
    Options {
        tool: tool.to_string(),
        paths,
        output: PathBuf::from("-"),
        top: None,
        witness: None,
        constants: false,
        compact: false,
        eliminate_dead: false,
        arithmetic: None,
        connection: None,
        connection_bool_top: None,
        connection_arith_top: None,
    }
}

#[test]
fn test_cli() -> Result<()> {
    use std::fs::remove_dir_all;

    let workspace = PathBuf::from("local/test_cli");
    let _ = remove_dir_all(&workspace);

    cli(&options("example", vec![workspace.clone()]))?;
    cli(&options("lint", vec![workspace.clone()]))?;
    cli(&options("metrics", vec![workspace.clone()]))?;

    let circuit = workspace.join("out/hierarchy.bristol");
    cli(&Options {
        output: circuit.clone(),
        compact: true,
        eliminate_dead: true,
        ..options("to-bristol", vec![workspace.clone()])
    })?;
    assert!(read_to_string(&circuit)?.starts_with("4 9\n0\n0\n"));

    cli(&Options {
        witness: Some(workspace.join("hierarchy.witness")),
        constants: true,
        ..options("evaluate", vec![circuit])
    })?;

    let composite_dir = workspace.join("composite");
    let composite = workspace.join("out/composite.bin");
    cli(&Options {
        output: composite.clone(),
        arithmetic: Some(composite_dir.join("arithmetic.blif")),
        connection: Some(composite_dir.join("connection.blif")),
        ..options("compose", vec![composite_dir.join("boolean.blif")])
    })?;
    cli(&options("metrics", vec![composite.clone()]))?;

    let decoded = CompositeCircuit::read_from(File::open(&composite)?)?;
    assert_eq!(decoded.bridges().count(), 1);

    Ok(())
}

#[test]
fn test_cli_rejects_undriven_outputs() -> Result<()> {
    use crate::producers::examples::example_undriven_blif;
    use std::fs::write;

    let dir = PathBuf::from("local/test_cli_undriven");
    create_dir_all(&dir)?;
    write(dir.join("undriven.blif"), example_undriven_blif())?;

    assert!(cli(&options("lint", vec![dir.clone()])).is_err());
    assert!(cli(&options("to-bristol", vec![dir])).is_err());
    assert!(cli(&options("no-such-tool", vec![])).is_err());
    Ok(())
}
