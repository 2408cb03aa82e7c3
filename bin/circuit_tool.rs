use std::{fs, time::Instant};

use clap::Parser;
use rslc::{
    repr::{CircuitManager, CircuitPtr, VTreeManager},
    serialize,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// input circuit file
    #[arg(short, long)]
    file: String,

    /// input format.
    /// allowed: `sdd`, `psdd`, `logistic`, `cnf`, `dnf`
    #[arg(long, default_value_t = String::from("sdd"))]
    format: String,

    /// apply constant propagation
    #[arg(long)]
    propagate_constants: bool,

    /// forget every variable with a label strictly above this value
    #[arg(long)]
    forget_above: Option<u64>,

    /// apply smoothing
    #[arg(long)]
    smooth: bool,

    /// vtree file used when re-serializing to `.sdd`
    #[arg(long)]
    vtree: Option<String>,

    /// write the resulting circuit as `.sdd` to this path (requires --vtree)
    #[arg(long)]
    output_sdd: Option<String>,

    /// write the resulting circuit as DOT to this path
    #[arg(long)]
    dot: Option<String>,

    /// show verbose output (timing, per-stage node counts)
    #[arg(short, long)]
    verbose: bool,
}

fn load(mgr: &mut CircuitManager, format: &str, src: &str) -> CircuitPtr {
    match format {
        "sdd" => {
            let lines = serialize::parse_sdd(src).unwrap();
            serialize::compile_lines(mgr, &lines).unwrap()
        }
        "psdd" => {
            let lines = serialize::parse_psdd(src).unwrap();
            serialize::compile_lines(mgr, &lines).unwrap()
        }
        "logistic" => {
            let lines = serialize::parse_logistic_circuit(src).unwrap();
            serialize::compile_lines(mgr, &lines).unwrap()
        }
        "cnf" => {
            let clauses = serialize::parse_cnf(src).unwrap();
            serialize::compile_cnf(mgr, &clauses)
        }
        "dnf" => {
            let terms = serialize::parse_dnf(src).unwrap();
            serialize::compile_dnf(mgr, &terms)
        }
        _ => panic!(
            "Unknown format {} provided, expected one of: `sdd`, `psdd`, `logistic`, `cnf`, `dnf`",
            format
        ),
    }
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let src = fs::read_to_string(&args.file).unwrap();
    let mut mgr = CircuitManager::new();

    let start = Instant::now();
    let mut root = load(&mut mgr, args.format.as_str(), &src);
    let parse_time = start.elapsed();

    if args.propagate_constants {
        root = mgr.propagate_constants(root);
        if args.verbose {
            eprintln!("after propagate_constants: {} nodes", mgr.num_nodes(root));
        }
    }
    if let Some(bound) = args.forget_above {
        root = mgr.forget(root, |v| v.value() > bound);
        if args.verbose {
            eprintln!("after forget(> {}): {} nodes", bound, mgr.num_nodes(root));
        }
    }
    if args.smooth {
        root = mgr.smooth(root);
        if args.verbose {
            eprintln!("after smooth: {} nodes", mgr.num_nodes(root));
        }
    }

    let decomposable = mgr.is_decomposable(root);
    let smooth = mgr.is_smooth(root);
    println!("nodes: {}", mgr.num_nodes(root));
    println!("edges: {}", mgr.num_edges(root));
    println!("variables: {}", mgr.num_variables(root));
    println!("decomposable: {}", decomposable);
    println!("smooth: {}", smooth);
    if decomposable && smooth {
        println!("model count: {}", mgr.model_count(root, None));
    }

    if args.verbose {
        eprintln!("=== STATS ===");
        eprintln!("parse + compile time: {:.4}s", parse_time.as_secs_f64());
        eprintln!("rewrite time: {:.4}s", start.elapsed().as_secs_f64());
    }

    if let Some(path) = args.output_sdd {
        let vtree_src = fs::read_to_string(
            args.vtree
                .as_ref()
                .expect("--output-sdd requires --vtree"),
        )
        .unwrap();
        let vt = VTreeManager::new(serialize::parse_vtree(&vtree_src).unwrap());
        let lines = serialize::sdd_lines(&mgr, root, &vt).unwrap();
        fs::write(path, serialize::write_sdd(&lines)).unwrap();
    }

    if let Some(path) = args.dot {
        fs::write(path, serialize::circuit_to_dot(&mgr, root)).unwrap();
    }
}
