//! Builds the parametrized transition system of a two-gene toggle switch, split across worker
//! threads, and reports edge counts and solver statistics.
//!
//! ```text
//! dx/dt = p * hill⁻(y) - x
//! dy/dt = q * hill⁻(x) - y
//! ```
//!
//! Run with:
//! ```bash
//! cargo run --release --example grid -- --thresholds 12 --workers 4
//! ```

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use clap::Parser;
use color_eyre::eyre::eyre;

use ode_gen::comm::{ChannelComm, Comm};
use ode_gen::config::Config;
use ode_gen::exchange::exchange_boundary;
use ode_gen::model::{Evaluable, OdeModel, Parameter, Summand, Variable};
use ode_gen::partition::{owned_states, BlockPartition, ModuloPartition, Partition};
use ode_gen::rect::Rectangle;
use ode_gen::solver::{RectangleSolver, Solver};
use ode_gen::transition::{OdeTransitionSystem, TransitionSystem};

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Thresholds per variable.
    #[arg(long, value_name = "INT", default_value = "8")]
    thresholds: usize,

    /// Number of worker threads.
    #[arg(long, value_name = "INT", default_value = "2")]
    workers: usize,

    /// Assign contiguous blocks of states instead of round-robin.
    #[arg(long)]
    block: bool,

    /// Do not add self-loops.
    #[arg(long)]
    no_loops: bool,

    /// Memo table size (in bits).
    #[arg(long, value_name = "INT", default_value = "12")]
    cache_bits: usize,
}

fn toggle_switch(thresholds: usize) -> ode_gen::Result<OdeModel> {
    let grid: Vec<f64> = (0..thresholds).map(|i| 4.0 * i as f64 / (thresholds - 1) as f64).collect();
    let repression = |var| Evaluable::Hill {
        var,
        theta: 1.5,
        n: 2.0,
        a: 1.0,
        b: 0.0,
    };
    let x = Variable::new(
        "x",
        grid.clone(),
        vec![
            Summand::constant(1.0).with_param(0).with_evaluable(repression(1)),
            Summand::constant(-1.0).with_variable(0),
        ],
    );
    let y = Variable::new(
        "y",
        grid,
        vec![
            Summand::constant(1.0).with_param(1).with_evaluable(repression(0)),
            Summand::constant(-1.0).with_variable(1),
        ],
    );
    OdeModel::new(vec![x, y], vec![Parameter::new("p", (0.0, 4.0)), Parameter::new("q", (0.0, 4.0))])
}

fn make_partition(block: bool, workers: usize, states: usize) -> Box<dyn Partition> {
    if block {
        Box::new(BlockPartition::new(workers, states))
    } else {
        Box::new(ModuloPartition::new(workers))
    }
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = Instant::now();

    let args = Cli::parse();
    println!("args = {:?}", args);
    if args.thresholds < 2 || args.workers == 0 {
        return Err(eyre!("need at least two thresholds and one worker"));
    }

    let model = Arc::new(toggle_switch(args.thresholds)?);
    println!("{}", model);

    let config = Config::default()
        .with_self_loops(!args.no_loops)
        .with_cache_bits(args.cache_bits);

    let handles: Vec<_> = ChannelComm::group(args.workers)
        .into_iter()
        .map(|comm| {
            let model = model.clone();
            let block = args.block;
            thread::spawn(move || -> ode_gen::Result<(usize, usize, usize)> {
                let solver = RectangleSolver::with_cache_bits(
                    Rectangle::from_bounds(&model.parameter_bounds()),
                    config.cache_bits,
                );
                let ts = OdeTransitionSystem::new(model, solver, config);
                let partition = make_partition(block, comm.size(), ts.state_count());

                let mut local_edges = 0;
                for state in owned_states(partition.as_ref(), comm.rank(), ts.state_count()) {
                    local_edges += ts.successors(state)?.len();
                }
                let incoming = exchange_boundary(&comm, &ts, partition.as_ref(), 0)?;

                println!("worker {}: {}", comm.rank(), ts.solver().stats());
                ts.log_stats();
                Ok((comm.rank(), local_edges, incoming.len()))
            })
        })
        .collect();

    let mut total_edges = 0;
    for handle in handles {
        let (rank, edges, incoming) = handle.join().map_err(|_| eyre!("worker thread panicked"))??;
        println!("worker {}: {} edges, {} received across partitions", rank, edges, incoming);
        total_edges += edges;
    }

    println!("total edges: {}", total_edges);
    println!("Total time: {:.2} s", time_total.elapsed().as_secs_f64());
    Ok(())
}
