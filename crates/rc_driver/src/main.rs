use clap::Parser;
use rc_driver::cli::Cli;
use rc_driver::{fixture, pipeline};
use rc_span::DiagCtxt;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Some(prefix) = cli.dump_procmacro_prefix() {
        tracing::debug!(prefix = %prefix, "proc-macro token dumping enabled");
    }

    let mut crate_ = fixture::build_demo_crate();
    let dcx = DiagCtxt::new();
    let cfg = cli.cfg_env();
    let outcome = pipeline::run(&mut crate_, &dcx, cli.edition.into(), &cfg);

    for diag in dcx.drain_errors() {
        eprintln!("error[{}]: {}", diag.code.map(|c| c.as_str()).unwrap_or("E0000"), diag.message);
    }

    if let Some(phase) = outcome.halted_after {
        eprintln!("compilation halted after phase `{}`", phase.name());
        std::process::exit(1);
    }

    println!("{} const/static item(s) evaluated", outcome.consts_evaluated);
    std::process::exit(0);
}
