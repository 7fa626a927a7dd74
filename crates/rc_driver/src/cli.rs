//! Command-line surface: a crate root, the edition to compile against,
//! `--cfg` predicates, and the proc-macro dump prefix. The idiomatic
//! replacement for the original's hand-parsed argv.

use clap::Parser;
use rc_span::Edition;

#[derive(Debug, Parser)]
#[command(name = "rc_driver", about = "Front-end pass driver: expansion, UFCS resolution, const evaluation")]
pub struct Cli {
    /// Path to the crate root. Ignored today — no parser is wired up
    /// yet, so the pipeline always runs against the built-in demo
    /// fixture — but accepted so the CLI shape matches a real driver's.
    #[arg(index = 1)]
    pub crate_root: std::path::PathBuf,

    #[arg(long, value_enum, default_value = "rust2021")]
    pub edition: EditionArg,

    /// Repeatable: `--cfg test --cfg feature=foo`.
    #[arg(long = "cfg")]
    pub cfg: Vec<String>,

    /// Falls back to the `MRUSTC_DUMP_PROCMACRO` environment variable
    /// when not given on the command line.
    #[arg(long)]
    pub dump_procmacro_prefix: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum EditionArg {
    #[value(name = "rust2015")]
    Rust2015,
    #[value(name = "rust2018")]
    Rust2018,
    #[value(name = "rust2021")]
    Rust2021,
}

impl From<EditionArg> for Edition {
    fn from(e: EditionArg) -> Edition {
        match e {
            EditionArg::Rust2015 => Edition::Rust2015,
            EditionArg::Rust2018 => Edition::Rust2018,
            EditionArg::Rust2021 => Edition::Rust2021,
        }
    }
}

impl Cli {
    /// `--cfg key=value` splits on the first `=`; a bare flag (no `=`)
    /// is a boolean cfg.
    pub fn cfg_env(&self) -> rc_expand::CfgEnv {
        let mut env = rc_expand::CfgEnv::new();
        for entry in &self.cfg {
            match entry.split_once('=') {
                Some((k, v)) => env = env.with_value(k, v.trim_matches('"')),
                None => env = env.with_flag(entry.clone()),
            }
        }
        env
    }

    /// The dump prefix this run should use, per §6's
    /// `MRUSTC_DUMP_PROCMACRO` contract: an explicit flag wins over the
    /// environment variable of the same name.
    pub fn dump_procmacro_prefix(&self) -> Option<String> {
        self.dump_procmacro_prefix.clone().or_else(|| std::env::var("MRUSTC_DUMP_PROCMACRO").ok())
    }
}
