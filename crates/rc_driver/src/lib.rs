//! Driver entry points: the `clap`-based CLI, the demo fixture that
//! stands in for the missing parser, and `pipeline::run`'s fixed
//! ordering over the other crates' passes with phase-boundary error
//! gating.

pub mod cli;
pub mod fixture;
pub mod pipeline;

pub use cli::Cli;
pub use fixture::build_demo_crate;
pub use pipeline::{Phase, PipelineOutcome};

#[cfg(test)]
mod tests {
    use super::*;
    use rc_span::{DiagCtxt, Edition};

    #[test]
    fn demo_crate_runs_the_whole_pipeline_clean() {
        let mut crate_ = build_demo_crate();
        let dcx = DiagCtxt::new();
        let cfg = rc_expand::CfgEnv::new();
        let outcome = pipeline::run(&mut crate_, &dcx, Edition::Rust2021, &cfg);
        assert!(outcome.halted_after.is_none(), "pipeline halted after {:?}", outcome.halted_after);
        assert!(!dcx.had_errors());
        assert_eq!(outcome.consts_evaluated, 1);
    }

    #[test]
    fn demo_crate_size_const_evaluates_to_five() {
        let mut crate_ = build_demo_crate();
        let dcx = DiagCtxt::new();
        let cfg = rc_expand::CfgEnv::new();
        pipeline::run(&mut crate_, &dcx, Edition::Rust2021, &cfg);
        let path = rc_ast::path::AbsolutePath::crate_root("demo".to_string()).child("SIZE");
        let encoded = rc_consteval::ConstEvalCtx::new(&mut crate_).encode_item(&path).unwrap();
        assert_eq!(encoded.bytes, 5u64.to_le_bytes().to_vec());
    }

    #[test]
    fn a_phase_that_reports_an_error_halts_the_rest_of_the_pipeline() {
        let mut crate_ = build_demo_crate();
        let bad = rc_ast::expr::Expr::new(
            rc_span::Span::dummy(),
            rc_ast::expr::ExprKind::PathExpr(Box::new(rc_ast::path::Path::local("nonexistent"))),
        );
        let root = crate_.root_module;
        crate_.add_item(
            root,
            true,
            rc_ast::item::Item::new(
                "BROKEN",
                rc_ast::item::ItemKind::Const { ty: rc_ast::types::TypeRef::Primitive(rc_ast::types::Primitive::Usize), value: bad },
                rc_span::Span::dummy(),
                rc_ast::item::Visibility::Public,
            ),
        );
        crate_.rebuild_indexes();

        let dcx = DiagCtxt::new();
        let cfg = rc_expand::CfgEnv::new();
        let outcome = pipeline::run(&mut crate_, &dcx, Edition::Rust2021, &cfg);
        assert_eq!(outcome.halted_after, Some(Phase::ConstantEvaluate));
    }
}
