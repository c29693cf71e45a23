/// Routes the tree's `log` output through `env_logger`; `RUST_LOG=trace`
/// shows every reconciliation decision.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
