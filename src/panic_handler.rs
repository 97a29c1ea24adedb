use log::error;
use std::panic;

/// Install panic hooks: readable backtraces in debug builds, a crash report
/// file in release builds. Either way the panic is written to the log first.
pub fn initialize_panic_handler() {
    if cfg!(debug_assertions) {
        better_panic::install();
    } else {
        human_panic::setup_panic!();
    }

    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        error!("Panic: {panic_info}");

        default_hook(panic_info);
    }));
}
