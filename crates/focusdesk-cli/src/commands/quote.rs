use focusdesk_core::display::random_quote;

use super::{print_json, CliResult};

pub fn run() -> CliResult {
    print_json(&random_quote())
}
