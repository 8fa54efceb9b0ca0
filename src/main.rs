fn main() {
    if let Err(err) = broom::cli::run() {
        broom::ui::eprintln_error(&err);
        std::process::exit(broom::exit::exit_code(&err));
    }
}
