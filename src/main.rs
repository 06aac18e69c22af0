fn main() {
    if let Err(err) = apnea_analyzer_lib::cli::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
