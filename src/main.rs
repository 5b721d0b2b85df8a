fn main() {
    if let Err(err) = stat_ingest::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
