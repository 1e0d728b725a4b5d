fn main() {
    if let Err(err) = navmap::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
