fn main() {
    if let Err(err) = water_loop::app::run() {
        eprintln!("application startup failed: {err}");
        std::process::exit(1);
    }
}
