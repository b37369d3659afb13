fn main() {
    let args: Vec<String> = std::env::args().collect();
    if let Err(err) = worldserver::run(&args) {
        eprintln!("worldserver: {}", err);
        std::process::exit(1);
    }
}
