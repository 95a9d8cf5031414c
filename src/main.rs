fn main() {
    if let Err(err) = pagepause_lib::run() {
        eprintln!("pagepause: {err:#}");
        std::process::exit(1);
    }
}
