fn main() {
    if let Err(e) = talkboard::run() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
