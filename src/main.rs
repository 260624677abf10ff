fn main() {
    if let Err(err) = geoname_match::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
