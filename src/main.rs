fn main() {
    #[cfg(feature = "cli")]
    zdelta::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("zdelta: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}
