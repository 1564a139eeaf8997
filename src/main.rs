fn main() {
    if let Err(err) = mcp_explorer::cli::main() {
        eprintln!("❌ {err}");
        std::process::exit(1);
    }
}
