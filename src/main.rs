fn main() -> Result<(), Box<dyn std::error::Error>> {
    aicompanion::cli::main()
}
