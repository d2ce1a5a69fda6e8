//! Main entry point for the kvguard CLI application

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured logging
    kvguard::logging::init();

    kvguard::cli::run()
}
