#[tokio::main]
async fn main() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    if let Err(e) = vocalprep::run().await {
        eprintln!("Error running server: {e}");
        std::process::exit(1);
    }
}
