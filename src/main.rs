#[tokio::main]
async fn main() {
    if let Err(e) = socialqr::run().await {
        eprintln!("{:?}", e);
        std::process::exit(1);
    }
}
