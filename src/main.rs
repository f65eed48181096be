#[tokio::main]
async fn main() -> std::io::Result<()> {
    obsidio_server::run_with_config().await
}
