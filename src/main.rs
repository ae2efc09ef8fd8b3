#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = proctor_client::run().await {
        eprintln!("proctor-client fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
