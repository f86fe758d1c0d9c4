#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = ikhtibar_rust::run().await {
        eprintln!("ikhtibar-rust fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
