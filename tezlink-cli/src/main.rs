use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    tezlink_cli::run().await?;
    Ok(())
}
