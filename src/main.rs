use eyre::Result;

#[tokio::main]
async fn main() -> Result<()> {
    breeze::init()?;
    breeze::cli::run().await
}
