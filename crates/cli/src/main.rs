use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    tramites_cli::main_entry().await
}
