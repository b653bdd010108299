use mongodb::{Client, bson::doc};

/// Run the `ping` admin command
pub async fn ping(client: &Client) -> Result<(), mongodb::error::Error> {
    client.database("admin").run_command(doc! { "ping": 1 }).await?;
    Ok(())
}
