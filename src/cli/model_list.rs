//! Model listing for the configured provider

use std::error::Error;

use crate::core::client::CompanionClient;

pub async fn list_models(client: &CompanionClient) -> Result<(), Box<dyn Error>> {
    let settings = client.settings();
    let models = client.list_models().await?;

    println!("🤖 Available models for {}", settings.provider);
    if !settings.model.is_empty() {
        println!("🎯 Configured model: {}", settings.model);
    }
    println!();

    if models.is_empty() {
        println!("No models found for this provider.");
        return Ok(());
    }

    for model in &models {
        match &model.owned_by {
            Some(owner) => println!("  • {} ({owner})", model.id),
            None => println!("  • {}", model.id),
        }
    }
    Ok(())
}
