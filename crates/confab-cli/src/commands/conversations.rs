//! Non-interactive conversation management commands.

use anyhow::Result;

use super::setup;

pub async fn list() -> Result<()> {
    let setup = setup().await?;
    let conversations = setup.store.list(&setup.config.session.owner_id).await?;

    if conversations.is_empty() {
        println!("No conversations yet.");
        return Ok(());
    }
    for conversation in conversations {
        println!(
            "{}  {}  (updated {})",
            conversation.id, conversation.title, conversation.updated_at
        );
    }
    Ok(())
}

pub async fn rename(id: &str, title: &str) -> Result<()> {
    let setup = setup().await?;
    setup.store.rename(id, title).await?;
    println!("Renamed {id} to \"{title}\"");
    Ok(())
}

pub async fn delete(id: &str) -> Result<()> {
    let setup = setup().await?;
    setup.store.delete(id).await?;
    println!("Deleted {id}");
    Ok(())
}
