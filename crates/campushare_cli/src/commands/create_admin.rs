//! Create-admin command.

use super::CommandResult;
use campushare_core::models::NewUser;
use campushare_core::{Database, DatabaseConfig, HashCost, PasswordHasher, Services};
use tracing::info;

/// Creates an administrator, migrating the database first if needed.
pub async fn run(config: &DatabaseConfig, input: NewUser) -> CommandResult {
    let db = Database::open(config).await?;
    let services = Services::new(db.clone(), PasswordHasher::new(HashCost::Standard));

    let user = services.users.create_admin(input).await?;
    info!(user = user.id, "administrator created");
    println!("Created administrator {} (id {}).", user.username, user.id);

    db.close().await;
    Ok(())
}
