// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Storage tests for file-backed and in-memory databases

use anyhow::Result;
use runningapp::database::Database;
use runningapp::models::{NewTraining, NewUser};
use std::fs;
use tempfile::TempDir;

#[tokio::test]
async fn test_file_database_persists_across_reopen() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("nested").join("runningapp.db");
    let url = format!("sqlite:{}", db_path.display());

    let user_id = {
        let database = Database::new(&url).await?;
        let user_id = database
            .create_user(&NewUser::regular("persistent".to_string(), "hash".to_string()))
            .await?;
        let training = NewTraining::derive(user_id, "river loop".to_string(), 10.0, 3600, None, 70.0)?;
        database.create_training(&training).await?;
        user_id
    };
    assert!(db_path.exists());

    let reopened = Database::new(&url).await?;
    let user = reopened.get_user(user_id).await?.unwrap();
    assert_eq!(user.username, "persistent");

    let profile = user.user_profile.unwrap();
    assert_eq!(profile.trainings_number, 1);
    assert_eq!(profile.kilometers_run, 10.0);

    let trainings = reopened.list_trainings_for_user(user_id).await?;
    assert_eq!(trainings.len(), 1);
    assert_eq!(trainings[0].calories, 735);

    Ok(())
}

#[tokio::test]
async fn test_memory_database_no_physical_files() -> Result<()> {
    let database = Database::new("sqlite::memory:").await?;
    database
        .create_user(&NewUser::regular("ephemeral".to_string(), "hash".to_string()))
        .await?;

    for entry in fs::read_dir(std::env::current_dir()?)? {
        let filename = entry?.file_name();
        let filename = filename.to_string_lossy();
        assert!(
            !filename.starts_with(":memory:") && !filename.starts_with("sqlite::memory:"),
            "Found physical file for an in-memory database: {filename}"
        );
    }

    Ok(())
}

#[tokio::test]
async fn test_memory_databases_are_isolated() -> Result<()> {
    let first = Database::new("sqlite::memory:").await?;
    let second = Database::new("sqlite::memory:").await?;

    first
        .create_user(&NewUser::regular("only-here".to_string(), "hash".to_string()))
        .await?;

    assert_eq!(first.count_users().await?, 1);
    assert_eq!(second.count_users().await?, 0);
    assert!(second.get_user_by_username("only-here").await?.is_none());

    Ok(())
}
