//! `newtest topologies` (spec.md §6: discovery — list topology bundles
//! under `NEWTEST_TOPOLOGIES`).

pub async fn run() -> anyhow::Result<i32> {
    let base = newtest_env::topologies_base();
    let mut entries = match tokio::fs::read_dir(&base).await {
        Ok(entries) => entries,
        Err(error) => {
            eprintln!("error: reading {}: {error}", base.display());
            return Ok(super::EXIT_CLI_ERROR);
        }
    };

    let mut names = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        if entry.path().is_dir() {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_owned());
            }
        }
    }
    names.sort();
    for name in names {
        println!("{name}");
    }
    Ok(0)
}
