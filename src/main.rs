use anyhow::{Context, Result};
use bake::cli::commands::{BuildCommand, HistoryCommand, ListCommand, ValidateCommand};
use bake::cli::output::*;
use bake::cli::{Cli, Command};
use bake::core::recipe::Recipe;
use bake::core::BuildStatus;
use bake::execution::{BuildEngine, BuildEvent};
use bake::persistence::{
    create_summary, BuildSummary, InMemoryPersistence, PersistenceBackend, SqliteBuildStore,
};
use bake::provision::LocalProvisioner;
use std::sync::Arc;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    // Execute command
    match &cli.command {
        Command::Build(cmd) => build_image(cmd).await?,
        Command::Validate(cmd) => validate_recipe(cmd)?,
        Command::List(cmd) => list_recipes(cmd).await?,
        Command::History(cmd) => show_history(cmd).await?,
    }

    Ok(())
}

async fn build_image(cmd: &BuildCommand) -> Result<()> {
    // Load recipe
    let recipe = Recipe::from_file(&cmd.file).context("Failed to load recipe")?;

    println!("{} Loaded recipe: {}", INFO, style(&recipe.name).bold());

    let base_image = recipe.base_image().to_string();
    let mut pipeline = recipe.to_pipeline();

    // Set up persistence
    let store: Arc<dyn PersistenceBackend> = if cmd.no_history {
        Arc::new(InMemoryPersistence::new())
    } else {
        Arc::new(SqliteBuildStore::with_default_path().await?)
    };

    // Stage under the local cache unless told otherwise
    let staging = match &cmd.staging {
        Some(dir) => dir.clone(),
        None => dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("bake")
            .join(pipeline.state.build_id.to_string()),
    };

    let provisioner = LocalProvisioner::new(&staging);
    let engine = BuildEngine::new(provisioner, cmd.context.clone());

    // Set up progress output
    let progress = create_progress_bar(pipeline.steps.len());
    let bar = progress.clone();
    engine
        .add_event_handler(move |event| {
            bar.println(format_build_event(&event));
            match event {
                BuildEvent::StepCompleted { .. } | BuildEvent::StepSkipped { .. } => bar.inc(1),
                BuildEvent::StepStarted { step_id } => bar.set_message(step_id),
                _ => {}
            }
        })
        .await;

    // Execute pipeline
    println!();
    let result = engine.execute(&mut pipeline).await;
    progress.finish_and_clear();

    // Save to history
    if !cmd.no_history {
        let summary = create_summary(&pipeline, &base_image);
        store.save_build(&summary).await?;
        println!(
            "{} Build saved to history (ID: {})",
            INFO,
            style(&summary.build_id.to_string()[..8]).dim()
        );
    }

    // Print final status
    match result {
        Ok(image) => {
            println!(
                "\n{} {} built {} (staged at {})",
                CHECK,
                style(&pipeline.name).bold(),
                style("successfully").green(),
                style(staging.display()).dim()
            );
            if let Some(entrypoint) = &image.entrypoint {
                println!("  Entrypoint: {}", style(format!("{:?}", entrypoint)).cyan());
            }
            Ok(())
        }
        Err(e) => {
            println!(
                "\n{} {} {}",
                CROSS,
                style(&pipeline.name).bold(),
                style("aborted").red()
            );
            error!("{}", e);
            std::process::exit(1);
        }
    }
}

fn validate_recipe(cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating recipe...", INFO);

    let result = Recipe::from_file(&cmd.file);

    match result {
        Ok(recipe) => {
            println!("{} Recipe is valid!", CHECK);
            println!("  Name: {}", style(&recipe.name).bold());
            println!("  Base: {}", style(recipe.base_image()).cyan());
            println!(
                "  System packages: {}",
                style(recipe.system_packages.len()).cyan()
            );
            println!(
                "  Entrypoint: {}",
                style(format!("{:?}", recipe.entrypoint)).cyan()
            );

            if cmd.json {
                let json = serde_json::to_string_pretty(&recipe)?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(e).red());
            std::process::exit(1);
        }
    }
}

async fn list_recipes(cmd: &ListCommand) -> Result<()> {
    let store = SqliteBuildStore::with_default_path().await?;
    let recipes = store.list_recipes().await?;

    if recipes.is_empty() {
        println!("{} No builds found in history", INFO);
        return Ok(());
    }

    println!("{} Recipes in history:", INFO);

    for recipe_name in &recipes {
        let builds = store.list_builds(recipe_name).await?;

        if cmd.with_counts {
            let completed = builds
                .iter()
                .filter(|b| b.status == BuildStatus::Completed)
                .count();
            let aborted = builds
                .iter()
                .filter(|b| b.status == BuildStatus::Aborted)
                .count();
            println!(
                "  {} ({} builds: {} succeeded, {} aborted)",
                style(recipe_name).bold(),
                style(builds.len()).cyan(),
                style(completed).green(),
                style(aborted).red()
            );
        } else {
            println!("  {}", style(recipe_name).bold());
        }
    }

    if cmd.json {
        let mut json_data = Vec::new();
        for recipe in &recipes {
            let builds = store.list_builds(recipe).await.ok();
            json_data.push(serde_json::json!({
                "name": recipe,
                "build_count": builds.as_ref().map(|b| b.len()).unwrap_or(0)
            }));
        }
        let data = serde_json::json!({ "recipes": json_data });
        println!("\n{}", serde_json::to_string_pretty(&data)?);
    }

    Ok(())
}

async fn show_history(cmd: &HistoryCommand) -> Result<()> {
    let store = SqliteBuildStore::with_default_path().await?;

    // If a specific build ID is requested
    if let Some(build_id_str) = &cmd.build_id {
        let build_id = uuid::Uuid::parse_str(build_id_str).context("Invalid build ID format")?;
        let summary = store.load_build(build_id).await?;

        match summary {
            Some(summary) => {
                print_build_details(&summary, cmd.verbose)?;
            }
            None => {
                println!("{} Build not found", WARN);
            }
        }
        return Ok(());
    }

    // List builds for a recipe or all
    let builds = if let Some(recipe_name) = &cmd.recipe {
        store.list_builds(recipe_name).await?
    } else {
        let recipes = store.list_recipes().await?;
        let mut all_builds = Vec::new();
        for recipe in &recipes {
            all_builds.extend(store.list_builds(recipe).await?);
        }
        // Sort by started_at descending
        all_builds.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        all_builds.into_iter().take(cmd.limit).collect()
    };

    if builds.is_empty() {
        println!("{} No builds found", INFO);
        return Ok(());
    }

    println!("{} Build history (showing latest {}):", INFO, cmd.limit);

    if cmd.json {
        let data = serde_json::json!({ "builds": builds });
        println!("{}", serde_json::to_string_pretty(&data)?);
    } else {
        for summary in &builds {
            println!("  {}", format_build_summary(summary));
        }
    }

    Ok(())
}

fn print_build_details(summary: &BuildSummary, verbose: bool) -> Result<()> {
    println!("{} Build Details", INFO);
    println!("  ID: {}", style(summary.build_id).cyan());
    println!("  Recipe: {}", style(&summary.recipe_name).bold());
    println!("  Base: {}", style(&summary.base_image).cyan());
    println!("  Status: {}", format_status(summary.status));
    println!("  Started: {}", style(summary.started_at.to_rfc3339()).dim());
    if let Some(completed) = summary.completed_at {
        println!("  Finished: {}", style(completed.to_rfc3339()).dim());
        if let Ok(duration) = completed.signed_duration_since(summary.started_at).to_std() {
            println!("  Duration: {}", style(format_duration(duration)).dim());
        }
    }
    println!(
        "  Progress: {} ({}/{})",
        style(format!("{:.0}%", summary.progress * 100.0)).cyan(),
        summary.completed_steps,
        summary.total_steps
    );

    if verbose {
        println!("\n  {}", style("Full details:").bold());
        let json = serde_json::to_string_pretty(summary)?;
        for line in json.lines() {
            println!("    {}", line);
        }
    }

    Ok(())
}

fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
