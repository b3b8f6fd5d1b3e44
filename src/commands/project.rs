// src/commands/project.rs
//! Project scaffolding and verification commands

use anyhow::Result;
use ralph::progress;
use ralph::project::{BuildSystem, Project, ProjectGenerator, VersionControl};
use std::path::Path;
use tracing::info;

/// Scaffold a new project under the working directory
pub fn cmd_new(
    name: &str,
    build_system: &str,
    version_control_system: &str,
    directory: &Path,
) -> Result<()> {
    let build_system: BuildSystem = build_system.parse()?;
    let version_control: VersionControl = version_control_system.parse()?;

    info!(name, "generating project");
    let generator = ProjectGenerator::new(name, directory.join(name))
        .build_system(build_system)
        .version_control(version_control);
    let project = progress::wait_rendered("Creating project", &generator.generate())?;
    println!("The project {} was created successfully!", project.name());
    Ok(())
}

/// Validate the project manifest in the working directory
pub fn cmd_verify(directory: &Path) -> Result<()> {
    let project = Project::load(directory)?;
    println!(
        "The project {} in {} is valid!",
        project.name(),
        directory.display()
    );
    Ok(())
}
