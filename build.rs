// build.rs

use clap::{Arg, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: target database scope
fn database_arg() -> Arg {
    Arg::new("database")
        .long("database")
        .value_parser(["project", "user", "system"])
        .default_value("project")
        .help("Database scope to operate on")
}

/// Common argument: installation group
fn group_arg() -> Arg {
    Arg::new("group")
        .long("group")
        .default_value("")
        .help("Installation group")
}

fn packages_arg() -> Arg {
    Arg::new("packages")
        .required(true)
        .num_args(1..)
        .help("Packages as name[@requirement]")
}

fn build_cli() -> Command {
    Command::new("ralph")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Ralph Contributors")
        .about("Source-level package manager for native projects")
        .arg(
            Arg::new("directory")
                .short('C')
                .long("directory")
                .global(true)
                .default_value(".")
                .help("Project directory to operate in"),
        )
        .subcommand(
            Command::new("sources")
                .about("Manage package sources")
                .subcommand(Command::new("list").about("List sources").arg(database_arg()))
                .subcommand(
                    Command::new("add")
                        .about("Register a new source")
                        .arg(Arg::new("name").required(true).help("Source name"))
                        .arg(Arg::new("url").required(true).help("Remote URL of the index repository"))
                        .arg(database_arg()),
                )
                .subcommand(
                    Command::new("remove")
                        .about("Unregister a source and delete its mirror")
                        .arg(Arg::new("name").required(true).help("Source name"))
                        .arg(database_arg()),
                )
                .subcommand(
                    Command::new("show")
                        .about("Show one source")
                        .arg(Arg::new("name").required(true).help("Source name"))
                        .arg(database_arg()),
                )
                .subcommand(
                    Command::new("update")
                        .about("Synchronize sources with their remotes")
                        .arg(Arg::new("names").num_args(0..).help("Source names (all when omitted)"))
                        .arg(database_arg()),
                ),
        )
        .subcommand(
            Command::new("install")
                .about("Install packages into a group")
                .arg(packages_arg())
                .arg(group_arg())
                .arg(
                    Arg::new("config")
                        .long("config")
                        .num_args(1)
                        .action(clap::ArgAction::Append)
                        .help("Configuration entries as KEY=VALUE"),
                ),
        )
        .subcommand(
            Command::new("remove")
                .about("Remove installed packages from a group")
                .arg(packages_arg())
                .arg(group_arg()),
        )
        .subcommand(
            Command::new("check")
                .about("Check that packages are installed in a group")
                .arg(packages_arg())
                .arg(group_arg()),
        )
        .subcommand(
            Command::new("search")
                .about("Search package names with a wildcard")
                .arg(Arg::new("pattern").required(true).help("Wildcard pattern")),
        )
        .subcommand(
            Command::new("new")
                .about("Create a new project")
                .arg(Arg::new("name").required(true).help("Project name"))
                .arg(
                    Arg::new("build_system")
                        .long("build-system")
                        .value_parser(["cmake", "none"])
                        .default_value("cmake")
                        .help("Build system to scaffold"),
                )
                .arg(
                    Arg::new("version_control_system")
                        .long("version-control-system")
                        .value_parser(["git", "none"])
                        .default_value("git")
                        .help("Version control system to initialize"),
                ),
        )
        .subcommand(Command::new("verify").about("Verify the project manifest"))
        .subcommand(Command::new("info").about("Show available database locations"))
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "zsh", "fish", "powershell"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("ralph.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
        return;
    }
}
