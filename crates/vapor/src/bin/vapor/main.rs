mod cli;
mod contrib;
mod settings;

use anyhow::Context;
use settings::{Settings, SettingsError};
use std::io::Write;
use vapor::value::Value;

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("VAPOR_LOG"))
        .with_writer(std::io::stderr)
        .init();

    for new_path in cli.directory.iter() {
        match new_path.canonicalize() {
            Err(e) => {
                eprintln!(
                    "Failed to resolve path for -C/--directory {}\n{}",
                    new_path.display(),
                    e
                );
                std::process::exit(1);
            }
            Ok(cwd) => {
                if let Err(err) = std::env::set_current_dir(&cwd) {
                    eprintln!("Failed to set work directory to {}\n{}", cwd.display(), err,);
                    std::process::exit(1);
                }

                tracing::info!(directory=%cwd.display(), "Changed working directory");
            }
        }
    }

    let command_result = match cli.command {
        cli::Command::Generate(generate_cli) => generate(generate_cli),
        cli::Command::List => list(),
        cli::Command::Configure(configure_cli) => configure(configure_cli),
    };

    if let Err(e) = command_result {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

pub fn generate(cli: cli::GenerateCommand) -> anyhow::Result<()> {
    let recipes = if cli.recipes.is_empty() {
        let settings = Settings::load().context("Failed to load settings")?;
        default_recipes(&settings)
    } else {
        cli.recipes
    };

    let template = contrib::registry()
        .build(&cli.source, recipes.as_slice())
        .with_context(|| format!("Failed to generate `{}`", cli.source))?;
    let value = template.to_wire()?;

    match &cli.output_file {
        None => output(&cli.output, &value, std::io::stdout().lock())?,
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            output(&cli.output, &value, std::io::BufWriter::new(file))?;
            tracing::info!(path = %path.display(), "template written");
        }
    }

    Ok(())
}

/// `defaults.recipes`, comma separated
fn default_recipes(settings: &Settings) -> Vec<String> {
    settings
        .get_or("defaults", "recipes", "")
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

fn output(output: &cli::OutputArgs, value: &Value, mut writer: impl Write) -> anyhow::Result<()> {
    match output.format {
        cli::OutputFormat::Yaml => serde_yaml::to_writer(&mut writer, value)?,
        cli::OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, value)?;
            writeln!(writer)?;
        }
    };

    writer.flush()?;
    Ok(())
}

pub fn list() -> anyhow::Result<()> {
    let registry = contrib::registry();

    println!("sources:");
    for name in registry.source_names() {
        println!("  {name}");
    }

    println!("recipes:");
    for name in registry.recipe_names() {
        println!("  {name}");
    }

    Ok(())
}

pub fn configure(cli: cli::ConfigureCommand) -> anyhow::Result<()> {
    use cli::ConfigureSubCommand::*;

    match cli.command {
        List => {
            let settings = Settings::load().context("Failed to load settings")?;
            for (section, entries) in settings.sections() {
                println!("[{section}]");
                for (key, value) in entries {
                    println!("{key} = {value}");
                }
            }
        }
        Set(args) => {
            let path = if args.system {
                settings::global_path().ok_or(SettingsError::NoHomeDirectory)?
            } else {
                settings::local_path()
            };

            let mut settings = Settings::load_files(std::slice::from_ref(&path))
                .with_context(|| format!("Failed to load {}", path.display()))?;
            settings.set(&args.section, &args.key, args.value);
            settings.save(&path)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_recipes_are_comma_separated() {
        let mut settings = Settings::default();
        assert!(default_recipes(&settings).is_empty());

        settings.set("defaults", "recipes", "add-parameter, add-mapping,,");
        assert_eq!(default_recipes(&settings), ["add-parameter", "add-mapping"]);
    }
}
