//! envforge CLI entrypoint.
//!
//! Provisions the build environment during an image build and, afterwards,
//! runs the configured entry point inside it.

use clap::Parser;
use envforge_common::{SystemCommandExecutor, init_logging, write_stderr_line};
use envforge_provisioner::arch::Architecture;
use envforge_provisioner::artifact::download::HttpDownloader;
use envforge_provisioner::artifact::extraction::TarExtractor;
use envforge_provisioner::cli::{Cli, Command, EnvArgs};
use envforge_provisioner::config::ProvisionConfig;
use envforge_provisioner::entrypoint::Entrypoint;
use envforge_provisioner::environment::BuildEnvironment;
use envforge_provisioner::error::Result;
use envforge_provisioner::lock::ProvisionLock;
use envforge_provisioner::pipeline::{PipelineDeps, Provisioner, plan, scratch_root};
use std::io::Write;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level());
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Run the selected command and return the process exit code.
fn run(cli: &Cli, stderr: &mut dyn Write) -> Result<i32> {
    let config = ProvisionConfig::load(cli.config.as_deref())?;
    let executor = SystemCommandExecutor;
    let deps = PipelineDeps {
        executor: &executor,
        downloader: &HttpDownloader,
        extractor: &TarExtractor,
    };
    let provisioner = Provisioner::new(&config, deps).quiet(cli.quiet);

    match cli.effective_command() {
        Command::Provision(args) if args.dry_run => {
            run_dry(&config, &provisioner, args.arch.arch, stderr)?;
        }
        Command::Provision(args) => {
            provisioner.run(args.arch.arch, stderr)?;
        }
        Command::RewriteRepos(args) => {
            let _lock = ProvisionLock::acquire(&scratch_root(&config))?;
            let arch = provisioner.resolve_arch(args.arch)?;
            provisioner.rewrite_repositories(arch, false, stderr)?;
        }
        Command::Fetch(args) => {
            let _lock = ProvisionLock::acquire(&scratch_root(&config))?;
            let arch = provisioner.resolve_arch(args.arch)?;
            provisioner.fetch_artifact(arch, stderr)?;
        }
        Command::Env(args) => print_environment(&config, &args)?,
        Command::Exec(args) => {
            let environment = BuildEnvironment::capture(&config.environment);
            return Entrypoint::new(&config.entrypoint).run(&environment, &args.args);
        }
    }
    Ok(0)
}

/// Show the resolved stages without side effects.
///
/// Architecture detection still runs `uname -m` unless `--arch` is given,
/// which reads host state but changes nothing.
fn run_dry(
    config: &ProvisionConfig,
    provisioner: &Provisioner<'_>,
    requested: Option<Architecture>,
    stderr: &mut dyn Write,
) -> Result<()> {
    let arch = provisioner.resolve_arch(requested)?;
    let inherited_path = std::env::var("PATH").ok();
    let plan = plan(config, arch, inherited_path.as_deref())?;
    write_stderr_line(stderr, plan.display_text());
    Ok(())
}

fn print_environment(config: &ProvisionConfig, args: &EnvArgs) -> Result<()> {
    let environment = BuildEnvironment::capture(&config.environment);
    let rendered = if args.json {
        let mut json = environment.render_json().map_err(std::io::Error::from)?;
        json.push('\n');
        json
    } else if args.profile {
        environment.render_profile_script()
    } else {
        environment.render_lines()
    };
    std::io::stdout().write_all(rendered.as_bytes())?;
    Ok(())
}

fn exit_code_for_run_result(result: Result<i32>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(code) => code,
        Err(err) => {
            write_stderr_line(stderr, err);
            1
        }
    }
}
