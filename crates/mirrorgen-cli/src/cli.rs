use clap::{ArgAction, Parser, ValueHint};
use mirrorgen_config::config::Config;

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    help_template = "{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}",
    arg_required_else_help = true
)]
pub struct Args {
    /// Directory the generated packages are written to
    #[arg(value_hint = ValueHint::DirPath)]
    pub output_root: String,

    /// Base name of the generated packages; batch N is published as <BASE>-N
    #[arg(value_name = "PACKAGE_NAME_BASE")]
    pub package_name_base: String,

    /// Version written into every generated manifest
    #[arg(value_name = "VERSION")]
    pub package_version: String,

    /// Author written into every generated manifest
    pub author: String,

    /// Number of registry entries per generated package
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Maximum number of packages processed at once (0 = unbounded)
    #[arg(short, long)]
    pub jobs: Option<u32>,

    /// Registry index endpoint to fetch the snapshot from
    #[arg(long, value_hint = ValueHint::Url)]
    pub registry_url: Option<String>,

    /// Read the snapshot from a file instead of fetching it
    #[arg(long, value_hint = ValueHint::FilePath, conflicts_with = "registry_url")]
    pub snapshot: Option<String>,

    /// License written into every generated manifest
    #[arg(long)]
    pub license: Option<String>,

    /// Description written into every generated manifest
    #[arg(long)]
    pub description: Option<String>,

    /// Homepage written into every generated manifest
    #[arg(long)]
    pub homepage: Option<String>,

    /// Entry point written into the `main` field
    #[arg(long)]
    pub main: Option<String>,

    /// Don't write README.md files
    #[arg(long)]
    pub no_readme: bool,

    /// Write packages without publishing them
    #[arg(long)]
    pub no_publish: bool,

    /// Command used to publish each package; the package path is appended
    #[arg(long)]
    pub publish_command: Option<String>,

    /// Timeout for the snapshot request (e.g. 30s, 10m)
    #[arg(long)]
    pub timeout: Option<String>,

    /// Set output verbosity
    #[arg(short = 'v', long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Suppress outputs
    #[arg(short, long)]
    pub quiet: bool,

    /// Output logs as json
    #[arg(long)]
    pub json: bool,

    /// Disable colors in output
    #[arg(long)]
    pub no_color: bool,

    /// Disable progress bars
    #[arg(long)]
    pub no_progress: bool,

    /// Provide custom config file
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub config: Option<String>,

    /// Set proxy
    #[arg(required = false, long, short = 'P')]
    pub proxy: Option<String>,

    /// Set request headers
    #[arg(required = false, long, short = 'H')]
    pub header: Option<Vec<String>>,

    /// Set user agent
    #[arg(required = false, long, short = 'A')]
    pub user_agent: Option<String>,
}

impl Args {
    /// Overrides config values with the ones given on the command line.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(batch_size) = self.batch_size {
            config.batch_size = Some(batch_size);
        }
        if let Some(jobs) = self.jobs {
            config.parallel = Some(jobs != 1);
            config.parallel_limit = Some(jobs);
        }
        if let Some(ref url) = self.registry_url {
            config.registry_url = Some(url.clone());
        }
        if let Some(ref license) = self.license {
            config.license = Some(license.clone());
        }
        if let Some(ref description) = self.description {
            config.description = Some(description.clone());
        }
        if let Some(ref homepage) = self.homepage {
            config.homepage = Some(homepage.clone());
        }
        if let Some(ref main) = self.main {
            config.main = Some(main.clone());
        }
        if self.no_readme {
            config.readme = Some(false);
        }
        if self.no_publish {
            config.publish = Some(false);
        }
        if let Some(ref command) = self.publish_command {
            config.publish_command = Some(command.clone());
        }
        if let Some(ref timeout) = self.timeout {
            config.timeout = Some(timeout.clone());
        }
        if let Some(ref user_agent) = self.user_agent {
            config.user_agent = Some(user_agent.clone());
        }
    }
}
