// nelson CLI - submit work to the grading services and manage course content

mod exit_codes;
mod prompt;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::Value;

use nelson_client::admin::{self, AdminObject};
use nelson_client::deploy_key::{self, DEPLOY_KEY_DIR};
use nelson_client::{
    CredentialStore, IdProvider, NelsonError, ProgressBarReporter, ProgressReporter, ProjectTarget,
    QuizTarget, RunOutcome, Runner, Session, SessionBuilder, Silent, Submission, SubmissionRequest,
    SubmissionTarget, SUBMISSION_FILENAME,
};
use nelson_config::{Environment, Service, Settings};

use exit_codes::{exit_code, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};
use prompt::TerminalPrompt;

#[derive(Parser)]
#[command(name = "nelson")]
#[command(about = "Submit code to the Udacity / GT OMSCS grading services")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Deployment environment (local, development, staging, production)
    #[arg(long, global = true, env = "NELSON_ENVIRONMENT")]
    environment: Option<Environment>,

    /// Identity provider (udacity, gt, developer); defaults per service
    #[arg(long, global = true, env = "NELSON_ID_PROVIDER")]
    id_provider: Option<String>,

    /// JWT cache file (default: ~/.nelson/<service>_jwt)
    #[arg(long, global = true, env = "NELSON_JWT_PATH")]
    jwt_path: Option<PathBuf>,

    /// Talk to this server instead of the environment's root URL
    #[arg(long, global = true, env = "NELSON_ROOT_URL", hide = true)]
    root_url: Option<String>,

    /// Debug logging on stderr (overrides NELSON_LOG)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit files for grading and wait for the result
    #[command(after_help = "\
Examples:
  nelson submit quiz cs6300 letsmakeadeal deal.py
  nelson submit project nd000 p1 src/main.c Makefile --refresh-time 5")]
    Submit {
        #[command(subcommand)]
        target: SubmitTarget,
    },

    /// Log in to a grading service and optionally cache the token
    Login {
        /// gtomscs or udacity
        #[arg(value_parser = parse_service)]
        service: Service,
    },

    /// Create a course, nanodegree, quiz or project from a JSON data file
    #[command(after_help = "\
Examples:
  nelson generate course course.json
  nelson generate quiz quiz.json --environment staging")]
    Generate {
        /// course, nanodegree, quiz or project
        object: AdminObject,

        /// JSON file describing the object
        data_file: PathBuf,
    },
}

#[derive(Subcommand)]
enum SubmitTarget {
    /// Submit to a GT OMSCS quiz
    Quiz {
        /// Course code (e.g. cs6300)
        course: String,
        /// Quiz name
        quiz: String,
        #[command(flatten)]
        opts: SubmitOpts,
    },
    /// Submit to a Udacity nanodegree project
    Project {
        /// Nanodegree key (e.g. nd000)
        nanodegree: String,
        /// Project name
        project: String,
        #[command(flatten)]
        opts: SubmitOpts,
    },
}

#[derive(clap::Args)]
struct SubmitOpts {
    /// Files to submit
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Every file must lie under this directory
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Archive size limit in bytes
    #[arg(long)]
    max_zip_size: Option<u64>,

    /// Seconds between result polls
    #[arg(long)]
    refresh_time: Option<f64>,
}

fn parse_service(s: &str) -> Result<Service, String> {
    match s {
        "gtomscs" => Ok(Service::Gtomscs),
        "udacity" => Ok(Service::Udacity),
        other => Err(format!("unknown service '{}' (expected gtomscs or udacity)", other)),
    }
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("NELSON_GIT_HASH"), ")",
        "\ntarget:  ", env!("NELSON_TARGET"),
    )
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let ctx = Context::new(&cli);
    let result = match &cli.command {
        Commands::Submit { target } => cmd_submit(&ctx, target),
        Commands::Login { service } => cmd_login(&ctx, *service),
        Commands::Generate { object, data_file } => cmd_generate(&ctx, *object, data_file),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

/// Logs go to stderr; `NELSON_LOG` sets the filter, `-v` forces debug.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("NELSON_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn failed(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<NelsonError> for CliError {
    fn from(err: NelsonError) -> Self {
        let hint = match &err {
            NelsonError::PathEscape { .. } => {
                Some("pass --root to submit files from another directory".to_string())
            }
            NelsonError::ArchiveTooLarge { actual, .. } => {
                Some(format!("the archive was {} bytes; leave out large files", actual))
            }
            NelsonError::Authentication(_) => {
                Some("check --id-provider, or delete the cached token and log in again".to_string())
            }
            NelsonError::LoginPageChanged(_) => {
                Some("the CAS login page changed; upgrade nelson or report this".to_string())
            }
            NelsonError::Network(_) => Some("check your connection and --environment".to_string()),
            _ => None,
        };
        Self { code: exit_code(&err), message: err.to_string(), hint }
    }
}

// ============================================================================
// Shared context
// ============================================================================

/// Flags merged over the settings file.
struct Context {
    settings: Settings,
    environment: Environment,
    id_provider: Option<String>,
    jwt_path: Option<PathBuf>,
    root_url: Option<String>,
}

impl Context {
    fn new(cli: &Cli) -> Self {
        let settings = Settings::load();
        Self {
            environment: cli.environment.unwrap_or(settings.environment),
            id_provider: cli.id_provider.clone().or_else(|| settings.id_provider.clone()),
            jwt_path: cli.jwt_path.clone(),
            root_url: cli.root_url.clone(),
            settings,
        }
    }

    fn session_builder(&self, service: Service) -> Result<SessionBuilder, CliError> {
        let provider = self
            .id_provider
            .as_deref()
            .map(str::parse::<IdProvider>)
            .transpose()?;

        let Some(root_url) = &self.root_url else {
            return Ok(SessionBuilder::for_service(
                service,
                self.environment,
                provider,
                self.jwt_path.clone(),
            )?);
        };

        let provider = match provider {
            Some(p) => p,
            None => service.default_id_provider().parse()?,
        };
        let jwt_path = self
            .jwt_path
            .clone()
            .unwrap_or_else(|| nelson_client::default_jwt_path(service));
        let store = CredentialStore::new(jwt_path, root_url.as_str())?;
        Ok(SessionBuilder::new(root_url.as_str(), provider, store))
    }

    fn session(&self, service: Service) -> Result<Session, CliError> {
        let builder = self.session_builder(service)?;
        tracing::debug!(service = %service, root = builder.root_url(), provider = %builder.provider(), "building session");
        Ok(builder.build(&mut TerminalPrompt)?)
    }
}

// ============================================================================
// submit
// ============================================================================

fn cmd_submit(ctx: &Context, target: &SubmitTarget) -> Result<(), CliError> {
    match target {
        SubmitTarget::Quiz { course, quiz, opts } => {
            let session = ctx.session(Service::Gtomscs)?;
            let target = QuizTarget::new(session.root_url(), course.as_str(), quiz.as_str());
            run_submission(ctx, session, target, opts)
        }
        SubmitTarget::Project { nanodegree, project, opts } => {
            let session = ctx.session(Service::Udacity)?;
            let target = ProjectTarget::new(session.root_url(), nanodegree.as_str(), project.as_str());
            run_submission(ctx, session, target, opts)
        }
    }
}

fn run_submission<T: SubmissionTarget>(
    ctx: &Context,
    session: Session,
    target: T,
    opts: &SubmitOpts,
) -> Result<(), CliError> {
    let request = SubmissionRequest::new(opts.files.iter().cloned())
        .root(&opts.root)
        .max_zip_size(opts.max_zip_size.unwrap_or(ctx.settings.max_zip_size))
        .archive_path(SUBMISSION_FILENAME);

    let progress: Arc<dyn ProgressReporter> = if atty::is(atty::Stream::Stderr) {
        Arc::new(ProgressBarReporter::new())
    } else {
        Arc::new(Silent)
    };

    let mut submission = Submission::new(session, target, request).with_progress(progress);
    let refresh_time = opts.refresh_time.unwrap_or(ctx.settings.refresh_time);
    let mut runner = Runner::new(std::io::stdout()).refresh_time(refresh_time);

    match runner.run(&mut submission)? {
        RunOutcome::Feedback { .. } => Ok(()),
        RunOutcome::ErrorReport(_) => Err(CliError::failed("grading failed; see the error report above")),
        RunOutcome::Unknown => Err(CliError::failed("")),
    }
}

// ============================================================================
// login
// ============================================================================

fn cmd_login(ctx: &Context, service: Service) -> Result<(), CliError> {
    let session = ctx.session(service)?;
    println!("Authenticated with {}", session.root_url());
    Ok(())
}

// ============================================================================
// generate
// ============================================================================

fn cmd_generate(ctx: &Context, object: AdminObject, data_file: &Path) -> Result<(), CliError> {
    let file_label = data_file.display().to_string();
    let contents = std::fs::read_to_string(data_file)
        .map_err(|e| CliError::from(NelsonError::Io(e)).with_hint(format!("cannot read {}", file_label)))?;
    let mut data: Value = serde_json::from_str(&contents)
        .map_err(|e| CliError::args(format!("{}: invalid JSON: {}", file_label, e)))?;

    if !data.is_object() {
        return Err(CliError::args(format!("{}: expected a JSON object", file_label)));
    }
    object.validate(&file_label, &data)?;

    if object.needs_repository() {
        attach_repository(&mut data)?;
    }

    let session = ctx.session(object.service())?;
    admin::create(&session, object, &data)?;

    let name = data
        .get("name")
        .or_else(|| data.get("title"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    println!("Created {} {}", object, name);
    Ok(())
}

/// Add `git_url` (unless given) and `deploy_key` to a course/nanodegree.
fn attach_repository(data: &mut Value) -> Result<(), CliError> {
    let key_dir = Path::new(DEPLOY_KEY_DIR);
    deploy_key::create_deploy_key(key_dir)?;

    let git_url = match data.get("git_url").and_then(Value::as_str) {
        Some(url) => url.to_string(),
        None => {
            let remote = data.get("remote").and_then(Value::as_str).unwrap_or("origin");
            deploy_key::infer_git_url(remote)?
        }
    };
    let key = deploy_key::read_deploy_key(key_dir)?;

    if let Some(map) = data.as_object_mut() {
        map.insert("git_url".into(), Value::String(git_url));
        map.insert("deploy_key".into(), Value::String(key));
    }
    Ok(())
}
